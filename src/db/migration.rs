use sqlx::SqlitePool;
use tracing::info;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    // Indexed wallets
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL UNIQUE,
            label TEXT
        )"
    )
    .execute(pool)
    .await?;

    // One row per observed signature, classified later by the indexer
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS txs_confirmed (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            wallet_id INTEGER NOT NULL,
            signature TEXT NOT NULL UNIQUE,
            slot INTEGER NOT NULL,
            error TEXT,
            memo TEXT,
            block_time INTEGER,
            action TEXT CHECK (action IN ('swap', 'undefined')),
            fetch_failures INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (wallet_id) REFERENCES accounts(id)
        )"
    )
    .execute(pool)
    .await?;

    // Pages of an unfinished backfill walk, newest first by seq
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS signatures_staged (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            wallet_id INTEGER NOT NULL,
            signature TEXT NOT NULL,
            slot INTEGER NOT NULL,
            error TEXT,
            memo TEXT,
            block_time INTEGER,
            UNIQUE (wallet_id, signature),
            FOREIGN KEY (wallet_id) REFERENCES accounts(id)
        )"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS swaps (
            tx_id INTEGER PRIMARY KEY,
            client_timestamp INTEGER,
            compute_unit_limit INTEGER,
            compute_unit_price INTEGER,
            symbol_base TEXT NOT NULL,
            symbol_quote TEXT NOT NULL,
            amount_native_base INTEGER NOT NULL,
            amount_native_quote INTEGER NOT NULL,
            CHECK (symbol_base <> symbol_quote),
            FOREIGN KEY (tx_id) REFERENCES txs_confirmed(id)
        )"
    )
    .execute(pool)
    .await?;

    // Backfill cursor lookups
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_txs_confirmed_wallet_slot
         ON txs_confirmed(wallet_id, slot)"
    )
    .execute(pool)
    .await?;

    // Unclassified batch selection
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_txs_confirmed_wallet_action
         ON txs_confirmed(wallet_id, action, fetch_failures)"
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_swaps_pair
         ON swaps(symbol_base, symbol_quote, tx_id)"
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
