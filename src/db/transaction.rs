use sqlx::{Pool, Row, Sqlite};
use crate::db::swap;
use crate::models::{Classified, ConfirmedTransaction, PendingTransaction, SignatureStatus, TxAction};

/// Inserts signatures in the order given, ignoring ones already stored.
/// Callers pass them oldest-first so ids follow chain order.
/// Returns the number of rows actually inserted.
pub async fn add_signatures(
    pool: &Pool<Sqlite>,
    wallet_id: i64,
    signatures: &[SignatureStatus],
) -> Result<u64, sqlx::Error> {
    // Start a transaction for batch insert
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for status in signatures {
        let result = sqlx::query(
            r#"
            INSERT INTO txs_confirmed
            (wallet_id, signature, slot, error, memo, block_time)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(signature) DO NOTHING
            "#
        )
        .bind(wallet_id)
        .bind(&status.signature)
        .bind(status.slot as i64)
        .bind(&status.error)
        .bind(&status.memo)
        .bind(status.block_time)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;

    Ok(inserted)
}

/// Highest slot stored for the wallet.
pub async fn latest_slot(pool: &Pool<Sqlite>, wallet_id: i64) -> Result<Option<i64>, sqlx::Error> {
    let slot = sqlx::query_scalar::<_, i64>(
        "SELECT slot FROM txs_confirmed
         WHERE wallet_id = ?
         ORDER BY slot DESC
         LIMIT 1"
    )
    .bind(wallet_id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

/// Most recent signature stored in a slot strictly below `slot`.
pub async fn last_signature_before_slot(
    pool: &Pool<Sqlite>,
    wallet_id: i64,
    slot: i64,
) -> Result<Option<String>, sqlx::Error> {
    let signature = sqlx::query_scalar::<_, String>(
        "SELECT signature FROM txs_confirmed
         WHERE wallet_id = ? AND slot < ?
         ORDER BY slot DESC, id DESC
         LIMIT 1"
    )
    .bind(wallet_id)
    .bind(slot)
    .fetch_optional(pool)
    .await?;

    Ok(signature)
}

/// Stages one page of a backfill walk. Pages arrive newest first, so `seq`
/// grows toward older history. Returns the number of newly staged rows.
pub async fn stage_signatures(
    pool: &Pool<Sqlite>,
    wallet_id: i64,
    page: &[SignatureStatus],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut staged = 0;

    for status in page {
        let result = sqlx::query(
            r#"
            INSERT INTO signatures_staged
            (wallet_id, signature, slot, error, memo, block_time)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(wallet_id, signature) DO NOTHING
            "#
        )
        .bind(wallet_id)
        .bind(&status.signature)
        .bind(status.slot as i64)
        .bind(&status.error)
        .bind(&status.memo)
        .bind(status.block_time)
        .execute(&mut *tx)
        .await?;

        staged += result.rows_affected();
    }

    tx.commit().await?;

    Ok(staged)
}

/// Oldest signature staged by an unfinished walk, where the walk resumes.
pub async fn oldest_staged_signature(pool: &Pool<Sqlite>, wallet_id: i64) -> Result<Option<String>, sqlx::Error> {
    let signature = sqlx::query_scalar::<_, String>(
        "SELECT signature FROM signatures_staged
         WHERE wallet_id = ?
         ORDER BY seq DESC
         LIMIT 1"
    )
    .bind(wallet_id)
    .fetch_optional(pool)
    .await?;

    Ok(signature)
}

pub async fn count_staged(pool: &Pool<Sqlite>, wallet_id: i64) -> Result<i64, sqlx::Error> {
    let count = sqlx::query("SELECT COUNT(*) FROM signatures_staged WHERE wallet_id = ?")
        .bind(wallet_id)
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    Ok(count)
}

/// Moves a finished walk into `txs_confirmed` oldest first, so ids follow
/// chain order, and clears the staging rows. Returns the number of
/// signatures that were not stored yet.
pub async fn promote_staged(pool: &Pool<Sqlite>, wallet_id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO txs_confirmed
        (wallet_id, signature, slot, error, memo, block_time)
        SELECT wallet_id, signature, slot, error, memo, block_time
        FROM signatures_staged
        WHERE wallet_id = ?
        ORDER BY seq DESC
        "#
    )
    .bind(wallet_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query("DELETE FROM signatures_staged WHERE wallet_id = ?")
        .bind(wallet_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(inserted)
}

/// Unclassified transactions of the wallet, at most `limit` of them.
/// Rows that failed to fetch less often come first, then oldest first, so
/// rows that keep failing can't crowd out fresh ones.
pub async fn get_unclassified(
    pool: &Pool<Sqlite>,
    wallet_id: i64,
    limit: i64,
) -> Result<Vec<PendingTransaction>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, signature, fetch_failures FROM txs_confirmed
         WHERE wallet_id = ? AND action IS NULL
         ORDER BY fetch_failures ASC, id ASC
         LIMIT ?"
    )
    .bind(wallet_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| PendingTransaction {
            id: row.get("id"),
            signature: row.get("signature"),
            fetch_failures: row.get("fetch_failures"),
        })
        .collect())
}

/// Counts one more failed fetch for each still unclassified row.
pub async fn record_fetch_failures(pool: &Pool<Sqlite>, ids: &[i64]) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut updated = 0;

    for id in ids {
        let result = sqlx::query(
            "UPDATE txs_confirmed SET fetch_failures = fetch_failures + 1
             WHERE id = ? AND action IS NULL"
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        updated += result.rows_affected();
    }

    tx.commit().await?;

    Ok(updated)
}

/// Stores swap rows and assigns actions for a classified batch in one
/// database transaction. Swap inserts ignore rows already present and
/// actions are only written to rows that are still unclassified, so replaying
/// a batch is harmless. Returns the number of transactions updated.
pub async fn commit_classifications(
    pool: &Pool<Sqlite>,
    classified: &[Classified],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut updated = 0;

    for item in classified {
        if let Some(record) = &item.swap {
            swap::insert_swap(&mut tx, record).await?;
        }

        let result = sqlx::query(
            "UPDATE txs_confirmed SET action = ?
             WHERE id = ? AND action IS NULL"
        )
        .bind(item.action.as_str())
        .bind(item.tx_id)
        .execute(&mut *tx)
        .await?;

        updated += result.rows_affected();
    }

    tx.commit().await?;

    Ok(updated)
}

/// All stored transactions of the wallet in insertion order.
pub async fn get_transactions(pool: &Pool<Sqlite>, wallet_id: i64) -> Result<Vec<ConfirmedTransaction>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, wallet_id, signature, slot, error, memo, block_time, action
           FROM txs_confirmed
           WHERE wallet_id = ?
           ORDER BY id ASC"#
    )
    .bind(wallet_id)
    .fetch_all(pool)
    .await?;

    let transactions = rows.iter().map(|row| {
        ConfirmedTransaction {
            id: row.get("id"),
            wallet_id: row.get("wallet_id"),
            signature: row.get("signature"),
            slot: row.get("slot"),
            error: row.get("error"),
            memo: row.get("memo"),
            block_time: row.get("block_time"),
            action: row
                .get::<Option<String>, _>("action")
                .as_deref()
                .and_then(TxAction::parse),
        }
    }).collect();

    Ok(transactions)
}

pub async fn count_transactions(pool: &Pool<Sqlite>, wallet_id: i64) -> Result<i64, sqlx::Error> {
    let count = sqlx::query("SELECT COUNT(*) FROM txs_confirmed WHERE wallet_id = ?")
        .bind(wallet_id)
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    Ok(count)
}
