use sqlx::{Pool, Row, Sqlite, Transaction};
use crate::models::SwapRecord;

/// Totals of one traded pair together with the deltas of its most recently
/// inserted swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSummary {
    pub symbol_base: String,
    pub symbol_quote: String,
    pub amount_native_base: i64,
    pub amount_native_quote: i64,
    pub last_amount_native_base: i64,
    pub last_amount_native_quote: i64,
}

pub async fn insert_swap(tx: &mut Transaction<'_, Sqlite>, record: &SwapRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO swaps
        (tx_id, client_timestamp, compute_unit_limit, compute_unit_price,
         symbol_base, symbol_quote, amount_native_base, amount_native_quote)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(tx_id) DO NOTHING
        "#
    )
    .bind(record.tx_id)
    .bind(record.client_timestamp)
    .bind(record.compute_unit_limit)
    .bind(record.compute_unit_price)
    .bind(&record.symbol_base)
    .bind(&record.symbol_quote)
    .bind(record.amount_native_base)
    .bind(record.amount_native_quote)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn get_swaps(pool: &Pool<Sqlite>) -> Result<Vec<SwapRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT tx_id, client_timestamp, compute_unit_limit, compute_unit_price,
                  symbol_base, symbol_quote, amount_native_base, amount_native_quote
           FROM swaps
           ORDER BY tx_id ASC"#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SwapRecord {
            tx_id: row.get("tx_id"),
            client_timestamp: row.get("client_timestamp"),
            compute_unit_limit: row.get("compute_unit_limit"),
            compute_unit_price: row.get("compute_unit_price"),
            symbol_base: row.get("symbol_base"),
            symbol_quote: row.get("symbol_quote"),
            amount_native_base: row.get("amount_native_base"),
            amount_native_quote: row.get("amount_native_quote"),
        })
        .collect())
}

/// Aggregates every (base, quote) pair across all stored swaps. The latest
/// swap of a pair is the one with the highest transaction id.
pub async fn summarize_pairs(pool: &Pool<Sqlite>) -> Result<Vec<PairSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT s.symbol_base, s.symbol_quote,
                  SUM(s.amount_native_base) AS amount_native_base,
                  SUM(s.amount_native_quote) AS amount_native_quote,
                  (SELECT l.amount_native_base FROM swaps l
                   WHERE l.symbol_base = s.symbol_base AND l.symbol_quote = s.symbol_quote
                   ORDER BY l.tx_id DESC LIMIT 1) AS last_amount_native_base,
                  (SELECT l.amount_native_quote FROM swaps l
                   WHERE l.symbol_base = s.symbol_base AND l.symbol_quote = s.symbol_quote
                   ORDER BY l.tx_id DESC LIMIT 1) AS last_amount_native_quote
           FROM swaps s
           GROUP BY s.symbol_base, s.symbol_quote
           ORDER BY s.symbol_base, s.symbol_quote"#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| PairSummary {
            symbol_base: row.get("symbol_base"),
            symbol_quote: row.get("symbol_quote"),
            amount_native_base: row.get("amount_native_base"),
            amount_native_quote: row.get("amount_native_quote"),
            last_amount_native_base: row.get("last_amount_native_base"),
            last_amount_native_quote: row.get("last_amount_native_quote"),
        })
        .collect())
}
