use sqlx::{Pool, Row, Sqlite};
use crate::error::IndexerError;
use crate::models::Account;

/// Registers a wallet for indexing. Existing rows are left untouched.
pub async fn add_account(pool: &Pool<Sqlite>, address: &str, label: Option<&str>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO accounts (address, label) VALUES (?, ?)
         ON CONFLICT(address) DO NOTHING"
    )
    .bind(address)
    .bind(label)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_accounts_by_address(pool: &Pool<Sqlite>, address: &str) -> Result<Vec<Account>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, address, label FROM accounts WHERE address = ?")
        .bind(address)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Account {
            id: row.get("id"),
            address: row.get("address"),
            label: row.get("label"),
        })
        .collect())
}

/// The single account row for `address`. Zero or several matches are fatal
/// at startup.
pub async fn resolve_wallet(pool: &Pool<Sqlite>, address: &str) -> Result<Account, IndexerError> {
    let mut accounts = find_accounts_by_address(pool, address).await?;

    if accounts.len() != 1 {
        return Err(IndexerError::WalletLookup {
            address: address.to_string(),
            count: accounts.len(),
        });
    }

    Ok(accounts.remove(0))
}
