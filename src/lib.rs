pub mod blockchain;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pnl;
pub mod state;
pub mod tokens;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use db::connection;
pub use db::transaction;
pub use db::account;
pub use db::migration;
pub use error::IndexerError;
pub use models::{Account, ConfirmedTransaction, SwapRecord, TxAction};
pub use validation::validate_solana_address;
