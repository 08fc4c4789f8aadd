use thiserror::Error;
use crate::blockchain::client::ClientError;
use crate::tokens::MetadataError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("Token metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Wallet {address} found {count} times in accounts")]
    WalletLookup { address: String, count: usize },
}
