// Process configuration, read once from the environment:
// - wallet to index and its optional seed label
// - RPC endpoint, commitment, timeout and rate limit
// - database connection string
// - poll intervals, batch size and fetch attempts for the two loops
// - lookup table cache settings
// - token metadata source and swap program

use dotenv::dotenv;
use std::env;
use std::time::Duration;

/// Jupiter v4 aggregator program.
pub const DEFAULT_SWAP_PROGRAM_ID: &str = "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB";
pub const DEFAULT_METADATA_URL: &str = "https://api.mngo.cloud/data/v4/group-metadata";
pub const DEFAULT_METADATA_GROUP: &str = "78b8f4cGCwmZ9ysPFMWLaLTkkaYnUjwMJYStWe5RTSSX";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub solana_rpc_url: String,
    pub wallet_address: String,
    pub wallet_label: Option<String>,
    pub solana_commitment_level: String,
    pub rpc_timeout_secs: u64,
    pub rpc_rate_limit: Option<u32>,
    pub signature_poll_interval: Duration,
    pub index_poll_interval: Duration,
    pub index_batch_size: i64,
    pub index_max_fetch_attempts: i64,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    pub metadata_url: String,
    pub metadata_group: String,
    pub metadata_timeout_secs: u64,
    pub swap_program_id: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:indexer.db".to_string());
        let solana_rpc_url = env::var("SOLANA_RPC_URL")
            .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string());
        let wallet_address = env::var("WALLET_PK").unwrap_or_default();
        let wallet_label = env::var("WALLET_LABEL").ok().filter(|label| !label.trim().is_empty());
        let solana_commitment_level = env::var("SOLANA_COMMITMENT_LEVEL")
            .unwrap_or_else(|_| "confirmed".to_string());
        let rpc_timeout_secs = env::var("RPC_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(30))
            .unwrap_or(30);
        let rpc_rate_limit = env::var("RPC_RATE_LIMIT")
            .map(|v| v.parse().ok())
            .unwrap_or(None);
        let signature_poll_interval = env::var("SIGNATURE_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));
        let index_poll_interval = env::var("INDEX_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(1000));
        let index_batch_size = env::var("INDEX_BATCH_SIZE")
            .map(|v| v.parse().unwrap_or(50))
            .unwrap_or(50);
        let index_max_fetch_attempts = env::var("INDEX_MAX_FETCH_ATTEMPTS")
            .map(|v| v.parse().unwrap_or(10))
            .unwrap_or(10);
        let cache_ttl = env::var("CACHE_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));
        let cache_max_capacity = env::var("CACHE_MAX_CAPACITY")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);
        let metadata_url = env::var("METADATA_URL").unwrap_or_else(|_| DEFAULT_METADATA_URL.to_string());
        let metadata_group = env::var("METADATA_GROUP").unwrap_or_else(|_| DEFAULT_METADATA_GROUP.to_string());
        let metadata_timeout_secs = env::var("METADATA_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(30))
            .unwrap_or(30);
        let swap_program_id = env::var("SWAP_PROGRAM_ID")
            .unwrap_or_else(|_| DEFAULT_SWAP_PROGRAM_ID.to_string());

        Self {
            database_url,
            solana_rpc_url,
            wallet_address,
            wallet_label,
            solana_commitment_level,
            rpc_timeout_secs,
            rpc_rate_limit,
            signature_poll_interval,
            index_poll_interval,
            index_batch_size,
            index_max_fetch_attempts,
            cache_ttl,
            cache_max_capacity,
            metadata_url,
            metadata_group,
            metadata_timeout_secs,
            swap_program_id,
        }
    }
}
