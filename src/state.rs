use crate::blockchain::client::ChainRpc;
use crate::cache::LookupTableCache;
use crate::config::Config;
use crate::models::Account;
use crate::tokens::TokenDirectory;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Everything the backfill and indexing loops share. The loops coordinate
/// only through the database.
pub struct AppState {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub rpc: Arc<dyn ChainRpc>,
    pub tokens: Arc<TokenDirectory>,
    pub lookup_cache: LookupTableCache,
    pub wallet: Account,
}
