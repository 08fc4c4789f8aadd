//! Address lookup table cache implementation

use std::sync::Arc;
use std::time::Duration;
use moka::future::Cache;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Caches decoded lookup table contents by table address
#[derive(Clone)]
pub struct LookupTableCache {
    cache: Cache<Pubkey, Arc<Vec<Pubkey>>>,
}

impl LookupTableCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, table: &Pubkey) -> Option<Arc<Vec<Pubkey>>> {
        let result = self.cache.get(table).await;
        if result.is_some() {
            debug!("Cache hit for lookup table: {}", table);
        }
        result
    }

    pub async fn insert(&self, table: Pubkey, addresses: Arc<Vec<Pubkey>>) {
        debug!("Cached lookup table {} with {} addresses", table, addresses.len());
        self.cache.insert(table, addresses).await;
    }

    /// Drop a table, e.g. after it was extended past the cached contents
    pub async fn invalidate(&self, table: &Pubkey) {
        self.cache.invalidate(table).await;
        debug!("Invalidated lookup table: {}", table);
    }
}
