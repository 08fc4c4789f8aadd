pub mod lookup_table;

pub use lookup_table::LookupTableCache;

use crate::config::Config;

pub fn init_cache(config: &Config) -> LookupTableCache {
    LookupTableCache::new(config.cache_max_capacity, config.cache_ttl)
}
