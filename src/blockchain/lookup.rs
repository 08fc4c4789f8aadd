//! Address lookup table resolution.
//!
//! Version 0 messages may reference accounts stored in on-chain lookup
//! tables. Instruction program indexes address the flattened key list:
//! static keys, then the writable addresses of every lookup in order, then
//! the readonly addresses of every lookup in order.

use crate::blockchain::client::{ChainRpc, ClientError};
use crate::blockchain::models::FetchedTransaction;
use crate::cache::LookupTableCache;
use solana_sdk::address_lookup_table::state::AddressLookupTable;
use solana_sdk::instruction::InstructionError;
use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub fn decode_lookup_table(data: &[u8]) -> Result<Vec<Pubkey>, InstructionError> {
    AddressLookupTable::deserialize(data).map(|table| table.addresses.to_vec())
}

/// Flattens the account keys of `message` using the given table contents.
/// Returns `None` if a referenced table is missing or too short.
pub fn resolve_account_keys(
    message: &VersionedMessage,
    tables: &HashMap<Pubkey, Arc<Vec<Pubkey>>>,
) -> Option<Vec<Pubkey>> {
    let mut keys = message.static_account_keys().to_vec();
    let Some(lookups) = message.address_table_lookups() else {
        return Some(keys);
    };

    let mut writable = Vec::new();
    let mut readonly = Vec::new();
    for lookup in lookups {
        let table = tables.get(&lookup.account_key)?;
        for &index in &lookup.writable_indexes {
            writable.push(*table.get(usize::from(index))?);
        }
        for &index in &lookup.readonly_indexes {
            readonly.push(*table.get(usize::from(index))?);
        }
    }

    keys.extend(writable);
    keys.extend(readonly);
    Some(keys)
}

pub struct LookupTableResolver {
    rpc: Arc<dyn ChainRpc>,
    cache: LookupTableCache,
}

impl LookupTableResolver {
    pub fn new(rpc: Arc<dyn ChainRpc>, cache: LookupTableCache) -> Self {
        Self { rpc, cache }
    }

    /// Full account key list of a transaction. RPC failures are returned so
    /// the caller can retry later; tables that no longer exist fall back to
    /// the addresses the node reported as loaded.
    pub async fn account_keys(&self, tx: &FetchedTransaction) -> Result<Vec<Pubkey>, ClientError> {
        let lookups = match tx.message.address_table_lookups() {
            Some(lookups) if !lookups.is_empty() => lookups,
            _ => return Ok(tx.message.static_account_keys().to_vec()),
        };

        let mut tables = HashMap::new();
        for lookup in lookups {
            if tables.contains_key(&lookup.account_key) {
                continue;
            }

            let needed = lookup
                .writable_indexes
                .iter()
                .chain(&lookup.readonly_indexes)
                .max()
                .map_or(0, |&index| usize::from(index) + 1);

            if let Some(addresses) = self.table(&lookup.account_key, needed).await? {
                tables.insert(lookup.account_key, addresses);
            }
        }

        if let Some(keys) = resolve_account_keys(&tx.message, &tables) {
            return Ok(keys);
        }

        let mut keys = tx.message.static_account_keys().to_vec();
        match tx.meta.as_ref().and_then(|meta| meta.loaded_addresses.as_ref()) {
            Some(loaded) => {
                debug!("Using loaded addresses for {}", tx.signature);
                keys.extend(loaded.writable.iter().copied());
                keys.extend(loaded.readonly.iter().copied());
            }
            None => warn!(
                "Could not resolve lookup tables for {}, using static keys only",
                tx.signature
            ),
        }

        Ok(keys)
    }

    async fn table(&self, key: &Pubkey, needed: usize) -> Result<Option<Arc<Vec<Pubkey>>>, ClientError> {
        if let Some(cached) = self.cache.get(key).await {
            if cached.len() >= needed {
                return Ok(Some(cached));
            }
            // Table was extended after we cached it
            self.cache.invalidate(key).await;
        }

        let Some(data) = self.rpc.get_account_data(key).await? else {
            return Ok(None);
        };

        match decode_lookup_table(&data) {
            Ok(addresses) => {
                let addresses = Arc::new(addresses);
                self.cache.insert(*key, addresses.clone()).await;
                Ok(Some(addresses))
            }
            Err(e) => {
                warn!("Failed to decode lookup table {}: {}", key, e);
                Ok(None)
            }
        }
    }
}
