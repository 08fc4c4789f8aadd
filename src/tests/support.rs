//! tests/support.rs - In-memory database, simulated chain and fixtures shared by the tests

use crate::blockchain::client::{ChainRpc, ClientError};
use crate::blockchain::models::{FetchedTransaction, TokenBalance, TransactionMeta};
use crate::config::DEFAULT_SWAP_PROGRAM_ID;
use crate::db::{account, migration};
use crate::models::{Account, SignatureStatus};
use crate::tokens::{TokenDirectory, TokenInfo};
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::message::compiled_instruction::CompiledInstruction;
use solana_sdk::message::v0::{self, MessageAddressTableLookup};
use solana_sdk::message::{MessageHeader, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const ETH_MINT: &str = "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs";
pub const BONK_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
pub const UNKNOWN_MINT: &str = "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R";

/// Single-connection in-memory database with the schema applied.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    migration::run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

pub async fn setup_wallet(pool: &SqlitePool, wallet: &Pubkey) -> Account {
    let address = wallet.to_string();
    account::add_account(pool, &address, Some("test-wallet")).await.unwrap();
    account::resolve_wallet(pool, &address).await.unwrap()
}

pub fn swap_program() -> Pubkey {
    Pubkey::from_str(DEFAULT_SWAP_PROGRAM_ID).unwrap()
}

pub fn token_directory() -> Arc<TokenDirectory> {
    let token = |mint: &str, symbol: &str, decimals: u8| TokenInfo {
        mint: mint.to_string(),
        symbol: symbol.to_string(),
        decimals,
    };

    Arc::new(TokenDirectory::new(
        vec![
            token(SOL_MINT, "SOL", 9),
            token(USDC_MINT, "USDC", 6),
            token(ETH_MINT, "ETH", 8),
            token(BONK_MINT, "BONK", 5),
        ],
        swap_program(),
    ))
}

pub fn status(signature: &str, slot: u64) -> SignatureStatus {
    SignatureStatus {
        signature: signature.to_string(),
        slot,
        error: None,
        memo: None,
        block_time: Some(1_700_000_000 + slot as i64),
    }
}

pub fn balance(account_index: u8, mint: &str, owner: &Pubkey, amount: u64) -> TokenBalance {
    TokenBalance {
        account_index,
        mint: mint.to_string(),
        owner: Some(owner.to_string()),
        amount,
    }
}

pub fn instruction(program_id_index: u8, data: Vec<u8>) -> CompiledInstruction {
    CompiledInstruction {
        program_id_index,
        accounts: vec![0],
        data,
    }
}

/// Version 0 message signed by `payer` whose static keys follow the payer.
pub fn message(
    payer: &Pubkey,
    static_keys: &[Pubkey],
    instructions: Vec<CompiledInstruction>,
    lookups: Vec<MessageAddressTableLookup>,
) -> VersionedMessage {
    let mut account_keys = vec![*payer];
    account_keys.extend_from_slice(static_keys);

    VersionedMessage::V0(v0::Message {
        header: MessageHeader {
            num_required_signatures: 1,
            num_readonly_signed_accounts: 0,
            num_readonly_unsigned_accounts: static_keys.len() as u8,
        },
        account_keys,
        recent_blockhash: Hash::default(),
        instructions,
        address_table_lookups: lookups,
    })
}

/// A transaction that calls the swap program directly and moves the given balances.
pub fn swap_transaction(
    signature: &str,
    wallet: &Pubkey,
    pre: Vec<TokenBalance>,
    post: Vec<TokenBalance>,
) -> FetchedTransaction {
    FetchedTransaction {
        signature: signature.to_string(),
        slot: 1,
        block_time: None,
        message: message(wallet, &[swap_program()], vec![instruction(1, vec![0xe5])], vec![]),
        meta: Some(TransactionMeta {
            pre_token_balances: Some(pre),
            post_token_balances: Some(post),
            loaded_addresses: None,
        }),
    }
}

pub fn transfer_transaction(signature: &str, wallet: &Pubkey) -> FetchedTransaction {
    let program = Pubkey::new_unique();
    FetchedTransaction {
        signature: signature.to_string(),
        slot: 1,
        block_time: None,
        message: message(wallet, &[program], vec![instruction(1, vec![2, 0, 0, 0])], vec![]),
        meta: Some(TransactionMeta::default()),
    }
}

/// Account data of an active lookup table holding `addresses`.
pub fn lookup_table_data(addresses: &[Pubkey]) -> Vec<u8> {
    let mut data = Vec::with_capacity(56 + addresses.len() * 32);
    data.extend_from_slice(&1u32.to_le_bytes()); // initialized table
    data.extend_from_slice(&u64::MAX.to_le_bytes()); // not deactivated
    data.extend_from_slice(&0u64.to_le_bytes()); // last extended slot
    data.push(0); // last extended slot start index
    data.push(0); // no authority
    data.resize(56, 0);
    for address in addresses {
        data.extend_from_slice(address.as_ref());
    }
    data
}

/// Simulated chain serving one wallet's history in fixed-size pages.
pub struct MockRpc {
    /// Newest first, like the RPC listing.
    history: Mutex<Vec<SignatureStatus>>,
    page_size: usize,
    transactions: Mutex<HashMap<String, FetchedTransaction>>,
    failing: Mutex<HashSet<String>>,
    /// 1-based signature listing calls that fail.
    failing_signature_calls: Mutex<HashSet<usize>>,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    pub signature_calls: AtomicUsize,
    pub transaction_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
}

impl MockRpc {
    pub fn new(page_size: usize) -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            page_size,
            transactions: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            failing_signature_calls: Mutex::new(HashSet::new()),
            accounts: Mutex::new(HashMap::new()),
            signature_calls: AtomicUsize::new(0),
            transaction_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
        }
    }

    /// Appends signatures at the chain head, oldest first.
    pub fn push_signatures(&self, statuses: Vec<SignatureStatus>) {
        let mut history = self.history.lock().unwrap();
        for status in statuses {
            history.insert(0, status);
        }
    }

    pub fn add_transaction(&self, tx: FetchedTransaction) {
        self.transactions.lock().unwrap().insert(tx.signature.clone(), tx);
    }

    pub fn fail_transaction(&self, signature: &str) {
        self.failing.lock().unwrap().insert(signature.to_string());
    }

    pub fn recover_transaction(&self, signature: &str) {
        self.failing.lock().unwrap().remove(signature);
    }

    pub fn fail_signature_call(&self, call: usize) {
        self.failing_signature_calls.lock().unwrap().insert(call);
    }

    pub fn add_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn get_signatures_for_address(
        &self,
        _address: &str,
        before: Option<&str>,
        until: Option<&str>,
    ) -> Result<Vec<SignatureStatus>, ClientError> {
        let call = self.signature_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_signature_calls.lock().unwrap().contains(&call) {
            return Err(ClientError::PubkeyError(format!("listing call {} failed", call)));
        }

        let history = self.history.lock().unwrap();

        let start = match before {
            Some(before) => history
                .iter()
                .position(|s| s.signature == before)
                .map_or(history.len(), |i| i + 1),
            None => 0,
        };

        let page = history[start..]
            .iter()
            .take_while(|s| Some(s.signature.as_str()) != until)
            .take(self.page_size)
            .cloned()
            .collect();

        Ok(page)
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<FetchedTransaction>, ClientError> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(signature) {
            return Err(ClientError::SignatureError(signature.to_string()));
        }

        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ClientError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }
}
