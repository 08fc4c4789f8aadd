use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, UiLoadedAddresses, UiTransactionStatusMeta,
    UiTransactionTokenBalance,
};
use std::str::FromStr;
use tracing::warn;
use crate::models::SignatureStatus;

/// A transaction body as needed for classification: the versioned message
/// (instructions and lookup table references) and the token balance snapshots.
#[derive(Debug, Clone)]
pub struct FetchedTransaction {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub message: VersionedMessage,
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionMeta {
    pub pre_token_balances: Option<Vec<TokenBalance>>,
    pub post_token_balances: Option<Vec<TokenBalance>>,
    /// Addresses the node loaded from lookup tables when it executed the
    /// transaction.
    pub loaded_addresses: Option<LoadedAddresses>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedAddresses {
    pub writable: Vec<Pubkey>,
    pub readonly: Vec<Pubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: String,
    pub owner: Option<String>,
    /// Raw amount in the token's smallest unit.
    pub amount: u64,
}

impl From<RpcConfirmedTransactionStatusWithSignature> for SignatureStatus {
    fn from(status: RpcConfirmedTransactionStatusWithSignature) -> Self {
        let error = status
            .err
            .as_ref()
            .and_then(|err| serde_json::to_string(err).ok());

        Self {
            signature: status.signature,
            slot: status.slot,
            error,
            memo: status.memo,
            block_time: status.block_time,
        }
    }
}

/// Converts an RPC transaction body, returning `None` when it can't be
/// decoded into a versioned message.
pub fn extract_transaction(
    signature: &str,
    tx_data: &EncodedConfirmedTransactionWithStatusMeta,
) -> Option<FetchedTransaction> {
    let transaction_with_meta = &tx_data.transaction;

    let transaction = match transaction_with_meta.transaction.decode() {
        Some(tx) => tx,
        None => {
            warn!("Unsupported transaction encoding for {}", signature);
            return None;
        }
    };

    let meta = transaction_with_meta
        .meta
        .as_ref()
        .map(|meta| convert_meta(signature, meta));

    Some(FetchedTransaction {
        signature: signature.to_string(),
        slot: tx_data.slot,
        block_time: tx_data.block_time,
        message: transaction.message,
        meta,
    })
}

fn convert_meta(signature: &str, meta: &UiTransactionStatusMeta) -> TransactionMeta {
    let pre: Option<Vec<UiTransactionTokenBalance>> = meta.pre_token_balances.clone().into();
    let post: Option<Vec<UiTransactionTokenBalance>> = meta.post_token_balances.clone().into();
    let loaded: Option<UiLoadedAddresses> = meta.loaded_addresses.clone().into();

    TransactionMeta {
        pre_token_balances: pre.map(|balances| convert_balances(signature, &balances)),
        post_token_balances: post.map(|balances| convert_balances(signature, &balances)),
        loaded_addresses: loaded.and_then(|addresses| convert_loaded_addresses(signature, &addresses)),
    }
}

fn convert_balances(signature: &str, balances: &[UiTransactionTokenBalance]) -> Vec<TokenBalance> {
    balances
        .iter()
        .filter_map(|balance| match balance.ui_token_amount.amount.parse::<u64>() {
            Ok(amount) => Some(TokenBalance {
                account_index: balance.account_index,
                mint: balance.mint.clone(),
                owner: balance.owner.clone().into(),
                amount,
            }),
            Err(_) => {
                warn!(
                    "Transaction {} has unparseable token amount {:?} for mint {}",
                    signature, balance.ui_token_amount.amount, balance.mint
                );
                None
            }
        })
        .collect()
}

fn convert_loaded_addresses(signature: &str, addresses: &UiLoadedAddresses) -> Option<LoadedAddresses> {
    let parse = |keys: &[String]| -> Option<Vec<Pubkey>> {
        keys.iter().map(|key| Pubkey::from_str(key).ok()).collect()
    };

    match (parse(&addresses.writable), parse(&addresses.readonly)) {
        (Some(writable), Some(readonly)) => Some(LoadedAddresses { writable, readonly }),
        _ => {
            warn!("Transaction {} has invalid loaded addresses", signature);
            None
        }
    }
}
