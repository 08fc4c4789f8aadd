// Rows of the three indexer tables and the classification tag stored on
// each confirmed transaction.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub address: String,
    pub label: Option<String>,
}

/// Classification assigned to a confirmed transaction. A row with no action
/// has not been classified yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxAction {
    Swap,
    Undefined,
}

impl TxAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxAction::Swap => "swap",
            TxAction::Undefined => "undefined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "swap" => Some(TxAction::Swap),
            "undefined" => Some(TxAction::Undefined),
            _ => None,
        }
    }
}

impl fmt::Display for TxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub signature: String,
    pub slot: i64,
    /// JSON encoded transaction error, present for failed transactions.
    pub error: Option<String>,
    pub memo: Option<String>,
    pub block_time: Option<i64>,
    pub action: Option<TxAction>,
}

/// One entry of a signature listing, as returned newest-first by the RPC node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureStatus {
    pub signature: String,
    pub slot: u64,
    pub error: Option<String>,
    pub memo: Option<String>,
    pub block_time: Option<i64>,
}

/// A confirmed transaction waiting for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub id: i64,
    pub signature: String,
    /// Earlier cycles that failed to fetch or resolve this transaction.
    pub fetch_failures: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub tx_id: i64,
    pub client_timestamp: Option<i64>,
    pub compute_unit_limit: Option<i64>,
    pub compute_unit_price: Option<i64>,
    pub symbol_base: String,
    pub symbol_quote: String,
    pub amount_native_base: i64,
    pub amount_native_quote: i64,
}

/// Outcome of classifying one pending transaction, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub tx_id: i64,
    pub action: TxAction,
    pub swap: Option<SwapRecord>,
}

impl Classified {
    pub fn undefined(tx_id: i64) -> Self {
        Self {
            tx_id,
            action: TxAction::Undefined,
            swap: None,
        }
    }
}
