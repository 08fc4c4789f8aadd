use crate::blockchain::client::ClientError;
use crate::blockchain::lookup::LookupTableResolver;
use crate::blockchain::models::{FetchedTransaction, TokenBalance, TransactionMeta};
use crate::models::{Classified, SwapRecord, TxAction};
use crate::tokens::{TokenDirectory, TokenSymbol};
use solana_sdk::compute_budget;
use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Every swap is priced against this symbol.
pub const QUOTE_SYMBOL: &str = "USDC";

const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
const SET_COMPUTE_UNIT_PRICE: u8 = 3;

/// Reasons a swap program transaction can't be turned into a swap record.
/// None of them are fatal: the transaction is classified as undefined.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("transaction has no status metadata")]
    MissingMeta,

    #[error("can only parse swaps with 2 symbols, found pre={pre:?} post={post:?}")]
    SymbolCount { pre: Vec<String>, post: Vec<String> },

    #[error("could not identify USDC as quote in {0:?}")]
    MissingQuote(Vec<String>),

    #[error("balance delta of {0} does not fit in 64 bits")]
    AmountOverflow(String),
}

/// Signed native-unit balance changes of the indexed wallet in one swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLegs {
    pub base: TokenSymbol,
    pub quote: TokenSymbol,
    pub amount_native_base: i64,
    pub amount_native_quote: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputeBudget {
    pub unit_limit: Option<u32>,
    pub unit_price: Option<u64>,
}

pub struct SwapExtractor {
    wallet: String,
    tokens: Arc<TokenDirectory>,
    lookups: LookupTableResolver,
}

impl SwapExtractor {
    pub fn new(wallet: impl Into<String>, tokens: Arc<TokenDirectory>, lookups: LookupTableResolver) -> Self {
        Self {
            wallet: wallet.into(),
            tokens,
            lookups,
        }
    }

    /// Classifies one fetched transaction. Only lookup table fetch failures
    /// are returned as errors; every other problem yields `undefined`.
    pub async fn classify(&self, tx_id: i64, tx: &FetchedTransaction) -> Result<Classified, ClientError> {
        let keys = self.lookups.account_keys(tx).await?;

        if !invokes_program(&tx.message, &keys, self.tokens.swap_program()) {
            debug!("Transaction {} did not invoke the swap program", tx.signature);
            return Ok(Classified::undefined(tx_id));
        }

        let legs = match tx.meta.as_ref() {
            Some(meta) => self.extract_legs(meta),
            None => Err(ClassificationError::MissingMeta),
        };

        let legs = match legs {
            Ok(legs) => legs,
            Err(e) => {
                warn!("Swap {} left unparsed: {}", tx.signature, e);
                return Ok(Classified::undefined(tx_id));
            }
        };

        let budget = compute_budget(&tx.message, &keys);

        debug!(
            "Swap {}: {} {} / {} {}",
            tx.signature, legs.base, legs.amount_native_base, legs.quote, legs.amount_native_quote
        );

        Ok(Classified {
            tx_id,
            action: TxAction::Swap,
            swap: Some(SwapRecord {
                tx_id,
                client_timestamp: None,
                compute_unit_limit: budget.unit_limit.map(i64::from),
                compute_unit_price: budget.unit_price.and_then(|price| i64::try_from(price).ok()),
                symbol_base: legs.base.to_string(),
                symbol_quote: legs.quote.to_string(),
                amount_native_base: legs.amount_native_base,
                amount_native_quote: legs.amount_native_quote,
            }),
        })
    }

    /// Derives base and quote deltas from the wallet's token balances.
    /// Exactly two symbols must be held before the swap, one of them USDC.
    pub fn extract_legs(&self, meta: &TransactionMeta) -> Result<SwapLegs, ClassificationError> {
        let pre = self.wallet_balances(meta.pre_token_balances.as_deref());
        let post = self.wallet_balances(meta.post_token_balances.as_deref());

        let symbol_count_error = || ClassificationError::SymbolCount {
            pre: symbol_names(&pre),
            post: symbol_names(&post),
        };

        if pre.len() != 2 {
            return Err(symbol_count_error());
        }

        let quote = pre
            .keys()
            .find(|symbol| matches!(symbol, TokenSymbol::Known(s) if s == QUOTE_SYMBOL))
            .cloned()
            .ok_or_else(|| ClassificationError::MissingQuote(symbol_names(&pre)))?;

        let base = pre
            .keys()
            .find(|symbol| **symbol != quote)
            .cloned()
            .ok_or_else(symbol_count_error)?;

        let delta = |symbol: &TokenSymbol| -> Result<i64, ClassificationError> {
            let before = pre.get(symbol).copied().unwrap_or(0) as i128;
            let after = post.get(symbol).copied().unwrap_or(0) as i128;
            i64::try_from(after - before)
                .map_err(|_| ClassificationError::AmountOverflow(symbol.to_string()))
        };

        Ok(SwapLegs {
            amount_native_base: delta(&base)?,
            amount_native_quote: delta(&quote)?,
            base,
            quote,
        })
    }

    /// Balances owned by the indexed wallet, summed per symbol.
    fn wallet_balances(&self, balances: Option<&[TokenBalance]>) -> BTreeMap<TokenSymbol, u128> {
        let mut by_symbol = BTreeMap::new();

        for balance in balances.unwrap_or_default() {
            if balance.owner.as_deref() != Some(self.wallet.as_str()) {
                continue;
            }

            let symbol = self.tokens.symbol_for_mint(&balance.mint);
            *by_symbol.entry(symbol).or_insert(0) += u128::from(balance.amount);
        }

        by_symbol
    }
}

fn symbol_names(balances: &BTreeMap<TokenSymbol, u128>) -> Vec<String> {
    balances.keys().map(ToString::to_string).collect()
}

/// Whether any top-level instruction invokes `program`. Instructions whose
/// program index falls outside `keys` are skipped.
pub fn invokes_program(message: &VersionedMessage, keys: &[Pubkey], program: &Pubkey) -> bool {
    message
        .instructions()
        .iter()
        .filter_map(|ix| keys.get(usize::from(ix.program_id_index)))
        .any(|program_id| program_id == program)
}

/// Compute unit limit and price requested through the Compute Budget program.
pub fn compute_budget(message: &VersionedMessage, keys: &[Pubkey]) -> ComputeBudget {
    let mut budget = ComputeBudget::default();

    for ix in message.instructions() {
        if keys.get(usize::from(ix.program_id_index)) != Some(&compute_budget::ID) {
            continue;
        }

        match ix.data.split_first() {
            Some((&SET_COMPUTE_UNIT_LIMIT, rest)) => {
                if let Some(bytes) = rest.get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) {
                    budget.unit_limit = Some(u32::from_le_bytes(bytes));
                }
            }
            Some((&SET_COMPUTE_UNIT_PRICE, rest)) => {
                if let Some(bytes) = rest.get(..8).and_then(|b| <[u8; 8]>::try_from(b).ok()) {
                    budget.unit_price = Some(u64::from_le_bytes(bytes));
                }
            }
            _ => {}
        }
    }

    budget
}
