//! Mark-to-market PnL per traded pair, recomputed from all stored swaps.

use crate::db::swap::{self, PairSummary};
use crate::tokens::TokenDirectory;
use sqlx::SqlitePool;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct PnlSnapshot {
    pub symbol_base: String,
    pub symbol_quote: String,
    pub amount_native_base: i64,
    pub amount_native_quote: i64,
    /// Quote native units per base native unit at the latest swap.
    pub native_price: Option<f64>,
    /// In quote display units.
    pub pnl: Option<f64>,
}

/// Price implied by a swap: quote paid per base received.
pub fn native_price(amount_native_base: i64, amount_native_quote: i64) -> Option<f64> {
    if amount_native_base == 0 {
        return None;
    }

    Some(amount_native_quote as f64 * -1.0 / amount_native_base as f64)
}

pub fn mark_to_market(summary: &PairSummary, quote_decimals: u8) -> PnlSnapshot {
    let price = native_price(summary.last_amount_native_base, summary.last_amount_native_quote);
    let pnl = price.map(|price| {
        (summary.amount_native_base as f64 * price + summary.amount_native_quote as f64)
            / 10f64.powi(i32::from(quote_decimals))
    });

    PnlSnapshot {
        symbol_base: summary.symbol_base.clone(),
        symbol_quote: summary.symbol_quote.clone(),
        amount_native_base: summary.amount_native_base,
        amount_native_quote: summary.amount_native_quote,
        native_price: price,
        pnl,
    }
}

/// Snapshots for every pair whose base and quote are both directory symbols.
/// Pairs recorded under a raw mint address are left out.
pub async fn compute_pnl(pool: &SqlitePool, tokens: &TokenDirectory) -> Result<Vec<PnlSnapshot>, sqlx::Error> {
    let summaries = swap::summarize_pairs(pool).await?;
    let mut snapshots = Vec::with_capacity(summaries.len());

    for summary in &summaries {
        if tokens.by_symbol(&summary.symbol_base).is_none() {
            debug!("Skipping pair with unresolved base {}", summary.symbol_base);
            continue;
        }

        let Some(quote) = tokens.by_symbol(&summary.symbol_quote) else {
            debug!("Skipping pair with unresolved quote {}", summary.symbol_quote);
            continue;
        };

        snapshots.push(mark_to_market(summary, quote.decimals));
    }

    Ok(snapshots)
}

pub async fn report_pnl(pool: &SqlitePool, tokens: &TokenDirectory) -> Result<Vec<PnlSnapshot>, sqlx::Error> {
    let snapshots = compute_pnl(pool, tokens).await?;

    for snapshot in &snapshots {
        match snapshot.pnl {
            Some(pnl) => info!(
                "PNL {}/{}: {} (base {} quote {} price {:?})",
                snapshot.symbol_base,
                snapshot.symbol_quote,
                pnl,
                snapshot.amount_native_base,
                snapshot.amount_native_quote,
                snapshot.native_price
            ),
            None => info!(
                "PNL {}/{}: no price available",
                snapshot.symbol_base, snapshot.symbol_quote
            ),
        }
    }

    Ok(snapshots)
}
