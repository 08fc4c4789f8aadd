use crate::blockchain::client::{ChainRpc, ClientError};
use crate::blockchain::models::FetchedTransaction;
use crate::blockchain::extractor::SwapExtractor;
use crate::blockchain::lookup::LookupTableResolver;
use crate::cache::LookupTableCache;
use crate::db::transaction;
use crate::error::IndexerError;
use crate::models::{Account, Classified, PendingTransaction, TxAction};
use crate::pnl;
use crate::state::AppState;
use crate::tokens::TokenDirectory;
use backon::{ExponentialBuilder, Retryable};
use futures::future::join_all;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What one indexing cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub selected: usize,
    pub swaps: usize,
    pub undefined: usize,
    /// Left unclassified after an RPC failure, picked up again next cycle.
    pub deferred: usize,
    /// Marked undefined after failing `max_fetch_attempts` times. Also
    /// counted in `undefined`.
    pub abandoned: usize,
    pub updated: u64,
}

pub struct Indexer {
    rpc: Arc<dyn ChainRpc>,
    pool: SqlitePool,
    wallet: Account,
    extractor: SwapExtractor,
    tokens: Arc<TokenDirectory>,
    batch_size: i64,
    max_fetch_attempts: i64,
}

impl Indexer {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        pool: SqlitePool,
        wallet: Account,
        tokens: Arc<TokenDirectory>,
        lookup_cache: LookupTableCache,
        batch_size: i64,
        max_fetch_attempts: i64,
    ) -> Self {
        let lookups = LookupTableResolver::new(rpc.clone(), lookup_cache);
        let extractor = SwapExtractor::new(wallet.address.clone(), tokens.clone(), lookups);

        Self {
            rpc,
            pool,
            wallet,
            extractor,
            tokens,
            batch_size,
            max_fetch_attempts,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.rpc.clone(),
            state.db_pool.clone(),
            state.wallet.clone(),
            state.tokens.clone(),
            state.lookup_cache.clone(),
            state.config.index_batch_size,
            state.config.index_max_fetch_attempts,
        )
    }

    /// Classifies the next batch of unclassified transactions, commits the
    /// results and reports PnL. An empty batch does nothing else.
    pub async fn run_cycle(&self) -> Result<CycleReport, IndexerError> {
        let pending = transaction::get_unclassified(&self.pool, self.wallet.id, self.batch_size).await?;
        if pending.is_empty() {
            return Ok(CycleReport::default());
        }

        let mut report = CycleReport {
            selected: pending.len(),
            ..CycleReport::default()
        };

        let fetched = join_all(
            pending
                .iter()
                .map(|item| self.fetch(&item.signature)),
        )
        .await;

        let mut classified = Vec::with_capacity(pending.len());
        let mut failed = Vec::new();
        for (item, result) in pending.iter().zip(fetched) {
            let outcome = match result {
                Ok(Some(tx)) => match self.extractor.classify(item.id, &tx).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Failed to resolve accounts of {}: {}", item.signature, e);
                        match self.give_up(item, &mut report) {
                            Some(outcome) => outcome,
                            None => {
                                failed.push(item.id);
                                continue;
                            }
                        }
                    }
                },
                Ok(None) => {
                    warn!("Transaction {} is not available, marking undefined", item.signature);
                    Classified::undefined(item.id)
                }
                Err(e) => {
                    warn!("Failed to fetch transaction {}: {}", item.signature, e);
                    match self.give_up(item, &mut report) {
                        Some(outcome) => outcome,
                        None => {
                            failed.push(item.id);
                            continue;
                        }
                    }
                }
            };

            match outcome.action {
                TxAction::Swap => report.swaps += 1,
                TxAction::Undefined => report.undefined += 1,
            }
            classified.push(outcome);
        }

        if !classified.is_empty() {
            report.updated = transaction::commit_classifications(&self.pool, &classified).await?;
        }

        if !failed.is_empty() {
            transaction::record_fetch_failures(&self.pool, &failed).await?;
        }

        pnl::report_pnl(&self.pool, &self.tokens).await?;

        Ok(report)
    }

    async fn fetch(&self, signature: &str) -> Result<Option<FetchedTransaction>, ClientError> {
        (|| self.rpc.get_transaction(signature))
            .retry(ExponentialBuilder::default().with_max_times(3))
            .when(|e| matches!(e, ClientError::RpcError(_)))
            .notify(|e, delay| warn!("Transaction fetch for {} failed: {}, retrying in {:?}", signature, e, delay))
            .await
    }

    /// Undefined once this failure uses up the row's attempts, otherwise
    /// `None` and the row is deferred.
    fn give_up(&self, item: &PendingTransaction, report: &mut CycleReport) -> Option<Classified> {
        if item.fetch_failures + 1 < self.max_fetch_attempts {
            report.deferred += 1;
            return None;
        }

        warn!(
            "Giving up on {} after {} failed attempts, marking undefined",
            item.signature,
            item.fetch_failures + 1
        );
        report.abandoned += 1;
        Some(Classified::undefined(item.id))
    }
}

pub async fn start_indexing(state: Arc<AppState>, shutdown: CancellationToken) {
    info!("Starting transaction indexing for wallet {}", state.wallet.address);

    let indexer = Indexer::from_state(&state);
    let poll_interval = state.config.index_poll_interval;

    loop {
        match indexer.run_cycle().await {
            Ok(report) if report.selected == 0 => debug!("No unclassified transactions"),
            Ok(report) => info!(
                "Classified {} of {} transactions: {} swaps, {} undefined ({} abandoned), {} deferred",
                report.updated, report.selected, report.swaps, report.undefined, report.abandoned, report.deferred
            ),
            Err(e) => error!("Indexing cycle failed: {}", e),
        }

        tokio::select! {
            _ = sleep(poll_interval) => {}
            _ = shutdown.cancelled() => {
                info!("Shutting down transaction indexing");
                break;
            }
        }
    }
}
