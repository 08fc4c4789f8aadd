use crate::blockchain::client::{ChainRpc, ClientError};
use crate::db::transaction;
use crate::error::IndexerError;
use crate::models::{Account, SignatureStatus};
use crate::state::AppState;
use backon::{ExponentialBuilder, Retryable};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lower boundary of a backfill pass, derived from what is already stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillCursor {
    pub last_slot: Option<i64>,
    /// Latest signature stored in a slot below `last_slot`. The pass stops
    /// there, so the whole `last_slot` is fetched again in case it was only
    /// partially stored.
    pub until: Option<String>,
}

impl BackfillCursor {
    pub async fn load(pool: &SqlitePool, wallet_id: i64) -> Result<Self, sqlx::Error> {
        let Some(last_slot) = transaction::latest_slot(pool, wallet_id).await? else {
            return Ok(Self::default());
        };

        let until = transaction::last_signature_before_slot(pool, wallet_id, last_slot).await?;

        Ok(Self {
            last_slot: Some(last_slot),
            until,
        })
    }
}

pub async fn start_backfill(state: Arc<AppState>, shutdown: CancellationToken) {
    info!("Starting signature backfill for wallet {}", state.wallet.address);

    let poll_interval = state.config.signature_poll_interval;

    loop {
        match backfill_pass(state.rpc.as_ref(), &state.db_pool, &state.wallet).await {
            Ok(0) => debug!("No new signatures for {}", state.wallet.address),
            Ok(count) => info!("Stored {} new signatures for {}", count, state.wallet.address),
            Err(e) => error!("Signature backfill failed: {}", e),
        }

        tokio::select! {
            _ = sleep(poll_interval) => {}
            _ = shutdown.cancelled() => {
                info!("Shutting down signature backfill");
                break;
            }
        }
    }
}

/// Walks the wallet's history backwards from the chain head down to the
/// cursor boundary, staging each page as it arrives, then stores the walk
/// oldest-first. A walk interrupted by an RPC failure resumes below its
/// oldest staged signature on the next pass. Returns the number of newly
/// inserted signatures.
pub async fn backfill_pass(
    rpc: &dyn ChainRpc,
    pool: &SqlitePool,
    wallet: &Account,
) -> Result<u64, IndexerError> {
    let cursor = BackfillCursor::load(pool, wallet.id).await?;
    let until = cursor.until.as_deref();

    let mut before = transaction::oldest_staged_signature(pool, wallet.id).await?;
    if let Some(resume) = &before {
        info!("Resuming backfill of {} before {}", wallet.address, resume);
    }

    loop {
        debug!(
            "Fetching signatures for {} last_slot={:?} before={:?} until={:?}",
            wallet.address, cursor.last_slot, before, until
        );

        let page = fetch_page(rpc, &wallet.address, before.as_deref(), until).await?;
        debug!("Fetched {} signatures", page.len());

        let Some(oldest) = page.last() else {
            break;
        };

        if before.as_deref() == Some(oldest.signature.as_str()) {
            warn!("Signature page for {} made no progress, ending pass", wallet.address);
            break;
        }

        let oldest = oldest.signature.clone();
        transaction::stage_signatures(pool, wallet.id, &page).await?;
        before = Some(oldest);
    }

    let inserted = transaction::promote_staged(pool, wallet.id).await?;
    if inserted > 0 {
        debug!("Inserted {} signatures for {}", inserted, wallet.address);
    }

    Ok(inserted)
}

async fn fetch_page(
    rpc: &dyn ChainRpc,
    address: &str,
    before: Option<&str>,
    until: Option<&str>,
) -> Result<Vec<SignatureStatus>, ClientError> {
    (|| rpc.get_signatures_for_address(address, before, until))
        .retry(ExponentialBuilder::default().with_max_times(3))
        .when(|e| matches!(e, ClientError::RpcError(_)))
        .notify(|e, delay| warn!("Signature fetch for {} failed: {}, retrying in {:?}", address, e, delay))
        .await
}
