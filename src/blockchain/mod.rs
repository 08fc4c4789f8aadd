pub mod backfill;
pub mod client;
pub mod extractor;
pub mod indexer;
pub mod lookup;
pub mod models;

// Re-exports for convenience
pub use backfill::start_backfill;
pub use client::{ChainRpc, SolanaClient};
pub use indexer::start_indexing;

/// Waits for a loop task to finish after shutdown. A task that panicked or
/// was aborted is logged and reported as `false`.
pub async fn join_loop(name: &str, handle: tokio::task::JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("{} task failed: {}", name, e);
            false
        }
    }
}
