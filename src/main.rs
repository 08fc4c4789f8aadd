// Load configuration
// Set up logging
// Open the database and resolve the indexed wallet
// Load the token directory
// Start the signature backfill and indexing loops
// Run until Ctrl-C

use wallet_swap_indexer::{
    blockchain::{self, SolanaClient},
    cache,
    config::Config,
    db::{account, connection},
    state::AppState,
    tokens::TokenDirectory,
    validation::parse_pubkey,
};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wallet-swap-indexer");

    // Load configuration
    let config = Config::from_env();
    parse_pubkey("WALLET_PK", &config.wallet_address)?;

    // Setup database connection
    let db_pool = connection::establish_connection(&config.database_url).await?;
    info!("Database connection established");

    if let Some(label) = &config.wallet_label {
        account::add_account(&db_pool, &config.wallet_address, Some(label.as_str())).await?;
    }

    let wallet = match account::resolve_wallet(&db_pool, &config.wallet_address).await {
        Ok(wallet) => wallet,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Indexing wallet {} id={} pk={}",
        wallet.label.as_deref().unwrap_or("<unlabeled>"),
        wallet.id,
        wallet.address
    );

    let tokens = Arc::new(TokenDirectory::fetch(&config).await?);
    let lookup_cache = cache::init_cache(&config);
    let rpc = Arc::new(SolanaClient::new(&config));

    let state = Arc::new(AppState {
        config,
        db_pool,
        rpc,
        tokens,
        lookup_cache,
        wallet,
    });

    let shutdown = CancellationToken::new();

    let backfill = tokio::spawn(blockchain::start_backfill(state.clone(), shutdown.clone()));
    let indexing = tokio::spawn(blockchain::start_indexing(state.clone(), shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    blockchain::join_loop("Signature backfill", backfill).await;
    blockchain::join_loop("Transaction indexing", indexing).await;

    info!("Stopped");
    Ok(())
}
