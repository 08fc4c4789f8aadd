//! Static token directory: mint → symbol and decimal precision, plus the
//! program whose invocation marks a transaction as a swap.
//!
//! The directory is loaded once at startup from the Mango v4 group metadata
//! endpoint and never refreshed.

use crate::config::Config;
use crate::validation::{parse_pubkey, ValidationError};
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Group {0} not found in token metadata")]
    GroupNotFound(String),

    #[error("Invalid swap program: {0}")]
    InvalidProgram(#[from] ValidationError),
}

/// Symbol resolved for a mint. Mints missing from the directory keep their
/// raw address so they can still be counted, but they never take part in PnL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenSymbol {
    Known(String),
    Unresolved(String),
}

impl TokenSymbol {
    pub fn as_str(&self) -> &str {
        match self {
            TokenSymbol::Known(symbol) => symbol,
            TokenSymbol::Unresolved(mint) => mint,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, TokenSymbol::Known(_))
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Deserialize)]
struct GroupMetadata {
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Group {
    public_key: String,
    #[serde(default)]
    tokens: Vec<TokenInfo>,
}

#[derive(Debug, Clone)]
pub struct TokenDirectory {
    by_mint: HashMap<String, TokenInfo>,
    by_symbol: HashMap<String, TokenInfo>,
    swap_program: Pubkey,
}

impl TokenDirectory {
    pub fn new(tokens: Vec<TokenInfo>, swap_program: Pubkey) -> Self {
        let mut by_mint = HashMap::with_capacity(tokens.len());
        let mut by_symbol = HashMap::with_capacity(tokens.len());

        for token in tokens {
            by_symbol.entry(token.symbol.clone()).or_insert_with(|| token.clone());
            by_mint.insert(token.mint.clone(), token);
        }

        Self { by_mint, by_symbol, swap_program }
    }

    /// Loads the directory from the configured metadata endpoint, retrying
    /// transient HTTP failures with exponential backoff.
    pub async fn fetch(config: &Config) -> Result<Self, MetadataError> {
        let swap_program = parse_pubkey("SWAP_PROGRAM_ID", &config.swap_program_id)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.metadata_timeout_secs))
            .build()?;

        let tokens = (|| fetch_group_tokens(&client, &config.metadata_url, &config.metadata_group))
            .retry(ExponentialBuilder::default().with_max_times(5))
            .when(|e| matches!(e, MetadataError::Http(_)))
            .notify(|e, delay| warn!("Token metadata fetch failed: {}, retrying in {:?}", e, delay))
            .await?;

        info!(
            "Loaded {} tokens from group {}, swap program {}",
            tokens.len(),
            config.metadata_group,
            swap_program
        );

        Ok(Self::new(tokens, swap_program))
    }

    pub fn symbol_for_mint(&self, mint: &str) -> TokenSymbol {
        match self.by_mint.get(mint) {
            Some(token) => TokenSymbol::Known(token.symbol.clone()),
            None => TokenSymbol::Unresolved(mint.to_string()),
        }
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenInfo> {
        self.by_symbol.get(symbol)
    }

    pub fn swap_program(&self) -> &Pubkey {
        &self.swap_program
    }

    pub fn len(&self) -> usize {
        self.by_mint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mint.is_empty()
    }
}

async fn fetch_group_tokens(
    client: &reqwest::Client,
    url: &str,
    group: &str,
) -> Result<Vec<TokenInfo>, MetadataError> {
    let metadata: GroupMetadata = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    metadata
        .groups
        .into_iter()
        .find(|g| g.public_key == group)
        .map(|g| g.tokens)
        .ok_or_else(|| MetadataError::GroupNotFound(group.to_string()))
}
