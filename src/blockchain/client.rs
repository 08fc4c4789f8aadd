use crate::blockchain::models::{extract_transaction, FetchedTransaction};
use crate::config::Config;
use crate::models::SignatureStatus;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::RpcRequest;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    RpcError(#[from] solana_client::client_error::ClientError),

    #[error("Invalid signature: {0}")]
    SignatureError(String),

    #[error("Invalid public key: {0}")]
    PubkeyError(String),
}

/// The chain capabilities the indexer consumes.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Signatures involving `address`, newest first, strictly older than
    /// `before` and strictly newer than `until`.
    async fn get_signatures_for_address(
        &self,
        address: &str,
        before: Option<&str>,
        until: Option<&str>,
    ) -> Result<Vec<SignatureStatus>, ClientError>;

    /// Full transaction body, or `None` when the node has none for the signature.
    async fn get_transaction(&self, signature: &str) -> Result<Option<FetchedTransaction>, ClientError>;

    /// Raw account data, or `None` when the account doesn't exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ClientError>;
}

pub struct SolanaClient {
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl SolanaClient {
    pub fn new(config: &Config) -> Self {
        let rpc_url = &config.solana_rpc_url;
        let timeout = Duration::from_secs(config.rpc_timeout_secs);

        // Use commitment level from config or default to "confirmed"
        let commitment = match config.solana_commitment_level.as_str() {
            "processed" => CommitmentConfig::processed(),
            "confirmed" => CommitmentConfig::confirmed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        };

        info!("Initializing Solana client with RPC endpoint: {}, commitment: {:?}", rpc_url, commitment);

        let rpc_client = RpcClient::new_with_timeout_and_commitment(
            rpc_url.clone(),
            timeout,
            commitment,
        );

        let rate_limiter = config
            .rpc_rate_limit
            .and_then(NonZeroU32::new)
            .map(|per_second| RateLimiter::direct(Quota::per_second(per_second)));

        Self {
            rpc_client,
            commitment,
            rate_limiter,
        }
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }
}

fn parse_signature(signature: &str) -> Result<Signature, ClientError> {
    Signature::from_str(signature).map_err(|_| ClientError::SignatureError(signature.to_string()))
}

#[async_trait]
impl ChainRpc for SolanaClient {
    async fn get_signatures_for_address(
        &self,
        address: &str,
        before: Option<&str>,
        until: Option<&str>,
    ) -> Result<Vec<SignatureStatus>, ClientError> {
        // Parse address to pubkey
        let pubkey = Pubkey::from_str(address)
            .map_err(|_| ClientError::PubkeyError(address.to_string()))?;

        let before = before.map(parse_signature).transpose()?;
        let until = until.map(parse_signature).transpose()?;

        self.throttle().await;
        let signatures = self.rpc_client.get_signatures_for_address_with_config(
            &pubkey,
            GetConfirmedSignaturesForAddress2Config {
                before,
                until,
                limit: None,
                commitment: Some(self.commitment),
            },
        ).await?;

        Ok(signatures.into_iter().map(SignatureStatus::from).collect())
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<FetchedTransaction>, ClientError> {
        // Validate before spending a request on it
        parse_signature(signature)?;

        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        self.throttle().await;
        // The typed helper turns a null result into a deserialization error,
        // so issue the request directly to tell "missing" apart from failure.
        let tx: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .rpc_client
            .send(RpcRequest::GetTransaction, json!([signature, config]))
            .await?;

        match tx {
            Some(tx) => Ok(extract_transaction(signature, &tx)),
            None => {
                debug!("Node returned no transaction for {}", signature);
                Ok(None)
            }
        }
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ClientError> {
        self.throttle().await;
        let account = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await?
            .value;

        if account.is_none() {
            warn!("Account {} not found", address);
        }

        Ok(account.map(|account| account.data))
    }
}
