use bs58;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid Solana address format: {0}")]
    InvalidSolanaAddress(String),
}

pub fn validate_solana_address(address: &str) -> Result<(), ValidationError> {
    // Check if address is empty
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    // Decode base58 string
    let decoded = match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return Err(ValidationError::InvalidSolanaAddress(address.to_string())),
    };

    // Validate length (Solana addresses are 32 bytes)
    if decoded.len() != 32 {
        return Err(ValidationError::InvalidSolanaAddress(address.to_string()));
    }

    Ok(())
}

/// Validates a configured address and names the setting it came from when it is missing.
pub fn parse_pubkey(name: &str, value: &str) -> Result<Pubkey, ValidationError> {
    validate_solana_address(value).map_err(|e| match e {
        ValidationError::MissingParameter(_) => ValidationError::MissingParameter(name.to_string()),
        other => other,
    })?;

    Pubkey::from_str(value).map_err(|_| ValidationError::InvalidSolanaAddress(value.to_string()))
}
