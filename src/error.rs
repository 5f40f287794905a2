//! Error types for PebbleChain

use std::fmt;

#[derive(Debug, Clone)]
pub enum ChainError {
    InvalidBlock(String),
    InvalidTransaction(String),
    InvalidPeerAddress(String),
    CryptoError(String),
    NetworkError(String),
    SerializationError(String),
    MiningCancelled,
    StaleMiningAttempt,
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            ChainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            ChainError::InvalidPeerAddress(msg) => write!(f, "Invalid peer address: {}", msg),
            ChainError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            ChainError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ChainError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            ChainError::MiningCancelled => write!(f, "Mining was cancelled"),
            ChainError::StaleMiningAttempt => {
                write!(f, "Chain tip changed while mining; mined block discarded")
            }
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::NetworkError(err.to_string())
    }
}

impl From<hex::FromHexError> for ChainError {
    fn from(err: hex::FromHexError) -> Self {
        ChainError::CryptoError(format!("Invalid hex: {}", err))
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
