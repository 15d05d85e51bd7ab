//! Error handling for the ledger
//!
//! This module provides the error type shared by the ledger, the signature
//! utility and the request protocol. Chain validation failures are not
//! errors; see `core::ChainValidation`.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error types for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Key generation or signature errors
    Crypto(String),
    /// Network communication errors
    Network(String),
    /// Malformed or unsupported protocol requests
    Protocol(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File and socket I/O errors
    Io(String),
    /// Block construction errors
    InvalidBlock(String),
    /// Block index outside the chain
    BlockNotFound { index: usize },
    /// Proof-of-work errors
    Mining(String),
    /// A proof-of-work search was cancelled before it found a nonce
    Cancelled,
    /// A thread panicked while holding the ledger lock
    LockPoisoned,
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Network(msg) => write!(f, "Network error: {msg}"),
            LedgerError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            LedgerError::BlockNotFound { index } => write!(f, "Block {index} not found"),
            LedgerError::Mining(msg) => write!(f, "Mining error: {msg}"),
            LedgerError::Cancelled => write!(f, "Proof-of-work search cancelled"),
            LedgerError::LockPoisoned => write!(f, "Ledger state unavailable: lock poisoned"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
