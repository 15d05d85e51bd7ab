//! # Signed Ledger
//!
//! A single-node, append-only proof-of-work ledger that accepts requests only
//! from clients who prove possession of an RSA private key.
//!
//! ## Layout
//! - `core/`: block record, SHA-256 proof-of-work, ledger validation and repair
//! - `wallet/`: textbook RSA keypairs, signing, verification, client identity
//! - `network/`: JSON envelopes, the verifying dispatcher, TCP server and client
//! - `config/`: layered node settings (defaults, TOML file, environment)
//! - `cli/`: command-line parsing and the interactive menu
//! - `utils/`: digest, timestamp and prime helpers
//!
//! Blocks carry free-form text, not transactions; there is no peer network,
//! no persistence and no difficulty retargeting. Signatures use unpadded RSA
//! over the raw digest and are for demonstration only.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

pub use cli::{Command, Opt};
pub use config::{Config, Settings, SignaturePolicy, GLOBAL_CONFIG};
pub use core::{
    Block, Blockchain, CancellationToken, ChainValidation, ProofOfWork, MAX_DIFFICULTY,
};
pub use error::{LedgerError, Result};
pub use network::{
    seed_genesis, LedgerClient, LedgerService, Operation, RequestDispatcher, RequestMessage,
    ResponseMessage, ResponsePayload, ResponseStatus, Server,
};
pub use utils::{current_timestamp, sha256_hex};
pub use wallet::{derive_identity, verify_signature, Wallet};
