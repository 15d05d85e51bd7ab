//! Utility functions and helpers
//!
//! This module contains the digest, timestamp and prime-generation helpers
//! used by the ledger and the signature utility.

pub mod crypto;

pub use crypto::{
    current_timestamp, generate_probable_prime, is_probable_prime, sha256_digest, sha256_hex,
    PRIMALITY_ROUNDS,
};
