//! Client key management
//!
//! This module handles keypair generation, request signing, signature
//! verification against a supplied public key, and identity derivation.

#[allow(clippy::module_inception)]
pub mod wallet;

pub use wallet::{
    derive_identity, message_digest, verify_signature, Wallet, CLIENT_ID_LEN, PRIME_BITS,
    PUBLIC_EXPONENT,
};
