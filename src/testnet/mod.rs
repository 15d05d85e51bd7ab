//! Fixtures shared by the unit tests: small ledgers, dispatchers and a
//! deterministic keypair.

pub mod test_utils;

pub use test_utils::*;
