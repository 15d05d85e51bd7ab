//! Core ledger functionality
//!
//! This module contains the block record, the digest and proof-of-work
//! engine, and the ledger manager that links, validates and repairs the chain.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;

pub use block::Block;
pub use blockchain::{Blockchain, ChainValidation};
pub use proof_of_work::{
    CancellationToken, ProofOfWork, DEFAULT_BENCHMARK_ITERATIONS, MAX_DIFFICULTY,
};
