//! Test utilities for ledger testing

use crate::config::{Settings, SignaturePolicy};
use crate::core::Blockchain;
use crate::network::RequestDispatcher;
use crate::wallet::Wallet;
use num_bigint::BigUint;

/// Hash-rate benchmark size used by test ledgers
pub const TEST_BENCHMARK_ITERATIONS: u64 = 1_000;

/// Empty ledger with a cheap benchmark
pub fn create_test_blockchain() -> Blockchain {
    Blockchain::with_benchmark_iterations(TEST_BENCHMARK_ITERATIONS)
}

/// Ledger with one sealed block per `(data, difficulty)` entry
pub fn seeded_test_blockchain(entries: &[(&str, u32)]) -> Blockchain {
    let mut blockchain = create_test_blockchain();
    for (data, difficulty) in entries {
        let block = blockchain.new_block(data, *difficulty).unwrap();
        blockchain.add_block(block).unwrap();
    }
    blockchain
}

/// Default settings with an easy genesis block and a cheap benchmark
pub fn test_settings(policy: SignaturePolicy) -> Settings {
    Settings {
        genesis_difficulty: 1,
        signature_policy: policy,
        hash_benchmark_iterations: TEST_BENCHMARK_ITERATIONS,
        ..Settings::default()
    }
}

/// Dispatcher over a ledger holding only the genesis block
pub fn test_dispatcher(policy: SignaturePolicy) -> RequestDispatcher {
    RequestDispatcher::with_genesis(&test_settings(policy)).unwrap()
}

/// Deterministic keypair from two fixed ~200-bit primes
pub fn test_wallet() -> Wallet {
    let p: BigUint = "1606938044258990275541962092341162602522202993782792835301611"
        .parse()
        .unwrap();
    let q: BigUint = "3213876088517980551083924184682325205044405987565585670615297"
        .parse()
        .unwrap();
    Wallet::from_primes(&p, &q).unwrap()
}
