use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_hex;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A SHA-256 hex digest has 64 characters, so no nonce satisfies more zeros
pub const MAX_DIFFICULTY: u32 = 64;

/// Number of digests timed by the hash-rate benchmark
pub const DEFAULT_BENCHMARK_ITERATIONS: u64 = 2_000_000;

const BENCHMARK_INPUT: &[u8] = b"00000000";

// The cancellation flag is polled once per this many attempts
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Cooperative cancellation flag shared between a seal and whoever may stop it
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Clear the flag so the token can guard the next search
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

pub struct ProofOfWork {
    block: Block,
}

impl ProofOfWork {
    pub fn new_proof_of_work(block: Block) -> ProofOfWork {
        ProofOfWork { block }
    }

    /// Digest of the block's canonical string, lowercase hex
    pub fn digest(block: &Block) -> String {
        sha256_hex(block.canonical_string().as_bytes())
    }

    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let difficulty = difficulty as usize;
        hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// Validate the seal of a block as it currently stands
    pub fn validate(block: &Block) -> bool {
        Self::meets_difficulty(&Self::digest(block), block.get_difficulty())
    }

    /// Search nonces after the block's current one until the digest is sealed.
    /// Returns the winning nonce and digest; the wrapped block is not modified.
    pub fn run(&self, cancel: Option<&CancellationToken>) -> Result<(u64, String)> {
        let difficulty = self.block.get_difficulty();
        if difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Mining(format!(
                "Difficulty {difficulty} exceeds the maximum of {MAX_DIFFICULTY}"
            )));
        }

        let mut candidate = self.block.clone();
        let mut nonce = candidate.get_nonce();
        let mut attempts: u64 = 0;
        loop {
            nonce = nonce
                .checked_add(1)
                .ok_or_else(|| LedgerError::Mining("Nonce space exhausted".to_string()))?;
            candidate.set_nonce(nonce);
            let hash = Self::digest(&candidate);
            if Self::meets_difficulty(&hash, difficulty) {
                debug!("Sealed block {} after {} attempts", candidate.get_index(), attempts + 1);
                return Ok((nonce, hash));
            }

            attempts += 1;
            if attempts % CANCEL_CHECK_INTERVAL == 0 {
                if let Some(token) = cancel {
                    if token.is_cancelled() {
                        info!(
                            "Proof-of-work for block {} cancelled after {attempts} attempts",
                            candidate.get_index()
                        );
                        return Err(LedgerError::Cancelled);
                    }
                }
            }
        }
    }

    /// Run the search to completion and store the winning nonce in the block
    pub fn seal(block: &mut Block) -> Result<String> {
        Self::seal_with_cancel(block, None)
    }

    pub fn seal_with_cancel(block: &mut Block, cancel: Option<&CancellationToken>) -> Result<String> {
        info!(
            "Starting proof-of-work for block {} with difficulty {}",
            block.get_index(),
            block.get_difficulty()
        );
        let pow = ProofOfWork::new_proof_of_work(block.clone());
        let (nonce, hash) = pow.run(cancel)?;
        block.set_nonce(nonce);
        info!("Proof-of-work completed for block {}: {hash}", block.get_index());
        Ok(hash)
    }

    /// Time `iterations` digests of a constant input and report hashes per second
    pub fn benchmark(iterations: u64) -> u64 {
        let start = Instant::now();
        for _ in 0..iterations {
            std::hint::black_box(sha256_hex(std::hint::black_box(BENCHMARK_INPUT)));
        }
        let seconds = start.elapsed().as_secs_f64();
        if seconds <= 0.0 {
            return iterations;
        }
        (iterations as f64 / seconds) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_block(difficulty: u32) -> Block {
        Block::with_timestamp(1, 1_700_000_000_000, "tx1", difficulty)
    }

    #[test]
    fn test_seal_meets_difficulty() {
        for difficulty in 0..=3 {
            let mut block = create_test_block(difficulty);
            let hash = ProofOfWork::seal(&mut block).unwrap();

            assert!(hash.starts_with(&"0".repeat(difficulty as usize)));
            assert_eq!(hash, block.calculate_hash());
            assert!(ProofOfWork::validate(&block));
        }
    }

    #[test]
    fn test_seal_advances_nonce() {
        let mut block = create_test_block(0);
        ProofOfWork::seal(&mut block).unwrap();
        assert_eq!(block.get_nonce(), 1);
        ProofOfWork::seal(&mut block).unwrap();
        assert_eq!(block.get_nonce(), 2);
    }

    #[test]
    fn test_run_leaves_block_untouched() {
        let block = create_test_block(2);
        let pow = ProofOfWork::new_proof_of_work(block.clone());
        let (nonce, hash) = pow.run(None).unwrap();

        assert_eq!(pow.block, block);
        let mut sealed = block;
        sealed.set_nonce(nonce);
        assert_eq!(sealed.calculate_hash(), hash);
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(ProofOfWork::meets_difficulty("00ab", 0));
        assert!(ProofOfWork::meets_difficulty("00ab", 2));
        assert!(!ProofOfWork::meets_difficulty("00ab", 3));
        assert!(!ProofOfWork::meets_difficulty("0", 2));
    }

    #[test]
    fn test_unsatisfiable_difficulty_rejected() {
        let mut block = create_test_block(MAX_DIFFICULTY + 1);
        assert!(matches!(
            ProofOfWork::seal(&mut block),
            Err(LedgerError::Mining(_))
        ));
        assert_eq!(block.get_nonce(), 0);
    }

    #[test]
    fn test_cancelled_seal_stops() {
        // 40 leading zeros would never be found; cancellation must end the search
        let mut block = create_test_block(40);
        let token = CancellationToken::new();
        token.cancel();

        let result = ProofOfWork::seal_with_cancel(&mut block, Some(&token));
        assert_eq!(result, Err(LedgerError::Cancelled));
        assert_eq!(block.get_nonce(), 0);
    }

    #[test]
    fn test_cancellation_token_reset() {
        let token = CancellationToken::new();
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!shared.is_cancelled());
    }

    #[test]
    fn test_benchmark_reports_positive_rate() {
        assert!(ProofOfWork::benchmark(1_000) > 0);
    }
}
