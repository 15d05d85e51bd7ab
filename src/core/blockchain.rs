// The ledger manager: an in-memory, index-addressed arena of blocks plus the
// cached digest of the newest one. Genesis seeding belongs to the owning
// service (see network::dispatcher), not to this type.

use crate::core::proof_of_work::DEFAULT_BENCHMARK_ITERATIONS;
use crate::core::{Block, CancellationToken, ProofOfWork};
use crate::error::{LedgerError, Result};
use log::{info, warn};
use std::fmt;

/// Outcome of walking the chain. A broken chain is an expected answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainValidation {
    Valid,
    /// Block digest no longer carries its difficulty in leading zeros
    InvalidProofOfWork { index: usize },
    /// Stored previous hash differs from the digest of the preceding block
    InvalidLinkage { index: usize },
    /// Cached chain hash differs from the digest of the last block
    InvalidChainHash,
}

impl ChainValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainValidation::Valid)
    }

    /// Index of the first offending block, when the failure is block-local
    pub fn failed_block(&self) -> Option<usize> {
        match self {
            ChainValidation::InvalidProofOfWork { index }
            | ChainValidation::InvalidLinkage { index } => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for ChainValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainValidation::Valid => write!(f, "Chain Validation : TRUE"),
            ChainValidation::InvalidProofOfWork { index } => write!(
                f,
                "Chain Validation : FALSE Error: Invalid proof of work in block {index}"
            ),
            ChainValidation::InvalidLinkage { index } => write!(
                f,
                "Chain Validation : FALSE Error: Invalid hash chain at block {index}"
            ),
            ChainValidation::InvalidChainHash => {
                write!(f, "Chain Validation : FALSE Error: Invalid chain hash")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    chain_hash: String, // digest of the most recently appended block
    hashes_per_second: u64,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Create an empty chain and measure this machine's hash rate
    pub fn new() -> Blockchain {
        Self::with_benchmark_iterations(DEFAULT_BENCHMARK_ITERATIONS)
    }

    pub fn with_benchmark_iterations(iterations: u64) -> Blockchain {
        let hashes_per_second = ProofOfWork::benchmark(iterations);
        info!("Measured {hashes_per_second} hashes per second over {iterations} digests");
        Blockchain {
            blocks: Vec::new(),
            chain_hash: String::new(),
            hashes_per_second,
        }
    }

    /// Build the next block for this chain, indexed at the current size
    pub fn new_block(&self, data: &str, difficulty: u32) -> Result<Block> {
        Block::new_block(self.blocks.len(), data, difficulty)
    }

    /// Link, seal and append a block. Returns the new chain hash.
    pub fn add_block(&mut self, block: Block) -> Result<String> {
        self.add_block_with_cancel(block, None)
    }

    /// Like `add_block`; a cancelled seal leaves the chain untouched
    pub fn add_block_with_cancel(
        &mut self,
        mut block: Block,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        if let Some(latest) = self.blocks.last() {
            block.set_previous_hash(latest.calculate_hash());
        }
        ProofOfWork::seal_with_cancel(&mut block, cancel)?;

        let hash = block.calculate_hash();
        info!(
            "Appended block {} (difficulty {}, nonce {}): {hash}",
            block.get_index(),
            block.get_difficulty(),
            block.get_nonce()
        );
        self.blocks.push(block);
        self.chain_hash = hash.clone();
        Ok(hash)
    }

    /// Walk the chain front to back and report the first violation
    pub fn is_chain_valid(&self) -> ChainValidation {
        let latest = match self.blocks.last() {
            Some(block) => block,
            None => return ChainValidation::Valid,
        };

        let mut previous_hash: Option<String> = None;
        for (i, block) in self.blocks.iter().enumerate() {
            let hash = block.calculate_hash();
            if !ProofOfWork::meets_difficulty(&hash, block.get_difficulty()) {
                return ChainValidation::InvalidProofOfWork { index: i };
            }
            if let Some(expected) = previous_hash {
                if block.get_previous_hash() != expected {
                    return ChainValidation::InvalidLinkage { index: i };
                }
            }
            previous_hash = Some(hash);
        }

        if self.chain_hash != latest.calculate_hash() {
            return ChainValidation::InvalidChainHash;
        }
        ChainValidation::Valid
    }

    /// Relink and reseal every block, then reset the chain hash.
    ///
    /// This always restores a valid chain, whatever broke it, which is exactly
    /// why proof-of-work alone does not make tampering evident.
    pub fn repair_chain(&mut self) -> Result<()> {
        self.repair_chain_with_cancel(None)
    }

    pub fn repair_chain_with_cancel(&mut self, cancel: Option<&CancellationToken>) -> Result<()> {
        for i in 0..self.blocks.len() {
            if i > 0 {
                let previous = self.blocks[i - 1].calculate_hash();
                self.blocks[i].set_previous_hash(previous);
            }
            ProofOfWork::seal_with_cancel(&mut self.blocks[i], cancel)?;
        }

        if let Some(latest) = self.blocks.last() {
            self.chain_hash = latest.calculate_hash();
        }
        info!("Repaired chain of {} blocks", self.blocks.len());
        Ok(())
    }

    /// Overwrite a block's data in place, leaving its seal and linkage stale
    pub fn corrupt_block(&mut self, index: usize, new_data: &str) -> Result<()> {
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(LedgerError::BlockNotFound { index })?;
        block.set_data(new_data);
        warn!("Block {index} data overwritten with {new_data:?}");
        Ok(())
    }

    pub fn get_chain_size(&self) -> usize {
        self.blocks.len()
    }

    pub fn get_block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn get_latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn get_blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn get_chain_hash(&self) -> &str {
        self.chain_hash.as_str()
    }

    pub fn get_hashes_per_second(&self) -> u64 {
        self.hashes_per_second
    }

    pub fn get_total_difficulty(&self) -> u64 {
        self.blocks
            .iter()
            .map(|block| u64::from(block.get_difficulty()))
            .sum()
    }

    /// Sum of 16^difficulty: expected trials under a uniform digest model
    pub fn get_total_expected_hashes(&self) -> f64 {
        self.blocks
            .iter()
            .map(|block| 16f64.powi(block.get_difficulty() as i32))
            .sum()
    }

    /// Multi-line human-readable summary of the chain
    pub fn status_report(&self) -> String {
        let (latest_difficulty, latest_nonce) = match self.get_latest_block() {
            Some(block) => (
                block.get_difficulty().to_string(),
                block.get_nonce().to_string(),
            ),
            None => ("n/a".to_string(), "n/a".to_string()),
        };

        format!(
            "Current size of chain: {}\n\
             Difficulty of most recent block: {}\n\
             Total difficulty for all blocks: {}\n\
             Approximate hashes per second on this machine: {}\n\
             Expected total hashes required for the whole chain: {:.1}\n\
             Nonce for most recent block: {}\n\
             Chain hash: {}",
            self.get_chain_size(),
            latest_difficulty,
            self.get_total_difficulty(),
            self.hashes_per_second,
            self.get_total_expected_hashes(),
            latest_nonce,
            self.chain_hash
        )
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for (i, block) in self.blocks.iter().enumerate() {
            let separator = if i + 1 < self.blocks.len() { "," } else { "" };
            writeln!(f, "{block}{separator}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{create_test_blockchain, seeded_test_blockchain};

    #[test]
    fn test_empty_chain_is_valid() {
        let blockchain = create_test_blockchain();
        assert_eq!(blockchain.get_chain_size(), 0);
        assert!(blockchain.get_latest_block().is_none());
        assert!(blockchain.is_chain_valid().is_valid());
    }

    #[test]
    fn test_genesis_has_empty_previous_hash() {
        let blockchain = seeded_test_blockchain(&[("Genesis", 2)]);
        let genesis = blockchain.get_block(0).unwrap();

        assert_eq!(genesis.get_previous_hash(), "");
        assert_eq!(blockchain.get_chain_hash(), genesis.calculate_hash());
        assert!(blockchain.is_chain_valid().is_valid());
    }

    #[test]
    fn test_add_block_links_and_caches_hash() {
        let blockchain = seeded_test_blockchain(&[("Genesis", 2), ("tx1", 2), ("tx2", 1)]);

        for i in 1..blockchain.get_chain_size() {
            let previous = blockchain.get_block(i - 1).unwrap();
            let current = blockchain.get_block(i).unwrap();
            assert_eq!(current.get_previous_hash(), previous.calculate_hash());
            assert!(current.is_sealed());
        }
        assert_eq!(
            blockchain.get_chain_hash(),
            blockchain.get_latest_block().unwrap().calculate_hash()
        );
    }

    #[test]
    fn test_add_block_returns_chain_hash() {
        let mut blockchain = create_test_blockchain();
        let block = blockchain.new_block("Genesis", 1).unwrap();
        let hash = blockchain.add_block(block).unwrap();
        assert_eq!(hash, blockchain.get_chain_hash());
    }

    #[test]
    fn test_corrupt_breaks_validation_at_or_after_block() {
        let mut blockchain =
            seeded_test_blockchain(&[("Genesis", 2), ("tx1", 3), ("tx2", 2), ("tx3", 1)]);
        blockchain.corrupt_block(1, "stolen").unwrap();

        let result = blockchain.is_chain_valid();
        assert!(!result.is_valid());
        // a data change breaks the seal at block 1, unless the new digest happens
        // to keep the zeros, in which case linkage breaks at block 2
        let failed = result.failed_block().unwrap();
        assert!(failed == 1 || failed == 2, "failed at {failed}");
        assert_eq!(blockchain.get_block(1).unwrap().get_data(), "stolen");
    }

    #[test]
    fn test_corrupt_zero_difficulty_block_breaks_forward_linkage() {
        let mut blockchain = seeded_test_blockchain(&[("Genesis", 1), ("tx1", 0), ("tx2", 1)]);
        blockchain.corrupt_block(1, "stolen").unwrap();

        assert_eq!(
            blockchain.is_chain_valid(),
            ChainValidation::InvalidLinkage { index: 2 }
        );
    }

    #[test]
    fn test_corrupt_tail_with_zero_difficulty_breaks_chain_hash() {
        let mut blockchain = seeded_test_blockchain(&[("Genesis", 1), ("tx1", 0)]);
        blockchain.corrupt_block(1, "stolen").unwrap();

        assert_eq!(
            blockchain.is_chain_valid(),
            ChainValidation::InvalidChainHash
        );
    }

    #[test]
    fn test_corrupt_out_of_range() {
        let mut blockchain = seeded_test_blockchain(&[("Genesis", 1)]);
        assert_eq!(
            blockchain.corrupt_block(5, "x"),
            Err(LedgerError::BlockNotFound { index: 5 })
        );
    }

    #[test]
    fn test_repair_restores_validity() {
        let mut blockchain = seeded_test_blockchain(&[("Genesis", 2), ("tx1", 2), ("tx2", 2)]);
        blockchain.corrupt_block(0, "rewritten genesis").unwrap();
        blockchain.corrupt_block(2, "rewritten tail").unwrap();
        assert!(!blockchain.is_chain_valid().is_valid());

        blockchain.repair_chain().unwrap();
        assert!(blockchain.is_chain_valid().is_valid());
        assert_eq!(blockchain.get_block(0).unwrap().get_data(), "rewritten genesis");
        assert_eq!(
            blockchain.get_chain_hash(),
            blockchain.get_latest_block().unwrap().calculate_hash()
        );
    }

    #[test]
    fn test_repair_on_uncorrupted_chain_keeps_it_valid() {
        let mut blockchain = seeded_test_blockchain(&[("Genesis", 1), ("tx1", 1)]);
        blockchain.repair_chain().unwrap();
        assert!(blockchain.is_chain_valid().is_valid());
    }

    #[test]
    fn test_repair_empty_chain() {
        let mut blockchain = create_test_blockchain();
        blockchain.repair_chain().unwrap();
        assert!(blockchain.is_chain_valid().is_valid());
        assert_eq!(blockchain.get_chain_hash(), "");
    }

    #[test]
    fn test_cancelled_add_leaves_chain_untouched() {
        let mut blockchain = seeded_test_blockchain(&[("Genesis", 1)]);
        let chain_hash = blockchain.get_chain_hash().to_string();
        let token = CancellationToken::new();
        token.cancel();

        let block = blockchain.new_block("never sealed", 40).unwrap();
        let result = blockchain.add_block_with_cancel(block, Some(&token));

        assert_eq!(result, Err(LedgerError::Cancelled));
        assert_eq!(blockchain.get_chain_size(), 1);
        assert_eq!(blockchain.get_chain_hash(), chain_hash);
    }

    #[test]
    fn test_totals() {
        let blockchain = seeded_test_blockchain(&[("Genesis", 2), ("tx1", 1), ("tx2", 0)]);
        assert_eq!(blockchain.get_total_difficulty(), 3);
        assert_eq!(blockchain.get_total_expected_hashes(), 256.0 + 16.0 + 1.0);
    }

    #[test]
    fn test_get_block_out_of_range() {
        let blockchain = seeded_test_blockchain(&[("Genesis", 0)]);
        assert!(blockchain.get_block(0).is_some());
        assert!(blockchain.get_block(1).is_none());
    }

    #[test]
    fn test_status_report_lines() {
        let blockchain = seeded_test_blockchain(&[("Genesis", 2)]);
        let report = blockchain.status_report();

        assert!(report.starts_with("Current size of chain: 1\n"));
        assert!(report.contains("Difficulty of most recent block: 2"));
        assert!(report.contains("Total difficulty for all blocks: 2"));
        assert!(report.contains("Expected total hashes required for the whole chain: 256.0"));
        assert!(report.ends_with(&format!("Chain hash: {}", blockchain.get_chain_hash())));
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(ChainValidation::Valid.to_string(), "Chain Validation : TRUE");
        assert_eq!(
            ChainValidation::InvalidLinkage { index: 2 }.to_string(),
            "Chain Validation : FALSE Error: Invalid hash chain at block 2"
        );
        assert_eq!(ChainValidation::InvalidChainHash.failed_block(), None);
    }

    #[test]
    fn test_display_lists_blocks() {
        let blockchain = seeded_test_blockchain(&[("Genesis", 0), ("tx1", 0)]);
        let rendered = blockchain.to_string();
        assert!(rendered.starts_with("[\n{\"index\":0"));
        assert!(rendered.ends_with("}\n]"));
        assert_eq!(rendered.matches("\"index\"").count(), 2);
    }
}
