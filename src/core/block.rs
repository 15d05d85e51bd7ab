use crate::core::ProofOfWork;
use crate::error::Result;
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One record of the ledger.
///
/// The external form is
/// `{"index":…,"timestamp":"…","data":"…","previousHash":"…","nonce":…,"difficulty":…}`.
/// Blocks are only mutated through the owning `Blockchain`, which is what lets
/// `corrupt` and `repair` act on an index instead of an aliased reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: usize,
    #[serde(with = "timestamp_string")]
    timestamp: i64,
    data: String,
    previous_hash: String,
    nonce: u64,
    difficulty: u32,
}

impl Block {
    /// Create an unsealed block stamped with the current time
    pub fn new_block(index: usize, data: &str, difficulty: u32) -> Result<Block> {
        Ok(Self::with_timestamp(
            index,
            current_timestamp()?,
            data,
            difficulty,
        ))
    }

    pub fn with_timestamp(index: usize, timestamp: i64, data: &str, difficulty: u32) -> Block {
        Block {
            index,
            timestamp,
            data: data.to_string(),
            previous_hash: String::new(),
            nonce: 0,
            difficulty,
        }
    }

    /// The six fields in fixed order, concatenated without separators
    pub fn canonical_string(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.index, self.timestamp, self.data, self.previous_hash, self.nonce, self.difficulty
        )
    }

    pub fn calculate_hash(&self) -> String {
        ProofOfWork::digest(self)
    }

    /// True when the current digest carries `difficulty` leading hex zeros
    pub fn is_sealed(&self) -> bool {
        ProofOfWork::meets_difficulty(&self.calculate_hash(), self.difficulty)
    }

    pub fn get_index(&self) -> usize {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_data(&self) -> &str {
        self.data.as_str()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub(crate) fn set_previous_hash(&mut self, previous_hash: String) {
        self.previous_hash = previous_hash;
    }

    pub(crate) fn set_data(&mut self, data: &str) {
        self.data = data.to_string();
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

// Timestamps are opaque on the wire, so they travel as strings
mod timestamp_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(timestamp: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<i64>().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_string_field_order() {
        let mut block = Block::with_timestamp(3, 1_700_000_000_000, "tx", 2);
        block.set_previous_hash("abc".to_string());
        block.set_nonce(42);
        assert_eq!(block.canonical_string(), "31700000000000txabc422");
    }

    #[test]
    fn test_digest_is_deterministic() {
        let block = Block::with_timestamp(0, 1, "Genesis", 2);
        assert_eq!(block.calculate_hash(), block.clone().calculate_hash());
        assert_eq!(block.calculate_hash().len(), 64);
    }

    #[test]
    fn test_digest_changes_with_data() {
        let block = Block::with_timestamp(0, 1, "Genesis", 2);
        let mut changed = block.clone();
        changed.set_data("Genesis!");
        assert_ne!(block.calculate_hash(), changed.calculate_hash());
    }

    #[test]
    fn test_new_block_is_unsealed_and_unlinked() {
        let block = Block::new_block(5, "payload", 1).unwrap();
        assert_eq!(block.get_index(), 5);
        assert_eq!(block.get_nonce(), 0);
        assert!(block.get_previous_hash().is_empty());
        assert!(block.get_timestamp() > 0);
    }

    #[test]
    fn test_external_serialization_shape() {
        let mut block = Block::with_timestamp(1, 1234, "tx1", 3);
        block.set_previous_hash("00ab".to_string());
        block.set_nonce(7);

        let json = block.to_string();
        assert_eq!(
            json,
            r#"{"index":1,"timestamp":"1234","data":"tx1","previousHash":"00ab","nonce":7,"difficulty":3}"#
        );

        let parsed: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_malformed_timestamp_rejected() {
        let json = r#"{"index":1,"timestamp":"yesterday","data":"","previousHash":"","nonce":0,"difficulty":0}"#;
        assert!(serde_json::from_str::<Block>(json).is_err());
    }
}
