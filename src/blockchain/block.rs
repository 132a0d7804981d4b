use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

use super::canonical;
use super::transaction::Transaction;

/// Number of bytes in a block hash
pub const BLOCK_HASH_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid block hash: {0}")]
pub struct BlockHashError(String);

/// SHA-256 digest identifying a block, displayed as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockHash([u8; BLOCK_HASH_LEN]);

impl BlockHash {
    /// All-zero digest
    pub const ZERO: BlockHash = BlockHash([0; BLOCK_HASH_LEN]);

    pub fn as_bytes(&self) -> &[u8; BLOCK_HASH_LEN] {
        &self.0
    }
}

impl From<[u8; BLOCK_HASH_LEN]> for BlockHash {
    fn from(bytes: [u8; BLOCK_HASH_LEN]) -> Self {
        BlockHash(bytes)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for BlockHash {
    type Err = BlockHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| BlockHashError(e.to_string()))?;
        let bytes: [u8; BLOCK_HASH_LEN] = bytes
            .try_into()
            .map_err(|_| BlockHashError(format!("expected {} bytes", BLOCK_HASH_LEN)))?;
        Ok(BlockHash(bytes))
    }
}

impl TryFrom<String> for BlockHash {
    type Error = BlockHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlockHash> for String {
    fn from(hash: BlockHash) -> Self {
        hash.to_string()
    }
}

/// Represents a block in the blockchain
///
/// A block is a value: it is never mutated after construction and is
/// identified by [`Block::hash`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Proof of work candidate value
    nonce: u64,

    /// Hash of the previous block
    previous_hash: BlockHash,

    /// Transactions in insertion order
    transactions: Vec<Transaction>,

    /// Creation time in nanoseconds since the Unix epoch
    #[serde(rename = "time_stamp")]
    timestamp: i64,
}

impl Block {
    /// Creates a new block stamped with the current time
    pub fn new(nonce: u64, previous_hash: BlockHash, transactions: Vec<Transaction>) -> Self {
        Self::with_timestamp(nonce, previous_hash, transactions, now_nanos())
    }

    /// Creates a block with an explicit timestamp
    pub fn with_timestamp(
        nonce: u64,
        previous_hash: BlockHash,
        transactions: Vec<Transaction>,
        timestamp: i64,
    ) -> Self {
        Block {
            nonce,
            previous_hash,
            transactions,
            timestamp,
        }
    }

    /// The zero-valued placeholder whose hash seeds the genesis block
    pub fn zero() -> Self {
        Self::with_timestamp(0, BlockHash::ZERO, Vec::new(), 0)
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn previous_hash(&self) -> &BlockHash {
        &self.previous_hash
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Calculates the SHA-256 hash of the block's canonical encoding
    pub fn hash(&self) -> BlockHash {
        // Fixed-shape structs serialized into a Vec; serde_json cannot fail here
        let encoded = canonical::encode_block(self).expect("block encoding is infallible");
        BlockHash(Sha256::digest(&encoded).into())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nonce           {}", self.nonce)?;
        writeln!(f, "previous_hash   {}", self.previous_hash)?;
        writeln!(f, "transactions    {}", self.transactions.len())?;
        writeln!(f, "time_stamp      {}", self.timestamp)?;
        for transaction in &self.transactions {
            write!(f, "{}", transaction)?;
        }
        Ok(())
    }
}

fn now_nanos() -> i64 {
    let now = Utc::now();
    // Out of range only after the year 2262
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;

    fn transfer(value: f32) -> Transaction {
        let sender = Wallet::new();
        let recipient = Wallet::new();
        Transaction::new(sender.address().clone(), recipient.address().clone(), value).unwrap()
    }

    #[test]
    fn test_new_block() {
        let transactions = vec![transfer(10.0), transfer(20.0)];
        let block = Block::new(100, BlockHash::ZERO, transactions.clone());

        assert_eq!(block.nonce(), 100);
        assert_eq!(block.previous_hash(), &BlockHash::ZERO);
        assert_eq!(block.transactions(), transactions.as_slice());
        assert!(block.timestamp() > 0);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let transactions = vec![transfer(1.0), transfer(2.0)];
        let a = Block::with_timestamp(5, BlockHash::ZERO, transactions.clone(), 1_000);
        let b = Block::with_timestamp(5, BlockHash::ZERO, transactions, 1_000);

        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().to_string().len(), 64);
    }

    #[test]
    fn test_hash_changes_with_any_field() {
        let first = transfer(1.0);
        let second = transfer(2.0);
        let both = vec![first.clone(), second.clone()];
        let base = Block::with_timestamp(5, BlockHash::ZERO, both.clone(), 1_000);

        let other_nonce = Block::with_timestamp(6, BlockHash::ZERO, both.clone(), 1_000);
        let other_prev = Block::with_timestamp(5, base.hash(), both.clone(), 1_000);
        let swapped = vec![second, first.clone()];
        let reordered = Block::with_timestamp(5, BlockHash::ZERO, swapped, 1_000);
        let dropped = Block::with_timestamp(5, BlockHash::ZERO, vec![first], 1_000);
        let other_time = Block::with_timestamp(5, BlockHash::ZERO, both, 1_001);

        for changed in [other_nonce, other_prev, reordered, dropped, other_time] {
            assert_ne!(base.hash(), changed.hash());
        }
    }

    #[test]
    fn test_zero_block_hash_is_stable() {
        let expected = Sha256::digest(
            format!(
                "{{\"nonce\":0,\"previous_hash\":\"{}\",\"transactions\":[],\"time_stamp\":0}}",
                "0".repeat(64)
            )
            .as_bytes(),
        );
        assert_eq!(Block::zero().hash().as_bytes()[..], expected[..]);
    }

    #[test]
    fn test_block_hash_parsing() {
        let hash = Block::zero().hash();
        let parsed: BlockHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);

        assert!("abc".parse::<BlockHash>().is_err());
        assert!("00".parse::<BlockHash>().is_err());
    }
}
