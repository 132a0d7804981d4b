use log::{debug, info, warn};
use thiserror::Error;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::block::{Block, BlockHash};
use super::transaction::{SignedTransaction, Transaction, TransactionError};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    /// The operation would break a chain invariant; nothing was changed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Chain and pool share one lock so that closing a block is a single step
#[derive(Debug, Default)]
struct ChainState {
    chain: Vec<Block>,
    transaction_pool: Vec<Transaction>,
}

/// Represents the blockchain
#[derive(Debug)]
pub struct Blockchain {
    state: Mutex<ChainState>,
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block
    ///
    /// The genesis block's previous hash is the hash of [`Block::zero`].
    pub fn new() -> Self {
        let genesis = Block::new(0, Block::zero().hash(), Vec::new());
        info!("Created genesis block {}", genesis.hash());

        Blockchain {
            state: Mutex::new(ChainState {
                chain: vec![genesis],
                transaction_pool: Vec::new(),
            }),
        }
    }

    // Every mutation leaves ChainState consistent before it can panic, so a
    // poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Closes the transaction pool into a new block and appends it
    ///
    /// The pool is taken and the block appended under one lock, so no
    /// transaction is ever observed both pending and committed.
    ///
    /// `previous_hash` must be the hash of the current last block (the hash
    /// of [`Block::zero`] on an empty chain). A stale or foreign hash is
    /// rejected and leaves both the chain and the pool untouched.
    pub fn create_block(
        &self,
        nonce: u64,
        previous_hash: BlockHash,
    ) -> Result<Block, BlockchainError> {
        let mut state = self.lock();

        let tip = state
            .chain
            .last()
            .map_or_else(|| Block::zero().hash(), Block::hash);
        if previous_hash != tip {
            warn!("Refused block linking to {}, chain tip is {}", previous_hash, tip);
            return Err(BlockchainError::InvariantViolation(format!(
                "previous hash {} does not match chain tip {}",
                previous_hash, tip
            )));
        }

        let transactions = std::mem::take(&mut state.transaction_pool);
        let block = Block::new(nonce, previous_hash, transactions);
        state.chain.push(block.clone());

        debug!(
            "Appended block {} with {} transaction(s), chain length {}",
            state.chain.len() - 1,
            block.transactions().len(),
            state.chain.len()
        );

        Ok(block)
    }

    /// Adds a transaction to the pool without any checks
    pub fn add_transaction(&self, transaction: Transaction) {
        self.lock().transaction_pool.push(transaction);
    }

    /// Verifies a signed transaction and pools it only if the sender
    /// authorized it
    pub fn add_signed_transaction(
        &self,
        signed: SignedTransaction,
    ) -> Result<(), BlockchainError> {
        if let Err(err) = signed.verify() {
            warn!(
                "Rejected transaction from {}: {}",
                signed.transaction().sender(),
                err
            );
            return Err(err.into());
        }

        self.add_transaction(signed.into_transaction());
        Ok(())
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Result<Block, BlockchainError> {
        self.lock()
            .chain
            .last()
            .cloned()
            .ok_or_else(|| BlockchainError::InvariantViolation("chain has no blocks".to_string()))
    }

    /// Snapshot of every block in the chain
    pub fn chain(&self) -> Vec<Block> {
        self.lock().chain.clone()
    }

    /// Snapshot of the pending transactions
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.lock().transaction_pool.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().chain.is_empty()
    }

    /// Validates the blockchain
    ///
    /// Returns true if the genesis block links to the zero block and every
    /// other block links to its predecessor's hash.
    pub fn is_valid(&self) -> bool {
        let state = self.lock();

        match state.chain.first() {
            Some(genesis) if *genesis.previous_hash() == Block::zero().hash() => {}
            _ => return false,
        }

        state
            .chain
            .windows(2)
            .all(|pair| *pair[1].previous_hash() == pair[0].hash())
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        for (i, block) in state.chain.iter().enumerate() {
            writeln!(f, "{} Chain: {} {}", "=".repeat(25), i, "=".repeat(25))?;
            write!(f, "{}", block)?;
        }
        writeln!(f, "{}", "*".repeat(25))
    }
}
