// Blockchain module
//
// This module contains the integrity core:
// - Block structure and hashing
// - Blockchain structure and transaction pool
// - Transaction structure and the signing protocol
// - Cryptography utilities
// - Canonical encoding shared by hashing and signing

pub mod block;
pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, BlockHash};
pub use chain::{Blockchain, BlockchainError};
pub use crypto::{Address, CryptoError, DigitalSignature, Wallet};
pub use transaction::{SignedTransaction, Transaction, TransactionError};
