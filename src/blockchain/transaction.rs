use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

use super::canonical;
use super::crypto::{
    public_key_from_hex, verify_signature, Address, CryptoError, DigitalSignature, Wallet,
};

/// Errors that can occur during transaction operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid sender address: {0}")]
    InvalidSenderAddress(String),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipientAddress(String),

    #[error("Malformed credentials: {0}")]
    Malformed(#[from] CryptoError),

    #[error("Unauthorized: {0}")]
    Authorization(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl TransactionError {
    /// Whether the error rejects the signer rather than the input
    pub fn is_authorization(&self) -> bool {
        matches!(self, TransactionError::Authorization(_))
    }
}

/// An immutable value transfer intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransaction")]
pub struct Transaction {
    #[serde(rename = "sender_blockchain_address")]
    sender: Address,

    #[serde(rename = "recipient_blockchain_address")]
    recipient: Address,

    value: f32,
}

#[derive(Deserialize)]
struct RawTransaction {
    sender_blockchain_address: Address,
    recipient_blockchain_address: Address,
    value: f32,
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = TransactionError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        Transaction::new(
            raw.sender_blockchain_address,
            raw.recipient_blockchain_address,
            raw.value,
        )
    }
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// The value must be finite and non-negative. A zero value is accepted;
    /// whether it is useful is left to the node.
    pub fn new(sender: Address, recipient: Address, value: f32) -> Result<Self, TransactionError> {
        if !value.is_finite() {
            return Err(TransactionError::InvalidAmount(format!(
                "{} is not a finite number",
                value
            )));
        }

        if value < 0.0 {
            return Err(TransactionError::InvalidAmount(format!(
                "{} is negative",
                value
            )));
        }

        Ok(Transaction {
            sender,
            recipient,
            value,
        })
    }

    /// Creates a transaction from unparsed addresses, validating both
    pub fn from_raw(sender: &str, recipient: &str, value: f32) -> Result<Self, TransactionError> {
        let sender: Address = sender
            .parse()
            .map_err(|e: CryptoError| TransactionError::InvalidSenderAddress(e.to_string()))?;
        let recipient: Address = recipient
            .parse()
            .map_err(|e: CryptoError| TransactionError::InvalidRecipientAddress(e.to_string()))?;

        Self::new(sender, recipient, value)
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// The bytes covered by a signature
    pub fn signing_payload(&self) -> Result<Vec<u8>, TransactionError> {
        canonical::encode_transaction(self).map_err(|e| TransactionError::Encoding(e.to_string()))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, " sender_blockchain_address    {}", self.sender)?;
        writeln!(f, " recipient_blockchain_address {}", self.recipient)?;
        writeln!(f, " value                        {:.1}", self.value)
    }
}

/// A transaction together with the sender's public key and signature
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    transaction: Transaction,
    sender_public_key: VerifyingKey,
    signature: DigitalSignature,
}

impl SignedTransaction {
    /// Assembles a signed transaction received from elsewhere; nothing is
    /// checked until [`SignedTransaction::verify`]
    pub fn new(
        transaction: Transaction,
        sender_public_key: VerifyingKey,
        signature: DigitalSignature,
    ) -> Self {
        SignedTransaction {
            transaction,
            sender_public_key,
            signature,
        }
    }

    /// Parses a hex encoded public key and signature
    pub fn from_parts(
        transaction: Transaction,
        sender_public_key: &str,
        signature: &str,
    ) -> Result<Self, TransactionError> {
        let sender_public_key = public_key_from_hex(sender_public_key)?;
        let signature: DigitalSignature = signature.parse()?;
        Ok(Self::new(transaction, sender_public_key, signature))
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn sender_public_key(&self) -> &VerifyingKey {
        &self.sender_public_key
    }

    pub fn signature(&self) -> &DigitalSignature {
        &self.signature
    }

    /// Checks that the public key owns the sender address and that the
    /// signature covers exactly this transaction
    pub fn verify(&self) -> Result<(), TransactionError> {
        let derived = Address::from_public_key(&self.sender_public_key);
        if &derived != self.transaction.sender() {
            return Err(TransactionError::Authorization(format!(
                "public key belongs to {}, not {}",
                derived,
                self.transaction.sender()
            )));
        }

        let payload = self.transaction.signing_payload()?;
        let valid = verify_signature(&payload, &self.signature, &self.sender_public_key)?;
        if !valid {
            return Err(TransactionError::Authorization(
                "signature does not match transaction".to_string(),
            ));
        }

        Ok(())
    }

    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }
}

impl Wallet {
    /// Signs a transaction originated by this wallet
    pub fn sign_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<SignedTransaction, TransactionError> {
        if transaction.sender() != self.address() {
            return Err(TransactionError::InvalidSenderAddress(format!(
                "wallet {} cannot sign for {}",
                self.address(),
                transaction.sender()
            )));
        }

        let signature = self.sign(&transaction.signing_payload()?);

        Ok(SignedTransaction::new(
            transaction,
            *self.public_key(),
            signature,
        ))
    }
}
