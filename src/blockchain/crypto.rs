use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// Version byte prepended to the address payload
const ADDRESS_VERSION: u8 = 0x00;

/// Number of public key hash bytes carried by an address
const ADDRESS_HASH_LEN: usize = 20;

const CHECKSUM_LEN: usize = 4;

const PUBLIC_KEY_LEN: usize = 32;
const SECRET_KEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

fn sha256_twice(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// A blockchain address: Base58Check over a hash of the owner's public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Derives the address of a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let digest = Sha256::digest(public_key.as_bytes());

        let mut payload = Vec::with_capacity(1 + ADDRESS_HASH_LEN + CHECKSUM_LEN);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&digest[..ADDRESS_HASH_LEN]);

        let check = sha256_twice(&payload);
        payload.extend_from_slice(&check[..CHECKSUM_LEN]);

        Address(bs58::encode(payload).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;

        if bytes.len() != 1 + ADDRESS_HASH_LEN + CHECKSUM_LEN {
            return Err(CryptoError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                1 + ADDRESS_HASH_LEN + CHECKSUM_LEN,
                bytes.len()
            )));
        }

        if bytes[0] != ADDRESS_VERSION {
            return Err(CryptoError::InvalidAddress(format!(
                "unknown version byte {:#04x}",
                bytes[0]
            )));
        }

        let (payload, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if sha256_twice(payload)[..CHECKSUM_LEN] != *checksum {
            return Err(CryptoError::InvalidAddress("checksum mismatch".to_string()));
        }

        Ok(Address(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Parses a hex encoded Ed25519 public key
pub fn public_key_from_hex(encoded: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(encoded).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidPublicKey("Invalid public key length".to_string())
    })?;

    VerifyingKey::from_bytes(&bytes).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

pub fn public_key_to_hex(public_key: &VerifyingKey) -> String {
    hex::encode(public_key.as_bytes())
}

/// A detached signature, hex encoded as the 64-byte (R, S) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalSignature(String);

impl DigitalSignature {
    pub fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(hex::encode(signature.to_bytes()))
    }

    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes =
            hex::decode(&self.0).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

        let signature_bytes: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature("Invalid signature length".to_string())
        })?;

        Ok(Signature::from_bytes(&signature_bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DigitalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DigitalSignature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let signature = DigitalSignature(s.to_ascii_lowercase());
        signature.to_signature()?;
        Ok(signature)
    }
}

/// Owns a keypair and the address derived from it
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Creates a wallet from an existing secret key
    pub fn from_secret_key(secret_key_bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_array: [u8; SECRET_KEY_LEN] = secret_key_bytes.try_into().map_err(|_| {
            CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
        })?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes_array)))
    }

    /// Creates a wallet from a hex encoded secret key
    pub fn from_secret_key_hex(encoded: &str) -> Result<Self, CryptoError> {
        let bytes =
            hex::decode(encoded).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Self::from_secret_key(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let address = Address::from_public_key(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn public_key_hex(&self) -> String {
        public_key_to_hex(&self.verifying_key)
    }

    /// Signs a message with the wallet's private key
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        DigitalSignature::from_signature(&self.signing_key.sign(message))
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies a signature against a message and public key
pub fn verify_signature(
    message: &[u8],
    signature: &DigitalSignature,
    public_key: &VerifyingKey,
) -> Result<bool, CryptoError> {
    let signature = signature.to_signature()?;
    Ok(public_key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_and_verification() {
        let wallet = Wallet::new();
        let message = b"Hello, world!";

        let signature = wallet.sign(message);
        assert!(verify_signature(message, &signature, wallet.public_key()).unwrap());

        let wrong_message = b"Wrong message";
        assert!(!verify_signature(wrong_message, &signature, wallet.public_key()).unwrap());
    }

    #[test]
    fn test_verification_with_other_key_fails() {
        let wallet = Wallet::new();
        let other = Wallet::new();
        let signature = wallet.sign(b"payload");

        assert!(!verify_signature(b"payload", &signature, other.public_key()).unwrap());
    }

    #[test]
    fn test_address_is_pure_function_of_public_key() {
        let wallet = Wallet::new();
        let first = Address::from_public_key(wallet.public_key());
        let second = Address::from_public_key(wallet.public_key());
        assert_eq!(first, second);
        assert_eq!(&first, wallet.address());

        let other = Wallet::new();
        assert_ne!(wallet.address(), other.address());
    }

    #[test]
    fn test_address_parsing() {
        let wallet = Wallet::new();
        let parsed: Address = wallet.address().as_str().parse().unwrap();
        assert_eq!(&parsed, wallet.address());

        assert!("".parse::<Address>().is_err());
        assert!("not-base58-0OIl".parse::<Address>().is_err());
        assert!("Alice".parse::<Address>().is_err());

        // Flip one character to break the checksum
        let mut tampered = wallet.address().as_str().to_string();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '2' { '3' } else { '2' });
        assert!(tampered.parse::<Address>().is_err());
    }

    #[test]
    fn test_address_rejected_by_serde() {
        let result: Result<Address, _> = serde_json::from_str("\"Alice\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_wallet_from_secret_key() {
        let wallet = Wallet::new();
        let secret = wallet.signing_key.to_bytes();

        let restored = Wallet::from_secret_key_hex(&hex::encode(secret)).unwrap();
        assert_eq!(restored.address(), wallet.address());
        assert_eq!(restored.public_key_hex(), wallet.public_key_hex());

        assert!(Wallet::from_secret_key(&[1, 2, 3]).is_err());
        assert!(Wallet::from_secret_key_hex("zz").is_err());
    }

    #[test]
    fn test_public_key_hex_round_trip() {
        let wallet = Wallet::new();
        let parsed = public_key_from_hex(&wallet.public_key_hex()).unwrap();
        assert_eq!(parsed.as_bytes(), wallet.public_key().as_bytes());

        assert!(public_key_from_hex("abcd").is_err());
    }

    #[test]
    fn test_debug_hides_secret_key() {
        let wallet = Wallet::new();
        let rendered = format!("{:?}", wallet);
        assert!(!rendered.contains(&hex::encode(wallet.signing_key.to_bytes())));
        assert!(rendered.contains(wallet.address().as_str()));
    }

    #[test]
    fn test_signature_parsing() {
        let wallet = Wallet::new();
        let signature = wallet.sign(b"data");
        let parsed: DigitalSignature = signature.as_str().parse().unwrap();
        assert_eq!(parsed, signature);

        assert!("deadbeef".parse::<DigitalSignature>().is_err());
    }
}
