// Wallet service façade
//
// Builds and signs transfers for wallet clients and relays them, together
// with registrations and balance lookups, through a LedgerGateway.

use dashmap::DashMap;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::blockchain::{Address, CryptoError, Transaction, TransactionError, Wallet};
use crate::gateway::{GatewayError, LedgerGateway, TransactionRequest};

/// Wallets held by one service unless configured otherwise
pub const DEFAULT_KEYSTORE_CAPACITY: usize = 10_000;

/// Errors surfaced by the wallet service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Capacity exhausted: {0}")]
    Capacity(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] GatewayError),
}

impl From<TransactionError> for ServiceError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Authorization(reason) => ServiceError::Authorization(reason),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

impl From<CryptoError> for ServiceError {
    fn from(err: CryptoError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Material handed to the client of a provisioned wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WalletDetails {
    /// The wallet's blockchain address
    pub blockchain_address: String,

    /// The wallet's public key (hex encoded)
    pub public_key: String,

    /// Secret bearer token authorizing transfers from this wallet.
    /// Returned once, at provisioning.
    pub wallet_token: String,
}

/// Transfer request as sent by a wallet client
///
/// Either `sender_private_key` or `wallet_token` authorizes the transfer.
/// The token only works for wallets provisioned by this service. Every
/// other field is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub sender_private_key: Option<String>,
    pub wallet_token: Option<String>,
    pub sender_blockchain_address: Option<String>,
    pub recipient_blockchain_address: Option<String>,
    pub sender_public_key: Option<String>,
    /// Decimal amount, e.g. "1.5"
    pub value: Option<String>,
}

fn required<'a>(
    field: &'a Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> &'a str {
    match present(field) {
        Some(value) => value,
        None => {
            missing.push(name);
            ""
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// A provisioned wallet and the token its client must present
struct Custody {
    wallet: Wallet,
    token: String,
}

/// Orchestrates wallets, signing, and the gateway
pub struct WalletService {
    gateway: Arc<dyn LedgerGateway>,

    /// Wallets provisioned by this process; keys never leave it
    keystore: DashMap<Address, Custody>,

    capacity: usize,

    /// Keystore slots taken, including provisions still registering
    reserved: AtomicUsize,
}

impl WalletService {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self::with_capacity(gateway, DEFAULT_KEYSTORE_CAPACITY)
    }

    /// Creates a service that holds at most `capacity` wallets
    pub fn with_capacity(gateway: Arc<dyn LedgerGateway>, capacity: usize) -> Self {
        WalletService {
            gateway,
            keystore: DashMap::new(),
            capacity,
            reserved: AtomicUsize::new(0),
        }
    }

    /// Generates a wallet, registers its address with the node, and returns
    /// its public material together with a fresh wallet token
    pub async fn provision_wallet(&self) -> Result<WalletDetails, ServiceError> {
        self.reserve_slot()?;

        let wallet = Wallet::new();
        if let Err(err) = self.gateway.register_wallet(wallet.address()).await {
            self.reserved.fetch_sub(1, Ordering::AcqRel);
            error!("Failed to register wallet {}: {}", wallet.address(), err);
            return Err(err.into());
        }

        let token = Uuid::new_v4().simple().to_string();
        let details = WalletDetails {
            blockchain_address: wallet.address().to_string(),
            public_key: wallet.public_key_hex(),
            wallet_token: token.clone(),
        };

        info!("Provisioned wallet {}", wallet.address());
        self.keystore
            .insert(wallet.address().clone(), Custody { wallet, token });

        Ok(details)
    }

    fn reserve_slot(&self) -> Result<(), ServiceError> {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                (held < self.capacity).then(|| held + 1)
            })
            .map(|_| ())
            .map_err(|held| {
                warn!("Keystore full with {} wallet(s)", held);
                ServiceError::Capacity(format!("keystore holds {} wallet(s)", held))
            })
    }

    /// Signs a transfer on behalf of the sender and forwards it to the node
    pub async fn submit_transaction(&self, request: &TransferRequest) -> Result<(), ServiceError> {
        let mut missing = Vec::new();
        let sender = required(
            &request.sender_blockchain_address,
            "sender_blockchain_address",
            &mut missing,
        );
        let recipient = required(
            &request.recipient_blockchain_address,
            "recipient_blockchain_address",
            &mut missing,
        );
        let public_key = required(&request.sender_public_key, "sender_public_key", &mut missing);
        let value = required(&request.value, "value", &mut missing);

        if !missing.is_empty() {
            return Err(ServiceError::Validation(format!(
                "missing field(s): {}",
                missing.join(", ")
            )));
        }

        let value: f32 = value
            .parse()
            .map_err(|_| ServiceError::Validation(format!("cannot parse value {:?}", value)))?;

        let transaction = Transaction::from_raw(sender, recipient, value)?;
        let wallet = self.credentials(request, transaction.sender())?;

        if !wallet.public_key_hex().eq_ignore_ascii_case(public_key) {
            return Err(ServiceError::Authorization(
                "credentials do not match sender public key".to_string(),
            ));
        }

        if wallet.address() != transaction.sender() {
            return Err(ServiceError::Authorization(
                "credentials do not match sender address".to_string(),
            ));
        }

        let signed = wallet.sign_transaction(transaction)?;
        signed.verify()?;

        let payload = TransactionRequest::from(&signed);
        if let Err(err) = self.gateway.submit_transaction(&payload).await {
            warn!(
                "Node refused transfer of {} from {}: {}",
                payload.value, payload.sender_blockchain_address, err
            );
            return Err(err.into());
        }

        info!(
            "Submitted transfer of {} from {} to {}",
            payload.value, payload.sender_blockchain_address, payload.recipient_blockchain_address
        );
        Ok(())
    }

    // A client-held private key speaks for itself. A custodial wallet needs
    // the token issued at provisioning; the address and public key are public.
    fn credentials(
        &self,
        request: &TransferRequest,
        sender: &Address,
    ) -> Result<Wallet, ServiceError> {
        if let Some(key) = present(&request.sender_private_key) {
            return Ok(Wallet::from_secret_key_hex(key)?);
        }

        let custody = self.keystore.get(sender).ok_or_else(|| {
            ServiceError::Authorization(format!("no credentials held for {}", sender))
        })?;

        let token = present(&request.wallet_token).unwrap_or_default();
        if !bool::from(token.as_bytes().ct_eq(custody.token.as_bytes())) {
            return Err(ServiceError::Authorization(format!(
                "missing or wrong wallet token for {}",
                sender
            )));
        }

        Ok(custody.wallet.clone())
    }

    /// Number of wallets held in the keystore
    pub fn wallet_count(&self) -> usize {
        self.keystore.len()
    }

    /// Relays the node's balance for an address
    pub async fn query_balance(&self, address: &str) -> Result<f32, ServiceError> {
        let address: Address = address.trim().parse()?;

        self.gateway.balance(&address).await.map_err(|err| {
            warn!("Balance lookup for {} failed: {}", address, err);
            ServiceError::from(err)
        })
    }
}
