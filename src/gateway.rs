// Ledger gateway client
//
// The remote node owns balances, signature checks before pooling, and
// mining. This module only speaks its HTTP contract.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::time::Duration;

use crate::blockchain::crypto::public_key_to_hex;
use crate::blockchain::{Address, SignedTransaction, Transaction, TransactionError};

/// Errors returned by a ledger gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("Gateway unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Gateway returned status {status} for {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("Gateway rejected request: {0}")]
    Rejected(String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
}

/// Registration payload sent when a wallet is provisioned
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterWalletRequest {
    #[serde(rename = "blockchainAddress")]
    pub blockchain_address: String,
}

/// Signed transfer submitted to the node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    pub sender_blockchain_address: String,
    pub recipient_blockchain_address: String,
    /// Hex encoded public key
    pub sender_public_key: String,
    pub value: f32,
    /// Hex encoded signature
    pub signature: String,
}

impl From<&SignedTransaction> for TransactionRequest {
    fn from(signed: &SignedTransaction) -> Self {
        let transaction = signed.transaction();
        TransactionRequest {
            sender_blockchain_address: transaction.sender().to_string(),
            recipient_blockchain_address: transaction.recipient().to_string(),
            sender_public_key: public_key_to_hex(signed.sender_public_key()),
            value: transaction.value(),
            signature: signed.signature().to_string(),
        }
    }
}

impl TransactionRequest {
    /// Rebuilds the signed transaction on the receiving side
    ///
    /// Only parses; call [`SignedTransaction::verify`] before trusting it.
    pub fn into_signed(self) -> Result<SignedTransaction, TransactionError> {
        let transaction = Transaction::from_raw(
            &self.sender_blockchain_address,
            &self.recipient_blockchain_address,
            self.value,
        )?;
        SignedTransaction::from_parts(transaction, &self.sender_public_key, &self.signature)
    }
}

/// Balance answer from the node, also relayed to wallet clients
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Boundary to the node that owns authoritative ledger state
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Announces a freshly provisioned address
    async fn register_wallet(&self, address: &Address) -> Result<(), GatewayError>;

    /// Hands a signed transfer to the node
    async fn submit_transaction(&self, request: &TransactionRequest) -> Result<(), GatewayError>;

    /// Balance of an address as computed by the node
    async fn balance(&self, address: &Address) -> Result<f32, GatewayError>;
}

/// [`LedgerGateway`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    http_client: Client,
}

impl HttpGateway {
    /// Creates a gateway client; every request is bounded by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let parsed = Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(format!("{} cannot be a base URL", base_url)));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Unreachable)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn send_error(endpoint: &str, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            warn!("Gateway request to {} timed out", endpoint);
            GatewayError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            warn!("Gateway request to {} failed: {}", endpoint, err);
            GatewayError::Unreachable(err)
        }
    }

    fn expect_status(
        endpoint: &str,
        actual: StatusCode,
        expected: StatusCode,
    ) -> Result<(), GatewayError> {
        debug!("Gateway {} answered {}", endpoint, actual);
        if actual == expected {
            Ok(())
        } else {
            Err(GatewayError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: actual.as_u16(),
            })
        }
    }
}

#[async_trait]
impl LedgerGateway for HttpGateway {
    async fn register_wallet(&self, address: &Address) -> Result<(), GatewayError> {
        let endpoint = self.endpoint("wallet/register");
        let payload = RegisterWalletRequest {
            blockchain_address: address.to_string(),
        };

        let response = self
            .http_client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Self::send_error(&endpoint, e))?;

        Self::expect_status(&endpoint, response.status(), StatusCode::OK)
    }

    async fn submit_transaction(&self, request: &TransactionRequest) -> Result<(), GatewayError> {
        let endpoint = self.endpoint("transactions");

        let response = self
            .http_client
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Self::send_error(&endpoint, e))?;

        Self::expect_status(&endpoint, response.status(), StatusCode::CREATED)
    }

    async fn balance(&self, address: &Address) -> Result<f32, GatewayError> {
        let endpoint = self.endpoint("balance");

        let response = self
            .http_client
            .get(&endpoint)
            .query(&[("blockchain_address", address.as_str())])
            .send()
            .await
            .map_err(|e| Self::send_error(&endpoint, e))?;

        Self::expect_status(&endpoint, response.status(), StatusCode::OK)?;

        let body: BalanceResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        match body {
            BalanceResponse {
                error: Some(error), ..
            } => Err(GatewayError::Rejected(error)),
            BalanceResponse {
                balance: Some(balance),
                ..
            } => Ok(balance),
            _ => Err(GatewayError::InvalidResponse(
                "balance missing from response".to_string(),
            )),
        }
    }
}
