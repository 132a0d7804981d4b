use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::gateway::BalanceResponse;
use crate::service::{ServiceError, TransferRequest, WalletDetails, WalletService};

/// Shared wallet service
pub type ServiceData = web::Data<WalletService>;

/// Uniform status body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// "success" or "fail"
    pub message: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        StatusResponse {
            message: "success".to_string(),
        }
    }

    pub fn fail() -> Self {
        StatusResponse {
            message: "fail".to_string(),
        }
    }
}

/// Query for the balance endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    /// Address to look up
    pub blockchain_address: Option<String>,
}

fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Authorization(_) => StatusCode::FORBIDDEN,
        ServiceError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Create a new wallet
///
/// Generates a keypair, registers the address with the node and returns the
/// public material plus a wallet token. The private key stays with the server.
#[utoipa::path(
    post,
    path = "/wallet",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletDetails),
        (status = 502, description = "Node did not accept the registration", body = StatusResponse),
        (status = 503, description = "No room for another wallet", body = StatusResponse)
    )
)]
pub async fn create_wallet(service: ServiceData) -> impl Responder {
    match service.provision_wallet().await {
        Ok(details) => HttpResponse::Created().json(details),
        Err(err) => {
            error!("Wallet provisioning failed: {}", err);
            HttpResponse::build(status_for(&err)).json(StatusResponse::fail())
        }
    }
}

/// Create a new transaction
///
/// Signs the transfer for the sender and relays it to the node
#[utoipa::path(
    post,
    path = "/transaction",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transaction accepted by the node", body = StatusResponse),
        (status = 400, description = "Invalid transaction data", body = StatusResponse),
        (status = 403, description = "Sender not authorized", body = StatusResponse),
        (status = 502, description = "Node failed the request", body = StatusResponse)
    )
)]
pub async fn create_transaction(
    service: ServiceData,
    request: web::Json<TransferRequest>,
) -> impl Responder {
    match service.submit_transaction(&request).await {
        Ok(()) => HttpResponse::Ok().json(StatusResponse::success()),
        Err(err) => {
            warn!("Transaction failed: {}", err);
            HttpResponse::build(status_for(&err)).json(StatusResponse::fail())
        }
    }
}

/// Get wallet balance
///
/// Relays the balance computed by the node
#[utoipa::path(
    get,
    path = "/wallet/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse),
        (status = 400, description = "Missing or malformed address", body = BalanceResponse),
        (status = 502, description = "Node unreachable", body = BalanceResponse)
    )
)]
pub async fn wallet_balance(
    service: ServiceData,
    query: web::Query<BalanceQuery>,
) -> impl Responder {
    let address = query.blockchain_address.as_deref().unwrap_or_default();

    match service.query_balance(address).await {
        Ok(balance) => HttpResponse::Ok().json(BalanceResponse {
            balance: Some(balance),
            error: None,
        }),
        Err(err) => {
            warn!("Balance lookup failed: {}", err);
            HttpResponse::build(status_for(&err)).json(BalanceResponse {
                balance: None,
                error: Some("Failed to get wallet balance".to_string()),
            })
        }
    }
}

/// Answers requests whose method a route does not serve
pub async fn invalid_method(request: HttpRequest) -> impl Responder {
    warn!("Invalid HTTP method {} for {}", request.method(), request.path());
    HttpResponse::BadRequest().json(StatusResponse::fail())
}
