use actix_web::{error, web, HttpResponse};
use log::warn;

use super::handlers::{self, StatusResponse};

/// Configures the API routes
///
/// Bodies that fail to deserialize, and methods a route does not serve, are
/// answered with the uniform `{"message":"fail"}` status and a 400.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected request body: {}", err);
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(StatusResponse::fail()),
        )
        .into()
    });

    cfg.app_data(json_config)
        .service(
            web::resource("/wallet")
                .route(web::post().to(handlers::create_wallet))
                .default_service(web::to(handlers::invalid_method)),
        )
        .service(
            web::resource("/wallet/balance")
                .route(web::get().to(handlers::wallet_balance))
                .default_service(web::to(handlers::invalid_method)),
        )
        .service(
            web::resource("/transaction")
                .route(web::post().to(handlers::create_transaction))
                .default_service(web::to(handlers::invalid_method)),
        );
}
