use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use wallet_relay::api;
use wallet_relay::config::WalletServerConfig;
use wallet_relay::gateway::{self, HttpGateway, LedgerGateway};
use wallet_relay::logging;
use wallet_relay::service::{self, WalletService};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::create_wallet,
        api::handlers::create_transaction,
        api::handlers::wallet_balance
    ),
    components(
        schemas(
            service::WalletDetails,
            service::TransferRequest,
            api::handlers::StatusResponse,
            gateway::BalanceResponse
        )
    ),
    tags(
        (name = "wallet", description = "Wallet relay endpoints")
    ),
    info(
        title = "Wallet Server API",
        version = "1.0.0",
        description = "Creates wallets, signs transfers and relays them to a blockchain node",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    logging::init("Wallet Server");

    let config = WalletServerConfig::load()?;
    info!("Gateway to blockchain: {}", config.gateway);
    info!("HTTP Port: {}", config.port);
    info!("Keystore capacity: {}", config.keystore_capacity);

    let gateway: Arc<dyn LedgerGateway> = Arc::new(
        HttpGateway::new(&config.gateway, config.gateway_timeout())
            .context("failed to build gateway client")?,
    );
    let service = web::Data::new(WalletService::with_capacity(
        gateway,
        config.keystore_capacity,
    ));

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(service.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
