use actix_web::{middleware::Logger, web, App, HttpServer};
use color_eyre::{eyre::WrapErr, Result};
use dotenvy::dotenv;
use log::info;

use rosetta_solana::{
    api::routes::configure_routes, config::ServerConfig, constants::SHUTDOWN_TIMEOUT_SECONDS,
    logging::setup_logging, models::AppState,
};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // Load environment variables from .env file
    dotenv().ok();
    setup_logging()?;

    let config = ServerConfig::from_env().wrap_err("Invalid server configuration")?;
    info!(
        "Serving solana/{} in {} mode (node: {})",
        config.network.name(),
        config.mode,
        config.rpc_url
    );

    let app_state = web::Data::new(
        AppState::from_config(&config).wrap_err("Failed to create Solana provider")?,
    );

    info!("Starting server on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .shutdown_timeout(SHUTDOWN_TIMEOUT_SECONDS)
    .run()
    .await?;

    Ok(())
}
