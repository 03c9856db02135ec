use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paygate_server::{config::ServerConfig, cors::build_cors, routes, state::AppState};

/// Request bodies above this size are refused before dispatch.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("Starting paygate on {}:{}", config.host, config.port);
    tracing::info!("Payment address: {}", config.settings.payment_address);
    tracing::info!(
        "Token TTL: {}s, payment window: {}s",
        config.settings.token_ttl.as_secs(),
        config.settings.payment_window.as_secs()
    );

    let state = web::Data::new(AppState::new(&config));
    let allowed_origins = config.allowed_origins.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(Logger::default())
            .wrap(build_cors(&allowed_origins))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    tracing::info!("paygate stopped");
    Ok(())
}
