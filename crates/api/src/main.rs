use anyhow::{Context, Result};
use tracing::info;

use buildline_api::{app, config, middleware, services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load().context("loading configuration")?;

    middleware::logging::init_logging(&config.logging)
        .context("installing the tracing subscriber")?;
    middleware::init_metrics().context("installing the Prometheus recorder")?;

    info!("Starting Buildline API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&(&config.database).into())
        .await
        .context("connecting to the database")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    services::bootstrap::bootstrap_supervisor(&pool, &config.buildline).await?;

    let addr = config.socket_addr().context("parsing server address")?;
    let app = app::create_app(config, pool);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
