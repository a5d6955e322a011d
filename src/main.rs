//! Variant Configurator - configurable product pricing and cart synchronization service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variant_configurator::config::AppConfig;
use variant_configurator::http::{router, AppState};
use variant_configurator::infrastructure::{EventPublisher, PgCartRepository, PgCatalogSource, PgCheckoutHandoff};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.db_max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will not be published");
                None
            }
        },
        None => None,
    };

    let state = AppState::new(
        Arc::new(PgCatalogSource::new(db.clone())),
        Arc::new(PgCartRepository::new(db.clone())),
        Arc::new(PgCheckoutHandoff::new(db)),
        EventPublisher::new(nats),
    );
    let app = router(state);

    tracing::info!("Variant Configurator listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
