//! Pharmacy storefront HTTP service

use anyhow::Result;
use pharmacy_storefront::{api, auth::{MemoryDocumentStore, UnconfiguredIdentityProvider}, storage::{KeyValueStore, MemoryStore, PgKeyValueStore}, StorefrontConfig};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = StorefrontConfig::from_env()?;

    let kv: Arc<dyn KeyValueStore> = match config.database_url.as_deref() {
        Some(url) => Arc::new(PgKeyValueStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, orders and sessions are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    tracing::warn!("no identity provider configured, accounts run in demo mode");
    let provider = Arc::new(UnconfiguredIdentityProvider::new());
    let port = config.port;
    let state = api::AppState::build(config, kv, Arc::new(MemoryDocumentStore::new()), provider).await?;

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());
    tracing::info!("pharmacy storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
