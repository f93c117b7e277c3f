use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use guest_reviews_backend::config::Config;
use guest_reviews_backend::reviews::service::{build_sources, ReviewService};
use guest_reviews_backend::server::{build_router, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("🏠 Starting Guest Reviews API server...");

    let config = Config::from_env()?;
    if config.hostaway_api_key.is_empty() {
        warn!("HOSTAWAY_API_KEY is not set; review fetches will fall back to seed data");
    }

    let source_set = build_sources(&config)?;
    info!("✅ {} review source(s) configured", source_set.sources.len());

    let state = AppState {
        service: Arc::new(ReviewService::new(source_set.sources)),
        google: source_set.google,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("🚀 Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
