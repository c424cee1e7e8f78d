mod auth;
mod config;
mod db;
mod errors;
mod marketplace;
mod matching;
mod messaging;
mod models;
mod notifications;
mod offers;
mod pagination;
mod realtime;
mod routes;
mod state;
mod storage;
mod users;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::matching::scorer::{MatchScorer, WeightedMatchScorer};
use crate::matching::weights::MatchWeights;
use crate::realtime::hub::RealtimeHub;
use crate::routes::build_router;
use crate::state::AppState;

const REALTIME_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting marketplace API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize match scorer
    let scorer: Arc<dyn MatchScorer> = Arc::new(WeightedMatchScorer::new(MatchWeights::default())?);
    info!("Match scorer initialized (backend: {})", scorer.backend());

    // Initialize realtime hub, bridged through Redis when configured
    let hub = build_hub(&config).await;

    let state = AppState {
        db,
        s3,
        config: config.clone(),
        scorer,
        hub,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Without a reachable Redis the hub delivers events in-process only.
async fn build_hub(config: &Config) -> RealtimeHub {
    let Some(url) = config.redis_url.as_deref() else {
        info!("REDIS_URL not set; realtime events stay in-process");
        return RealtimeHub::new(REALTIME_CAPACITY, None);
    };

    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(e) => {
            warn!("Invalid REDIS_URL, realtime events stay in-process: {e}");
            return RealtimeHub::new(REALTIME_CAPACITY, None);
        }
    };

    match client.get_multiplexed_tokio_connection().await {
        Ok(conn) => {
            info!("Redis connection established");
            let hub = RealtimeHub::new(REALTIME_CAPACITY, Some(conn));
            tokio::spawn(hub.clone().supervise_redis_bridge(client));
            hub
        }
        Err(e) => {
            warn!("Redis unavailable, realtime events stay in-process: {e}");
            RealtimeHub::new(REALTIME_CAPACITY, None)
        }
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "marketplace-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
