use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::matching::scorer::MatchScorer;
use crate::realtime::hub::RealtimeHub;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    /// Pluggable match scorer. Default: WeightedMatchScorer.
    pub scorer: Arc<dyn MatchScorer>,
    /// Per-user realtime rooms, optionally bridged through Redis.
    pub hub: RealtimeHub,
}
