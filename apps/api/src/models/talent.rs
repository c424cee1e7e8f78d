use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::matching::types::{Profile, Requirement};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TalentProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub country: Option<String>,
    pub region: Option<String>,
    pub remote: bool,
    pub domains: Vec<String>,
    pub skill_names: Vec<String>,
    pub language_names: Vec<String>,
    pub hourly_min: Option<f64>,
    pub hourly_max: Option<f64>,
    pub availability_kind: Option<String>,
    /// active, inactive or suspended.
    pub status: String,
    /// public or private.
    pub visibility: String,
    pub views: i32,
    pub rating_avg: f64,
    pub profile: Json<Profile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TalentRequestRow {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub company_name: String,
    pub title: String,
    pub description: String,
    pub domains: Vec<String>,
    pub status: String,
    pub requirement: Json<Requirement>,
    pub match_count: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
