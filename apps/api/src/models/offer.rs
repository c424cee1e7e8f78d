use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::matching::types::Requirement;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfferRow {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub title: String,
    pub description: String,
    /// Contract type: cdi, cdd, freelance, internship...
    pub kind: String,
    pub location: String,
    pub country: Option<String>,
    pub city: Option<String>,
    /// on_site, hybrid or remote.
    pub remote_type: String,
    pub technologies: Vec<String>,
    pub domain: Option<String>,
    pub requirement: Option<Json<Requirement>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OfferWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub offer: OfferRow,
    pub application_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub candidate_id: Uuid,
    pub status: String,
    pub profile_snapshot: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationWithOffer {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub offer_title: String,
    pub offer_kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}
