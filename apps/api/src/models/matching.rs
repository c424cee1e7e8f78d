use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::matching::recommendations::Recommendation;
use crate::matching::scorer::MatchCriteria;

/// What a match result is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    TalentRequest,
    Offer,
}

impl RequirementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementKind::TalentRequest => "talent_request",
            RequirementKind::Offer => "offer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "talent_request" => Some(RequirementKind::TalentRequest),
            "offer" => Some(RequirementKind::Offer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    New,
    SeenByTalent,
    SeenByRecruiter,
    Interested,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::New => "new",
            MatchStatus::SeenByTalent => "seen_by_talent",
            MatchStatus::SeenByRecruiter => "seen_by_recruiter",
            MatchStatus::Interested => "interested",
            MatchStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Talent,
    Recruiter,
}

/// Appended to a match every time one side changes its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub actor: Actor,
    pub action: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MatchResultRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub requirement_kind: String,
    pub requirement_id: Uuid,
    pub match_score: i32,
    pub criteria: Json<MatchCriteria>,
    pub recommendations: Json<Vec<Recommendation>>,
    pub status: String,
    pub interactions: Json<Vec<Interaction>>,
    pub computed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Match joined with the talent it was computed for.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TalentMatchView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub result: MatchResultRow,
    pub talent_user_id: Uuid,
    pub talent_title: String,
}

/// Match joined with the title of the offer or request it was computed against.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RequirementMatchView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub result: MatchResultRow,
    pub requirement_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&MatchStatus::SeenByRecruiter).unwrap();
        assert_eq!(json, "\"seen_by_recruiter\"");
        assert_eq!(MatchStatus::SeenByRecruiter.as_str(), "seen_by_recruiter");
    }

    #[test]
    fn test_requirement_kind_parse() {
        assert_eq!(RequirementKind::parse("offer"), Some(RequirementKind::Offer));
        assert_eq!(
            RequirementKind::parse(RequirementKind::TalentRequest.as_str()),
            Some(RequirementKind::TalentRequest)
        );
        assert_eq!(RequirementKind::parse("job"), None);
    }
}
