use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::marketplace::store::{
    self, MarketplaceStats, TalentProfileInput, TalentRequestInput, TalentSearch,
};
use crate::matching::engine;
use crate::matching::handlers::own_talent_profile;
use crate::matching::store as matches;
use crate::models::matching::{
    Actor, MatchResultRow, MatchStatus, RequirementKind, RequirementMatchView, TalentMatchView,
};
use crate::models::talent::{TalentProfileRow, TalentRequestRow};
use crate::models::user::Role;
use crate::pagination::{PageQuery, Paginated};
use crate::state::AppState;

const VISIBILITIES: &[&str] = &["public", "private"];
const PROFILE_STATUSES: &[&str] = &["active", "inactive"];

#[derive(Debug, Default, Deserialize)]
pub struct TalentSearchQuery {
    /// Comma-separated.
    pub skills: Option<String>,
    pub domains: Option<String>,
    pub languages: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub remote: Option<bool>,
    pub availability: Option<String>,
    pub hourly_min: Option<f64>,
    pub hourly_max: Option<f64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TalentSearchQuery {
    fn filters(&self) -> TalentSearch {
        TalentSearch {
            skills: csv_lower(self.skills.as_deref()),
            domains: csv(self.domains.as_deref()),
            languages: csv_lower(self.languages.as_deref()),
            country: non_empty(&self.country),
            region: non_empty(&self.region),
            remote: self.remote,
            availability: non_empty(&self.availability),
            hourly_min: self.hourly_min,
            hourly_max: self.hourly_max,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchStatusUpdate {
    pub status: MatchStatus,
}

fn csv(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn csv_lower(value: Option<&str>) -> Vec<String> {
    csv(value).into_iter().map(|s| s.to_lowercase()).collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ────────────────────────────────────────────────────────────────────────────
// Talent profiles
// ────────────────────────────────────────────────────────────────────────────

/// PUT /api/marketplace/talent/profile
pub async fn handle_upsert_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<TalentProfileInput>,
) -> Result<Json<TalentProfileRow>, AppError> {
    auth.require_role(&[Role::Candidate])?;
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    if !VISIBILITIES.contains(&input.visibility.as_str()) {
        return Err(AppError::Validation("visibility must be public or private".into()));
    }
    if !PROFILE_STATUSES.contains(&input.status.as_str()) {
        return Err(AppError::Validation("status must be active or inactive".into()));
    }

    let row = store::upsert_profile(&state.db, auth.id, &input).await?;
    info!("Talent profile {} saved for user {}", row.id, auth.id);
    Ok(Json(row))
}

/// GET /api/marketplace/talent/profile
pub async fn handle_get_own_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TalentProfileRow>, AppError> {
    Ok(Json(own_talent_profile(&state, &auth).await?))
}

/// GET /api/marketplace/talent/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TalentProfileRow>, AppError> {
    let row = store::view_public_profile(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;
    Ok(Json(row))
}

/// GET /api/marketplace/talents/search
pub async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<TalentSearchQuery>,
) -> Result<Json<Paginated<TalentProfileRow>>, AppError> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .validate()?;
    if let (Some(min), Some(max)) = (query.hourly_min, query.hourly_max) {
        if min > max {
            return Err(AppError::Validation("hourly_min cannot exceed hourly_max".into()));
        }
    }

    let (rows, total) = store::search_profiles(&state.db, &query.filters(), page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

// ────────────────────────────────────────────────────────────────────────────
// Talent requests
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/marketplace/requests
/// Match generation runs in the background; the response does not wait for it.
pub async fn handle_create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<TalentRequestInput>,
) -> Result<(StatusCode, Json<TalentRequestRow>), AppError> {
    auth.require_role(&[Role::Recruiter, Role::Admin])?;
    if input.title.trim().is_empty() || input.company_name.trim().is_empty() {
        return Err(AppError::Validation("title and company_name are required".into()));
    }

    let request = store::insert_request(&state.db, auth.id, &input).await?;
    info!("Talent request {} created by {}", request.id, auth.id);

    let background = state.clone();
    let spawned = request.clone();
    tokio::spawn(async move {
        if let Err(e) = engine::generate_for_request(&background, &spawned).await {
            error!("Match generation for request {} failed: {e}", spawned.id);
        }
    });

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/marketplace/requests/mine
pub async fn handle_my_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<TalentRequestRow>>, AppError> {
    auth.require_role(&[Role::Recruiter, Role::Admin])?;
    let page = query.validate()?;
    let (rows, total) = store::list_recruiter_requests(&state.db, auth.id, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

/// GET /api/marketplace/requests/:id/matches
pub async fn handle_request_matches(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<TalentMatchView>>, AppError> {
    let page = query.validate()?;
    let request = store::find_request(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {id} not found")))?;
    auth.require_owner(request.recruiter_id)?;

    let (rows, total) =
        matches::list_for_requirement(&state.db, RequirementKind::TalentRequest, id, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

// ────────────────────────────────────────────────────────────────────────────
// Matches
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/marketplace/matches/talent
pub async fn handle_talent_matches(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<RequirementMatchView>>, AppError> {
    let page = query.validate()?;
    let talent = own_talent_profile(&state, &auth).await?;
    let (rows, total) = matches::list_for_profile(&state.db, talent.id, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

/// PUT /api/marketplace/matches/:id/status
/// The caller must be the matched talent or the owner of the offer/request.
pub async fn handle_update_match_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<MatchStatusUpdate>,
) -> Result<Json<MatchResultRow>, AppError> {
    let result = matches::find_match(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Match {id} not found")))?;

    let talent_user = store::find_profile(&state.db, result.profile_id)
        .await?
        .map(|t| t.user_id);
    let kind = RequirementKind::parse(&result.requirement_kind)
        .ok_or_else(|| anyhow::anyhow!("match {id} has unknown kind {}", result.requirement_kind))?;
    let owner = matches::requirement_owner(&state.db, kind, result.requirement_id).await?;

    let actor = if talent_user == Some(auth.id) {
        Actor::Talent
    } else if owner == Some(auth.id) || auth.is_admin() {
        Actor::Recruiter
    } else {
        return Err(AppError::Forbidden);
    };

    Ok(Json(matches::update_status(&state.db, id, update.status, actor).await?))
}

/// GET /api/marketplace/stats
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<MarketplaceStats>, AppError> {
    Ok(Json(store::marketplace_stats(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parsing() {
        assert_eq!(csv(Some("web, mobile ,,data")), vec!["web", "mobile", "data"]);
        assert!(csv(None).is_empty());
        assert_eq!(csv_lower(Some("React,NODE.js")), vec!["react", "node.js"]);
    }

    #[test]
    fn test_search_filters_drop_blank_values() {
        let query = TalentSearchQuery {
            country: Some("  ".to_string()),
            region: Some("west_africa".to_string()),
            ..Default::default()
        };
        let filters = query.filters();
        assert_eq!(filters.country, None);
        assert_eq!(filters.region.as_deref(), Some("west_africa"));
        assert!(filters.skills.is_empty());
    }
}
