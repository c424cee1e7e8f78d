use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::marketplace::store as talents;
use crate::matching::engine::{self, CandidateRecommendation, OfferRecommendation};
use crate::matching::store::{self, RequirementMatchStats, TalentMatchStats};
use crate::models::matching::{MatchResultRow, RequirementMatchView};
use crate::models::talent::TalentProfileRow;
use crate::models::user::Role;
use crate::offers;
use crate::pagination::{PageQuery, Paginated};
use crate::state::AppState;

const DEFAULT_RECOMMENDATIONS: usize = 10;
const MAX_RECOMMENDATIONS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self) -> Result<usize, AppError> {
        match self.limit.unwrap_or(DEFAULT_RECOMMENDATIONS) {
            n if (1..=MAX_RECOMMENDATIONS).contains(&n) => Ok(n),
            _ => Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_RECOMMENDATIONS}"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum MatchStatsResponse {
    Talent(TalentMatchStats),
    Recruiter { requirements: Vec<RequirementMatchStats> },
}

pub(crate) async fn own_talent_profile(state: &AppState, auth: &AuthUser) -> Result<TalentProfileRow, AppError> {
    talents::find_by_user(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("create a talent profile first".into()))
}

/// GET /api/matching/calculate/:profile_id/offers/:offer_id
pub async fn handle_calculate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((profile_id, offer_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MatchResultRow>, AppError> {
    let talent = talents::find_profile(&state.db, profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {profile_id} not found")))?;
    let offer = offers::store::find_offer(&state.db, offer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {offer_id} not found")))?;

    match auth.role {
        Role::Admin => {}
        Role::Candidate if talent.user_id == auth.id => {}
        Role::Recruiter if offer.recruiter_id == auth.id => {}
        _ => return Err(AppError::Forbidden),
    }

    Ok(Json(engine::score_offer(&state, &talent, &offer).await?))
}

/// GET /api/matching/recommendations?limit=
pub async fn handle_recommendations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<OfferRecommendation>>, AppError> {
    auth.require_role(&[Role::Candidate])?;
    let limit = query.resolve()?;
    let talent = own_talent_profile(&state, &auth).await?;
    Ok(Json(engine::best_offers_for_candidate(&state, &talent, limit).await?))
}

/// GET /api/matching/offers/:id/candidates?limit=
pub async fn handle_offer_candidates(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(offer_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<CandidateRecommendation>>, AppError> {
    auth.require_role(&[Role::Recruiter, Role::Admin])?;
    let limit = query.resolve()?;
    let offer = offers::store::find_offer(&state.db, offer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {offer_id} not found")))?;
    auth.require_owner(offer.recruiter_id)?;

    Ok(Json(engine::best_candidates_for_offer(&state, &offer, limit).await?))
}

/// GET /api/matching/history
pub async fn handle_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<RequirementMatchView>>, AppError> {
    let page = query.validate()?;
    let (rows, total) = match auth.role {
        Role::Candidate => {
            let talent = own_talent_profile(&state, &auth).await?;
            store::history_for_profile(&state.db, talent.id, page).await?
        }
        Role::Recruiter | Role::Admin => store::history_for_recruiter(&state.db, auth.id, page).await?,
    };
    Ok(Json(Paginated::new(rows, page, total)))
}

/// GET /api/matching/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MatchStatsResponse>, AppError> {
    let stats = match auth.role {
        Role::Candidate => {
            let talent = own_talent_profile(&state, &auth).await?;
            MatchStatsResponse::Talent(store::talent_stats(&state.db, talent.id).await?)
        }
        Role::Recruiter | Role::Admin => MatchStatsResponse::Recruiter {
            requirements: store::recruiter_stats(&state.db, auth.id).await?,
        },
    };
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert_eq!(LimitQuery { limit: None }.resolve().unwrap(), DEFAULT_RECOMMENDATIONS);
        assert_eq!(LimitQuery { limit: Some(50) }.resolve().unwrap(), 50);
        assert!(LimitQuery { limit: Some(0) }.resolve().is_err());
        assert!(LimitQuery { limit: Some(51) }.resolve().is_err());
    }
}
