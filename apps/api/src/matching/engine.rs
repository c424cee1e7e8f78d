//! Batch and on-demand matching around the scorer.
//!
//! The scorer itself is pure; everything here loads candidates, feeds them
//! through `AppState::scorer` and persists what is worth keeping.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::marketplace::store as talents;
use crate::matching::scorer::MatchOutcome;
use crate::matching::store;
use crate::models::matching::RequirementKind;
use crate::models::notification::NotificationKind;
use crate::models::offer::OfferRow;
use crate::models::talent::{TalentProfileRow, TalentRequestRow};
use crate::notifications::service::notify_quietly;
use crate::notifications::store::NewNotification;
use crate::offers;
use crate::offers::requirement::effective_requirement;
use crate::state::AppState;

/// Open offers considered when recommending offers to one candidate.
const OFFER_SCAN_LIMIT: i64 = 200;

#[derive(Debug, Serialize)]
pub struct OfferRecommendation {
    pub offer_id: Uuid,
    pub title: String,
    pub kind: String,
    pub location: String,
    #[serde(flatten)]
    pub outcome: MatchOutcome,
}

#[derive(Debug, Serialize)]
pub struct CandidateRecommendation {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(flatten)]
    pub outcome: MatchOutcome,
}

/// Scores active public profiles against a talent request and keeps the ones
/// above the configured minimum. A profile that fails to score or persist is
/// logged and skipped. Returns the number of stored matches.
pub async fn generate_for_request(state: &AppState, request: &TalentRequestRow) -> Result<usize, AppError> {
    let requirement = &request.requirement.0;
    let candidates = talents::candidates_for_request(
        &state.db,
        &request.domains,
        &requirement.location.regions,
        state.config.match_candidate_limit,
    )
    .await?;

    let as_of = Utc::now().date_naive();
    let mut saved = 0usize;

    for talent in &candidates {
        let outcome = match state.scorer.score(&talent.profile.0, requirement, as_of).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Scoring profile {} for request {} failed: {e}", talent.id, request.id);
                continue;
            }
        };
        if outcome.match_score <= state.config.match_min_score {
            continue;
        }

        match store::upsert_match(
            &state.db,
            talent.id,
            RequirementKind::TalentRequest,
            request.id,
            &outcome,
        )
        .await
        {
            Ok(row) => {
                saved += 1;
                notify_quietly(
                    &state.db,
                    &state.hub,
                    NewNotification {
                        user_id: talent.user_id,
                        sender_id: Some(request.recruiter_id),
                        title: "New match".to_string(),
                        message: format!(
                            "{} is looking for \"{}\" ({}% match)",
                            request.company_name, request.title, outcome.match_score
                        ),
                        kind: NotificationKind::NewMatch,
                        offer_id: None,
                        data: json!({ "match_id": row.id, "request_id": request.id }),
                    },
                )
                .await;
            }
            Err(e) => warn!("Storing match of profile {} for request {} failed: {e}", talent.id, request.id),
        }
    }

    let count = i32::try_from(saved).unwrap_or(i32::MAX);
    talents::set_match_count(&state.db, request.id, count).await?;

    info!(
        "Match generation for request {}: {} candidates scored, {} stored",
        request.id,
        candidates.len(),
        saved
    );
    Ok(saved)
}

/// Scores one profile against one offer and persists the result.
pub async fn score_offer(
    state: &AppState,
    talent: &TalentProfileRow,
    offer: &OfferRow,
) -> Result<crate::models::matching::MatchResultRow, AppError> {
    let requirement = effective_requirement(offer);
    let outcome = state
        .scorer
        .score(&talent.profile.0, &requirement, Utc::now().date_naive())
        .await?;
    Ok(store::upsert_match(&state.db, talent.id, RequirementKind::Offer, offer.id, &outcome).await?)
}

/// Best open offers for a candidate, excluding offers already applied to.
pub async fn best_offers_for_candidate(
    state: &AppState,
    talent: &TalentProfileRow,
    limit: usize,
) -> Result<Vec<OfferRecommendation>, AppError> {
    let offers = offers::store::open_offers_not_applied(&state.db, talent.user_id, OFFER_SCAN_LIMIT).await?;
    let as_of = Utc::now().date_naive();

    let mut ranked = Vec::with_capacity(offers.len());
    for offer in offers {
        let requirement = effective_requirement(&offer);
        let outcome = match state.scorer.score(&talent.profile.0, &requirement, as_of).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Scoring offer {} for profile {} failed: {e}", offer.id, talent.id);
                continue;
            }
        };
        if outcome.match_score > state.config.match_min_score {
            if let Err(e) =
                store::upsert_match(&state.db, talent.id, RequirementKind::Offer, offer.id, &outcome).await
            {
                warn!("Storing match of profile {} for offer {} failed: {e}", talent.id, offer.id);
            }
        }
        ranked.push(OfferRecommendation {
            offer_id: offer.id,
            title: offer.title,
            kind: offer.kind,
            location: offer.location,
            outcome,
        });
    }

    ranked.sort_by(|a, b| b.outcome.match_score.cmp(&a.outcome.match_score));
    ranked.truncate(limit);
    Ok(ranked)
}

/// Best profiles for an offer, excluding candidates who already applied.
pub async fn best_candidates_for_offer(
    state: &AppState,
    offer: &OfferRow,
    limit: usize,
) -> Result<Vec<CandidateRecommendation>, AppError> {
    let candidates =
        talents::candidates_for_offer(&state.db, offer.id, state.config.match_candidate_limit).await?;
    let requirement = effective_requirement(offer);
    let as_of = Utc::now().date_naive();

    let mut ranked = Vec::with_capacity(candidates.len());
    for talent in candidates {
        match state.scorer.score(&talent.profile.0, &requirement, as_of).await {
            Ok(outcome) => ranked.push(CandidateRecommendation {
                profile_id: talent.id,
                user_id: talent.user_id,
                title: talent.title,
                outcome,
            }),
            Err(e) => warn!("Scoring profile {} for offer {} failed: {e}", talent.id, offer.id),
        }
    }

    ranked.sort_by(|a, b| b.outcome.match_score.cmp(&a.outcome.match_score));
    ranked.truncate(limit);
    Ok(ranked)
}
