use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::marketplace::store as talents;
use crate::models::notification::NotificationKind;
use crate::models::offer::{
    ApplicationRow, ApplicationStatus, ApplicationWithOffer, OfferRow, OfferWithCount,
};
use crate::models::user::{PublicUser, Role};
use crate::notifications::service::notify_quietly;
use crate::notifications::store::NewNotification;
use crate::offers::store::{self, OfferInput, OfferPatch, OfferStats};
use crate::pagination::{PageQuery, Paginated};
use crate::state::AppState;
use crate::users;

const OFFER_STATUSES: &[&str] = &["open", "closed", "draft"];
const REMOTE_TYPES: &[&str] = &["on_site", "hybrid", "remote"];

#[derive(Debug, Deserialize)]
pub struct OfferListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationStatusUpdate {
    pub status: ApplicationStatus,
}

async fn load_offer(state: &AppState, id: Uuid) -> Result<OfferRow, AppError> {
    store::find_offer(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {id} not found")))
}

fn validate_remote_type(remote_type: &str) -> Result<(), AppError> {
    if REMOTE_TYPES.contains(&remote_type) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "remote_type must be one of {}",
            REMOTE_TYPES.join(", ")
        )))
    }
}

/// POST /api/offers
pub async fn handle_create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<OfferInput>,
) -> Result<(StatusCode, Json<OfferRow>), AppError> {
    auth.require_role(&[Role::Recruiter, Role::Admin])?;
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    validate_remote_type(&input.remote_type)?;

    let offer = store::insert_offer(&state.db, auth.id, &input).await?;
    info!("Offer {} created by {}", offer.id, auth.id);
    Ok((StatusCode::CREATED, Json(offer)))
}

/// GET /api/offers
pub async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<OfferListQuery>,
) -> Result<Json<Paginated<OfferRow>>, AppError> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .validate()?;
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());

    let (rows, total) = store::list_offers(&state.db, search, query.status.as_deref(), page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

/// GET /api/offers/mine
pub async fn handle_list_mine(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OfferWithCount>>, AppError> {
    auth.require_role(&[Role::Recruiter, Role::Admin])?;
    Ok(Json(store::list_recruiter_offers(&state.db, auth.id).await?))
}

/// GET /api/offers/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferRow>, AppError> {
    Ok(Json(load_offer(&state, id).await?))
}

/// PUT /api/offers/:id
pub async fn handle_update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<OfferPatch>,
) -> Result<Json<OfferRow>, AppError> {
    let offer = load_offer(&state, id).await?;
    auth.require_owner(offer.recruiter_id)?;

    if let Some(remote_type) = &patch.remote_type {
        validate_remote_type(remote_type)?;
    }
    if let Some(status) = &patch.status {
        if !OFFER_STATUSES.contains(&status.as_str()) {
            return Err(AppError::Validation(format!(
                "status must be one of {}",
                OFFER_STATUSES.join(", ")
            )));
        }
    }

    Ok(Json(store::update_offer(&state.db, id, &patch).await?))
}

/// DELETE /api/offers/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let offer = load_offer(&state, id).await?;
    auth.require_owner(offer.recruiter_id)?;
    store::delete_offer(&state.db, id).await?;
    info!("Offer {id} deleted by {}", auth.id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/offers/:id/apply
/// Stores a snapshot of the candidate's account and talent profile as they are now.
pub async fn handle_apply(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    auth.require_role(&[Role::Candidate])?;
    let offer = load_offer(&state, id).await?;
    if offer.status != "open" {
        return Err(AppError::UnprocessableEntity("this offer is no longer open".into()));
    }

    let candidate = users::store::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    let talent = talents::find_by_user(&state.db, auth.id).await?;
    let candidate_name = format!("{} {}", candidate.first_name, candidate.last_name);

    let snapshot = json!({
        "user": PublicUser::from(candidate),
        "talent_profile": talent.map(|t| t.profile.0),
    });

    let application = store::insert_application(&state.db, offer.id, auth.id, &snapshot)
        .await
        .map_err(|e| AppError::from_unique(e, "you have already applied to this offer"))?;

    info!("Candidate {} applied to offer {}", auth.id, offer.id);

    notify_quietly(
        &state.db,
        &state.hub,
        NewNotification {
            user_id: offer.recruiter_id,
            sender_id: Some(auth.id),
            title: "New application".to_string(),
            message: format!("{candidate_name} applied to \"{}\"", offer.title),
            kind: NotificationKind::ApplicationReceived,
            offer_id: Some(offer.id),
            data: json!({ "application_id": application.id }),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/offers/:id/applications
pub async fn handle_offer_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    let offer = load_offer(&state, id).await?;
    auth.require_owner(offer.recruiter_id)?;
    Ok(Json(store::list_offer_applications(&state.db, id).await?))
}

/// PUT /api/offers/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<ApplicationStatusUpdate>,
) -> Result<Json<ApplicationRow>, AppError> {
    if update.status == ApplicationStatus::Pending {
        return Err(AppError::Validation("status must be accepted or rejected".into()));
    }

    let application = store::find_application(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    let offer = load_offer(&state, application.offer_id).await?;
    auth.require_owner(offer.recruiter_id)?;

    let updated = store::set_application_status(&state.db, id, update.status).await?;

    notify_quietly(
        &state.db,
        &state.hub,
        NewNotification {
            user_id: updated.candidate_id,
            sender_id: Some(auth.id),
            title: "Application update".to_string(),
            message: format!(
                "Your application to \"{}\" was {}",
                offer.title,
                update.status.as_str()
            ),
            kind: NotificationKind::ApplicationStatus,
            offer_id: Some(offer.id),
            data: json!({ "application_id": updated.id, "status": update.status }),
        },
    )
    .await;

    Ok(Json(updated))
}

/// GET /api/offers/applications/mine
pub async fn handle_my_applications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ApplicationWithOffer>>, AppError> {
    auth.require_role(&[Role::Candidate])?;
    Ok(Json(store::list_candidate_applications(&state.db, auth.id).await?))
}

/// GET /api/stats/offers
pub async fn handle_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<OfferStats>, AppError> {
    Ok(Json(store::offer_stats(&state.db).await?))
}
