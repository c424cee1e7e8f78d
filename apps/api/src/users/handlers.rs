use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{PublicUser, Role};
use crate::pagination::{PageQuery, Paginated};
use crate::state::AppState;
use crate::storage::{cv_extension, upload_cv, MAX_CV_BYTES};
use crate::users::store::{self, PlatformStats, ProfileUpdate, UserStats};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CvUploadResponse {
    pub cv_key: String,
}

/// GET /api/users/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = store::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    Ok(Json(user.into()))
}

/// PUT /api/users/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<PublicUser>, AppError> {
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&update.first_name) || blank(&update.last_name) {
        return Err(AppError::Validation("names cannot be empty".into()));
    }

    let user = store::update_profile(&state.db, auth.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    Ok(Json(user.into()))
}

/// POST /api/users/me/cv, multipart field `cv`
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<CvUploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("cv") {
            continue;
        }

        let extension = cv_extension(field.file_name(), field.content_type())
            .ok_or_else(|| AppError::Validation("only PDF, DOC and DOCX files are accepted".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".into()));
        }
        if bytes.len() > MAX_CV_BYTES {
            return Err(AppError::Validation("CV must not exceed 5 MiB".into()));
        }

        let key = upload_cv(&state.s3, &state.config.s3_bucket, auth.id, extension, bytes.to_vec()).await?;
        store::set_cv_key(&state.db, auth.id, &key).await?;
        return Ok(Json(CvUploadResponse { cv_key: key }));
    }

    Err(AppError::Validation("missing `cv` file field".into()))
}

/// GET /api/admin/stats (admin)
pub async fn handle_admin_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PlatformStats>, AppError> {
    auth.require_role(&[Role::Admin])?;
    Ok(Json(store::platform_stats(&state.db).await?))
}

/// GET /api/users (admin)
pub async fn handle_list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Paginated<PublicUser>>, AppError> {
    auth.require_role(&[Role::Admin])?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .validate()?;

    let (rows, total) = store::list_users(&state.db, query.search.as_deref(), query.role, page).await?;
    let users = rows.into_iter().map(PublicUser::from).collect();
    Ok(Json(Paginated::new(users, page, total)))
}

/// GET /api/users/me/stats
pub async fn handle_user_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserStats>, AppError> {
    Ok(Json(store::user_stats(&state.db, auth.id).await?))
}
