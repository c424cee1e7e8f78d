use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::info;

use crate::auth::extractor::{ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::auth::tokens::{self, issue_pair, verify, TokenKind, TokenPair, ACCESS_TTL_HOURS, REFRESH_TTL_DAYS};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::user::{PublicUser, Role};
use crate::state::AppState;
use crate::users::store::{self, NewUser};

const BAD_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

impl RegisterRequest {
    fn validate(&self) -> Result<Role, AppError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("a valid email is required".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::Validation("first and last name are required".into()));
        }
        match self.role.unwrap_or(Role::Candidate) {
            Role::Admin => Err(AppError::Forbidden),
            role => Ok(role),
        }
    }
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = req.validate()?;
    let password_hash = hash_password(req.password.clone()).await?;

    let user = store::insert_user(
        &state.db,
        NewUser {
            email: &req.email,
            password_hash: &password_hash,
            first_name: &req.first_name,
            last_name: &req.last_name,
            role,
            title: &req.title,
            company: &req.company,
            location: &req.location,
            phone: &req.phone,
        },
    )
    .await
    .map_err(|e| AppError::from_unique(e, "email already registered"))?;

    info!("Registered user {} as {}", user.id, role.as_str());

    let tokens = issue_pair(&state.config.jwt_secret, &state.config.jwt_refresh_secret, user.id, role)?;
    let jar = with_session(jar, &state.config, &tokens);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = store::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.into()))?;

    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let role = Role::parse(&user.role)
        .ok_or_else(|| anyhow::anyhow!("user {} has unknown role {}", user.id, user.role))?;
    store::touch_last_login(&state.db, user.id).await?;

    let tokens = issue_pair(&state.config.jwt_secret, &state.config.jwt_refresh_secret, user.id, role)?;
    let jar = with_session(jar, &state.config, &tokens);
    Ok((
        jar,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// POST /api/auth/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let token = body
        .and_then(|Json(req)| req.refresh_token)
        .or_else(|| {
            jar.get(REFRESH_COOKIE)
                .map(|cookie| cookie.value().to_string())
                .filter(|value| !value.is_empty())
        })
        .ok_or_else(|| AppError::Unauthorized("refresh token required".into()))?;

    let claims = verify(&state.config.jwt_refresh_secret, &token, TokenKind::Refresh)?;

    // The account may have been removed since the refresh token was issued.
    let user = store::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".into()))?;
    let role = Role::parse(&user.role).unwrap_or(claims.role);

    let access_token = tokens::issue(&state.config.jwt_secret, user.id, role, TokenKind::Access)?;
    let jar = jar.add(session_cookie(
        &state.config,
        ACCESS_COOKIE,
        access_token.clone(),
        Duration::hours(ACCESS_TTL_HOURS),
    ));

    Ok((
        jar,
        Json(serde_json::json!({
            "access_token": access_token,
            "expires_in": ACCESS_TTL_HOURS * 3600,
        })),
    ))
}

/// POST /api/auth/logout
pub async fn handle_logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));
    (jar, Json(serde_json::json!({ "message": "logged out" })))
}

fn with_session(jar: CookieJar, config: &Config, tokens: &TokenPair) -> CookieJar {
    jar.add(session_cookie(
        config,
        ACCESS_COOKIE,
        tokens.access_token.clone(),
        Duration::hours(ACCESS_TTL_HOURS),
    ))
    .add(session_cookie(
        config,
        REFRESH_COOKIE,
        tokens.refresh_token.clone(),
        Duration::days(REFRESH_TTL_DAYS),
    ))
}

fn session_cookie(config: &Config, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(max_age)
        .build()
}
