use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::auth::tokens::{verify, TokenKind};
use crate::errors::AppError;
use crate::models::user::Role;
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Caller identity taken from a valid access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of the resource, or an admin.
    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = request_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;

        let claims = verify(&state.config.jwt_secret, &token, TokenKind::Access)?;
        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Bearer header first, then the `token` cookie.
fn request_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(ACCESS_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; token=jwt-value; refresh_token=r"),
        );
        assert_eq!(request_token(&headers).as_deref(), Some("jwt-value"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(request_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_empty_cookie_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token=; refresh_token=r"));
        assert_eq!(request_token(&headers), None);
    }

    #[test]
    fn test_role_guards() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Candidate,
        };
        assert!(user.require_role(&[Role::Candidate]).is_ok());
        assert!(matches!(
            user.require_role(&[Role::Recruiter, Role::Admin]),
            Err(AppError::Forbidden)
        ));
        assert!(user.require_owner(user.id).is_ok());
        assert!(user.require_owner(Uuid::new_v4()).is_err());

        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(admin.require_owner(Uuid::new_v4()).is_ok());
    }
}
