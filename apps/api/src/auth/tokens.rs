use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::Role;

pub const ACCESS_TTL_HOURS: i64 = 24;
pub const REFRESH_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

pub fn issue(secret: &str, user_id: Uuid, role: Role, kind: TokenKind) -> Result<String, AppError> {
    let now = Utc::now();
    let ttl = match kind {
        TokenKind::Access => Duration::hours(ACCESS_TTL_HOURS),
        TokenKind::Refresh => Duration::days(REFRESH_TTL_DAYS),
    };
    let claims = Claims {
        sub: user_id,
        role,
        kind,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
}

pub fn issue_pair(
    access_secret: &str,
    refresh_secret: &str,
    user_id: Uuid,
    role: Role,
) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: issue(access_secret, user_id, role, TokenKind::Access)?,
        refresh_token: issue(refresh_secret, user_id, role, TokenKind::Refresh)?,
        expires_in: ACCESS_TTL_HOURS * 3600,
    })
}

/// Decodes and validates signature, expiry and token kind.
pub fn verify(secret: &str, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| AppError::Unauthorized(format!("invalid token: {err}")))?;

    if data.claims.kind != expected {
        return Err(AppError::Unauthorized("wrong token type".into()));
    }
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip() {
        let user = Uuid::new_v4();
        let token = issue("secret", user, Role::Recruiter, TokenKind::Access).unwrap();
        let claims = verify("secret", &token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Recruiter);
        assert_eq!(claims.exp - claims.iat, ACCESS_TTL_HOURS * 3600);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let token = issue("secret", Uuid::new_v4(), Role::Candidate, TokenKind::Refresh).unwrap();
        assert!(matches!(
            verify("secret", &token, TokenKind::Access),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue("secret", Uuid::new_v4(), Role::Candidate, TokenKind::Access).unwrap();
        assert!(verify("other", &token, TokenKind::Access).is_err());
        assert!(verify("secret", "not-a-jwt", TokenKind::Access).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Candidate,
            kind: TokenKind::Access,
            iat: 1_000,
            exp: 2_000,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(verify("secret", &token, TokenKind::Access).is_err());
    }
}
