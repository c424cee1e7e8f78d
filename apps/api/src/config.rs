use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Realtime events stay in-process when unset.
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Matches at or below this score are not persisted by batch generation.
    pub match_min_score: u32,
    pub match_candidate_limit: i64,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_refresh_secret: require_env("JWT_REFRESH_SECRET")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            match_min_score: parse_env("MATCH_MIN_SCORE", 30)
                .context("MATCH_MIN_SCORE must be an integer between 0 and 100")?,
            match_candidate_limit: parse_env("MATCH_CANDIDATE_LIMIT", 50)
                .context("MATCH_CANDIDATE_LIMIT must be an integer")?,
            cookie_secure: parse_env("COOKIE_SECURE", false)
                .context("COOKIE_SECURE must be true or false")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for unit and router tests.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/marketplace_test".to_string(),
            redis_url: None,
            jwt_secret: "test-access-secret".to_string(),
            jwt_refresh_secret: "test-refresh-secret".to_string(),
            s3_bucket: "cvs".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "minio".to_string(),
            aws_secret_access_key: "minio123".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
            match_min_score: 30,
            match_candidate_limit: 50,
            cookie_secure: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u32 = parse_env("MARKETPLACE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_require_env_names_missing_key() {
        let err = require_env("MARKETPLACE_TEST_MISSING_KEY").unwrap_err();
        assert!(err.to_string().contains("MARKETPLACE_TEST_MISSING_KEY"));
    }
}
