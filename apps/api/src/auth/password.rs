use crate::errors::AppError;

pub const BCRYPT_COST: u32 = 10;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes on the blocking pool; bcrypt is CPU-bound.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("hashing task failed: {e}"))?
        .map_err(|e| anyhow::anyhow!("bcrypt hash failed: {e}"))?;
    Ok(hashed)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| anyhow::anyhow!("verification task failed: {e}"))?
        // A malformed stored hash counts as a mismatch.
        .unwrap_or(false);
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_garbage_hash_is_a_mismatch() {
        assert!(!verify_password("x".to_string(), "not-a-hash".to_string()).await.unwrap());
    }
}
