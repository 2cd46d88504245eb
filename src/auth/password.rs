//! bcrypt hashing off the async runtime

use crate::error::ApiError;

pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("hash error: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task failed: {e}")))?;
    Ok(outcome.unwrap_or_else(|e| {
        tracing::warn!("Stored password hash is unreadable: {e}");
        false
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("Secret1!").await.unwrap();
        assert_ne!(hash, "Secret1!");
        assert!(verify_password("Secret1!", &hash).await.unwrap());
        assert!(!verify_password("Secret2!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_mismatch() {
        assert!(!verify_password("Secret1!", "plaintext").await.unwrap());
    }
}
