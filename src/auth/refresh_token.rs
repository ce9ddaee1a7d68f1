/// Refresh Token Management
///
/// Refresh tokens are:
/// - Opaque 64-character random strings from a secure RNG
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Single-use: consumption deletes the row and issues a replacement
///   (token rotation)
/// - Database-backed so a stolen token dies with its first use

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Generate a new cryptographically secure refresh token.
///
/// The plaintext is what the client stores; the server keeps only the hash.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Save a refresh token for a user.
///
/// Expiry is absolute: now + `validity_mins`. A user may hold any number of
/// live tokens at once (one per session/device).
pub async fn save_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    validity_mins: i64,
) -> Result<(), AppError> {
    let token_hash = hash_token(token);
    let expires_at = Utc::now() + Duration::minutes(validity_mins);

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Consume a presented refresh token, returning the owning user id.
///
/// Lookup and delete happen in one conditional statement so two concurrent
/// presentations of the same token cannot both succeed: the row is matched
/// and removed atomically, and the loser sees no row at all. A matched but
/// expired token is likewise gone by the time we reject it, which is exactly
/// the rotation invariant (a presented token is never valid twice).
pub async fn consume_refresh_token(pool: &PgPool, token: &str) -> Result<Uuid, AppError> {
    let token_hash = hash_token(token);

    let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        r#"
        DELETE FROM refresh_tokens
        WHERE token_hash = $1
        RETURNING user_id, expires_at
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    match row {
        None => {
            tracing::warn!("Refresh token not found (unknown or already rotated)");
            Err(AppError::Auth(AuthError::TokenInvalid))
        }
        Some((user_id, expires_at)) => {
            if expires_at <= Utc::now() {
                tracing::info!(user_id = %user_id, "Expired refresh token presented");
                return Err(AppError::Auth(AuthError::TokenExpired));
            }
            Ok(user_id)
        }
    }
}

/// Bulk-delete refresh tokens expired longer than `grace_secs` ago.
///
/// One store-side statement; no per-row iteration. Returns the number of
/// rows removed.
pub async fn delete_expired_tokens(pool: &PgPool, grace_secs: i64) -> Result<u64, AppError> {
    let cutoff = Utc::now() - Duration::seconds(grace_secs);

    let result = sqlx::query(
        r#"
        DELETE FROM refresh_tokens
        WHERE expires_at <= $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
