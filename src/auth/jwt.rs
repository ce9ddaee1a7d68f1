/// JWT Token Generation and Validation
///
/// Access tokens are signed with HMAC-SHA256 using the configured shared
/// secret and validated for signature, issuer, audience, and expiry.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Issue a new access token for a user.
///
/// Returns the serialized token together with its lifetime in seconds,
/// which the login/refresh responses report as `expires_in`.
pub fn issue_access_token(
    user_id: &Uuid,
    config: &JwtSettings,
) -> Result<(String, i64), AppError> {
    let expires_in = config.access_token_expiry_secs();
    let claims = Claims::new(
        *user_id,
        expires_in,
        config.issuer.clone(),
        config.audience.clone(),
    );

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    Ok((token, expires_in))
}

/// Validate an access token and extract its claims.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        AppError::Auth(AuthError::TokenInvalid)
    })
}
