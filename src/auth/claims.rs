/// JWT Claims structure
///
/// The access token carries only the subject's user id plus the standard
/// registered claims (RFC 7519). Validity is determined purely by signature
/// and expiry; no store lookup is involved.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl Claims {
    pub fn new(user_id: Uuid, expiry_seconds: i64, issuer: String, audience: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            aud: audience,
        }
    }

    /// Extract the user ID from the subject claim.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            3600,
            "studytrack".to_string(),
            "studytrack-client".to_string(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, "studytrack");
        assert_eq!(claims.aud, "studytrack-client");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            3600,
            "studytrack".to_string(),
            "studytrack-client".to_string(),
        );

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(
            Uuid::new_v4(),
            3600,
            "studytrack".to_string(),
            "studytrack-client".to_string(),
        );
        claims.sub = "invalid-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_expired_claims() {
        let claims = Claims::new(
            Uuid::new_v4(),
            -10,
            "studytrack".to_string(),
            "studytrack-client".to_string(),
        );
        assert!(claims.is_expired());
    }
}
