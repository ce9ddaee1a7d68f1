/// User Routes
///
/// Current-user lookup for authenticated sessions.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{AppError, DatabaseError};

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
}

/// GET /api/me
///
/// Returns the authenticated user's profile. Claims are injected by the
/// JWT middleware.
///
/// # Errors
/// - 401: Missing or invalid token (handled by middleware)
/// - 404: User row no longer exists
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, (Uuid, String, String, String, DateTime<Utc>)>(
        "SELECT id, email, first_name, last_name, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("User not found".to_string())))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.0.to_string(),
        email: user.1,
        first_name: user.2,
        last_name: user.3,
        created_at: user.4.to_rfc3339(),
    }))
}
