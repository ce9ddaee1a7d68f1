/// Subject Routes
///
/// Ownership-scoped CRUD for subjects. Every operation resolves the caller
/// from the JWT claims and only ever touches that user's rows.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::validators::validate_subject_name;

#[derive(Deserialize)]
pub struct SubjectRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct SubjectResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// POST /api/subjects
///
/// # Errors
/// - 400: Invalid name
/// - 409: Subject with this name already exists for the user
pub async fn create_subject(
    claims: web::ReqData<Claims>,
    form: web::Json<SubjectRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let name = validate_subject_name(&form.name)?;

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM subjects WHERE user_id = $1 AND name = $2)",
    )
    .bind(user_id)
    .bind(&name)
    .fetch_one(pool.get_ref())
    .await?;

    if exists {
        return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
            "Subject with this name already exists".to_string(),
        )));
    }

    let subject_id = Uuid::new_v4();
    let created_at = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO subjects (id, user_id, name, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(subject_id)
    .bind(user_id)
    .bind(&name)
    .bind(created_at)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(user_id = %user_id, subject_id = %subject_id, "Subject created");

    Ok(HttpResponse::Created().json(SubjectResponse {
        id: subject_id.to_string(),
        name,
        created_at: created_at.to_rfc3339(),
    }))
}

/// GET /api/subjects
pub async fn list_subjects(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let subjects = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
        "SELECT id, name, created_at FROM subjects WHERE user_id = $1 ORDER BY name",
    )
    .bind(user_id)
    .fetch_all(pool.get_ref())
    .await?;

    let body: Vec<SubjectResponse> = subjects
        .into_iter()
        .map(|(id, name, created_at)| SubjectResponse {
            id: id.to_string(),
            name,
            created_at: created_at.to_rfc3339(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/subjects/{id}
///
/// # Errors
/// - 403: Subject belongs to another user
/// - 404: Subject not found
pub async fn get_subject(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let subject_id = path.into_inner();

    let (owner, name, created_at) = fetch_subject(pool.get_ref(), subject_id).await?;

    if owner != user_id {
        return Err(AppError::Auth(AuthError::Forbidden));
    }

    Ok(HttpResponse::Ok().json(SubjectResponse {
        id: subject_id.to_string(),
        name,
        created_at: created_at.to_rfc3339(),
    }))
}

/// PUT /api/subjects/{id}
pub async fn update_subject(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    form: web::Json<SubjectRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let subject_id = path.into_inner();
    let name = validate_subject_name(&form.name)?;

    let (owner, _, created_at) = fetch_subject(pool.get_ref(), subject_id).await?;

    if owner != user_id {
        return Err(AppError::Auth(AuthError::Forbidden));
    }

    sqlx::query("UPDATE subjects SET name = $1 WHERE id = $2")
        .bind(&name)
        .bind(subject_id)
        .execute(pool.get_ref())
        .await?;

    tracing::info!(user_id = %user_id, subject_id = %subject_id, "Subject updated");

    Ok(HttpResponse::Ok().json(SubjectResponse {
        id: subject_id.to_string(),
        name,
        created_at: created_at.to_rfc3339(),
    }))
}

/// DELETE /api/subjects/{id}
pub async fn delete_subject(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let subject_id = path.into_inner();

    let (owner, _, _) = fetch_subject(pool.get_ref(), subject_id).await?;

    if owner != user_id {
        return Err(AppError::Auth(AuthError::Forbidden));
    }

    sqlx::query("DELETE FROM subjects WHERE id = $1")
        .bind(subject_id)
        .execute(pool.get_ref())
        .await?;

    tracing::info!(user_id = %user_id, subject_id = %subject_id, "Subject deleted");

    Ok(HttpResponse::NoContent().finish())
}

async fn fetch_subject(
    pool: &PgPool,
    subject_id: Uuid,
) -> Result<(Uuid, String, DateTime<Utc>), AppError> {
    sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
        "SELECT user_id, name, created_at FROM subjects WHERE id = $1",
    )
    .bind(subject_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("Subject not found".to_string())))
}
