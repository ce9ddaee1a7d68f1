/// Exam Routes
///
/// Ownership-scoped CRUD for exams. An exam always belongs to one of the
/// caller's subjects.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{AppError, AuthError, DatabaseError, ValidationError};
use crate::validators::validate_description;

#[derive(Deserialize)]
pub struct ExamRequest {
    pub subject_id: Uuid,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct ExamResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// POST /api/exams
///
/// # Errors
/// - 400: Invalid description, or subject not owned by caller
pub async fn create_exam(
    claims: web::ReqData<Claims>,
    form: web::Json<ExamRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let description = validate_description(form.description.as_deref())?;

    ensure_subject_owned(pool.get_ref(), form.subject_id, user_id).await?;

    let exam_id = Uuid::new_v4();
    let created_at = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO exams (id, user_id, subject_id, date, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(exam_id)
    .bind(user_id)
    .bind(form.subject_id)
    .bind(form.date)
    .bind(&description)
    .bind(created_at)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(user_id = %user_id, exam_id = %exam_id, "Exam created");

    Ok(HttpResponse::Created().json(ExamResponse {
        id: exam_id,
        subject_id: form.subject_id,
        date: form.date,
        description,
        created_at,
    }))
}

/// GET /api/exams
pub async fn list_exams(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let exams = sqlx::query_as::<_, ExamResponse>(
        r#"
        SELECT id, subject_id, date, description, created_at
        FROM exams
        WHERE user_id = $1
        ORDER BY date
        "#,
    )
    .bind(user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(exams))
}

/// GET /api/exams/{id}
pub async fn get_exam(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let exam_id = path.into_inner();

    let exam = fetch_owned_exam(pool.get_ref(), exam_id, user_id).await?;

    Ok(HttpResponse::Ok().json(exam))
}

/// PUT /api/exams/{id}
pub async fn update_exam(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    form: web::Json<ExamRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let exam_id = path.into_inner();
    let description = validate_description(form.description.as_deref())?;

    let existing = fetch_owned_exam(pool.get_ref(), exam_id, user_id).await?;
    ensure_subject_owned(pool.get_ref(), form.subject_id, user_id).await?;

    sqlx::query(
        r#"
        UPDATE exams
        SET subject_id = $1, date = $2, description = $3
        WHERE id = $4
        "#,
    )
    .bind(form.subject_id)
    .bind(form.date)
    .bind(&description)
    .bind(exam_id)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(user_id = %user_id, exam_id = %exam_id, "Exam updated");

    Ok(HttpResponse::Ok().json(ExamResponse {
        id: exam_id,
        subject_id: form.subject_id,
        date: form.date,
        description,
        created_at: existing.created_at,
    }))
}

/// DELETE /api/exams/{id}
pub async fn delete_exam(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let exam_id = path.into_inner();

    fetch_owned_exam(pool.get_ref(), exam_id, user_id).await?;

    sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(exam_id)
        .execute(pool.get_ref())
        .await?;

    tracing::info!(user_id = %user_id, exam_id = %exam_id, "Exam deleted");

    Ok(HttpResponse::NoContent().finish())
}

async fn fetch_owned_exam(
    pool: &PgPool,
    exam_id: Uuid,
    user_id: Uuid,
) -> Result<ExamResponse, AppError> {
    let row = sqlx::query_as::<_, (Uuid,)>("SELECT user_id FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            AppError::Database(DatabaseError::NotFound("Exam not found".to_string()))
        })?;

    if row.0 != user_id {
        return Err(AppError::Auth(AuthError::Forbidden));
    }

    let exam = sqlx::query_as::<_, ExamResponse>(
        r#"
        SELECT id, subject_id, date, description, created_at
        FROM exams
        WHERE id = $1
        "#,
    )
    .bind(exam_id)
    .fetch_one(pool)
    .await?;

    Ok(exam)
}

async fn ensure_subject_owned(
    pool: &PgPool,
    subject_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    let owned = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1 AND user_id = $2)",
    )
    .bind(subject_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    if !owned {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "subject_id does not reference one of your subjects".to_string(),
        )));
    }
    Ok(())
}
