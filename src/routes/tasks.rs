/// Task Routes
///
/// Ownership-scoped CRUD for tasks plus a status toggle
/// (active/completed).

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{AppError, AuthError, DatabaseError, ValidationError};
use crate::validators::{validate_description, validate_priority, validate_title};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Deserialize)]
pub struct TaskCreateRequest {
    pub subject_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_priority")]
    pub priority: i16,
}

fn default_priority() -> i16 {
    1
}

#[derive(Deserialize)]
pub struct TaskUpdateRequest {
    pub subject_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: i16,
}

#[derive(Deserialize)]
pub struct TaskStatusRequest {
    pub status: String,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct TaskResponse {
    pub id: Uuid,
    pub subject_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: i16,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// POST /api/tasks
///
/// # Errors
/// - 400: Invalid title/description/priority, or subject not owned by caller
pub async fn create_task(
    claims: web::ReqData<Claims>,
    form: web::Json<TaskCreateRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let title = validate_title(&form.title)?;
    let description = validate_description(form.description.as_deref())?;
    let priority = validate_priority(form.priority)?;

    if let Some(subject_id) = form.subject_id {
        ensure_subject_owned(pool.get_ref(), subject_id, user_id).await?;
    }

    let task_id = Uuid::new_v4();
    let created_at = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO tasks (id, user_id, subject_id, title, description, due_date, priority, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .bind(form.subject_id)
    .bind(&title)
    .bind(&description)
    .bind(form.due_date)
    .bind(priority)
    .bind(STATUS_ACTIVE)
    .bind(created_at)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(user_id = %user_id, task_id = %task_id, "Task created");

    Ok(HttpResponse::Created().json(TaskResponse {
        id: task_id,
        subject_id: form.subject_id,
        title,
        description,
        due_date: form.due_date,
        priority,
        status: STATUS_ACTIVE.to_string(),
        created_at,
    }))
}

/// GET /api/tasks
pub async fn list_tasks(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let tasks = sqlx::query_as::<_, TaskResponse>(
        r#"
        SELECT id, subject_id, title, description, due_date, priority, status, created_at
        FROM tasks
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let task_id = path.into_inner();

    let task = fetch_owned_task(pool.get_ref(), task_id, user_id).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    form: web::Json<TaskUpdateRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let task_id = path.into_inner();
    let title = validate_title(&form.title)?;
    let description = validate_description(form.description.as_deref())?;
    let priority = validate_priority(form.priority)?;

    let existing = fetch_owned_task(pool.get_ref(), task_id, user_id).await?;

    if let Some(subject_id) = form.subject_id {
        ensure_subject_owned(pool.get_ref(), subject_id, user_id).await?;
    }

    sqlx::query(
        r#"
        UPDATE tasks
        SET subject_id = $1, title = $2, description = $3, due_date = $4, priority = $5
        WHERE id = $6
        "#,
    )
    .bind(form.subject_id)
    .bind(&title)
    .bind(&description)
    .bind(form.due_date)
    .bind(priority)
    .bind(task_id)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(user_id = %user_id, task_id = %task_id, "Task updated");

    Ok(HttpResponse::Ok().json(TaskResponse {
        id: task_id,
        subject_id: form.subject_id,
        title,
        description,
        due_date: form.due_date,
        priority,
        status: existing.status,
        created_at: existing.created_at,
    }))
}

/// PATCH /api/tasks/{id}/status
///
/// # Errors
/// - 400: Status other than "active"/"completed"
pub async fn update_task_status(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    form: web::Json<TaskStatusRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let task_id = path.into_inner();

    let status = form.status.trim().to_lowercase();
    if status != STATUS_ACTIVE && status != STATUS_COMPLETED {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "status must be 'active' or 'completed'".to_string(),
        )));
    }

    let mut task = fetch_owned_task(pool.get_ref(), task_id, user_id).await?;

    sqlx::query("UPDATE tasks SET status = $1 WHERE id = $2")
        .bind(&status)
        .bind(task_id)
        .execute(pool.get_ref())
        .await?;

    tracing::info!(user_id = %user_id, task_id = %task_id, status = %status, "Task status updated");

    task.status = status;
    Ok(HttpResponse::Ok().json(task))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let task_id = path.into_inner();

    fetch_owned_task(pool.get_ref(), task_id, user_id).await?;

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(pool.get_ref())
        .await?;

    tracing::info!(user_id = %user_id, task_id = %task_id, "Task deleted");

    Ok(HttpResponse::NoContent().finish())
}

/// Load a task and enforce ownership. A row owned by someone else is a 403,
/// a missing row a 404.
async fn fetch_owned_task(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<TaskResponse, AppError> {
    let row = sqlx::query_as::<_, (Uuid,)>("SELECT user_id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            AppError::Database(DatabaseError::NotFound("Task not found".to_string()))
        })?;

    if row.0 != user_id {
        return Err(AppError::Auth(AuthError::Forbidden));
    }

    let task = sqlx::query_as::<_, TaskResponse>(
        r#"
        SELECT id, subject_id, title, description, due_date, priority, status, created_at
        FROM tasks
        WHERE id = $1
        "#,
    )
    .bind(task_id)
    .fetch_one(pool)
    .await?;

    Ok(task)
}

/// Referenced subjects must belong to the caller; anything else reads as a
/// validation failure rather than leaking other users' subject ids.
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
