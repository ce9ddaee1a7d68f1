/// Authentication Routes
///
/// Handles user registration, login, and refresh-token rotation.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    consume_refresh_token, generate_refresh_token, hash_password, issue_access_token,
    save_refresh_token, verify_password,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::validators::{normalize_email, validate_name};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Registration response
#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: String,
}

/// Login/refresh response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// POST /auth/register
///
/// Register a new user with name, email, and password.
///
/// # Validation
/// - Email must be valid format; stored normalized (trimmed, lowercased)
/// - Duplicate emails are rejected case-insensitively
/// - Password must be 8+ chars with at least one digit
///
/// # Errors
/// - 400: Validation errors (invalid email/password/name, duplicate email)
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    // Validate inputs
    let email = normalize_email(&form.email)?;
    let first_name = validate_name("first_name", &form.first_name)?;
    let last_name = validate_name("last_name", &form.last_name)?;
    let password_hash = hash_password(&form.password)?;

    // Case-insensitive duplicate check; emails are stored normalized so a
    // plain equality test suffices.
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
    )
    .bind(&email)
    .fetch_one(pool.get_ref())
    .await?;

    if exists {
        return Err(AppError::Validation(ValidationError::DuplicateEntry(
            "A user with this email already exists".to_string(),
        )));
    }

    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, first_name, last_name, password_hash, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user_id)
    .bind(&email)
    .bind(&first_name)
    .bind(&last_name)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(RegisterResponse {
        id: user_id.to_string(),
    }))
}

/// POST /auth/login
///
/// Authenticate with email and password; returns an access/refresh token
/// pair.
///
/// # Security Notes
/// - Lookup is case-insensitive (email normalized before matching)
/// - "Unknown user" and "wrong password" return the identical failure,
///   preventing account enumeration
///
/// # Errors
/// - 401: Invalid credentials
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    // Normalize only; a malformed email is just an unknown account here.
    let email = form.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, password_hash FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let (user_id, password_hash) = user;

    let password_valid = verify_password(&form.password, &password_hash)?;
    if !password_valid {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let response = issue_token_pair(pool.get_ref(), user_id, jwt_config.get_ref()).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(response))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a new access/refresh pair.
/// Implements token rotation: the presented token is deleted in the same
/// statement that looks it up, so it can never be redeemed twice, even by
/// two concurrent requests.
///
/// # Errors
/// - 400: Missing/empty refresh token
/// - 401: Unknown, already-rotated, or expired refresh token
/// - 500: Internal server error
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    if form.refresh_token.trim().is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "refresh_token".to_string(),
        )));
    }

    // Atomic lookup-and-delete; the old token is gone from here on.
    let user_id = consume_refresh_token(pool.get_ref(), &form.refresh_token).await?;

    // An orphaned token (owner deleted) is indistinguishable from an
    // invalid one to the caller.
    let owner = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await?;

    if owner.is_none() {
        tracing::warn!(user_id = %user_id, "Refresh token for missing user");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    let response = issue_token_pair(pool.get_ref(), user_id, jwt_config.get_ref()).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "Token refreshed successfully"
    );

    Ok(HttpResponse::Ok().json(response))
}

/// Issue a fresh access token plus a persisted refresh token for a user.
async fn issue_token_pair(
    pool: &PgPool,
    user_id: Uuid,
    jwt_config: &JwtSettings,
) -> Result<AuthResponse, AppError> {
    let (access_token, expires_in) = issue_access_token(&user_id, jwt_config)?;
    let refresh_token = generate_refresh_token();

    save_refresh_token(
        pool,
        user_id,
        &refresh_token,
        jwt_config.refresh_token_expiry_mins,
    )
    .await?;

    Ok(AuthResponse {
        user_id: user_id.to_string(),
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in,
    })
}
