use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::net::TcpListener;
use serde_json::{json, Value};
use studytrack::auth::save_refresh_token;
use studytrack::configuration::{get_configuration, DatabaseSettings};
use studytrack::startup::run;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let jwt_config = configuration.jwt.clone();
    let server = run(listener, connection_pool.clone(), jwt_config).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn register_user(app: &TestApp, email: &str, password: &str) -> Value {
    let client = reqwest::Client::new();
    let body = json!({
        "first_name": "jane",
        "last_name": "doe",
        "email": email,
        "password": password
    });

    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn login_user(app: &TestApp, email: &str, password: &str) -> Value {
    let client = reqwest::Client::new();
    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_for_valid_input() {
    let app = spawn_app().await;

    let body = register_user(&app, "jane@x.com", "passw0rd").await;
    assert!(body.get("id").is_some());

    let user = sqlx::query("SELECT email, first_name, last_name FROM users WHERE email = 'jane@x.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");

    assert_eq!(user.get::<String, _>("email"), "jane@x.com");
    assert_eq!(user.get::<String, _>("first_name"), "jane");
    assert_eq!(user.get::<String, _>("last_name"), "doe");
}

#[tokio::test]
async fn register_stores_email_lowercased() {
    let app = spawn_app().await;

    register_user(&app, "Jane@X.COM", "passw0rd").await;

    let stored = sqlx::query_scalar::<_, String>("SELECT email FROM users")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");

    assert_eq!(stored, "jane@x.com");
}

#[tokio::test]
async fn register_returns_400_for_invalid_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid_emails = vec!["notanemail", "user@", "@example.com", "user@@example.com"];

    for invalid_email in invalid_emails {
        let body = json!({
            "first_name": "jane",
            "last_name": "doe",
            "email": invalid_email,
            "password": "passw0rd"
        });

        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject invalid email: {}",
            invalid_email
        );
    }
}

#[tokio::test]
async fn register_returns_400_for_weak_password() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let long_password = format!("1{}", "a".repeat(128));
    let weak_passwords = vec![
        ("sh0rt", "password too short"),
        ("nodigitshere", "no digits"),
        (long_password.as_str(), "password too long"),
    ];

    for (weak_password, reason) in weak_passwords {
        let body = json!({
            "first_name": "jane",
            "last_name": "doe",
            "email": "jane@x.com",
            "password": weak_password
        });

        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject weak password: {}",
            reason
        );
    }
}

#[tokio::test]
async fn register_returns_400_for_duplicate_email_case_insensitive() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "jane@x.com", "passw0rd").await;

    // Same address, different casing
    let body = json!({
        "first_name": "jane",
        "last_name": "doe",
        "email": "JANE@X.com",
        "password": "passw0rd"
    });

    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn register_returns_400_for_missing_fields() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let test_cases = vec![
        (json!({"last_name": "doe", "email": "jane@x.com", "password": "passw0rd"}), "missing first name"),
        (json!({"first_name": "jane", "last_name": "doe", "password": "passw0rd"}), "missing email"),
        (json!({"first_name": "jane", "last_name": "doe", "email": "jane@x.com"}), "missing password"),
        (json!({}), "missing all fields"),
    ];

    for (body, reason) in test_cases {
        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject request: {}",
            reason
        );
    }
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let app = spawn_app().await;

    register_user(&app, "jane@x.com", "passw0rd").await;
    let body = login_user(&app, "jane@x.com", "passw0rd").await;

    assert!(!body["access_token"].as_str().unwrap_or("").is_empty());
    assert!(!body["refresh_token"].as_str().unwrap_or("").is_empty());
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_in"].as_i64().unwrap() > 0);
    assert!(body.get("user_id").is_some());
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    let app = spawn_app().await;

    register_user(&app, "A@B.com", "passw0rd").await;
    let body = login_user(&app, "a@b.com", "passw0rd").await;

    assert!(!body["access_token"].as_str().unwrap_or("").is_empty());
}

#[tokio::test]
async fn login_returns_401_for_wrong_password() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "jane@x.com", "passw0rd").await;

    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "jane@x.com", "password": "wrong1234" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_failure_is_identical_for_unknown_user_and_wrong_password() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "jane@x.com", "passw0rd").await;

    let unknown = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "nobody@x.com", "password": "passw0rd" }))
        .send()
        .await
        .expect("Failed to execute request.");

    let wrong = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": "jane@x.com", "password": "wrong1234" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, unknown.status().as_u16());
    assert_eq!(401, wrong.status().as_u16());

    let unknown_body: Value = unknown.json().await.expect("Failed to parse response");
    let wrong_body: Value = wrong.json().await.expect("Failed to parse response");

    // No account-enumeration leak through kind or message
    assert_eq!(unknown_body["code"], wrong_body["code"]);
    assert_eq!(unknown_body["message"], wrong_body["message"]);
}

// --- Token Refresh Tests ---

#[tokio::test]
async fn refresh_rotates_the_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "jane@x.com", "passw0rd").await;
    let login_body = login_user(&app, "jane@x.com", "passw0rd").await;
    let old_refresh_token = login_body["refresh_token"].as_str().unwrap();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": old_refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(!body["access_token"].as_str().unwrap_or("").is_empty());

    let new_refresh_token = body["refresh_token"].as_str().expect("No new refresh token");
    assert_ne!(
        old_refresh_token, new_refresh_token,
        "Refresh token should be rotated on each refresh"
    );

    // The original token is spent: a second presentation fails...
    let replay = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": old_refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, replay.status().as_u16());

    // ...and keeps failing identically (no state change on rejection).
    let replay_again = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": old_refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, replay_again.status().as_u16());

    // The rotated token still works.
    let rotated = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": new_refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, rotated.status().as_u16());
}

#[tokio::test]
async fn concurrent_refreshes_of_one_token_yield_exactly_one_success() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "jane@x.com", "passw0rd").await;
    let login_body = login_user(&app, "jane@x.com", "passw0rd").await;
    let refresh_token = login_body["refresh_token"].as_str().unwrap();

    let request = |token: String| {
        let client = client.clone();
        let url = format!("{}/auth/refresh", &app.address);
        async move {
            client
                .post(&url)
                .json(&json!({ "refresh_token": token }))
                .send()
                .await
                .expect("Failed to execute request.")
                .status()
                .as_u16()
        }
    };

    let (first, second) = tokio::join!(
        request(refresh_token.to_string()),
        request(refresh_token.to_string())
    );

    let statuses = [first, second];
    assert_eq!(
        1,
        statuses.iter().filter(|s| **s == 200).count(),
        "Exactly one concurrent refresh must succeed, got {:?}",
        statuses
    );
    assert_eq!(
        1,
        statuses.iter().filter(|s| **s == 401).count(),
        "The losing refresh must see the token as gone, got {:?}",
        statuses
    );
}

#[tokio::test]
async fn refresh_returns_401_for_unknown_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": "definitely_not_a_valid_token_in_database" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn refresh_returns_401_for_expired_token_before_any_sweep() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let register_body = register_user(&app, "jane@x.com", "passw0rd").await;
    let user_id = uuid::Uuid::parse_str(register_body["id"].as_str().unwrap()).unwrap();

    // Persist a token that expired five minutes ago; no sweep has run.
    let expired_token = studytrack::auth::generate_refresh_token();
    save_refresh_token(&app.db_pool, user_id, &expired_token, -5)
        .await
        .expect("Failed to save refresh token");

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": expired_token }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());

    // Matching deleted the row even though the refresh was rejected.
    let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refresh_tokens")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count tokens");
    assert_eq!(0, remaining);
}

#[tokio::test]
async fn refresh_returns_400_for_missing_or_empty_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let missing = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, missing.status().as_u16());

    let empty = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": "  " }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, empty.status().as_u16());
}

// --- Protected Routes Tests ---

#[tokio::test]
async fn protected_route_returns_401_without_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn protected_route_returns_401_with_invalid_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/me", &app.address))
        .header("Authorization", "Bearer invalid.token.here")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn protected_route_rejects_malformed_authorization_header() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let malformed_headers = vec![
        "Bearer",            // missing token
        "Basic dXNlcjpwYXNz", // not Bearer
        "BearerToken",       // missing space
        "",                  // empty
    ];

    for header in malformed_headers {
        let response = client
            .get(&format!("{}/api/me", &app.address))
            .header("Authorization", header)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            401,
            response.status().as_u16(),
            "Should reject malformed header: {}",
            header
        );
    }
}

#[tokio::test]
async fn get_current_user_returns_200_with_valid_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_user(&app, "jane@x.com", "passw0rd").await;
    let login_body = login_user(&app, "jane@x.com", "passw0rd").await;
    let access_token = login_body["access_token"].as_str().unwrap();

    let response = client
        .get(&format!("{}/api/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "jane@x.com");
    assert_eq!(body["first_name"], "jane");
    assert_eq!(body["last_name"], "doe");
}
