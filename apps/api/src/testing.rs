//! Shared fixtures for router-level tests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::jwt::TokenIssuer;
use crate::config::Config;
use crate::models::user::UserRole;
use crate::routes::build_router;
use crate::state::AppState;

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/unused".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_hours: 1,
        s3_bucket: "reports".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "key".to_string(),
        aws_secret_access_key: "secret".to_string(),
        port: 0,
        rust_log: "info".to_string(),
        seed_on_startup: false,
    }
}

/// State over `db` with an offline S3 client.
pub fn test_state(db: PgPool) -> AppState {
    let config = test_config();
    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
        .region(aws_sdk_s3::config::Region::new("us-east-1"))
        .build();
    AppState {
        db,
        s3: aws_sdk_s3::Client::from_conf(s3_config),
        tokens: TokenIssuer::new(&config.jwt_secret, config.jwt_expiry_hours),
        config,
    }
}

/// Sends one request and returns the status with the decoded JSON body
/// (`Null` when the body is empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub struct Caller {
    pub id: Uuid,
    pub token: String,
}

/// Inserts an active user and issues a token for it.
pub async fn create_user(state: &AppState, role: UserRole, organization_id: Option<Uuid>) -> Caller {
    let email = format!("{}@test.local", Uuid::new_v4());
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, role, organization_id)
        VALUES ($1, 'not-a-hash', 'Test', 'User', $2, $3)
        RETURNING id
        "#,
    )
    .bind(&email)
    .bind(role.as_str())
    .bind(organization_id)
    .fetch_one(&state.db)
    .await
    .unwrap();
    let token = state.tokens.issue(id, &email, role).unwrap();
    Caller { id, token }
}

/// The seeded VLR framework plus one SAHPRA project owned by the seeded admin.
pub struct ProjectFixture {
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub area_count: i64,
}

pub async fn seeded_project(state: &AppState) -> ProjectFixture {
    crate::seed::run(&state.db).await.unwrap();

    let organization_id: Uuid = sqlx::query_scalar("SELECT id FROM organizations WHERE name = 'SAHPRA (Demo)'")
        .fetch_one(&state.db)
        .await
        .unwrap();
    let project_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO projects (name, organization_id, domain_id, status, created_by)
        SELECT 'Lot release cohort', $1, d.id, 'ACTIVE', u.id
        FROM competency_domains d, users u
        WHERE d.code = 'VLR' AND u.email = 'admin@emkei.co.ke'
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .fetch_one(&state.db)
    .await
    .unwrap();
    let area_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM competency_areas a JOIN competency_domains d ON d.id = a.domain_id WHERE d.code = 'VLR'",
    )
    .fetch_one(&state.db)
    .await
    .unwrap();

    ProjectFixture {
        project_id,
        organization_id,
        area_count,
    }
}

pub async fn enroll(state: &AppState, project_id: Uuid, user_id: Uuid) {
    sqlx::query("INSERT INTO project_participants (project_id, user_id) VALUES ($1, $2)")
        .bind(project_id)
        .bind(user_id)
        .execute(&state.db)
        .await
        .unwrap();
}

/// Starts a BASELINE assessment for `caller`, answers one self-rating
/// question and returns the assessment id. Leaves it IN_PROGRESS.
pub async fn started_baseline(app: &Router, state: &AppState, project_id: Uuid, caller: &Caller) -> Uuid {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/assessments/start",
        Some(&caller.token),
        Some(serde_json::json!({ "project_id": project_id, "assessment_type": "BASELINE" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let assessment_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();

    let question_id: Uuid =
        sqlx::query_scalar("SELECT id FROM assessment_questions WHERE question_type = 'SELF_RATING' ORDER BY sort_order LIMIT 1")
            .fetch_one(&state.db)
            .await
            .unwrap();
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/assessments/{assessment_id}/responses"),
        Some(&caller.token),
        Some(serde_json::json!({ "responses": [{ "question_id": question_id, "response_value": 3 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assessment_id
}

pub fn app(state: &AppState) -> Router {
    build_router(state.clone())
}
