pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;
use crate::{assessments, auth, competencies, curriculum, organizations, projects, reports, users};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/auth/register", post(auth::handlers::handle_register))
        .route("/api/auth/login", post(auth::handlers::handle_login))
        .route("/api/auth/refresh", post(auth::handlers::handle_refresh))
        .route("/api/auth/me", get(auth::handlers::handle_me))
        // Users
        .route("/api/users", get(users::handlers::handle_list_users))
        .route(
            "/api/users/me",
            get(users::handlers::handle_get_me).put(users::handlers::handle_update_me),
        )
        .route(
            "/api/users/me/participant-profile",
            put(users::handlers::handle_upsert_participant_profile),
        )
        .route("/api/users/:id", get(users::handlers::handle_get_user))
        // Organizations
        .route(
            "/api/organizations",
            get(organizations::handlers::handle_list_organizations)
                .post(organizations::handlers::handle_create_organization),
        )
        .route(
            "/api/organizations/:id",
            get(organizations::handlers::handle_get_organization)
                .put(organizations::handlers::handle_update_organization),
        )
        // Projects
        .route(
            "/api/projects",
            get(projects::handlers::handle_list_projects).post(projects::handlers::handle_create_project),
        )
        .route(
            "/api/projects/:id",
            get(projects::handlers::handle_get_project).put(projects::handlers::handle_update_project),
        )
        .route("/api/projects/:id/invite", post(projects::handlers::handle_invite_participants))
        .route(
            "/api/projects/:id/participants",
            get(projects::handlers::handle_list_participants),
        )
        .route(
            "/api/projects/:id/gap-analysis",
            get(projects::handlers::handle_project_gap_analysis),
        )
        // Competency framework
        .route(
            "/api/competencies/domains",
            get(competencies::handlers::handle_list_domains).post(competencies::handlers::handle_create_domain),
        )
        .route("/api/competencies/domains/:id", get(competencies::handlers::handle_get_domain))
        .route("/api/competencies/levels", get(competencies::handlers::handle_list_levels))
        .route(
            "/api/competencies/areas",
            get(competencies::handlers::handle_list_areas).post(competencies::handlers::handle_create_area),
        )
        .route("/api/competencies/areas/:id", get(competencies::handlers::handle_get_area))
        .route("/api/competencies/items", post(competencies::handlers::handle_create_item))
        .route(
            "/api/competencies/instruments",
            get(competencies::handlers::handle_list_instruments),
        )
        .route(
            "/api/competencies/instruments/:id",
            get(competencies::handlers::handle_get_instrument),
        )
        .route(
            "/api/competencies/role-targets",
            get(competencies::handlers::handle_list_role_targets),
        )
        // Assessments
        .route("/api/assessments", get(assessments::handlers::handle_list_assessments))
        .route("/api/assessments/start", post(assessments::handlers::handle_start_assessment))
        .route("/api/assessments/:id", get(assessments::handlers::handle_get_assessment))
        .route(
            "/api/assessments/:id/responses",
            post(assessments::handlers::handle_submit_responses),
        )
        .route(
            "/api/assessments/:id/complete",
            post(assessments::handlers::handle_complete_assessment),
        )
        .route(
            "/api/assessments/:id/results",
            get(assessments::handlers::handle_assessment_results),
        )
        // Curriculum
        .route("/api/curriculum", post(curriculum::handlers::handle_create_curriculum))
        .route(
            "/api/curriculum/learning-units",
            get(curriculum::handlers::handle_list_learning_units),
        )
        .route(
            "/api/curriculum/learning-units/:id",
            get(curriculum::handlers::handle_get_learning_unit),
        )
        // GET takes a project id, PUT a recommendation id.
        .route(
            "/api/curriculum/recommendations/:id",
            get(curriculum::handlers::handle_list_recommendations)
                .put(curriculum::handlers::handle_update_recommendation),
        )
        .route(
            "/api/curriculum/generate-recommendations/:project_id",
            post(curriculum::handlers::handle_generate_recommendations),
        )
        .route(
            "/api/curriculum/project/:project_id",
            get(curriculum::handlers::handle_list_project_curricula),
        )
        .route(
            "/api/curriculum/:id",
            get(curriculum::handlers::handle_get_curriculum).put(curriculum::handlers::handle_update_curriculum),
        )
        // Reports
        .route(
            "/api/reports/individual/:participant_id/:project_id",
            get(reports::handlers::handle_individual_report),
        )
        .route(
            "/api/reports/institutional/:project_id",
            get(reports::handlers::handle_institutional_report),
        )
        .route("/api/reports/benchmarks/:domain_id", get(reports::handlers::handle_benchmarks))
        .route("/api/reports/save", post(reports::handlers::handle_save_report))
        .route(
            "/api/reports/download/:report_id",
            get(reports::handlers::handle_download_report),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::auth::jwt::TokenIssuer;
    use crate::testing::{test_config, test_state};

    /// State whose pool never connects; only routes that reject before
    /// touching the database are exercised here.
    fn test_app() -> Router {
        let db = PgPoolOptions::new()
            .connect_lazy(&test_config().database_url)
            .expect("lazy pool");
        build_router(test_state(db))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "competency-api");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = test_app()
            .oneshot(Request::get("/api/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let response = test_app()
            .oneshot(
                Request::get("/api/projects")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_unauthorized() {
        let foreign = TokenIssuer::new("some-other-secret", 1)
            .issue(uuid::Uuid::new_v4(), "a@b.org", crate::models::user::UserRole::SystemAdmin)
            .unwrap();
        let response = test_app()
            .oneshot(
                Request::get("/api/reports/benchmarks/00000000-0000-0000-0000-000000000000")
                    .header(header::AUTHORIZATION, format!("Bearer {foreign}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_register_body_is_validation_error() {
        let response = test_app()
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email": 42}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
