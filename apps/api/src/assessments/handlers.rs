use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::assessments::lifecycle::{self, StartAction};
use crate::assessments::scoring::{score_response, summarize, ResultSummary};
use crate::assessments::store;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::assessment::{
    AssessmentListRow, AssessmentResponseRow, AssessmentRow, AssessmentStatus, AssessmentType,
    GapDetailRow,
};
use crate::models::competency::{AssessmentQuestionRow, QuestionDetailRow, QuestionType};
use crate::models::project::ProjectRef;
use crate::models::user::{UserRef, UserRole};
use crate::projects::{fetch_project, is_enrolled};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssessmentListQuery {
    pub project_id: Option<Uuid>,
    pub status: Option<AssessmentStatus>,
    #[serde(rename = "type")]
    pub assessment_type: Option<AssessmentType>,
}

/// GET /api/assessments
pub async fn handle_list_assessments(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<AssessmentListQuery>,
) -> Result<Json<Vec<AssessmentListRow>>, AppError> {
    let participant_filter = caller.is_participant().then_some(caller.id);
    // Client admins are confined to their organization's projects.
    let organization_filter = match caller.role {
        UserRole::ClientAdmin => Some(caller.organization_id.unwrap_or_else(Uuid::nil)),
        _ => None,
    };

    let rows: Vec<AssessmentListRow> = sqlx::query_as(
        r#"
        SELECT a.*,
               p.name AS project_name,
               ins.name AS instrument_name, ins.instrument_type,
               u.first_name AS participant_first_name,
               u.last_name AS participant_last_name,
               u.email AS participant_email,
               (SELECT COUNT(*) FROM assessment_responses r WHERE r.assessment_id = a.id) AS response_count,
               (SELECT COUNT(*) FROM gap_analyses g WHERE g.assessment_id = a.id) AS gap_analysis_count
        FROM assessments a
        JOIN projects p ON p.id = a.project_id
        JOIN assessment_instruments ins ON ins.id = a.instrument_id
        JOIN users u ON u.id = a.participant_id
        WHERE ($1::uuid IS NULL OR a.project_id = $1)
          AND ($2::text IS NULL OR a.status = $2)
          AND ($3::text IS NULL OR a.assessment_type = $3)
          AND ($4::uuid IS NULL OR a.participant_id = $4)
          AND ($5::uuid IS NULL OR p.organization_id = $5)
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(query.project_id)
    .bind(query.status.map(|s| s.as_str()))
    .bind(query.assessment_type.map(|t| t.as_str()))
    .bind(participant_filter)
    .bind(organization_filter)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct StartAssessmentRequest {
    pub project_id: Uuid,
    pub assessment_type: AssessmentType,
}

#[derive(Debug, Serialize)]
pub struct AssessmentWithQuestions {
    #[serde(flatten)]
    pub assessment: AssessmentRow,
    pub questions: Vec<QuestionDetailRow>,
}

/// POST /api/assessments/start
pub async fn handle_start_assessment(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<StartAssessmentRequest>,
) -> Result<(StatusCode, Json<AssessmentWithQuestions>), AppError> {
    if caller.is_participant() && !is_enrolled(&state.db, req.project_id, caller.id).await? {
        return Err(AppError::Forbidden("Not enrolled in this project".to_string()));
    }

    let project = fetch_project(&state.db, req.project_id).await?;
    let instrument = store::active_instrument(&state.db, project.domain_id)
        .await?
        .ok_or_else(|| AppError::Validation("No active assessment instrument found".to_string()))?;

    let existing: Option<AssessmentRow> = sqlx::query_as(
        r#"
        SELECT * FROM assessments
        WHERE participant_id = $1 AND project_id = $2 AND assessment_type = $3
        "#,
    )
    .bind(caller.id)
    .bind(project.id)
    .bind(req.assessment_type.as_str())
    .fetch_optional(&state.db)
    .await?;

    let existing_status = existing
        .as_ref()
        .map(|a| a.status.parse::<AssessmentStatus>())
        .transpose()?;

    let (status, assessment) = match (lifecycle::start_action(existing_status)?, existing) {
        (StartAction::Resume, Some(a)) => (StatusCode::OK, a),
        (StartAction::Activate, Some(a)) => {
            let activated: AssessmentRow = sqlx::query_as(
                r#"
                UPDATE assessments
                SET status = 'IN_PROGRESS', started_at = COALESCE(started_at, now())
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(a.id)
            .fetch_one(&state.db)
            .await?;
            (StatusCode::OK, activated)
        }
        _ => {
            let (created, row) = store::create_or_fetch_assessment(
                &state.db,
                caller.id,
                project.id,
                instrument.id,
                req.assessment_type,
            )
            .await?;
            if created {
                info!(
                    "Started {} assessment {} for user {} in project {}",
                    req.assessment_type, row.id, caller.id, project.id
                );
                (StatusCode::CREATED, row)
            } else {
                (StatusCode::OK, row)
            }
        }
    };

    let questions = questions_for(&state, &caller, &assessment).await?;
    Ok((status, Json(AssessmentWithQuestions { assessment, questions })))
}

/// Instrument questions, with the answer key hidden from participants
/// until the assessment is completed.
async fn questions_for(
    state: &AppState,
    caller: &AuthUser,
    assessment: &AssessmentRow,
) -> Result<Vec<QuestionDetailRow>, AppError> {
    let questions = store::instrument_questions(&state.db, assessment.instrument_id).await?;
    let reveal = !caller.is_participant() || assessment.status == AssessmentStatus::Completed.as_str();
    Ok(if reveal {
        questions
    } else {
        questions.into_iter().map(QuestionDetailRow::without_answer_key).collect()
    })
}

async fn load_assessment(state: &AppState, id: Uuid) -> Result<AssessmentRow, AppError> {
    store::fetch_assessment(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Assessment"))
}

/// Participants read only their own assessments; client admins only those of
/// their organization's projects.
async fn ensure_can_view(state: &AppState, caller: &AuthUser, assessment: &AssessmentRow) -> Result<(), AppError> {
    if caller.is_participant() {
        return if assessment.participant_id == caller.id {
            Ok(())
        } else {
            Err(AppError::forbidden())
        };
    }
    if !caller.is_staff() {
        let project = fetch_project(&state.db, assessment.project_id).await?;
        if !caller.can_access_organization(project.organization_id) {
            return Err(AppError::forbidden());
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: AssessmentRow,
    pub project: ProjectRef,
    pub participant: UserRef,
    pub questions: Vec<QuestionDetailRow>,
    pub responses: Vec<AssessmentResponseRow>,
}

/// GET /api/assessments/:id
pub async fn handle_get_assessment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentDetail>, AppError> {
    let assessment = load_assessment(&state, id).await?;
    ensure_can_view(&state, &caller, &assessment).await?;

    let project: ProjectRef = sqlx::query_as("SELECT id, name FROM projects WHERE id = $1")
        .bind(assessment.project_id)
        .fetch_one(&state.db)
        .await?;
    let participant: UserRef =
        sqlx::query_as("SELECT id, first_name, last_name, email FROM users WHERE id = $1")
            .bind(assessment.participant_id)
            .fetch_one(&state.db)
            .await?;
    let responses: Vec<AssessmentResponseRow> = sqlx::query_as(
        "SELECT * FROM assessment_responses WHERE assessment_id = $1 ORDER BY answered_at",
    )
    .bind(assessment.id)
    .fetch_all(&state.db)
    .await?;
    let questions = questions_for(&state, &caller, &assessment).await?;

    Ok(Json(AssessmentDetail {
        assessment,
        project,
        participant,
        questions,
        responses,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResponseInput {
    pub question_id: Uuid,
    pub response_value: Value,
    pub time_spent_seconds: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponsesRequest {
    pub responses: Vec<ResponseInput>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponsesResponse {
    pub message: &'static str,
    pub count: usize,
}

/// POST /api/assessments/:id/responses
pub async fn handle_submit_responses(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SubmitResponsesRequest>,
) -> Result<Json<SubmitResponsesResponse>, AppError> {
    if req.responses.is_empty() {
        return Err(AppError::Validation("responses cannot be empty".to_string()));
    }

    let assessment = load_assessment(&state, id).await?;
    if assessment.participant_id != caller.id {
        return Err(AppError::forbidden());
    }
    lifecycle::ensure_accepts_responses(assessment.status.parse()?)?;

    let questions: HashMap<Uuid, AssessmentQuestionRow> =
        sqlx::query_as::<_, AssessmentQuestionRow>(
            "SELECT * FROM assessment_questions WHERE instrument_id = $1",
        )
        .bind(assessment.instrument_id)
        .fetch_all(&state.db)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();

    // Score everything first so a bad answer leaves nothing half-written.
    let mut scored = Vec::with_capacity(req.responses.len());
    for input in &req.responses {
        if input.response_value.is_null() {
            return Err(AppError::Validation(format!(
                "response_value is required for question {}",
                input.question_id
            )));
        }
        if let Some(seconds) = input.time_spent_seconds {
            if seconds < 0 {
                return Err(AppError::Validation("time_spent_seconds must be >= 0".to_string()));
            }
        }
        let question = questions.get(&input.question_id).ok_or_else(|| {
            AppError::Validation(format!(
                "Question {} is not part of this assessment",
                input.question_id
            ))
        })?;
        let question_type: QuestionType = question.question_type.parse()?;
        let score = score_response(
            question_type,
            question.points,
            question.correct_answer.as_ref(),
            &input.response_value,
        )?;
        scored.push((input, score));
    }

    let mut tx = state.db.begin().await?;
    // Row lock: a completion racing this request either finishes first or waits.
    let still_open: bool = sqlx::query_scalar(
        "SELECT status = 'IN_PROGRESS' FROM assessments WHERE id = $1 FOR UPDATE",
    )
    .bind(assessment.id)
    .fetch_one(&mut *tx)
    .await?;
    if !still_open {
        return Err(lifecycle::already_completed());
    }
    for (input, score) in &scored {
        sqlx::query(
            r#"
            INSERT INTO assessment_responses
                (assessment_id, question_id, response_value, score, time_spent_seconds)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (assessment_id, question_id) DO UPDATE SET
                response_value     = EXCLUDED.response_value,
                score              = EXCLUDED.score,
                time_spent_seconds = EXCLUDED.time_spent_seconds,
                answered_at        = now()
            "#,
        )
        .bind(assessment.id)
        .bind(input.question_id)
        .bind(&input.response_value)
        .bind(score)
        .bind(input.time_spent_seconds)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(Json(SubmitResponsesResponse {
        message: "Responses saved",
        count: scored.len(),
    }))
}

#[derive(Debug, Serialize)]
pub struct CompleteAssessmentResponse {
    pub message: &'static str,
    pub assessment: AssessmentRow,
    pub gap_analysis: Vec<GapDetailRow>,
}

/// POST /api/assessments/:id/complete
pub async fn handle_complete_assessment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CompleteAssessmentResponse>, AppError> {
    let assessment = load_assessment(&state, id).await?;
    if assessment.participant_id != caller.id && !caller.is_staff() {
        return Err(AppError::forbidden());
    }
    lifecycle::ensure_can_complete(assessment.status.parse()?)?;

    let gap_analysis = store::complete_assessment(&state.db, &assessment).await?;
    let assessment = load_assessment(&state, id).await?;

    Ok(Json(CompleteAssessmentResponse {
        message: "Assessment completed",
        assessment,
        gap_analysis,
    }))
}

#[derive(Debug, Serialize)]
pub struct AssessmentHeader {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub assessment_type: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_taken_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentResults {
    pub assessment: AssessmentHeader,
    pub participant: UserRef,
    pub project: ProjectRef,
    pub summary: ResultSummary,
    pub gap_analysis: Vec<GapDetailRow>,
}

/// GET /api/assessments/:id/results
pub async fn handle_assessment_results(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentResults>, AppError> {
    let assessment = load_assessment(&state, id).await?;
    ensure_can_view(&state, &caller, &assessment).await?;

    let responses = store::scored_responses(&state.db, assessment.id).await?;
    let gap_analysis = store::gap_details(&state.db, assessment.id).await?;
    let participant: UserRef =
        sqlx::query_as("SELECT id, first_name, last_name, email FROM users WHERE id = $1")
            .bind(assessment.participant_id)
            .fetch_one(&state.db)
            .await?;
    let project: ProjectRef = sqlx::query_as("SELECT id, name FROM projects WHERE id = $1")
        .bind(assessment.project_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(AssessmentResults {
        assessment: AssessmentHeader {
            id: assessment.id,
            assessment_type: assessment.assessment_type,
            status: assessment.status,
            started_at: assessment.started_at,
            completed_at: assessment.completed_at,
            time_taken_minutes: assessment.time_taken_minutes,
        },
        participant,
        project,
        summary: summarize(&responses),
        gap_analysis,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::assessments::store;
    use crate::errors::AppError;
    use crate::models::assessment::AssessmentType;
    use crate::models::user::UserRole;
    use crate::testing::{app, create_user, enroll, seeded_project, send, started_baseline, test_state};

    #[sqlx::test(migrations = "./migrations")]
    async fn test_completion_writes_one_gap_row_per_area(pool: PgPool) {
        let state = test_state(pool);
        let app = app(&state);
        let fixture = seeded_project(&state).await;
        let inspector = create_user(&state, UserRole::Participant, Some(fixture.organization_id)).await;
        enroll(&state, fixture.project_id, inspector.id).await;
        let assessment_id = started_baseline(&app, &state, fixture.project_id, &inspector).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/assessments/{assessment_id}/complete"),
            Some(&inspector.token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["assessment"]["status"], "COMPLETED");
        assert_eq!(body["gap_analysis"].as_array().unwrap().len() as i64, fixture.area_count);

        let (rows, negative): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE gap_score < 0) FROM gap_analyses WHERE assessment_id = $1",
        )
        .bind(assessment_id)
        .fetch_one(&state.db)
        .await
        .unwrap();
        assert_eq!(rows, fixture.area_count);
        assert_eq!(negative, 0);

        let distinct_areas: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT competency_area_id) FROM gap_analyses WHERE assessment_id = $1")
                .bind(assessment_id)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(distinct_areas, fixture.area_count);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_completed_assessment_rejects_second_completion_and_new_responses(pool: PgPool) {
        let state = test_state(pool);
        let app = app(&state);
        let fixture = seeded_project(&state).await;
        let inspector = create_user(&state, UserRole::Participant, Some(fixture.organization_id)).await;
        enroll(&state, fixture.project_id, inspector.id).await;
        let assessment_id = started_baseline(&app, &state, fixture.project_id, &inspector).await;
        let complete_uri = format!("/api/assessments/{assessment_id}/complete");

        let (status, _) = send(&app, Method::POST, &complete_uri, Some(&inspector.token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::POST, &complete_uri, Some(&inspector.token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let question_id: Uuid =
            sqlx::query_scalar("SELECT id FROM assessment_questions WHERE question_type = 'SELF_RATING' LIMIT 1")
                .fetch_one(&state.db)
                .await
                .unwrap();
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/assessments/{assessment_id}/responses"),
            Some(&inspector.token),
            Some(json!({ "responses": [{ "question_id": question_id, "response_value": 5 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gap_analyses WHERE assessment_id = $1")
            .bind(assessment_id)
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(rows, fixture.area_count);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_stale_completion_is_rejected_by_status_guard(pool: PgPool) {
        let state = test_state(pool);
        let app = app(&state);
        let fixture = seeded_project(&state).await;
        let inspector = create_user(&state, UserRole::Participant, Some(fixture.organization_id)).await;
        enroll(&state, fixture.project_id, inspector.id).await;
        let assessment_id = started_baseline(&app, &state, fixture.project_id, &inspector).await;

        // Both callers loaded the row while it was still IN_PROGRESS.
        let snapshot = store::fetch_assessment(&state.db, assessment_id).await.unwrap().unwrap();
        store::complete_assessment(&state.db, &snapshot).await.unwrap();
        let second = store::complete_assessment(&state.db, &snapshot).await;
        assert!(matches!(second, Err(AppError::Validation(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_start_returns_existing_row(pool: PgPool) {
        let state = test_state(pool);
        let fixture = seeded_project(&state).await;
        let inspector = create_user(&state, UserRole::Participant, Some(fixture.organization_id)).await;
        let instrument_id: Uuid = sqlx::query_scalar("SELECT id FROM assessment_instruments LIMIT 1")
            .fetch_one(&state.db)
            .await
            .unwrap();

        let kind = AssessmentType::Baseline;
        let ((first_created, first), (second_created, second)) = tokio::try_join!(
            store::create_or_fetch_assessment(&state.db, inspector.id, fixture.project_id, instrument_id, kind),
            store::create_or_fetch_assessment(&state.db, inspector.id, fixture.project_id, instrument_id, kind),
        )
        .unwrap();

        assert_ne!(first_created, second_created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, "IN_PROGRESS");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_repeat_start_resumes_with_ok(pool: PgPool) {
        let state = test_state(pool);
        let app = app(&state);
        let fixture = seeded_project(&state).await;
        let inspector = create_user(&state, UserRole::Participant, Some(fixture.organization_id)).await;
        enroll(&state, fixture.project_id, inspector.id).await;
        let body = json!({ "project_id": fixture.project_id, "assessment_type": "BASELINE" });

        let (status, first) =
            send(&app, Method::POST, "/api/assessments/start", Some(&inspector.token), Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, second) =
            send(&app, Method::POST, "/api/assessments/start", Some(&inspector.token), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["id"], second["id"]);
    }
}
