use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::assessments::store::{gap_details, GAP_DETAIL_SELECT};
use crate::auth::{AuthUser, STAFF};
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::assessment::{AssessmentType, GapDetailRow};
use crate::models::competency::{CompetencyAreaRow, CompetencyDomainRow};
use crate::models::report::ImpactReportRow;
use crate::models::user::{UserRef, UserRole};
use crate::reports::analytics::{
    self, AreaBenchmark, AreaImprovement, DevelopmentArea, InstitutionalAreaStat, OverallScores, Strength,
};
use crate::reports::snapshot::{fetch_snapshot, render_report_md, snapshot_key, upload_snapshot, SnapshotInput};
use crate::state::AppState;
use crate::stats::{round_to, PriorityCounts};

/// Project labels shared by the report payloads.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectHeader {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub organization_type: String,
    pub country: String,
    pub domain_id: Uuid,
    pub domain_code: String,
    pub domain_name: String,
}

async fn project_header(pool: &PgPool, caller: &AuthUser, id: Uuid) -> Result<ProjectHeader, AppError> {
    let header: ProjectHeader = sqlx::query_as(
        r#"
        SELECT p.id, p.name, p.status, p.start_date, p.end_date,
               o.id AS organization_id, o.name AS organization_name,
               o.org_type AS organization_type, o.country,
               d.id AS domain_id, d.code AS domain_code, d.name AS domain_name
        FROM projects p
        JOIN organizations o ON o.id = p.organization_id
        JOIN competency_domains d ON d.id = p.domain_id
        WHERE p.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Project"))?;

    ensure_report_scope(caller, header.organization_id)?;
    Ok(header)
}

/// Client admins read reports of their own organization only. Participants
/// are limited to their own reports by each handler, whatever organization
/// they belong to.
fn ensure_report_scope(caller: &AuthUser, organization_id: Uuid) -> Result<(), AppError> {
    if caller.role == UserRole::ClientAdmin && !caller.can_access_organization(organization_id) {
        return Err(AppError::forbidden());
    }
    Ok(())
}

async fn domain_areas(pool: &PgPool, domain_id: Uuid) -> Result<Vec<CompetencyAreaRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM competency_areas WHERE domain_id = $1 ORDER BY sort_order, code")
        .bind(domain_id)
        .fetch_all(pool)
        .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub organization: Option<String>,
    pub role: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AssessmentStamp {
    pub id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_taken_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentPair {
    pub baseline: Option<AssessmentStamp>,
    pub post: Option<AssessmentStamp>,
}

async fn completed_assessment(
    pool: &PgPool,
    participant_id: Uuid,
    project_id: Uuid,
    kind: AssessmentType,
) -> Result<Option<AssessmentStamp>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, completed_at, time_taken_minutes FROM assessments
        WHERE participant_id = $1 AND project_id = $2
          AND assessment_type = $3 AND status = 'COMPLETED'
        "#,
    )
    .bind(participant_id)
    .bind(project_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await
}

async fn gaps_of(pool: &PgPool, stamp: Option<&AssessmentStamp>) -> Result<Vec<GapDetailRow>, sqlx::Error> {
    match stamp {
        Some(a) => gap_details(pool, a.id).await,
        None => Ok(Vec::new()),
    }
}

#[derive(Debug, Serialize)]
pub struct IndividualReport {
    pub participant: ParticipantSummary,
    pub project: ProjectHeader,
    pub assessments: AssessmentPair,
    pub competency_analysis: Vec<GapDetailRow>,
    pub improvements: Option<Vec<AreaImprovement>>,
    pub overall_improvement: Option<f64>,
    pub strengths: Vec<Strength>,
    pub development_areas: Vec<DevelopmentArea>,
    pub generated_at: DateTime<Utc>,
}

/// GET /api/reports/individual/:participant_id/:project_id
pub async fn handle_individual_report(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((participant_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<IndividualReport>, AppError> {
    if caller.is_participant() && caller.id != participant_id {
        return Err(AppError::forbidden());
    }

    let participant: ParticipantSummary = sqlx::query_as(
        r#"
        SELECT u.id, u.first_name || ' ' || u.last_name AS name, u.email,
               o.name AS organization, pp.current_role_type AS role, pp.job_title
        FROM users u
        LEFT JOIN organizations o ON o.id = u.organization_id
        LEFT JOIN participant_profiles pp ON pp.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(participant_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Participant"))?;

    let project = project_header(&state.db, &caller, project_id).await?;

    let baseline = completed_assessment(&state.db, participant_id, project_id, AssessmentType::Baseline).await?;
    let post = completed_assessment(&state.db, participant_id, project_id, AssessmentType::PostTraining).await?;
    let baseline_gaps = gaps_of(&state.db, baseline.as_ref()).await?;
    let post_gaps = gaps_of(&state.db, post.as_ref()).await?;

    let improvements = if baseline.is_some() && post.is_some() {
        let areas = domain_areas(&state.db, project.domain_id).await?;
        Some(analytics::area_improvements(&areas, &baseline_gaps, &post_gaps))
    } else {
        None
    };
    let overall_improvement = improvements.as_deref().and_then(analytics::overall_improvement);

    let latest = if post.is_some() { post_gaps } else { baseline_gaps };

    Ok(Json(IndividualReport {
        participant,
        project,
        assessments: AssessmentPair { baseline, post },
        strengths: analytics::strengths(&latest),
        development_areas: analytics::development_areas(&latest),
        competency_analysis: latest,
        improvements,
        overall_improvement,
        generated_at: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
pub struct CompletionRate {
    pub baseline: f64,
    pub post: f64,
}

#[derive(Debug, Serialize)]
pub struct InstitutionalSummary {
    pub total_participants: i64,
    pub baseline_completed: i64,
    pub post_completed: i64,
    pub completion_rate: CompletionRate,
    pub overall_scores: OverallScores,
    pub overall_improvement: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct InstitutionalReport {
    pub project: ProjectHeader,
    pub summary: InstitutionalSummary,
    pub priority_distribution: PriorityCounts,
    pub area_stats: Vec<InstitutionalAreaStat>,
    pub top_improvements: Vec<InstitutionalAreaStat>,
    pub areas_needing_attention: Vec<InstitutionalAreaStat>,
    pub generated_at: DateTime<Utc>,
}

/// GET /api/reports/institutional/:project_id
pub async fn handle_institutional_report(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<InstitutionalReport>, AppError> {
    caller.require_any(&[UserRole::SystemAdmin, UserRole::Facilitator, UserRole::ClientAdmin])?;
    let project = project_header(&state.db, &caller, project_id).await?;

    let (enrolled, baseline_completed, post_completed): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM project_participants WHERE project_id = $1),
            (SELECT COUNT(*) FROM assessments
              WHERE project_id = $1 AND status = 'COMPLETED' AND assessment_type = 'BASELINE'),
            (SELECT COUNT(*) FROM assessments
              WHERE project_id = $1 AND status = 'COMPLETED' AND assessment_type = 'POST_TRAINING')
        "#,
    )
    .bind(project_id)
    .fetch_one(&state.db)
    .await?;

    let sql = format!("{GAP_DETAIL_SELECT} WHERE a.project_id = $1 AND a.status = 'COMPLETED'");
    let gaps: Vec<GapDetailRow> = sqlx::query_as(&sql).bind(project_id).fetch_all(&state.db).await?;
    let (baseline, post): (Vec<GapDetailRow>, Vec<GapDetailRow>) = gaps
        .into_iter()
        .partition(|g| g.assessment_type == AssessmentType::Baseline.as_str());

    let areas = domain_areas(&state.db, project.domain_id).await?;
    let area_stats = analytics::institutional_area_stats(&areas, &baseline, &post);
    let overall_scores = analytics::overall_scores(&area_stats);
    let overall_improvement =
        (post_completed > 0).then(|| round_to(overall_scores.post - overall_scores.baseline, 1));

    let enrolled_n = enrolled.max(0) as usize;
    Ok(Json(InstitutionalReport {
        summary: InstitutionalSummary {
            total_participants: enrolled,
            baseline_completed,
            post_completed,
            completion_rate: CompletionRate {
                baseline: analytics::completion_rate(baseline_completed.max(0) as usize, enrolled_n),
                post: analytics::completion_rate(post_completed.max(0) as usize, enrolled_n),
            },
            overall_scores,
            overall_improvement,
        },
        priority_distribution: PriorityCounts::tally(baseline.iter().map(|g| g.priority.as_str())),
        top_improvements: analytics::top_improvements(&area_stats),
        areas_needing_attention: analytics::areas_needing_attention(&area_stats),
        area_stats,
        project,
        generated_at: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
pub struct DomainRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkReport {
    pub domain: DomainRef,
    pub total_assessments: i64,
    pub benchmarks: Vec<AreaBenchmark>,
    pub generated_at: DateTime<Utc>,
}

/// GET /api/reports/benchmarks/:domain_id
pub async fn handle_benchmarks(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(domain_id): Path<Uuid>,
) -> Result<Json<BenchmarkReport>, AppError> {
    let domain: CompetencyDomainRow = sqlx::query_as("SELECT * FROM competency_domains WHERE id = $1")
        .bind(domain_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Domain"))?;

    let total_assessments: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM assessments a
        JOIN projects p ON p.id = a.project_id
        WHERE p.domain_id = $1 AND a.status = 'COMPLETED' AND a.assessment_type = 'BASELINE'
        "#,
    )
    .bind(domain_id)
    .fetch_one(&state.db)
    .await?;

    let sql = format!(
        "{GAP_DETAIL_SELECT} JOIN projects p ON p.id = a.project_id \
         WHERE p.domain_id = $1 AND a.status = 'COMPLETED' AND a.assessment_type = 'BASELINE'"
    );
    let gaps: Vec<GapDetailRow> = sqlx::query_as(&sql).bind(domain_id).fetch_all(&state.db).await?;
    let areas = domain_areas(&state.db, domain_id).await?;

    Ok(Json(BenchmarkReport {
        domain: DomainRef {
            id: domain.id,
            code: domain.code,
            name: domain.name,
        },
        total_assessments,
        benchmarks: analytics::benchmarks(&areas, &gaps),
        generated_at: Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SaveReportRequest {
    pub project_id: Uuid,
    pub participant_id: Option<Uuid>,
    pub report_data: Value,
}

/// Fields lifted out of a report payload into their own columns.
#[derive(Debug, PartialEq)]
struct ReportFields {
    overall_improvement: Option<f64>,
    area_improvements: Value,
    level_changes: Value,
    recommendations: Option<String>,
}

fn extract_fields(data: &Value) -> Result<ReportFields, AppError> {
    if !data.is_object() {
        return Err(AppError::Validation("report_data must be an object".to_string()));
    }
    let empty = || Value::Object(Default::default());
    Ok(ReportFields {
        overall_improvement: data.get("overall_improvement").and_then(Value::as_f64),
        area_improvements: data
            .get("area_improvements")
            .or_else(|| data.get("improvements"))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(empty),
        level_changes: data
            .get("level_changes")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(empty),
        recommendations: data
            .get("recommendations")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

async fn first_completed(
    pool: &PgPool,
    project_id: Uuid,
    participant_id: Option<Uuid>,
    kind: AssessmentType,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT id FROM assessments
        WHERE project_id = $1 AND ($2::uuid IS NULL OR participant_id = $2)
          AND assessment_type = $3 AND status = 'COMPLETED'
        ORDER BY completed_at
        LIMIT 1
        "#,
    )
    .bind(project_id)
    .bind(participant_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await
}

/// POST /api/reports/save
///
/// Persists an impact report and a markdown copy in object storage.
pub async fn handle_save_report(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<SaveReportRequest>,
) -> Result<(StatusCode, Json<ImpactReportRow>), AppError> {
    caller.require_any(STAFF)?;
    let fields = extract_fields(&req.report_data)?;
    let project = project_header(&state.db, &caller, req.project_id).await?;

    let participant_name: Option<String> = match req.participant_id {
        Some(id) => Some(
            sqlx::query_scalar::<_, String>("SELECT first_name || ' ' || last_name FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&state.db)
                .await?
                .ok_or_else(|| AppError::Validation(format!("Participant {id} does not exist")))?,
        ),
        None => None,
    };

    let baseline_id = first_completed(&state.db, project.id, req.participant_id, AssessmentType::Baseline).await?;
    let post_id = first_completed(&state.db, project.id, req.participant_id, AssessmentType::PostTraining).await?;

    let report_id = Uuid::new_v4();
    let created_at = Utc::now();
    let key = snapshot_key(project.id, report_id);
    let markdown = render_report_md(&SnapshotInput {
        report_id,
        project_name: &project.name,
        participant_name: participant_name.as_deref(),
        overall_improvement: fields.overall_improvement,
        recommendations: fields.recommendations.as_deref(),
        report_data: &req.report_data,
        created_at,
    });
    upload_snapshot(&state.s3, &state.config.s3_bucket, &key, markdown).await?;

    let report: ImpactReportRow = sqlx::query_as(
        r#"
        INSERT INTO impact_reports
            (id, project_id, participant_id, baseline_assessment_id, post_assessment_id,
             overall_improvement_percent, area_improvements, level_changes,
             recommendations, report_data, s3_key, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(report_id)
    .bind(project.id)
    .bind(req.participant_id)
    .bind(baseline_id)
    .bind(post_id)
    .bind(fields.overall_improvement)
    .bind(&fields.area_improvements)
    .bind(&fields.level_changes)
    .bind(&fields.recommendations)
    .bind(&req.report_data)
    .bind(&key)
    .bind(created_at)
    .fetch_one(&state.db)
    .await?;

    info!("Saved impact report {} for project {}", report.id, report.project_id);
    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Serialize)]
pub struct ReportDownload {
    #[serde(flatten)]
    pub report: ImpactReportRow,
    pub project: ProjectHeader,
    pub participant: Option<UserRef>,
    pub baseline_assessment: Option<AssessmentStamp>,
    pub post_assessment: Option<AssessmentStamp>,
    /// Markdown copy read back from object storage.
    pub snapshot: Option<String>,
}

async fn stamp(pool: &PgPool, id: Option<Uuid>) -> Result<Option<AssessmentStamp>, sqlx::Error> {
    let Some(id) = id else {
        return Ok(None);
    };
    sqlx::query_as("SELECT id, completed_at, time_taken_minutes FROM assessments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// GET /api/reports/download/:report_id
pub async fn handle_download_report(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportDownload>, AppError> {
    let report: ImpactReportRow = sqlx::query_as("SELECT * FROM impact_reports WHERE id = $1")
        .bind(report_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Report"))?;

    if caller.is_participant() && report.participant_id != Some(caller.id) {
        return Err(AppError::forbidden());
    }
    let project = project_header(&state.db, &caller, report.project_id).await?;

    let participant: Option<UserRef> = match report.participant_id {
        Some(id) => sqlx::query_as("SELECT id, first_name, last_name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?,
        None => None,
    };
    let baseline_assessment = stamp(&state.db, report.baseline_assessment_id).await?;
    let post_assessment = stamp(&state.db, report.post_assessment_id).await?;
    let snapshot = match report.s3_key.as_deref() {
        Some(key) => Some(fetch_snapshot(&state.s3, &state.config.s3_bucket, key).await?),
        None => None,
    };

    Ok(Json(ReportDownload {
        report,
        project,
        participant,
        baseline_assessment,
        post_assessment,
        snapshot,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_fields_from_payload() {
        let data = json!({
            "overall_improvement": 18.0,
            "improvements": [{ "area": "VLR-01", "improvement": 18.0 }],
            "recommendations": "Run the GMP refresher before Q3."
        });
        let fields = extract_fields(&data).unwrap();
        assert_eq!(fields.overall_improvement, Some(18.0));
        assert!(fields.area_improvements.is_array());
        assert_eq!(fields.level_changes, json!({}));
        assert_eq!(fields.recommendations.as_deref(), Some("Run the GMP refresher before Q3."));
    }

    #[test]
    fn test_extract_fields_defaults() {
        let fields = extract_fields(&json!({ "area_improvements": null })).unwrap();
        assert_eq!(
            fields,
            ReportFields {
                overall_improvement: None,
                area_improvements: json!({}),
                level_changes: json!({}),
                recommendations: None,
            }
        );
    }

    fn caller(role: UserRole, organization_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "caller@example.org".to_string(),
            role,
            first_name: "Demo".to_string(),
            last_name: "Caller".to_string(),
            organization_id,
        }
    }

    #[test]
    fn test_report_scope_by_role() {
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(ensure_report_scope(&caller(UserRole::Participant, None), org).is_ok());
        assert!(ensure_report_scope(&caller(UserRole::Participant, Some(other)), org).is_ok());
        assert!(ensure_report_scope(&caller(UserRole::SystemAdmin, None), org).is_ok());
        assert!(ensure_report_scope(&caller(UserRole::Facilitator, Some(other)), org).is_ok());
        assert!(ensure_report_scope(&caller(UserRole::ClientAdmin, Some(org)), org).is_ok());
        assert!(matches!(
            ensure_report_scope(&caller(UserRole::ClientAdmin, Some(other)), org),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_report_scope(&caller(UserRole::ClientAdmin, None), org).is_err());
    }

    #[test]
    fn test_report_data_must_be_object() {
        assert!(extract_fields(&json!([1, 2])).is_err());
        assert!(extract_fields(&Value::Null).is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_individual_report_for_participant_outside_project_org(pool: sqlx::PgPool) {
        use crate::testing::{app, create_user, enroll, seeded_project, send, started_baseline, test_state};
        use axum::http::Method;

        let state = test_state(pool);
        let app = app(&state);
        let fixture = seeded_project(&state).await;
        let freelancer = create_user(&state, UserRole::Participant, None).await;
        enroll(&state, fixture.project_id, freelancer.id).await;
        let assessment_id = started_baseline(&app, &state, fixture.project_id, &freelancer).await;
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/assessments/{assessment_id}/complete"),
            Some(&freelancer.token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let own = format!("/api/reports/individual/{}/{}", freelancer.id, fixture.project_id);
        let (status, body) = send(&app, Method::GET, &own, Some(&freelancer.token), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(
            body["competency_analysis"].as_array().unwrap().len() as i64,
            fixture.area_count
        );

        let peer = create_user(&state, UserRole::Participant, Some(fixture.organization_id)).await;
        let (status, _) = send(&app, Method::GET, &own, Some(&peer.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let home_admin = create_user(&state, UserRole::ClientAdmin, Some(fixture.organization_id)).await;
        let (status, _) = send(&app, Method::GET, &own, Some(&home_admin.token), None).await;
        assert_eq!(status, StatusCode::OK);

        let other_org: Uuid = sqlx::query_scalar("SELECT id FROM organizations WHERE name = 'EMKEI Innovations'")
            .fetch_one(&state.db)
            .await
            .unwrap();
        let foreign_admin = create_user(&state, UserRole::ClientAdmin, Some(other_org)).await;
        let (status, _) = send(&app, Method::GET, &own, Some(&foreign_admin.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
