use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::assessments::store::GAP_DETAIL_SELECT;
use crate::auth::{AuthUser, STAFF};
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::assessment::GapDetailRow;
use crate::models::competency::{CompetencyAreaRow, CompetencyDomainRow};
use crate::models::organization::OrganizationRow;
use crate::models::project::{ProjectListRow, ProjectRef, ProjectRow, ProjectStatus};
use crate::models::user::UserRef;
use crate::pagination::{PageParams, Pagination};
use crate::projects::cohort::{self, AreaCohortStat, HeatmapParticipant, HeatmapRow};
use crate::projects::{fetch_project, visible_project};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    pub organization_id: Option<Uuid>,
    pub status: Option<ProjectStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectListRow>,
    pub pagination: Pagination,
}

/// GET /api/projects
pub async fn handle_list_projects(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    // Non-staff only ever see their own organization; no organization means nothing.
    let organization_filter = if caller.is_staff() {
        query.organization_id
    } else {
        Some(caller.organization_id.unwrap_or_else(Uuid::nil))
    };
    let status = query.status.map(|s| s.as_str());

    let projects: Vec<ProjectListRow> = sqlx::query_as(
        r#"
        SELECT p.*,
               o.name AS organization_name,
               d.code AS domain_code, d.name AS domain_name,
               u.first_name AS creator_first_name, u.last_name AS creator_last_name,
               (SELECT COUNT(*) FROM project_participants pp WHERE pp.project_id = p.id) AS participant_count,
               (SELECT COUNT(*) FROM assessments a WHERE a.project_id = p.id) AS assessment_count
        FROM projects p
        JOIN organizations o ON o.id = p.organization_id
        JOIN competency_domains d ON d.id = p.domain_id
        JOIN users u ON u.id = p.created_by
        WHERE ($1::uuid IS NULL OR p.organization_id = $1)
          AND ($2::text IS NULL OR p.status = $2)
        ORDER BY p.created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(organization_filter)
    .bind(status)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM projects
        WHERE ($1::uuid IS NULL OR organization_id = $1)
          AND ($2::text IS NULL OR status = $2)
        "#,
    )
    .bind(organization_filter)
    .bind(status)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ProjectListResponse {
        projects,
        pagination: page.describe(total),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub organization_id: Uuid,
    pub domain_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub settings: Option<Value>,
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(AppError::Validation(
            "end_date cannot be before start_date".to_string(),
        )),
        _ => Ok(()),
    }
}

/// POST /api/projects
pub async fn handle_create_project(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectRow>), AppError> {
    caller.require_any(STAFF)?;
    let name = validation::non_empty("name", &req.name)?;
    validation::json_object("settings", req.settings.as_ref())?;
    check_dates(req.start_date, req.end_date)?;

    let refs_ok: (bool, bool) = sqlx::query_as(
        r#"
        SELECT EXISTS(SELECT 1 FROM organizations WHERE id = $1),
               EXISTS(SELECT 1 FROM competency_domains WHERE id = $2)
        "#,
    )
    .bind(req.organization_id)
    .bind(req.domain_id)
    .fetch_one(&state.db)
    .await?;
    if !refs_ok.0 {
        return Err(AppError::Validation(format!("Organization {} does not exist", req.organization_id)));
    }
    if !refs_ok.1 {
        return Err(AppError::Validation(format!("Domain {} does not exist", req.domain_id)));
    }

    let project: ProjectRow = sqlx::query_as(
        r#"
        INSERT INTO projects
            (name, description, organization_id, domain_id, start_date, end_date, settings, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(req.description.map(|d| d.trim().to_string()))
    .bind(req.organization_id)
    .bind(req.domain_id)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.settings.unwrap_or_else(|| Value::Object(Default::default())))
    .bind(caller.id)
    .fetch_one(&state.db)
    .await?;

    info!("Created project {} '{}' by {}", project.id, project.name, caller.id);
    Ok((StatusCode::CREATED, Json(project)))
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: ProjectRow,
    pub organization: OrganizationRow,
    pub domain: CompetencyDomainRow,
    pub areas: Vec<CompetencyAreaRow>,
    pub created_by_user: Option<UserRef>,
    pub participant_count: i64,
    pub assessment_count: i64,
    pub curriculum_count: i64,
}

/// GET /api/projects/:id
pub async fn handle_get_project(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectDetail>, AppError> {
    let project = visible_project(&state.db, &caller, id).await?;

    let organization: OrganizationRow = sqlx::query_as("SELECT * FROM organizations WHERE id = $1")
        .bind(project.organization_id)
        .fetch_one(&state.db)
        .await?;
    let domain: CompetencyDomainRow = sqlx::query_as("SELECT * FROM competency_domains WHERE id = $1")
        .bind(project.domain_id)
        .fetch_one(&state.db)
        .await?;
    let areas: Vec<CompetencyAreaRow> = sqlx::query_as(
        "SELECT * FROM competency_areas WHERE domain_id = $1 ORDER BY sort_order, code",
    )
    .bind(project.domain_id)
    .fetch_all(&state.db)
    .await?;
    let created_by_user: Option<UserRef> =
        sqlx::query_as("SELECT id, first_name, last_name, email FROM users WHERE id = $1")
            .bind(project.created_by)
            .fetch_optional(&state.db)
            .await?;
    let (participant_count, assessment_count, curriculum_count): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM project_participants WHERE project_id = $1),
               (SELECT COUNT(*) FROM assessments WHERE project_id = $1),
               (SELECT COUNT(*) FROM curricula WHERE project_id = $1)
        "#,
    )
    .bind(project.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ProjectDetail {
        project,
        organization,
        domain,
        areas,
        created_by_user,
        participant_count,
        assessment_count,
        curriculum_count,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub settings: Option<Value>,
}

/// PUT /api/projects/:id
pub async fn handle_update_project(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> Result<Json<ProjectRow>, AppError> {
    caller.require_any(STAFF)?;
    let name = validation::optional_non_empty("name", req.name.as_deref())?;
    validation::json_object("settings", req.settings.as_ref())?;

    let current = fetch_project(&state.db, id).await?;
    check_dates(
        req.start_date.or(current.start_date),
        req.end_date.or(current.end_date),
    )?;

    let project: ProjectRow = sqlx::query_as(
        r#"
        UPDATE projects
        SET name        = COALESCE($2, name),
            description = COALESCE($3, description),
            status      = COALESCE($4, status),
            start_date  = COALESCE($5, start_date),
            end_date    = COALESCE($6, end_date),
            settings    = COALESCE($7, settings),
            updated_at  = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(req.description.map(|d| d.trim().to_string()))
    .bind(req.status.map(|s| s.as_str()))
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.settings)
    .fetch_one(&state.db)
    .await?;

    info!("Updated project {} (status {})", project.id, project.status);
    Ok(Json(project))
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub message: String,
    pub count: u64,
}

/// POST /api/projects/:id/invite
pub async fn handle_invite_participants(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<InviteRequest>,
) -> Result<Json<InviteResponse>, AppError> {
    caller.require_any(STAFF)?;
    if req.user_ids.is_empty() {
        return Err(AppError::Validation("user_ids cannot be empty".to_string()));
    }
    let project = fetch_project(&state.db, id).await?;

    let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ANY($1)")
        .bind(&req.user_ids)
        .fetch_one(&state.db)
        .await?;
    let mut distinct = req.user_ids.clone();
    distinct.sort();
    distinct.dedup();
    if known != distinct.len() as i64 {
        return Err(AppError::Validation("One or more users do not exist".to_string()));
    }

    // Already-enrolled users are skipped.
    let inserted = sqlx::query(
        r#"
        INSERT INTO project_participants (project_id, user_id)
        SELECT $1, unnest($2::uuid[])
        ON CONFLICT (project_id, user_id) DO NOTHING
        "#,
    )
    .bind(project.id)
    .bind(&distinct)
    .execute(&state.db)
    .await?
    .rows_affected();

    info!("Invited {inserted} participant(s) to project {}", project.id);
    Ok(Json(InviteResponse {
        message: format!("{inserted} participant(s) invited"),
        count: inserted,
    }))
}

#[derive(Debug, sqlx::FromRow)]
struct ParticipantStatusRow {
    user_id: Uuid,
    enrolled_at: DateTime<Utc>,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    job_title: Option<String>,
    current_role_type: Option<String>,
    baseline_status: Option<String>,
    baseline_completed_at: Option<DateTime<Utc>>,
    post_status: Option<String>,
    post_completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentProgress {
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantAssessments {
    pub baseline: Option<AssessmentProgress>,
    pub post_training: Option<AssessmentProgress>,
}

#[derive(Debug, Serialize)]
pub struct ProjectParticipantView {
    pub user_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub job_title: Option<String>,
    pub current_role_type: Option<String>,
    pub assessments: ParticipantAssessments,
}

impl From<ParticipantStatusRow> for ProjectParticipantView {
    fn from(row: ParticipantStatusRow) -> Self {
        let progress = |status: Option<String>, completed_at| {
            status.map(|status| AssessmentProgress { status, completed_at })
        };
        Self {
            user_id: row.user_id,
            enrolled_at: row.enrolled_at,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            job_title: row.job_title,
            current_role_type: row.current_role_type,
            assessments: ParticipantAssessments {
                baseline: progress(row.baseline_status, row.baseline_completed_at),
                post_training: progress(row.post_status, row.post_completed_at),
            },
        }
    }
}

/// GET /api/projects/:id/participants
pub async fn handle_list_participants(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProjectParticipantView>>, AppError> {
    let project = visible_project(&state.db, &caller, id).await?;

    let rows: Vec<ParticipantStatusRow> = sqlx::query_as(
        r#"
        SELECT pp.user_id, pp.enrolled_at,
               u.email, u.first_name, u.last_name, u.role,
               prof.job_title, prof.current_role_type,
               b.status AS baseline_status, b.completed_at AS baseline_completed_at,
               pt.status AS post_status, pt.completed_at AS post_completed_at
        FROM project_participants pp
        JOIN users u ON u.id = pp.user_id
        LEFT JOIN participant_profiles prof ON prof.user_id = pp.user_id
        LEFT JOIN assessments b
               ON b.project_id = pp.project_id AND b.participant_id = pp.user_id
              AND b.assessment_type = 'BASELINE'
        LEFT JOIN assessments pt
               ON pt.project_id = pp.project_id AND pt.participant_id = pp.user_id
              AND pt.assessment_type = 'POST_TRAINING'
        WHERE pp.project_id = $1
        ORDER BY u.last_name, u.first_name
        "#,
    )
    .bind(project.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Serialize)]
pub struct CohortSummary {
    pub total_participants: usize,
    pub completed_assessments: usize,
    pub area_stats: Vec<AreaCohortStat>,
}

#[derive(Debug, Serialize)]
pub struct ProjectGapAnalysis {
    pub project: ProjectRef,
    pub summary: CohortSummary,
    pub heatmap: Vec<HeatmapRow>,
}

#[derive(Debug, sqlx::FromRow)]
struct AssessedParticipant {
    assessment_id: Uuid,
    participant_id: Uuid,
    first_name: String,
    last_name: String,
}

/// GET /api/projects/:id/gap-analysis
pub async fn handle_project_gap_analysis(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectGapAnalysis>, AppError> {
    let project = visible_project(&state.db, &caller, id).await?;

    let areas: Vec<CompetencyAreaRow> = sqlx::query_as(
        "SELECT * FROM competency_areas WHERE domain_id = $1 ORDER BY sort_order, code",
    )
    .bind(project.domain_id)
    .fetch_all(&state.db)
    .await?;

    let assessed: Vec<AssessedParticipant> = sqlx::query_as(
        r#"
        SELECT a.id AS assessment_id, a.participant_id, u.first_name, u.last_name
        FROM assessments a
        JOIN users u ON u.id = a.participant_id
        WHERE a.project_id = $1 AND a.assessment_type = 'BASELINE' AND a.status = 'COMPLETED'
        ORDER BY u.last_name, u.first_name
        "#,
    )
    .bind(project.id)
    .fetch_all(&state.db)
    .await?;

    let sql = format!(
        "{GAP_DETAIL_SELECT} WHERE a.project_id = $1 AND a.assessment_type = 'BASELINE' \
         AND a.status = 'COMPLETED' ORDER BY ca.sort_order"
    );
    let gaps: Vec<GapDetailRow> = sqlx::query_as(&sql).bind(project.id).fetch_all(&state.db).await?;

    let participants: Vec<(Uuid, HeatmapParticipant)> = assessed
        .into_iter()
        .map(|a| {
            (
                a.assessment_id,
                HeatmapParticipant {
                    id: a.participant_id,
                    first_name: a.first_name,
                    last_name: a.last_name,
                },
            )
        })
        .collect();
    let completed = participants.len();

    Ok(Json(ProjectGapAnalysis {
        project: ProjectRef {
            id: project.id,
            name: project.name,
        },
        summary: CohortSummary {
            total_participants: completed,
            completed_assessments: completed,
            area_stats: cohort::area_stats(&areas, &gaps),
        },
        heatmap: cohort::heatmap(&areas, participants, &gaps),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_before_start_rejected() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1);
        let end = NaiveDate::from_ymd_opt(2025, 2, 1);
        assert!(matches!(check_dates(start, end), Err(AppError::Validation(_))));
        assert!(check_dates(end, start).is_ok());
        assert!(check_dates(start, None).is_ok());
    }
}
