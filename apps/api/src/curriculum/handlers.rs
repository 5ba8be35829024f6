use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::assessments::store::GAP_DETAIL_SELECT;
use crate::auth::{AuthUser, STAFF};
use crate::curriculum::recommend::{plan, UnitCandidate};
use crate::curriculum::{
    area_links, fetch_curriculum, links_for, load_curriculum_detail, prerequisite_links, CurriculumDetail,
    Link,
};
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::assessment::GapDetailRow;
use crate::models::competency::CompetencyLevelRow;
use crate::models::curriculum::{
    CurriculumRecommendationRow, CurriculumRow, CurriculumStatus, LearningUnitRow, RecommendationStatus,
};
use crate::projects::{fetch_project, visible_project};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct LearningUnitFilter {
    pub domain_id: Option<Uuid>,
    pub level_id: Option<Uuid>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LearningUnitListRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub unit: LearningUnitRow,
    pub domain_code: String,
    pub domain_name: String,
    pub level_number: Option<i32>,
    pub level_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LearningUnitView {
    #[serde(flatten)]
    pub unit: LearningUnitListRow,
    pub competency_areas: Vec<Link>,
    pub prerequisites: Vec<Link>,
}

const UNIT_LIST_SELECT: &str = r#"
    SELECT lu.*, d.code AS domain_code, d.name AS domain_name,
           l.level_number, l.name AS level_name
    FROM learning_units lu
    JOIN competency_domains d ON d.id = lu.domain_id
    LEFT JOIN competency_levels l ON l.id = lu.level_appropriate_id
"#;

/// GET /api/curriculum/learning-units
pub async fn handle_list_learning_units(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(filter): Query<LearningUnitFilter>,
) -> Result<Json<Vec<LearningUnitView>>, AppError> {
    let sql = format!(
        "{UNIT_LIST_SELECT} WHERE ($1::uuid IS NULL OR lu.domain_id = $1) \
         AND ($2::uuid IS NULL OR lu.level_appropriate_id = $2) ORDER BY lu.code"
    );
    let units: Vec<LearningUnitListRow> = sqlx::query_as(&sql)
        .bind(filter.domain_id)
        .bind(filter.level_id)
        .fetch_all(&state.db)
        .await?;

    let ids: Vec<Uuid> = units.iter().map(|u| u.unit.id).collect();
    let areas = area_links(&state.db, &ids).await?;
    let prerequisites = prerequisite_links(&state.db, &ids).await?;

    let views = units
        .into_iter()
        .map(|unit| {
            let id = unit.unit.id;
            LearningUnitView {
                unit,
                competency_areas: links_for(&areas, id),
                prerequisites: links_for(&prerequisites, id),
            }
        })
        .collect();
    Ok(Json(views))
}

#[derive(Debug, Serialize)]
pub struct LearningUnitDetail {
    #[serde(flatten)]
    pub unit: LearningUnitView,
    pub level: Option<CompetencyLevelRow>,
    /// Units that list this one as a prerequisite.
    pub required_by: Vec<Link>,
}

/// GET /api/curriculum/learning-units/:id
pub async fn handle_get_learning_unit(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LearningUnitDetail>, AppError> {
    let sql = format!("{UNIT_LIST_SELECT} WHERE lu.id = $1");
    let unit: LearningUnitListRow = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Learning unit"))?;

    let level: Option<CompetencyLevelRow> = match unit.unit.level_appropriate_id {
        Some(level_id) => sqlx::query_as("SELECT * FROM competency_levels WHERE id = $1")
            .bind(level_id)
            .fetch_optional(&state.db)
            .await?,
        None => None,
    };
    let areas = area_links(&state.db, &[id]).await?;
    let prerequisites = prerequisite_links(&state.db, &[id]).await?;
    let required_by: Vec<Link> = sqlx::query_as(
        r#"
        SELECT lu.id, lu.code, lu.name
        FROM learning_unit_prerequisites p
        JOIN learning_units lu ON lu.id = p.learning_unit_id
        WHERE p.prerequisite_id = $1
        ORDER BY lu.code
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(LearningUnitDetail {
        unit: LearningUnitView {
            unit,
            competency_areas: links_for(&areas, id),
            prerequisites: links_for(&prerequisites, id),
        },
        level,
        required_by,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationFilter {
    pub participant_id: Option<Uuid>,
    pub status: Option<RecommendationStatus>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecommendationView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub recommendation: CurriculumRecommendationRow,
    pub unit_code: String,
    pub unit_name: String,
    pub duration_hours: i32,
    pub level_number: Option<i32>,
    pub participant_first_name: Option<String>,
    pub participant_last_name: Option<String>,
    pub gap_count: i64,
}

#[derive(Debug, Serialize)]
pub struct RecommendationEntry {
    #[serde(flatten)]
    pub recommendation: RecommendationView,
    pub competency_areas: Vec<Link>,
}

/// GET /api/curriculum/recommendations/:project_id
pub async fn handle_list_recommendations(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
    Query(filter): Query<RecommendationFilter>,
) -> Result<Json<Vec<RecommendationEntry>>, AppError> {
    visible_project(&state.db, &caller, project_id).await?;

    let rows: Vec<RecommendationView> = sqlx::query_as(
        r#"
        SELECT r.*, lu.code AS unit_code, lu.name AS unit_name, lu.duration_hours,
               l.level_number,
               u.first_name AS participant_first_name, u.last_name AS participant_last_name,
               (SELECT COUNT(*) FROM curriculum_recommendation_gaps rg
                 WHERE rg.recommendation_id = r.id) AS gap_count
        FROM curriculum_recommendations r
        JOIN learning_units lu ON lu.id = r.learning_unit_id
        LEFT JOIN competency_levels l ON l.id = lu.level_appropriate_id
        LEFT JOIN users u ON u.id = r.participant_id
        WHERE r.project_id = $1
          AND ($2::uuid IS NULL OR r.participant_id = $2)
          AND ($3::text IS NULL OR r.status = $3)
        ORDER BY r.priority_rank
        "#,
    )
    .bind(project_id)
    .bind(filter.participant_id)
    .bind(filter.status.map(|s| s.as_str()))
    .fetch_all(&state.db)
    .await?;

    let unit_ids: Vec<Uuid> = rows.iter().map(|r| r.recommendation.learning_unit_id).collect();
    let areas = area_links(&state.db, &unit_ids).await?;

    let entries = rows
        .into_iter()
        .map(|recommendation| {
            let unit_id = recommendation.recommendation.learning_unit_id;
            RecommendationEntry {
                recommendation,
                competency_areas: links_for(&areas, unit_id),
            }
        })
        .collect();
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecommendationRequest {
    pub status: RecommendationStatus,
}

/// PUT /api/curriculum/recommendations/:id
pub async fn handle_update_recommendation(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateRecommendationRequest>,
) -> Result<Json<CurriculumRecommendationRow>, AppError> {
    caller.require_any(STAFF)?;

    let row: CurriculumRecommendationRow = sqlx::query_as(
        "UPDATE curriculum_recommendations SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Recommendation"))?;

    info!("Recommendation {} marked {}", row.id, row.status);
    Ok(Json(row))
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub for_participant_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub count: usize,
}

/// POST /api/curriculum/generate-recommendations/:project_id
///
/// Replaces the recommendations of the chosen scope (one participant, or
/// project-wide) with a fresh ranking built from completed baseline gaps.
pub async fn handle_generate_recommendations(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
    body: Option<AppJson<GenerateRequest>>,
) -> Result<Json<GenerateResponse>, AppError> {
    caller.require_any(STAFF)?;
    let participant_id = body.map(|AppJson(b)| b).unwrap_or_default().for_participant_id;
    let project = fetch_project(&state.db, project_id).await?;

    let sql = format!(
        "{GAP_DETAIL_SELECT} WHERE a.project_id = $1 AND a.assessment_type = 'BASELINE' \
         AND a.status = 'COMPLETED' AND ($2::uuid IS NULL OR a.participant_id = $2) \
         ORDER BY a.completed_at, ca.sort_order, ca.code"
    );
    let gaps: Vec<GapDetailRow> = sqlx::query_as(&sql)
        .bind(project_id)
        .bind(participant_id)
        .fetch_all(&state.db)
        .await?;
    if gaps.is_empty() {
        return Err(AppError::Validation(
            "No gap analyses found. Complete baseline assessments first.".to_string(),
        ));
    }

    let units: Vec<UnitCandidate> = sqlx::query_as(
        r#"
        SELECT lu.id, l.level_number,
               COALESCE(array_agg(luc.competency_area_id)
                        FILTER (WHERE luc.competency_area_id IS NOT NULL), '{}') AS area_ids
        FROM learning_units lu
        LEFT JOIN competency_levels l ON l.id = lu.level_appropriate_id
        LEFT JOIN learning_unit_competencies luc ON luc.learning_unit_id = lu.id
        WHERE lu.domain_id = $1
        GROUP BY lu.id, lu.code, l.level_number
        ORDER BY lu.code
        "#,
    )
    .bind(project.domain_id)
    .fetch_all(&state.db)
    .await?;

    let planned = plan(&gaps, &units)?;

    let mut tx = state.db.begin().await?;
    sqlx::query(
        "DELETE FROM curriculum_recommendations WHERE project_id = $1 AND participant_id IS NOT DISTINCT FROM $2",
    )
    .bind(project_id)
    .bind(participant_id)
    .execute(&mut *tx)
    .await?;

    for rec in &planned {
        let rec_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO curriculum_recommendations
                (project_id, participant_id, learning_unit_id, priority_rank, rationale, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(project_id)
        .bind(participant_id)
        .bind(rec.learning_unit_id)
        .bind(rec.priority_rank)
        .bind(&rec.rationale)
        .bind(RecommendationStatus::Recommended.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO curriculum_recommendation_gaps (recommendation_id, gap_analysis_id)
            SELECT $1, unnest($2::uuid[])
            "#,
        )
        .bind(rec_id)
        .bind(&rec.gap_ids)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(
        "Generated {} recommendations for project {} (participant: {:?})",
        planned.len(),
        project_id,
        participant_id
    );
    Ok(Json(GenerateResponse {
        message: format!("Generated {} recommendations", planned.len()),
        count: planned.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateCurriculumRequest {
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub learning_unit_ids: Vec<Uuid>,
    pub delivery_schedule: Option<Value>,
}

fn check_unit_list(ids: &[Uuid]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::Validation("learning_unit_ids cannot be empty".to_string()));
    }
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return Err(AppError::Validation(format!("Learning unit {id} is listed twice")));
        }
    }
    Ok(())
}

/// POST /api/curriculum
pub async fn handle_create_curriculum(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateCurriculumRequest>,
) -> Result<(StatusCode, Json<CurriculumDetail>), AppError> {
    caller.require_any(STAFF)?;
    let name = validation::non_empty("name", &req.name)?;
    check_unit_list(&req.learning_unit_ids)?;
    validation::json_object("delivery_schedule", req.delivery_schedule.as_ref())?;
    fetch_project(&state.db, req.project_id).await?;

    let (found, total_hours): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(duration_hours), 0) FROM learning_units WHERE id = ANY($1)",
    )
    .bind(&req.learning_unit_ids)
    .fetch_one(&state.db)
    .await?;
    if found as usize != req.learning_unit_ids.len() {
        return Err(AppError::Validation("One or more learning units do not exist".to_string()));
    }

    let mut tx = state.db.begin().await?;
    let curriculum: CurriculumRow = sqlx::query_as(
        r#"
        INSERT INTO curricula (project_id, name, description, total_hours, delivery_schedule, status, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(req.project_id)
    .bind(&name)
    .bind(req.description.map(|d| d.trim().to_string()))
    .bind(total_hours as i32)
    .bind(req.delivery_schedule.unwrap_or_else(|| Value::Object(Default::default())))
    .bind(CurriculumStatus::Draft.as_str())
    .bind(caller.id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO curriculum_learning_units (curriculum_id, learning_unit_id, sort_order)
        SELECT $1, u.id, (u.ord - 1)::int
        FROM unnest($2::uuid[]) WITH ORDINALITY AS u(id, ord)
        "#,
    )
    .bind(curriculum.id)
    .bind(&req.learning_unit_ids)
    .execute(&mut *tx)
    .await?;

    let accepted = sqlx::query(
        r#"
        UPDATE curriculum_recommendations SET status = $3
        WHERE project_id = $1 AND learning_unit_id = ANY($2)
        "#,
    )
    .bind(req.project_id)
    .bind(&req.learning_unit_ids)
    .bind(RecommendationStatus::Accepted.as_str())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        "Created curriculum {} for project {} ({} units, {}h, {} recommendations accepted)",
        curriculum.id,
        curriculum.project_id,
        req.learning_unit_ids.len(),
        curriculum.total_hours,
        accepted.rows_affected()
    );
    let detail = load_curriculum_detail(&state.db, curriculum).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/curriculum/:id
pub async fn handle_get_curriculum(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CurriculumDetail>, AppError> {
    let curriculum = fetch_curriculum(&state.db, id).await?;
    visible_project(&state.db, &caller, curriculum.project_id).await?;
    Ok(Json(load_curriculum_detail(&state.db, curriculum).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCurriculumRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<CurriculumStatus>,
    pub delivery_schedule: Option<Value>,
}

/// PUT /api/curriculum/:id
///
/// Moving to APPROVED records the caller as approver.
pub async fn handle_update_curriculum(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateCurriculumRequest>,
) -> Result<Json<CurriculumDetail>, AppError> {
    caller.require_any(STAFF)?;
    let name = validation::optional_non_empty("name", req.name.as_deref())?;
    validation::json_object("delivery_schedule", req.delivery_schedule.as_ref())?;
    let approver = (req.status == Some(CurriculumStatus::Approved)).then_some(caller.id);

    let curriculum: CurriculumRow = sqlx::query_as(
        r#"
        UPDATE curricula
        SET name              = COALESCE($2, name),
            description       = COALESCE($3, description),
            status            = COALESCE($4, status),
            delivery_schedule = COALESCE($5, delivery_schedule),
            approved_by       = COALESCE($6, approved_by),
            updated_at        = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(req.description.map(|d| d.trim().to_string()))
    .bind(req.status.map(|s| s.as_str()))
    .bind(req.delivery_schedule)
    .bind(approver)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Curriculum"))?;

    info!("Updated curriculum {} (status {})", curriculum.id, curriculum.status);
    Ok(Json(load_curriculum_detail(&state.db, curriculum).await?))
}

/// GET /api/curriculum/project/:project_id
pub async fn handle_list_project_curricula(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<CurriculumDetail>>, AppError> {
    visible_project(&state.db, &caller, project_id).await?;

    let curricula: Vec<CurriculumRow> =
        sqlx::query_as("SELECT * FROM curricula WHERE project_id = $1 ORDER BY created_at DESC")
            .bind(project_id)
            .fetch_all(&state.db)
            .await?;

    let mut details = Vec::with_capacity(curricula.len());
    for curriculum in curricula {
        details.push(load_curriculum_detail(&state.db, curriculum).await?);
    }
    Ok(Json(details))
}
