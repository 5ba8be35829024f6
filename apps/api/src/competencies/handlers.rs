use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::assessments::store::instrument_questions;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::competency::{
    AssessmentInstrumentRow, CompetencyAreaRow, CompetencyDomainRow, CompetencyItemRow,
    CompetencyLevelRow, QuestionDetailRow,
};
use crate::models::curriculum::LearningUnitRow;
use crate::models::user::{RoleType, UserRole};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DomainListRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub domain: CompetencyDomainRow,
    pub area_count: i64,
    pub learning_unit_count: i64,
    pub project_count: i64,
}

/// GET /api/competencies/domains
pub async fn handle_list_domains(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<DomainListRow>>, AppError> {
    let rows: Vec<DomainListRow> = sqlx::query_as(
        r#"
        SELECT d.*,
               (SELECT COUNT(*) FROM competency_areas a WHERE a.domain_id = d.id) AS area_count,
               (SELECT COUNT(*) FROM learning_units lu WHERE lu.domain_id = d.id) AS learning_unit_count,
               (SELECT COUNT(*) FROM projects p WHERE p.domain_id = d.id) AS project_count
        FROM competency_domains d
        WHERE d.is_active
        ORDER BY d.name
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// An item with the level it is tagged to.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ItemWithLevel {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub item: CompetencyItemRow,
    pub level_number: i32,
    pub level_name: String,
    pub benchmark_score: f64,
}

#[derive(Debug, Serialize)]
pub struct AreaWithItems {
    #[serde(flatten)]
    pub area: CompetencyAreaRow,
    pub items: Vec<ItemWithLevel>,
}

#[derive(Debug, Serialize)]
pub struct DomainTree {
    #[serde(flatten)]
    pub domain: CompetencyDomainRow,
    pub areas: Vec<AreaWithItems>,
    pub instruments: Vec<AssessmentInstrumentRow>,
    pub learning_units: Vec<LearningUnitRow>,
}

async fn items_with_levels(state: &AppState, area_ids: &[Uuid]) -> Result<Vec<ItemWithLevel>, AppError> {
    Ok(sqlx::query_as(
        r#"
        SELECT i.*, l.level_number, l.name AS level_name, l.benchmark_score
        FROM competency_items i
        JOIN competency_levels l ON l.id = i.level_id
        WHERE i.area_id = ANY($1)
        ORDER BY i.sort_order, i.code
        "#,
    )
    .bind(area_ids)
    .fetch_all(&state.db)
    .await?)
}

fn group_items(areas: Vec<CompetencyAreaRow>, mut items: Vec<ItemWithLevel>) -> Vec<AreaWithItems> {
    areas
        .into_iter()
        .map(|area| {
            let (mine, rest): (Vec<_>, Vec<_>) = items.drain(..).partition(|i| i.item.area_id == area.id);
            items = rest;
            AreaWithItems { area, items: mine }
        })
        .collect()
}

/// GET /api/competencies/domains/:id
pub async fn handle_get_domain(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DomainTree>, AppError> {
    let domain: CompetencyDomainRow = sqlx::query_as("SELECT * FROM competency_domains WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Domain"))?;

    let areas: Vec<CompetencyAreaRow> = sqlx::query_as(
        "SELECT * FROM competency_areas WHERE domain_id = $1 ORDER BY sort_order, code",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    let area_ids: Vec<Uuid> = areas.iter().map(|a| a.id).collect();
    let items = items_with_levels(&state, &area_ids).await?;

    let instruments: Vec<AssessmentInstrumentRow> = sqlx::query_as(
        "SELECT * FROM assessment_instruments WHERE domain_id = $1 AND is_active ORDER BY name",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    let learning_units: Vec<LearningUnitRow> =
        sqlx::query_as("SELECT * FROM learning_units WHERE domain_id = $1 ORDER BY code")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(DomainTree {
        domain,
        areas: group_items(areas, items),
        instruments,
        learning_units,
    }))
}

/// GET /api/competencies/levels
pub async fn handle_list_levels(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<CompetencyLevelRow>>, AppError> {
    let levels = sqlx::query_as("SELECT * FROM competency_levels ORDER BY level_number")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(levels))
}

#[derive(Debug, Deserialize)]
pub struct DomainFilter {
    pub domain_id: Option<Uuid>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AreaListRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub area: CompetencyAreaRow,
    pub domain_code: String,
    pub domain_name: String,
    pub item_count: i64,
}

/// GET /api/competencies/areas
pub async fn handle_list_areas(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(filter): Query<DomainFilter>,
) -> Result<Json<Vec<AreaListRow>>, AppError> {
    let rows: Vec<AreaListRow> = sqlx::query_as(
        r#"
        SELECT a.*, d.code AS domain_code, d.name AS domain_name,
               (SELECT COUNT(*) FROM competency_items i WHERE i.area_id = a.id) AS item_count
        FROM competency_areas a
        JOIN competency_domains d ON d.id = a.domain_id
        WHERE ($1::uuid IS NULL OR a.domain_id = $1)
        ORDER BY a.sort_order, a.code
        "#,
    )
    .bind(filter.domain_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
pub struct AreaDetail {
    #[serde(flatten)]
    pub area: CompetencyAreaRow,
    pub domain: CompetencyDomainRow,
    pub items: Vec<ItemWithLevel>,
}

/// GET /api/competencies/areas/:id
pub async fn handle_get_area(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AreaDetail>, AppError> {
    let area: CompetencyAreaRow = sqlx::query_as("SELECT * FROM competency_areas WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Competency area"))?;
    let domain: CompetencyDomainRow = sqlx::query_as("SELECT * FROM competency_domains WHERE id = $1")
        .bind(area.domain_id)
        .fetch_one(&state.db)
        .await?;
    let items = items_with_levels(&state, &[area.id]).await?;
    Ok(Json(AreaDetail { area, domain, items }))
}

#[derive(Debug, Deserialize)]
pub struct InstrumentFilter {
    pub domain_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InstrumentListRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub instrument: AssessmentInstrumentRow,
    pub domain_code: String,
    pub domain_name: String,
    pub question_count: i64,
}

/// GET /api/competencies/instruments
pub async fn handle_list_instruments(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(filter): Query<InstrumentFilter>,
) -> Result<Json<Vec<InstrumentListRow>>, AppError> {
    let rows: Vec<InstrumentListRow> = sqlx::query_as(
        r#"
        SELECT ins.*, d.code AS domain_code, d.name AS domain_name,
               (SELECT COUNT(*) FROM assessment_questions q WHERE q.instrument_id = ins.id) AS question_count
        FROM assessment_instruments ins
        JOIN competency_domains d ON d.id = ins.domain_id
        WHERE ($1::uuid IS NULL OR ins.domain_id = $1)
          AND (NOT $2 OR ins.is_active)
        ORDER BY ins.name
        "#,
    )
    .bind(filter.domain_id)
    .bind(filter.active.unwrap_or(false))
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
pub struct InstrumentDetail {
    #[serde(flatten)]
    pub instrument: AssessmentInstrumentRow,
    pub domain: CompetencyDomainRow,
    pub questions: Vec<QuestionDetailRow>,
}

/// GET /api/competencies/instruments/:id
///
/// Participants get the questions without the answer key.
pub async fn handle_get_instrument(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InstrumentDetail>, AppError> {
    let instrument: AssessmentInstrumentRow =
        sqlx::query_as("SELECT * FROM assessment_instruments WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::not_found("Assessment instrument"))?;
    let domain: CompetencyDomainRow = sqlx::query_as("SELECT * FROM competency_domains WHERE id = $1")
        .bind(instrument.domain_id)
        .fetch_one(&state.db)
        .await?;

    let mut questions = instrument_questions(&state.db, instrument.id).await?;
    if caller.is_participant() {
        questions = questions.into_iter().map(QuestionDetailRow::without_answer_key).collect();
    }

    Ok(Json(InstrumentDetail {
        instrument,
        domain,
        questions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RoleTargetFilter {
    pub role_type: Option<RoleType>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RoleTargetView {
    pub id: Uuid,
    pub role_type: String,
    pub area_code: String,
    pub level_id: Uuid,
    pub level_number: i32,
    pub level_name: String,
    pub benchmark_score: f64,
}

/// GET /api/competencies/role-targets
pub async fn handle_list_role_targets(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(filter): Query<RoleTargetFilter>,
) -> Result<Json<Vec<RoleTargetView>>, AppError> {
    let rows: Vec<RoleTargetView> = sqlx::query_as(
        r#"
        SELECT rt.id, rt.role_type, rt.area_code, rt.level_id,
               l.level_number, l.name AS level_name, l.benchmark_score
        FROM role_target_levels rt
        JOIN competency_levels l ON l.id = rt.level_id
        WHERE ($1::text IS NULL OR rt.role_type = $1)
        ORDER BY rt.area_code, rt.role_type
        "#,
    )
    .bind(filter.role_type.map(|r| r.as_str()))
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub framework_alignment: Vec<String>,
}

/// POST /api/competencies/domains
pub async fn handle_create_domain(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateDomainRequest>,
) -> Result<(StatusCode, Json<CompetencyDomainRow>), AppError> {
    caller.require_any(&[UserRole::SystemAdmin])?;
    let code = validation::non_empty("code", &req.code)?;
    let name = validation::non_empty("name", &req.name)?;

    let domain: CompetencyDomainRow = sqlx::query_as(
        r#"
        INSERT INTO competency_domains (code, name, description, framework_alignment)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&code)
    .bind(&name)
    .bind(req.description.map(|d| d.trim().to_string()))
    .bind(&req.framework_alignment)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::on_duplicate(e, &format!("Domain code '{code}' already exists")))?;

    info!("Created competency domain {} ({})", domain.code, domain.id);
    Ok((StatusCode::CREATED, Json(domain)))
}

#[derive(Debug, Deserialize)]
pub struct CreateAreaRequest {
    pub domain_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub weight: Option<f64>,
}

/// POST /api/competencies/areas
pub async fn handle_create_area(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateAreaRequest>,
) -> Result<(StatusCode, Json<CompetencyAreaRow>), AppError> {
    caller.require_any(&[UserRole::SystemAdmin])?;
    let code = validation::non_empty("code", &req.code)?;
    let name = validation::non_empty("name", &req.name)?;
    validation::non_negative("sort_order", req.sort_order)?;
    let weight = req.weight.unwrap_or(1.0);
    if !weight.is_finite() || weight < 0.0 {
        return Err(AppError::Validation("weight must be >= 0".to_string()));
    }

    let area: CompetencyAreaRow = sqlx::query_as(
        r#"
        INSERT INTO competency_areas (domain_id, code, name, description, sort_order, weight)
        SELECT $1, $2, $3, $4, $5, $6
        WHERE EXISTS (SELECT 1 FROM competency_domains WHERE id = $1)
        RETURNING *
        "#,
    )
    .bind(req.domain_id)
    .bind(&code)
    .bind(&name)
    .bind(req.description.map(|d| d.trim().to_string()))
    .bind(req.sort_order.unwrap_or(0))
    .bind(weight)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| AppError::on_duplicate(e, &format!("Area code '{code}' already exists")))?
    .ok_or_else(|| AppError::Validation(format!("Domain {} does not exist", req.domain_id)))?;

    info!("Created competency area {} ({})", area.code, area.id);
    Ok((StatusCode::CREATED, Json(area)))
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub area_id: Uuid,
    pub level_id: Uuid,
    pub code: String,
    pub description: String,
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
}

/// POST /api/competencies/items
pub async fn handle_create_item(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<CompetencyItemRow>), AppError> {
    caller.require_any(&[UserRole::SystemAdmin])?;
    let code = validation::non_empty("code", &req.code)?;
    let description = validation::non_empty("description", &req.description)?;
    validation::non_negative("sort_order", req.sort_order)?;

    let item: CompetencyItemRow = sqlx::query_as(
        r#"
        INSERT INTO competency_items (area_id, level_id, code, description, sort_order, learning_outcomes)
        SELECT $1, $2, $3, $4, $5, $6
        WHERE EXISTS (SELECT 1 FROM competency_areas WHERE id = $1)
          AND EXISTS (SELECT 1 FROM competency_levels WHERE id = $2)
        RETURNING *
        "#,
    )
    .bind(req.area_id)
    .bind(req.level_id)
    .bind(&code)
    .bind(&description)
    .bind(req.sort_order.unwrap_or(0))
    .bind(&req.learning_outcomes)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| AppError::on_duplicate(e, &format!("Item code '{code}' already exists")))?
    .ok_or_else(|| AppError::Validation("Unknown area_id or level_id".to_string()))?;

    info!("Created competency item {} ({})", item.code, item.id);
    Ok((StatusCode::CREATED, Json(item)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(code: &str) -> CompetencyAreaRow {
        CompetencyAreaRow {
            id: Uuid::new_v4(),
            domain_id: Uuid::nil(),
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            sort_order: 0,
            weight: 1.0,
        }
    }

    fn item(area_id: Uuid, code: &str) -> ItemWithLevel {
        ItemWithLevel {
            item: CompetencyItemRow {
                id: Uuid::new_v4(),
                area_id,
                level_id: Uuid::nil(),
                code: code.to_string(),
                description: String::new(),
                sort_order: 0,
                learning_outcomes: vec![],
            },
            level_number: 1,
            level_name: "Foundation".to_string(),
            benchmark_score: 50.0,
        }
    }

    #[test]
    fn test_items_grouped_under_their_area() {
        let a = area("VLR-01");
        let b = area("VLR-02");
        let items = vec![
            item(a.id, "VLR-01-L1-01"),
            item(b.id, "VLR-02-L1-01"),
            item(a.id, "VLR-01-L1-02"),
        ];
        let tree = group_items(vec![a, b], items);
        let codes: Vec<Vec<&str>> = tree
            .iter()
            .map(|t| t.items.iter().map(|i| i.item.code.as_str()).collect())
            .collect();
        assert_eq!(codes, vec![vec!["VLR-01-L1-01", "VLR-01-L1-02"], vec!["VLR-02-L1-01"]]);
    }
}
