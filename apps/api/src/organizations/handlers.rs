use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthUser, STAFF};
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::organization::{OrganizationRow, OrganizationType};
use crate::models::user::UserRole;
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct OrganizationListQuery {
    #[serde(rename = "type")]
    pub org_type: Option<OrganizationType>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrganizationListRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub organization: OrganizationRow,
    pub user_count: i64,
    pub project_count: i64,
}

/// GET /api/organizations
pub async fn handle_list_organizations(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<OrganizationListQuery>,
) -> Result<Json<Vec<OrganizationListRow>>, AppError> {
    let only_id = if caller.is_staff() {
        None
    } else {
        Some(caller.organization_id.unwrap_or_else(Uuid::nil))
    };

    let rows: Vec<OrganizationListRow> = sqlx::query_as(
        r#"
        SELECT o.*,
               (SELECT COUNT(*) FROM users u WHERE u.organization_id = o.id) AS user_count,
               (SELECT COUNT(*) FROM projects p WHERE p.organization_id = o.id) AS project_count
        FROM organizations o
        WHERE ($1::text IS NULL OR o.org_type = $1)
          AND ($2::text IS NULL OR o.country = $2)
          AND ($3::uuid IS NULL OR o.id = $3)
        ORDER BY o.name
        "#,
    )
    .bind(query.org_type.map(|t| t.as_str()))
    .bind(query.country)
    .bind(only_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    pub country: String,
    pub settings: Option<Value>,
}

/// POST /api/organizations
pub async fn handle_create_organization(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationRow>), AppError> {
    caller.require_any(STAFF)?;
    let name = validation::non_empty("name", &req.name)?;
    let country = validation::non_empty("country", &req.country)?;
    validation::json_object("settings", req.settings.as_ref())?;

    let org: OrganizationRow = sqlx::query_as(
        r#"
        INSERT INTO organizations (name, org_type, country, settings)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(req.org_type.as_str())
    .bind(&country)
    .bind(req.settings.unwrap_or_else(|| Value::Object(Default::default())))
    .fetch_one(&state.db)
    .await?;

    info!("Created organization {} '{}'", org.id, org.name);
    Ok((StatusCode::CREATED, Json(org)))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MemberRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrganizationProjectRow {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationDetail {
    #[serde(flatten)]
    pub organization: OrganizationRow,
    pub users: Vec<MemberRow>,
    pub projects: Vec<OrganizationProjectRow>,
}

/// GET /api/organizations/:id
pub async fn handle_get_organization(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrganizationDetail>, AppError> {
    if !caller.can_access_organization(id) {
        return Err(AppError::forbidden());
    }

    let organization: OrganizationRow = sqlx::query_as("SELECT * FROM organizations WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Organization"))?;

    let users: Vec<MemberRow> = sqlx::query_as(
        r#"
        SELECT id, email, first_name, last_name, role
        FROM users WHERE organization_id = $1
        ORDER BY last_name, first_name
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let projects: Vec<OrganizationProjectRow> = sqlx::query_as(
        r#"
        SELECT id, name, status, start_date, end_date
        FROM projects WHERE organization_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(OrganizationDetail {
        organization,
        users,
        projects,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub org_type: Option<OrganizationType>,
    pub country: Option<String>,
    pub settings: Option<Value>,
}

/// PUT /api/organizations/:id
pub async fn handle_update_organization(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationRow>, AppError> {
    caller.require_any(&[UserRole::SystemAdmin, UserRole::Facilitator, UserRole::ClientAdmin])?;
    if caller.role == UserRole::ClientAdmin && caller.organization_id != Some(id) {
        return Err(AppError::forbidden());
    }
    let name = validation::optional_non_empty("name", req.name.as_deref())?;
    let country = validation::optional_non_empty("country", req.country.as_deref())?;
    validation::json_object("settings", req.settings.as_ref())?;

    let org: OrganizationRow = sqlx::query_as(
        r#"
        UPDATE organizations
        SET name       = COALESCE($2, name),
            org_type   = COALESCE($3, org_type),
            country    = COALESCE($4, country),
            settings   = COALESCE($5, settings),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(req.org_type.map(|t| t.as_str()))
    .bind(country)
    .bind(req.settings)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Organization"))?;

    info!("Updated organization {}", org.id);
    Ok(Json(org))
}
