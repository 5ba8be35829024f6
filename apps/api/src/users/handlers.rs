use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthUser, STAFF};
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::user::{EducationLevel, ParticipantProfileRow, RoleType, UserRole, UserRow};
use crate::pagination::{PageParams, Pagination};
use crate::state::AppState;
use crate::users::{attach, load_user_view, UserView};
use crate::validation;

/// GET /api/users/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<UserView>, AppError> {
    let view = load_user_view(&state.db, caller.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile: Option<Value>,
}

/// PUT /api/users/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<UpdateMeRequest>,
) -> Result<Json<UserView>, AppError> {
    let first_name = validation::optional_non_empty("first_name", req.first_name.as_deref())?;
    let last_name = validation::optional_non_empty("last_name", req.last_name.as_deref())?;
    validation::json_object("profile", req.profile.as_ref())?;

    let user: UserRow = sqlx::query_as(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name  = COALESCE($3, last_name),
            profile    = COALESCE($4, profile),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(caller.id)
    .bind(first_name)
    .bind(last_name)
    .bind(req.profile)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(attach(&state.db, user).await?))
}

#[derive(Debug, Deserialize)]
pub struct ParticipantProfileRequest {
    pub job_title: Option<String>,
    pub years_experience: Option<i32>,
    pub education_level: Option<EducationLevel>,
    pub current_role_type: Option<RoleType>,
    pub professional_background: Option<String>,
}

/// PUT /api/users/me/participant-profile
pub async fn handle_upsert_participant_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<ParticipantProfileRequest>,
) -> Result<Json<ParticipantProfileRow>, AppError> {
    validation::non_negative("years_experience", req.years_experience)?;

    let job_title = req.job_title.map(|s| s.trim().to_string());
    let background = req.professional_background.map(|s| s.trim().to_string());

    // Omitted fields keep their stored value on update.
    let profile: ParticipantProfileRow = sqlx::query_as(
        r#"
        INSERT INTO participant_profiles
            (user_id, job_title, years_experience, education_level,
             current_role_type, professional_background)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id) DO UPDATE SET
            job_title               = COALESCE(EXCLUDED.job_title, participant_profiles.job_title),
            years_experience        = COALESCE(EXCLUDED.years_experience, participant_profiles.years_experience),
            education_level         = COALESCE(EXCLUDED.education_level, participant_profiles.education_level),
            current_role_type       = COALESCE(EXCLUDED.current_role_type, participant_profiles.current_role_type),
            professional_background = COALESCE(EXCLUDED.professional_background, participant_profiles.professional_background),
            updated_at              = now()
        RETURNING *
        "#,
    )
    .bind(caller.id)
    .bind(job_title)
    .bind(req.years_experience)
    .bind(req.education_level.map(|e| e.as_str()))
    .bind(req.current_role_type.map(|r| r.as_str()))
    .bind(background)
    .fetch_one(&state.db)
    .await?;

    info!("Updated participant profile for user {}", caller.id);
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub organization_id: Option<Uuid>,
    pub role: Option<UserRole>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
    pub pagination: Pagination,
}

/// GET /api/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    caller.require_any(STAFF)?;
    let role = query.role.map(|r| r.as_str());
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let rows: Vec<UserRow> = sqlx::query_as(
        r#"
        SELECT * FROM users
        WHERE ($1::uuid IS NULL OR organization_id = $1)
          AND ($2::text IS NULL OR role = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(query.organization_id)
    .bind(role)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::uuid IS NULL OR organization_id = $1)
          AND ($2::text IS NULL OR role = $2)
        "#,
    )
    .bind(query.organization_id)
    .bind(role)
    .fetch_one(&state.db)
    .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        users.push(attach(&state.db, row).await?);
    }

    Ok(Json(UserListResponse {
        users,
        pagination: page.describe(total),
    }))
}

/// GET /api/users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, AppError> {
    caller.require_any(STAFF)?;
    let view = load_user_view(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(view))
}
