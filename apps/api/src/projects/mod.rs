pub mod cohort;
pub mod handlers;

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::project::ProjectRow;

pub async fn fetch_project(pool: &PgPool, id: Uuid) -> Result<ProjectRow, AppError> {
    sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Project"))
}

/// Loads a project the caller may read: staff see all, others only their organization's.
pub async fn visible_project(pool: &PgPool, caller: &AuthUser, id: Uuid) -> Result<ProjectRow, AppError> {
    let project = fetch_project(pool, id).await?;
    if !caller.can_access_organization(project.organization_id) {
        return Err(AppError::forbidden());
    }
    Ok(project)
}

pub async fn is_enrolled(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM project_participants WHERE project_id = $1 AND user_id = $2)",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}
