use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::user::{UserRole, UserRow};
use crate::state::AppState;
use crate::users::{attach, load_user_view, UserView};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<UserRole>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Anyone may self-register as a participant. Elevated roles have to be
/// granted by a signed-in system admin.
fn check_requested_role(role: UserRole, caller: Option<&AuthUser>) -> Result<(), AppError> {
    if role == UserRole::Participant {
        return Ok(());
    }
    match caller {
        Some(c) if c.role == UserRole::SystemAdmin => Ok(()),
        _ => Err(AppError::Forbidden(format!(
            "Only a system admin can register a {role} account"
        ))),
    }
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = validation::email(&req.email)?;
    validation::password(&req.password)?;
    let first_name = validation::non_empty("first_name", &req.first_name)?;
    let last_name = validation::non_empty("last_name", &req.last_name)?;
    let role = req.role.unwrap_or(UserRole::Participant);
    check_requested_role(role, caller.as_ref())?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    if let Some(org_id) = req.organization_id {
        let org_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM organizations WHERE id = $1)")
                .bind(org_id)
                .fetch_one(&state.db)
                .await?;
        if !org_exists {
            return Err(AppError::Validation(format!("Organization {org_id} does not exist")));
        }
    }

    let password_hash = hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;
    let user: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, role, organization_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(&first_name)
    .bind(&last_name)
    .bind(role.as_str())
    .bind(req.organization_id)
    .fetch_one(&mut *tx)
    .await?;

    if role == UserRole::Participant {
        sqlx::query("INSERT INTO participant_profiles (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!("Registered {} user {} ({})", role, user.id, user.email);

    let token = state.tokens.issue(user.id, &user.email, role)?;
    let user = attach(&state.db, user).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful",
            user,
            token,
        }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".to_string()));
    }

    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;
    if !user.is_active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }
    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let role: UserRole = user
        .role
        .parse()
        .map_err(|e: crate::models::UnknownVariant| AppError::Internal(e.into()))?;
    let token = state.tokens.issue(user.id, &user.email, role)?;
    info!("User {} logged in", user.id);

    Ok(Json(AuthResponse {
        message: "Login successful",
        user: attach(&state.db, user).await?,
        token,
    }))
}

/// POST /api/auth/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.tokens.issue(caller.id, &caller.email, caller.role)?;
    Ok(Json(TokenResponse { token }))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<UserView>, AppError> {
    let view = load_user_view(&state.db, caller.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: UserRole) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "someone@emkei.co.ke".to_string(),
            role,
            first_name: "Some".to_string(),
            last_name: "One".to_string(),
            organization_id: None,
        }
    }

    #[test]
    fn test_participant_registration_is_open() {
        assert!(check_requested_role(UserRole::Participant, None).is_ok());
    }

    #[test]
    fn test_elevated_registration_needs_system_admin() {
        assert!(matches!(
            check_requested_role(UserRole::Facilitator, None),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_requested_role(UserRole::SystemAdmin, Some(&caller(UserRole::Facilitator))),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_requested_role(UserRole::ClientAdmin, Some(&caller(UserRole::SystemAdmin))).is_ok());
    }

    #[test]
    fn test_register_body_uses_snake_case() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "new@sahpra.org.za",
            "password": "Participant123!",
            "first_name": "New",
            "last_name": "Inspector",
        }))
        .unwrap();
        assert!(req.role.is_none());
        assert!(req.organization_id.is_none());
    }
}
