//! Bearer-token authentication and role allow-lists.
//!
//! `AuthUser` is an extractor: adding it to a handler's arguments makes the
//! route require a valid token for an existing, active user.

pub mod handlers;
pub mod jwt;
pub mod password;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{UserRole, UserRow};
use crate::state::AppState;

/// The authenticated caller, re-read from the database on every request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub organization_id: Option<Uuid>,
}

impl AuthUser {
    /// 403 unless the caller's role is in `allowed`.
    pub fn require_any(&self, allowed: &[UserRole]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_participant(&self) -> bool {
        self.role == UserRole::Participant
    }

    /// Staff reach every organization; everyone else only their own.
    pub fn can_access_organization(&self, organization_id: Uuid) -> bool {
        self.is_staff() || self.organization_id == Some(organization_id)
    }

    fn from_row(row: UserRow) -> Result<Self, AppError> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(Self {
            id: row.id,
            email: row.email,
            role,
            first_name: row.first_name,
            last_name: row.last_name,
            organization_id: row.organization_id,
        })
    }
}

pub const STAFF: &[UserRole] = &[UserRole::SystemAdmin, UserRole::Facilitator];

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
        let user_id = claims
            .user_id()
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

        match user {
            Some(user) if user.is_active => AuthUser::from_row(user),
            _ => Err(AppError::Unauthorized("User not found or inactive".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

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
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_allow_list() {
        let participant = caller(UserRole::Participant, None);
        assert!(matches!(participant.require_any(STAFF), Err(AppError::Forbidden(_))));
        assert!(caller(UserRole::Facilitator, None).require_any(STAFF).is_ok());
    }

    #[test]
    fn test_organization_scoping() {
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();
        let client_admin = caller(UserRole::ClientAdmin, Some(org));
        assert!(client_admin.can_access_organization(org));
        assert!(!client_admin.can_access_organization(other));
        assert!(caller(UserRole::SystemAdmin, None).can_access_organization(other));
        assert!(!caller(UserRole::Participant, None).can_access_organization(other));
    }
}
