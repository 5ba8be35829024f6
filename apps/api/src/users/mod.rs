pub mod handlers;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::organization::OrganizationSummary;
use crate::models::user::{ParticipantProfileRow, UserRow};

/// A user with its organization and participant profile attached.
/// The password hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: UserRow,
    pub organization: Option<OrganizationSummary>,
    pub participant_profile: Option<ParticipantProfileRow>,
}

pub async fn load_user_view(pool: &PgPool, user_id: Uuid) -> Result<Option<UserView>, sqlx::Error> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    match user {
        Some(user) => Ok(Some(attach(pool, user).await?)),
        None => Ok(None),
    }
}

pub async fn attach(pool: &PgPool, user: UserRow) -> Result<UserView, sqlx::Error> {
    let organization = match user.organization_id {
        Some(org_id) => {
            sqlx::query_as::<_, OrganizationSummary>(
                "SELECT id, name, org_type, country FROM organizations WHERE id = $1",
            )
            .bind(org_id)
            .fetch_optional(pool)
            .await?
        }
        None => None,
    };
    let participant_profile = fetch_profile(pool, user.id).await?;
    Ok(UserView {
        user,
        organization,
        participant_profile,
    })
}

pub async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ParticipantProfileRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM participant_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
