use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    /// Platform role, checked by the route allow-lists.
    pub enum UserRole {
        Participant => "PARTICIPANT",
        Facilitator => "FACILITATOR",
        ClientAdmin => "CLIENT_ADMIN",
        SystemAdmin => "SYSTEM_ADMIN",
    }
}

impl UserRole {
    /// Staff roles see every organization's data.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::SystemAdmin | UserRole::Facilitator)
    }
}

text_enum! {
    /// Job role of a participant; selects the benchmark row in `role_target_levels`.
    pub enum RoleType {
        JuniorInspector => "JUNIOR_INSPECTOR",
        Inspector => "INSPECTOR",
        SeniorInspector => "SENIOR_INSPECTOR",
        UnitManager => "UNIT_MANAGER",
        Analyst => "ANALYST",
        Director => "DIRECTOR",
        Other => "OTHER",
    }
}

text_enum! {
    pub enum EducationLevel {
        HighSchool => "HIGH_SCHOOL",
        Diploma => "DIPLOMA",
        Bachelors => "BACHELORS",
        Masters => "MASTERS",
        Doctorate => "DOCTORATE",
        Other => "OTHER",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub organization_id: Option<Uuid>,
    pub profile: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: Option<String>,
    pub years_experience: Option<i32>,
    pub education_level: Option<String>,
    pub current_role_type: Option<String>,
    pub professional_background: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public identity fragment embedded in other responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}
