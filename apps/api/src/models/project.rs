use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum ProjectStatus {
        Setup => "SETUP",
        Active => "ACTIVE",
        Delivery => "DELIVERY",
        Evaluation => "EVALUATION",
        Completed => "COMPLETED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: Uuid,
    pub domain_id: Uuid,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub settings: Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
}

/// Project list entry with organization, domain and creator labels plus counts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectListRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: Uuid,
    pub domain_id: Uuid,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub settings: Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub organization_name: String,
    pub domain_code: String,
    pub domain_name: String,
    pub creator_first_name: String,
    pub creator_last_name: String,
    pub participant_count: i64,
    pub assessment_count: i64,
}
