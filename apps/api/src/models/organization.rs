use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum OrganizationType {
        Nra => "NRA",
        Manufacturer => "MANUFACTURER",
        Academic => "ACADEMIC",
        DevelopmentPartner => "DEVELOPMENT_PARTNER",
        Other => "OTHER",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganizationRow {
    pub id: Uuid,
    pub name: String,
    pub org_type: String,
    pub country: String,
    pub settings: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization fields embedded in user responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub org_type: String,
    pub country: String,
}
