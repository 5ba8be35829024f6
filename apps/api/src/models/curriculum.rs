use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum RecommendationStatus {
        Recommended => "RECOMMENDED",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
        Delivered => "DELIVERED",
    }
}

text_enum! {
    pub enum CurriculumStatus {
        Draft => "DRAFT",
        Approved => "APPROVED",
        Delivered => "DELIVERED",
    }
}

text_enum! {
    pub enum DeliveryMethod {
        Lecture => "LECTURE",
        CaseStudy => "CASE_STUDY",
        Workshop => "WORKSHOP",
        Practical => "PRACTICAL",
        PeerReview => "PEER_REVIEW",
        ELearning => "E_LEARNING",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LearningUnitRow {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_hours: i32,
    pub delivery_methods: Vec<String>,
    pub learning_outcomes: Vec<String>,
    pub level_appropriate_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CurriculumRecommendationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub participant_id: Option<Uuid>,
    pub learning_unit_id: Uuid,
    pub priority_rank: i32,
    pub rationale: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CurriculumRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub total_hours: i32,
    pub delivery_schedule: Value,
    pub status: String,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A curriculum slot joined with its learning unit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CurriculumUnitRow {
    pub sort_order: i32,
    pub learning_unit_id: Uuid,
    pub code: String,
    pub name: String,
    pub duration_hours: i32,
    pub level_number: Option<i32>,
}
