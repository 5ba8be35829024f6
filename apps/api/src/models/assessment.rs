use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum AssessmentType {
        Baseline => "BASELINE",
        PostTraining => "POST_TRAINING",
    }
}

text_enum! {
    pub enum AssessmentStatus {
        NotStarted => "NOT_STARTED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
    }
}

text_enum! {
    /// Gap priority tier, most severe first.
    pub enum Priority {
        Critical => "CRITICAL",
        High => "HIGH",
        Medium => "MEDIUM",
        Low => "LOW",
    }
}

impl Priority {
    /// Sort key: 0 is the most severe tier.
    pub fn severity_rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentRow {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub project_id: Uuid,
    pub instrument_id: Uuid,
    pub assessment_type: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_taken_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentResponseRow {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub question_id: Uuid,
    pub response_value: Value,
    pub score: f64,
    pub time_spent_seconds: Option<i32>,
    pub answered_at: DateTime<Utc>,
}

/// A gap row joined with its area and level labels, as read by reports and
/// the recommendation generator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GapDetailRow {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub participant_id: Uuid,
    pub assessment_type: String,
    pub competency_area_id: Uuid,
    pub area_code: String,
    pub area_name: String,
    pub area_sort_order: i32,
    pub self_rating_score: Option<f64>,
    pub knowledge_score: Option<f64>,
    pub gap_score: f64,
    pub priority: String,
    pub current_level_number: Option<i32>,
    pub current_level_name: Option<String>,
    pub target_level_number: Option<i32>,
    pub target_level_name: Option<String>,
}

/// Assessment list entry with its project, instrument and participant labels.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentListRow {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub project_id: Uuid,
    pub instrument_id: Uuid,
    pub assessment_type: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_taken_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub project_name: String,
    pub instrument_name: String,
    pub instrument_type: String,
    pub participant_first_name: String,
    pub participant_last_name: String,
    pub participant_email: String,
    pub response_count: i64,
    pub gap_analysis_count: i64,
}
