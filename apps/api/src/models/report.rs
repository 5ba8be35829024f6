use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImpactReportRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub participant_id: Option<Uuid>,
    pub baseline_assessment_id: Option<Uuid>,
    pub post_assessment_id: Option<Uuid>,
    pub overall_improvement_percent: Option<f64>,
    pub area_improvements: Value,
    pub level_changes: Value,
    pub recommendations: Option<String>,
    pub report_data: Value,
    pub s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
}
