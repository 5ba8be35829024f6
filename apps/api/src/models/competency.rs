use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum QuestionType {
        SelfRating => "SELF_RATING",
        MultipleChoice => "MULTIPLE_CHOICE",
        TrueFalse => "TRUE_FALSE",
        Scenario => "SCENARIO",
    }
}

impl QuestionType {
    /// Knowledge questions are marked against `correct_answer`; self-ratings are not.
    pub fn is_knowledge(&self) -> bool {
        !matches!(self, QuestionType::SelfRating)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetencyLevelRow {
    pub id: Uuid,
    pub level_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub benchmark_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetencyDomainRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub framework_alignment: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetencyAreaRow {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetencyItemRow {
    pub id: Uuid,
    pub area_id: Uuid,
    pub level_id: Uuid,
    pub code: String,
    pub description: String,
    pub sort_order: i32,
    pub learning_outcomes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentInstrumentRow {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub code: String,
    pub name: String,
    pub instrument_type: String,
    pub version: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentQuestionRow {
    pub id: Uuid,
    pub instrument_id: Uuid,
    pub competency_item_id: Uuid,
    pub code: String,
    pub question_type: String,
    pub question_text: String,
    pub options: Value,
    pub correct_answer: Option<Value>,
    pub points: i32,
    pub difficulty_level: i32,
    pub sort_order: i32,
    pub rationale: Option<String>,
}

/// A question joined with the item, area and level it is tagged to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionDetailRow {
    pub id: Uuid,
    pub instrument_id: Uuid,
    pub competency_item_id: Uuid,
    pub code: String,
    pub question_type: String,
    pub question_text: String,
    pub options: Value,
    pub correct_answer: Option<Value>,
    pub points: i32,
    pub difficulty_level: i32,
    pub sort_order: i32,
    pub rationale: Option<String>,
    pub item_code: String,
    pub item_description: String,
    pub area_id: Uuid,
    pub area_code: String,
    pub area_name: String,
    pub level_number: i32,
    pub level_name: String,
}

impl QuestionDetailRow {
    /// Strips the answer key before a participant sees the question.
    pub fn without_answer_key(mut self) -> Self {
        self.correct_answer = None;
        self.rationale = None;
        self
    }
}
