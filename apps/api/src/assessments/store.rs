use chrono::Utc;
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::assessments::gap::{compute_gap, ComputedGap, DEFAULT_ROLE};
use crate::assessments::lifecycle::{already_completed, time_taken_minutes};
use crate::assessments::scoring::{area_scores, ScoredResponse};
use crate::errors::AppError;
use crate::models::assessment::{AssessmentRow, AssessmentType, GapDetailRow};
use crate::models::competency::{
    AssessmentInstrumentRow, CompetencyAreaRow, CompetencyLevelRow, QuestionDetailRow, QuestionType,
};
use crate::models::user::RoleType;

/// Gap rows joined with assessment, area and level labels. Callers append
/// their own WHERE / ORDER BY.
pub const GAP_DETAIL_SELECT: &str = r#"
    SELECT g.id, g.assessment_id, a.participant_id, a.assessment_type,
           g.competency_area_id, ca.code AS area_code, ca.name AS area_name,
           ca.sort_order AS area_sort_order,
           g.self_rating_score, g.knowledge_score, g.gap_score, g.priority,
           cl.level_number AS current_level_number, cl.name AS current_level_name,
           tl.level_number AS target_level_number, tl.name AS target_level_name
    FROM gap_analyses g
    JOIN assessments a ON a.id = g.assessment_id
    JOIN competency_areas ca ON ca.id = g.competency_area_id
    LEFT JOIN competency_levels cl ON cl.id = g.current_level_id
    LEFT JOIN competency_levels tl ON tl.id = g.target_level_id
"#;

pub async fn fetch_assessment<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<AssessmentRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM assessments WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Inserts a new IN_PROGRESS assessment, or returns the row a concurrent
/// start already created for the same participant, project and type. The
/// flag is true when this call created the row.
pub async fn create_or_fetch_assessment(
    pool: &PgPool,
    participant_id: Uuid,
    project_id: Uuid,
    instrument_id: Uuid,
    kind: AssessmentType,
) -> Result<(bool, AssessmentRow), sqlx::Error> {
    let created: Option<AssessmentRow> = sqlx::query_as(
        r#"
        INSERT INTO assessments
            (participant_id, project_id, instrument_id, assessment_type, status, started_at)
        VALUES ($1, $2, $3, $4, 'IN_PROGRESS', now())
        ON CONFLICT (participant_id, project_id, assessment_type) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(participant_id)
    .bind(project_id)
    .bind(instrument_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    if let Some(row) = created {
        return Ok((true, row));
    }

    let existing: AssessmentRow = sqlx::query_as(
        r#"
        SELECT * FROM assessments
        WHERE participant_id = $1 AND project_id = $2 AND assessment_type = $3
        "#,
    )
    .bind(participant_id)
    .bind(project_id)
    .bind(kind.as_str())
    .fetch_one(pool)
    .await?;
    Ok((false, existing))
}

/// The newest active instrument of a domain.
pub async fn active_instrument(pool: &PgPool, domain_id: Uuid) -> Result<Option<AssessmentInstrumentRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM assessment_instruments
        WHERE domain_id = $1 AND is_active
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(domain_id)
    .fetch_optional(pool)
    .await
}

pub async fn instrument_questions(pool: &PgPool, instrument_id: Uuid) -> Result<Vec<QuestionDetailRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT q.*, i.code AS item_code, i.description AS item_description,
               ca.id AS area_id, ca.code AS area_code, ca.name AS area_name,
               l.level_number, l.name AS level_name
        FROM assessment_questions q
        JOIN competency_items i ON i.id = q.competency_item_id
        JOIN competency_areas ca ON ca.id = i.area_id
        JOIN competency_levels l ON l.id = i.level_id
        WHERE q.instrument_id = $1
        ORDER BY q.sort_order, q.code
        "#,
    )
    .bind(instrument_id)
    .fetch_all(pool)
    .await
}

#[derive(sqlx::FromRow)]
struct ResponseFact {
    area_id: Uuid,
    question_type: String,
    points: i32,
    score: f64,
}

/// Every stored response of an assessment with its area and question kind.
pub async fn scored_responses<'e>(db: impl PgExecutor<'e>, assessment_id: Uuid) -> Result<Vec<ScoredResponse>, AppError> {
    let facts: Vec<ResponseFact> = sqlx::query_as(
        r#"
        SELECT i.area_id, q.question_type, q.points, r.score
        FROM assessment_responses r
        JOIN assessment_questions q ON q.id = r.question_id
        JOIN competency_items i ON i.id = q.competency_item_id
        WHERE r.assessment_id = $1
        "#,
    )
    .bind(assessment_id)
    .fetch_all(db)
    .await?;

    facts
        .into_iter()
        .map(|f| -> Result<ScoredResponse, AppError> {
            Ok(ScoredResponse {
                area_id: f.area_id,
                question_type: f.question_type.parse::<QuestionType>()?,
                points: f.points,
                score: f.score,
            })
        })
        .collect()
}

pub async fn gap_details<'e>(db: impl PgExecutor<'e>, assessment_id: Uuid) -> Result<Vec<GapDetailRow>, sqlx::Error> {
    let sql = format!("{GAP_DETAIL_SELECT} WHERE g.assessment_id = $1 ORDER BY ca.sort_order, ca.code");
    sqlx::query_as(&sql).bind(assessment_id).fetch_all(db).await
}

/// Marks an IN_PROGRESS assessment completed and writes one gap row per area
/// of the project's domain. Runs in one transaction; the status-guarded
/// UPDATE makes a concurrent second completion fail.
pub async fn complete_assessment(pool: &PgPool, assessment: &AssessmentRow) -> Result<Vec<GapDetailRow>, AppError> {
    let completed_at = Utc::now();
    let minutes = time_taken_minutes(assessment.started_at, completed_at);

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE assessments
        SET status = 'COMPLETED', completed_at = $2, time_taken_minutes = $3
        WHERE id = $1 AND status = 'IN_PROGRESS'
        "#,
    )
    .bind(assessment.id)
    .bind(completed_at)
    .bind(minutes)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(already_completed());
    }

    let responses = scored_responses(&mut *tx, assessment.id).await?;

    let areas: Vec<CompetencyAreaRow> = sqlx::query_as(
        r#"
        SELECT ca.* FROM competency_areas ca
        JOIN projects p ON p.domain_id = ca.domain_id
        WHERE p.id = $1
        ORDER BY ca.sort_order, ca.code
        "#,
    )
    .bind(assessment.project_id)
    .fetch_all(&mut *tx)
    .await?;

    let levels: Vec<CompetencyLevelRow> =
        sqlx::query_as("SELECT * FROM competency_levels ORDER BY level_number")
            .fetch_all(&mut *tx)
            .await?;

    let role_text: Option<Option<String>> =
        sqlx::query_scalar("SELECT current_role_type FROM participant_profiles WHERE user_id = $1")
            .bind(assessment.participant_id)
            .fetch_optional(&mut *tx)
            .await?;
    let role = role_text
        .flatten()
        .and_then(|r| r.parse::<RoleType>().ok())
        .unwrap_or(DEFAULT_ROLE);

    let targets: Vec<(String, Uuid)> =
        sqlx::query_as("SELECT area_code, level_id FROM role_target_levels WHERE role_type = $1")
            .bind(role.as_str())
            .fetch_all(&mut *tx)
            .await?;

    let gaps: Vec<ComputedGap> = areas
        .iter()
        .map(|area| {
            let target = targets
                .iter()
                .find(|(code, _)| *code == area.code)
                .and_then(|(_, level_id)| levels.iter().find(|l| l.id == *level_id));
            compute_gap(area.id, area_scores(&responses, area.id), target, &levels)
        })
        .collect();

    for gap in &gaps {
        sqlx::query(
            r#"
            INSERT INTO gap_analyses
                (assessment_id, competency_area_id, self_rating_score, knowledge_score,
                 gap_score, priority, current_level_id, target_level_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(assessment.id)
        .bind(gap.area_id)
        .bind(gap.self_rating_score)
        .bind(gap.knowledge_score)
        .bind(gap.gap_score)
        .bind(gap.priority.as_str())
        .bind(gap.current_level_id)
        .bind(gap.target_level_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Completed assessment {} ({} responses, {} gap rows, role {})",
        assessment.id,
        responses.len(),
        gaps.len(),
        role
    );

    Ok(gap_details(pool, assessment.id).await?)
}
