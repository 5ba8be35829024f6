//! Learning units, gap-driven recommendations and the curricula assembled
//! from them.

pub mod handlers;
pub mod recommend;

use serde::Serialize;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::curriculum::{CurriculumRow, CurriculumUnitRow};
use crate::models::project::ProjectRef;
use crate::models::user::UserRef;

/// `{id, code, name}` of a related area or unit.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Link {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// A [`Link`] tagged with the unit it belongs to, for batch loading.
#[derive(Debug, sqlx::FromRow)]
pub struct OwnedLink {
    pub owner_id: Uuid,
    #[sqlx(flatten)]
    pub link: Link,
}

/// Splits batch-loaded links back out per owner.
pub fn links_for(links: &[OwnedLink], owner_id: Uuid) -> Vec<Link> {
    links
        .iter()
        .filter(|l| l.owner_id == owner_id)
        .map(|l| l.link.clone())
        .collect()
}

pub async fn area_links(pool: &PgPool, unit_ids: &[Uuid]) -> Result<Vec<OwnedLink>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT luc.learning_unit_id AS owner_id, ca.id, ca.code, ca.name
        FROM learning_unit_competencies luc
        JOIN competency_areas ca ON ca.id = luc.competency_area_id
        WHERE luc.learning_unit_id = ANY($1)
        ORDER BY ca.sort_order, ca.code
        "#,
    )
    .bind(unit_ids)
    .fetch_all(pool)
    .await
}

pub async fn prerequisite_links(pool: &PgPool, unit_ids: &[Uuid]) -> Result<Vec<OwnedLink>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT p.learning_unit_id AS owner_id, lu.id, lu.code, lu.name
        FROM learning_unit_prerequisites p
        JOIN learning_units lu ON lu.id = p.prerequisite_id
        WHERE p.learning_unit_id = ANY($1)
        ORDER BY lu.code
        "#,
    )
    .bind(unit_ids)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Serialize)]
pub struct CurriculumDetail {
    #[serde(flatten)]
    pub curriculum: CurriculumRow,
    pub project: ProjectRef,
    pub learning_units: Vec<CurriculumUnitRow>,
    pub created_by_user: Option<UserRef>,
    pub approved_by_user: Option<UserRef>,
}

async fn user_ref<'e>(db: impl PgExecutor<'e>, id: Option<Uuid>) -> Result<Option<UserRef>, sqlx::Error> {
    let Some(id) = id else {
        return Ok(None);
    };
    sqlx::query_as("SELECT id, first_name, last_name, email FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_curriculum(pool: &PgPool, id: Uuid) -> Result<CurriculumRow, AppError> {
    sqlx::query_as::<_, CurriculumRow>("SELECT * FROM curricula WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Curriculum"))
}

/// A curriculum with its project, ordered units and the people who created
/// and approved it.
pub async fn load_curriculum_detail(pool: &PgPool, curriculum: CurriculumRow) -> Result<CurriculumDetail, AppError> {
    let project: ProjectRef = sqlx::query_as("SELECT id, name FROM projects WHERE id = $1")
        .bind(curriculum.project_id)
        .fetch_one(pool)
        .await?;

    let learning_units: Vec<CurriculumUnitRow> = sqlx::query_as(
        r#"
        SELECT clu.sort_order, lu.id AS learning_unit_id, lu.code, lu.name,
               lu.duration_hours, l.level_number
        FROM curriculum_learning_units clu
        JOIN learning_units lu ON lu.id = clu.learning_unit_id
        LEFT JOIN competency_levels l ON l.id = lu.level_appropriate_id
        WHERE clu.curriculum_id = $1
        ORDER BY clu.sort_order
        "#,
    )
    .bind(curriculum.id)
    .fetch_all(pool)
    .await?;

    let created_by_user = user_ref(pool, Some(curriculum.created_by)).await?;
    let approved_by_user = user_ref(pool, curriculum.approved_by).await?;

    Ok(CurriculumDetail {
        curriculum,
        project,
        learning_units,
        created_by_user,
        approved_by_user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_split_per_owner() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let link = |owner_id, code: &str| OwnedLink {
            owner_id,
            link: Link {
                id: Uuid::new_v4(),
                code: code.to_string(),
                name: code.to_string(),
            },
        };
        let links = vec![link(a, "VLR-01"), link(b, "VLR-02"), link(a, "VLR-03")];
        let codes: Vec<String> = links_for(&links, a).into_iter().map(|l| l.code).collect();
        assert_eq!(codes, vec!["VLR-01", "VLR-03"]);
        assert!(links_for(&links, Uuid::nil()).is_empty());
    }
}
