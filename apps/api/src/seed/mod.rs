//! Idempotent loader for the VLR framework, its question bank and the demo
//! accounts. Every insert skips rows that already exist, so running it on
//! each startup is safe.

pub mod content;

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use sqlx::{Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::models::competency::QuestionType;
use content::{
    item_area_code, item_sort_order, AREAS, DOMAIN_CODE, DOMAIN_DESCRIPTION, DOMAIN_NAME, FRAMEWORKS,
    INSTRUMENT_CODE, INSTRUMENT_NAME, ITEMS, KNOWLEDGE_QUESTIONS, LEARNING_UNITS, LEVELS, OPTION_LABELS,
    ORGANIZATIONS, ROLE_TARGETS, SELF_RATINGS_PER_AREA, SELF_RATING_SCALE, USERS,
};

pub async fn run(pool: &sqlx::PgPool) -> Result<()> {
    info!("Seeding reference data...");
    let mut tx = pool.begin().await?;

    let levels = seed_levels(&mut tx).await?;
    let domain_id = seed_domain(&mut tx).await?;
    let areas = seed_areas(&mut tx, domain_id).await?;
    let items = seed_items(&mut tx, &areas, &levels).await?;
    seed_instrument(&mut tx, domain_id, &items).await?;
    seed_learning_units(&mut tx, domain_id, &areas, &levels).await?;
    seed_role_targets(&mut tx, &levels).await?;
    seed_accounts(&mut tx).await?;

    tx.commit().await?;
    info!(
        "Seed complete: {} levels, {} areas, {} items, {} learning units",
        levels.len(),
        areas.len(),
        items.len(),
        LEARNING_UNITS.len()
    );
    Ok(())
}

type Tx = Transaction<'static, Postgres>;

async fn seed_levels(tx: &mut Tx) -> Result<HashMap<i32, Uuid>> {
    let mut ids = HashMap::new();
    for level in LEVELS {
        sqlx::query(
            r#"
            INSERT INTO competency_levels (level_number, name, description, benchmark_score)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (level_number) DO NOTHING
            "#,
        )
        .bind(level.number)
        .bind(level.name)
        .bind(level.description)
        .bind(level.benchmark)
        .execute(&mut **tx)
        .await?;

        let id: Uuid = sqlx::query_scalar("SELECT id FROM competency_levels WHERE level_number = $1")
            .bind(level.number)
            .fetch_one(&mut **tx)
            .await?;
        ids.insert(level.number, id);
    }
    Ok(ids)
}

async fn seed_domain(tx: &mut Tx) -> Result<Uuid> {
    let frameworks: Vec<String> = FRAMEWORKS.iter().map(|f| f.to_string()).collect();
    sqlx::query(
        r#"
        INSERT INTO competency_domains (code, name, description, framework_alignment)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(DOMAIN_CODE)
    .bind(DOMAIN_NAME)
    .bind(DOMAIN_DESCRIPTION)
    .bind(&frameworks)
    .execute(&mut **tx)
    .await?;

    Ok(sqlx::query_scalar("SELECT id FROM competency_domains WHERE code = $1")
        .bind(DOMAIN_CODE)
        .fetch_one(&mut **tx)
        .await?)
}

async fn seed_areas(tx: &mut Tx, domain_id: Uuid) -> Result<HashMap<&'static str, Uuid>> {
    let mut ids = HashMap::new();
    for (i, (code, name, description)) in AREAS.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO competency_areas (domain_id, code, name, description, sort_order, weight)
            VALUES ($1, $2, $3, $4, $5, 1.0)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(domain_id)
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(i as i32 + 1)
        .execute(&mut **tx)
        .await?;

        let id: Uuid = sqlx::query_scalar("SELECT id FROM competency_areas WHERE code = $1")
            .bind(code)
            .fetch_one(&mut **tx)
            .await?;
        ids.insert(*code, id);
    }
    Ok(ids)
}

/// Seeded item id keyed by item code, plus its description for question text.
struct SeededItem {
    id: Uuid,
    description: &'static str,
}

async fn seed_items(
    tx: &mut Tx,
    areas: &HashMap<&'static str, Uuid>,
    levels: &HashMap<i32, Uuid>,
) -> Result<Vec<(&'static str, SeededItem)>> {
    let mut seeded = Vec::with_capacity(ITEMS.len());
    for (level, code, description) in ITEMS {
        let area_code = item_area_code(code);
        let area_id = areas
            .get(area_code)
            .with_context(|| format!("item {code} names unknown area {area_code}"))?;
        let level_id = levels
            .get(level)
            .with_context(|| format!("item {code} names unknown level {level}"))?;

        sqlx::query(
            r#"
            INSERT INTO competency_items (area_id, level_id, code, description, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(area_id)
        .bind(level_id)
        .bind(code)
        .bind(description)
        .bind(item_sort_order(code))
        .execute(&mut **tx)
        .await?;

        let id: Uuid = sqlx::query_scalar("SELECT id FROM competency_items WHERE code = $1")
            .bind(code)
            .fetch_one(&mut **tx)
            .await?;
        seeded.push((
            *code,
            SeededItem {
                id,
                description: *description,
            },
        ));
    }
    Ok(seeded)
}

fn self_rating_options() -> Value {
    Value::Array(
        SELF_RATING_SCALE
            .iter()
            .map(|(value, label)| json!({ "value": value, "label": label }))
            .collect(),
    )
}

fn choice_options(texts: &[&str; 4]) -> Value {
    Value::Array(
        OPTION_LABELS
            .iter()
            .zip(texts.iter())
            .map(|(label, text)| json!({ "label": label, "text": text }))
            .collect(),
    )
}

struct QuestionInsert<'a> {
    code: String,
    item_id: Uuid,
    kind: QuestionType,
    text: String,
    options: Value,
    correct_answer: Option<Value>,
    points: i32,
    difficulty: i32,
    sort_order: i32,
    rationale: Option<&'a str>,
}

async fn insert_question(tx: &mut Tx, instrument_id: Uuid, q: QuestionInsert<'_>) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assessment_questions
            (instrument_id, competency_item_id, code, question_type, question_text, options,
             correct_answer, points, difficulty_level, sort_order, rationale)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(instrument_id)
    .bind(q.item_id)
    .bind(&q.code)
    .bind(q.kind.as_str())
    .bind(&q.text)
    .bind(&q.options)
    .bind(&q.correct_answer)
    .bind(q.points)
    .bind(q.difficulty)
    .bind(q.sort_order)
    .bind(q.rationale)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn seed_instrument(tx: &mut Tx, domain_id: Uuid, items: &[(&'static str, SeededItem)]) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assessment_instruments (domain_id, code, name, instrument_type, version)
        VALUES ($1, $2, $3, 'COMBINED', '1.0')
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(domain_id)
    .bind(INSTRUMENT_CODE)
    .bind(INSTRUMENT_NAME)
    .execute(&mut **tx)
    .await?;
    let instrument_id: Uuid = sqlx::query_scalar("SELECT id FROM assessment_instruments WHERE code = $1")
        .bind(INSTRUMENT_CODE)
        .fetch_one(&mut **tx)
        .await?;

    let mut sort_order = 1;
    for (area_code, _, _) in AREAS {
        let first_items = items
            .iter()
            .filter(|(code, _)| item_area_code(code) == *area_code)
            .take(SELF_RATINGS_PER_AREA);
        for (code, item) in first_items {
            insert_question(
                tx,
                instrument_id,
                QuestionInsert {
                    code: format!("sr-{code}"),
                    item_id: item.id,
                    kind: QuestionType::SelfRating,
                    text: format!("Rate your current proficiency in: {}", item.description),
                    options: self_rating_options(),
                    correct_answer: None,
                    points: 5,
                    difficulty: 1,
                    sort_order,
                    rationale: None,
                },
            )
            .await?;
            sort_order += 1;
        }
    }

    for (i, q) in KNOWLEDGE_QUESTIONS.iter().enumerate() {
        let item = items
            .iter()
            .find(|(code, _)| *code == q.item_code)
            .map(|(_, item)| item)
            .with_context(|| format!("question references unknown item {}", q.item_code))?;
        insert_question(
            tx,
            instrument_id,
            QuestionInsert {
                code: format!("kq-{}", i + 1),
                item_id: item.id,
                kind: QuestionType::MultipleChoice,
                text: q.text.to_string(),
                options: choice_options(&q.options),
                correct_answer: Some(json!(q.answer)),
                points: q.points,
                difficulty: q.difficulty,
                sort_order,
                rationale: Some(q.rationale),
            },
        )
        .await?;
        sort_order += 1;
    }
    Ok(())
}

async fn seed_learning_units(
    tx: &mut Tx,
    domain_id: Uuid,
    areas: &HashMap<&'static str, Uuid>,
    levels: &HashMap<i32, Uuid>,
) -> Result<()> {
    for unit in LEARNING_UNITS {
        let methods: Vec<String> = unit.methods.iter().map(|m| m.to_string()).collect();
        let outcomes: Vec<String> = unit.outcomes.iter().map(|o| o.to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO learning_units
                (domain_id, code, name, description, duration_hours, delivery_methods,
                 learning_outcomes, level_appropriate_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(domain_id)
        .bind(unit.code)
        .bind(unit.name)
        .bind(unit.description)
        .bind(unit.hours)
        .bind(&methods)
        .bind(&outcomes)
        .bind(levels.get(&unit.level))
        .execute(&mut **tx)
        .await?;

        let unit_id: Uuid = sqlx::query_scalar("SELECT id FROM learning_units WHERE code = $1")
            .bind(unit.code)
            .fetch_one(&mut **tx)
            .await?;

        for area_code in unit.areas {
            let area_id = areas
                .get(area_code)
                .with_context(|| format!("unit {} names unknown area {area_code}", unit.code))?;
            sqlx::query(
                r#"
                INSERT INTO learning_unit_competencies (learning_unit_id, competency_area_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(unit_id)
            .bind(area_id)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

async fn seed_role_targets(tx: &mut Tx, levels: &HashMap<i32, Uuid>) -> Result<()> {
    for (role, targets) in ROLE_TARGETS {
        for ((area_code, _, _), level) in AREAS.iter().zip(targets.iter()) {
            let level_id = levels
                .get(level)
                .with_context(|| format!("role {role} targets unknown level {level}"))?;
            sqlx::query(
                r#"
                INSERT INTO role_target_levels (role_type, area_code, level_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (role_type, area_code) DO NOTHING
                "#,
            )
            .bind(role)
            .bind(area_code)
            .bind(level_id)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

async fn seed_accounts(tx: &mut Tx) -> Result<()> {
    let mut org_ids: HashMap<&str, Uuid> = HashMap::new();
    for (name, kind, country) in ORGANIZATIONS {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM organizations WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
        let id = match existing {
            Some(id) => id,
            None => {
                sqlx::query_scalar(
                    "INSERT INTO organizations (name, org_type, country) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(name)
                .bind(kind)
                .bind(country)
                .fetch_one(&mut **tx)
                .await?
            }
        };
        org_ids.insert(*name, id);
    }

    for user in USERS {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(user.email)
            .fetch_one(&mut **tx)
            .await?;
        if exists {
            continue;
        }

        let hash = hash_password(user.password)?;
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role, organization_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user.email)
        .bind(&hash)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.role)
        .bind(org_ids.get(user.organization))
        .fetch_one(&mut **tx)
        .await?;

        if user.role == "PARTICIPANT" {
            sqlx::query(
                r#"
                INSERT INTO participant_profiles
                    (user_id, job_title, years_experience, education_level,
                     current_role_type, professional_background)
                VALUES ($1, 'Vaccine Inspector', 3, 'MASTERS', 'INSPECTOR',
                        'Background in pharmaceutical sciences with 3 years experience in vaccine regulatory assessment.')
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }
        info!("Seeded demo account {} ({})", user.email, user.role);
    }
    Ok(())
}
