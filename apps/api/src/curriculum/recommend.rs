//! Turns a project's baseline gap rows into a ranked list of learning units.
//!
//! Areas are ordered by their worst observed priority and then by average
//! gap. Each area contributes up to two units whose level sits closest to one
//! above the cohort's average current level.

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::assessment::{GapDetailRow, Priority};
use crate::stats::round_to;

/// Units recommended per area.
pub const UNITS_PER_AREA: usize = 2;

/// A learning unit that may be recommended, with the areas it is tagged to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitCandidate {
    pub id: Uuid,
    pub level_number: Option<i32>,
    pub area_ids: Vec<Uuid>,
}

impl UnitCandidate {
    fn level(&self) -> i32 {
        self.level_number.unwrap_or(1)
    }
}

/// Gap rows of one area folded together.
#[derive(Debug, Clone)]
pub struct AreaAggregate {
    pub area_id: Uuid,
    pub area_name: String,
    pub gap_ids: Vec<Uuid>,
    pub avg_gap: f64,
    pub participant_count: usize,
    pub worst_priority: Priority,
    level_sum: i64,
}

impl AreaAggregate {
    /// Mean current level, with a missing level counted as 0.
    pub fn avg_current_level(&self) -> f64 {
        self.level_sum as f64 / self.participant_count.max(1) as f64
    }

    pub fn target_level(&self) -> i32 {
        self.avg_current_level().ceil() as i32 + 1
    }

    pub fn rationale(&self) -> String {
        format!(
            "Addresses {} gap ({} priority, avg gap: {}%). {} participant(s) have gaps in this area.",
            self.area_name,
            self.worst_priority,
            round_to(self.avg_gap, 0),
            self.participant_count
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRecommendation {
    pub learning_unit_id: Uuid,
    pub priority_rank: i32,
    pub rationale: String,
    pub gap_ids: Vec<Uuid>,
}

/// Folds gap rows per area, keeping the order areas are first seen in.
pub fn aggregate(gaps: &[GapDetailRow]) -> Result<Vec<AreaAggregate>, AppError> {
    let mut areas: Vec<AreaAggregate> = Vec::new();
    for gap in gaps {
        let priority: Priority = gap.priority.parse()?;
        let level = i64::from(gap.current_level_number.unwrap_or(0));
        match areas.iter_mut().find(|a| a.area_id == gap.competency_area_id) {
            Some(area) => {
                let n = area.participant_count as f64;
                area.avg_gap = (area.avg_gap * n + gap.gap_score) / (n + 1.0);
                area.participant_count += 1;
                area.level_sum += level;
                area.gap_ids.push(gap.id);
                if priority.severity_rank() < area.worst_priority.severity_rank() {
                    area.worst_priority = priority;
                }
            }
            None => areas.push(AreaAggregate {
                area_id: gap.competency_area_id,
                area_name: gap.area_name.clone(),
                gap_ids: vec![gap.id],
                avg_gap: gap.gap_score,
                participant_count: 1,
                worst_priority: priority,
                level_sum: level,
            }),
        }
    }
    Ok(areas)
}

/// Most severe first, then the larger average gap. Stable, so ties keep
/// first-seen order.
pub fn rank_areas(areas: &mut [AreaAggregate]) {
    areas.sort_by(|a, b| {
        a.worst_priority
            .severity_rank()
            .cmp(&b.worst_priority.severity_rank())
            .then_with(|| b.avg_gap.total_cmp(&a.avg_gap))
    });
}

/// Builds the recommendation list for a set of gap rows and the domain's units.
/// Ranks start at 1 and no unit appears twice.
pub fn plan(gaps: &[GapDetailRow], units: &[UnitCandidate]) -> Result<Vec<PlannedRecommendation>, AppError> {
    let mut areas = aggregate(gaps)?;
    rank_areas(&mut areas);

    let mut planned: Vec<PlannedRecommendation> = Vec::new();
    for area in &areas {
        let target = area.target_level();
        let mut candidates: Vec<&UnitCandidate> = units
            .iter()
            .filter(|u| u.area_ids.contains(&area.area_id))
            .collect();
        candidates.sort_by_key(|u| (u.level() - target).abs());

        let fresh: Vec<&UnitCandidate> = candidates
            .into_iter()
            .filter(|u| !planned.iter().any(|p| p.learning_unit_id == u.id))
            .take(UNITS_PER_AREA)
            .collect();

        for unit in fresh {
            planned.push(PlannedRecommendation {
                learning_unit_id: unit.id,
                priority_rank: planned.len() as i32 + 1,
                rationale: area.rationale(),
                gap_ids: area.gap_ids.clone(),
            });
        }
    }
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap(area_id: Uuid, name: &str, score: f64, priority: &str, level: Option<i32>) -> GapDetailRow {
        GapDetailRow {
            id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            participant_id: Uuid::new_v4(),
            assessment_type: "BASELINE".to_string(),
            competency_area_id: area_id,
            area_code: name.to_uppercase(),
            area_name: name.to_string(),
            area_sort_order: 0,
            self_rating_score: Some(3.0),
            knowledge_score: Some(70.0 - score),
            gap_score: score,
            priority: priority.to_string(),
            current_level_number: level,
            current_level_name: None,
            target_level_number: Some(2),
            target_level_name: None,
        }
    }

    fn unit(level: Option<i32>, areas: &[Uuid]) -> UnitCandidate {
        UnitCandidate {
            id: Uuid::new_v4(),
            level_number: level,
            area_ids: areas.to_vec(),
        }
    }

    #[test]
    fn test_aggregate_tracks_worst_priority_and_mean() {
        let area = Uuid::new_v4();
        let gaps = vec![
            gap(area, "GMP", 20.0, "MEDIUM", Some(1)),
            gap(area, "GMP", 45.0, "CRITICAL", None),
        ];
        let agg = aggregate(&gaps).unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].worst_priority, Priority::Critical);
        assert_eq!(agg[0].participant_count, 2);
        assert!((agg[0].avg_gap - 32.5).abs() < 1e-9);
        assert!((agg[0].avg_current_level() - 0.5).abs() < 1e-9);
        assert_eq!(agg[0].target_level(), 2);
    }

    #[test]
    fn test_areas_ranked_by_severity_then_gap() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let gaps = vec![
            gap(a, "A", 20.0, "MEDIUM", None),
            gap(b, "B", 35.0, "HIGH", None),
            gap(c, "C", 38.0, "HIGH", None),
        ];
        let mut areas = aggregate(&gaps).unwrap();
        rank_areas(&mut areas);
        let names: Vec<&str> = areas.iter().map(|a| a.area_name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_plan_prefers_units_near_target_level() {
        let area = Uuid::new_v4();
        let gaps = vec![gap(area, "Documentation", 50.0, "CRITICAL", Some(1))];
        // target level = ceil(1) + 1 = 2
        let l3 = unit(Some(3), &[area]);
        let l2 = unit(Some(2), &[area]);
        let l1 = unit(None, &[area]);
        let plan = plan(&gaps, &[l3.clone(), l2.clone(), l1]).unwrap();
        let ids: Vec<Uuid> = plan.iter().map(|p| p.learning_unit_id).collect();
        assert_eq!(ids, vec![l2.id, l3.id]);
        assert_eq!(
            plan[0].rationale,
            "Addresses Documentation gap (CRITICAL priority, avg gap: 50%). 1 participant(s) have gaps in this area."
        );
    }

    #[test]
    fn test_plan_ranks_sequential_without_repeats() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let gaps = vec![
            gap(a, "A", 45.0, "CRITICAL", None),
            gap(b, "B", 32.0, "HIGH", None),
        ];
        let shared = unit(Some(1), &[a, b]);
        let only_a = unit(Some(1), &[a]);
        let only_b = unit(Some(2), &[b]);
        let plan = plan(&gaps, &[shared.clone(), only_a.clone(), only_b.clone()]).unwrap();

        let ranks: Vec<i32> = plan.iter().map(|p| p.priority_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        let ids: Vec<Uuid> = plan.iter().map(|p| p.learning_unit_id).collect();
        assert_eq!(ids, vec![shared.id, only_a.id, only_b.id]);
    }

    #[test]
    fn test_area_without_units_contributes_nothing() {
        let gaps = vec![gap(Uuid::new_v4(), "Orphan", 60.0, "CRITICAL", None)];
        assert!(plan(&gaps, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_priority_is_rejected() {
        let gaps = vec![gap(Uuid::new_v4(), "A", 10.0, "URGENT", None)];
        assert!(aggregate(&gaps).is_err());
    }
}
