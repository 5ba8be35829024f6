//! Per-area gap computation against role benchmarks.

use uuid::Uuid;

use crate::assessments::scoring::AreaScores;
use crate::models::assessment::Priority;
use crate::models::competency::CompetencyLevelRow;
use crate::models::user::RoleType;

/// Benchmark used when no role target exists for an area.
pub const DEFAULT_TARGET_BENCHMARK: f64 = 70.0;
/// Role assumed for participants without a profile role.
pub const DEFAULT_ROLE: RoleType = RoleType::Inspector;

/// Missing knowledge counts as zero here, and only here.
pub fn gap_score(target_benchmark: f64, knowledge: Option<f64>) -> f64 {
    (target_benchmark - knowledge.unwrap_or(0.0)).max(0.0)
}

pub fn priority_for(gap: f64) -> Priority {
    if gap > 40.0 {
        Priority::Critical
    } else if gap > 30.0 {
        Priority::High
    } else if gap > 15.0 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Highest level whose benchmark the knowledge score reaches.
pub fn current_level(levels: &[CompetencyLevelRow], knowledge: Option<f64>) -> Option<&CompetencyLevelRow> {
    let knowledge = knowledge?;
    levels
        .iter()
        .filter(|l| l.benchmark_score <= knowledge)
        .max_by(|a, b| a.benchmark_score.total_cmp(&b.benchmark_score))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedGap {
    pub area_id: Uuid,
    pub self_rating_score: Option<f64>,
    pub knowledge_score: Option<f64>,
    pub gap_score: f64,
    pub priority: Priority,
    pub current_level_id: Option<Uuid>,
    pub target_level_id: Option<Uuid>,
}

pub fn compute_gap(
    area_id: Uuid,
    scores: AreaScores,
    target: Option<&CompetencyLevelRow>,
    levels: &[CompetencyLevelRow],
) -> ComputedGap {
    let benchmark = target
        .map(|l| l.benchmark_score)
        .unwrap_or(DEFAULT_TARGET_BENCHMARK);
    let gap = gap_score(benchmark, scores.knowledge);
    ComputedGap {
        area_id,
        self_rating_score: scores.self_rating,
        knowledge_score: scores.knowledge,
        gap_score: gap,
        priority: priority_for(gap),
        current_level_id: current_level(levels, scores.knowledge).map(|l| l.id),
        target_level_id: target.map(|l| l.id),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn standard_levels() -> Vec<CompetencyLevelRow> {
        [(1, "Foundation", 50.0), (2, "Advanced", 70.0), (3, "Expert", 85.0)]
            .into_iter()
            .map(|(n, name, benchmark)| CompetencyLevelRow {
                id: Uuid::new_v4(),
                level_number: n,
                name: name.to_string(),
                description: None,
                benchmark_score: benchmark,
            })
            .collect()
    }

    #[test]
    fn test_priority_thresholds() {
        assert_eq!(priority_for(40.1), Priority::Critical);
        assert_eq!(priority_for(40.0), Priority::High);
        assert_eq!(priority_for(30.5), Priority::High);
        assert_eq!(priority_for(30.0), Priority::Medium);
        assert_eq!(priority_for(15.01), Priority::Medium);
        assert_eq!(priority_for(15.0), Priority::Low);
        assert_eq!(priority_for(0.0), Priority::Low);
    }

    #[test]
    fn test_gap_never_negative() {
        assert_eq!(gap_score(70.0, Some(95.0)), 0.0);
        assert_eq!(gap_score(70.0, Some(50.0)), 20.0);
        assert_eq!(gap_score(70.0, None), 70.0);
    }

    #[test]
    fn test_current_level_is_highest_reached() {
        let levels = standard_levels();
        assert_eq!(current_level(&levels, Some(72.0)).map(|l| l.level_number), Some(2));
        assert_eq!(current_level(&levels, Some(85.0)).map(|l| l.level_number), Some(3));
        assert!(current_level(&levels, Some(49.9)).is_none());
        assert!(current_level(&levels, None).is_none());
    }

    #[test]
    fn test_compute_gap_with_role_target() {
        let levels = standard_levels();
        let expert = &levels[2];
        let gap = compute_gap(
            Uuid::new_v4(),
            AreaScores { self_rating: Some(4.0), knowledge: Some(40.0) },
            Some(expert),
            &levels,
        );
        assert_eq!(gap.gap_score, 45.0);
        assert_eq!(gap.priority, Priority::Critical);
        assert_eq!(gap.current_level_id, None);
        assert_eq!(gap.target_level_id, Some(expert.id));
    }

    #[test]
    fn test_compute_gap_defaults_to_seventy() {
        let levels = standard_levels();
        let gap = compute_gap(
            Uuid::new_v4(),
            AreaScores { self_rating: None, knowledge: Some(60.0) },
            None,
            &levels,
        );
        assert_eq!(gap.gap_score, 10.0);
        assert_eq!(gap.priority, Priority::Low);
        assert_eq!(gap.current_level_id, Some(levels[0].id));
        assert_eq!(gap.target_level_id, None);
    }

    #[test]
    fn test_area_without_answers_is_critical() {
        let gap = compute_gap(
            Uuid::new_v4(),
            AreaScores { self_rating: None, knowledge: None },
            None,
            &standard_levels(),
        );
        assert_eq!(gap.knowledge_score, None);
        assert_eq!(gap.gap_score, 70.0);
        assert_eq!(gap.priority, Priority::Critical);
    }
}
