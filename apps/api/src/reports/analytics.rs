//! Pure report arithmetic over gap rows: individual improvement, cohort
//! statistics and domain benchmarks.

use serde::Serialize;

use crate::models::assessment::GapDetailRow;
use crate::models::competency::CompetencyAreaRow;
use crate::projects::cohort::AreaRef;
use crate::stats::{mean, percentile, round_to};

/// Knowledge score at or above which an area counts as a strength.
pub const STRENGTH_THRESHOLD: f64 = 70.0;
/// Post-training cohort average below which an area needs attention.
pub const ATTENTION_THRESHOLD: f64 = 70.0;
pub const TOP_N: usize = 5;

const NO_LEVEL: &str = "N/A";

fn find<'a>(gaps: &'a [GapDetailRow], area: &CompetencyAreaRow) -> Option<&'a GapDetailRow> {
    gaps.iter().find(|g| g.competency_area_id == area.id)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScorePoint {
    pub score: f64,
    pub level: String,
}

impl ScorePoint {
    fn from_gap(gap: Option<&GapDetailRow>) -> Self {
        Self {
            score: gap.and_then(|g| g.knowledge_score).unwrap_or(0.0),
            level: gap
                .and_then(|g| g.current_level_name.clone())
                .unwrap_or_else(|| NO_LEVEL.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaImprovement {
    pub area: AreaRef,
    pub baseline: ScorePoint,
    pub post: ScorePoint,
    /// Rounded post minus baseline knowledge score; absent unless both
    /// assessments have a row for the area.
    pub improvement: Option<f64>,
    pub level_change: bool,
}

/// Per-area comparison of a participant's baseline and post-training gaps.
pub fn area_improvements(
    areas: &[CompetencyAreaRow],
    baseline: &[GapDetailRow],
    post: &[GapDetailRow],
) -> Vec<AreaImprovement> {
    areas
        .iter()
        .map(|area| {
            let before = find(baseline, area);
            let after = find(post, area);
            let improvement = match (before, after) {
                (Some(b), Some(a)) => Some(round_to(
                    a.knowledge_score.unwrap_or(0.0) - b.knowledge_score.unwrap_or(0.0),
                    0,
                )),
                _ => None,
            };
            AreaImprovement {
                area: area.into(),
                baseline: ScorePoint::from_gap(before),
                post: ScorePoint::from_gap(after),
                improvement,
                level_change: after.and_then(|g| g.current_level_number)
                    != before.and_then(|g| g.current_level_number),
            }
        })
        .collect()
}

/// Rounded mean of the improvements that could be computed.
pub fn overall_improvement(improvements: &[AreaImprovement]) -> Option<f64> {
    let values: Vec<f64> = improvements.iter().filter_map(|i| i.improvement).collect();
    mean(&values).map(f64::round)
}

#[derive(Debug, Clone, Serialize)]
pub struct Strength {
    pub area: String,
    pub score: Option<f64>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevelopmentArea {
    pub area: String,
    pub score: Option<f64>,
    pub gap_score: f64,
    pub priority: String,
}

pub fn strengths(latest: &[GapDetailRow]) -> Vec<Strength> {
    latest
        .iter()
        .filter(|g| g.priority == "LOW" || g.knowledge_score.unwrap_or(0.0) >= STRENGTH_THRESHOLD)
        .map(|g| Strength {
            area: g.area_name.clone(),
            score: g.knowledge_score,
            level: g.current_level_name.clone(),
        })
        .collect()
}

pub fn development_areas(latest: &[GapDetailRow]) -> Vec<DevelopmentArea> {
    latest
        .iter()
        .filter(|g| g.priority == "CRITICAL" || g.priority == "HIGH")
        .map(|g| DevelopmentArea {
            area: g.area_name.clone(),
            score: g.knowledge_score,
            gap_score: g.gap_score,
            priority: g.priority.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct CohortScore {
    pub avg_score: f64,
    pub participant_count: usize,
}

impl CohortScore {
    fn of(gaps: &[&GapDetailRow]) -> Self {
        let scores: Vec<f64> = gaps.iter().map(|g| g.knowledge_score.unwrap_or(0.0)).collect();
        Self {
            avg_score: round_to(mean(&scores).unwrap_or(0.0), 1),
            participant_count: gaps.len(),
        }
    }
}

/// Count of gap rows whose current level is 1, 2 or 3.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct LevelDistribution {
    pub level1: usize,
    pub level2: usize,
    pub level3: usize,
}

impl LevelDistribution {
    fn of(gaps: &[&GapDetailRow]) -> Self {
        let count = |n: i32| gaps.iter().filter(|g| g.current_level_number == Some(n)).count();
        Self {
            level1: count(1),
            level2: count(2),
            level3: count(3),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LevelSplit {
    pub baseline: LevelDistribution,
    pub post: LevelDistribution,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstitutionalAreaStat {
    pub area: AreaRef,
    pub baseline: CohortScore,
    pub post: CohortScore,
    /// Post minus baseline average, one decimal; absent without post data.
    pub improvement: Option<f64>,
    pub level_distribution: LevelSplit,
}

pub fn institutional_area_stats(
    areas: &[CompetencyAreaRow],
    baseline: &[GapDetailRow],
    post: &[GapDetailRow],
) -> Vec<InstitutionalAreaStat> {
    areas
        .iter()
        .map(|area| {
            let before: Vec<&GapDetailRow> =
                baseline.iter().filter(|g| g.competency_area_id == area.id).collect();
            let after: Vec<&GapDetailRow> =
                post.iter().filter(|g| g.competency_area_id == area.id).collect();

            let scores_before: Vec<f64> = before.iter().map(|g| g.knowledge_score.unwrap_or(0.0)).collect();
            let scores_after: Vec<f64> = after.iter().map(|g| g.knowledge_score.unwrap_or(0.0)).collect();
            let improvement = (!after.is_empty()).then(|| {
                round_to(
                    mean(&scores_after).unwrap_or(0.0) - mean(&scores_before).unwrap_or(0.0),
                    1,
                )
            });

            InstitutionalAreaStat {
                area: area.into(),
                baseline: CohortScore::of(&before),
                post: CohortScore::of(&after),
                improvement,
                level_distribution: LevelSplit {
                    baseline: LevelDistribution::of(&before),
                    post: LevelDistribution::of(&after),
                },
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct OverallScores {
    pub baseline: f64,
    pub post: f64,
}

/// Mean of the per-area averages, one decimal. An empty area list scores 0.
pub fn overall_scores(stats: &[InstitutionalAreaStat]) -> OverallScores {
    let n = stats.len().max(1) as f64;
    OverallScores {
        baseline: round_to(stats.iter().map(|s| s.baseline.avg_score).sum::<f64>() / n, 1),
        post: round_to(stats.iter().map(|s| s.post.avg_score).sum::<f64>() / n, 1),
    }
}

/// Whole-number percentage; 0 when nobody is enrolled.
pub fn completion_rate(completed: usize, enrolled: usize) -> f64 {
    if enrolled == 0 {
        return 0.0;
    }
    (completed as f64 / enrolled as f64 * 100.0).round()
}

/// Areas with a positive improvement, largest first.
pub fn top_improvements(stats: &[InstitutionalAreaStat]) -> Vec<InstitutionalAreaStat> {
    let mut improved: Vec<InstitutionalAreaStat> = stats
        .iter()
        .filter(|s| s.improvement.is_some_and(|i| i > 0.0))
        .cloned()
        .collect();
    improved.sort_by(|a, b| {
        b.improvement
            .unwrap_or(0.0)
            .total_cmp(&a.improvement.unwrap_or(0.0))
    });
    improved.truncate(TOP_N);
    improved
}

/// Areas whose post average is under the threshold or that regressed,
/// weakest first.
pub fn areas_needing_attention(stats: &[InstitutionalAreaStat]) -> Vec<InstitutionalAreaStat> {
    let mut weak: Vec<InstitutionalAreaStat> = stats
        .iter()
        .filter(|s| s.post.avg_score < ATTENTION_THRESHOLD || s.improvement.is_some_and(|i| i < 0.0))
        .cloned()
        .collect();
    weak.sort_by(|a, b| a.post.avg_score.total_cmp(&b.post.avg_score));
    weak.truncate(TOP_N);
    weak
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Percentiles {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaBenchmark {
    pub area: AreaRef,
    pub sample_size: usize,
    pub average: f64,
    pub percentiles: Percentiles,
}

/// Benchmarks each area from completed baseline gap rows; a missing
/// knowledge score counts as 0.
pub fn benchmarks(areas: &[CompetencyAreaRow], gaps: &[GapDetailRow]) -> Vec<AreaBenchmark> {
    areas
        .iter()
        .map(|area| {
            let mut scores: Vec<f64> = gaps
                .iter()
                .filter(|g| g.competency_area_id == area.id)
                .map(|g| g.knowledge_score.unwrap_or(0.0))
                .collect();
            scores.sort_by(f64::total_cmp);
            AreaBenchmark {
                area: area.into(),
                sample_size: scores.len(),
                average: round_to(mean(&scores).unwrap_or(0.0), 1),
                percentiles: Percentiles {
                    p25: round_to(percentile(&scores, 0.25), 1),
                    p50: round_to(percentile(&scores, 0.5), 1),
                    p75: round_to(percentile(&scores, 0.75), 1),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::cohort::tests::{area, gap};
    use uuid::Uuid;

    fn with_level(mut g: GapDetailRow, n: i32, name: &str) -> GapDetailRow {
        g.current_level_number = Some(n);
        g.current_level_name = Some(name.to_string());
        g
    }

    #[test]
    fn test_improvement_requires_both_rows() {
        let a1 = area("VLR-01", 1);
        let a2 = area("VLR-02", 2);
        let (b, p) = (Uuid::new_v4(), Uuid::new_v4());
        let baseline = vec![
            with_level(gap(b, &a1, Some(40.4), 29.6, "MEDIUM"), 0, "None"),
            gap(b, &a2, Some(80.0), 0.0, "LOW"),
        ];
        let post = vec![with_level(gap(p, &a1, Some(72.0), 0.0, "LOW"), 2, "Advanced")];

        let rows = area_improvements(&[a1, a2], &baseline, &post);
        assert_eq!(rows[0].improvement, Some(32.0));
        assert!(rows[0].level_change);
        assert_eq!(rows[0].post.level, "Advanced");
        assert_eq!(rows[1].improvement, None);
        assert_eq!(rows[1].post, ScorePoint { score: 0.0, level: "N/A".to_string() });
        assert_eq!(overall_improvement(&rows), Some(32.0));
    }

    #[test]
    fn test_decline_of_half_a_point_rounds_up() {
        let a1 = area("VLR-01", 1);
        let (b, p) = (Uuid::new_v4(), Uuid::new_v4());
        let baseline = vec![gap(b, &a1, Some(62.5), 7.5, "LOW")];
        let post = vec![gap(p, &a1, Some(60.0), 10.0, "MEDIUM")];

        let rows = area_improvements(&[a1], &baseline, &post);
        assert_eq!(rows[0].improvement, Some(-2.0));
    }

    #[test]
    fn test_overall_improvement_absent_without_pairs() {
        let a1 = area("VLR-01", 1);
        let rows = area_improvements(&[a1], &[], &[]);
        assert_eq!(overall_improvement(&rows), None);
        assert!(!rows[0].level_change);
    }

    #[test]
    fn test_strengths_and_development_areas() {
        let a1 = area("VLR-01", 1);
        let a2 = area("VLR-02", 2);
        let a3 = area("VLR-03", 3);
        let id = Uuid::new_v4();
        let latest = vec![
            gap(id, &a1, Some(75.0), 10.0, "LOW"),
            gap(id, &a2, Some(20.0), 50.0, "CRITICAL"),
            gap(id, &a3, Some(72.0), 13.0, "LOW"),
        ];
        let strong: Vec<String> = strengths(&latest).into_iter().map(|s| s.area).collect();
        assert_eq!(strong, vec!["Area VLR-01", "Area VLR-03"]);
        let weak = development_areas(&latest);
        assert_eq!(weak.len(), 1);
        assert_eq!(weak[0].priority, "CRITICAL");
    }

    #[test]
    fn test_institutional_stats() {
        let a1 = area("VLR-01", 1);
        let a2 = area("VLR-02", 2);
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let baseline = vec![
            with_level(gap(x, &a1, Some(40.0), 30.0, "MEDIUM"), 1, "Foundation"),
            gap(y, &a1, Some(50.0), 20.0, "MEDIUM"),
            gap(x, &a2, Some(80.0), 0.0, "LOW"),
        ];
        let post = vec![with_level(gap(x, &a1, Some(75.0), 0.0, "LOW"), 2, "Advanced")];

        let stats = institutional_area_stats(&[a1, a2], &baseline, &post);
        assert_eq!(stats[0].baseline, CohortScore { avg_score: 45.0, participant_count: 2 });
        assert_eq!(stats[0].improvement, Some(30.0));
        assert_eq!(stats[0].level_distribution.baseline.level1, 1);
        assert_eq!(stats[0].level_distribution.post.level2, 1);
        assert_eq!(stats[1].improvement, None);

        let overall = overall_scores(&stats);
        assert_eq!(overall, OverallScores { baseline: 62.5, post: 37.5 });

        let top: Vec<String> = top_improvements(&stats).into_iter().map(|s| s.area.code).collect();
        assert_eq!(top, vec!["VLR-01"]);
        // VLR-02 has no post data so its post average is 0.
        let attention: Vec<String> = areas_needing_attention(&stats).into_iter().map(|s| s.area.code).collect();
        assert_eq!(attention, vec!["VLR-02"]);
    }

    #[test]
    fn test_completion_rate() {
        assert_eq!(completion_rate(2, 3), 67.0);
        assert_eq!(completion_rate(0, 0), 0.0);
    }

    #[test]
    fn test_benchmark_percentiles() {
        let a1 = area("VLR-01", 1);
        let a2 = area("VLR-02", 2);
        let gaps: Vec<GapDetailRow> = [10.0, 40.0, 20.0, 30.0]
            .into_iter()
            .map(|s| gap(Uuid::new_v4(), &a1, Some(s), 70.0 - s, "CRITICAL"))
            .collect();
        let out = benchmarks(&[a1, a2], &gaps);
        assert_eq!(out[0].sample_size, 4);
        assert_eq!(out[0].average, 25.0);
        assert_eq!(out[0].percentiles, Percentiles { p25: 20.0, p50: 30.0, p75: 40.0 });
        assert_eq!(out[1].sample_size, 0);
        assert_eq!(out[1].percentiles, Percentiles { p25: 0.0, p50: 0.0, p75: 0.0 });
    }
}
