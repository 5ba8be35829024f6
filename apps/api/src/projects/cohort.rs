//! Cohort view of a project's completed baseline gap rows.

use serde::Serialize;
use uuid::Uuid;

use crate::models::assessment::GapDetailRow;
use crate::models::competency::CompetencyAreaRow;
use crate::stats::{mean, round_to, PriorityCounts};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AreaRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl From<&CompetencyAreaRow> for AreaRef {
    fn from(area: &CompetencyAreaRow) -> Self {
        Self {
            id: area.id,
            code: area.code.clone(),
            name: area.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaCohortStat {
    pub area: AreaRef,
    pub participant_count: usize,
    /// Mean knowledge score; a missing score counts as 0.
    pub average_score: f64,
    pub priority_counts: PriorityCounts,
    pub avg_gap_score: f64,
}

pub fn area_stats(areas: &[CompetencyAreaRow], gaps: &[GapDetailRow]) -> Vec<AreaCohortStat> {
    areas
        .iter()
        .map(|area| {
            let in_area: Vec<&GapDetailRow> =
                gaps.iter().filter(|g| g.competency_area_id == area.id).collect();
            let scores: Vec<f64> = in_area.iter().map(|g| g.knowledge_score.unwrap_or(0.0)).collect();
            let gap_scores: Vec<f64> = in_area.iter().map(|g| g.gap_score).collect();
            AreaCohortStat {
                area: area.into(),
                participant_count: in_area.len(),
                average_score: round_to(mean(&scores).unwrap_or(0.0), 2),
                priority_counts: PriorityCounts::tally(in_area.iter().map(|g| g.priority.as_str())),
                avg_gap_score: round_to(mean(&gap_scores).unwrap_or(0.0), 2),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapParticipant {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeatmapCell {
    pub area_code: String,
    pub score: Option<f64>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapRow {
    pub participant: HeatmapParticipant,
    pub scores: Vec<HeatmapCell>,
}

/// One row per assessed participant, one cell per area in area order.
pub fn heatmap(
    areas: &[CompetencyAreaRow],
    participants: Vec<(Uuid, HeatmapParticipant)>,
    gaps: &[GapDetailRow],
) -> Vec<HeatmapRow> {
    participants
        .into_iter()
        .map(|(assessment_id, participant)| {
            let scores = areas
                .iter()
                .map(|area| {
                    let gap = gaps
                        .iter()
                        .find(|g| g.assessment_id == assessment_id && g.competency_area_id == area.id);
                    HeatmapCell {
                        area_code: area.code.clone(),
                        score: gap.and_then(|g| g.knowledge_score),
                        priority: gap.map(|g| g.priority.clone()),
                    }
                })
                .collect();
            HeatmapRow { participant, scores }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn area(code: &str, sort_order: i32) -> CompetencyAreaRow {
        CompetencyAreaRow {
            id: Uuid::new_v4(),
            domain_id: Uuid::nil(),
            code: code.to_string(),
            name: format!("Area {code}"),
            description: None,
            sort_order,
            weight: 1.0,
        }
    }

    pub(crate) fn gap(
        assessment_id: Uuid,
        area: &CompetencyAreaRow,
        knowledge: Option<f64>,
        gap_score: f64,
        priority: &str,
    ) -> GapDetailRow {
        GapDetailRow {
            id: Uuid::new_v4(),
            assessment_id,
            participant_id: Uuid::new_v4(),
            assessment_type: "BASELINE".to_string(),
            competency_area_id: area.id,
            area_code: area.code.clone(),
            area_name: area.name.clone(),
            area_sort_order: area.sort_order,
            self_rating_score: None,
            knowledge_score: knowledge,
            gap_score,
            priority: priority.to_string(),
            current_level_number: None,
            current_level_name: None,
            target_level_number: None,
            target_level_name: None,
        }
    }

    #[test]
    fn test_area_stats_average_and_counts() {
        let a1 = area("VLR-01", 1);
        let a2 = area("VLR-02", 2);
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let gaps = vec![
            gap(x, &a1, Some(40.0), 30.0, "MEDIUM"),
            gap(y, &a1, None, 70.0, "CRITICAL"),
            gap(x, &a2, Some(90.0), 0.0, "LOW"),
        ];
        let stats = area_stats(&[a1.clone(), a2], &gaps);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].area.code, "VLR-01");
        assert_eq!(stats[0].participant_count, 2);
        assert_eq!(stats[0].average_score, 20.0);
        assert_eq!(stats[0].avg_gap_score, 50.0);
        assert_eq!(stats[0].priority_counts.critical, 1);
        assert_eq!(stats[0].priority_counts.medium, 1);
        assert_eq!(stats[1].priority_counts.low, 1);
    }

    #[test]
    fn test_area_without_rows_reports_zeroes() {
        let stats = area_stats(&[area("VLR-03", 3)], &[]);
        assert_eq!(stats[0].participant_count, 0);
        assert_eq!(stats[0].average_score, 0.0);
        assert_eq!(stats[0].avg_gap_score, 0.0);
    }

    #[test]
    fn test_heatmap_cells_follow_area_order() {
        let a1 = area("VLR-01", 1);
        let a2 = area("VLR-02", 2);
        let assessment = Uuid::new_v4();
        let gaps = vec![gap(assessment, &a2, Some(55.0), 15.0, "LOW")];
        let participant = HeatmapParticipant {
            id: Uuid::new_v4(),
            first_name: "Demo".to_string(),
            last_name: "Participant".to_string(),
        };
        let rows = heatmap(&[a1, a2], vec![(assessment, participant)], &gaps);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].scores,
            vec![
                HeatmapCell { area_code: "VLR-01".to_string(), score: None, priority: None },
                HeatmapCell {
                    area_code: "VLR-02".to_string(),
                    score: Some(55.0),
                    priority: Some("LOW".to_string())
                },
            ]
        );
    }
}
