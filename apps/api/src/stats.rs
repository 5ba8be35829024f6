//! Small numeric helpers shared by the cohort summaries and reports.

use serde::Serialize;

use crate::models::assessment::Priority;

/// Rounds to `decimals` places with halves going up, so -2.5 becomes -2.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Nearest-rank percentile: the element at `floor(n * p)` of the sorted
/// sample, or 0 for an empty sample.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Number of gap rows per priority tier.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn add(&mut self, priority: Priority) {
        match priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }

    /// Tallies stored priority strings; unrecognized values are skipped.
    pub fn tally<'a>(priorities: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for p in priorities {
            if let Ok(priority) = p.parse::<Priority>() {
                counts.add(priority);
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666, 1), 66.7);
        assert_eq!(round_to(66.666, 2), 66.67);
        assert_eq!(round_to(12.5, 0), 13.0);
    }

    #[test]
    fn test_round_to_negative_halves_go_up() {
        assert_eq!(round_to(-2.5, 0), -2.0);
        assert_eq!(round_to(-2.25, 1), -2.2);
        assert_eq!(round_to(-2.6, 0), -3.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[40.0, 60.0, 80.0]), Some(60.0));
    }

    #[test]
    fn test_percentile_floor_index() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&sorted, 0.25), 20.0);
        assert_eq!(percentile(&sorted, 0.5), 30.0);
        assert_eq!(percentile(&sorted, 0.75), 40.0);
        assert_eq!(percentile(&[55.0], 0.75), 55.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_priority_tally() {
        let counts = PriorityCounts::tally(["CRITICAL", "LOW", "LOW", "bogus", "HIGH"]);
        assert_eq!(
            counts,
            PriorityCounts { critical: 1, high: 1, medium: 0, low: 2 }
        );
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["CRITICAL"], 1);
        assert_eq!(json["LOW"], 2);
    }
}
