//! Assessment state machine: NOT_STARTED -> IN_PROGRESS -> COMPLETED.
//! A completed assessment accepts no further writes.

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::assessment::AssessmentStatus;

/// What `start` does with an existing assessment of the requested type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAction {
    /// No assessment yet: create one already IN_PROGRESS.
    Create,
    /// Move a NOT_STARTED assessment to IN_PROGRESS.
    Activate,
    /// Hand back the in-progress assessment unchanged.
    Resume,
}

pub fn start_action(existing: Option<AssessmentStatus>) -> Result<StartAction, AppError> {
    match existing {
        None => Ok(StartAction::Create),
        Some(AssessmentStatus::NotStarted) => Ok(StartAction::Activate),
        Some(AssessmentStatus::InProgress) => Ok(StartAction::Resume),
        Some(AssessmentStatus::Completed) => Err(already_completed()),
    }
}

pub fn ensure_accepts_responses(status: AssessmentStatus) -> Result<(), AppError> {
    match status {
        AssessmentStatus::InProgress => Ok(()),
        AssessmentStatus::NotStarted => Err(not_started()),
        AssessmentStatus::Completed => Err(already_completed()),
    }
}

pub fn ensure_can_complete(status: AssessmentStatus) -> Result<(), AppError> {
    ensure_accepts_responses(status)
}

/// Whole minutes between start and completion, rounded to nearest.
pub fn time_taken_minutes(started_at: Option<DateTime<Utc>>, completed_at: DateTime<Utc>) -> Option<i32> {
    let started_at = started_at?;
    let seconds = (completed_at - started_at).num_seconds().max(0) as f64;
    Some((seconds / 60.0).round() as i32)
}

pub fn already_completed() -> AppError {
    AppError::Validation("Assessment already completed".to_string())
}

fn not_started() -> AppError {
    AppError::Validation("Assessment has not been started".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_start_transitions() {
        assert_eq!(start_action(None).unwrap(), StartAction::Create);
        assert_eq!(
            start_action(Some(AssessmentStatus::NotStarted)).unwrap(),
            StartAction::Activate
        );
        assert_eq!(
            start_action(Some(AssessmentStatus::InProgress)).unwrap(),
            StartAction::Resume
        );
        assert!(matches!(
            start_action(Some(AssessmentStatus::Completed)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_completed_is_immutable() {
        assert!(ensure_accepts_responses(AssessmentStatus::Completed).is_err());
        assert!(ensure_can_complete(AssessmentStatus::Completed).is_err());
    }

    #[test]
    fn test_only_in_progress_takes_writes() {
        assert!(ensure_accepts_responses(AssessmentStatus::InProgress).is_ok());
        assert!(ensure_accepts_responses(AssessmentStatus::NotStarted).is_err());
        assert!(ensure_can_complete(AssessmentStatus::NotStarted).is_err());
    }

    #[test]
    fn test_time_taken_rounds() {
        let done = Utc::now();
        assert_eq!(time_taken_minutes(Some(done - Duration::seconds(89)), done), Some(1));
        assert_eq!(time_taken_minutes(Some(done - Duration::seconds(90)), done), Some(2));
        assert_eq!(time_taken_minutes(Some(done - Duration::minutes(42)), done), Some(42));
        assert_eq!(time_taken_minutes(None, done), None);
    }
}
