use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::competency::QuestionType;

pub const SELF_RATING_MIN: i64 = 1;
pub const SELF_RATING_MAX: i64 = 5;

/// Scores one answer.
///
/// Self-ratings score their own value (1–5). Knowledge questions earn the
/// question's `points` when the answer matches `correct_answer`, which may be
/// a single value or a list of acceptable values.
pub fn score_response(
    question_type: QuestionType,
    points: i32,
    correct_answer: Option<&Value>,
    answer: &Value,
) -> Result<f64, AppError> {
    if question_type == QuestionType::SelfRating {
        return match self_rating_value(answer) {
            Some(v) if (SELF_RATING_MIN..=SELF_RATING_MAX).contains(&v) => Ok(v as f64),
            _ => Err(AppError::Validation(format!(
                "Self-rating must be an integer between {SELF_RATING_MIN} and {SELF_RATING_MAX}, got {answer}"
            ))),
        };
    }

    let correct = correct_answer
        .map(|expected| answer_matches(expected, answer))
        .unwrap_or(false);
    Ok(if correct { points.max(0) as f64 } else { 0.0 })
}

fn self_rating_value(answer: &Value) -> Option<i64> {
    match answer {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Case-insensitive text form used for answer comparison.
fn canonical(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_lowercase()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn answer_matches(expected: &Value, answer: &Value) -> bool {
    let Some(given) = canonical(answer) else {
        return false;
    };
    match expected {
        Value::Array(options) => options.iter().any(|o| canonical(o).as_deref() == Some(&given)),
        single => canonical(single).as_deref() == Some(&given),
    }
}

/// A stored response joined with the question facts aggregation needs.
#[derive(Debug, Clone)]
pub struct ScoredResponse {
    pub area_id: Uuid,
    pub question_type: QuestionType,
    pub points: i32,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaScores {
    /// Mean self-rating, 1–5.
    pub self_rating: Option<f64>,
    /// Percentage of knowledge points earned, 0–100.
    pub knowledge: Option<f64>,
}

pub fn area_scores(responses: &[ScoredResponse], area_id: Uuid) -> AreaScores {
    let in_area = responses.iter().filter(|r| r.area_id == area_id);

    let mut rating_sum = 0.0;
    let mut rating_count = 0usize;
    let mut earned = 0.0;
    let mut max_points = 0.0;
    for r in in_area {
        if r.question_type.is_knowledge() {
            earned += r.score;
            max_points += r.points.max(0) as f64;
        } else {
            rating_sum += r.score;
            rating_count += 1;
        }
    }

    AreaScores {
        self_rating: (rating_count > 0).then(|| rating_sum / rating_count as f64),
        knowledge: (max_points > 0.0).then(|| (earned / max_points * 100.0).clamp(0.0, 100.0)),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultSummary {
    pub total_questions: usize,
    pub total_score: f64,
    pub max_possible_score: f64,
    pub percentage_score: i64,
}

/// Overall totals for the results page. A self-rating counts 5 toward the maximum.
pub fn summarize(responses: &[ScoredResponse]) -> ResultSummary {
    let total_score: f64 = responses.iter().map(|r| r.score).sum();
    let max_possible_score: f64 = responses
        .iter()
        .map(|r| match r.question_type {
            QuestionType::SelfRating => SELF_RATING_MAX as f64,
            _ => r.points.max(0) as f64,
        })
        .sum();
    let percentage_score = if max_possible_score > 0.0 {
        (total_score / max_possible_score * 100.0).round() as i64
    } else {
        0
    };
    ResultSummary {
        total_questions: responses.len(),
        total_score,
        max_possible_score,
        percentage_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(area_id: Uuid, question_type: QuestionType, points: i32, score: f64) -> ScoredResponse {
        ScoredResponse {
            area_id,
            question_type,
            points,
            score,
        }
    }

    #[test]
    fn test_self_rating_scores_its_value() {
        let score = score_response(QuestionType::SelfRating, 5, None, &json!(4)).unwrap();
        assert_eq!(score, 4.0);
        let score = score_response(QuestionType::SelfRating, 5, None, &json!(" 2 ")).unwrap();
        assert_eq!(score, 2.0);
    }

    #[test]
    fn test_self_rating_out_of_range_rejected() {
        for bad in [json!(0), json!(6), json!("high"), json!(2.5), json!(null)] {
            let result = score_response(QuestionType::SelfRating, 5, None, &bad);
            assert!(matches!(result, Err(AppError::Validation(_))), "accepted {bad}");
        }
    }

    #[test]
    fn test_multiple_choice_awards_points() {
        let correct = json!("C");
        assert_eq!(
            score_response(QuestionType::MultipleChoice, 3, Some(&correct), &json!("C")).unwrap(),
            3.0
        );
        assert_eq!(
            score_response(QuestionType::MultipleChoice, 3, Some(&correct), &json!("c ")).unwrap(),
            3.0
        );
        assert_eq!(
            score_response(QuestionType::MultipleChoice, 3, Some(&correct), &json!("B")).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_any_listed_answer_counts() {
        let correct = json!(["A", "D"]);
        assert_eq!(
            score_response(QuestionType::Scenario, 2, Some(&correct), &json!("D")).unwrap(),
            2.0
        );
        assert_eq!(
            score_response(QuestionType::Scenario, 2, Some(&correct), &json!("B")).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_true_false_accepts_bool_or_text() {
        let correct = json!(true);
        assert_eq!(
            score_response(QuestionType::TrueFalse, 1, Some(&correct), &json!("True")).unwrap(),
            1.0
        );
        assert_eq!(
            score_response(QuestionType::TrueFalse, 1, Some(&correct), &json!(false)).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_missing_correct_answer_scores_zero() {
        assert_eq!(
            score_response(QuestionType::MultipleChoice, 2, None, &json!("A")).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_area_scores_split_by_question_kind() {
        let area = Uuid::new_v4();
        let other = Uuid::new_v4();
        let responses = vec![
            response(area, QuestionType::SelfRating, 5, 4.0),
            response(area, QuestionType::SelfRating, 5, 3.0),
            response(area, QuestionType::MultipleChoice, 2, 2.0),
            response(area, QuestionType::MultipleChoice, 2, 0.0),
            response(other, QuestionType::MultipleChoice, 1, 1.0),
        ];
        let scores = area_scores(&responses, area);
        assert_eq!(scores.self_rating, Some(3.5));
        assert_eq!(scores.knowledge, Some(50.0));
    }

    #[test]
    fn test_knowledge_null_without_knowledge_responses() {
        let area = Uuid::new_v4();
        let responses = vec![response(area, QuestionType::SelfRating, 5, 2.0)];
        let scores = area_scores(&responses, area);
        assert_eq!(scores.self_rating, Some(2.0));
        assert_eq!(scores.knowledge, None);

        let empty = area_scores(&[], area);
        assert_eq!(empty, AreaScores { self_rating: None, knowledge: None });
    }

    #[test]
    fn test_summary_counts_self_rating_max_as_five() {
        let area = Uuid::new_v4();
        let responses = vec![
            response(area, QuestionType::SelfRating, 5, 3.0),
            response(area, QuestionType::MultipleChoice, 2, 2.0),
            response(area, QuestionType::MultipleChoice, 3, 0.0),
        ];
        let summary = summarize(&responses);
        assert_eq!(summary.total_questions, 3);
        assert_eq!(summary.total_score, 5.0);
        assert_eq!(summary.max_possible_score, 10.0);
        assert_eq!(summary.percentage_score, 50);
        assert_eq!(summarize(&[]).percentage_score, 0);
    }
}
