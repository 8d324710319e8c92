//! Summary statistics over test history and question usage.

use serde::{Deserialize, Serialize};

use crate::model::{Question, TestResult};

/// Aggregate view of an owner's recent results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub tests_taken: usize,
    pub average_percentage: f64,
    pub best_percentage: f64,
    pub latest_percentage: Option<f64>,
}

/// Summarize results given newest first.
pub fn summarize_history(results: &[TestResult]) -> HistorySummary {
    if results.is_empty() {
        return HistorySummary::default();
    }

    let total: f64 = results.iter().map(|r| r.percentage).sum();
    let best = results
        .iter()
        .map(|r| r.percentage)
        .fold(f64::NEG_INFINITY, f64::max);

    HistorySummary {
        tests_taken: results.len(),
        average_percentage: total / results.len() as f64,
        best_percentage: best,
        latest_percentage: results.first().map(|r| r.percentage),
    }
}

/// How often a question has been answered correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAccuracy {
    pub question_id: u32,
    pub question: String,
    pub times_used: u32,
    pub times_correct: u32,
    /// `times_correct / times_used`, in `0.0..=1.0`.
    pub accuracy: f64,
}

/// Accuracy of every question that has been used, hardest first.
///
/// Ties are broken by usage (most used first), then by ID.
pub fn question_accuracy(questions: &[Question]) -> Vec<QuestionAccuracy> {
    let mut stats: Vec<QuestionAccuracy> = questions
        .iter()
        .filter(|q| q.times_used > 0)
        .map(|q| QuestionAccuracy {
            question_id: q.id,
            question: q.question.clone(),
            times_used: q.times_used,
            times_correct: q.times_correct,
            accuracy: (q.times_correct.min(q.times_used) as f64) / q.times_used as f64,
        })
        .collect();

    stats.sort_by(|a, b| {
        a.accuracy
            .total_cmp(&b.accuracy)
            .then(b.times_used.cmp(&a.times_used))
            .then(a.question_id.cmp(&b.question_id))
    });
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::fallback_questions;
    use chrono::Utc;
    use uuid::Uuid;

    fn result(percentage: f64) -> TestResult {
        TestResult {
            test_id: Uuid::nil(),
            date: Utc::now(),
            score: 0,
            total: 5,
            answered: 5,
            percentage,
            feedback: vec![],
        }
    }

    #[test]
    fn summary_of_empty_history() {
        let summary = summarize_history(&[]);
        assert_eq!(summary.tests_taken, 0);
        assert_eq!(summary.latest_percentage, None);
    }

    #[test]
    fn summary_values() {
        let summary = summarize_history(&[result(40.0), result(100.0), result(60.0)]);
        assert_eq!(summary.tests_taken, 3);
        assert!((summary.average_percentage - 66.666).abs() < 0.01);
        assert_eq!(summary.best_percentage, 100.0);
        assert_eq!(summary.latest_percentage, Some(40.0));
    }

    #[test]
    fn accuracy_orders_hardest_first() {
        let mut questions = fallback_questions();
        questions[0].times_used = 4;
        questions[0].times_correct = 4;
        questions[1].times_used = 4;
        questions[1].times_correct = 1;
        questions[2].times_used = 2;
        questions[2].times_correct = 1;

        let stats = question_accuracy(&questions);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].question_id, 2);
        assert_eq!(stats[1].question_id, 3);
        assert_eq!(stats[2].question_id, 1);
        assert_eq!(stats[2].accuracy, 1.0);
    }
}
