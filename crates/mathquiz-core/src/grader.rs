//! Answer grading.
//!
//! Submitted answers are looked up by `q_{id}` (a bare `{id}` key is also
//! accepted) and resolved against the options with
//! [`SubmittedAnswer::resolve`]. The only comparison made is index equality
//! against the canonical `correct_answer`.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::QuizError;
use crate::model::{AnswerOutcome, Feedback, Question, SubmittedAnswer, Test, TestResult};

/// Grade a test against a set of submitted answers.
pub fn grade(
    test: &Test,
    answers: &BTreeMap<String, SubmittedAnswer>,
) -> Result<TestResult, QuizError> {
    grade_questions(test.id, &test.questions, answers)
}

/// Grade an arbitrary question list. `test_id` is copied into the result.
pub fn grade_questions(
    test_id: Uuid,
    questions: &[Question],
    answers: &BTreeMap<String, SubmittedAnswer>,
) -> Result<TestResult, QuizError> {
    if questions.is_empty() {
        return Err(QuizError::EmptyTest);
    }

    let feedback: Vec<Feedback> = questions
        .iter()
        .map(|q| judge(q, lookup_answer(q, answers)))
        .collect();

    let score = feedback.iter().filter(|f| f.is_correct).count() as u32;
    let answered = feedback
        .iter()
        .filter(|f| f.outcome != AnswerOutcome::Unanswered)
        .count() as u32;
    let total = questions.len() as u32;

    Ok(TestResult {
        test_id,
        date: Utc::now(),
        score,
        total,
        answered,
        percentage: percentage(score, total),
        feedback,
    })
}

/// `correct / total * 100`, with an empty total scoring zero.
pub fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

fn lookup_answer<'a>(
    question: &Question,
    answers: &'a BTreeMap<String, SubmittedAnswer>,
) -> Option<&'a SubmittedAnswer> {
    answers
        .get(&question.answer_key())
        .or_else(|| answers.get(&question.id.to_string()))
        .filter(|a| !a.is_blank())
}

/// Judge one question against an optional submitted answer.
pub fn judge(question: &Question, answer: Option<&SubmittedAnswer>) -> Feedback {
    let outcome = match answer {
        None => AnswerOutcome::Unanswered,
        Some(answer) => match answer.resolve(&question.options) {
            Some(i) if i == question.correct_answer => AnswerOutcome::Correct,
            Some(_) => AnswerOutcome::Incorrect,
            None => AnswerOutcome::Invalid,
        },
    };

    Feedback {
        question_id: question.id,
        question: question.question.clone(),
        user_answer: answer.map(|a| a.to_string().trim().to_string()),
        correct_answer: question.correct_option().to_string(),
        explanation: question.explanation.clone(),
        outcome,
        is_correct: outcome == AnswerOutcome::Correct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::fallback_questions;

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, SubmittedAnswer> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), SubmittedAnswer::from(*v)))
            .collect()
    }

    fn fixture() -> Vec<Question> {
        // Questions 1..=5 of the fallback bank: correct options "5", "7", "4", "3", "$20".
        fallback_questions().into_iter().take(5).collect()
    }

    #[test]
    fn score_counts_matching_answers() {
        let result = grade_questions(
            Uuid::nil(),
            &fixture(),
            &answers(&[("q_1", "5"), ("q_2", "7"), ("q_3", "8"), ("q_5", "$20")]),
        )
        .unwrap();

        assert_eq!(result.score, 3);
        assert_eq!(result.total, 5);
        assert_eq!(result.answered, 4);
        assert!((result.percentage - 60.0).abs() < f64::EPSILON);
        assert_eq!(result.feedback[2].outcome, AnswerOutcome::Incorrect);
        assert_eq!(result.feedback[3].outcome, AnswerOutcome::Unanswered);
        assert_eq!(result.feedback[3].user_answer, None);
    }

    #[test]
    fn letter_and_index_submissions_are_accepted() {
        let mut submitted = answers(&[("q_1", "B"), ("q_2", "b)")]);
        submitted.insert("3".to_string(), SubmittedAnswer::Index(1));
        let result = grade_questions(Uuid::nil(), &fixture(), &submitted).unwrap();
        assert_eq!(result.score, 3);
    }

    #[test]
    fn numeric_text_is_not_read_as_an_index() {
        // Question 3: "Solve: 4(x + 2) = 24", options 2/4/6/8, correct "4".
        let q3 = &fallback_questions()[2];
        let feedback = judge(q3, Some(&SubmittedAnswer::from("1")));
        assert_eq!(feedback.outcome, AnswerOutcome::Invalid);
        assert!(!feedback.is_correct);
        assert_eq!(feedback.user_answer.as_deref(), Some("1"));

        let feedback = judge(q3, Some(&SubmittedAnswer::from("2")));
        assert_eq!(feedback.outcome, AnswerOutcome::Incorrect);

        let result =
            grade_questions(Uuid::nil(), &fixture(), &answers(&[("q_3", "1")])).unwrap();
        assert_eq!(result.score, 0);
    }

    #[test]
    fn unmatched_answer_is_invalid() {
        let result =
            grade_questions(Uuid::nil(), &fixture(), &answers(&[("q_1", "banana")])).unwrap();
        assert_eq!(result.feedback[0].outcome, AnswerOutcome::Invalid);
        assert!(!result.feedback[0].is_correct);
        assert_eq!(result.score, 0);
        assert_eq!(result.answered, 1);
    }

    #[test]
    fn blank_answer_is_unanswered() {
        let result = grade_questions(Uuid::nil(), &fixture(), &answers(&[("q_1", "   ")])).unwrap();
        assert_eq!(result.feedback[0].outcome, AnswerOutcome::Unanswered);
        assert_eq!(result.answered, 0);
    }

    #[test]
    fn whitespace_is_trimmed_before_matching() {
        let result = grade_questions(Uuid::nil(), &fixture(), &answers(&[("q_5", "  $20 ")])).unwrap();
        assert!(result.feedback[4].is_correct);
        assert_eq!(result.feedback[4].user_answer.as_deref(), Some("$20"));
    }

    #[test]
    fn empty_test_is_an_error() {
        let err = grade_questions(Uuid::nil(), &[], &BTreeMap::new()).unwrap_err();
        assert_eq!(err, QuizError::EmptyTest);
    }

    #[test]
    fn percentage_of_empty_total_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
        assert_eq!(percentage(1, 4), 25.0);
    }

    #[test]
    fn completing_a_test_stores_the_result() {
        let mut test = Test::new("session", fixture());
        let result = test.complete(answers(&[("q_1", "5")])).unwrap().clone();
        assert!(test.completed);
        assert_eq!(test.completed_at, Some(result.date));
        assert_eq!(result.test_id, test.id);
        assert_eq!(test.answers.len(), 1);
    }
}
