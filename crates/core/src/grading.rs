//! Scoring of a submitted assessment against a course's question bank.

use std::collections::BTreeMap;

use crate::model::Question;

/// Result of grading one submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestGrade {
    /// Overall percentage, rounded half up.
    pub total: i32,
    pub correct: usize,
    pub question_count: usize,
    /// Percentage per topic, rounded half up.
    pub topics: BTreeMap<String, i32>,
}

#[derive(Default)]
struct Tally {
    correct: usize,
    total: usize,
}

/// Grade `answers` (question index → chosen option index) against `questions`.
///
/// Unanswered questions count as wrong. An empty bank scores 0.
#[must_use]
pub fn grade(questions: &[Question], answers: &BTreeMap<usize, usize>) -> TestGrade {
    let mut per_topic: BTreeMap<String, Tally> = BTreeMap::new();
    let mut correct = 0_usize;

    for (index, question) in questions.iter().enumerate() {
        let tally = per_topic
            .entry(question.topic_or_default().to_owned())
            .or_default();
        tally.total += 1;

        if answers.get(&index) == Some(&question.correct_answer) {
            correct += 1;
            tally.correct += 1;
        }
    }

    let topics = per_topic
        .into_iter()
        .map(|(topic, t)| (topic, percent(t.correct, t.total)))
        .collect();

    TestGrade {
        total: percent(correct, questions.len()),
        correct,
        question_count: questions.len(),
        topics,
    }
}

fn percent(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let rounded = (correct * 200 + total) / (total * 2);
    i32::try_from(rounded).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn q(id: u64, topic: Option<&str>, correct: usize) -> Question {
        Question {
            id: QuestionId::new(id),
            question: format!("Q{id}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: correct,
            difficulty: None,
            topic: topic.map(str::to_owned),
        }
    }

    #[test]
    fn empty_bank_scores_zero() {
        let result = grade(&[], &BTreeMap::new());
        assert_eq!(result.total, 0);
        assert!(result.topics.is_empty());
    }

    #[test]
    fn scores_per_topic_and_overall() {
        let questions = vec![
            q(1, Some("Closures"), 0),
            q(2, Some("Closures"), 1),
            q(3, Some("Promises"), 2),
        ];
        let answers = BTreeMap::from([(0, 0), (1, 2), (2, 2)]);
        let result = grade(&questions, &answers);

        assert_eq!(result.correct, 2);
        assert_eq!(result.total, 67);
        assert_eq!(result.topics["Closures"], 50);
        assert_eq!(result.topics["Promises"], 100);
    }

    #[test]
    fn unanswered_questions_are_wrong() {
        let questions = vec![q(1, None, 0), q(2, None, 0)];
        let answers = BTreeMap::from([(0, 0)]);
        let result = grade(&questions, &answers);
        assert_eq!(result.total, 50);
        assert_eq!(result.topics["General"], 50);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(7, 7), 100);
    }
}
