//! Improvement analytics over progress records.

use crate::model::{ContentLevel, Progress, User};
use crate::placement::PlacementPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHighlight {
    pub topic: String,
    pub value: i32,
}

/// What the results page shows for one learner in one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerInsight {
    /// `post - pre`, treating a missing score as 0. Saturates at the `i32` bounds.
    pub improvement: i32,
    /// Topic with the largest non-negative improvement.
    pub most_improved_topic: Option<TopicHighlight>,
    /// Topic with the lowest post-test score.
    pub weakest_topic: Option<TopicHighlight>,
    /// Display label for the pre-test score, if one was submitted.
    pub pre_test_label: Option<ContentLevel>,
}

#[must_use]
pub fn learner_insight(progress: &Progress, policy: &PlacementPolicy) -> LearnerInsight {
    let improvement = progress
        .post_test_score()
        .unwrap_or(0)
        .saturating_sub(progress.pre_test_score().unwrap_or(0));

    let mut most_improved: Option<TopicHighlight> = None;
    let mut weakest: Option<TopicHighlight> = None;

    for (topic, score) in progress.topic_scores().iter() {
        let gain = score.improvement();
        if gain >= 0 && most_improved.as_ref().is_none_or(|best| gain > best.value) {
            most_improved = Some(TopicHighlight {
                topic: topic.to_owned(),
                value: gain,
            });
        }
        if weakest.as_ref().is_none_or(|low| score.post < low.value) {
            weakest = Some(TopicHighlight {
                topic: topic.to_owned(),
                value: score.post,
            });
        }
    }

    LearnerInsight {
        improvement,
        most_improved_topic: most_improved,
        weakest_topic: weakest,
        pre_test_label: progress.pre_test_score().map(|s| policy.classify(s)),
    }
}

/// Platform-wide overview for the admin dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemAnalytics {
    pub total_learners: usize,
    /// Submitted pre-tests plus submitted post-tests.
    pub total_tests: usize,
    /// Mean of the positive `post - pre` gains, two decimals. Zero when none.
    pub avg_improvement: f64,
}

#[must_use]
pub fn system_analytics<'a>(
    users: &[User],
    progress: impl IntoIterator<Item = &'a Progress>,
) -> SystemAnalytics {
    let total_learners = users.iter().filter(|u| u.is_learner()).count();

    let mut total_tests = 0_usize;
    let mut gain_sum = 0_i64;
    let mut gain_count = 0_u32;

    for record in progress {
        if record.pre_test_score().is_some() {
            total_tests += 1;
        }
        if let Some(post) = record.post_test_score() {
            total_tests += 1;
            if let Some(pre) = record.pre_test_score() {
                let diff = i64::from(post) - i64::from(pre);
                if diff > 0 {
                    gain_sum += diff;
                    gain_count += 1;
                }
            }
        }
    }

    let avg_improvement = if gain_count == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let mean = gain_sum as f64 / f64::from(gain_count);
        (mean * 100.0).round() / 100.0
    };

    SystemAnalytics {
        total_learners,
        total_tests,
        avg_improvement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, KnowledgeLevel, Role, TestKind, UserId};
    use crate::time::fixed_now;

    fn progress(pre: Option<i32>, post: Option<i32>) -> Progress {
        let mut p = Progress::new(UserId::new(1), CourseId::new(1), fixed_now());
        p.select_knowledge_level(KnowledgeLevel::Basic, fixed_now());
        if let Some(pre) = pre {
            p.record_pre_test(pre, &PlacementPolicy::default(), fixed_now());
        }
        if let Some(post) = post {
            p.record_post_test(post, fixed_now());
        }
        p
    }

    fn user(id: u64, role: Role) -> User {
        User::from_persisted(
            UserId::new(id),
            format!("User {id}"),
            format!("u{id}@example.com"),
            role,
            false,
            fixed_now(),
        )
    }

    #[test]
    fn insight_picks_best_and_weakest_topics() {
        let mut p = progress(Some(40), Some(85));
        let scores = p.topic_scores_mut();
        scores.record(TestKind::Pre, "Closures", 20);
        scores.record(TestKind::Post, "Closures", 80);
        scores.record(TestKind::Pre, "Promises", 60);
        scores.record(TestKind::Post, "Promises", 50);

        let insight = learner_insight(&p, &PlacementPolicy::default());
        assert_eq!(insight.improvement, 45);
        assert_eq!(
            insight.most_improved_topic,
            Some(TopicHighlight {
                topic: "Closures".into(),
                value: 60
            })
        );
        assert_eq!(
            insight.weakest_topic,
            Some(TopicHighlight {
                topic: "Promises".into(),
                value: 50
            })
        );
        assert_eq!(insight.pre_test_label, Some(ContentLevel::Basic));
    }

    #[test]
    fn regressing_topics_are_never_most_improved() {
        let mut p = progress(Some(90), Some(70));
        p.topic_scores_mut().record(TestKind::Pre, "Hooks", 90);
        p.topic_scores_mut().record(TestKind::Post, "Hooks", 70);

        let insight = learner_insight(&p, &PlacementPolicy::default());
        assert_eq!(insight.improvement, -20);
        assert_eq!(insight.most_improved_topic, None);
        assert_eq!(insight.weakest_topic.map(|t| t.value), Some(70));
    }

    #[test]
    fn analytics_counts_tests_and_positive_gains() {
        let users = vec![user(1, Role::Learner), user(2, Role::Learner), user(3, Role::Admin)];
        let records = vec![
            progress(Some(40), Some(85)),
            progress(Some(60), Some(50)),
            progress(Some(30), None),
            progress(None, None),
            progress(Some(10), Some(20)),
        ];

        let stats = system_analytics(&users, &records);
        assert_eq!(stats.total_learners, 2);
        assert_eq!(stats.total_tests, 7);
        assert!((stats.avg_improvement - 27.5).abs() < f64::EPSILON);
    }

    #[test]
    fn analytics_rounds_to_two_decimals() {
        let records = vec![
            progress(Some(0), Some(1)),
            progress(Some(0), Some(1)),
            progress(Some(0), Some(2)),
        ];
        let stats = system_analytics(&[], &records);
        assert!((stats.avg_improvement - 1.33).abs() < 1e-9);
    }

    #[test]
    fn extreme_scores_saturate_instead_of_overflowing() {
        let mut p = progress(Some(i32::MIN), Some(i32::MAX));
        p.topic_scores_mut().record(TestKind::Pre, "Edge", i32::MIN);
        p.topic_scores_mut().record(TestKind::Post, "Edge", i32::MAX);

        let insight = learner_insight(&p, &PlacementPolicy::default());
        assert_eq!(insight.improvement, i32::MAX);
        assert_eq!(insight.most_improved_topic.map(|t| t.value), Some(i32::MAX));

        let falling = progress(Some(i32::MAX), Some(i32::MIN));
        let insight = learner_insight(&falling, &PlacementPolicy::default());
        assert_eq!(insight.improvement, i32::MIN);
    }

    #[test]
    fn analytics_widens_extreme_gains() {
        let records = vec![
            progress(Some(i32::MIN), Some(i32::MAX)),
            progress(Some(i32::MAX), Some(i32::MIN)),
        ];
        let stats = system_analytics(&[], &records);
        assert_eq!(stats.total_tests, 4);
        let expected = i64::from(i32::MAX) - i64::from(i32::MIN);
        #[allow(clippy::cast_precision_loss)]
        let expected = expected as f64;
        assert!((stats.avg_improvement - expected).abs() < 1e-3);
    }

    #[test]
    fn analytics_is_zero_without_gains() {
        let stats = system_analytics(&[], &Vec::<Progress>::new());
        assert_eq!(stats.total_tests, 0);
        assert!(stats.avg_improvement.abs() < f64::EPSILON);
    }
}
