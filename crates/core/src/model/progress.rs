use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CourseId, UserId};
use crate::model::level::{ContentLevel, KnowledgeLevel};
use crate::placement::{PlacementDecision, PlacementPolicy};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown progress status: {0}")]
    UnknownStatus(String),

    #[error("unknown test type: {0}")]
    UnknownTestKind(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProgressStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "Pre-Test Required")]
    PreTestRequired,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl ProgressStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "Not Started",
            ProgressStatus::PreTestRequired => "Pre-Test Required",
            ProgressStatus::InProgress => "In Progress",
            ProgressStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Not Started" => Ok(Self::NotStarted),
            "Pre-Test Required" => Ok(Self::PreTestRequired),
            "In Progress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            other => Err(ProgressError::UnknownStatus(other.to_owned())),
        }
    }
}

/// Which of the two course assessments a score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Pre,
    Post,
}

impl TestKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Pre => "pre",
            TestKind::Post => "post",
        }
    }
}

impl FromStr for TestKind {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            other => Err(ProgressError::UnknownTestKind(other.to_owned())),
        }
    }
}

//
// ─── TOPIC SCORES ──────────────────────────────────────────────────────────────
//

/// Pre/post percentage pair for a single topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicScore {
    #[serde(default)]
    pub pre: i32,
    #[serde(default)]
    pub post: i32,
}

impl TopicScore {
    #[must_use]
    pub fn improvement(&self) -> i32 {
        self.post.saturating_sub(self.pre)
    }
}

/// Incoming update for one topic. Only the provided sides are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicScorePatch {
    #[serde(default)]
    pub pre: Option<i32>,
    #[serde(default)]
    pub post: Option<i32>,
}

/// Per-topic scores, accumulated across pre- and post-test submissions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicScores(BTreeMap<String, TopicScore>);

impl TopicScores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one side of a topic's pair, creating `{pre: 0, post: 0}` for new topics.
    pub fn record(&mut self, kind: TestKind, topic: impl Into<String>, score: i32) {
        let entry = self.0.entry(topic.into()).or_default();
        match kind {
            TestKind::Pre => entry.pre = score,
            TestKind::Post => entry.post = score,
        }
    }

    /// Merge patches into the existing map; untouched topics and sides survive.
    pub fn merge<I, S>(&mut self, patches: I)
    where
        I: IntoIterator<Item = (S, TopicScorePatch)>,
        S: Into<String>,
    {
        for (topic, patch) in patches {
            let entry = self.0.entry(topic.into()).or_default();
            if let Some(pre) = patch.pre {
                entry.pre = pre;
            }
            if let Some(post) = patch.post {
                entry.post = post;
            }
        }
    }

    #[must_use]
    pub fn get(&self, topic: &str) -> Option<&TopicScore> {
        self.0.get(topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TopicScore)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, TopicScore> {
        &self.0
    }
}

impl From<BTreeMap<String, TopicScore>> for TopicScores {
    fn from(map: BTreeMap<String, TopicScore>) -> Self {
        Self(map)
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// One learner's state within one course.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    user_id: UserId,
    course_id: CourseId,
    knowledge_level: Option<KnowledgeLevel>,
    allowed_content_level: ContentLevel,
    pre_test_score: Option<i32>,
    post_test_score: Option<i32>,
    pre_test_passed: bool,
    status: ProgressStatus,
    topic_scores: TopicScores,
    last_accessed: DateTime<Utc>,
}

impl Progress {
    /// A fresh record: no level chosen, basic tier, not started.
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            knowledge_level: None,
            allowed_content_level: ContentLevel::Basic,
            pre_test_score: None,
            post_test_score: None,
            pre_test_passed: false,
            status: ProgressStatus::NotStarted,
            topic_scores: TopicScores::new(),
            last_accessed: now,
        }
    }

    /// Rehydrate a record from storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        course_id: CourseId,
        knowledge_level: Option<KnowledgeLevel>,
        allowed_content_level: ContentLevel,
        pre_test_score: Option<i32>,
        post_test_score: Option<i32>,
        pre_test_passed: bool,
        status: ProgressStatus,
        topic_scores: TopicScores,
        last_accessed: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            course_id,
            knowledge_level,
            allowed_content_level,
            pre_test_score,
            post_test_score,
            pre_test_passed,
            status,
            topic_scores,
            last_accessed,
        }
    }

    /// Record the learner's starting point and seed the unlocked tier from it.
    pub fn select_knowledge_level(&mut self, level: KnowledgeLevel, now: DateTime<Utc>) {
        self.knowledge_level = Some(level);
        self.allowed_content_level = level.seeded_content_level();
        self.status = if level.requires_pre_test() {
            ProgressStatus::PreTestRequired
        } else {
            ProgressStatus::InProgress
        };
        self.last_accessed = now;
    }

    /// Store a pre-test score.
    ///
    /// Only intermediate learners are re-placed; for them the policy's
    /// decision replaces the unlocked tier and the status moves to
    /// "In Progress". Returns the decision when one was applied.
    pub fn record_pre_test(
        &mut self,
        score: i32,
        policy: &PlacementPolicy,
        now: DateTime<Utc>,
    ) -> Option<PlacementDecision> {
        self.pre_test_score = Some(score);
        self.last_accessed = now;

        if self.knowledge_level != Some(KnowledgeLevel::Intermediate) {
            return None;
        }

        let decision = policy.evaluate_pre_test(score);
        self.pre_test_passed = decision.passed;
        self.allowed_content_level = decision.tier;
        self.status = ProgressStatus::InProgress;
        Some(decision)
    }

    /// Store a post-test score. Never affects the unlocked tier.
    pub fn record_post_test(&mut self, score: i32, now: DateTime<Utc>) {
        self.post_test_score = Some(score);
        self.last_accessed = now;
    }

    pub fn set_status(&mut self, status: ProgressStatus, now: DateTime<Utc>) {
        self.status = status;
        self.last_accessed = now;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
    }

    pub fn topic_scores_mut(&mut self) -> &mut TopicScores {
        &mut self.topic_scores
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn knowledge_level(&self) -> Option<KnowledgeLevel> {
        self.knowledge_level
    }

    #[must_use]
    pub fn allowed_content_level(&self) -> ContentLevel {
        self.allowed_content_level
    }

    #[must_use]
    pub fn pre_test_score(&self) -> Option<i32> {
        self.pre_test_score
    }

    #[must_use]
    pub fn post_test_score(&self) -> Option<i32> {
        self.post_test_score
    }

    #[must_use]
    pub fn pre_test_passed(&self) -> bool {
        self.pre_test_passed
    }

    #[must_use]
    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    #[must_use]
    pub fn topic_scores(&self) -> &TopicScores {
        &self.topic_scores
    }

    #[must_use]
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }
}
