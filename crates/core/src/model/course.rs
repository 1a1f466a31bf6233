use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CourseId, MaterialId, QuestionId};
use crate::model::level::ContentLevel;
use crate::model::progress::TestKind;

/// Topic used when a question carries none.
pub const DEFAULT_TOPIC: &str = "General";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("material title cannot be empty")]
    EmptyMaterialTitle,

    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("question needs at least one option")]
    NoOptions,

    #[error("correct answer index {index} is out of range for {options} options")]
    CorrectAnswerOutOfRange { index: usize, options: usize },

    #[error("unknown material type: {0}")]
    UnknownMaterialKind(String),
}

//
// ─── MATERIALS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Video,
    Doc,
    Website,
    Udemy,
    Coursera,
    Youtube,
    Pdf,
}

impl MaterialKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Video => "video",
            MaterialKind::Doc => "doc",
            MaterialKind::Website => "website",
            MaterialKind::Udemy => "udemy",
            MaterialKind::Coursera => "coursera",
            MaterialKind::Youtube => "youtube",
            MaterialKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialKind {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "doc" => Ok(Self::Doc),
            "website" => Ok(Self::Website),
            "udemy" => Ok(Self::Udemy),
            "coursera" => Ok(Self::Coursera),
            "youtube" => Ok(Self::Youtube),
            "pdf" => Ok(Self::Pdf),
            other => Err(CourseError::UnknownMaterialKind(other.to_owned())),
        }
    }
}

/// A study resource attached to a course.
///
/// `level` is only a filter key. `None` marks an untagged material, which is
/// visible at every tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: MaterialId,
    pub kind: Option<MaterialKind>,
    pub title: String,
    pub url: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<f64>,
    pub level: Option<ContentLevel>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialDraft {
    pub kind: Option<MaterialKind>,
    pub title: String,
    pub url: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<f64>,
    pub level: Option<ContentLevel>,
}

/// Validated material, ready to be assigned an id by storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMaterial {
    pub kind: Option<MaterialKind>,
    pub title: String,
    pub url: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<f64>,
    pub level: Option<ContentLevel>,
}

impl MaterialDraft {
    /// Validate the draft. A missing level becomes `basic`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyMaterialTitle` if the title is blank.
    pub fn validate(self) -> Result<NewMaterial, CourseError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(CourseError::EmptyMaterialTitle);
        }
        Ok(NewMaterial {
            kind: self.kind,
            title,
            url: self.url,
            duration: self.duration,
            rating: self.rating,
            level: Some(self.level.unwrap_or_default()),
        })
    }
}

impl NewMaterial {
    #[must_use]
    pub fn with_id(self, id: MaterialId) -> Material {
        Material {
            id,
            kind: self.kind,
            title: self.title,
            url: self.url,
            duration: self.duration,
            rating: self.rating,
            level: self.level,
        }
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// Multiple-choice question; `correct_answer` indexes into `options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub difficulty: Option<String>,
    pub topic: Option<String>,
}

impl Question {
    #[must_use]
    pub fn topic_or_default(&self) -> &str {
        match self.topic.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_TOPIC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionDraft {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub difficulty: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub difficulty: Option<String>,
    pub topic: Option<String>,
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `CourseError` if the text is blank, there are no options, or
    /// the correct answer does not point at an option.
    pub fn validate(self) -> Result<NewQuestion, CourseError> {
        let question = self.question.trim().to_owned();
        if question.is_empty() {
            return Err(CourseError::EmptyQuestion);
        }
        if self.options.is_empty() {
            return Err(CourseError::NoOptions);
        }
        if self.correct_answer >= self.options.len() {
            return Err(CourseError::CorrectAnswerOutOfRange {
                index: self.correct_answer,
                options: self.options.len(),
            });
        }
        Ok(NewQuestion {
            question,
            options: self.options,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty,
            topic: self.topic,
        })
    }
}

impl NewQuestion {
    #[must_use]
    pub fn with_id(self, id: QuestionId) -> Question {
        Question {
            id,
            question: self.question,
            options: self.options,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty,
            topic: self.topic,
        }
    }
}

//
// ─── RECOMMENDATIONS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub efficiency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration: Option<String>,
    pub materials: Vec<MaterialDraft>,
    pub pre_test_questions: Vec<QuestionDraft>,
    pub post_test_questions: Vec<QuestionDraft>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration: Option<String>,
    pub materials: Vec<NewMaterial>,
    pub pre_test_questions: Vec<NewQuestion>,
    pub post_test_questions: Vec<NewQuestion>,
    pub recommendations: Vec<Recommendation>,
}

impl CourseDraft {
    /// Validate the course and everything nested in it.
    ///
    /// # Errors
    ///
    /// Returns the first `CourseError` encountered.
    pub fn validate(self) -> Result<NewCourse, CourseError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        let materials = self
            .materials
            .into_iter()
            .map(MaterialDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        let pre_test_questions = self
            .pre_test_questions
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        let post_test_questions = self
            .post_test_questions
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewCourse {
            title,
            description: self.description,
            tags: self.tags,
            duration: self.duration,
            materials,
            pre_test_questions,
            post_test_questions,
            recommendations: self.recommendations,
        })
    }
}

/// A course with its material list and both question banks.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    tags: Vec<String>,
    duration: Option<String>,
    materials: Vec<Material>,
    pre_test_questions: Vec<Question>,
    post_test_questions: Vec<Question>,
    recommendations: Vec<Recommendation>,
}

impl Course {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: CourseId,
        title: String,
        description: Option<String>,
        tags: Vec<String>,
        duration: Option<String>,
        materials: Vec<Material>,
        pre_test_questions: Vec<Question>,
        post_test_questions: Vec<Question>,
        recommendations: Vec<Recommendation>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            tags,
            duration,
            materials,
            pre_test_questions,
            post_test_questions,
            recommendations,
        }
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    #[must_use]
    pub fn questions(&self, kind: TestKind) -> &[Question] {
        match kind {
            TestKind::Pre => &self.pre_test_questions,
            TestKind::Post => &self.post_test_questions,
        }
    }

    #[must_use]
    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    /// Size of the larger of the two question banks.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.pre_test_questions
            .len()
            .max(self.post_test_questions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: usize) -> QuestionDraft {
        QuestionDraft {
            question: "What is a closure?".into(),
            options: vec!["A function".into(), "A loop".into()],
            correct_answer: correct,
            difficulty: None,
            topic: Some("JavaScript".into()),
        }
    }

    #[test]
    fn material_without_level_defaults_to_basic() {
        let material = MaterialDraft {
            title: "  Intro video ".into(),
            ..MaterialDraft::default()
        }
        .validate()
        .unwrap();
        assert_eq!(material.title, "Intro video");
        assert_eq!(material.level, Some(ContentLevel::Basic));
    }

    #[test]
    fn material_requires_title() {
        let err = MaterialDraft::default().validate().unwrap_err();
        assert_eq!(err, CourseError::EmptyMaterialTitle);
    }

    #[test]
    fn question_answer_must_index_an_option() {
        assert!(question(1).validate().is_ok());
        let err = question(2).validate().unwrap_err();
        assert_eq!(
            err,
            CourseError::CorrectAnswerOutOfRange {
                index: 2,
                options: 2
            }
        );
    }

    #[test]
    fn course_draft_validates_nested_items() {
        let draft = CourseDraft {
            title: "JavaScript".into(),
            pre_test_questions: vec![question(0), question(5)],
            ..CourseDraft::default()
        };
        assert!(matches!(
            draft.validate(),
            Err(CourseError::CorrectAnswerOutOfRange { .. })
        ));

        let blank = CourseDraft {
            title: "   ".into(),
            ..CourseDraft::default()
        };
        assert_eq!(blank.validate().unwrap_err(), CourseError::EmptyTitle);
    }

    #[test]
    fn total_questions_is_larger_bank() {
        let q = |id| question(0).validate().unwrap().with_id(QuestionId::new(id));
        let course = Course::from_persisted(
            CourseId::new(1),
            "JS".into(),
            None,
            vec![],
            None,
            vec![],
            vec![q(1)],
            vec![q(2), q(3), q(4)],
            vec![],
        );
        assert_eq!(course.total_questions(), 3);
        assert_eq!(course.questions(TestKind::Pre).len(), 1);
    }

    #[test]
    fn blank_topic_falls_back_to_general() {
        let mut q = question(0).validate().unwrap().with_id(QuestionId::new(1));
        q.topic = Some(" ".into());
        assert_eq!(q.topic_or_default(), DEFAULT_TOPIC);
    }
}
