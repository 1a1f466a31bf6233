pub mod course;
mod ids;
mod level;
mod progress;
mod user;

pub use ids::{CourseId, MaterialId, ParseIdError, QuestionId, UserId};
pub use level::{ContentLevel, KnowledgeLevel, LevelError};

pub use course::{
    Course, CourseDraft, CourseError, Material, MaterialDraft, MaterialKind, NewCourse,
    NewMaterial, NewQuestion, Question, QuestionDraft, Recommendation, DEFAULT_TOPIC,
};
pub use progress::{
    Progress, ProgressError, ProgressStatus, TestKind, TopicScore, TopicScorePatch, TopicScores,
};
pub use user::{NewUser, Role, User, UserDraft, UserError};
