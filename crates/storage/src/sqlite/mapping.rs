use chrono::{DateTime, Utc};
use learnmetrics_core::model::{
    ContentLevel, CourseId, KnowledgeLevel, Material, MaterialId, MaterialKind, Progress,
    ProgressStatus, Question, QuestionId, Role, TopicScores, User, UserId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn material_id_from_i64(v: i64) -> Result<MaterialId, StorageError> {
    Ok(MaterialId::new(i64_to_u64("material_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn score_from_i64(field: &'static str, v: Option<i64>) -> Result<Option<i32>, StorageError> {
    v.map(|s| {
        i32::try_from(s).map_err(|_| StorageError::Serialization(format!("invalid {field}: {s}")))
    })
    .transpose()
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    Ok(User::from_persisted(
        user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get("full_name").map_err(ser)?,
        row.try_get("email").map_err(ser)?,
        role.parse::<Role>().map_err(ser)?,
        row.try_get::<i64, _>("is_new_user").map_err(ser)? != 0,
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_material_row(row: &SqliteRow) -> Result<Material, StorageError> {
    let kind = row
        .try_get::<Option<String>, _>("kind")
        .map_err(ser)?
        .map(|k| k.parse::<MaterialKind>().map_err(ser))
        .transpose()?;
    let level = row
        .try_get::<Option<String>, _>("level")
        .map_err(ser)?
        .map(|l| l.parse::<ContentLevel>().map_err(ser))
        .transpose()?;

    Ok(Material {
        id: material_id_from_i64(row.try_get("id").map_err(ser)?)?,
        kind,
        title: row.try_get("title").map_err(ser)?,
        url: row.try_get("url").map_err(ser)?,
        duration: row.try_get("duration").map_err(ser)?,
        rating: row.try_get("rating").map_err(ser)?,
        level,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let options: String = row.try_get("options").map_err(ser)?;
    let correct: i64 = row.try_get("correct_answer").map_err(ser)?;
    let correct_answer = usize::try_from(correct)
        .map_err(|_| StorageError::Serialization(format!("invalid correct_answer: {correct}")))?;

    Ok(Question {
        id: question_id_from_i64(row.try_get("id").map_err(ser)?)?,
        question: row.try_get("question").map_err(ser)?,
        options: from_json(&options)?,
        correct_answer,
        difficulty: row.try_get("difficulty").map_err(ser)?,
        topic: row.try_get("topic").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    let knowledge_level = row
        .try_get::<Option<String>, _>("knowledge_level")
        .map_err(ser)?
        .map(|k| k.parse::<KnowledgeLevel>().map_err(ser))
        .transpose()?;
    let allowed: String = row.try_get("allowed_content_level").map_err(ser)?;
    let status: String = row.try_get("status").map_err(ser)?;
    let topic_scores: String = row.try_get("topic_scores").map_err(ser)?;

    Ok(Progress::from_persisted(
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        knowledge_level,
        allowed.parse::<ContentLevel>().map_err(ser)?,
        score_from_i64("pre_test_score", row.try_get("pre_test_score").map_err(ser)?)?,
        score_from_i64("post_test_score", row.try_get("post_test_score").map_err(ser)?)?,
        row.try_get::<i64, _>("pre_test_passed").map_err(ser)? != 0,
        status.parse::<ProgressStatus>().map_err(ser)?,
        from_json::<TopicScores>(&topic_scores)?,
        row.try_get("last_accessed").map_err(ser)?,
    ))
}
