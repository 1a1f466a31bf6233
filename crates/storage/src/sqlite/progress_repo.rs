use learnmetrics_core::model::{CourseId, Progress, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_progress_row, to_json};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    user_id, course_id, knowledge_level, allowed_content_level,
    pre_test_score, post_test_score, pre_test_passed, status,
    topic_scores, last_accessed
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Progress>, StorageError> {
        let sql =
            format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1 AND course_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(id_i64("course_id", course_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1 ORDER BY course_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn list_all_progress(&self) -> Result<Vec<Progress>, StorageError> {
        let sql =
            format!("SELECT {PROGRESS_COLUMNS} FROM progress ORDER BY user_id ASC, course_id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (
                user_id, course_id, knowledge_level, allowed_content_level,
                pre_test_score, post_test_score, pre_test_passed, status,
                topic_scores, last_accessed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                knowledge_level = excluded.knowledge_level,
                allowed_content_level = excluded.allowed_content_level,
                pre_test_score = excluded.pre_test_score,
                post_test_score = excluded.post_test_score,
                pre_test_passed = excluded.pre_test_passed,
                status = excluded.status,
                topic_scores = excluded.topic_scores,
                last_accessed = excluded.last_accessed
            ",
        )
        .bind(id_i64("user_id", progress.user_id().value())?)
        .bind(id_i64("course_id", progress.course_id().value())?)
        .bind(progress.knowledge_level().map(|k| k.as_str()))
        .bind(progress.allowed_content_level().as_str())
        .bind(progress.pre_test_score().map(i64::from))
        .bind(progress.post_test_score().map(i64::from))
        .bind(i64::from(progress.pre_test_passed()))
        .bind(progress.status().as_str())
        .bind(to_json(progress.topic_scores())?)
        .bind(progress.last_accessed())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            other => conn(other),
        })?;

        Ok(())
    }
}
