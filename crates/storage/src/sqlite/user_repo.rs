use learnmetrics_core::model::{NewUser, User, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_user_row, user_id_from_i64};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (full_name, email, role, is_new_user, created_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ",
        )
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => conn(other),
        })?;

        let id = user_id_from_i64(res.last_insert_rowid())?;
        Ok(user.with_id(id))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, full_name, email, role, is_new_user, created_at
            FROM users WHERE id = ?1
            ",
        )
        .bind(id_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, full_name, email, role, is_new_user, created_at
            FROM users
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_user_row).collect()
    }

    async fn mark_returning(&self, id: UserId) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE users SET is_new_user = 0 WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
