use learnmetrics_core::model::{
    Course, CourseId, Material, NewCourse, NewMaterial, NewQuestion, Question, Recommendation,
    TestKind,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{
    conn, course_id_from_i64, from_json, id_i64, map_material_row, map_question_row,
    material_id_from_i64, question_id_from_i64, ser, to_json,
};
use crate::repository::{CourseRepository, StorageError};

async fn insert_material(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
    material: &NewMaterial,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r"
        INSERT INTO materials (course_id, kind, title, url, duration, rating, level)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
    )
    .bind(course_id)
    .bind(material.kind.map(|k| k.as_str()))
    .bind(&material.title)
    .bind(&material.url)
    .bind(&material.duration)
    .bind(material.rating)
    .bind(material.level.map(|l| l.as_str()))
    .execute(&mut **tx)
    .await
    .map_err(conn)?;
    Ok(res.last_insert_rowid())
}

async fn insert_question(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
    kind: TestKind,
    question: &NewQuestion,
) -> Result<i64, StorageError> {
    let correct = i64::try_from(question.correct_answer)
        .map_err(|_| StorageError::Serialization("correct_answer overflow".into()))?;
    let res = sqlx::query(
        r"
        INSERT INTO questions (course_id, test_kind, question, options, correct_answer, difficulty, topic)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
    )
    .bind(course_id)
    .bind(kind.as_str())
    .bind(&question.question)
    .bind(to_json(&question.options)?)
    .bind(correct)
    .bind(&question.difficulty)
    .bind(&question.topic)
    .execute(&mut **tx)
    .await
    .map_err(conn)?;
    Ok(res.last_insert_rowid())
}

async fn course_exists(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
) -> Result<bool, StorageError> {
    let row = sqlx::query("SELECT 1 FROM courses WHERE id = ?1")
        .bind(course_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(conn)?;
    Ok(row.is_some())
}

impl SqliteRepository {
    async fn load_course(&self, row: &SqliteRow) -> Result<Course, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;

        let material_rows = sqlx::query(
            r"
            SELECT id, kind, title, url, duration, rating, level
            FROM materials
            WHERE course_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let materials = material_rows
            .iter()
            .map(map_material_row)
            .collect::<Result<Vec<Material>, _>>()?;

        let question_rows = sqlx::query(
            r"
            SELECT id, test_kind, question, options, correct_answer, difficulty, topic
            FROM questions
            WHERE course_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut pre: Vec<Question> = Vec::new();
        let mut post: Vec<Question> = Vec::new();
        for q in &question_rows {
            let kind: String = q.try_get("test_kind").map_err(ser)?;
            match kind.parse::<TestKind>().map_err(ser)? {
                TestKind::Pre => pre.push(map_question_row(q)?),
                TestKind::Post => post.push(map_question_row(q)?),
            }
        }

        let tags: String = row.try_get("tags").map_err(ser)?;
        let recommendations: String = row.try_get("recommendations").map_err(ser)?;

        Ok(Course::from_persisted(
            course_id_from_i64(id)?,
            row.try_get("title").map_err(ser)?,
            row.try_get("description").map_err(ser)?,
            from_json::<Vec<String>>(&tags)?,
            row.try_get("duration").map_err(ser)?,
            materials,
            pre,
            post,
            from_json::<Vec<Recommendation>>(&recommendations)?,
        ))
    }
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn insert_course(&self, course: NewCourse) -> Result<CourseId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO courses (title, description, tags, duration, recommendations)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(&course.title)
        .bind(&course.description)
        .bind(to_json(&course.tags)?)
        .bind(&course.duration)
        .bind(to_json(&course.recommendations)?)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let course_id = res.last_insert_rowid();

        for material in &course.materials {
            insert_material(&mut tx, course_id, material).await?;
        }
        for question in &course.pre_test_questions {
            insert_question(&mut tx, course_id, TestKind::Pre, question).await?;
        }
        for question in &course.post_test_questions {
            insert_question(&mut tx, course_id, TestKind::Post, question).await?;
        }

        tx.commit().await.map_err(conn)?;
        course_id_from_i64(course_id)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, tags, duration, recommendations
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => self.load_course(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, tags, duration, recommendations
            FROM courses
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in &rows {
            courses.push(self.load_course(row).await?);
        }
        Ok(courses)
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id_i64("course_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn add_material(
        &self,
        course_id: CourseId,
        material: NewMaterial,
    ) -> Result<Material, StorageError> {
        let course = id_i64("course_id", course_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;
        if !course_exists(&mut tx, course).await? {
            return Err(StorageError::NotFound);
        }
        let id = insert_material(&mut tx, course, &material).await?;
        tx.commit().await.map_err(conn)?;

        Ok(material.with_id(material_id_from_i64(id)?))
    }

    async fn add_question(
        &self,
        course_id: CourseId,
        kind: TestKind,
        question: NewQuestion,
    ) -> Result<Question, StorageError> {
        let course = id_i64("course_id", course_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;
        if !course_exists(&mut tx, course).await? {
            return Err(StorageError::NotFound);
        }
        let id = insert_question(&mut tx, course, kind, &question).await?;
        tx.commit().await.map_err(conn)?;

        Ok(question.with_id(question_id_from_i64(id)?))
    }
}
