use quiz_core::model::{BookId, QuestionId, Section, SectionId};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, decode_document};
use crate::records::{SectionRecord, to_document};
use crate::repository::{SectionRepository, StorageError};

fn section_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Section, StorageError> {
    decode_document::<SectionRecord>(row)?.into_section()
}

/// Writes a section row and rebuilds its question index inside `tx`.
async fn write_section(
    tx: &mut Transaction<'_, Sqlite>,
    section: &Section,
) -> Result<(), StorageError> {
    let id = section.id().to_string();
    let document = to_document(&SectionRecord::from_section(section))?;

    sqlx::query(
        r"
        INSERT INTO sections (id, book_id, ord, created_at, document)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            book_id = excluded.book_id,
            ord = excluded.ord,
            document = excluded.document
        ",
    )
    .bind(&id)
    .bind(section.book_id().to_string())
    .bind(i64::from(section.order()))
    .bind(section.created_at())
    .bind(document)
    .execute(&mut **tx)
    .await
    .map_err(conn)?;

    sqlx::query("DELETE FROM section_questions WHERE section_id = ?1")
        .bind(&id)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;

    for question in section.questions() {
        sqlx::query(
            r"
            INSERT INTO section_questions (question_id, section_id)
            VALUES (?1, ?2)
            ON CONFLICT(question_id) DO UPDATE SET section_id = excluded.section_id
            ",
        )
        .bind(question.id().to_string())
        .bind(&id)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }

    Ok(())
}

#[async_trait::async_trait]
impl SectionRepository for SqliteRepository {
    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        write_section(&mut tx, section).await?;
        tx.commit().await.map_err(conn)
    }

    async fn upsert_sections(&self, sections: &[Section]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for section in sections {
            write_section(&mut tx, section).await?;
        }
        tx.commit().await.map_err(conn)
    }

    async fn get_section(&self, id: SectionId) -> Result<Option<Section>, StorageError> {
        let row = sqlx::query("SELECT document FROM sections WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(section_from_row).transpose()
    }

    async fn list_sections(&self, book_id: BookId) -> Result<Vec<Section>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT document FROM sections
            WHERE book_id = ?1
            ORDER BY ord ASC, created_at ASC, id ASC
            ",
        )
        .bind(book_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(section_from_row).collect()
    }

    async fn find_section_by_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<Section>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT s.document FROM sections s
            JOIN section_questions q ON q.section_id = s.id
            WHERE q.question_id = ?1
            ",
        )
        .bind(question_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(section_from_row).transpose()
    }

    async fn delete_section(&self, id: SectionId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM sections WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_sections_for_book(&self, book_id: BookId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM sections WHERE book_id = ?1")
            .bind(book_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
