use quiz_core::model::{ChatSession, ChatSessionId};

use super::SqliteRepository;
use super::mapping::{conn, decode_document, placeholders};
use crate::records::{ChatSessionRecord, to_document};
use crate::repository::{ChatSessionRepository, SessionFilter, StorageError};

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatSession, StorageError> {
    decode_document::<ChatSessionRecord>(row)?.into_session()
}

#[async_trait::async_trait]
impl ChatSessionRepository for SqliteRepository {
    async fn save_session(&self, session: &ChatSession) -> Result<(), StorageError> {
        let id = session.id().to_string();
        let document = to_document(&ChatSessionRecord::from_session(session))?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO chat_sessions (id, user_id, book_id, created_at, document)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                document = excluded.document
            ",
        )
        .bind(&id)
        .bind(session.user_id().to_string())
        .bind(session.book_id().to_string())
        .bind(session.created_at())
        .bind(document)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM chat_session_sections WHERE session_id = ?1")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for section_id in session.section_ids() {
            sqlx::query(
                r"
                INSERT INTO chat_session_sections (session_id, section_id)
                VALUES (?1, ?2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(&id)
            .bind(section_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)
    }

    async fn get_session(&self, id: ChatSessionId) -> Result<Option<ChatSession>, StorageError> {
        let row = sqlx::query("SELECT document FROM chat_sessions WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatSession>, StorageError> {
        if filter.section_ids.is_empty() {
            return Ok(Vec::new());
        }

        let count = filter.section_ids.len();
        let sql = format!(
            r"
            SELECT s.document FROM chat_sessions s
            WHERE s.user_id = ?1 AND s.book_id = ?2
              AND EXISTS (
                SELECT 1 FROM chat_session_sections c
                WHERE c.session_id = s.id AND c.section_id IN ({})
              )
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT ?{} OFFSET ?{}
            ",
            placeholders(3, count),
            count + 3,
            count + 4,
        );

        let mut query = sqlx::query(&sql)
            .bind(filter.user_id.to_string())
            .bind(filter.book_id.to_string());
        for section_id in &filter.section_ids {
            query = query.bind(section_id.to_string());
        }
        let rows = query
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(session_from_row).collect()
    }
}
