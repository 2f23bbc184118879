use quiz_core::model::{Book, BookId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, decode_document};
use crate::records::{BookRecord, to_document};
use crate::repository::{BookRepository, StorageError};

fn book_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Book, StorageError> {
    decode_document::<BookRecord>(row)?.into_book()
}

#[async_trait::async_trait]
impl BookRepository for SqliteRepository {
    async fn upsert_book(&self, book: &Book) -> Result<(), StorageError> {
        let document = to_document(&BookRecord::from_book(book))?;

        sqlx::query(
            r"
            INSERT INTO books (id, user_id, title, created_at, document)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                title = excluded.title,
                document = excluded.document
            ",
        )
        .bind(book.id().to_string())
        .bind(book.user_id().to_string())
        .bind(book.title())
        .bind(book.created_at())
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, StorageError> {
        let row = sqlx::query("SELECT document FROM books WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(book_from_row).transpose()
    }

    async fn list_books(&self, user_id: UserId) -> Result<Vec<Book>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT document FROM books
            WHERE user_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(book_from_row).collect()
    }

    async fn find_book_by_title(
        &self,
        user_id: UserId,
        title: &str,
    ) -> Result<Option<Book>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT document FROM books
            WHERE user_id = ?1 AND title = ?2
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(book_from_row).transpose()
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }
}
