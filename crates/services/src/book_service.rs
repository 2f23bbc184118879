use std::sync::Arc;

use quiz_core::model::{Book, BookId, BookMetadata, Section, UserId};
use storage::files::FileStore;
use storage::repository::{BookRepository, SectionRepository};
use tracing::instrument;

use crate::Clock;
use crate::error::BookServiceError;
use crate::pages::PageSource;

/// Uploads, lists and removes books and gives access to their pages.
#[derive(Clone)]
pub struct BookService {
    clock: Clock,
    books: Arc<dyn BookRepository>,
    sections: Arc<dyn SectionRepository>,
    files: Arc<dyn FileStore>,
    pages: Arc<dyn PageSource>,
}

/// Object-store URLs (`s3://bucket/key`) are reduced to their key.
#[must_use]
pub fn storage_key(path: &str) -> &str {
    match path.strip_prefix("s3://") {
        Some(rest) => rest.split_once('/').map_or(rest, |(_, key)| key),
        None => path,
    }
}

impl BookService {
    #[must_use]
    pub fn new(
        clock: Clock,
        books: Arc<dyn BookRepository>,
        sections: Arc<dyn SectionRepository>,
        files: Arc<dyn FileStore>,
        pages: Arc<dyn PageSource>,
    ) -> Self {
        Self {
            clock,
            books,
            sections,
            files,
            pages,
        }
    }

    /// Stores a new book file and its record.
    ///
    /// # Errors
    ///
    /// Returns `BookServiceError::DuplicateTitle` if the user already has a
    /// book with this title (nothing is written in that case), `Pages` if the
    /// file cannot be read and `Files`/`Storage` on write failures.
    #[instrument(skip(self, bytes), fields(%user_id, size = bytes.len()))]
    pub async fn upload_book(
        &self,
        bytes: Vec<u8>,
        title: &str,
        kind: &str,
        user_id: UserId,
    ) -> Result<Book, BookServiceError> {
        let title = title.trim();
        if self
            .books
            .find_book_by_title(user_id, title)
            .await?
            .is_some()
        {
            return Err(BookServiceError::DuplicateTitle(title.to_owned()));
        }

        let pages = self.pages.page_count(&bytes)?;
        let metadata = BookMetadata::new(pages, bytes.len());
        let key = format!("{user_id}/{title}_{}", uuid::Uuid::new_v4());
        let book = Book::new(user_id, title, kind, key.clone(), metadata, self.clock.now())?;

        self.files.put(&key, bytes).await?;
        self.books.upsert_book(&book).await?;
        tracing::info!(book_id = %book.id(), pages, "book uploaded");
        Ok(book)
    }

    /// Books of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `BookServiceError::Storage` on repository failures.
    pub async fn list_books(&self, user_id: UserId) -> Result<Vec<Book>, BookServiceError> {
        Ok(self.books.list_books(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `BookServiceError::NotFound` for an unknown book.
    pub async fn get_book(&self, book_id: BookId) -> Result<Book, BookServiceError> {
        self.books
            .get_book(book_id)
            .await?
            .ok_or(BookServiceError::NotFound(book_id))
    }

    /// Removes the stored file and then the book record.
    ///
    /// # Errors
    ///
    /// Returns `BookServiceError::NotFound` for an unknown book.
    #[instrument(skip(self), fields(%book_id))]
    pub async fn delete_book(&self, book_id: BookId) -> Result<(), BookServiceError> {
        let book = self.get_book(book_id).await?;
        if !self.files.delete(storage_key(book.storage_path())).await? {
            tracing::warn!(%book_id, "book file was already missing");
        }
        self.books.delete_book(book_id).await?;
        Ok(())
    }

    /// Raw bytes of the book file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book and `ContentMissing` when its
    /// file is gone.
    pub async fn book_content(&self, book_id: BookId) -> Result<Vec<u8>, BookServiceError> {
        let book = self.get_book(book_id).await?;
        self.files
            .get(storage_key(book.storage_path()))
            .await?
            .ok_or(BookServiceError::ContentMissing(book_id))
    }

    /// Records which file page holds page "1" of the book.
    ///
    /// # Errors
    ///
    /// Returns `BookServiceError::NotFound` for an unknown book.
    pub async fn set_first_page(
        &self,
        book_id: BookId,
        first_page: u32,
    ) -> Result<Book, BookServiceError> {
        let mut book = self.get_book(book_id).await?;
        book.set_first_page(first_page);
        self.books.upsert_book(&book).await?;
        Ok(book)
    }

    /// Sections of a book in order, optionally only those with questions.
    ///
    /// # Errors
    ///
    /// Returns `BookServiceError::NotFound` for an unknown book.
    pub async fn book_sections(
        &self,
        book_id: BookId,
        with_questions_only: bool,
    ) -> Result<Vec<Section>, BookServiceError> {
        self.get_book(book_id).await?;
        let mut sections = self.sections.list_sections(book_id).await?;
        if with_questions_only {
            sections.retain(|section| !section.questions().is_empty());
        }
        Ok(sections)
    }

    /// Text of file pages `start..=end` (0-based).
    ///
    /// # Errors
    ///
    /// Returns `BookServiceError::Pages` if the range cannot be read.
    pub fn pages_text(&self, bytes: &[u8], start: u32, end: u32) -> Result<String, BookServiceError> {
        Ok(self.pages.pages_text(bytes, start, end)?)
    }
}
