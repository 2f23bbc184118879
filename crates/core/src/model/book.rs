use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{BookId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BookError {
    #[error("book title cannot be empty")]
    EmptyTitle,

    #[error("storage path cannot be empty")]
    EmptyStoragePath,
}

/// Size information captured at upload time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookMetadata {
    pub pages: u32,
    pub size_mb: f64,
}

impl BookMetadata {
    #[must_use]
    pub fn new(pages: u32, size_bytes: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
        Self { pages, size_mb }
    }
}

/// An uploaded document owned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    id: BookId,
    user_id: UserId,
    title: String,
    kind: String,
    storage_path: String,
    metadata: BookMetadata,
    first_page: Option<u32>,
    created_at: DateTime<Utc>,
}

impl Book {
    /// Creates a book record for a freshly uploaded file.
    ///
    /// # Errors
    ///
    /// Returns `BookError` if the title or storage path is blank.
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        kind: impl Into<String>,
        storage_path: impl Into<String>,
        metadata: BookMetadata,
        created_at: DateTime<Utc>,
    ) -> Result<Self, BookError> {
        Self::from_persisted(
            BookId::new_v4(),
            user_id,
            title,
            kind,
            storage_path,
            metadata,
            None,
            created_at,
        )
    }

    /// Rehydrates a book from storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`Book::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: BookId,
        user_id: UserId,
        title: impl Into<String>,
        kind: impl Into<String>,
        storage_path: impl Into<String>,
        metadata: BookMetadata,
        first_page: Option<u32>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, BookError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(BookError::EmptyTitle);
        }
        let storage_path = storage_path.into();
        if storage_path.trim().is_empty() {
            return Err(BookError::EmptyStoragePath);
        }
        Ok(Self {
            id,
            user_id,
            title,
            kind: kind.into(),
            storage_path,
            metadata,
            first_page,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> BookId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    #[must_use]
    pub fn metadata(&self) -> BookMetadata {
        self.metadata
    }

    /// File page index of the book's printed page 1, once known.
    #[must_use]
    pub fn first_page(&self) -> Option<u32> {
        self.first_page
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_first_page(&mut self, page: u32) {
        self.first_page = Some(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn metadata_reports_megabytes() {
        let meta = BookMetadata::new(12, 3 * 1024 * 1024);
        assert_eq!(meta.pages, 12);
        assert!((meta.size_mb - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_blank_title() {
        let err = Book::new(
            UserId::new_v4(),
            " ",
            "pdf",
            "u/x",
            BookMetadata::new(1, 1),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, BookError::EmptyTitle);
    }

    #[test]
    fn first_page_starts_unset() {
        let mut book = Book::new(
            UserId::new_v4(),
            "Physics",
            "pdf",
            "u/physics",
            BookMetadata::new(1, 1),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(book.first_page(), None);
        book.set_first_page(7);
        assert_eq!(book.first_page(), Some(7));
    }
}
