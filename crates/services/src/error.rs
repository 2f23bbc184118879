//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{BookError, BookId, QuestionError, QuestionId, SectionError, SectionId};
use storage::files::FileStoreError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by oracle adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OracleError {
    #[error("oracle is not configured")]
    Disabled,
    #[error("oracle request timed out")]
    Timeout,
    #[error("oracle request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(reqwest::Error),
    #[error("oracle returned an empty response")]
    EmptyResponse,
    #[error("oracle returned malformed output: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

/// Errors emitted by page extraction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PageError {
    #[error("document is not valid UTF-8 text")]
    Encoding,
    #[error("page {page} is out of range (document has {count} pages)")]
    OutOfRange { page: u32, count: u32 },
}

/// Errors emitted by `ChatService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatError {
    #[error("section {0} not found")]
    SectionNotFound(SectionId),
    #[error("no section owns question {0}")]
    QuestionNotFound(QuestionId),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BookService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookServiceError {
    #[error("a book titled {0:?} already exists")]
    DuplicateTitle(String),
    #[error("book {0} not found")]
    NotFound(BookId),
    #[error("content of book {0} is missing")]
    ContentMissing(BookId),
    #[error(transparent)]
    Book(#[from] BookError),
    #[error(transparent)]
    Pages(#[from] PageError),
    #[error(transparent)]
    Files(#[from] FileStoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SectionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SectionServiceError {
    #[error("section {0} not found")]
    NotFound(SectionId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("section {0} has no text")]
    MissingText(SectionId),
    #[error("page {page} cannot be mapped into the book file")]
    PageOffset { page: u32 },
    #[error(transparent)]
    Book(#[from] BookServiceError),
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Pages(#[from] PageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("oracle client could not be built: {0}")]
    Oracle(String),
}
