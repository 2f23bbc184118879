use async_trait::async_trait;
use quiz_core::model::{
    Book, BookId, ChatSession, ChatSessionId, QuestionId, Section, SectionId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Filter for listing stored chat sessions.
///
/// A session matches when it belongs to `user_id` and `book_id` and its scope
/// shares at least one section with `section_ids`. An empty `section_ids`
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    pub user_id: UserId,
    pub book_id: BookId,
    pub section_ids: Vec<SectionId>,
}

/// Repository contract for uploaded books.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert or replace a book.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the book cannot be stored.
    async fn upsert_book(&self, book: &Book) -> Result<(), StorageError>;

    /// Fetch a book by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_book(&self, id: BookId) -> Result<Option<Book>, StorageError>;

    /// List a user's books, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_books(&self, user_id: UserId) -> Result<Vec<Book>, StorageError>;

    /// Find a user's book by exact title.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn find_book_by_title(
        &self,
        user_id: UserId,
        title: &str,
    ) -> Result<Option<Book>, StorageError>;

    /// Delete a book. Returns `true` when a record was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn delete_book(&self, id: BookId) -> Result<bool, StorageError>;
}

/// Repository contract for sections and the questions nested inside them.
#[async_trait]
pub trait SectionRepository: Send + Sync {
    /// Insert or replace a section, including its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the section cannot be stored.
    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError>;

    /// Insert or replace several sections at once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any section cannot be stored.
    async fn upsert_sections(&self, sections: &[Section]) -> Result<(), StorageError>;

    /// Fetch a section by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_section(&self, id: SectionId) -> Result<Option<Section>, StorageError>;

    /// List the sections of a book ordered by their position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_sections(&self, book_id: BookId) -> Result<Vec<Section>, StorageError>;

    /// Find the section that owns a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn find_section_by_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<Section>, StorageError>;

    /// Delete a section. Returns `true` when a record was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn delete_section(&self, id: SectionId) -> Result<bool, StorageError>;

    /// Delete every section of a book, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn delete_sections_for_book(&self, book_id: BookId) -> Result<u64, StorageError>;
}

/// Repository contract for finished chat sessions.
#[async_trait]
pub trait ChatSessionRepository: Send + Sync {
    /// Insert or replace a session keyed by its ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn save_session(&self, session: &ChatSession) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_session(&self, id: ChatSessionId) -> Result<Option<ChatSession>, StorageError>;

    /// List matching sessions newest first (`created_at` desc, then id desc).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_sessions(
        &self,
        filter: &SessionFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatSession>, StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    books: Arc<Mutex<HashMap<BookId, Book>>>,
    sections: Arc<Mutex<HashMap<SectionId, Section>>>,
    sessions: Arc<Mutex<HashMap<ChatSessionId, ChatSession>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryRepository {
    async fn upsert_book(&self, book: &Book) -> Result<(), StorageError> {
        let mut guard = self.books.lock().map_err(poisoned)?;
        guard.insert(book.id(), book.clone());
        Ok(())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, StorageError> {
        let guard = self.books.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_books(&self, user_id: UserId) -> Result<Vec<Book>, StorageError> {
        let guard = self.books.lock().map_err(poisoned)?;
        let mut books: Vec<Book> = guard
            .values()
            .filter(|b| b.user_id() == user_id)
            .cloned()
            .collect();
        books.sort_by_key(|b| (b.created_at(), b.id()));
        Ok(books)
    }

    async fn find_book_by_title(
        &self,
        user_id: UserId,
        title: &str,
    ) -> Result<Option<Book>, StorageError> {
        let guard = self.books.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .find(|b| b.user_id() == user_id && b.title() == title)
            .cloned())
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, StorageError> {
        let mut guard = self.books.lock().map_err(poisoned)?;
        Ok(guard.remove(&id).is_some())
    }
}

#[async_trait]
impl SectionRepository for InMemoryRepository {
    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        let mut guard = self.sections.lock().map_err(poisoned)?;
        guard.insert(section.id(), section.clone());
        Ok(())
    }

    async fn upsert_sections(&self, sections: &[Section]) -> Result<(), StorageError> {
        let mut guard = self.sections.lock().map_err(poisoned)?;
        for section in sections {
            guard.insert(section.id(), section.clone());
        }
        Ok(())
    }

    async fn get_section(&self, id: SectionId) -> Result<Option<Section>, StorageError> {
        let guard = self.sections.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_sections(&self, book_id: BookId) -> Result<Vec<Section>, StorageError> {
        let guard = self.sections.lock().map_err(poisoned)?;
        let mut sections: Vec<Section> = guard
            .values()
            .filter(|s| s.book_id() == book_id)
            .cloned()
            .collect();
        sections.sort_by_key(|s| (s.order(), s.created_at(), s.id()));
        Ok(sections)
    }

    async fn find_section_by_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<Section>, StorageError> {
        let guard = self.sections.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .find(|s| s.contains_question(question_id))
            .cloned())
    }

    async fn delete_section(&self, id: SectionId) -> Result<bool, StorageError> {
        let mut guard = self.sections.lock().map_err(poisoned)?;
        Ok(guard.remove(&id).is_some())
    }

    async fn delete_sections_for_book(&self, book_id: BookId) -> Result<u64, StorageError> {
        let mut guard = self.sections.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|_, s| s.book_id() != book_id);
        Ok((before - guard.len()) as u64)
    }
}

#[async_trait]
impl ChatSessionRepository for InMemoryRepository {
    async fn save_session(&self, session: &ChatSession) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: ChatSessionId) -> Result<Option<ChatSession>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatSession>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        let mut matching: Vec<&ChatSession> = guard
            .values()
            .filter(|s| {
                s.user_id() == filter.user_id
                    && s.book_id() == filter.book_id
                    && s.covers_any(&filter.section_ids)
            })
            .collect();
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub books: Arc<dyn BookRepository>,
    pub sections: Arc<dyn SectionRepository>,
    pub sessions: Arc<dyn ChatSessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            books: Arc::new(repo.clone()),
            sections: Arc::new(repo.clone()),
            sessions: Arc::new(repo),
        }
    }
}
