use std::path::Path;
use std::sync::Arc;

use storage::files::{FileStore, LocalFileStore};
use storage::repository::Storage;

use crate::Clock;
use crate::book_service::BookService;
use crate::chat::ChatService;
use crate::error::AppServicesError;
use crate::llm::LlmOracle;
use crate::oracle::{AuthoringOracles, ChatOracles};
use crate::pages::{FormFeedPages, PageSource};
use crate::section_service::SectionService;

/// Assembles app-facing services around one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    chat_oracles: ChatOracles,
    book_service: Arc<BookService>,
    section_service: Arc<SectionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, files under `files_dir` and
    /// the LLM oracle configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// oracle client cannot be built.
    pub async fn new_sqlite(
        db_url: &str,
        files_dir: &Path,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(files_dir));
        let oracle =
            Arc::new(LlmOracle::from_env().map_err(|e| AppServicesError::Oracle(e.to_string()))?);
        if !oracle.enabled() {
            tracing::warn!("QUIZ_AI_API_KEY is not set; oracle calls will fail");
        }
        Ok(Self::with_parts(
            clock,
            storage,
            files,
            Arc::new(FormFeedPages),
            ChatOracles::from_shared(Arc::clone(&oracle)),
            AuthoringOracles::from_shared(oracle),
        ))
    }

    /// Wires services from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        clock: Clock,
        storage: Storage,
        files: Arc<dyn FileStore>,
        pages: Arc<dyn PageSource>,
        chat_oracles: ChatOracles,
        authoring_oracles: AuthoringOracles,
    ) -> Self {
        let book_service = Arc::new(BookService::new(
            clock,
            Arc::clone(&storage.books),
            Arc::clone(&storage.sections),
            files,
            pages,
        ));
        let section_service = Arc::new(SectionService::new(
            clock,
            Arc::clone(&book_service),
            Arc::clone(&storage.sections),
            authoring_oracles,
        ));
        Self {
            clock,
            storage,
            chat_oracles,
            book_service,
            section_service,
        }
    }

    /// A fresh chat service; each user drives their own.
    #[must_use]
    pub fn chat_service(&self) -> ChatService {
        ChatService::new(
            self.clock,
            Arc::clone(&self.storage.sections),
            Arc::clone(&self.storage.sessions),
            self.chat_oracles.clone(),
        )
    }

    #[must_use]
    pub fn book_service(&self) -> Arc<BookService> {
        Arc::clone(&self.book_service)
    }

    #[must_use]
    pub fn section_service(&self) -> Arc<SectionService> {
        Arc::clone(&self.section_service)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}
