use std::sync::Arc;

use quiz_core::model::{
    BookId, DEFAULT_QUESTION_KIND, Question, QuestionId, Section, SectionId,
};
use storage::repository::SectionRepository;
use tracing::instrument;

use crate::Clock;
use crate::book_service::BookService;
use crate::error::SectionServiceError;
use crate::oracle::AuthoringOracles;

/// Arguments for building sections from a book's table of contents.
///
/// Page numbers are the book's own numbering except for the contents range,
/// which addresses file pages (0-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsLayout {
    pub example_titles: Vec<String>,
    /// File page (1-based) that carries the book's page "1".
    pub first_page: u32,
    /// Last book page that belongs to any section.
    pub content_end_page: u32,
    pub contents_start: u32,
    pub contents_end: u32,
}

/// Authoring of sections and their questions.
#[derive(Clone)]
pub struct SectionService {
    clock: Clock,
    books: Arc<BookService>,
    sections: Arc<dyn SectionRepository>,
    oracles: AuthoringOracles,
}

impl SectionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        books: Arc<BookService>,
        sections: Arc<dyn SectionRepository>,
        oracles: AuthoringOracles,
    ) -> Self {
        Self {
            clock,
            books,
            sections,
            oracles,
        }
    }

    /// # Errors
    ///
    /// Returns `SectionServiceError::Storage` on repository failures.
    pub async fn list_sections(&self, book_id: BookId) -> Result<Vec<Section>, SectionServiceError> {
        Ok(self.sections.list_sections(book_id).await?)
    }

    /// # Errors
    ///
    /// Returns `SectionServiceError::NotFound` for an unknown section.
    pub async fn get_section(&self, section_id: SectionId) -> Result<Section, SectionServiceError> {
        self.sections
            .get_section(section_id)
            .await?
            .ok_or(SectionServiceError::NotFound(section_id))
    }

    /// Text of book pages `start..=end`, read from the file using the book's
    /// first-page offset.
    fn section_text(
        &self,
        bytes: &[u8],
        first_page: u32,
        start: u32,
        end: u32,
    ) -> Result<String, SectionServiceError> {
        let from = (start + first_page)
            .checked_sub(2)
            .ok_or(SectionServiceError::PageOffset { page: start })?;
        match (end + first_page).checked_sub(3) {
            Some(to) => Ok(self.books.pages_text(bytes, from, to)?),
            None => Ok(String::new()),
        }
    }

    /// Builds sections from the book's table of contents with the section
    /// extractor, replacing nothing that already exists.
    ///
    /// # Errors
    ///
    /// Returns `SectionServiceError::Book` if the book or its file is missing,
    /// `Oracle` if extraction fails and `Pages` for unreadable page ranges.
    #[instrument(skip(self, layout), fields(%book_id))]
    pub async fn create_sections_from_contents(
        &self,
        book_id: BookId,
        layout: &ContentsLayout,
    ) -> Result<Vec<Section>, SectionServiceError> {
        let bytes = self.books.book_content(book_id).await?;
        let contents =
            self.books
                .pages_text(&bytes, layout.contents_start, layout.contents_end)?;

        let mut outlines = self
            .oracles
            .extractor
            .extract_sections(&contents, &layout.example_titles)
            .await?;
        outlines.retain(|outline| outline.page_number <= layout.content_end_page);
        outlines.sort_by_key(|outline| outline.page_number);

        self.books.set_first_page(book_id, layout.first_page).await?;

        let now = self.clock.now();
        let mut created = Vec::with_capacity(outlines.len());
        for (index, outline) in outlines.iter().enumerate() {
            let end = outlines
                .get(index + 1)
                .map_or(layout.content_end_page, |next| next.page_number);
            let text = self.section_text(&bytes, layout.first_page, outline.page_number, end)?;
            let order = u32::try_from(index + 1).unwrap_or(u32::MAX);
            created.push(Section::new(
                book_id,
                outline.title.as_str(),
                order,
                outline.page_number,
                end,
                Some(text),
                now,
            )?);
        }

        self.sections.upsert_sections(&created).await?;
        tracing::info!(%book_id, sections = created.len(), "sections created from contents");
        Ok(created)
    }

    /// Adds a section at `order`, shifting later sections down. `None` or an
    /// order past the last section appends.
    ///
    /// # Errors
    ///
    /// Returns `SectionServiceError::Book` if the book or its file is missing
    /// and `Section` for an invalid name or page range.
    #[instrument(skip(self, title), fields(%book_id))]
    pub async fn add_section(
        &self,
        book_id: BookId,
        start_page: u32,
        end_page: u32,
        title: &str,
        order: Option<u32>,
    ) -> Result<Section, SectionServiceError> {
        let book = self.books.get_book(book_id).await?;
        let bytes = self.books.book_content(book_id).await?;
        let first_page = book.first_page().unwrap_or(1);
        let text = self.section_text(&bytes, first_page, start_page, end_page)?;

        let mut existing = self.sections.list_sections(book_id).await?;
        let count = u32::try_from(existing.len()).unwrap_or(u32::MAX);
        let order = match order {
            Some(order) if order >= 1 && order < count => {
                let mut shifted = Vec::new();
                for section in &mut existing {
                    if section.order() >= order {
                        section.set_order(section.order() + 1)?;
                        shifted.push(section.clone());
                    }
                }
                self.sections.upsert_sections(&shifted).await?;
                order
            }
            _ => count + 1,
        };

        let section = Section::new(
            book_id,
            title,
            order,
            start_page,
            end_page,
            Some(text),
            self.clock.now(),
        )?;
        self.sections.upsert_section(&section).await?;
        Ok(section)
    }

    /// Renames a section and moves its page range. The text is re-read only
    /// when the pages change.
    ///
    /// # Errors
    ///
    /// Returns `SectionServiceError::NotFound` for an unknown section.
    #[instrument(skip(self, name), fields(%section_id))]
    pub async fn update_section(
        &self,
        section_id: SectionId,
        name: &str,
        start_page: u32,
        end_page: u32,
    ) -> Result<Section, SectionServiceError> {
        let mut section = self.get_section(section_id).await?;
        section.rename(name)?;
        if section.set_pages(start_page, end_page)? {
            let book = self.books.get_book(section.book_id()).await?;
            let bytes = self.books.book_content(book.id()).await?;
            let first_page = book.first_page().unwrap_or(1);
            let text = self.section_text(&bytes, first_page, start_page, end_page)?;
            section.set_text(Some(text));
        }
        self.sections.upsert_section(&section).await?;
        Ok(section)
    }

    /// Deletes a section and closes the gap in the order of its book.
    ///
    /// # Errors
    ///
    /// Returns `SectionServiceError::NotFound` for an unknown section.
    #[instrument(skip(self), fields(%section_id))]
    pub async fn delete_section(&self, section_id: SectionId) -> Result<(), SectionServiceError> {
        let section = self.get_section(section_id).await?;
        let book_sections = self.sections.list_sections(section.book_id()).await?;
        self.sections.delete_section(section_id).await?;

        let mut shifted = Vec::new();
        for mut other in book_sections {
            if other.id() != section_id && other.order() > section.order() {
                other.set_order(other.order() - 1)?;
                shifted.push(other);
            }
        }
        if !shifted.is_empty() {
            self.sections.upsert_sections(&shifted).await?;
        }
        Ok(())
    }

    /// Returns how many sections were removed.
    ///
    /// # Errors
    ///
    /// Returns `SectionServiceError::Storage` on repository failures.
    pub async fn delete_all_sections(&self, book_id: BookId) -> Result<u64, SectionServiceError> {
        Ok(self.sections.delete_sections_for_book(book_id).await?)
    }

    /// Asks the question generator for `count` questions about the section
    /// text and appends them to the section.
    ///
    /// # Errors
    ///
    /// Returns `SectionServiceError::MissingText` when the section has no text
    /// and `Oracle` when generation fails.
    #[instrument(skip(self), fields(%section_id))]
    pub async fn generate_questions(
        &self,
        section_id: SectionId,
        count: u32,
    ) -> Result<Vec<Question>, SectionServiceError> {
        let mut section = self.get_section(section_id).await?;
        let text = section
            .text()
            .filter(|text| !text.trim().is_empty())
            .ok_or(SectionServiceError::MissingText(section_id))?
            .to_owned();

        let generated = self
            .oracles
            .generator
            .generate_questions(&text, count)
            .await?;
        let mut created = Vec::with_capacity(generated.len());
        for text in generated {
            match Question::new(text, DEFAULT_QUESTION_KIND) {
                Ok(question) => created.push(question),
                Err(e) => tracing::warn!(%section_id, error = %e, "skipping generated question"),
            }
        }
        for question in &created {
            section.push_question(question.clone());
        }
        self.sections.upsert_section(&section).await?;
        tracing::info!(%section_id, questions = created.len(), "questions generated");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `SectionServiceError::NotFound` for an unknown section.
    pub async fn questions(&self, section_id: SectionId) -> Result<Vec<Question>, SectionServiceError> {
        Ok(self.get_section(section_id).await?.questions().to_vec())
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown section and `QuestionNotFound` when
    /// the section has no such question.
    pub async fn question(
        &self,
        section_id: SectionId,
        question_id: QuestionId,
    ) -> Result<Question, SectionServiceError> {
        self.get_section(section_id)
            .await?
            .question(question_id)
            .cloned()
            .ok_or(SectionServiceError::QuestionNotFound(question_id))
    }

    /// # Errors
    ///
    /// Returns `Question` for blank text and `NotFound` for an unknown section.
    pub async fn add_question(
        &self,
        section_id: SectionId,
        text: &str,
        kind: Option<&str>,
    ) -> Result<Question, SectionServiceError> {
        let mut section = self.get_section(section_id).await?;
        let question = Question::new(text, kind.unwrap_or(DEFAULT_QUESTION_KIND))?;
        section.push_question(question.clone());
        self.sections.upsert_section(&section).await?;
        Ok(question)
    }

    /// Replaces the text of a question and, when given, its kind.
    ///
    /// # Errors
    ///
    /// Returns `QuestionNotFound` when the section has no such question.
    pub async fn update_question(
        &self,
        section_id: SectionId,
        question_id: QuestionId,
        text: &str,
        kind: Option<&str>,
    ) -> Result<Question, SectionServiceError> {
        let mut section = self.get_section(section_id).await?;
        let current = section
            .question(question_id)
            .ok_or(SectionServiceError::QuestionNotFound(question_id))?;
        let mut updated = current.with_text(text)?;
        if let Some(kind) = kind {
            updated = updated.with_kind(kind);
        }
        section.replace_question(updated.clone());
        self.sections.upsert_section(&section).await?;
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `QuestionNotFound` when the section has no such question.
    pub async fn delete_question(
        &self,
        section_id: SectionId,
        question_id: QuestionId,
    ) -> Result<QuestionId, SectionServiceError> {
        let mut section = self.get_section(section_id).await?;
        section
            .remove_question(question_id)
            .ok_or(SectionServiceError::QuestionNotFound(question_id))?;
        self.sections.upsert_section(&section).await?;
        Ok(question_id)
    }

    /// Rewrites a question with the question improver, guided by `feedback`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionNotFound` when the section has no such question and
    /// `Oracle` when the improver fails.
    #[instrument(skip(self, feedback), fields(%section_id, %question_id))]
    pub async fn improve_question(
        &self,
        section_id: SectionId,
        question_id: QuestionId,
        feedback: &str,
    ) -> Result<Question, SectionServiceError> {
        let mut section = self.get_section(section_id).await?;
        let current = section
            .question(question_id)
            .ok_or(SectionServiceError::QuestionNotFound(question_id))?;
        let improved_text = self
            .oracles
            .improver
            .improve_question(current.text(), feedback)
            .await?;
        let improved = current.with_text(improved_text)?;
        section.replace_question(improved.clone());
        self.sections.upsert_section(&section).await?;
        Ok(improved)
    }

    /// # Errors
    ///
    /// Returns `QuestionNotFound` when no section owns the question.
    pub async fn section_by_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Section, SectionServiceError> {
        self.sections
            .find_section_by_question(question_id)
            .await?
            .ok_or(SectionServiceError::QuestionNotFound(question_id))
    }
}
