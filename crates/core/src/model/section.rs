use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{BookId, QuestionId, SectionId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionError {
    #[error("section name cannot be empty")]
    EmptyName,

    #[error("section order must be >= 1")]
    InvalidOrder,

    #[error("start page ({start}) is after end page ({end})")]
    InvalidPageRange { start: u32, end: u32 },
}

//
// ─── REFERENCE ─────────────────────────────────────────────────────────────────
//

/// Section text used as grounding material for evaluating answers and
/// generating explanations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReference {
    pub section_id: SectionId,
    pub text: String,
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// A titled page range of a book together with its extracted text and the
/// questions authored for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    id: SectionId,
    book_id: BookId,
    name: String,
    order: u32,
    start_page: u32,
    end_page: u32,
    text: Option<String>,
    questions: Vec<Question>,
    created_at: DateTime<Utc>,
}

impl Section {
    /// Creates a section without questions.
    ///
    /// # Errors
    ///
    /// Returns `SectionError` if the name is blank, the order is zero or the
    /// page range is inverted.
    pub fn new(
        book_id: BookId,
        name: impl Into<String>,
        order: u32,
        start_page: u32,
        end_page: u32,
        text: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SectionError> {
        Self::from_persisted(
            SectionId::new_v4(),
            book_id,
            name,
            order,
            start_page,
            end_page,
            text,
            Vec::new(),
            created_at,
        )
    }

    /// Rehydrates a section from storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`Section::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SectionId,
        book_id: BookId,
        name: impl Into<String>,
        order: u32,
        start_page: u32,
        end_page: u32,
        text: Option<String>,
        questions: Vec<Question>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SectionError> {
        let name = validate_name(name.into())?;
        if order == 0 {
            return Err(SectionError::InvalidOrder);
        }
        validate_pages(start_page, end_page)?;
        Ok(Self {
            id,
            book_id,
            name,
            order,
            start_page,
            end_page,
            text,
            questions,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    #[must_use]
    pub fn end_page(&self) -> u32 {
        self.end_page
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Human readable title, e.g. `"3. Newton's Laws"`.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{}. {}", self.order, self.name)
    }

    #[must_use]
    pub fn reference(&self) -> SectionReference {
        SectionReference {
            section_id: self.id,
            text: self.text.clone().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn contains_question(&self, id: QuestionId) -> bool {
        self.question(id).is_some()
    }

    pub fn push_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    /// Replaces the question with the same id. Returns `false` when absent.
    pub fn replace_question(&mut self, question: Question) -> bool {
        match self.questions.iter_mut().find(|q| q.id() == question.id()) {
            Some(slot) => {
                *slot = question;
                true
            }
            None => false,
        }
    }

    /// Removes a question by id, returning it if present.
    pub fn remove_question(&mut self, id: QuestionId) -> Option<Question> {
        let idx = self.questions.iter().position(|q| q.id() == id)?;
        Some(self.questions.remove(idx))
    }

    /// Renames the section.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::EmptyName` if `name` is blank.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), SectionError> {
        self.name = validate_name(name.into())?;
        Ok(())
    }

    /// Moves the section to a new page range. Returns `true` when the range changed.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::InvalidPageRange` if `start_page > end_page`.
    pub fn set_pages(&mut self, start_page: u32, end_page: u32) -> Result<bool, SectionError> {
        validate_pages(start_page, end_page)?;
        let changed = self.start_page != start_page || self.end_page != end_page;
        self.start_page = start_page;
        self.end_page = end_page;
        Ok(changed)
    }

    /// Sets the 1-based position of the section within its book.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::InvalidOrder` for zero.
    pub fn set_order(&mut self, order: u32) -> Result<(), SectionError> {
        if order == 0 {
            return Err(SectionError::InvalidOrder);
        }
        self.order = order;
        Ok(())
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }
}

fn validate_name(name: String) -> Result<String, SectionError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SectionError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

fn validate_pages(start: u32, end: u32) -> Result<(), SectionError> {
    if start > end {
        return Err(SectionError::InvalidPageRange { start, end });
    }
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_section() -> Section {
        Section::new(
            BookId::new_v4(),
            "Forces",
            2,
            10,
            20,
            Some("Forces cause acceleration.".into()),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn title_includes_order() {
        assert_eq!(build_section().title(), "2. Forces");
    }

    #[test]
    fn rejects_inverted_pages() {
        let err = Section::new(BookId::new_v4(), "X", 1, 5, 4, None, fixed_now()).unwrap_err();
        assert_eq!(err, SectionError::InvalidPageRange { start: 5, end: 4 });
    }

    #[test]
    fn rejects_zero_order_and_blank_name() {
        let book = BookId::new_v4();
        assert_eq!(
            Section::new(book, "X", 0, 1, 1, None, fixed_now()).unwrap_err(),
            SectionError::InvalidOrder
        );
        assert_eq!(
            Section::new(book, "  ", 1, 1, 1, None, fixed_now()).unwrap_err(),
            SectionError::EmptyName
        );
    }

    #[test]
    fn reference_defaults_to_empty_text() {
        let mut section = build_section();
        section.set_text(None);
        let reference = section.reference();
        assert_eq!(reference.section_id, section.id());
        assert!(reference.text.is_empty());
    }

    #[test]
    fn question_edits_are_by_id() {
        let mut section = build_section();
        let q = Question::new("What is a force?", "general").unwrap();
        section.push_question(q.clone());
        assert!(section.contains_question(q.id()));

        let edited = q.with_text("What is a net force?").unwrap();
        assert!(section.replace_question(edited));
        assert_eq!(section.question(q.id()).unwrap().text(), "What is a net force?");

        let removed = section.remove_question(q.id()).unwrap();
        assert_eq!(removed.id(), q.id());
        assert!(section.questions().is_empty());
        assert!(!section.replace_question(removed));
    }

    #[test]
    fn set_pages_reports_change() {
        let mut section = build_section();
        assert!(!section.set_pages(10, 20).unwrap());
        assert!(section.set_pages(11, 20).unwrap());
    }
}
