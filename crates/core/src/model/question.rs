use thiserror::Error;

use crate::model::ids::QuestionId;

/// Type tag applied to questions produced by the question generator.
pub const DEFAULT_QUESTION_KIND: &str = "general";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,
}

/// A comprehension question attached to a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    kind: String,
}

impl Question {
    /// Creates a question with a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    pub fn new(text: impl Into<String>, kind: impl Into<String>) -> Result<Self, QuestionError> {
        Self::from_persisted(QuestionId::new_v4(), text, kind)
    }

    /// Rehydrates a question from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    pub fn from_persisted(
        id: QuestionId,
        text: impl Into<String>,
        kind: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = normalize_text(text.into())?;
        let kind = kind.into();
        let kind = if kind.trim().is_empty() {
            DEFAULT_QUESTION_KIND.to_owned()
        } else {
            kind.trim().to_owned()
        };
        Ok(Self { id, text, kind })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns a copy with edited text, keeping the identifier.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    pub fn with_text(&self, text: impl Into<String>) -> Result<Self, QuestionError> {
        Ok(Self {
            id: self.id,
            text: normalize_text(text.into())?,
            kind: self.kind.clone(),
        })
    }

    /// Returns a copy with a different type tag. Blank tags are ignored.
    #[must_use]
    pub fn with_kind(&self, kind: &str) -> Self {
        let mut next = self.clone();
        if !kind.trim().is_empty() {
            next.kind = kind.trim().to_owned();
        }
        next
    }
}

fn normalize_text(text: String) -> Result<String, QuestionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(QuestionError::EmptyText);
    }
    if trimmed.len() == text.len() {
        Ok(text)
    } else {
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_text() {
        let err = Question::new("   ", DEFAULT_QUESTION_KIND).unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn blank_kind_falls_back_to_general() {
        let q = Question::new("What is gravity?", " ").unwrap();
        assert_eq!(q.kind(), "general");
        assert_eq!(q.text(), "What is gravity?");
    }

    #[test]
    fn edits_keep_identifier() {
        let q = Question::new("Define mass.", "general").unwrap();
        let edited = q.with_text("  Define inertial mass. ").unwrap().with_kind("recall");

        assert_eq!(edited.id(), q.id());
        assert_eq!(edited.text(), "Define inertial mass.");
        assert_eq!(edited.kind(), "recall");
    }
}
