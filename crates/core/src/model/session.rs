use chrono::{DateTime, Utc};

use crate::model::ids::{BookId, ChatSessionId, SectionId, UserId};
use crate::model::message::{ChatMessage, MessageDraft};
use crate::model::section::Section;
use crate::model::transcript::Transcript;

/// A quiz run over one or more sections of a book.
///
/// Lives in memory while the quiz is in progress and is persisted once the
/// quiz is finished.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    id: ChatSessionId,
    user_id: UserId,
    book_id: BookId,
    section_ids: Vec<SectionId>,
    transcript: Transcript,
    overall_score: Option<f64>,
    number_of_questions: u32,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    #[must_use]
    pub fn new(
        user_id: UserId,
        book_id: BookId,
        section_ids: Vec<SectionId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ChatSessionId::new_v4(),
            user_id,
            book_id,
            section_ids,
            transcript: Transcript::new(),
            overall_score: None,
            number_of_questions: 0,
            created_at,
            updated_at: None,
        }
    }

    /// Rehydrates a stored session.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: ChatSessionId,
        user_id: UserId,
        book_id: BookId,
        section_ids: Vec<SectionId>,
        transcript: Transcript,
        overall_score: Option<f64>,
        number_of_questions: u32,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            user_id,
            book_id,
            section_ids,
            transcript,
            overall_score,
            number_of_questions,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> ChatSessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    #[must_use]
    pub fn section_ids(&self) -> &[SectionId] {
        &self.section_ids
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    /// Score recorded at finalization, if the session has been finished.
    #[must_use]
    pub fn overall_score(&self) -> Option<f64> {
        self.overall_score
    }

    #[must_use]
    pub fn number_of_questions(&self) -> u32 {
        self.number_of_questions
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn append(&mut self, draft: MessageDraft, at: DateTime<Utc>) -> &ChatMessage {
        self.transcript.append(draft, at)
    }

    pub fn set_number_of_questions(&mut self, count: u32) {
        self.number_of_questions = count;
    }

    /// Freezes the overall score from the transcript's feedback messages.
    pub fn finalize(&mut self, number_of_questions: u32, at: DateTime<Utc>) -> f64 {
        let score = self.transcript.overall_score();
        self.overall_score = Some(score);
        self.number_of_questions = number_of_questions;
        self.updated_at = Some(at);
        score
    }

    #[must_use]
    pub fn covers_any(&self, section_ids: &[SectionId]) -> bool {
        self.section_ids.iter().any(|id| section_ids.contains(id))
    }

    /// Derives a summary. `sections` supplies titles and is usually the full
    /// section list of the book; only sections in this session's scope are used,
    /// in the order given.
    #[must_use]
    pub fn summarize(&self, sections: &[Section]) -> SessionSummary {
        let section_titles = sections
            .iter()
            .filter(|section| self.section_ids.contains(&section.id()))
            .map(Section::title)
            .collect();
        let answered = u32::try_from(self.transcript.answered_count()).unwrap_or(u32::MAX);

        SessionSummary {
            session_id: self.id,
            overall_score: self
                .overall_score
                .unwrap_or_else(|| self.transcript.overall_score()),
            number_of_questions: self.number_of_questions,
            number_of_answered_questions: answered,
            section_titles,
            created_at: self.created_at,
        }
    }
}

/// Read-only projection of a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: ChatSessionId,
    pub overall_score: f64,
    pub number_of_questions: u32,
    pub number_of_answered_questions: u32,
    pub section_titles: Vec<String>,
    pub created_at: DateTime<Utc>,
}
