use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{MessageId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageError {
    #[error("invalid message role: {0}")]
    InvalidRole(String),

    #[error("invalid message kind: {0}")]
    InvalidKind(String),
}

//
// ─── ROLE / KIND ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Parses the storage form of a role.
    ///
    /// # Errors
    ///
    /// Returns `MessageError::InvalidRole` for unknown values.
    pub fn parse(value: &str) -> Result<Self, MessageError> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(MessageError::InvalidRole(other.to_owned())),
        }
    }
}

/// What a transcript entry represents within the quiz flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// User asked to skip ahead (`next`).
    NextQuestion,
    /// Assistant presented a question.
    Question,
    /// User attempted an answer.
    Answer,
    /// Assistant scored an answer.
    Feedback,
    /// Assistant explained the current question.
    Explanation,
    /// User asked for help.
    Help,
    /// Assistant redirected an off-topic message.
    Other,
}

impl MessageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::NextQuestion => "next_question",
            MessageKind::Question => "question",
            MessageKind::Answer => "answer",
            MessageKind::Feedback => "feedback",
            MessageKind::Explanation => "explanation",
            MessageKind::Help => "help",
            MessageKind::Other => "other",
        }
    }

    /// Parses the storage form of a kind.
    ///
    /// # Errors
    ///
    /// Returns `MessageError::InvalidKind` for unknown values.
    pub fn parse(value: &str) -> Result<Self, MessageError> {
        match value {
            "next_question" => Ok(Self::NextQuestion),
            "question" => Ok(Self::Question),
            "answer" => Ok(Self::Answer),
            "feedback" => Ok(Self::Feedback),
            "explanation" => Ok(Self::Explanation),
            "help" => Ok(Self::Help),
            "other" => Ok(Self::Other),
            other => Err(MessageError::InvalidKind(other.to_owned())),
        }
    }
}

//
// ─── CLASSIFICATION / EVALUATION ───────────────────────────────────────────────
//

/// Intent of a free-form user message, as decided by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    Answer,
    Help,
    Other,
}

impl MessageClass {
    /// Maps a classifier label onto a class. Anything unrecognised is `Other`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "answer" => Self::Answer,
            "help" => Self::Help,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageClass::Answer => "answer",
            MessageClass::Help => "help",
            MessageClass::Other => "other",
        }
    }
}

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Feedback and score for a single answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    feedback: String,
    score: f64,
}

impl Evaluation {
    /// Builds an evaluation, clamping the score into `MIN_SCORE..=MAX_SCORE`.
    /// Non-finite scores become `MIN_SCORE`.
    #[must_use]
    pub fn new(feedback: impl Into<String>, score: f64) -> Self {
        let score = if score.is_finite() {
            score.clamp(MIN_SCORE, MAX_SCORE)
        } else {
            MIN_SCORE
        };
        Self {
            feedback: feedback.into(),
            score,
        }
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }
}

//
// ─── MESSAGE ───────────────────────────────────────────────────────────────────
//

/// Content of a message before it is placed in a transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    pub feedback: Option<String>,
    pub score: Option<f64>,
    pub question_id: Option<QuestionId>,
}

impl MessageDraft {
    #[must_use]
    pub fn new(role: MessageRole, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            content: content.into(),
            feedback: None,
            score: None,
            question_id: None,
        }
    }

    #[must_use]
    pub fn for_question(mut self, question_id: Option<QuestionId>) -> Self {
        self.question_id = question_id;
        self
    }

    #[must_use]
    pub fn with_evaluation(mut self, evaluation: &Evaluation) -> Self {
        self.feedback = Some(evaluation.feedback().to_owned());
        self.score = Some(evaluation.score());
        self
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub previous_id: Option<MessageId>,
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    pub feedback: Option<String>,
    pub score: Option<f64>,
    pub question_id: Option<QuestionId>,
    pub created_at: DateTime<Utc>,
}
