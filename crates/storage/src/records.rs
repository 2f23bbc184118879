//! Document shapes used by the persistence adapters.
//!
//! Records use the external document convention: the identifier is stored as
//! a string under `_id` and the remaining fields are camelCase. Each entity has
//! exactly one conversion into its record (`from_*`) and one back out
//! (`into_*`); the id rename is an explicit field mapping here rather than
//! something the domain types know about.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use quiz_core::model::{
    Book, BookMetadata, ChatMessage, ChatSession, MessageKind, MessageRole, ParseIdError, Question,
    Section, Transcript,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn parse_id<T>(field: &'static str, raw: &str) -> Result<T, StorageError>
where
    T: FromStr<Err = ParseIdError>,
{
    raw.parse::<T>()
        .map_err(|e| StorageError::Serialization(format!("{field}: {e}")))
}

/// Serializes a record into its JSON document form.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn to_document<T: Serialize>(record: &T) -> Result<String, StorageError> {
    serde_json::to_string(record).map_err(ser)
}

/// Parses a JSON document into a record.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the document is malformed.
pub fn from_document<T: DeserializeOwned>(document: &str) -> Result<T, StorageError> {
    serde_json::from_str(document).map_err(ser)
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id().to_string(),
            question: question.text().to_owned(),
            kind: question.kind().to_owned(),
        }
    }

    /// Convert the record back into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed ids or empty text.
    pub fn into_question(self) -> Result<Question, StorageError> {
        Question::from_persisted(parse_id("question._id", &self.id)?, self.question, self.kind)
            .map_err(ser)
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub book_id: String,
    pub name: String,
    pub order: u32,
    pub start_page: u32,
    pub end_page: u32,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
    pub created_at: DateTime<Utc>,
}

impl SectionRecord {
    #[must_use]
    pub fn from_section(section: &Section) -> Self {
        Self {
            id: section.id().to_string(),
            book_id: section.book_id().to_string(),
            name: section.name().to_owned(),
            order: section.order(),
            start_page: section.start_page(),
            end_page: section.end_page(),
            text: section.text().map(ToOwned::to_owned),
            questions: section
                .questions()
                .iter()
                .map(QuestionRecord::from_question)
                .collect(),
            created_at: section.created_at(),
        }
    }

    /// Convert the record back into a domain `Section`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if ids or section fields are invalid.
    pub fn into_section(self) -> Result<Section, StorageError> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionRecord::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        Section::from_persisted(
            parse_id("section._id", &self.id)?,
            parse_id("section.bookId", &self.book_id)?,
            self.name,
            self.order,
            self.start_page,
            self.end_page,
            self.text,
            questions,
            self.created_at,
        )
        .map_err(ser)
    }
}

//
// ─── BOOK ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadataRecord {
    pub pages: u32,
    pub doc_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub storage_path: String,
    pub metadata: BookMetadataRecord,
    #[serde(default)]
    pub first_page: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl BookRecord {
    #[must_use]
    pub fn from_book(book: &Book) -> Self {
        let metadata = book.metadata();
        Self {
            id: book.id().to_string(),
            user_id: book.user_id().to_string(),
            title: book.title().to_owned(),
            kind: book.kind().to_owned(),
            storage_path: book.storage_path().to_owned(),
            metadata: BookMetadataRecord {
                pages: metadata.pages,
                doc_size: metadata.size_mb,
            },
            first_page: book.first_page(),
            created_at: book.created_at(),
        }
    }

    /// Convert the record back into a domain `Book`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if ids or book fields are invalid.
    pub fn into_book(self) -> Result<Book, StorageError> {
        Book::from_persisted(
            parse_id("book._id", &self.id)?,
            parse_id("book.userId", &self.user_id)?,
            self.title,
            self.kind,
            self.storage_path,
            BookMetadata {
                pages: self.metadata.pages,
                size_mb: self.metadata.doc_size,
            },
            self.first_page,
            self.created_at,
        )
        .map_err(ser)
    }
}

//
// ─── CHAT SESSION ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub previous_message_id: Option<String>,
    pub role: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub question_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessageRecord {
    #[must_use]
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            id: message.id.to_string(),
            previous_message_id: message.previous_id.map(|id| id.to_string()),
            role: message.role.as_str().to_owned(),
            kind: message.kind.as_str().to_owned(),
            content: message.content.clone(),
            feedback: message.feedback.clone(),
            score: message.score,
            question_id: message.question_id.map(|id| id.to_string()),
            created_at: message.created_at,
        }
    }

    /// Convert the record back into a domain `ChatMessage`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed ids, roles or kinds.
    pub fn into_message(self) -> Result<ChatMessage, StorageError> {
        Ok(ChatMessage {
            id: parse_id("message._id", &self.id)?,
            previous_id: self
                .previous_message_id
                .as_deref()
                .map(|raw| parse_id("message.previousMessageId", raw))
                .transpose()?,
            role: MessageRole::parse(&self.role).map_err(ser)?,
            kind: MessageKind::parse(&self.kind).map_err(ser)?,
            content: self.content,
            feedback: self.feedback,
            score: self.score,
            question_id: self
                .question_id
                .as_deref()
                .map(|raw| parse_id("message.questionId", raw))
                .transpose()?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub document_id: String,
    #[serde(default)]
    pub section_ids: Vec<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessageRecord>,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub number_of_questions: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChatSessionRecord {
    #[must_use]
    pub fn from_session(session: &ChatSession) -> Self {
        Self {
            id: session.id().to_string(),
            user_id: session.user_id().to_string(),
            document_id: session.book_id().to_string(),
            section_ids: session.section_ids().iter().map(ToString::to_string).collect(),
            messages: session
                .messages()
                .iter()
                .map(ChatMessageRecord::from_message)
                .collect(),
            overall_score: session.overall_score(),
            number_of_questions: session.number_of_questions(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }

    /// Convert the record back into a domain `ChatSession`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed ids, messages or a
    /// transcript whose message chain is broken.
    pub fn into_session(self) -> Result<ChatSession, StorageError> {
        let section_ids = self
            .section_ids
            .iter()
            .map(|raw| parse_id("session.sectionIds", raw))
            .collect::<Result<Vec<_>, _>>()?;
        let messages = self
            .messages
            .into_iter()
            .map(ChatMessageRecord::into_message)
            .collect::<Result<Vec<_>, _>>()?;
        let transcript = Transcript::from_persisted(messages).map_err(ser)?;

        Ok(ChatSession::from_persisted(
            parse_id("session._id", &self.id)?,
            parse_id("session.userId", &self.user_id)?,
            parse_id("session.documentId", &self.document_id)?,
            section_ids,
            transcript,
            self.overall_score,
            self.number_of_questions,
            self.created_at,
            self.updated_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{BookId, Evaluation, MessageDraft, UserId};
    use quiz_core::time::fixed_now;

    #[test]
    fn section_document_uses_external_key() {
        let mut section =
            Section::new(BookId::new_v4(), "Intro", 1, 1, 3, Some("t".into()), fixed_now())
                .unwrap();
        section.push_question(Question::new("Why?", "general").unwrap());

        let record = SectionRecord::from_section(&section);
        let value: serde_json::Value =
            serde_json::from_str(&to_document(&record).unwrap()).unwrap();

        assert_eq!(value["_id"], section.id().to_string());
        assert_eq!(value["bookId"], section.book_id().to_string());
        assert_eq!(value["startPage"], 1);
        assert_eq!(value["questions"][0]["type"], "general");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn section_record_restores_questions() {
        let mut section =
            Section::new(BookId::new_v4(), "Intro", 1, 1, 3, None, fixed_now()).unwrap();
        let question = Question::new("Why?", "general").unwrap();
        section.push_question(question.clone());

        let doc = to_document(&SectionRecord::from_section(&section)).unwrap();
        let restored = from_document::<SectionRecord>(&doc)
            .unwrap()
            .into_section()
            .unwrap();

        assert_eq!(restored, section);
        assert_eq!(restored.question(question.id()), Some(&question));
    }

    #[test]
    fn session_record_preserves_transcript_chain() {
        let mut session =
            ChatSession::new(UserId::new_v4(), BookId::new_v4(), Vec::new(), fixed_now());
        session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Question, "Q"),
            fixed_now(),
        );
        session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Feedback, "F")
                .with_evaluation(&Evaluation::new("good", 8.0)),
            fixed_now(),
        );
        session.finalize(1, fixed_now());

        let record = ChatSessionRecord::from_session(&session);
        assert_eq!(record.messages[1].kind, "feedback");
        let restored = record.into_session().unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn malformed_ids_are_serialization_errors() {
        let record = QuestionRecord {
            id: "nope".into(),
            question: "Q".into(),
            kind: "general".into(),
        };
        let err = record.into_question().unwrap_err();
        assert!(matches!(err, StorageError::Serialization(msg) if msg.contains("question._id")));
    }
}
