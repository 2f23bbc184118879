use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::MessageId;
use crate::model::message::{ChatMessage, MessageDraft, MessageKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TranscriptError {
    #[error("message {index} does not link to its predecessor")]
    BrokenChain { index: usize },
}

/// Append-only, ordered list of chat messages.
///
/// Every message links to the one before it through `previous_id`; the first
/// message has none. Messages are never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrates a transcript, checking the `previous_id` chain.
    ///
    /// # Errors
    ///
    /// Returns `TranscriptError::BrokenChain` at the first message whose
    /// back-reference does not match its predecessor.
    pub fn from_persisted(messages: Vec<ChatMessage>) -> Result<Self, TranscriptError> {
        let mut expected: Option<MessageId> = None;
        for (index, message) in messages.iter().enumerate() {
            if message.previous_id != expected {
                return Err(TranscriptError::BrokenChain { index });
            }
            expected = Some(message.id);
        }
        Ok(Self { messages })
    }

    /// Appends a message, linking it to the current last entry.
    pub fn append(&mut self, draft: MessageDraft, created_at: DateTime<Utc>) -> &ChatMessage {
        let message = ChatMessage {
            id: MessageId::new_v4(),
            previous_id: self.messages.last().map(|m| m.id),
            role: draft.role,
            kind: draft.kind,
            content: draft.content,
            feedback: draft.feedback,
            score: draft.score,
            question_id: draft.question_id,
            created_at,
        };
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Scores carried by `feedback` messages, in transcript order.
    #[must_use]
    pub fn feedback_scores(&self) -> Vec<f64> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Feedback)
            .map(|m| m.score.unwrap_or_default())
            .collect()
    }

    /// Number of answers that received feedback.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Feedback)
            .count()
    }

    /// Mean feedback score rounded to one decimal place. `0.0` when no answer
    /// has been scored yet.
    #[must_use]
    pub fn overall_score(&self) -> f64 {
        mean_score(&self.feedback_scores())
    }
}

/// Arithmetic mean rounded to one decimal (half away from zero). Empty input is `0.0`.
#[must_use]
pub fn mean_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::{Evaluation, MessageRole};
    use crate::time::fixed_now;

    fn feedback(score: f64) -> MessageDraft {
        MessageDraft::new(MessageRole::Assistant, MessageKind::Feedback, "fb")
            .with_evaluation(&Evaluation::new("fb", score))
    }

    #[test]
    fn append_links_previous_message() {
        let mut transcript = Transcript::new();
        let first = transcript
            .append(
                MessageDraft::new(MessageRole::Assistant, MessageKind::Question, "Q1"),
                fixed_now(),
            )
            .id;
        let second = transcript
            .append(
                MessageDraft::new(MessageRole::User, MessageKind::Answer, "A1"),
                fixed_now(),
            )
            .clone();

        assert_eq!(transcript.messages()[0].previous_id, None);
        assert_eq!(second.previous_id, Some(first));
    }

    #[test]
    fn earlier_messages_are_untouched_by_appends() {
        let mut transcript = Transcript::new();
        transcript.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Question, "Q1"),
            fixed_now(),
        );
        let snapshot = transcript.messages().to_vec();
        transcript.append(feedback(4.0), fixed_now());
        transcript.append(feedback(6.0), fixed_now());

        assert_eq!(&transcript.messages()[..1], snapshot.as_slice());
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn overall_score_is_rounded_mean() {
        let mut transcript = Transcript::new();
        transcript.append(feedback(8.0), fixed_now());
        transcript.append(feedback(6.0), fixed_now());
        assert!((transcript.overall_score() - 7.0).abs() < f64::EPSILON);
        assert_eq!(transcript.answered_count(), 2);
    }

    #[test]
    fn overall_score_of_nothing_is_zero() {
        assert!(Transcript::new().overall_score().abs() < f64::EPSILON);
    }

    #[test]
    fn mean_rounds_to_one_decimal() {
        assert!((mean_score(&[7.0, 8.0, 8.0]) - 7.7).abs() < 1e-9);
        assert!((mean_score(&[2.25]) - 2.3).abs() < 1e-9);
    }

    #[test]
    fn rehydration_checks_chain() {
        let mut transcript = Transcript::new();
        transcript.append(feedback(5.0), fixed_now());
        transcript.append(feedback(5.0), fixed_now());

        let ok = Transcript::from_persisted(transcript.messages().to_vec()).unwrap();
        assert_eq!(ok, transcript);

        let mut broken = transcript.messages().to_vec();
        broken.swap(0, 1);
        assert_eq!(
            Transcript::from_persisted(broken).unwrap_err(),
            TranscriptError::BrokenChain { index: 0 }
        );
    }
}
