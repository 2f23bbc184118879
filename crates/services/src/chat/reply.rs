use quiz_core::model::{Evaluation, Question};

/// User input that skips to the next question (compared case-insensitively).
pub const NEXT_COMMAND: &str = "next";

pub const OTHER_INSTRUCTION: &str =
    "Please provide an answer or ask for help. If you want to skip the question, type 'next'.";

/// What the assistant says in response to a user message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    /// The next question to answer.
    Question(Question),
    /// Evaluation of an answer; `text` is the message shown to the user.
    Feedback { text: String, evaluation: Evaluation },
    Explanation(String),
    Instruction(String),
    /// Every question has been answered or skipped.
    Complete,
    /// No quiz is running or no question is current; nothing changed.
    Idle,
}

impl ChatReply {
    pub(crate) fn feedback(evaluation: Evaluation) -> Self {
        let text = format!(
            "Feedback: {}\n\nScore: {:.1}\n\nFor the next question type '{NEXT_COMMAND}'.",
            evaluation.feedback(),
            evaluation.score()
        );
        Self::Feedback { text, evaluation }
    }

    /// Text to display, if the reply carries any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            ChatReply::Question(question) => Some(question.text()),
            ChatReply::Feedback { text, .. } => Some(text),
            ChatReply::Explanation(text) | ChatReply::Instruction(text) => Some(text),
            ChatReply::Complete | ChatReply::Idle => None,
        }
    }
}

pub(crate) fn is_next_command(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(NEXT_COMMAND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_command_ignores_case_and_whitespace() {
        assert!(is_next_command("next"));
        assert!(is_next_command("  NeXt \n"));
        assert!(!is_next_command("next one"));
    }

    #[test]
    fn feedback_text_mentions_score_and_next() {
        let reply = ChatReply::feedback(Evaluation::new("Solid answer", 8.0));
        assert_eq!(
            reply.text(),
            Some("Feedback: Solid answer\n\nScore: 8.0\n\nFor the next question type 'next'.")
        );
        assert_eq!(ChatReply::Complete.text(), None);
    }
}
