mod book;
mod ids;
mod message;
mod question;
mod section;
mod session;
mod transcript;

pub use ids::{BookId, ChatSessionId, MessageId, ParseIdError, QuestionId, SectionId, UserId};

pub use book::{Book, BookError, BookMetadata};
pub use message::{
    ChatMessage, Evaluation, MAX_SCORE, MIN_SCORE, MessageClass, MessageDraft, MessageError,
    MessageKind, MessageRole,
};
pub use question::{DEFAULT_QUESTION_KIND, Question, QuestionError};
pub use section::{Section, SectionError, SectionReference};
pub use session::{ChatSession, SessionSummary};
pub use transcript::{Transcript, TranscriptError, mean_score};
