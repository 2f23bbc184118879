//! Question/answer chat sessions.
//!
//! [`QuizSession`] holds the in-memory state of a running quiz. [`ChatService`]
//! drives it: it builds the question pool, consults the oracles for each user
//! message and persists the session when the quiz is finished.

mod pool;
mod reply;
mod service;
mod session;

pub use pool::QuestionPool;
pub use reply::{ChatReply, NEXT_COMMAND, OTHER_INSTRUCTION};
pub use service::ChatService;
pub use session::{QuizPhase, QuizProgress, QuizSession};
