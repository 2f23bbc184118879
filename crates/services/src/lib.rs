#![forbid(unsafe_code)]

pub mod app_services;
pub mod book_service;
pub mod chat;
pub mod error;
pub mod llm;
pub mod oracle;
pub mod pages;
mod prompts;
pub mod section_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use book_service::BookService;
pub use chat::{ChatReply, ChatService, QuizSession};
pub use error::{
    AppServicesError, BookServiceError, ChatError, OracleError, PageError, SectionServiceError,
};
pub use llm::{LlmConfig, LlmOracle};
pub use oracle::{
    AnswerEvaluator, AuthoringOracles, ChatOracles, Explainer, MessageClassifier,
    QuestionGenerator, QuestionImprover, SectionExtractor, SectionOutline,
};
pub use pages::{FormFeedPages, PageSource};
pub use section_service::{ContentsLayout, SectionService};
