//! Contracts for the external text oracles used by the quiz.
//!
//! Oracles are opaque and asynchronous. Services only depend on these traits,
//! so tests substitute scripted fakes and the binary wires in [`crate::llm::LlmOracle`].

use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::model::{Evaluation, MessageClass};

use crate::error::OracleError;

/// Decides whether a user message answers the current question, asks for
/// help, or is something else.
#[async_trait]
pub trait MessageClassifier: Send + Sync {
    async fn classify(&self, message: &str, question: &str) -> Result<MessageClass, OracleError>;
}

/// Scores an answer against the section text the question was drawn from.
#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        answer: &str,
        question: &str,
        reference: &str,
    ) -> Result<Evaluation, OracleError>;
}

/// Explains a question in response to a help request.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(
        &self,
        message: &str,
        question: &str,
        reference: &str,
    ) -> Result<String, OracleError>;
}

/// A top-level section found in a table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOutline {
    pub title: String,
    pub page_number: u32,
}

#[async_trait]
pub trait SectionExtractor: Send + Sync {
    async fn extract_sections(
        &self,
        contents: &str,
        example_titles: &[String],
    ) -> Result<Vec<SectionOutline>, OracleError>;
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate_questions(
        &self,
        content: &str,
        count: u32,
    ) -> Result<Vec<String>, OracleError>;
}

#[async_trait]
pub trait QuestionImprover: Send + Sync {
    async fn improve_question(&self, question: &str, feedback: &str)
    -> Result<String, OracleError>;
}

/// The oracles a chat session consults on every turn.
#[derive(Clone)]
pub struct ChatOracles {
    pub classifier: Arc<dyn MessageClassifier>,
    pub evaluator: Arc<dyn AnswerEvaluator>,
    pub explainer: Arc<dyn Explainer>,
}

impl ChatOracles {
    /// Uses one implementation for all three roles.
    pub fn from_shared<T>(oracle: Arc<T>) -> Self
    where
        T: MessageClassifier + AnswerEvaluator + Explainer + 'static,
    {
        Self {
            classifier: oracle.clone(),
            evaluator: oracle.clone(),
            explainer: oracle,
        }
    }
}

/// The oracles used when authoring sections and questions.
#[derive(Clone)]
pub struct AuthoringOracles {
    pub extractor: Arc<dyn SectionExtractor>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub improver: Arc<dyn QuestionImprover>,
}

impl AuthoringOracles {
    pub fn from_shared<T>(oracle: Arc<T>) -> Self
    where
        T: SectionExtractor + QuestionGenerator + QuestionImprover + 'static,
    {
        Self {
            extractor: oracle.clone(),
            generator: oracle.clone(),
            improver: oracle,
        }
    }
}
