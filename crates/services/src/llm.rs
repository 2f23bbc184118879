use std::env;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{Evaluation, MessageClass};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::oracle::{
    AnswerEvaluator, Explainer, MessageClassifier, QuestionGenerator, QuestionImprover,
    SectionExtractor, SectionOutline,
};
use crate::prompts;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Reads `QUIZ_AI_*` variables. Returns `None` when no API key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUIZ_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("QUIZ_AI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let model = env::var("QUIZ_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        let timeout_secs = env::var("QUIZ_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Some(Self {
            base_url,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Oracle backed by an OpenAI-compatible chat completions endpoint.
///
/// Each call is a single request with the configured timeout and no retries.
/// The model is asked for a JSON object which is decoded into the oracle's
/// result type.
#[derive(Clone)]
pub struct LlmOracle {
    client: Client,
    config: Option<LlmConfig>,
}

impl LlmOracle {
    /// Build an oracle from `QUIZ_AI_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Http` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, OracleError> {
        Self::new(LlmConfig::from_env())
    }

    /// Build an oracle. `None` yields a disabled oracle whose calls fail with
    /// `OracleError::Disabled`.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Http` if the HTTP client cannot be built.
    pub fn new(config: Option<LlmConfig>) -> Result<Self, OracleError> {
        let timeout = config
            .as_ref()
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), |c| c.timeout);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn complete<T: DeserializeOwned>(&self, prompt: String) -> Result<T, OracleError> {
        let config = self.config.as_ref().ok_or(OracleError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        tracing::debug!(model = %config.model, "sending oracle request");
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "oracle request failed");
            return Err(OracleError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)?;

        decode(&content)
    }
}

fn decode<T: DeserializeOwned>(content: &str) -> Result<T, OracleError> {
    serde_json::from_str(content.trim()).map_err(|e| OracleError::Malformed(e.to_string()))
}

fn classification(output: ClassifyOutput) -> MessageClass {
    let class = MessageClass::from_label(&output.kind);
    if class == MessageClass::Other && !output.kind.trim().eq_ignore_ascii_case("other") {
        tracing::warn!(label = %output.kind, "unrecognised classifier label");
    }
    class
}

fn evaluation(output: EvaluateOutput) -> Result<Evaluation, OracleError> {
    if !output.score.is_finite() {
        return Err(OracleError::Malformed(format!(
            "score is not finite: {}",
            output.score
        )));
    }
    Ok(Evaluation::new(output.feedback, output.score))
}

#[async_trait]
impl MessageClassifier for LlmOracle {
    async fn classify(&self, message: &str, question: &str) -> Result<MessageClass, OracleError> {
        let output: ClassifyOutput = self.complete(prompts::classify(message, question)).await?;
        Ok(classification(output))
    }
}

#[async_trait]
impl AnswerEvaluator for LlmOracle {
    async fn evaluate(
        &self,
        answer: &str,
        question: &str,
        reference: &str,
    ) -> Result<Evaluation, OracleError> {
        let output: EvaluateOutput = self
            .complete(prompts::evaluate(answer, question, reference))
            .await?;
        evaluation(output)
    }
}

#[async_trait]
impl Explainer for LlmOracle {
    async fn explain(
        &self,
        message: &str,
        question: &str,
        reference: &str,
    ) -> Result<String, OracleError> {
        let output: ExplainOutput = self
            .complete(prompts::explain(message, question, reference))
            .await?;
        Ok(output.explanation)
    }
}

#[async_trait]
impl SectionExtractor for LlmOracle {
    async fn extract_sections(
        &self,
        contents: &str,
        example_titles: &[String],
    ) -> Result<Vec<SectionOutline>, OracleError> {
        let output: SectionsOutput = self
            .complete(prompts::extract_sections(contents, example_titles))
            .await?;
        Ok(output
            .sections
            .into_iter()
            .map(|s| SectionOutline {
                title: s.title,
                page_number: s.page_number,
            })
            .collect())
    }
}

#[async_trait]
impl QuestionGenerator for LlmOracle {
    async fn generate_questions(
        &self,
        content: &str,
        count: u32,
    ) -> Result<Vec<String>, OracleError> {
        let output: QuestionsOutput = self
            .complete(prompts::generate_questions(content, count))
            .await?;
        Ok(output.questions)
    }
}

#[async_trait]
impl QuestionImprover for LlmOracle {
    async fn improve_question(
        &self,
        question: &str,
        feedback: &str,
    ) -> Result<String, OracleError> {
        let output: QuestionOutput = self
            .complete(prompts::improve_question(question, feedback))
            .await?;
        Ok(output.question)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassifyOutput {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct EvaluateOutput {
    feedback: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct ExplainOutput {
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct SectionsOutput {
    #[serde(default)]
    sections: Vec<SectionOutput>,
}

#[derive(Debug, Deserialize)]
struct SectionOutput {
    title: String,
    page_number: u32,
}

#[derive(Debug, Deserialize)]
struct QuestionsOutput {
    #[serde(default)]
    questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionOutput {
    question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_oracle_refuses_calls() {
        let oracle = LlmOracle::new(None).unwrap();
        assert!(!oracle.enabled());
        let err = oracle.classify("F = ma", "Newton?").await.unwrap_err();
        assert!(matches!(err, OracleError::Disabled));
    }

    #[test]
    fn unknown_labels_classify_as_other() {
        let out: ClassifyOutput = decode(r#"{"type": "greeting"}"#).unwrap();
        assert_eq!(classification(out), MessageClass::Other);
        let out: ClassifyOutput = decode(r#" {"type": "Help"} "#).unwrap();
        assert_eq!(classification(out), MessageClass::Help);
    }

    #[test]
    fn evaluation_is_clamped_and_checked() {
        let out: EvaluateOutput = decode(r#"{"feedback": "Great", "score": 14}"#).unwrap();
        let evaluation = evaluation(out).unwrap();
        assert!((evaluation.score() - 10.0).abs() < f64::EPSILON);
        assert_eq!(evaluation.feedback(), "Great");

        let nan = EvaluateOutput {
            feedback: String::new(),
            score: f64::NAN,
        };
        assert!(matches!(
            super::evaluation(nan),
            Err(OracleError::Malformed(_))
        ));
    }

    #[test]
    fn malformed_content_is_reported() {
        let err = decode::<QuestionsOutput>("not json").unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
        let empty: QuestionsOutput = decode("{}").unwrap();
        assert!(empty.questions.is_empty());
    }

    #[test]
    fn request_asks_for_json_object() {
        let payload = ChatRequest {
            model: "m".into(),
            messages: Vec::new(),
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }
}
