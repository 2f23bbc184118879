use std::sync::Arc;

use quiz_core::model::{
    BookId, ChatSession, MessageClass, MessageRole, Question, SectionId, SectionReference,
    SessionSummary, UserId,
};
use rand::SeedableRng;
use rand::rng;
use rand::rngs::StdRng;
use storage::repository::{ChatSessionRepository, SectionRepository, SessionFilter};
use tracing::instrument;

use super::pool::QuestionPool;
use super::reply::{ChatReply, OTHER_INSTRUCTION, is_next_command};
use super::session::{QuizProgress, QuizSession};
use crate::Clock;
use crate::error::ChatError;
use crate::oracle::ChatOracles;

/// Runs one user's quiz at a time.
///
/// Every turn consults the oracles and repositories before touching the
/// transcript, so a turn that fails leaves the session as it was.
pub struct ChatService {
    clock: Clock,
    sections: Arc<dyn SectionRepository>,
    sessions: Arc<dyn ChatSessionRepository>,
    oracles: ChatOracles,
    rng: StdRng,
    active: Option<QuizSession>,
}

impl ChatService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sections: Arc<dyn SectionRepository>,
        sessions: Arc<dyn ChatSessionRepository>,
        oracles: ChatOracles,
    ) -> Self {
        Self {
            clock,
            sections,
            sessions,
            oracles,
            rng: StdRng::from_rng(&mut rng()),
            active: None,
        }
    }

    /// Makes question shuffling reproducible.
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The running or finished quiz, if one was started.
    #[must_use]
    pub fn quiz(&self) -> Option<&QuizSession> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> Option<&ChatSession> {
        self.active.as_ref().map(QuizSession::session)
    }

    #[must_use]
    pub fn progress(&self) -> Option<QuizProgress> {
        self.active.as_ref().map(QuizSession::progress)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.active.as_ref().and_then(QuizSession::current_question)
    }

    /// Starts a quiz over the questions of `section_ids`, replacing any
    /// previous in-memory quiz.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::SectionNotFound` for an unknown section and
    /// `ChatError::Storage` when the repository fails. The previous quiz is
    /// kept on error.
    #[instrument(skip(self, section_ids), fields(%user_id, %book_id, sections = section_ids.len()))]
    pub async fn start(
        &mut self,
        user_id: UserId,
        book_id: BookId,
        section_ids: Vec<SectionId>,
    ) -> Result<(), ChatError> {
        let pool = QuestionPool::collect(self.sections.as_ref(), &section_ids)
            .await?
            .shuffled(&mut self.rng);
        let session = ChatSession::new(user_id, book_id, section_ids, self.clock.now());
        tracing::info!(session_id = %session.id(), questions = pool.len(), "quiz started");
        self.active = Some(QuizSession::new(session, pool));
        Ok(())
    }

    /// Asks the first question that has not been moved past yet.
    ///
    /// Returns `None` when no quiz is running or every question is done.
    pub fn next_question(&mut self) -> Option<Question> {
        let now = self.clock.now();
        let quiz = self.active.as_mut().filter(|quiz| !quiz.is_finished())?;
        quiz.advance(now).cloned()
    }

    /// Handles one user message.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Oracle` when an oracle call fails and
    /// `ChatError::QuestionNotFound` when no section owns the current
    /// question. The transcript is unchanged in both cases.
    pub async fn submit(&mut self, text: &str) -> Result<ChatReply, ChatError> {
        let Some(quiz) = self.active.as_ref().filter(|quiz| !quiz.is_finished()) else {
            return Ok(ChatReply::Idle);
        };

        if is_next_command(text) {
            let now = self.clock.now();
            let Some(quiz) = self.active.as_mut() else {
                return Ok(ChatReply::Idle);
            };
            quiz.skip(text, now);
            tracing::debug!(session_id = %quiz.session().id(), "moved to next question");
            return Ok(match quiz.advance(now) {
                Some(question) => ChatReply::Question(question.clone()),
                None => ChatReply::Complete,
            });
        }

        let Some(question) = quiz.current_question().cloned() else {
            return Ok(ChatReply::Idle);
        };
        let session_id = quiz.session().id();

        let class = self
            .oracles
            .classifier
            .classify(text, question.text())
            .await
            .inspect_err(|e| tracing::warn!(%session_id, error = %e, "classification failed"))?;
        tracing::debug!(%session_id, class = class.as_str(), "classified message");

        let reply = match class {
            MessageClass::Answer => {
                let reference = self.reference_for(&question).await?;
                let evaluation = self
                    .oracles
                    .evaluator
                    .evaluate(text, question.text(), &reference.text)
                    .await
                    .inspect_err(|e| tracing::warn!(%session_id, error = %e, "evaluation failed"))?;
                let reply = ChatReply::feedback(evaluation.clone());
                if let (Some(quiz), Some(shown)) = (self.active.as_mut(), reply.text()) {
                    quiz.record_answer(text, &evaluation, shown, self.clock.now());
                }
                reply
            }
            MessageClass::Help => {
                let reference = self.reference_for(&question).await?;
                let explanation = self
                    .oracles
                    .explainer
                    .explain(text, question.text(), &reference.text)
                    .await
                    .inspect_err(|e| tracing::warn!(%session_id, error = %e, "explanation failed"))?;
                if let Some(quiz) = self.active.as_mut() {
                    quiz.record_help(text, &explanation, self.clock.now());
                }
                ChatReply::Explanation(explanation)
            }
            MessageClass::Other => {
                if let Some(quiz) = self.active.as_mut() {
                    quiz.record_other(self.clock.now());
                }
                ChatReply::Instruction(OTHER_INSTRUCTION.to_owned())
            }
        };
        Ok(reply)
    }

    async fn reference_for(&self, question: &Question) -> Result<SectionReference, ChatError> {
        self.sections
            .find_section_by_question(question.id())
            .await?
            .map(|section| section.reference())
            .ok_or(ChatError::QuestionNotFound(question.id()))
    }

    /// Finalizes the score and persists the session. Returns the overall
    /// score, or `None` when no quiz was started. Calling it again re-saves
    /// the same session.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Storage` if the session cannot be saved. The quiz
    /// is still marked finished.
    pub async fn finish(&mut self) -> Result<Option<f64>, ChatError> {
        let now = self.clock.now();
        let Some(quiz) = self.active.as_mut() else {
            return Ok(None);
        };
        let score = quiz.finish(now);
        self.sessions.save_session(quiz.session()).await?;
        tracing::info!(
            session_id = %quiz.session().id(),
            score,
            questions = quiz.pool().len(),
            "quiz finished"
        );
        Ok(Some(score))
    }

    /// Summary of the current quiz, titled with the book's sections.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Storage` if the sections cannot be read.
    pub async fn summarize(&self) -> Result<Option<SessionSummary>, ChatError> {
        let Some(session) = self.session() else {
            return Ok(None);
        };
        let sections = self.sections.list_sections(session.book_id()).await?;
        Ok(Some(session.summarize(&sections)))
    }

    /// `(role, content)` pairs of the transcript, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<(MessageRole, String)> {
        self.session()
            .map(|session| {
                session
                    .messages()
                    .iter()
                    .map(|m| (m.role, m.content.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stored sessions of `user_id` for `book_id` that cover any of
    /// `section_ids`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Storage` on repository failures.
    #[instrument(skip(self, section_ids), fields(%user_id, %book_id))]
    pub async fn list_summaries(
        &self,
        user_id: UserId,
        book_id: BookId,
        section_ids: Vec<SectionId>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<SessionSummary>, ChatError> {
        let filter = SessionFilter {
            user_id,
            book_id,
            section_ids,
        };
        let sessions = self.sessions.list_sessions(&filter, limit, offset).await?;
        if sessions.is_empty() {
            return Ok(Vec::new());
        }
        let sections = self.sections.list_sections(book_id).await?;
        Ok(sessions
            .iter()
            .map(|session| session.summarize(&sections))
            .collect())
    }
}
