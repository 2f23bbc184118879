use std::collections::HashSet;

use chrono::{DateTime, Utc};
use quiz_core::model::{
    ChatSession, Evaluation, MessageDraft, MessageKind, MessageRole, Question, QuestionId,
};

use super::pool::QuestionPool;
use super::reply::OTHER_INSTRUCTION;

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    InProgress,
    Finished,
}

/// How far a quiz has come.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// Size of the question pool.
    pub total: usize,
    /// Answers that received feedback.
    pub answered: usize,
    pub is_finished: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of a running quiz.
///
/// The pool order is fixed at construction. A question counts as done once
/// the user moves past it with `next`; answering alone does not retire it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    session: ChatSession,
    pool: Vec<Question>,
    done: HashSet<QuestionId>,
    current: Option<usize>,
    phase: QuizPhase,
}

impl QuizSession {
    #[must_use]
    pub fn new(mut session: ChatSession, pool: QuestionPool) -> Self {
        let pool = pool.into_questions();
        session.set_number_of_questions(u32::try_from(pool.len()).unwrap_or(u32::MAX));
        Self {
            session,
            pool,
            done: HashSet::new(),
            current: None,
            phase: QuizPhase::InProgress,
        }
    }

    #[must_use]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    #[must_use]
    pub fn pool(&self) -> &[Question] {
        &self.pool
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == QuizPhase::Finished
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.map(|index| &self.pool[index])
    }

    fn current_id(&self) -> Option<QuestionId> {
        self.current_question().map(Question::id)
    }

    #[must_use]
    pub fn is_done(&self, question_id: QuestionId) -> bool {
        self.done.contains(&question_id)
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            total: self.pool.len(),
            answered: self.session.transcript().answered_count(),
            is_finished: self.is_finished(),
        }
    }

    /// Makes the first question not yet done current and asks it.
    /// Clears the current question and returns `None` when the pool is exhausted.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<&Question> {
        let next = self
            .pool
            .iter()
            .position(|question| !self.done.contains(&question.id()));
        self.current = next;

        let index = next?;
        let question = &self.pool[index];
        self.session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Question, question.text())
                .for_question(Some(question.id())),
            now,
        );
        Some(&self.pool[index])
    }

    /// Records a `next` request and retires the current question, if any.
    pub fn skip(&mut self, text: &str, now: DateTime<Utc>) {
        let current = self.current_id();
        self.session.append(
            MessageDraft::new(MessageRole::User, MessageKind::NextQuestion, text)
                .for_question(current),
            now,
        );
        if let Some(id) = current {
            self.done.insert(id);
        }
    }

    /// Records an answer and its evaluation. `feedback_text` is the assistant
    /// message shown to the user.
    pub fn record_answer(
        &mut self,
        answer: &str,
        evaluation: &Evaluation,
        feedback_text: &str,
        now: DateTime<Utc>,
    ) {
        let current = self.current_id();
        self.session.append(
            MessageDraft::new(MessageRole::User, MessageKind::Answer, answer).for_question(current),
            now,
        );
        self.session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Feedback, feedback_text)
                .with_evaluation(evaluation)
                .for_question(current),
            now,
        );
    }

    pub fn record_help(&mut self, request: &str, explanation: &str, now: DateTime<Utc>) {
        let current = self.current_id();
        self.session.append(
            MessageDraft::new(MessageRole::User, MessageKind::Help, request).for_question(current),
            now,
        );
        self.session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Explanation, explanation)
                .for_question(current),
            now,
        );
    }

    pub fn record_other(&mut self, now: DateTime<Utc>) {
        let current = self.current_id();
        self.session.append(
            MessageDraft::new(MessageRole::Assistant, MessageKind::Other, OTHER_INSTRUCTION)
                .for_question(current),
            now,
        );
    }

    /// Freezes the score and marks the quiz finished. Returns the overall score.
    pub fn finish(&mut self, now: DateTime<Utc>) -> f64 {
        let total = u32::try_from(self.pool.len()).unwrap_or(u32::MAX);
        self.current = None;
        self.phase = QuizPhase::Finished;
        self.session.finalize(total, now)
    }
}
