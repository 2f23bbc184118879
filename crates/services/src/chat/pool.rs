use quiz_core::model::{Question, SectionId};
use rand::Rng;
use rand::seq::SliceRandom;
use storage::repository::SectionRepository;

use crate::error::ChatError;

/// Questions drawn from the sections of a quiz, in the order they will be asked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionPool {
    questions: Vec<Question>,
}

impl QuestionPool {
    /// Gathers the questions of every section, in section order.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::SectionNotFound` for an unknown section and
    /// `ChatError::Storage` when the repository fails.
    pub async fn collect(
        sections: &dyn SectionRepository,
        section_ids: &[SectionId],
    ) -> Result<Self, ChatError> {
        let mut questions = Vec::new();
        for &section_id in section_ids {
            let section = sections
                .get_section(section_id)
                .await?
                .ok_or(ChatError::SectionNotFound(section_id))?;
            questions.extend_from_slice(section.questions());
        }
        Ok(Self { questions })
    }

    #[must_use]
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Applies a single uniform shuffle.
    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        self.questions.as_mut_slice().shuffle(rng);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{BookId, Section};
    use quiz_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::InMemoryRepository;

    fn section_with(book: BookId, order: u32, texts: &[&str]) -> Section {
        let mut section =
            Section::new(book, format!("S{order}"), order, 1, 2, None, fixed_now()).unwrap();
        for text in texts {
            section.push_question(Question::new(*text, "general").unwrap());
        }
        section
    }

    #[tokio::test]
    async fn collects_in_section_order() {
        let repo = InMemoryRepository::new();
        let book = BookId::new_v4();
        let first = section_with(book, 1, &["a", "b"]);
        let second = section_with(book, 2, &["c"]);
        repo.upsert_sections(&[first.clone(), second.clone()])
            .await
            .unwrap();

        let pool = QuestionPool::collect(&repo, &[second.id(), first.id()])
            .await
            .unwrap();
        let texts: Vec<&str> = pool.questions().iter().map(Question::text).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn unknown_section_is_reported() {
        let repo = InMemoryRepository::new();
        let missing = SectionId::new_v4();
        let err = QuestionPool::collect(&repo, &[missing]).await.unwrap_err();
        assert!(matches!(err, ChatError::SectionNotFound(id) if id == missing));
    }

    #[test]
    fn seeded_shuffle_is_a_permutation() {
        let questions: Vec<Question> = (0..8)
            .map(|i| Question::new(format!("q{i}"), "general").unwrap())
            .collect();
        let pool = QuestionPool::from_questions(questions.clone());

        let a = pool.clone().shuffled(&mut StdRng::seed_from_u64(7));
        let b = pool.shuffled(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);

        let mut ids: Vec<_> = a.questions().iter().map(Question::id).collect();
        let mut expected: Vec<_> = questions.iter().map(Question::id).collect();
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected);
    }
}
