use thiserror::Error;

use crate::model::{BookError, QuestionError, SectionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Book(#[from] BookError),
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;

    #[test]
    fn model_errors_convert_transparently() {
        fn build() -> Result<Question, Error> {
            Ok(Question::new("  ", "open")?)
        }
        let err = build().unwrap_err();
        assert!(matches!(err, Error::Question(QuestionError::EmptyText)));
        assert_eq!(err.to_string(), "question text cannot be empty");
    }
}
