use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//
// ─── PARSE ERROR ───────────────────────────────────────────────────────────────
//

/// Error type for parsing an identifier from its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl ParseIdError {
    /// Name of the identifier type that failed to parse.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

//
// ─── IDENTIFIERS ───────────────────────────────────────────────────────────────
//

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

uuid_id!(
    /// Owner of books and chat sessions.
    UserId
);
uuid_id!(
    /// Unique identifier for an uploaded book (the quiz "document").
    BookId
);
uuid_id!(
    /// Unique identifier for a book section.
    SectionId
);
uuid_id!(
    /// Unique identifier for a question inside a section.
    QuestionId
);
uuid_id!(
    /// Unique identifier for a transcript message.
    MessageId
);
uuid_id!(
    /// Unique identifier for a chat session.
    ChatSessionId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_hyphenated_uuid() {
        let raw = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let id = SectionId::from_uuid(raw);
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn parses_from_str() {
        let id: QuestionId = " 67e55044-10b1-426f-9247-bb680e5fe0c8 ".parse().unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn parse_error_names_the_kind() {
        let err = "not-a-uuid".parse::<BookId>().unwrap_err();
        assert_eq!(err.kind(), "BookId");
        assert_eq!(err.to_string(), "failed to parse BookId from string");
    }

    #[test]
    fn fresh_ids_differ() {
        assert_ne!(MessageId::new_v4(), MessageId::new_v4());
    }

    #[test]
    fn debug_names_the_kind() {
        let raw = Uuid::nil();
        assert_eq!(
            format!("{:?}", UserId::from_uuid(raw)),
            "UserId(00000000-0000-0000-0000-000000000000)"
        );
    }
}
