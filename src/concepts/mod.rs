pub mod authenticating;
pub mod collectioning;
pub mod friending;
pub mod leveling;
pub mod posting;
pub mod sessioning;
pub mod summarizing;
pub mod trackering;

use serde::Serialize;
use thiserror::Error;

use crate::database::DatabaseError;

pub use authenticating::{AuthenticatingConcept, User};
pub use collectioning::CollectioningConcept;
pub use friending::FriendingConcept;
pub use leveling::LevelingConcept;
pub use posting::PostingConcept;
pub use sessioning::SessioningConcept;
pub use summarizing::SummarizingConcept;
pub use trackering::TrackeringConcept;

/// Boundary violations raised by domain concepts
#[derive(Debug, Error)]
pub enum ConceptError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotAllowed(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    BadValues(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl ConceptError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ConceptError::NotFound(message.into())
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        ConceptError::NotAllowed(message.into())
    }

    pub fn bad_values(message: impl Into<String>) -> Self {
        ConceptError::BadValues(message.into())
    }
}

/// Plain acknowledgement returned by mutating operations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Msg {
    pub msg: &'static str,
}

pub fn msg(text: &'static str) -> Msg {
    Msg { msg: text }
}
