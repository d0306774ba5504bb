//! Error types for coref-markup-core.

use crate::span::Span;
use thiserror::Error;

/// Result type for coref-markup-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for coref-markup-core operations.
///
/// Everything except `Io`/`Json` is a structural violation: the caller asked
/// the graph to do something that would break one of its invariants.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The span is already owned by an entity.
    #[error("span {span} already belongs to entity {entity}")]
    SpanAlreadyAssigned {
        /// Offending span
        span: Span,
        /// Entity that owns it
        entity: usize,
    },

    /// Both spans already belong to the same entity.
    #[error("spans {0} and {1} are already merged")]
    AlreadyMerged(Span, Span),

    /// An entity cannot be merged into itself.
    #[error("cannot merge entity {0} into itself")]
    MergeIntoSelf(usize),

    /// An entity cannot include itself.
    #[error("entity {0} cannot be its own parent")]
    SelfParenting(usize),

    /// Containers and simple entities cannot be merged.
    #[error("cannot merge entity {0} into entity {1} of a different kind")]
    KindMismatch(usize, usize),

    /// Child links require a container parent (or forbid a container child).
    #[error("entity {0} cannot take part in this nesting: {1}")]
    NotAContainer(usize, &'static str),

    /// The span does not exist in the graph.
    #[error("span {0} does not exist")]
    UnknownSpan(Span),

    /// The entity id is out of range or was deleted.
    #[error("entity {0} does not exist")]
    UnknownEntity(usize),

    /// The markup document is inconsistent.
    #[error("Invalid markup: {0}")]
    InvalidMarkup(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding/encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid markup error.
    #[must_use]
    pub fn invalid_markup(msg: impl Into<String>) -> Self {
        Self::InvalidMarkup(msg.into())
    }
}
