//! Error types for coref-markup.

use thiserror::Error;

/// Result type for coref-markup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for coref-markup operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Structural or decoding error from the core model.
    #[error(transparent)]
    Core(#[from] coref_markup_core::Error),

    /// Two versions of a document annotate different texts.
    #[error("Texts are not the same!{}", .0.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default())]
    TextMismatch(Option<String>),

    /// Too few versions for the requested merge.
    #[error("Not enough versions: need at least {needed}, got {got}")]
    NotEnoughVersions {
        /// Minimum number of versions
        needed: usize,
        /// Number of versions provided
        got: usize,
    },

    /// Settings could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    /// Corpus discovery failed.
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a text mismatch error naming the offending document.
    pub fn text_mismatch(detail: impl Into<String>) -> Self {
        Error::TextMismatch(Some(detail.into()))
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a corpus error.
    pub fn corpus(msg: impl Into<String>) -> Self {
        Error::Corpus(msg.into())
    }

    /// Whether this is a text mismatch between versions.
    #[must_use]
    pub fn is_text_mismatch(&self) -> bool {
        matches!(self, Error::TextMismatch(_))
    }
}
