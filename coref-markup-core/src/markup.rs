//! The markup document: text, entities, includes and merge provenance.
//!
//! This is the on-disk JSON format shared by the annotation tool and every
//! command in this workspace:
//!
//! ```json
//! {
//!   "entities": [[[0, 4], [20, 22]], [[9, 13]]],
//!   "includes": [[], [0]],
//!   "text": "John met Mary. He ...",
//!   "diff": [{"span": [0, 4], "comment": "added span", "shared_comment": null}]
//! }
//! ```
//!
//! `entities[i]` and `includes[i]` are index-aligned; `includes[i]` lists the
//! child entities of entity `i`.

use crate::error::{Error, Result};
use crate::span::Span;
use crate::text::CharText;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Provenance comments attached to one span of a merged or cleaned markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Span the comments refer to
    pub span: Span,
    /// Comment about this span only
    #[serde(default)]
    pub comment: Option<String>,
    /// Comment shared by every span of the same relation
    #[serde(default)]
    pub shared_comment: Option<String>,
}

impl DiffEntry {
    /// True when neither comment is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comment.is_none() && self.shared_comment.is_none()
    }
}

/// A coreference markup document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Markup {
    /// Entities, each a list of spans
    pub entities: Vec<Vec<Span>>,
    /// Child entity indices, parallel to `entities`
    #[serde(default)]
    pub includes: Vec<Vec<usize>>,
    /// Source text (identical across versions of one document)
    pub text: String,
    /// Merge/clean provenance, omitted when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<DiffEntry>,
}

impl Markup {
    /// Create an empty markup over a text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a markup from entities and includes.
    ///
    /// Missing `includes` rows are padded with empty lists.
    #[must_use]
    pub fn with_entities(
        text: impl Into<String>,
        entities: Vec<Vec<Span>>,
        mut includes: Vec<Vec<usize>>,
    ) -> Self {
        includes.resize(entities.len(), Vec::new());
        Self {
            entities,
            includes,
            text: text.into(),
            diff: Vec::new(),
        }
    }

    /// Decode and validate a markup from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut markup: Markup = serde_json::from_str(json)?;
        markup.normalize_includes();
        markup.validate()?;
        Ok(markup)
    }

    /// Decode and validate a markup from a reader.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Self::from_json(&json)
    }

    /// Read a markup file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| match e {
            Error::InvalidMarkup(msg) => {
                Error::invalid_markup(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the markup to a file in one go.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check index alignment, child indices and span bounds.
    pub fn validate(&self) -> Result<()> {
        if self.includes.len() != self.entities.len() {
            return Err(Error::invalid_markup(format!(
                "{} entities but {} includes rows",
                self.entities.len(),
                self.includes.len()
            )));
        }
        for (idx, children) in self.includes.iter().enumerate() {
            if let Some(bad) = children.iter().find(|&&c| c >= self.entities.len()) {
                return Err(Error::invalid_markup(format!(
                    "entity {} includes unknown entity {}",
                    idx, bad
                )));
            }
        }
        let char_len = self.text.chars().count();
        for (idx, entity) in self.entities.iter().enumerate() {
            if entity.is_empty() {
                return Err(Error::invalid_markup(format!("entity {} has no spans", idx)));
            }
            if let Some(span) = entity.iter().find(|s| s.end > char_len || s.start > char_len) {
                return Err(Error::invalid_markup(format!(
                    "span {} of entity {} is outside the text ({} chars)",
                    span, idx, char_len
                )));
            }
        }
        Ok(())
    }

    /// Char-indexed view of the text.
    #[must_use]
    pub fn char_text(&self) -> CharText<'_> {
        CharText::new(&self.text)
    }

    /// Every span of every entity.
    #[must_use]
    pub fn spans(&self) -> BTreeSet<Span> {
        self.entities.iter().flatten().copied().collect()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when there are no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether two versions annotate the same text.
    #[must_use]
    pub fn same_text(&self, other: &Markup) -> bool {
        self.text == other.text
    }

    fn normalize_includes(&mut self) {
        if self.includes.len() < self.entities.len() {
            self.includes.resize(self.entities.len(), Vec::new());
        }
    }
}
