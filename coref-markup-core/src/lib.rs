//! # coref-markup-core
//!
//! Core types shared by every coref-markup tool.
//!
//! This crate provides:
//! - **Spans**: `Span`, half-open character-offset intervals
//! - **Text access**: `CharText`, O(1) character-offset slicing
//! - **Documents**: `Markup`, `DiffEntry`, the JSON markup format
//! - **Graph model**: `EntityGraph`, entities with parent/child includes links

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod markup;
pub mod span;
pub mod text;

pub use error::{Error, Result};
pub use graph::{EntityGraph, EntityId, EntityKind, EntityNode, NestingPolicy};
pub use markup::{DiffEntry, Markup};
pub use span::Span;
pub use text::CharText;
