//! Odinson document model.
//!
//! This crate provides:
//! - [`Field`] — the closed set of typed annotations (tokens, graph, string,
//!   date, number, nested) with their `$type`-tagged wire format
//! - [`Sentence`] — validated token sequences with a derived per-token view
//! - [`Document`] — sentences plus metadata, loadable from plain or gzipped JSON
//! - [`ContentHash`] — deterministic structural hashing for all three
//!
//! # Example
//!
//! ```rust
//! use odinson_doc::{ContentHash, Document, Field, Sentence};
//!
//! let sentence = Sentence::from_fields(vec![
//!     Field::tokens("word", vec!["Rain".into(), "fell".into()]),
//!     Field::tokens("lemma", vec!["rain".into(), "fall".into()]),
//! ])?;
//! let doc = Document::new("doc-1", vec![Field::string("source", "wire")], vec![sentence]);
//!
//! assert_eq!(doc.sentences()[0].token_at(1)?["lemma"], "fall");
//! assert_eq!(doc.content_hash(), doc.copy().build().content_hash());
//! # Ok::<(), odinson_doc::DocError>(())
//! ```

pub mod document;
pub mod error;
pub mod field;
pub mod hash;
pub mod sentence;

pub use document::{AttributeView, Document, DocumentCopy};
pub use error::{DocError, Result, ValidationError};
pub use field::{
    DateField, Edge, Field, FieldType, GraphField, MAX_NESTING_DEPTH, NestedField, NumberField,
    StringField, TokensField,
};
pub use hash::{ContentDigest, ContentHash, ContentHasher};
pub use sentence::{Sentence, Token, validate_fields};
