//! Error types for the `odinson-doc` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Violations of the sentence and field invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A sentence carried no tokens field at all.
    #[error("sentence has no tokens fields")]
    MissingTokens,

    /// Tokens fields within one sentence disagree on their length.
    #[error("tokens fields disagree on length: found {counts:?}")]
    FieldCountMismatch {
        /// The distinct lengths found, in ascending order.
        counts: Vec<usize>,
    },

    /// A token attribute is missing from some of the tokens.
    #[error("attribute '{attribute}' present on {found} of {expected} tokens")]
    InconsistentAttributeLength {
        /// The attribute name.
        attribute: String,
        /// The number of tokens in the sentence.
        expected: usize,
        /// The number of tokens carrying the attribute.
        found: usize,
    },

    /// The wire `numTokens` disagrees with the tokens fields.
    #[error("declared numTokens ({declared}) does not match tokens fields ({actual})")]
    DeclaredTokenCount {
        /// The count read from the wire.
        declared: usize,
        /// The count computed from the tokens fields.
        actual: usize,
    },

    /// A nested field exceeds the accepted nesting depth.
    #[error("field '{name}' nests {depth} levels deep (max {max})")]
    NestingTooDeep {
        /// Name of the outermost field.
        name: String,
        /// Depth found.
        depth: usize,
        /// Maximum accepted depth.
        max: usize,
    },
}

/// Errors produced while building, loading, or querying documents.
#[derive(Debug, Error)]
pub enum DocError {
    /// A wire document or field could not be decoded.
    #[error("Decode error at '{path}': {message}")]
    Decode {
        /// Path of the offending value, e.g. `sentences[0].fields[2]`.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A document could not be serialized.
    #[error("Encode error: {message}")]
    Encode {
        /// A description of the failure.
        message: String,
    },

    /// A sentence or field broke a structural invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A token index fell outside the sentence.
    #[error("token index {index} out of range for sentence of {len} tokens")]
    Bounds {
        /// The requested index.
        index: usize,
        /// The sentence length.
        len: usize,
    },

    /// Reading or writing a document file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A convenience result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
