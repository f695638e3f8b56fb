//! Structural content hashing.
//!
//! Every [`Field`](crate::Field), [`Sentence`](crate::Sentence) and
//! [`Document`](crate::Document) hashes to a [`ContentDigest`] computed over
//! its normalized content, so two independently built values with the same
//! structure always produce the same digest.

use std::fmt;

use sha2::{Digest, Sha256};

/// A SHA-256 digest over an entity's normalized content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Incremental hasher with an unambiguous framing for each written value.
///
/// Strings and sequences are length-prefixed so that adjacent values cannot
/// run into each other (`["ab", "c"]` and `["a", "bc"]` hash differently).
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_tag(&mut self, tag: u8) {
        self.inner.update([tag]);
    }

    pub fn write_len(&mut self, len: usize) {
        self.inner.update((len as u64).to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.inner.update(value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.inner.update(value.to_bits().to_le_bytes());
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.inner.update(value.as_bytes());
    }

    pub fn write_digest(&mut self, digest: &ContentDigest) {
        self.inner.update(digest.as_bytes());
    }

    pub fn finish(self) -> ContentDigest {
        ContentDigest(self.inner.finalize().into())
    }
}

/// Types with a deterministic structural hash.
pub trait ContentHash {
    /// Feed this value's normalized content into `hasher`.
    fn hash_content(&self, hasher: &mut ContentHasher);

    /// Compute the digest of this value alone.
    fn content_hash(&self) -> ContentDigest {
        let mut hasher = ContentHasher::new();
        self.hash_content(&mut hasher);
        hasher.finish()
    }
}
