//! Documents: ordered sentences plus document-level metadata.

use std::collections::BTreeMap;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DocError, Result, ValidationError};
use crate::field::{Field, FieldType};
use crate::hash::{ContentHash, ContentHasher};
use crate::sentence::Sentence;

/// Stands in for the metadata hashes of a document without metadata.
const EMPTY_METADATA_SENTINEL: u8 = 0xff;

/// Attribute name → one token-value vector per sentence.
///
/// A sentence without the attribute contributes an empty vector, so the
/// outer index always equals the sentence index.
pub type AttributeView = BTreeMap<String, Vec<Vec<String>>>;

/// An Odinson document.
///
/// The document owns its metadata and sentences. The aggregate
/// [`AttributeView`] is derived at construction and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DocumentRepr", into = "DocumentRepr")]
pub struct Document {
    id: String,
    metadata: Vec<Field>,
    sentences: Vec<Sentence>,
    attributes: AttributeView,
}

#[derive(Serialize, Deserialize)]
struct DocumentRepr {
    id: String,
    #[serde(default)]
    metadata: Vec<Field>,
    sentences: Vec<Sentence>,
}

impl TryFrom<DocumentRepr> for Document {
    type Error = DocError;

    fn try_from(repr: DocumentRepr) -> Result<Self> {
        check_metadata_depth(&repr.metadata)?;
        Ok(Document::new(repr.id, repr.metadata, repr.sentences))
    }
}

impl From<Document> for DocumentRepr {
    fn from(doc: Document) -> Self {
        DocumentRepr { id: doc.id, metadata: doc.metadata, sentences: doc.sentences }
    }
}

/// Sentence fields are checked when the sentence is built; metadata is
/// checked here, on every encode and decode.
fn check_metadata_depth(metadata: &[Field]) -> std::result::Result<(), ValidationError> {
    metadata.iter().try_for_each(Field::check_depth)
}

fn encode_error(path: &Path, e: serde_json::Error) -> DocError {
    if e.is_io() {
        DocError::Io { path: path.to_path_buf(), source: e.into() }
    } else {
        DocError::Encode { message: e.to_string() }
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn derive_attributes(sentences: &[Sentence]) -> AttributeView {
    let mut names: Vec<&str> = Vec::new();
    for sentence in sentences {
        for name in sentence.attribute_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names
        .into_iter()
        .map(|name| {
            let per_sentence = sentences
                .iter()
                .map(|s| s.tokens_for(name).map(|f| f.tokens.clone()).unwrap_or_default())
                .collect();
            (name.to_string(), per_sentence)
        })
        .collect()
}

impl Document {
    pub fn new(id: impl Into<String>, metadata: Vec<Field>, sentences: Vec<Sentence>) -> Self {
        let attributes = derive_attributes(&sentences);
        Self { id: id.into(), metadata, sentences, attributes }
    }

    /// Load a document from a JSON file, gunzipping when the path ends in `.gz`.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::Io`] if the file cannot be opened and
    /// [`DocError::Decode`] naming the offending path if its content is not a
    /// valid document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|source| DocError::Io { path: path.to_path_buf(), source })?;
        let gzip = is_gzip(path);
        debug!(path = %path.display(), gzip, "loading odinson document");

        if gzip {
            Self::from_reader(GzDecoder::new(BufReader::new(file)))
        } else {
            Self::from_reader(BufReader::new(file))
        }
    }

    /// Decode a document from any JSON byte stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_reader(reader);
        let doc = decode(&mut de)?;
        de.end().map_err(|e| DocError::Decode { path: ".".to_string(), message: e.to_string() })?;
        Ok(doc)
    }

    /// Decode a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_str(json);
        let doc = decode(&mut de)?;
        de.end().map_err(|e| DocError::Decode { path: ".".to_string(), message: e.to_string() })?;
        Ok(doc)
    }

    /// Encode the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NestingTooDeep`] if a metadata field nests
    /// past [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH), since such a
    /// document could not be decoded again.
    pub fn to_json(&self) -> Result<String> {
        check_metadata_depth(&self.metadata)?;
        serde_json::to_string(self).map_err(|e| DocError::Encode { message: e.to_string() })
    }

    /// Write the document as JSON, gzip-compressed when the path ends in `.gz`.
    ///
    /// Applies the same depth check as [`Document::to_json`] before the file
    /// is created.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        check_metadata_depth(&self.metadata)?;
        let path = path.as_ref();
        let io_err = |source| DocError::Io { path: path.to_path_buf(), source };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        if is_gzip(path) {
            let mut encoder = GzEncoder::new(&mut writer, Compression::default());
            serde_json::to_writer(&mut encoder, self).map_err(|e| encode_error(path, e))?;
            encoder.finish().map_err(io_err)?;
        } else {
            serde_json::to_writer(&mut writer, self).map_err(|e| encode_error(path, e))?;
        }
        writer.flush().map_err(io_err)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metadata(&self) -> &[Field] {
        &self.metadata
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// The derived aggregate view over all sentences.
    pub fn attributes(&self) -> &AttributeView {
        &self.attributes
    }

    /// Per-sentence token values for one attribute.
    pub fn attribute(&self, name: &str) -> Option<&[Vec<String>]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// Total number of tokens across all sentences.
    pub fn num_tokens(&self) -> usize {
        self.sentences.iter().map(Sentence::num_tokens).sum()
    }

    /// Every metadata field named `name`, in order. Empty if none match.
    pub fn metadata_by_name(&self, name: &str) -> Vec<&Field> {
        self.metadata.iter().filter(|f| f.name() == name).collect()
    }

    /// Every metadata field of the given type, in order. Empty if none match.
    pub fn metadata_by_type(&self, field_type: FieldType) -> Vec<&Field> {
        self.metadata.iter().filter(|f| f.field_type() == field_type).collect()
    }

    /// Start a copy of this document. Attributes not overridden on the
    /// returned builder keep their current values.
    pub fn copy(&self) -> DocumentCopy<'_> {
        DocumentCopy { source: self, id: None, metadata: None, sentences: None }
    }
}

fn decode<'de, D>(de: D) -> Result<Document>
where
    D: serde::Deserializer<'de>,
{
    serde_path_to_error::deserialize(de).map_err(|e| DocError::Decode {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}

/// Field-wise override builder returned by [`Document::copy`].
#[derive(Debug)]
pub struct DocumentCopy<'a> {
    source: &'a Document,
    id: Option<String>,
    metadata: Option<Vec<Field>>,
    sentences: Option<Vec<Sentence>>,
}

impl DocumentCopy<'_> {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn metadata(mut self, metadata: Vec<Field>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn sentences(mut self, sentences: Vec<Sentence>) -> Self {
        self.sentences = Some(sentences);
        self
    }

    /// Build the copy. The attribute view is re-derived only when the
    /// sentences were replaced.
    pub fn build(self) -> Document {
        let id = self.id.unwrap_or_else(|| self.source.id.clone());
        let metadata = self.metadata.unwrap_or_else(|| self.source.metadata.clone());
        match self.sentences {
            Some(sentences) => Document::new(id, metadata, sentences),
            None => Document {
                id,
                metadata,
                sentences: self.source.sentences.clone(),
                attributes: self.source.attributes.clone(),
            },
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.metadata == other.metadata && self.sentences == other.sentences
    }
}

impl Eq for Document {}

impl ContentHash for Document {
    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(&self.id);
        if self.metadata.is_empty() {
            hasher.write_tag(EMPTY_METADATA_SENTINEL);
        } else {
            hasher.write_len(self.metadata.len());
            for field in &self.metadata {
                hasher.write_digest(&field.content_hash());
            }
        }
        hasher.write_len(self.sentences.len());
        for sentence in &self.sentences {
            hasher.write_digest(&sentence.content_hash());
        }
    }
}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_hash().hash(state);
    }
}
