//! Sentences: an ordered token sequence plus its fields.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{DocError, Result, ValidationError};
use crate::field::{Field, GraphField, TokensField};
use crate::hash::{ContentHash, ContentHasher};

/// One token's attributes, keyed by tokens-field name.
pub type Token = BTreeMap<String, String>;

/// Check that `fields` hold at least one tokens field and that all tokens
/// fields agree on their length. Returns that length.
pub fn validate_fields(fields: &[Field]) -> std::result::Result<usize, ValidationError> {
    let counts: BTreeSet<usize> =
        fields.iter().filter_map(Field::as_tokens).map(|f| f.tokens.len()).collect();
    match counts.len() {
        0 => Err(ValidationError::MissingTokens),
        1 => Ok(counts.into_iter().next().unwrap_or_default()),
        _ => Err(ValidationError::FieldCountMismatch { counts: counts.into_iter().collect() }),
    }
}

/// A validated sentence.
///
/// Every tokens field in `fields` holds exactly `num_tokens` entries. The
/// per-token view is derived once at construction; with duplicate field
/// names the first tokens field of that name supplies the token attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SentenceRepr", into = "SentenceRepr")]
pub struct Sentence {
    num_tokens: usize,
    fields: Vec<Field>,
    tokens: Vec<Token>,
}

#[derive(Serialize, Deserialize)]
struct SentenceRepr {
    #[serde(rename = "numTokens")]
    num_tokens: usize,
    fields: Vec<Field>,
}

impl TryFrom<SentenceRepr> for Sentence {
    type Error = DocError;

    fn try_from(repr: SentenceRepr) -> Result<Self> {
        let sentence = Sentence::from_fields(repr.fields)?;
        if sentence.num_tokens != repr.num_tokens {
            return Err(ValidationError::DeclaredTokenCount {
                declared: repr.num_tokens,
                actual: sentence.num_tokens,
            }
            .into());
        }
        Ok(sentence)
    }
}

impl From<Sentence> for SentenceRepr {
    fn from(sentence: Sentence) -> Self {
        SentenceRepr { num_tokens: sentence.num_tokens, fields: sentence.fields }
    }
}

impl Sentence {
    /// Build a sentence from its fields, validating token counts first.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingTokens`] when no tokens field is
    /// present and [`ValidationError::FieldCountMismatch`] when tokens
    /// fields disagree on length, and [`ValidationError::NestingTooDeep`]
    /// for a field nested past [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).
    pub fn from_fields(fields: Vec<Field>) -> Result<Self> {
        for field in &fields {
            field.check_depth()?;
        }
        let num_tokens = validate_fields(&fields)?;
        let tokens = pivot(num_tokens, &fields);
        Ok(Self { num_tokens, fields, tokens })
    }

    /// Build a sentence from token records, one tokens field per attribute.
    ///
    /// Attribute fields are emitted in attribute-name order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InconsistentAttributeLength`] if an
    /// attribute is missing from some tokens, and
    /// [`ValidationError::MissingTokens`] for an empty token list.
    pub fn from_tokens(tokens: &[Token]) -> Result<Self> {
        let attributes: BTreeSet<&str> =
            tokens.iter().flat_map(|t| t.keys().map(String::as_str)).collect();

        let mut fields = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            let values: Vec<String> =
                tokens.iter().filter_map(|t| t.get(attribute).cloned()).collect();
            if values.len() != tokens.len() {
                return Err(ValidationError::InconsistentAttributeLength {
                    attribute: attribute.to_string(),
                    expected: tokens.len(),
                    found: values.len(),
                }
                .into());
            }
            fields.push(Field::tokens(attribute, values));
        }
        Self::from_fields(fields)
    }

    /// A new sentence over `fields`; the token count is recomputed.
    pub fn copy(&self, fields: Vec<Field>) -> Result<Self> {
        Self::from_fields(fields)
    }

    pub fn num_tokens(&self) -> usize {
        self.num_tokens
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The derived per-token view.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The attributes of token `index`.
    pub fn token_at(&self, index: usize) -> Result<&Token> {
        self.tokens.get(index).ok_or(DocError::Bounds { index, len: self.num_tokens })
    }

    /// Every field named `name`, in order.
    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.name() == name)
    }

    /// The first tokens field named `name`.
    pub fn tokens_for(&self, name: &str) -> Option<&TokensField> {
        self.fields.iter().filter_map(Field::as_tokens).find(|f| f.name == name)
    }

    /// The first graph field named `name`.
    pub fn graph(&self, name: &str) -> Option<&GraphField> {
        self.fields.iter().filter_map(Field::as_graph).find(|f| f.name == name)
    }

    /// Distinct tokens-field names, in field order.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.fields
            .iter()
            .filter_map(Field::as_tokens)
            .map(|f| f.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Surface words: the `word` attribute, falling back to `raw`.
    pub fn words(&self) -> Option<&[String]> {
        self.tokens_for("word").or_else(|| self.tokens_for("raw")).map(|f| f.tokens.as_slice())
    }
}

fn pivot(num_tokens: usize, fields: &[Field]) -> Vec<Token> {
    let mut tokens = vec![Token::new(); num_tokens];
    for field in fields.iter().filter_map(Field::as_tokens) {
        for (token, value) in tokens.iter_mut().zip(&field.tokens) {
            token.entry(field.name.clone()).or_insert_with(|| value.clone());
        }
    }
    tokens
}

impl PartialEq for Sentence {
    fn eq(&self, other: &Self) -> bool {
        self.num_tokens == other.num_tokens && self.fields == other.fields
    }
}

impl Eq for Sentence {}

impl ContentHash for Sentence {
    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_u64(self.num_tokens as u64);
        hasher.write_len(self.fields.len());
        for field in &self.fields {
            hasher.write_digest(&field.content_hash());
        }
    }
}

impl Hash for Sentence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_hash().hash(state);
    }
}
