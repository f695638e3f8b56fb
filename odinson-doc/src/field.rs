//! Typed annotation fields attached to sentences and documents.
//!
//! On the wire each field is a JSON object tagged by a `$type` discriminator
//! naming the variant, e.g.
//!
//! ```json
//! {"$type": "ai.lum.odinson.TokensField", "name": "word", "tokens": ["Rain", "fell"]}
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DocError, Result, ValidationError};
use crate::hash::{ContentHash, ContentHasher};

/// Maximum nesting depth of a [`Field`], enforced when sentences are built
/// and when documents are encoded or decoded.
///
/// A field at this depth stays within the JSON parser's recursion limit, so
/// anything this crate writes it can read back.
pub const MAX_NESTING_DEPTH: usize = 32;

/// The variant tag of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "ai.lum.odinson.TokensField")]
    Tokens,
    #[serde(rename = "ai.lum.odinson.GraphField")]
    Graph,
    #[serde(rename = "ai.lum.odinson.StringField")]
    String,
    #[serde(rename = "ai.lum.odinson.DateField")]
    Date,
    #[serde(rename = "ai.lum.odinson.NumberField")]
    Number,
    #[serde(rename = "ai.lum.odinson.NestedField")]
    Nested,
}

impl FieldType {
    /// The fully-qualified `$type` discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Tokens => "ai.lum.odinson.TokensField",
            FieldType::Graph => "ai.lum.odinson.GraphField",
            FieldType::String => "ai.lum.odinson.StringField",
            FieldType::Date => "ai.lum.odinson.DateField",
            FieldType::Number => "ai.lum.odinson.NumberField",
            FieldType::Nested => "ai.lum.odinson.NestedField",
        }
    }

    fn hash_tag(self) -> u8 {
        match self {
            FieldType::Tokens => 1,
            FieldType::Graph => 2,
            FieldType::String => 3,
            FieldType::Date => 4,
            FieldType::Number => 5,
            FieldType::Nested => 6,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum Field {
    #[serde(rename = "ai.lum.odinson.TokensField")]
    Tokens(TokensField),
    #[serde(rename = "ai.lum.odinson.GraphField")]
    Graph(GraphField),
    #[serde(rename = "ai.lum.odinson.StringField")]
    String(StringField),
    #[serde(rename = "ai.lum.odinson.DateField")]
    Date(DateField),
    #[serde(rename = "ai.lum.odinson.NumberField")]
    Number(NumberField),
    #[serde(rename = "ai.lum.odinson.NestedField")]
    Nested(NestedField),
}

/// An ordered token attribute, one entry per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensField {
    pub name: String,
    pub tokens: Vec<String>,
}

/// A directed, labeled edge between two token indices.
///
/// Serialized as the triple `[from, to, label]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(usize, usize, String)", into = "(usize, usize, String)")]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

impl Edge {
    pub fn new(from: usize, to: usize, label: impl Into<String>) -> Self {
        Self { from, to, label: label.into() }
    }
}

impl From<(usize, usize, String)> for Edge {
    fn from((from, to, label): (usize, usize, String)) -> Self {
        Self { from, to, label }
    }
}

impl From<Edge> for (usize, usize, String) {
    fn from(edge: Edge) -> Self {
        (edge.from, edge.to, edge.label)
    }
}

/// A dependency-style graph over a sentence's tokens.
///
/// Equality and hashing treat `edges` as an unordered collection; the wire
/// order is kept as given. `roots` are compared in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphField {
    pub name: String,
    pub edges: Vec<Edge>,
    pub roots: Vec<usize>,
}

impl GraphField {
    /// Edges in canonical (sorted) order.
    pub fn sorted_edges(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.iter().collect();
        edges.sort();
        edges
    }

    /// Edges leaving token `index`.
    pub fn outgoing(&self, index: usize) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.from == index)
    }

    /// Edges entering token `index`.
    pub fn incoming(&self, index: usize) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to == index)
    }
}

impl PartialEq for GraphField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.roots == other.roots
            && self.edges.len() == other.edges.len()
            && self.sorted_edges() == other.sorted_edges()
    }
}

impl Eq for GraphField {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringField {
    pub name: String,
    pub string: String,
}

/// A date-valued field. The value is kept verbatim; see [`DateField::parsed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateField {
    pub name: String,
    pub date: String,
}

impl DateField {
    /// Parse the value as a calendar date: `YYYY-MM-DD`, RFC 3339, or a
    /// datetime without an offset such as `2020-01-02T10:00:00`.
    pub fn parsed(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }
}

/// A numeric field. Equality compares the bit pattern of `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberField {
    pub name: String,
    pub value: f64,
}

impl PartialEq for NumberField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value.to_bits() == other.value.to_bits()
    }
}

impl Eq for NumberField {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedField {
    pub name: String,
    pub fields: Vec<Field>,
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| value.parse::<NaiveDateTime>().ok().map(|dt| dt.date()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok().map(|dt| dt.date())
        })
}

impl Field {
    pub fn tokens(name: impl Into<String>, tokens: Vec<String>) -> Self {
        Field::Tokens(TokensField { name: name.into(), tokens })
    }

    pub fn graph(name: impl Into<String>, edges: Vec<Edge>, roots: Vec<usize>) -> Self {
        Field::Graph(GraphField { name: name.into(), edges, roots })
    }

    pub fn string(name: impl Into<String>, string: impl Into<String>) -> Self {
        Field::String(StringField { name: name.into(), string: string.into() })
    }

    pub fn date(name: impl Into<String>, date: impl Into<String>) -> Self {
        Field::Date(DateField { name: name.into(), date: date.into() })
    }

    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Field::Number(NumberField { name: name.into(), value })
    }

    pub fn nested(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Field::Nested(NestedField { name: name.into(), fields })
    }

    /// Build a metadata field from an untyped JSON value.
    ///
    /// Strings become [`DateField`]s when they parse as a date and
    /// [`StringField`]s otherwise. Numbers become [`NumberField`]s, booleans
    /// are stored as strings, arrays of strings become [`TokensField`]s, and
    /// other arrays or objects become [`NestedField`]s whose children are
    /// named by index or key.
    pub fn from_untyped(name: impl Into<String>, value: &Value) -> Result<Self> {
        let name = name.into();
        match value {
            Value::String(s) => {
                if parse_date(s).is_some() {
                    Ok(Field::date(name, s.clone()))
                } else {
                    Ok(Field::string(name, s.clone()))
                }
            }
            Value::Number(n) => match n.as_f64() {
                Some(v) => Ok(Field::number(name, v)),
                None => Err(DocError::Decode {
                    path: name,
                    message: format!("number {n} is not representable as f64"),
                }),
            },
            Value::Bool(b) => Ok(Field::string(name, b.to_string())),
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    let tokens =
                        items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                    return Ok(Field::tokens(name, tokens));
                }
                let fields = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Field::from_untyped(i.to_string(), v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Field::nested(name, fields))
            }
            Value::Object(map) => {
                let fields = map
                    .iter()
                    .map(|(k, v)| Field::from_untyped(k.clone(), v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Field::nested(name, fields))
            }
            Value::Null => Err(DocError::Decode {
                path: name,
                message: "null has no field representation".to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Tokens(f) => &f.name,
            Field::Graph(f) => &f.name,
            Field::String(f) => &f.name,
            Field::Date(f) => &f.name,
            Field::Number(f) => &f.name,
            Field::Nested(f) => &f.name,
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Tokens(_) => FieldType::Tokens,
            Field::Graph(_) => FieldType::Graph,
            Field::String(_) => FieldType::String,
            Field::Date(_) => FieldType::Date,
            Field::Number(_) => FieldType::Number,
            Field::Nested(_) => FieldType::Nested,
        }
    }

    pub fn as_tokens(&self) -> Option<&TokensField> {
        match self {
            Field::Tokens(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&GraphField> {
        match self {
            Field::Graph(f) => Some(f),
            _ => None,
        }
    }

    /// Nesting depth: 1 for leaf variants, one more than the deepest child
    /// for [`NestedField`].
    pub fn depth(&self) -> usize {
        let mut deepest = 1;
        let mut stack: Vec<(&Field, usize)> = vec![(self, 1)];
        while let Some((field, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Field::Nested(nested) = field {
                stack.extend(nested.fields.iter().map(|f| (f, depth + 1)));
            }
        }
        deepest
    }

    pub(crate) fn check_depth(&self) -> std::result::Result<(), ValidationError> {
        let depth = self.depth();
        if depth > MAX_NESTING_DEPTH {
            return Err(ValidationError::NestingTooDeep {
                name: self.name().to_string(),
                depth,
                max: MAX_NESTING_DEPTH,
            });
        }
        Ok(())
    }
}

impl ContentHash for Field {
    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_tag(self.field_type().hash_tag());
        hasher.write_str(self.name());
        match self {
            Field::Tokens(f) => {
                hasher.write_len(f.tokens.len());
                for token in &f.tokens {
                    hasher.write_str(token);
                }
            }
            Field::Graph(f) => {
                let edges = f.sorted_edges();
                hasher.write_len(edges.len());
                for edge in edges {
                    hasher.write_u64(edge.from as u64);
                    hasher.write_u64(edge.to as u64);
                    hasher.write_str(&edge.label);
                }
                hasher.write_len(f.roots.len());
                for root in &f.roots {
                    hasher.write_u64(*root as u64);
                }
            }
            Field::String(f) => hasher.write_str(&f.string),
            Field::Date(f) => hasher.write_str(&f.date),
            Field::Number(f) => hasher.write_f64(f.value),
            Field::Nested(f) => {
                hasher.write_len(f.fields.len());
                for child in &f.fields {
                    hasher.write_digest(&child.content_hash());
                }
            }
        }
    }
}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_hash().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_each_discriminator() {
        let cases = [
            (
                json!({"$type": "ai.lum.odinson.TokensField", "name": "word", "tokens": ["a"]}),
                FieldType::Tokens,
            ),
            (
                json!({
                    "$type": "ai.lum.odinson.GraphField",
                    "name": "deps",
                    "edges": [[1, 0, "nsubj"]],
                    "roots": [1]
                }),
                FieldType::Graph,
            ),
            (
                json!({"$type": "ai.lum.odinson.StringField", "name": "title", "string": "x"}),
                FieldType::String,
            ),
            (
                json!({"$type": "ai.lum.odinson.DateField", "name": "when", "date": "2020-01-02"}),
                FieldType::Date,
            ),
            (
                json!({"$type": "ai.lum.odinson.NumberField", "name": "year", "value": 2020.0}),
                FieldType::Number,
            ),
            (
                json!({"$type": "ai.lum.odinson.NestedField", "name": "author", "fields": []}),
                FieldType::Nested,
            ),
        ];
        for (value, expected) in cases {
            let field: Field = serde_json::from_value(value.clone()).unwrap();
            assert_eq!(field.field_type(), expected);
            assert_eq!(serde_json::to_value(&field).unwrap(), value);
        }
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let value = json!({"$type": "ai.lum.odinson.BogusField", "name": "x"});
        assert!(serde_json::from_value::<Field>(value).is_err());
    }

    #[test]
    fn graph_edges_serialize_as_triples_in_given_order() {
        let field = Field::graph(
            "deps",
            vec![Edge::new(2, 0, "det"), Edge::new(1, 2, "nsubj")],
            vec![1],
        );
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["edges"], json!([[2, 0, "det"], [1, 2, "nsubj"]]));
    }

    #[test]
    fn graph_equality_ignores_edge_order_but_not_roots() {
        let a = Field::graph("deps", vec![Edge::new(0, 1, "a"), Edge::new(1, 2, "b")], vec![0]);
        let b = Field::graph("deps", vec![Edge::new(1, 2, "b"), Edge::new(0, 1, "a")], vec![0]);
        let c = Field::graph("deps", vec![Edge::new(1, 2, "b"), Edge::new(0, 1, "a")], vec![1]);
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a, c);
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn empty_graph_is_valid() {
        let field: Field = serde_json::from_value(
            json!({"$type": "ai.lum.odinson.GraphField", "name": "deps", "edges": [], "roots": []}),
        )
        .unwrap();
        let graph = field.as_graph().unwrap();
        assert!(graph.edges.is_empty());
        assert!(graph.roots.is_empty());
    }

    #[test]
    fn hash_distinguishes_variant_with_same_payload() {
        let s = Field::string("when", "2020-01-01");
        let d = Field::date("when", "2020-01-01");
        assert_ne!(s.content_hash(), d.content_hash());
    }

    #[test]
    fn untyped_date_falls_back_to_string() {
        let date = Field::from_untyped("pubdate", &json!("2021-03-04")).unwrap();
        assert_eq!(date.field_type(), FieldType::Date);
        let text = Field::from_untyped("pubdate", &json!("sometime in March")).unwrap();
        assert_eq!(text.field_type(), FieldType::String);
    }

    #[test]
    fn untyped_object_becomes_nested() {
        let field =
            Field::from_untyped("author", &json!({"first": "Ada", "born": 1815})).unwrap();
        let Field::Nested(nested) = &field else { panic!("expected nested field") };
        assert_eq!(nested.fields.len(), 2);
        assert_eq!(nested.fields[0], Field::number("born", 1815.0));
        assert_eq!(nested.fields[1], Field::string("first", "Ada"));
        assert!(Field::from_untyped("x", &Value::Null).is_err());
    }

    #[test]
    fn date_parses_rfc3339() {
        let Field::Date(d) = Field::date("d", "2019-12-31T23:00:00Z") else { unreachable!() };
        assert_eq!(d.parsed(), NaiveDate::from_ymd_opt(2019, 12, 31));
    }

    #[test]
    fn offsetless_datetime_is_a_date() {
        let field = Field::from_untyped("pubdate", &json!("2020-01-02T10:00:00")).unwrap();
        let Field::Date(d) = &field else { panic!("expected date field, got {field:?}") };
        assert_eq!(d.parsed(), NaiveDate::from_ymd_opt(2020, 1, 2));

        let spaced = Field::date("d", "2020-01-02 10:00:00");
        let Field::Date(d) = &spaced else { unreachable!() };
        assert_eq!(d.parsed(), NaiveDate::from_ymd_opt(2020, 1, 2));
    }

    #[test]
    fn depth_check_trips_past_the_limit() {
        let mut field = Field::string("leaf", "x");
        for i in 0..MAX_NESTING_DEPTH - 1 {
            field = Field::nested(format!("level{i}"), vec![field]);
        }
        assert_eq!(field.depth(), MAX_NESTING_DEPTH);
        assert!(field.check_depth().is_ok());

        let deeper = Field::nested("top", vec![field]);
        assert_eq!(
            deeper.check_depth(),
            Err(ValidationError::NestingTooDeep {
                name: "top".to_string(),
                depth: MAX_NESTING_DEPTH + 1,
                max: MAX_NESTING_DEPTH,
            })
        );
    }

    #[test]
    fn depth_counts_nesting_levels() {
        let mut field = Field::string("leaf", "x");
        for i in 0..5 {
            field = Field::nested(format!("level{i}"), vec![field]);
        }
        assert_eq!(field.depth(), 6);
        assert!(field.check_depth().is_ok());
    }
}
