//! Response and request payloads of the Odinson REST API.

use serde::{Deserialize, Serialize};

/// One matched sentence returned by the pattern endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDoc {
    /// The index-internal id of the sentence.
    pub sentence_id: u64,
    /// The relevance score of the hit.
    pub score: f32,
    /// The parent document's id as provided at index time.
    pub document_id: String,
    /// The index of this sentence in its parent document (0-based).
    pub sentence_index: usize,
    /// Tokens of the sentence.
    pub words: Vec<String>,
    /// The matching spans within this sentence.
    pub matches: Vec<OdinsonMatch>,
}

impl ScoreDoc {
    /// The space-joined words covered by each match, in match order.
    ///
    /// Spans reaching past the end of `words` are clipped.
    pub fn spans(&self) -> impl Iterator<Item = String> + '_ {
        self.matches.iter().map(|m| {
            let end = m.end().min(self.words.len());
            let start = m.start().min(end);
            self.words[start..end].join(" ")
        })
    }
}

/// A match span, optionally carrying named captures or an event trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OdinsonMatch {
    Event(EventMatch),
    NamedCaptures(NamedCaptureMatch),
    Base(BaseMatch),
}

impl OdinsonMatch {
    /// Inclusive start token index.
    pub fn start(&self) -> usize {
        match self {
            OdinsonMatch::Event(m) => m.start,
            OdinsonMatch::NamedCaptures(m) => m.start,
            OdinsonMatch::Base(m) => m.start,
        }
    }

    /// Exclusive end token index.
    pub fn end(&self) -> usize {
        match self {
            OdinsonMatch::Event(m) => m.end,
            OdinsonMatch::NamedCaptures(m) => m.end,
            OdinsonMatch::Base(m) => m.end,
        }
    }

    pub fn named_captures(&self) -> &[NamedCapture] {
        match self {
            OdinsonMatch::Event(m) => &m.named_captures,
            OdinsonMatch::NamedCaptures(m) => &m.named_captures,
            OdinsonMatch::Base(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseMatch {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCaptureMatch {
    pub start: usize,
    pub end: usize,
    pub named_captures: Vec<NamedCapture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMatch {
    pub start: usize,
    pub end: usize,
    pub trigger: Box<OdinsonMatch>,
    pub named_captures: Vec<NamedCapture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCapture {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub captured_match: OdinsonMatch,
}

/// One page of pattern-query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    /// The pattern, echoed back.
    pub odinson_query: String,
    /// The metadata filter, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_query: Option<String>,
    /// Execution time in seconds.
    pub duration: f64,
    /// Total number of hits for the query, across all pages.
    pub total_hits: u64,
    /// This page's hits.
    pub score_docs: Vec<ScoreDoc>,
}

impl Results {
    /// A page with no hits, standing in for a failed request.
    pub fn empty(odinson_query: impl Into<String>, metadata_query: Option<String>) -> Self {
        Self {
            odinson_query: odinson_query.into(),
            metadata_query,
            duration: 0.0,
            total_hits: 0,
            score_docs: Vec::new(),
        }
    }
}

/// Error body returned by validation and ingest endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdinsonErrors {
    pub errors: Vec<String>,
}

/// Summary of the indexed corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusInfo {
    pub num_docs: u64,
    pub corpus: String,
    pub distinct_dependency_relations: u64,
    pub token_fields: Vec<String>,
    pub doc_fields: Vec<String>,
    pub stored_fields: Vec<String>,
}

/// A frequency entry from the statistics endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    /// A term such as a token value or rule name.
    pub term: String,
    /// A grouping term from a second token field (e.g. tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Number of occurrences, possibly scaled.
    pub frequency: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreqOrder {
    #[default]
    Freq,
    Alpha,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreqScale {
    #[default]
    Count,
    Log10,
    Percent,
}

/// Body of a rule-frequency request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFreqRequest {
    /// An Odinson grammar.
    pub grammar: String,
    /// Whether event arguments may overlap the event's trigger.
    pub allow_trigger_overlaps: bool,
    pub order: FreqOrder,
    /// Smallest rank to return; 0 is the highest ranked.
    pub min: usize,
    /// Highest rank to return.
    pub max: usize,
    pub scale: FreqScale,
    /// Reverse the rank order, e.g. to select the least frequent results.
    pub reverse: bool,
    pub pretty: bool,
}

impl RuleFreqRequest {
    pub fn new(grammar: impl Into<String>) -> Self {
        Self {
            grammar: grammar.into(),
            allow_trigger_overlaps: false,
            order: FreqOrder::default(),
            min: 0,
            max: 9,
            scale: FreqScale::default(),
            reverse: false,
            pretty: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_results_page_with_nested_matches() {
        let page: Results = serde_json::from_value(json!({
            "odinsonQuery": "[lemma=pie]",
            "duration": 0.01,
            "totalHits": 1,
            "scoreDocs": [{
                "sentenceId": 12,
                "score": 1.5,
                "documentId": "pie-review-7",
                "sentenceIndex": 0,
                "words": ["Ursula", "baked", "pies", "."],
                "matches": [
                    {"start": 2, "end": 3},
                    {"start": 0, "end": 3, "namedCaptures": [
                        {
                            "name": "agent",
                            "label": "Person",
                            "capturedMatch": {"start": 0, "end": 1}
                        }
                    ]},
                    {"start": 1, "end": 2, "trigger": {"start": 1, "end": 2}, "namedCaptures": []}
                ]
            }]
        }))
        .unwrap();

        assert!(page.metadata_query.is_none());
        let doc = &page.score_docs[0];
        assert!(matches!(doc.matches[0], OdinsonMatch::Base(_)));
        assert!(matches!(doc.matches[1], OdinsonMatch::NamedCaptures(_)));
        assert!(matches!(doc.matches[2], OdinsonMatch::Event(_)));
        assert_eq!(doc.matches[1].named_captures()[0].name, "agent");
        assert_eq!(doc.spans().collect::<Vec<_>>(), vec!["pies", "Ursula baked pies", "baked"]);
    }

    #[test]
    fn spans_clip_to_words() {
        let doc = ScoreDoc {
            sentence_id: 1,
            score: 0.0,
            document_id: "d".into(),
            sentence_index: 0,
            words: vec!["a".into(), "b".into()],
            matches: vec![OdinsonMatch::Base(BaseMatch { start: 1, end: 9 })],
        };
        assert_eq!(doc.spans().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn rule_freq_request_uses_wire_names() {
        let body = serde_json::to_value(RuleFreqRequest::new("rules: []")).unwrap();
        assert_eq!(body["allowTriggerOverlaps"], json!(false));
        assert_eq!(body["order"], json!("freq"));
        assert_eq!(body["scale"], json!("count"));
    }
}
