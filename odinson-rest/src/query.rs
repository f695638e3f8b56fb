//! Pattern queries and result cursors.

use serde::{Deserialize, Serialize};

use crate::responses::ScoreDoc;

/// The fixed parameters of one logical pattern query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternQuery {
    /// An Odinson pattern, e.g. `[lemma=pie] []`.
    pub pattern: String,
    /// Filter applied to document metadata before the pattern runs.
    pub metadata_query: Option<String>,
    /// Label used when committing mentions to the index state.
    pub label: Option<String>,
    /// Commit the results to the index state.
    ///
    /// Committing mutates the remote index. Two committing queries running
    /// concurrently against one index are not serialized by this client;
    /// ordering them is the caller's responsibility.
    pub commit: bool,
}

impl PatternQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), metadata_query: None, label: None, commit: false }
    }

    pub fn with_metadata_query(mut self, metadata_query: impl Into<String>) -> Self {
        self.metadata_query = Some(metadata_query.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    /// Query-string parameters for one page request.
    ///
    /// Unset options and `commit = false` are omitted; `prevDoc` and
    /// `prevScore` are sent only with a cursor.
    pub fn to_params(&self, cursor: Option<&Cursor>) -> Vec<(&'static str, String)> {
        let mut params = vec![("odinsonQuery", self.pattern.clone())];
        if let Some(metadata_query) = &self.metadata_query {
            params.push(("metadataQuery", metadata_query.clone()));
        }
        if let Some(label) = &self.label {
            params.push(("label", label.clone()));
        }
        if self.commit {
            params.push(("commit", "true".to_string()));
        }
        if let Some(cursor) = cursor {
            params.push(("prevDoc", cursor.sentence_id.to_string()));
            params.push(("prevScore", cursor.score.to_string()));
        }
        params
    }
}

/// Identity of the last-seen match; the next page starts after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub sentence_id: u64,
    pub score: f32,
}

impl From<&ScoreDoc> for Cursor {
    fn from(doc: &ScoreDoc) -> Self {
        Self { sentence_id: doc.sentence_id, score: doc.score }
    }
}
