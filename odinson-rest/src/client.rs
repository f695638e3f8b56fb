//! HTTP client for the Odinson REST API.
//!
//! [`HttpOdinsonClient`] wraps a [`reqwest::Client`] and a base address.
//! Ingest, update, delete, validation and retrieval calls surface transport
//! and status failures as errors; the pattern search path degrades to an
//! empty page instead (see [`SearchBackend`]).

use std::sync::Arc;

use async_trait::async_trait;
use odinson_doc::{Document, Field, Sentence};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use crate::backend::SearchBackend;
use crate::config::ClientConfig;
use crate::error::{OdinsonError, Result};
use crate::pager::SearchPager;
use crate::query::{Cursor, PatternQuery};
use crate::responses::{CorpusInfo, OdinsonErrors, Results, RuleFreqRequest, Statistic};

/// Sent as `maxTokensPerSentence` when sentences are not capped.
const UNBOUNDED_TOKENS: &str = "-1";

/// A client for one Odinson REST API instance.
///
/// Cloning is cheap; clones share the underlying connection pool.
///
/// # Example
///
/// ```rust,ignore
/// use odinson_doc::Document;
/// use odinson_rest::HttpOdinsonClient;
///
/// let client = HttpOdinsonClient::from_address("http://localhost:9000")?;
/// client.index(&Document::from_file("doc.json.gz")?, None).await?;
/// println!("{} sentences indexed", client.numdocs().await?);
/// ```
#[derive(Debug, Clone)]
pub struct HttpOdinsonClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpOdinsonClient {
    /// Create a client from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| OdinsonError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a client for `address` with default settings.
    pub fn from_address(address: &str) -> Result<Self> {
        Self::new(ClientConfig::builder().address(address).build()?)
    }

    /// Create a client from `ODINSON_ADDRESS` / `ODINSON_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build an endpoint URL from path segments; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                OdinsonError::Config(format!("'{}' cannot be a base URL", self.config.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn max_tokens_segment(&self, max_tokens: Option<usize>) -> String {
        max_tokens
            .or(self.config.max_tokens_per_sentence)
            .map(|n| n.to_string())
            .unwrap_or_else(|| UNBOUNDED_TOKENS.to_string())
    }

    /// Send a request, mapping transport failures and non-success statuses to errors.
    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            error!(endpoint = %url, error = %e, "odinson request failed");
            OdinsonError::RemoteUnavailable { endpoint: url.to_string(), message: e.to_string() }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(endpoint = %url, %status, "odinson request succeeded");
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(endpoint = %url, error = %e, "failed to read error body");
                String::new()
            }
        };
        let errors = match serde_json::from_str::<OdinsonErrors>(&body) {
            Ok(parsed) => parsed.errors,
            Err(_) if body.trim().is_empty() => Vec::new(),
            Err(_) => vec![body],
        };
        error!(endpoint = %url, %status, ?errors, "odinson rejected request");
        Err(OdinsonError::RemoteRejected { status: status.as_u16(), errors })
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T> {
        response.json::<T>().await.map_err(|e| OdinsonError::InvalidResponse {
            endpoint: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        let response = self.send(self.client.get(url.clone()), &url).await?;
        Self::decode(response, &url).await
    }

    async fn post_document(&self, segments: &[&str], doc: &Document) -> Result<()> {
        let url = self.endpoint(segments)?;
        self.send(self.client.post(url.clone()).json(doc), &url).await?;
        Ok(())
    }

    /// Add a document to the index.
    ///
    /// `max_tokens` caps sentence length; `None` falls back to the configured
    /// default, and then to no cap.
    pub async fn index(&self, doc: &Document, max_tokens: Option<usize>) -> Result<()> {
        let max = self.max_tokens_segment(max_tokens);
        debug!(document.id = %doc.id(), max_tokens = %max, "indexing document");
        self.post_document(&["api", "index", "document", "maxTokensPerSentence", max.as_str()], doc)
            .await
    }

    /// Replace a previously indexed document with the same id.
    ///
    /// `max_tokens` falls back to the configured default as in
    /// [`index`](Self::index). With no cap at all the document is posted to
    /// the uncapped update route.
    pub async fn update(&self, doc: &Document, max_tokens: Option<usize>) -> Result<()> {
        let max_tokens = max_tokens.or(self.config.max_tokens_per_sentence);
        debug!(document.id = %doc.id(), ?max_tokens, "updating document");
        match max_tokens {
            Some(max) => {
                let max = max.to_string();
                let segments = ["api", "update", "document", "maxTokensPerSentence", max.as_str()];
                self.post_document(&segments, doc).await
            }
            None => self.post_document(&["api", "update", "document", doc.id()], doc).await,
        }
    }

    /// Remove a document from the index by id.
    pub async fn delete(&self, doc_id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "delete", "document", doc_id])?;
        debug!(document.id = %doc_id, "deleting document");
        self.send(self.client.delete(url.clone()), &url).await?;
        Ok(())
    }

    /// Ask the server to validate a document without indexing it.
    ///
    /// A rejected document yields [`OdinsonError::RemoteRejected`] carrying
    /// the server's error list.
    pub async fn validate(&self, doc: &Document, strict: bool) -> Result<()> {
        let mode = if strict { "strict" } else { "relaxed" };
        self.post_document(&["api", "validate", mode], doc).await
    }

    /// Retrieve an indexed document by id.
    pub async fn document(&self, doc_id: &str) -> Result<Document> {
        self.get_json(&["api", "document", doc_id]).await
    }

    /// Retrieve an indexed sentence by its sentence id.
    pub async fn sentence(&self, sentence_id: u64) -> Result<Sentence> {
        let id = sentence_id.to_string();
        self.get_json(&["api", "sentence", id.as_str()]).await
    }

    /// Retrieve the metadata fields of an indexed document.
    pub async fn document_metadata(&self, doc_id: &str) -> Result<Vec<Field>> {
        self.get_json(&["api", "metadata", "document", doc_id]).await
    }

    /// Number of indexed sentences.
    pub async fn numdocs(&self) -> Result<u64> {
        self.get_json(&["api", "numdocs"]).await
    }

    pub async fn corpus(&self) -> Result<CorpusInfo> {
        self.get_json(&["api", "corpus"]).await
    }

    /// Part-of-speech tags seen in the index.
    pub async fn tags_vocabulary(&self) -> Result<Vec<String>> {
        self.get_json(&["api", "tags-vocabulary"]).await
    }

    /// Graph edge labels seen in the index.
    pub async fn edge_vocabulary(&self) -> Result<Vec<String>> {
        self.get_json(&["api", "dependencies-vocabulary"]).await
    }

    pub async fn build_info(&self) -> Result<serde_json::Value> {
        self.get_json(&["api", "buildinfo"]).await
    }

    pub async fn server_config(&self) -> Result<serde_json::Value> {
        self.get_json(&["api", "config"]).await
    }

    /// Frequencies of the rules of a grammar over the index.
    pub async fn rule_freq(&self, request: &RuleFreqRequest) -> Result<Vec<Statistic>> {
        let url = self.endpoint(&["api", "rule-freq"])?;
        let response = self.send(self.client.post(url.clone()).json(request), &url).await?;
        Self::decode(response, &url).await
    }

    /// Fetch one page of pattern results, surfacing every failure.
    pub async fn try_search(
        &self,
        query: &PatternQuery,
        cursor: Option<&Cursor>,
    ) -> Result<Results> {
        let url = self.endpoint(&["api", "execute", "pattern"])?;
        debug!(pattern = %query.pattern, ?cursor, "requesting search page");
        let request = self.client.get(url.clone()).query(&query.to_params(cursor));
        let response = self.send(request, &url).await?;
        Self::decode(response, &url).await
    }

    /// Iterate over every hit of `query`, one page request at a time.
    pub fn search_all(&self, query: PatternQuery) -> SearchPager {
        SearchPager::new(Arc::new(self.clone()), query)
    }
}

#[async_trait]
impl SearchBackend for HttpOdinsonClient {
    async fn search(&self, query: &PatternQuery, cursor: Option<&Cursor>) -> Results {
        match self.try_search(query, cursor).await {
            Ok(results) => results,
            Err(e) => {
                warn!(pattern = %query.pattern, error = %e, "search failed; returning empty page");
                Results::empty(query.pattern.clone(), query.metadata_query.clone())
            }
        }
    }
}
