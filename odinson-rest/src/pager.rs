//! Cursor-based iteration over every hit of a pattern query.
//!
//! The remote endpoint is stateless and returns one page per request. A
//! [`SearchPager`] turns those pages into one ordered stream: it keeps the
//! identity of the last hit of the most recent page as a [`Cursor`] and asks
//! for the page after it whenever its buffer runs dry.
//!
//! # Example
//!
//! ```rust,ignore
//! use odinson_rest::{HttpOdinsonClient, PatternQuery};
//!
//! let client = HttpOdinsonClient::from_address("http://localhost:9000")?;
//! let mut pager = client.search_all(PatternQuery::new("[lemma=pie]"));
//! while let Some(hit) = pager.next().await {
//!     println!("{} {}", hit.document_id, hit.words.join(" "));
//! }
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::Stream;
use tracing::{debug, warn};

use crate::backend::SearchBackend;
use crate::query::{Cursor, PatternQuery};
use crate::responses::ScoreDoc;

/// Lifecycle of a [`SearchPager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    /// No page requested yet.
    Start,
    /// A page request is in flight.
    Fetching,
    /// At least one page has arrived and iteration may continue.
    HasPage,
    /// Terminal: no further requests will be issued.
    Exhausted,
}

/// A lazy, single-pass, finite sequence of [`ScoreDoc`]s for one query.
///
/// - The stop count is the `total_hits` reported by the *first* page. A
///   later page reporting a different total is logged and ignored for the
///   stop count, while its last hit still advances the cursor.
/// - Exactly one request is issued each time the buffer is empty and fewer
///   than the stop count have been yielded.
/// - Hits whose sentence id was already yielded are skipped; a page with no
///   new hits ends iteration.
/// - Dropping the pager issues no further requests. It cannot be restarted.
pub struct SearchPager {
    backend: Arc<dyn SearchBackend>,
    query: PatternQuery,
    state: PagerState,
    buffer: VecDeque<ScoreDoc>,
    cursor: Option<Cursor>,
    seen: HashSet<u64>,
    total_hits: Option<u64>,
    yielded: u64,
    pages_fetched: usize,
}

impl SearchPager {
    pub fn new(backend: Arc<dyn SearchBackend>, query: PatternQuery) -> Self {
        Self {
            backend,
            query,
            state: PagerState::Start,
            buffer: VecDeque::new(),
            cursor: None,
            seen: HashSet::new(),
            total_hits: None,
            yielded: 0,
            pages_fetched: 0,
        }
    }

    pub fn query(&self) -> &PatternQuery {
        &self.query
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    /// Number of page requests issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Number of hits returned so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// The stop count, known once the first page has arrived.
    pub fn total_hits(&self) -> Option<u64> {
        self.total_hits
    }

    /// The next hit, fetching one more page if the buffer is empty.
    pub async fn next(&mut self) -> Option<ScoreDoc> {
        loop {
            if self.state == PagerState::Exhausted {
                return None;
            }
            if self.total_hits.is_some_and(|total| self.yielded >= total) {
                self.state = PagerState::Exhausted;
                debug!(pattern = %self.query.pattern, yielded = self.yielded, "search exhausted");
                return None;
            }
            if let Some(doc) = self.buffer.pop_front() {
                self.yielded += 1;
                return Some(doc);
            }
            self.fetch_page().await;
        }
    }

    async fn fetch_page(&mut self) {
        self.state = PagerState::Fetching;
        let page = self.backend.search(&self.query, self.cursor.as_ref()).await;
        self.pages_fetched += 1;

        let total = *self.total_hits.get_or_insert(page.total_hits);
        if page.total_hits != total {
            warn!(
                pattern = %self.query.pattern,
                first_total = total,
                page_total = page.total_hits,
                page = self.pages_fetched,
                "total hits changed between pages; keeping the first page's total"
            );
        }

        if let Some(last) = page.score_docs.last() {
            self.cursor = Some(Cursor::from(last));
        }
        let received = page.score_docs.len();
        for doc in page.score_docs {
            if self.seen.insert(doc.sentence_id) {
                self.buffer.push_back(doc);
            }
        }

        debug!(
            pattern = %self.query.pattern,
            page = self.pages_fetched,
            received,
            fresh = self.buffer.len(),
            total,
            "fetched search page"
        );

        if self.buffer.is_empty() {
            if self.yielded < total {
                warn!(
                    pattern = %self.query.pattern,
                    yielded = self.yielded,
                    total,
                    "page held no new hits before reaching the total; stopping"
                );
            }
            self.state = PagerState::Exhausted;
        } else {
            self.state = PagerState::HasPage;
        }
    }

    /// Drain every remaining hit.
    pub async fn collect_all(mut self) -> Vec<ScoreDoc> {
        let mut hits = Vec::new();
        while let Some(doc) = self.next().await {
            hits.push(doc);
        }
        hits
    }

    /// Adapt the pager into a [`Stream`] of hits.
    pub fn into_stream(self) -> impl Stream<Item = ScoreDoc> + Send {
        futures::stream::unfold(self, |mut pager| async move {
            pager.next().await.map(|doc| (doc, pager))
        })
    }
}

impl std::fmt::Debug for SearchPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPager")
            .field("query", &self.query)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("total_hits", &self.total_hits)
            .field("yielded", &self.yielded)
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}
