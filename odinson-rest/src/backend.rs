//! The page-fetching seam used by [`SearchPager`](crate::SearchPager).

use async_trait::async_trait;

use crate::query::{Cursor, PatternQuery};
use crate::responses::Results;

/// A source of pattern-query result pages.
///
/// Implementations issue one request per call and never fail: a transport
/// error or a non-success status degrades to an empty page
/// ([`Results::empty`]) with `total_hits == 0`. Callers that need to tell an
/// empty result set from a failed request must use a strict API such as
/// [`HttpOdinsonClient::try_search`](crate::HttpOdinsonClient::try_search).
///
/// # Example
///
/// ```rust,ignore
/// use odinson_rest::{HttpOdinsonClient, PatternQuery, SearchBackend};
///
/// let client = HttpOdinsonClient::from_address("http://localhost:9000")?;
/// let page = client.search(&PatternQuery::new("[lemma=pie]"), None).await;
/// println!("{} hits", page.total_hits);
/// ```
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fetch the page following `cursor`, or the first page when `cursor` is `None`.
    async fn search(&self, query: &PatternQuery, cursor: Option<&Cursor>) -> Results;
}
