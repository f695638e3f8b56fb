//! REST client for an Odinson index.
//!
//! This crate provides:
//! - [`HttpOdinsonClient`] — ingest, update, delete, validation, retrieval
//!   and statistics calls against the Odinson REST API
//! - [`SearchPager`] — cursor-based iteration over every hit of a pattern
//!   query, one page request at a time
//! - [`SearchBackend`] — the page-fetching seam the pager runs against
//! - Wire types for results, matches, corpus info and statistics
//!
//! The base address of a running Odinson instance is supplied at
//! construction; starting and stopping that instance is out of scope.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod pager;
pub mod query;
pub mod responses;

pub use backend::SearchBackend;
pub use client::HttpOdinsonClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{OdinsonError, Result};
pub use pager::{PagerState, SearchPager};
pub use query::{Cursor, PatternQuery};
pub use responses::{
    BaseMatch, CorpusInfo, EventMatch, FreqOrder, FreqScale, NamedCapture, NamedCaptureMatch,
    OdinsonErrors, OdinsonMatch, Results, RuleFreqRequest, ScoreDoc, Statistic,
};
