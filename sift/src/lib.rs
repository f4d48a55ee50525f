//! Query facade over Elasticsearch
//!
//! Turns grouped-search intents into engine requests and normalizes the
//! answers into a few uniform result types.
//!
//! # Entry points
//!
//! All on [`SearchFacade`]:
//!
//! - `query_list` - one page of documents plus a `search_after` cursor
//! - `group_by` - document counts per bucket of one aggregation
//! - `group_by_all` - counts per distinct multi-field key, paging a composite
//!   aggregation to exhaustion
//! - `top_n_by_aggregation` - top documents per terms bucket via `top_hits`
//! - `top_n_by_collapse` - top documents per collapse key via inner hits
//! - `aggregate` - the raw single top-level aggregation
//!
//! Every entry point takes a [`ResultContext`]. In debug mode the built
//! request is captured there and the engine is never contacted.
//!
//! The engine client is injected as an `Arc<dyn SearchClient>`;
//! [`HttpSearchClient`] is the REST implementation.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod facade;
pub mod metrics;
pub mod normalize;
pub mod query;
pub mod response;
pub mod results;
pub mod status;

mod ordered;

pub use client::{EngineResponse, HttpSearchClient, SearchClient};
pub use config::Config;
pub use context::ResultContext;
pub use error::{Error, ErrorKind};
pub use facade::{SearchFacade, COMPOSITE_AGGREGATION_NAME, COMPOSITE_PAGE_SIZE};
pub use results::{GroupResult, GroupTopNResult, ListingResult};

/// Result type for facade operations
pub type Result<T> = std::result::Result<T, Error>;
