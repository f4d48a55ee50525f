//! Search facade: the public entry points
//!
//! Every entry point goes through one of two executors. The listing executor
//! runs a plain search and hands back the hits; the aggregation executor
//! shapes the request for bucket-only work and hands back the single
//! top-level aggregation. Both honour the [`ResultContext`] dry-run contract,
//! apply the [`SearchDefaults`] and resolve indices permissively.

use crate::client::SearchClient;
use crate::context::ResultContext;
use crate::metrics;
use crate::normalize;
use crate::query::{
    Aggregation, CompositeKey, CompositeSource, IndicesOptions, NamedAggregation, Query,
    SearchDefaults, SearchRequest, SearchSource, TrackTotalHits,
};
use crate::response::{Aggregate, SearchResponse};
use crate::results::{GroupResult, GroupTopNResult, ListingResult};
use crate::status::{is_success, status_name};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Buckets requested per composite round-trip
pub const COMPOSITE_PAGE_SIZE: usize = 10_000;

/// Name of the composite aggregation built by [`SearchFacade::group_by_all`]
pub const COMPOSITE_AGGREGATION_NAME: &str = "my_buckets";

/// Hit counting cap for aggregation requests
const TRACK_TOTAL_HITS_UP_TO: u64 = 10;

/// Facade over an injected search engine client
#[derive(Clone)]
pub struct SearchFacade {
    client: Arc<dyn SearchClient>,
    defaults: SearchDefaults,
}

impl SearchFacade {
    pub fn new(client: Arc<dyn SearchClient>, defaults: SearchDefaults) -> Self {
        Self { client, defaults }
    }

    pub fn defaults(&self) -> &SearchDefaults {
        &self.defaults
    }

    /// One page of documents, with the cursor for the next page.
    ///
    /// Dry runs return an empty listing.
    pub async fn query_list(
        &self,
        index: Option<&str>,
        source: SearchSource,
        ctx: &mut ResultContext,
    ) -> Result<ListingResult> {
        let Some(response) = self.execute("query_list", index, source, ctx).await? else {
            return Ok(ListingResult::default());
        };

        let listing = normalize::listing(response.hits);
        info!(
            index = index.unwrap_or("_all"),
            took_ms = response.took,
            timed_out = response.timed_out,
            hits = listing.total,
            returned = listing.documents.len(),
            "listing complete"
        );
        Ok(listing)
    }

    /// Run a request carrying exactly one top-level aggregation and return it.
    ///
    /// Hits are not fetched (`size` is forced to 0) and hit counting is capped.
    /// `Ok(None)` means the engine answered without aggregations, or this was a
    /// dry run.
    pub async fn aggregate(
        &self,
        index: Option<&str>,
        source: SearchSource,
        ctx: &mut ResultContext,
    ) -> Result<Option<Aggregate>> {
        self.run_aggregation("aggregate", index, source, ctx).await
    }

    /// Count documents per distinct combination of the composite `sources`.
    ///
    /// Pages through the composite aggregation until a page comes back short,
    /// so every distinct key is returned exactly once.
    pub async fn group_by_all(
        &self,
        index: Option<&str>,
        query: Option<Query>,
        sources: Vec<CompositeSource>,
        ctx: &mut ResultContext,
    ) -> Result<Vec<GroupResult>> {
        let started = Instant::now();
        let mut groups = Vec::new();
        let mut after: Option<CompositeKey> = None;
        let mut page = 0usize;

        loop {
            page += 1;
            let composite = Aggregation::composite(sources.clone(), COMPOSITE_PAGE_SIZE, after.take())
                .named(COMPOSITE_AGGREGATION_NAME);
            let mut source = SearchSource::new().aggregation(composite);
            if let Some(query) = &query {
                source = source.query(query.clone());
            }

            let composite = match self.run_aggregation("group_by_all", index, source, ctx).await? {
                Some(Aggregate::Composite(composite)) => composite,
                Some(other) => {
                    return fail(Error::UnexpectedAggregate {
                        expected: "composite",
                        found: other.shape(),
                    })
                }
                None if page == 1 => return Ok(Vec::new()),
                // The cursor came from a composite answer; losing it mid-way is a shape change
                None => {
                    return fail(Error::UnexpectedAggregate {
                        expected: "composite",
                        found: "none".to_string(),
                    })
                }
            };

            let fetched = composite.buckets.len();
            groups.extend(normalize::composite_groups(&composite));
            debug!(page, buckets = fetched, accumulated = groups.len(), "composite page");

            if fetched < COMPOSITE_PAGE_SIZE {
                break;
            }
            after = composite
                .after_key
                .or_else(|| composite.buckets.last().map(|b| b.key.clone()));
            if after.is_none() {
                warn!(page, "full composite page without an after key, stopping");
                break;
            }
        }

        info!(
            index = index.unwrap_or("_all"),
            pages = page,
            buckets = groups.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "grouped count complete"
        );
        Ok(groups)
    }

    /// Count documents per bucket of a single caller-supplied aggregation.
    ///
    /// No pagination: the aggregation itself must bound its bucket count.
    pub async fn group_by(
        &self,
        index: Option<&str>,
        query: Option<Query>,
        aggregation: NamedAggregation,
        ctx: &mut ResultContext,
    ) -> Result<Vec<GroupResult>> {
        let mut source = SearchSource::new()
            .size(0)
            .track_total_hits(TrackTotalHits::Bool(false))
            .aggregation(aggregation);
        if let Some(query) = query {
            source = source.query(query);
        }

        match self.run_aggregation("group_by", index, source, ctx).await? {
            Some(aggregate) => {
                let groups = normalize::groups(&aggregate).or_else(fail)?;
                info!(buckets = groups.len(), "group-by complete");
                Ok(groups)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Top documents per terms bucket, sampled by a `top_hits` sub-aggregation
    pub async fn top_n_by_aggregation(
        &self,
        index: Option<&str>,
        query: Option<Query>,
        terms: NamedAggregation,
        top_hits: NamedAggregation,
        ctx: &mut ResultContext,
    ) -> Result<Vec<GroupTopNResult>> {
        let top_hits_name = top_hits.name.clone();
        let NamedAggregation { name, aggregation } = terms;
        let mut source = SearchSource::new()
            .size(0)
            .track_total_hits(TrackTotalHits::Bool(false))
            .aggregation(aggregation.sub_aggregation(top_hits).named(name));
        if let Some(query) = query {
            source = source.query(query);
        }

        let terms = match self.run_aggregation("top_n_by_aggregation", index, source, ctx).await? {
            Some(Aggregate::Terms(terms)) => terms,
            Some(other) => {
                return fail(Error::UnexpectedAggregate {
                    expected: "terms",
                    found: other.shape(),
                })
            }
            None => return Ok(Vec::new()),
        };

        let groups = normalize::top_n_from_terms(&terms, &top_hits_name).or_else(fail)?;
        info!(groups = groups.len(), "top-n by aggregation complete");
        Ok(groups)
    }

    /// Top documents per distinct value of the collapse field.
    ///
    /// The request must carry a collapse directive; it runs as a plain search.
    pub async fn top_n_by_collapse(
        &self,
        index: Option<&str>,
        source: SearchSource,
        ctx: &mut ResultContext,
    ) -> Result<Vec<GroupTopNResult>> {
        let Some(collapse) = source.collapse.as_ref() else {
            warn!("collapse search without a collapse directive");
            return fail(Error::MissingCollapse);
        };
        let field = collapse.field.clone();
        if collapse.inner_hits_count() > 1 {
            warn!(
                field = %field,
                groups = collapse.inner_hits_count(),
                "several inner_hits groups configured, only the first is used"
            );
        }

        let Some(response) = self.execute("top_n_by_collapse", index, source, ctx).await? else {
            return Ok(Vec::new());
        };

        let groups = normalize::top_n_from_collapsed(&response.hits, &field);
        info!(
            index = index.unwrap_or("_all"),
            took_ms = response.took,
            timed_out = response.timed_out,
            groups = groups.len(),
            "top-n by collapse complete"
        );
        Ok(groups)
    }

    /// Aggregation executor
    async fn run_aggregation(
        &self,
        operation: &'static str,
        index: Option<&str>,
        mut source: SearchSource,
        ctx: &mut ResultContext,
    ) -> Result<Option<Aggregate>> {
        if source.aggregation_count() == 0 {
            warn!(operation, "aggregation search without an aggregation");
            return fail(Error::MissingAggregation);
        }

        source.size = Some(0);
        source.track_total_hits = Some(TrackTotalHits::Count(TRACK_TOTAL_HITS_UP_TO));

        let Some(response) = self.execute(operation, index, source, ctx).await? else {
            return Ok(None);
        };

        let aggregations = response.aggregations.len();
        if aggregations > 1 {
            warn!(
                operation,
                aggregations,
                "several top-level aggregations returned, using the first"
            );
        }

        let first = response.aggregations.into_first().map(|named| named.aggregate);
        info!(
            operation,
            took_ms = response.took,
            timed_out = response.timed_out,
            aggregations,
            buckets = ?first.as_ref().and_then(Aggregate::bucket_count),
            "aggregation search complete"
        );
        Ok(first)
    }

    /// Listing executor: dry-run capture, defaulting, dispatch and classification.
    /// `Ok(None)` means the request was captured instead of sent.
    async fn execute(
        &self,
        operation: &'static str,
        index: Option<&str>,
        source: SearchSource,
        ctx: &mut ResultContext,
    ) -> Result<Option<SearchResponse>> {
        if ctx.is_debug() {
            ctx.capture(&source)?;
            metrics::record_dry_run(operation);
            debug!(operation, index = index.unwrap_or("_all"), "dry run, request captured");
            return Ok(None);
        }

        let request = self
            .defaults
            .apply(SearchRequest::new(index, source))
            .indices_options(IndicesOptions::permissive());

        info!(
            operation,
            index = %request.target(),
            size = ?request.source.size,
            aggregations = request.source.aggregation_count(),
            collapse = request.source.collapse.is_some(),
            "executing search"
        );

        let started = Instant::now();
        let result = self.dispatch(&request).await;
        metrics::record_request(operation, started.elapsed());

        result.map(Some).or_else(fail)
    }

    async fn dispatch(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let response = self.client.search(request).await?;

        let status = status_name(response.status);
        if !is_success(&status) {
            return Err(Error::EngineStatus { status });
        }

        Ok(serde_json::from_value(response.body)?)
    }
}

fn fail<T>(error: Error) -> Result<T> {
    metrics::record_failure(error.kind());
    Err(error)
}
