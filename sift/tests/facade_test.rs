//! SearchFacade tests against a recording in-memory client

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sift::query::{
    Aggregation, Collapse, CompositeSource, InnerHits, Query, RangeParams, SearchDefaults, SearchRequest,
    SearchSource, SortClause, TimeValue, TrackTotalHits,
};
use sift::{
    EngineResponse, ErrorKind, Error, ResultContext, SearchClient, SearchFacade,
    COMPOSITE_PAGE_SIZE,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

type Responder = Box<dyn Fn(&SearchRequest) -> sift::Result<EngineResponse> + Send + Sync>;

struct MockClient {
    requests: Mutex<Vec<SearchRequest>>,
    responder: Responder,
}

impl MockClient {
    fn new(
        responder: impl Fn(&SearchRequest) -> sift::Result<EngineResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    fn replying(body: Value) -> Arc<Self> {
        Self::new(move |_| Ok(EngineResponse::ok(body.clone())))
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for MockClient {
    async fn search(&self, request: &SearchRequest) -> sift::Result<EngineResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

fn facade(client: &Arc<MockClient>) -> SearchFacade {
    SearchFacade::new(client.clone(), SearchDefaults::default())
}

fn body_of(request: &SearchRequest) -> Value {
    serde_json::to_value(&request.source).unwrap()
}

/// Serves `total` composite buckets keyed `{n, tag}`, one page per call
fn composite_engine(total: usize) -> Arc<MockClient> {
    MockClient::new(move |request| {
        let body = body_of(request);
        let composite = &body["aggs"]["my_buckets"]["composite"];
        let size = composite["size"].as_u64().unwrap() as usize;
        let start = composite["after"]["n"]
            .as_u64()
            .map(|n| n as usize + 1)
            .unwrap_or(0);
        let end = (start + size).min(total);

        let buckets: Vec<Value> = (start..end)
            .map(|n| json!({"key": {"n": n, "tag": "t"}, "doc_count": n % 7 + 1}))
            .collect();
        let mut aggregate = json!({ "buckets": buckets });
        if end > start {
            aggregate["after_key"] = json!({"n": end - 1, "tag": "t"});
        }

        Ok(EngineResponse::ok(json!({
            "took": 4,
            "timed_out": false,
            "hits": {"total": {"value": 10, "relation": "gte"}, "hits": []},
            "aggregations": {"composite#my_buckets": aggregate}
        })))
    })
}

/// One full composite page keyed `{k}`, with or without an `after_key`
fn full_composite_page(with_after_key: bool) -> Value {
    let buckets: Vec<Value> = (0..COMPOSITE_PAGE_SIZE)
        .map(|n| json!({"key": {"k": n}, "doc_count": 1}))
        .collect();
    let mut aggregate = json!({ "buckets": buckets });
    if with_after_key {
        aggregate["after_key"] = json!({"k": COMPOSITE_PAGE_SIZE - 1});
    }
    json!({ "aggregations": {"composite#my_buckets": aggregate} })
}

fn is_first_page(request: &SearchRequest) -> bool {
    body_of(request)["aggs"]["my_buckets"]["composite"]
        .get("after")
        .is_none()
}

/// Collects formatted log output
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn sources() -> Vec<CompositeSource> {
    vec![
        CompositeSource::terms("n", "n"),
        CompositeSource::terms("tag", "tag.keyword"),
    ]
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_listing_normalizes_hits() {
    let client = MockClient::replying(json!({
        "took": 12,
        "timed_out": false,
        "hits": {
            "total": {"value": 2, "relation": "eq"},
            "hits": [
                {"_id": "1", "_source": {"title": "a"}, "sort": [1700000000000u64, "1"]},
                {"_id": "2", "_source": {"title": "b"}, "sort": [1700000001000u64, "2"]}
            ]
        }
    }));
    let mut ctx = ResultContext::new();

    let listing = facade(&client)
        .query_list(
            Some("logs-*"),
            SearchSource::new()
                .query(Query::matches("title", "x"))
                .size(2)
                .sort(SortClause::desc("@timestamp")),
            &mut ctx,
        )
        .await
        .unwrap();

    assert_eq!(listing.total, 2);
    assert_eq!(listing.documents.len(), 2);
    assert_eq!(listing.documents[0]["title"], json!("a"));
    assert_eq!(
        listing.last_sort_values,
        Some(vec![json!(1700000001000u64), json!("2")])
    );
    assert!(ctx.captured().is_none());
}

#[tokio::test]
async fn test_listing_applies_defaults_and_permissive_indices() {
    let client = MockClient::replying(json!({"hits": {"hits": []}}));
    let mut ctx = ResultContext::new();

    facade(&client)
        .query_list(Some("a,b"), SearchSource::new(), &mut ctx)
        .await
        .unwrap();

    let requests = client.requests();
    let request = &requests[0];
    assert_eq!(request.indices, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(request.source.timeout, Some(TimeValue::from_millis(30_000)));
    assert_eq!(request.allow_partial_search_results, Some(true));
    let options = request.indices_options.as_ref().unwrap();
    assert!(options.ignore_unavailable);
    assert!(options.allow_no_indices);
}

#[tokio::test]
async fn test_listing_keeps_caller_timeout() {
    let client = MockClient::replying(json!({"hits": {"hits": []}}));
    let mut ctx = ResultContext::new();

    facade(&client)
        .query_list(
            None,
            SearchSource::new().timeout(TimeValue::from_millis(500)),
            &mut ctx,
        )
        .await
        .unwrap();

    let requests = client.requests();
    let request = &requests[0];
    assert!(request.indices.is_empty());
    assert_eq!(request.source.timeout, Some(TimeValue::from_millis(500)));
}

#[tokio::test]
async fn test_listing_zero_hits_lower_bound_total() {
    let client = MockClient::replying(json!({
        "took": 1,
        "hits": {"total": {"value": 10000, "relation": "gte"}, "hits": []}
    }));
    let mut ctx = ResultContext::new();

    let listing = facade(&client)
        .query_list(None, SearchSource::new().size(0), &mut ctx)
        .await
        .unwrap();

    assert_eq!(listing.total, 10000);
    assert_eq!(listing.total_relation, sift::response::TotalHitsRelation::Gte);
    assert!(listing.documents.is_empty());
    assert!(listing.last_sort_values.is_none());
}

#[tokio::test]
async fn test_listing_dry_run_captures_without_network() {
    let client = MockClient::replying(json!({}));
    let mut ctx = ResultContext::debug();
    let source = SearchSource::new()
        .query(Query::term("status", "active"))
        .size(25);

    let listing = facade(&client)
        .query_list(Some("users"), source.clone(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(client.calls(), 0);
    assert_eq!(listing, sift::ListingResult::default());
    // Captured before defaulting: no timeout injected
    assert_eq!(ctx.captured(), Some(&serde_json::to_value(&source).unwrap()));
    assert!(ctx.captured().unwrap().get("timeout").is_none());
}

#[tokio::test]
async fn test_listing_dry_run_sends_body_as_written() {
    let body = json!({
        "query": {
            "bool": {
                "must": [
                    {"match": {"message": {"query": "disk full", "analyzer": "whitespace", "minimum_should_match": "75%"}}}
                ],
                "filter": [
                    {"nested": {"path": "tags", "query": {"term": {"tags.name": "prod"}}}},
                    {"range": {"@timestamp": {"gte": "now-1d", "boost": 2}}}
                ]
            }
        },
        "size": 20,
        "sort": [{"@timestamp": {"order": "desc", "unmapped_type": "date"}}],
        "_source": {"includes": ["message"]},
        "highlight": {"fields": {"message": {}}},
        "post_filter": {"term": {"level": "error"}},
        "min_score": 0.5,
        "collapse": {
            "field": "host",
            "inner_hits": {"name": "recent", "size": 2, "highlight": {"fields": {"message": {}}}},
            "max_concurrent_group_searches": 4
        }
    });
    let source: SearchSource = serde_json::from_value(body.clone()).unwrap();
    let client = MockClient::replying(json!({}));
    let mut ctx = ResultContext::debug();

    facade(&client)
        .query_list(Some("logs-*"), source, &mut ctx)
        .await
        .unwrap();

    assert_eq!(client.calls(), 0);
    assert_eq!(ctx.captured(), Some(&body));
}

#[tokio::test]
async fn test_listing_sends_unmodelled_keys_to_engine() {
    let client = MockClient::replying(json!({"hits": {"hits": []}}));
    let source: SearchSource = serde_json::from_value(json!({
        "query": {"geo_distance": {"distance": "5km", "pin": {"lat": 59.9, "lon": 10.7}}},
        "highlight": {"fields": {"title": {}}}
    }))
    .unwrap();
    let mut ctx = ResultContext::new();

    facade(&client)
        .query_list(None, source, &mut ctx)
        .await
        .unwrap();

    let sent = body_of(&client.requests()[0]);
    assert_eq!(sent["query"]["geo_distance"]["distance"], json!("5km"));
    assert_eq!(sent["highlight"], json!({"fields": {"title": {}}}));
}

#[tokio::test]
async fn test_engine_status_failure() {
    let client = MockClient::new(|_| {
        Ok(EngineResponse {
            status: StatusCode::NOT_FOUND,
            body: json!({"error": {"type": "index_not_found_exception"}}),
        })
    });
    let mut ctx = ResultContext::new();

    let err = facade(&client)
        .query_list(Some("missing"), SearchSource::new(), &mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::EngineStatus { status } if status == "NOT_FOUND"));
    assert_eq!(err.kind(), ErrorKind::EngineStatus);
}

#[tokio::test]
async fn test_created_status_is_success() {
    let client = MockClient::new(|_| {
        Ok(EngineResponse {
            status: StatusCode::CREATED,
            body: json!({"hits": {"total": {"value": 0, "relation": "eq"}, "hits": []}}),
        })
    });
    let mut ctx = ResultContext::new();

    let listing = facade(&client)
        .query_list(Some("fresh"), SearchSource::new(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(listing.total, 0);
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let client = MockClient::new(|_| Err(Error::Transport("connection refused".into())));
    let mut ctx = ResultContext::new();

    let err = facade(&client)
        .query_list(None, SearchSource::new(), &mut ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_malformed_response_is_transport_error() {
    let client = MockClient::replying(json!({"hits": {"hits": "not a list"}}));
    let mut ctx = ResultContext::new();

    let err = facade(&client)
        .query_list(None, SearchSource::new(), &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

// ============================================================================
// Aggregation executor
// ============================================================================

#[tokio::test]
async fn test_aggregate_without_aggregation_never_reaches_engine() {
    let client = MockClient::replying(json!({}));

    for mut ctx in [ResultContext::new(), ResultContext::debug()] {
        let err = facade(&client)
            .aggregate(Some("logs"), SearchSource::new().query(Query::match_all()), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingAggregation));
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(ctx.captured().is_none());
    }
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_aggregate_shapes_request() {
    let client = MockClient::replying(json!({
        "aggregations": {
            "sterms#by_user": {
                "buckets": [{"key": "kim", "doc_count": 4}]
            }
        }
    }));
    let mut ctx = ResultContext::new();

    let aggregate = facade(&client)
        .aggregate(
            None,
            SearchSource::new()
                .size(50)
                .aggregation(Aggregation::terms("user").size(5).named("by_user")),
            &mut ctx,
        )
        .await
        .unwrap();

    let requests = client.requests();
    let request = &requests[0];
    assert_eq!(request.source.size, Some(0));
    assert_eq!(request.source.track_total_hits, Some(TrackTotalHits::Count(10)));
    assert!(matches!(aggregate, Some(sift::response::Aggregate::Terms(_))));
}

#[tokio::test]
async fn test_aggregate_logs_bucket_count() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let client = MockClient::replying(json!({
        "aggregations": {
            "sterms#by_user": {
                "buckets": [{"key": "kim", "doc_count": 4}, {"key": "lee", "doc_count": 1}]
            }
        }
    }));
    let mut ctx = ResultContext::new();

    facade(&client)
        .aggregate(
            None,
            SearchSource::new().aggregation(Aggregation::terms("user").named("by_user")),
            &mut ctx,
        )
        .await
        .unwrap();

    let text = logs.contents();
    assert!(text.contains("aggregation search complete"), "{}", text);
    assert!(text.contains("buckets=Some(2)"), "{}", text);
}

#[tokio::test]
async fn test_aggregate_empty_response_is_none() {
    let client = MockClient::replying(json!({"took": 1, "hits": {"hits": []}}));
    let mut ctx = ResultContext::new();

    let aggregate = facade(&client)
        .aggregate(
            None,
            SearchSource::new().aggregation(Aggregation::terms("user").named("by_user")),
            &mut ctx,
        )
        .await
        .unwrap();
    assert!(aggregate.is_none());
}

#[tokio::test]
async fn test_aggregate_dry_run_captures_shaped_request() {
    let client = MockClient::replying(json!({}));
    let mut ctx = ResultContext::debug();

    let aggregate = facade(&client)
        .aggregate(
            Some("logs"),
            SearchSource::new().aggregation(Aggregation::terms("user").named("by_user")),
            &mut ctx,
        )
        .await
        .unwrap();

    assert!(aggregate.is_none());
    assert_eq!(client.calls(), 0);
    let captured = ctx.captured().unwrap();
    assert_eq!(captured["size"], json!(0));
    assert_eq!(captured["track_total_hits"], json!(10));
    assert_eq!(captured["aggs"]["by_user"]["terms"]["field"], json!("user"));
}

#[tokio::test]
async fn test_aggregate_dry_run_keeps_unmodelled_aggregation_keys() {
    let body = json!({
        "query": {"match_all": {"_name": "everything"}},
        "runtime_mappings": {"day": {"type": "keyword", "script": "emit(doc['ts'].value.dayOfWeekEnum.toString())"}},
        "aggs": {
            "by_host": {
                "terms": {"field": "host", "shard_size": 100, "include": "web-.*"},
                "meta": {"owner": "ops"},
                "aggs": {
                    "unusual": {"significant_terms": {"field": "tags"}},
                    "spread": {"percentiles": {"field": "latency", "percents": [50, 99]}}
                }
            }
        }
    });
    let source: SearchSource = serde_json::from_value(body.clone()).unwrap();
    let client = MockClient::replying(json!({}));
    let mut ctx = ResultContext::debug();

    facade(&client)
        .aggregate(None, source, &mut ctx)
        .await
        .unwrap();

    let mut expected = body;
    expected["size"] = json!(0);
    expected["track_total_hits"] = json!(10);
    assert_eq!(ctx.captured(), Some(&expected));
}

// ============================================================================
// Composite pagination
// ============================================================================

#[tokio::test]
async fn test_group_by_all_pages_until_short_page() {
    let client = composite_engine(25_000);
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .group_by_all(Some("events"), Some(Query::exists("tag")), sources(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(client.calls(), 3);
    assert_eq!(groups.len(), 25_000);
    let distinct: HashSet<&str> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(distinct.len(), 25_000);
    assert_eq!(groups[0].key, "{n=0, tag=t}");
    assert_eq!(groups[0].count, 1);
    assert_eq!(groups[24_999].key, "{n=24999, tag=t}");
}

#[tokio::test]
async fn test_group_by_all_passes_after_key_verbatim() {
    let client = composite_engine(25_000);
    let mut ctx = ResultContext::new();

    facade(&client)
        .group_by_all(None, None, sources(), &mut ctx)
        .await
        .unwrap();

    let requests = client.requests();
    let composite = |i: usize| body_of(&requests[i])["aggs"]["my_buckets"]["composite"].clone();
    assert!(composite(0).get("after").is_none());
    assert_eq!(composite(0)["size"], json!(COMPOSITE_PAGE_SIZE));
    assert_eq!(composite(1)["after"], json!({"n": 9999, "tag": "t"}));
    assert_eq!(composite(2)["after"], json!({"n": 19999, "tag": "t"}));
    for request in &requests {
        assert_eq!(request.source.size, Some(0));
        assert_eq!(request.source.track_total_hits, Some(TrackTotalHits::Count(10)));
    }
}

#[tokio::test]
async fn test_group_by_all_exact_page_triggers_another_round_trip() {
    let client = composite_engine(2 * COMPOSITE_PAGE_SIZE);
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .group_by_all(None, None, sources(), &mut ctx)
        .await
        .unwrap();

    // Two full pages, then an empty one that terminates
    assert_eq!(client.calls(), 3);
    assert_eq!(groups.len(), 2 * COMPOSITE_PAGE_SIZE);
}

#[tokio::test]
async fn test_group_by_all_empty_first_page() {
    let client = composite_engine(0);
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .group_by_all(None, None, sources(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(client.calls(), 1);
    assert!(groups.is_empty());
}

#[tokio::test]
async fn test_group_by_all_without_aggregations_is_empty() {
    let client = MockClient::replying(json!({"hits": {"hits": []}}));
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .group_by_all(None, None, sources(), &mut ctx)
        .await
        .unwrap();
    assert!(groups.is_empty());
}

#[tokio::test]
async fn test_group_by_all_rejects_other_shape() {
    let client = MockClient::replying(json!({
        "aggregations": {"sterms#my_buckets": {"buckets": []}}
    }));
    let mut ctx = ResultContext::new();

    let err = facade(&client)
        .group_by_all(None, None, sources(), &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedAggregate { expected: "composite", .. }));
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[tokio::test]
async fn test_group_by_all_later_page_without_aggregation_fails() {
    let client = MockClient::new(|request| {
        if is_first_page(request) {
            Ok(EngineResponse::ok(full_composite_page(true)))
        } else {
            Ok(EngineResponse::ok(json!({"hits": {"hits": []}})))
        }
    });
    let mut ctx = ResultContext::new();

    let err = facade(&client)
        .group_by_all(None, None, sources(), &mut ctx)
        .await
        .unwrap_err();

    assert_eq!(client.calls(), 2);
    assert!(
        matches!(&err, Error::UnexpectedAggregate { expected: "composite", found } if found == "none"),
        "{:?}",
        err
    );
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[tokio::test]
async fn test_group_by_all_full_page_without_after_key_uses_last_bucket() {
    let client = MockClient::new(|request| {
        if is_first_page(request) {
            Ok(EngineResponse::ok(full_composite_page(false)))
        } else {
            Ok(EngineResponse::ok(json!({
                "aggregations": {
                    "composite#my_buckets": {"buckets": [{"key": {"k": COMPOSITE_PAGE_SIZE}, "doc_count": 3}]}
                }
            })))
        }
    });
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .group_by_all(None, None, sources(), &mut ctx)
        .await
        .unwrap();

    assert_eq!(client.calls(), 2);
    assert_eq!(groups.len(), COMPOSITE_PAGE_SIZE + 1);
    let requests = client.requests();
    assert_eq!(
        body_of(&requests[1])["aggs"]["my_buckets"]["composite"]["after"],
        json!({"k": COMPOSITE_PAGE_SIZE - 1})
    );
    assert_eq!(groups.last().unwrap().count, 3);
}

#[tokio::test]
async fn test_group_by_all_dry_run() {
    let client = composite_engine(25_000);
    let mut ctx = ResultContext::debug();

    let groups = facade(&client)
        .group_by_all(Some("events"), Some(Query::match_all()), sources(), &mut ctx)
        .await
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(client.calls(), 0);
    let captured = ctx.captured().unwrap();
    assert_eq!(
        captured["aggs"]["my_buckets"]["composite"]["sources"],
        json!([{"n": {"terms": {"field": "n"}}}, {"tag": {"terms": {"field": "tag.keyword"}}}])
    );
}

// ============================================================================
// Single-field group-by
// ============================================================================

#[tokio::test]
async fn test_group_by_terms() {
    let client = MockClient::replying(json!({
        "aggregations": {
            "lterms#by_status": {
                "buckets": [
                    {"key": 200, "doc_count": 90},
                    {"key": 404, "doc_count": 7}
                ]
            }
        }
    }));
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .group_by(
            Some("access"),
            Some(Query::range("@timestamp", RangeParams::default().gte("now-1d"))),
            Aggregation::terms("status").size(10).named("by_status"),
            &mut ctx,
        )
        .await
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "200");
    assert_eq!(groups[0].count, 90);
    assert_eq!(groups[1].key, "404");
}

#[tokio::test]
async fn test_group_by_date_histogram_uses_key_as_string() {
    let client = MockClient::replying(json!({
        "aggregations": {
            "date_histogram#per_day": {
                "buckets": [
                    {"key": 1700000000000u64, "key_as_string": "2023-11-14", "doc_count": 3}
                ]
            }
        }
    }));
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .group_by(
            None,
            None,
            Aggregation::date_histogram("@timestamp", "day").named("per_day"),
            &mut ctx,
        )
        .await
        .unwrap();

    assert_eq!(groups[0].key, "2023-11-14");
    assert_eq!(groups[0].count, 3);
}

#[tokio::test]
async fn test_group_by_rejects_metric() {
    let client = MockClient::replying(json!({
        "aggregations": {"cardinality#users": {"value": 12}}
    }));
    let mut ctx = ResultContext::new();

    let err = facade(&client)
        .group_by(None, None, Aggregation::cardinality("user").named("users"), &mut ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
}

// ============================================================================
// Top-N
// ============================================================================

#[tokio::test]
async fn test_top_n_by_aggregation() {
    let client = MockClient::replying(json!({
        "aggregations": {
            "sterms#by_user": {
                "buckets": [{
                    "key": "kim",
                    "doc_count": 42,
                    "top_hits#latest": {
                        "hits": {
                            "total": {"value": 42, "relation": "eq"},
                            "hits": [{"_source": {"n": 1}}, {"_source": {"n": 2}}]
                        }
                    }
                }]
            }
        }
    }));
    let mut ctx = ResultContext::new();

    let groups = facade(&client)
        .top_n_by_aggregation(
            Some("events"),
            Some(Query::match_all()),
            Aggregation::terms("user").size(10).named("by_user"),
            Aggregation::top_hits(2).named("latest"),
            &mut ctx,
        )
        .await
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, "kim");
    assert_eq!(groups[0].total_in_group, Some(42));
    assert_eq!(groups[0].documents.len(), 2);

    let body = body_of(&client.requests()[0]);
    assert_eq!(body["aggs"]["by_user"]["aggs"]["latest"]["top_hits"]["size"], json!(2));
    assert_eq!(body["size"], json!(0));
}

#[tokio::test]
async fn test_top_n_by_aggregation_missing_sub_aggregation() {
    let client = MockClient::replying(json!({
        "aggregations": {
            "sterms#by_user": {"buckets": [{"key": "kim", "doc_count": 1}]}
        }
    }));
    let mut ctx = ResultContext::new();

    let err = facade(&client)
        .top_n_by_aggregation(
            None,
            None,
            Aggregation::terms("user").named("by_user"),
            Aggregation::top_hits(1).named("latest"),
            &mut ctx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingSubAggregation(ref name) if name == "latest"));
}

#[tokio::test]
async fn test_top_n_by_collapse_requires_collapse() {
    let client = MockClient::replying(json!({}));

    for mut ctx in [ResultContext::new(), ResultContext::debug()] {
        let err = facade(&client)
            .top_n_by_collapse(None, SearchSource::new(), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCollapse));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_top_n_by_collapse() {
    let client = MockClient::replying(json!({
        "took": 9,
        "hits": {
            "total": {"value": 120, "relation": "eq"},
            "hits": [
                {
                    "_source": {"user": "kim", "n": 9},
                    "fields": {"user": ["kim"]},
                    "inner_hits": {
                        "latest": {"hits": {
                            "total": {"value": 3, "relation": "eq"},
                            "hits": [{"_source": {"n": 9}}, {"_source": {"n": 8}}, {"_source": {"n": 7}}]
                        }}
                    }
                },
                {
                    "_source": {"user": "lee", "n": 5},
                    "fields": {"user": ["lee"]}
                }
            ]
        }
    }));
    let mut ctx = ResultContext::new();
    let source = SearchSource::new()
        .size(10)
        .collapse(Collapse::new("user").inner_hits(InnerHits::new("latest", 3).sort(SortClause::desc("n"))));

    let groups = facade(&client)
        .top_n_by_collapse(Some("events"), source, &mut ctx)
        .await
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "kim");
    assert_eq!(groups[0].total_in_group, Some(3));
    assert_eq!(groups[0].documents.len(), 3);
    assert_eq!(groups[1].key, "lee");
    assert_eq!(groups[1].total_in_group, None);
    assert_eq!(groups[1].documents.len(), 1);
    assert_eq!(groups[1].documents[0]["n"], json!(5));

    // Plain search: the caller's size is kept
    assert_eq!(client.requests()[0].source.size, Some(10));
}

#[tokio::test]
async fn test_top_n_by_collapse_dry_run() {
    let client = MockClient::replying(json!({}));
    let mut ctx = ResultContext::debug();

    let groups = facade(&client)
        .top_n_by_collapse(
            None,
            SearchSource::new().collapse(Collapse::new("user")),
            &mut ctx,
        )
        .await
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(client.calls(), 0);
    assert_eq!(ctx.captured().unwrap()["collapse"]["field"], json!("user"));
}

#[tokio::test]
async fn test_defaults_from_facade_construction() {
    let client = MockClient::replying(json!({"hits": {"hits": []}}));
    let facade = SearchFacade::new(client.clone(), SearchDefaults::new(0, None));
    let mut ctx = ResultContext::new();

    facade
        .query_list(None, SearchSource::new(), &mut ctx)
        .await
        .unwrap();

    let requests = client.requests();
    let request = &requests[0];
    assert!(request.source.timeout.is_none());
    assert!(request.allow_partial_search_results.is_none());
}
