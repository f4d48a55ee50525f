//! Search request body, request-level options and request defaulting

use super::aggs::{Aggregation, NamedAggregation};
use super::types::{OneOrMany, Query, SortClause, SourceFilter};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Search request body (`POST /<index>/_search`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,

    /// Sort values of the last hit of the previous page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,

    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<TrackTotalHits>,

    #[serde(
        default,
        alias = "aggregations",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub aggs: BTreeMap<String, Aggregation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse: Option<Collapse>,

    /// Body keys sift does not model (`post_filter`, `highlight`, ...),
    /// sent back as written
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn offset(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn sort(mut self, clause: SortClause) -> Self {
        self.sort.push(clause);
        self
    }

    pub fn search_after(mut self, values: Vec<Value>) -> Self {
        self.search_after = Some(values);
        self
    }

    pub fn source_filter(mut self, filter: SourceFilter) -> Self {
        self.source = Some(filter);
        self
    }

    pub fn timeout(mut self, timeout: TimeValue) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn track_total_hits(mut self, track: TrackTotalHits) -> Self {
        self.track_total_hits = Some(track);
        self
    }

    pub fn aggregation(mut self, aggregation: NamedAggregation) -> Self {
        self.aggs.insert(aggregation.name, aggregation.aggregation);
        self
    }

    pub fn collapse(mut self, collapse: Collapse) -> Self {
        self.collapse = Some(collapse);
        self
    }

    /// Number of top-level aggregations
    pub fn aggregation_count(&self) -> usize {
        self.aggs.len()
    }
}

/// Whether and how far the engine counts total hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TrackTotalHits {
    Bool(bool),
    /// Count accurately up to this many hits, then report a lower bound
    Count(u64),
}

/// A duration on the wire, written as `"<millis>ms"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeValue(pub Duration);

impl TimeValue {
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

impl FromStr for TimeValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("invalid time value '{}'", s))?;
        let millis = match unit {
            "" | "ms" => amount,
            "s" => amount * 1_000,
            "m" => amount * 60_000,
            "h" => amount * 3_600_000,
            "d" => amount * 86_400_000,
            _ => return Err(format!("unknown time unit '{}' in '{}'", unit, s)),
        };
        Ok(Self::from_millis(millis))
    }
}

impl Serialize for TimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Field collapsing: one leading hit per distinct value of `field`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Collapse {
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_hits: Option<OneOrMany<InnerHits>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_group_searches: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Collapse {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            inner_hits: None,
            max_concurrent_group_searches: None,
            extra: Map::new(),
        }
    }

    /// Add an inner-hits group. The first one added stays a single object on
    /// the wire; further ones turn it into a list.
    pub fn inner_hits(mut self, inner: InnerHits) -> Self {
        self.inner_hits = Some(match self.inner_hits.take() {
            None => OneOrMany::One(inner),
            Some(existing) => {
                let mut all = existing.into_vec();
                all.push(inner);
                OneOrMany::Many(all)
            }
        });
        self
    }

    pub fn inner_hits_count(&self) -> usize {
        match &self.inner_hits {
            None => 0,
            Some(OneOrMany::One(_)) => 1,
            Some(OneOrMany::Many(groups)) => groups.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InnerHits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,
    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InnerHits {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: Some(name.into()),
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn sort(mut self, clause: SortClause) -> Self {
        self.sort.push(clause);
        self
    }
}

/// Which index states wildcard expressions expand to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandWildcards {
    Open,
    Closed,
    Hidden,
}

impl ExpandWildcards {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Hidden => "hidden",
        }
    }
}

/// Index resolution options, sent as URL parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndicesOptions {
    pub ignore_unavailable: bool,
    pub allow_no_indices: bool,
    pub expand_wildcards: Vec<ExpandWildcards>,
}

impl IndicesOptions {
    /// Tolerate missing and closed indices: expand wildcards to open and
    /// closed indices, allow patterns matching nothing, skip unavailable
    /// concrete indices.
    pub fn permissive() -> Self {
        Self {
            ignore_unavailable: true,
            allow_no_indices: true,
            expand_wildcards: vec![ExpandWildcards::Open, ExpandWildcards::Closed],
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let expand = self
            .expand_wildcards
            .iter()
            .map(ExpandWildcards::as_str)
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("ignore_unavailable", self.ignore_unavailable.to_string()),
            ("allow_no_indices", self.allow_no_indices.to_string()),
            (
                "expand_wildcards",
                if expand.is_empty() { "none".to_string() } else { expand },
            ),
        ]
    }
}

/// A complete search request: target indices, body and request-level options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    /// Empty means all indices
    pub indices: Vec<String>,
    pub source: SearchSource,
    pub allow_partial_search_results: Option<bool>,
    pub indices_options: Option<IndicesOptions>,
}

impl SearchRequest {
    /// `index` may be a comma-separated list of names or patterns
    pub fn new(index: Option<&str>, source: SearchSource) -> Self {
        let indices = index
            .map(|i| {
                i.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            indices,
            source,
            allow_partial_search_results: None,
            indices_options: None,
        }
    }

    pub fn indices_options(mut self, options: IndicesOptions) -> Self {
        self.indices_options = Some(options);
        self
    }

    /// Target label for logs
    pub fn target(&self) -> String {
        if self.indices.is_empty() {
            "_all".to_string()
        } else {
            self.indices.join(",")
        }
    }
}

/// Process-wide request defaults, applied only where the caller left a value unset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchDefaults {
    /// Default search timeout in milliseconds. Zero or negative means no timeout.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: i64,

    /// Default for `allow_partial_search_results`. `"unset"` (None) leaves it to the engine.
    #[serde(
        default = "default_allow_partial",
        serialize_with = "serialize_flag",
        deserialize_with = "deserialize_flag"
    )]
    pub allow_partial_search_results: Option<bool>,
}

fn default_timeout_ms() -> i64 {
    30_000
}

fn default_allow_partial() -> Option<bool> {
    Some(true)
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            allow_partial_search_results: default_allow_partial(),
        }
    }
}

impl SearchDefaults {
    pub fn new(default_timeout_ms: i64, allow_partial_search_results: Option<bool>) -> Self {
        Self {
            default_timeout_ms,
            allow_partial_search_results,
        }
    }

    /// Fill in the timeout and partial-results flag where unset. Values the
    /// caller supplied are never replaced.
    pub fn apply(&self, mut request: SearchRequest) -> SearchRequest {
        if request.source.timeout.is_none() && self.default_timeout_ms > 0 {
            request.source.timeout = Some(TimeValue::from_millis(self.default_timeout_ms as u64));
        }
        if request.allow_partial_search_results.is_none() {
            request.allow_partial_search_results = self.allow_partial_search_results;
        }
        request
    }
}

fn serialize_flag<S: Serializer>(flag: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
    match flag {
        Some(b) => serializer.serialize_bool(*b),
        None => serializer.serialize_str("unset"),
    }
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(Some(b)),
        Flag::Text(s) if s.eq_ignore_ascii_case("unset") => Ok(None),
        Flag::Text(s) => Err(serde::de::Error::custom(format!(
            "expected true, false or \"unset\", got \"{}\"",
            s
        ))),
    }
}
