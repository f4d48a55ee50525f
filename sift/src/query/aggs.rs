//! Aggregation DSL types
//!
//! An [`Aggregation`] is one aggregation body (its kind plus nested
//! sub-aggregations). Request bodies key them by name, so callers hand the
//! facade a [`NamedAggregation`]. Kinds sift has no type for are kept as
//! [`AggregationKind::Raw`] and written back unchanged.

use super::types::{Query, SortClause, SourceFilter};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// One aggregation body: `{"<kind>": {...}, "aggs": {...}}`
///
/// Other body keys (`meta`, ...) are kept in `extra`. Sub-aggregations are
/// accepted under `aggs` or `aggregations` and written as `aggs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub kind: AggregationKind,
    pub aggs: BTreeMap<String, Aggregation>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    // Bucket aggregations
    Terms(TermsAgg),
    Composite(CompositeAgg),
    Histogram(HistogramAgg),
    DateHistogram(DateHistogramAgg),
    Filters(FiltersAgg),

    // Hits
    TopHits(TopHitsAgg),

    // Metric aggregations
    Avg(FieldAgg),
    Sum(FieldAgg),
    Min(FieldAgg),
    Max(FieldAgg),
    Cardinality(FieldAgg),
    ValueCount(FieldAgg),

    /// Any other kind, or a known kind in a shape the types above do not cover
    #[serde(skip)]
    Raw { kind: String, body: Value },
}

const TYPED_KINDS: [&str; 12] = [
    "terms",
    "composite",
    "histogram",
    "date_histogram",
    "filters",
    "top_hits",
    "avg",
    "sum",
    "min",
    "max",
    "cardinality",
    "value_count",
];

impl AggregationKind {
    /// DSL name of the aggregation kind
    pub fn name(&self) -> &str {
        match self {
            Self::Terms(_) => "terms",
            Self::Composite(_) => "composite",
            Self::Histogram(_) => "histogram",
            Self::DateHistogram(_) => "date_histogram",
            Self::Filters(_) => "filters",
            Self::TopHits(_) => "top_hits",
            Self::Avg(_) => "avg",
            Self::Sum(_) => "sum",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Cardinality(_) => "cardinality",
            Self::ValueCount(_) => "value_count",
            Self::Raw { kind, .. } => kind,
        }
    }

    /// Typed form of `{kind: body}` when there is one, otherwise `Raw`
    fn parse(kind: String, body: Value) -> Self {
        if !TYPED_KINDS.contains(&kind.as_str()) {
            return Self::Raw { kind, body };
        }
        let tagged = Value::Object(Map::from_iter([(kind.clone(), body.clone())]));
        serde_json::from_value(tagged).unwrap_or(Self::Raw { kind, body })
    }
}

impl From<AggregationKind> for Aggregation {
    fn from(kind: AggregationKind) -> Self {
        Self {
            kind,
            aggs: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl Aggregation {
    pub fn terms(field: impl Into<String>) -> Self {
        AggregationKind::Terms(TermsAgg {
            field: field.into(),
            size: None,
            min_doc_count: None,
            order: None,
            missing: None,
            extra: Map::new(),
        })
        .into()
    }

    /// Composite aggregation over `sources`, starting at `after` (`None` = first page)
    pub fn composite(sources: Vec<CompositeSource>, size: usize, after: Option<CompositeKey>) -> Self {
        AggregationKind::Composite(CompositeAgg {
            size,
            sources,
            after,
            extra: Map::new(),
        })
        .into()
    }

    pub fn top_hits(size: usize) -> Self {
        AggregationKind::TopHits(TopHitsAgg {
            size: Some(size),
            ..TopHitsAgg::default()
        })
        .into()
    }

    pub fn histogram(field: impl Into<String>, interval: f64) -> Self {
        AggregationKind::Histogram(HistogramAgg::new(field, interval)).into()
    }

    pub fn date_histogram(field: impl Into<String>, calendar_interval: impl Into<String>) -> Self {
        AggregationKind::DateHistogram(DateHistogramAgg::calendar(field, calendar_interval)).into()
    }

    pub fn filters(filters: BTreeMap<String, Query>) -> Self {
        AggregationKind::Filters(FiltersAgg {
            filters,
            extra: Map::new(),
        })
        .into()
    }

    pub fn cardinality(field: impl Into<String>) -> Self {
        AggregationKind::Cardinality(FieldAgg::new(field)).into()
    }

    /// Bucket size for terms and top-hits aggregations; ignored for other kinds
    pub fn size(mut self, size: usize) -> Self {
        match &mut self.kind {
            AggregationKind::Terms(t) => t.size = Some(size),
            AggregationKind::TopHits(t) => t.size = Some(size),
            AggregationKind::Composite(c) => c.size = size,
            _ => {}
        }
        self
    }

    /// Sort order for top-hits; ignored for other kinds
    pub fn sort(mut self, clause: SortClause) -> Self {
        if let AggregationKind::TopHits(t) = &mut self.kind {
            t.sort.push(clause);
        }
        self
    }

    pub fn sub_aggregation(mut self, sub: NamedAggregation) -> Self {
        self.aggs.insert(sub.name, sub.aggregation);
        self
    }

    pub fn named(self, name: impl Into<String>) -> NamedAggregation {
        NamedAggregation {
            name: name.into(),
            aggregation: self,
        }
    }

    fn from_body(body: Map<String, Value>) -> Result<Self, String> {
        let mut kind = None;
        let mut aggs = BTreeMap::new();
        let mut extra = Map::new();

        for (key, value) in body {
            if key == "aggs" || key == "aggregations" {
                let subs: BTreeMap<String, Aggregation> =
                    serde_json::from_value(value).map_err(|e| format!("in '{}': {}", key, e))?;
                aggs.extend(subs);
            } else if kind.is_none() && TYPED_KINDS.contains(&key.as_str()) {
                kind = Some(AggregationKind::parse(key, value));
            } else {
                extra.insert(key, value);
            }
        }

        let kind = match kind {
            Some(kind) => kind,
            None => {
                // An untyped kind: the first object-valued key other than `meta`
                let key = extra
                    .iter()
                    .find(|(k, v)| k.as_str() != "meta" && v.is_object())
                    .map(|(k, _)| k.clone())
                    .ok_or_else(|| "aggregation body names no aggregation kind".to_string())?;
                let body = extra.remove(&key).unwrap_or(Value::Null);
                AggregationKind::Raw { kind: key, body }
            }
        };

        Ok(Self { kind, aggs, extra })
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_body(body).map_err(de::Error::custom)
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let name = self.kind.name();
        match &self.kind {
            AggregationKind::Terms(body) => map.serialize_entry(name, body)?,
            AggregationKind::Composite(body) => map.serialize_entry(name, body)?,
            AggregationKind::Histogram(body) => map.serialize_entry(name, body)?,
            AggregationKind::DateHistogram(body) => map.serialize_entry(name, body)?,
            AggregationKind::Filters(body) => map.serialize_entry(name, body)?,
            AggregationKind::TopHits(body) => map.serialize_entry(name, body)?,
            AggregationKind::Avg(body)
            | AggregationKind::Sum(body)
            | AggregationKind::Min(body)
            | AggregationKind::Max(body)
            | AggregationKind::Cardinality(body)
            | AggregationKind::ValueCount(body) => map.serialize_entry(name, body)?,
            AggregationKind::Raw { body, .. } => map.serialize_entry(name, body)?,
        }
        if !self.aggs.is_empty() {
            map.serialize_entry("aggs", &self.aggs)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// An aggregation together with the name it is requested (and answered) under
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NamedAggregation {
    pub name: String,
    pub aggregation: Aggregation,
}

impl NamedAggregation {
    pub fn new(name: impl Into<String>, aggregation: Aggregation) -> Self {
        aggregation.named(name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TermsAgg {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Value>,
    /// `include`, `exclude`, `shard_size`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompositeAgg {
    pub size: usize,
    pub sources: Vec<CompositeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<CompositeKey>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistogramAgg {
    pub field: String,
    /// Kept as written so `10` does not come back as `10.0`
    pub interval: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistogramAgg {
    pub fn new(field: impl Into<String>, interval: f64) -> Self {
        Self {
            field: field.into(),
            interval: Value::from(interval),
            min_doc_count: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DateHistogramAgg {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DateHistogramAgg {
    pub fn calendar(field: impl Into<String>, calendar_interval: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            calendar_interval: Some(calendar_interval.into()),
            fixed_interval: None,
            format: None,
            time_zone: None,
            min_doc_count: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FiltersAgg {
    pub filters: BTreeMap<String, Query>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TopHitsAgg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,
    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    /// `highlight`, `docvalue_fields`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldAgg {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldAgg {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            missing: None,
            extra: Map::new(),
        }
    }
}

/// One named value source of a composite aggregation: `{"<name>": {"terms": {...}}}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(
    try_from = "BTreeMap<String, CompositeValuesSource>",
    into = "BTreeMap<String, CompositeValuesSource>"
)]
pub struct CompositeSource {
    pub name: String,
    pub values: CompositeValuesSource,
}

impl CompositeSource {
    pub fn terms(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: CompositeValuesSource::Terms(CompositeTermsSource {
                field: field.into(),
                missing_bucket: None,
                order: None,
                extra: Map::new(),
            }),
        }
    }

    pub fn histogram(name: impl Into<String>, field: impl Into<String>, interval: f64) -> Self {
        Self {
            name: name.into(),
            values: CompositeValuesSource::Histogram(HistogramAgg::new(field, interval)),
        }
    }

    pub fn date_histogram(
        name: impl Into<String>,
        field: impl Into<String>,
        calendar_interval: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            values: CompositeValuesSource::DateHistogram(DateHistogramAgg::calendar(field, calendar_interval)),
        }
    }

    /// Emit a bucket for documents missing the field
    pub fn missing_bucket(mut self, missing_bucket: bool) -> Self {
        if let CompositeValuesSource::Terms(t) = &mut self.values {
            t.missing_bucket = Some(missing_bucket);
        }
        self
    }
}

impl TryFrom<BTreeMap<String, CompositeValuesSource>> for CompositeSource {
    type Error = String;

    fn try_from(map: BTreeMap<String, CompositeValuesSource>) -> Result<Self, Self::Error> {
        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((name, values)), None) => Ok(Self { name, values }),
            _ => Err("composite source must have exactly one named entry".to_string()),
        }
    }
}

impl From<CompositeSource> for BTreeMap<String, CompositeValuesSource> {
    fn from(source: CompositeSource) -> Self {
        BTreeMap::from([(source.name, source.values)])
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeValuesSource {
    Terms(CompositeTermsSource),
    Histogram(HistogramAgg),
    DateHistogram(DateHistogramAgg),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompositeTermsSource {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_bucket: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ordered source-name → value mapping.
///
/// Used both as a composite bucket key and as the `after` cursor. The engine's
/// key order is kept so a cursor read from one page is sent back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompositeKey(
    #[serde(
        serialize_with = "crate::ordered::serialize",
        deserialize_with = "crate::ordered::deserialize"
    )]
    pub Vec<(String, Value)>,
);

impl CompositeKey {
    pub fn get(&self, source: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == source).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Renders as `{source1=value1, source2=value2}`
impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, render_value(value))?;
        }
        f.write_str("}")
    }
}

/// A JSON scalar as plain text: strings unquoted, `null` as `null`
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
