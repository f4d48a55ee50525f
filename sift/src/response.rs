//! Engine search response model
//!
//! Aggregations are decoded into the [`Aggregate`] tagged union. The engine is
//! queried with `typed_keys`, so each aggregation arrives as `<type>#<name>`
//! and the prefix selects the variant; untyped names fall back to the shape of
//! the body.

use crate::query::aggs::{render_value, CompositeKey};
use serde::de::Deserializer;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document as returned in `_source`
pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default, rename = "_shards", skip_serializing_if = "Option::is_none")]
    pub shards: Option<ShardStats>,
    #[serde(default)]
    pub hits: Hits,
    #[serde(default)]
    pub aggregations: Aggregations,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShardStats {
    pub total: u32,
    pub successful: u32,
    #[serde(default)]
    pub skipped: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Hits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

impl Hits {
    /// Reported total; zero when the engine did not track it
    pub fn total_value(&self) -> u64 {
        self.total.map(|t| t.value).unwrap_or(0)
    }

    pub fn relation(&self) -> TotalHitsRelation {
        self.total.map(|t| t.relation).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalHits {
    pub value: u64,
    pub relation: TotalHitsRelation,
}

impl<'de> Deserialize<'de> for TotalHits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Pre-7.0 engines report a bare number
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Object {
                value: u64,
                #[serde(default)]
                relation: TotalHitsRelation,
            },
            Bare(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Object { value, relation } => Self { value, relation },
            Raw::Bare(value) => Self {
                value,
                relation: TotalHitsRelation::Eq,
            },
        })
    }
}

/// Whether a total is exact or a lower bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalHitsRelation {
    #[default]
    Eq,
    Gte,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Hit {
    #[serde(default, rename = "_index", skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "_score")]
    pub score: Option<f64>,
    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
    /// Document fields in response order (collapse echoes its key here)
    #[serde(
        default,
        with = "crate::ordered",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fields: Vec<(String, Vec<Value>)>,
    /// Inner-hits groups in response order
    #[serde(
        default,
        with = "crate::ordered",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub inner_hits: Vec<(String, InnerHitsResult)>,
}

impl Hit {
    /// The `_source` document, empty when the engine returned none
    pub fn source_document(&self) -> Document {
        self.source.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InnerHitsResult {
    #[serde(default)]
    pub hits: Hits,
}

/// Top-level or bucket-level aggregations, in response order
#[derive(Debug, Clone, Default)]
pub struct Aggregations(pub Vec<NamedAggregate>);

#[derive(Debug, Clone)]
pub struct NamedAggregate {
    pub name: String,
    pub aggregate: Aggregate,
}

impl Aggregations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Aggregate> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.aggregate)
    }

    pub fn into_first(self) -> Option<NamedAggregate> {
        self.0.into_iter().next()
    }
}

impl Serialize for Aggregations {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for named in &self.0 {
            map.serialize_entry(&named.name, &named.aggregate)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Aggregations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(String, Value)> = crate::ordered::deserialize(deserializer)?;
        let mut aggregations = Vec::with_capacity(entries.len());
        for (key, body) in entries {
            // Inside a bucket, scalar siblings (`from`, `to`, ...) are not aggregations
            if !body.is_object() {
                continue;
            }
            let (kind, name) = match key.split_once('#') {
                Some((kind, name)) => (Some(kind), name.to_string()),
                None => (None, key.clone()),
            };
            let aggregate = Aggregate::decode(kind, body).map_err(serde::de::Error::custom)?;
            aggregations.push(NamedAggregate { name, aggregate });
        }
        Ok(Self(aggregations))
    }
}

/// One aggregation result, by shape
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Aggregate {
    Composite(CompositeAggregate),
    Terms(TermsAggregate),
    /// Any other bucketing aggregation (histograms, ranges, filters, ...)
    MultiBucket(MultiBucketAggregate),
    TopHits(TopHitsAggregate),
    Metric(MetricAggregate),
    Other { kind: String, body: Value },
}

impl Aggregate {
    fn decode(kind: Option<&str>, body: Value) -> serde_json::Result<Self> {
        let kind = kind.map(str::to_string);
        match kind.as_deref() {
            Some("composite") => Ok(Self::Composite(serde_json::from_value(body)?)),
            Some(k) if k.ends_with("terms") => Ok(Self::Terms(serde_json::from_value(body)?)),
            Some("top_hits") => Ok(Self::TopHits(serde_json::from_value(body)?)),
            _ => Self::infer(kind, body),
        }
    }

    fn infer(kind: Option<String>, body: Value) -> serde_json::Result<Self> {
        let label = kind.unwrap_or_else(|| "unknown".to_string());
        if body.get("after_key").is_some() {
            return Ok(Self::Composite(serde_json::from_value(body)?));
        }
        if body.get("buckets").is_some() {
            let mut multi: MultiBucketAggregate = serde_json::from_value(body)?;
            multi.kind = label;
            return Ok(Self::MultiBucket(multi));
        }
        if body.get("hits").is_some() {
            return Ok(Self::TopHits(serde_json::from_value(body)?));
        }
        if body.get("value").is_some() {
            return Ok(Self::Metric(serde_json::from_value(body)?));
        }
        Ok(Self::Other { kind: label, body })
    }

    /// Shape name used in error messages
    pub fn shape(&self) -> String {
        match self {
            Self::Composite(_) => "composite".to_string(),
            Self::Terms(_) => "terms".to_string(),
            Self::MultiBucket(m) => format!("multi_bucket({})", m.kind),
            Self::TopHits(_) => "top_hits".to_string(),
            Self::Metric(_) => "metric".to_string(),
            Self::Other { kind, .. } => kind.clone(),
        }
    }

    /// Number of buckets, for bucketing shapes
    pub fn bucket_count(&self) -> Option<usize> {
        match self {
            Self::Composite(c) => Some(c.buckets.len()),
            Self::Terms(t) => Some(t.buckets.len()),
            Self::MultiBucket(m) => Some(m.buckets.len()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompositeAggregate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_key: Option<CompositeKey>,
    #[serde(default)]
    pub buckets: Vec<CompositeBucket>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompositeBucket {
    pub key: CompositeKey,
    pub doc_count: u64,
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

impl CompositeBucket {
    /// `{source1=value1, source2=value2}`
    pub fn key_as_string(&self) -> String {
        self.key.to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TermsAggregate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_count_error_upper_bound: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_other_doc_count: Option<u64>,
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MultiBucketAggregate {
    #[serde(skip)]
    pub kind: String,
    #[serde(default, deserialize_with = "deserialize_buckets")]
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Bucket {
    #[serde(default)]
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

impl Bucket {
    /// `key_as_string` when the engine sent one, otherwise the key as plain text
    pub fn key_as_string(&self) -> String {
        match &self.key_as_string {
            Some(s) => s.clone(),
            None => render_value(&self.key),
        }
    }
}

/// Buckets arrive as a list, or keyed by name (`filters`, keyed ranges)
fn deserialize_buckets<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Bucket>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<Bucket>),
        Keyed(#[serde(deserialize_with = "crate::ordered::deserialize")] Vec<(String, Bucket)>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(buckets) => buckets,
        Raw::Keyed(entries) => entries
            .into_iter()
            .map(|(name, mut bucket)| {
                if bucket.key.is_null() {
                    bucket.key = Value::String(name);
                }
                bucket
            })
            .collect(),
    })
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TopHitsAggregate {
    #[serde(default)]
    pub hits: Hits,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricAggregate {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_as_string: Option<String>,
}
