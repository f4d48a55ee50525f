//! Elasticsearch Query DSL types
//!
//! The subset of the query DSL callers use to express filters. Every type
//! serializes to the wire form the engine expects. Keys a type does not model
//! are kept in its `extra` map, and query kinds sift has no type for are kept
//! as [`Query::Raw`], so a parsed body is sent back as written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// ES Query types
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Match all documents
    MatchAll(MatchAllQuery),

    /// Match query (analyzed full-text)
    Match(BTreeMap<String, MatchQuery>),

    /// Match phrase query
    MatchPhrase(BTreeMap<String, MatchQuery>),

    /// Multi-match across multiple fields
    MultiMatch(MultiMatchQuery),

    /// Term query (exact match, not analyzed)
    Term(BTreeMap<String, TermValue>),

    /// Terms query (multiple exact matches)
    Terms(BTreeMap<String, Vec<Value>>),

    /// Range query
    Range(BTreeMap<String, RangeParams>),

    /// Bool query (must, should, must_not, filter)
    Bool(BoolQuery),

    /// Exists query
    Exists(ExistsQuery),

    /// Query string (Lucene syntax)
    QueryString(QueryStringQuery),

    /// Wildcard query
    Wildcard(BTreeMap<String, WildcardParams>),

    /// Prefix query
    Prefix(BTreeMap<String, Value>),

    /// IDs query
    Ids(IdsQuery),

    /// Any other query (`nested`, `geo_distance`, `script`, ...), or a known
    /// kind written in a shape the types above do not cover
    #[serde(untagged)]
    Raw(Value),
}

impl Query {
    pub fn match_all() -> Self {
        Self::MatchAll(MatchAllQuery::default())
    }

    pub fn matches(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Match(BTreeMap::from([(field.into(), MatchQuery::Simple(text.into()))]))
    }

    pub fn match_phrase(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::MatchPhrase(BTreeMap::from([(field.into(), MatchQuery::Simple(text.into()))]))
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term(BTreeMap::from([(field.into(), TermValue::Simple(value.into()))]))
    }

    pub fn terms<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::Terms(BTreeMap::from([(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        )]))
    }

    pub fn range(field: impl Into<String>, params: RangeParams) -> Self {
        Self::Range(BTreeMap::from([(field.into(), params)]))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists(ExistsQuery {
            field: field.into(),
            extra: Map::new(),
        })
    }

    pub fn query_string(query: impl Into<String>) -> Self {
        Self::QueryString(QueryStringQuery {
            query: query.into(),
            default_field: None,
            fields: None,
            default_operator: None,
            extra: Map::new(),
        })
    }

    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Wildcard(BTreeMap::from([(
            field.into(),
            WildcardParams::Simple(pattern.into()),
        )]))
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Prefix(BTreeMap::from([(field.into(), Value::String(prefix.into()))]))
    }

    pub fn ids<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::Ids(IdsQuery {
            values: values.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        })
    }
}

impl From<BoolQuery> for Query {
    fn from(query: BoolQuery) -> Self {
        Self::Bool(query)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MatchAllQuery {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MatchQuery {
    Simple(String),
    Object {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fuzziness: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slop: Option<u32>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MultiMatchQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TermValue {
    Object {
        value: Value,
        /// `boost`, `case_insensitive`, ...
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Simple(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RangeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// `boost`, `relation`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RangeParams {
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }
}

/// Bool query. Clauses accept either a single query or a list on input and
/// always serialize as lists.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub must: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub should: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub must_not: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub filter: Vec<Query>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    pub fn minimum_should_match(mut self, value: MinimumShouldMatch) -> Self {
        self.minimum_should_match = Some(value);
        self
    }
}

/// A single value or a list of values, as the DSL accepts for most clauses
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Query>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    OneOrMany::<Query>::deserialize(deserializer).map(OneOrMany::into_vec)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MinimumShouldMatch {
    Number(i32),
    Percentage(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExistsQuery {
    pub field: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryStringQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WildcardParams {
    Simple(String),
    Object {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        case_insensitive: Option<bool>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IdsQuery {
    pub values: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sort clause: a bare field name or `{field: order}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SortClause {
    Field(String),
    Object(BTreeMap<String, SortOrder>),
    Raw(Value),
}

impl SortClause {
    pub fn asc(field: impl Into<String>) -> Self {
        Self::Object(BTreeMap::from([(field.into(), SortOrder::Simple("asc".to_string()))]))
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::Object(BTreeMap::from([(field.into(), SortOrder::Simple("desc".to_string()))]))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SortOrder {
    Simple(String),
    /// `{"order": ..., "mode": ..., "missing": ...}`, also script and geo sorts
    Object {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

/// `_source` filtering
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceFilter {
    Bool(bool),
    Field(String),
    Fields(Vec<String>),
    Object {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        includes: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        excludes: Option<Vec<String>>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Raw(Value),
}
