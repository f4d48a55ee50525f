//! Request vocabulary: query DSL, aggregations and the search request itself

pub mod aggs;
pub mod request;
pub mod types;

pub use aggs::{
    render_value, Aggregation, AggregationKind, CompositeKey, CompositeSource,
    CompositeValuesSource, NamedAggregation,
};
pub use request::{
    Collapse, IndicesOptions, InnerHits, SearchDefaults, SearchRequest, SearchSource, TimeValue,
    TrackTotalHits,
};
pub use types::{BoolQuery, OneOrMany, Query, RangeParams, SortClause, SourceFilter};
