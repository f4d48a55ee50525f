//! Response normalizers: engine hits and buckets into the uniform result types

use crate::query::render_value;
use crate::response::{Aggregate, CompositeAggregate, Hit, Hits, TermsAggregate};
use crate::results::{GroupResult, GroupTopNResult, ListingResult};
use crate::{Error, Result};
use tracing::warn;

/// Listing page from a hits section. The cursor is the last hit's sort values.
pub fn listing(hits: Hits) -> ListingResult {
    let total = hits.total_value();
    let total_relation = hits.relation();
    let last_sort_values = hits.hits.last().and_then(|h| h.sort.clone());
    let documents = hits.hits.iter().map(Hit::source_document).collect();

    ListingResult {
        total,
        total_relation,
        documents,
        last_sort_values,
    }
}

/// Group counts from any bucketing aggregation
pub fn groups(aggregate: &Aggregate) -> Result<Vec<GroupResult>> {
    match aggregate {
        Aggregate::Composite(composite) => Ok(composite_groups(composite)),
        Aggregate::Terms(terms) => Ok(terms
            .buckets
            .iter()
            .map(|b| GroupResult {
                key: b.key_as_string(),
                count: b.doc_count,
            })
            .collect()),
        Aggregate::MultiBucket(multi) => Ok(multi
            .buckets
            .iter()
            .map(|b| GroupResult {
                key: b.key_as_string(),
                count: b.doc_count,
            })
            .collect()),
        other => Err(Error::UnexpectedAggregate {
            expected: "multi-bucket",
            found: other.shape(),
        }),
    }
}

pub fn composite_groups(composite: &CompositeAggregate) -> Vec<GroupResult> {
    composite
        .buckets
        .iter()
        .map(|b| GroupResult {
            key: b.key_as_string(),
            count: b.doc_count,
        })
        .collect()
}

/// One top-N group per terms bucket, sampled from the `top_hits` sub-aggregation
pub fn top_n_from_terms(terms: &TermsAggregate, top_hits_name: &str) -> Result<Vec<GroupTopNResult>> {
    terms
        .buckets
        .iter()
        .map(|bucket| {
            let top_hits = match bucket.aggregations.get(top_hits_name) {
                Some(Aggregate::TopHits(top_hits)) => top_hits,
                Some(other) => {
                    return Err(Error::UnexpectedAggregate {
                        expected: "top_hits",
                        found: other.shape(),
                    })
                }
                None => return Err(Error::MissingSubAggregation(top_hits_name.to_string())),
            };

            Ok(GroupTopNResult {
                key: bucket.key_as_string(),
                total_in_group: top_hits.hits.total.map(|t| t.value),
                documents: top_hits.hits.hits.iter().map(Hit::source_document).collect(),
            })
        })
        .collect()
}

/// One top-N group per collapsed hit.
///
/// The group key is the collapse field echoed in the hit's `fields`. Only the
/// first inner-hits group is read; without one (or with an empty one) the
/// leading hit itself is the sample and the group total stays unknown.
pub fn top_n_from_collapsed(hits: &Hits, collapse_field: &str) -> Vec<GroupTopNResult> {
    hits.hits
        .iter()
        .map(|hit| {
            if hit.fields.len() > 1 {
                warn!(
                    collapse_field,
                    fields = hit.fields.len(),
                    "collapsed hit echoes several fields, keying by the collapse field"
                );
            }
            if hit.inner_hits.len() > 1 {
                warn!(
                    groups = hit.inner_hits.len(),
                    "several inner_hits groups configured, only the first is used"
                );
            }

            let key = hit
                .fields
                .iter()
                .find(|(name, _)| name == collapse_field)
                .or_else(|| hit.fields.first())
                .and_then(|(_, values)| values.first())
                .map(render_value)
                .unwrap_or_default();

            match hit.inner_hits.first() {
                Some((_, inner)) if !inner.hits.hits.is_empty() => GroupTopNResult {
                    key,
                    total_in_group: inner.hits.total.map(|t| t.value),
                    documents: inner.hits.hits.iter().map(Hit::source_document).collect(),
                },
                _ => GroupTopNResult {
                    key,
                    total_in_group: None,
                    documents: vec![hit.source_document()],
                },
            }
        })
        .collect()
}
