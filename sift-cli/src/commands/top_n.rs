use super::read_query;
use anyhow::Result;
use serde_json::Value;
use sift::query::Aggregation;
use sift::{ResultContext, SearchFacade};
use std::path::Path;

const GROUPS_AGGREGATION: &str = "groups";
const TOP_HITS_AGGREGATION: &str = "top";

/// Top `per_group` documents for each of the `groups` most frequent values of `field`
pub async fn run_top_n(
    facade: &SearchFacade,
    index: Option<&str>,
    query: Option<&Path>,
    field: &str,
    groups: usize,
    per_group: usize,
    ctx: &mut ResultContext,
) -> Result<Value> {
    let query = read_query(query)?;
    let results = facade
        .top_n_by_aggregation(
            index,
            query,
            Aggregation::terms(field).size(groups).named(GROUPS_AGGREGATION),
            Aggregation::top_hits(per_group).named(TOP_HITS_AGGREGATION),
            ctx,
        )
        .await?;
    Ok(serde_json::to_value(results)?)
}
