use super::{read_json, read_query};
use anyhow::Result;
use serde_json::Value;
use sift::query::{Aggregation, CompositeSource, NamedAggregation};
use sift::{ResultContext, SearchFacade};
use std::path::Path;

/// Count per bucket of the aggregation read from `<name>=<file>`
pub async fn run_group_by(
    facade: &SearchFacade,
    index: Option<&str>,
    query: Option<&Path>,
    (name, file): (String, String),
    ctx: &mut ResultContext,
) -> Result<Value> {
    let query = read_query(query)?;
    let aggregation: Aggregation = read_json(Path::new(&file))?;
    let groups = facade
        .group_by(index, query, NamedAggregation::new(name, aggregation), ctx)
        .await?;
    tracing::info!(groups = groups.len(), "group-by finished");
    Ok(serde_json::to_value(groups)?)
}

/// Count per distinct combination of `<name>=<field>` terms sources
pub async fn run_group_all(
    facade: &SearchFacade,
    index: Option<&str>,
    query: Option<&Path>,
    sources: Vec<(String, String)>,
    ctx: &mut ResultContext,
) -> Result<Value> {
    let query = read_query(query)?;
    let sources = sources
        .into_iter()
        .map(|(name, field)| CompositeSource::terms(name, field))
        .collect();
    let groups = facade.group_by_all(index, query, sources, ctx).await?;
    tracing::info!(groups = groups.len(), "grouped count finished");
    Ok(serde_json::to_value(groups)?)
}
