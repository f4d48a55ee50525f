use super::read_json;
use anyhow::Result;
use serde_json::Value;
use sift::query::SearchSource;
use sift::{ResultContext, SearchFacade};
use std::path::Path;

/// Run a listing search from a body file
pub async fn run_list(
    facade: &SearchFacade,
    index: Option<&str>,
    body: &Path,
    ctx: &mut ResultContext,
) -> Result<Value> {
    let source: SearchSource = read_json(body)?;
    let listing = facade.query_list(index, source, ctx).await?;
    Ok(serde_json::to_value(listing)?)
}

/// Run a collapse search from a body file
pub async fn run_collapse(
    facade: &SearchFacade,
    index: Option<&str>,
    body: &Path,
    ctx: &mut ResultContext,
) -> Result<Value> {
    let source: SearchSource = read_json(body)?;
    let groups = facade.top_n_by_collapse(index, source, ctx).await?;
    Ok(serde_json::to_value(groups)?)
}
