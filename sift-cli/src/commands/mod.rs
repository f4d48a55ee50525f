pub mod group;
pub mod list;
pub mod top_n;

pub use group::{run_group_all, run_group_by};
pub use list::{run_collapse, run_list};
pub use top_n::run_top_n;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use sift::query::Query;
use std::path::Path;

/// Parse `<name>=<value>`
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected <name>=<value>, got '{}'", s)),
    }
}

/// Read and decode a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

/// Read an optional query file
pub fn read_query(path: Option<&Path>) -> Result<Option<Query>> {
    path.map(read_json::<Query>).transpose()
}
