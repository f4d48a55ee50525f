//! Uniform result types returned by the facade

use crate::response::{Document, TotalHitsRelation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a plain listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingResult {
    /// Total matching documents as reported by the engine
    pub total: u64,
    /// `gte` when `total` is a lower bound
    pub total_relation: TotalHitsRelation,
    pub documents: Vec<Document>,
    /// Sort values of the last hit, to pass as `search_after` for the next page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sort_values: Option<Vec<Value>>,
}

/// One group of a grouped count
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupResult {
    pub key: String,
    pub count: u64,
}

/// One group with a sample of its top documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTopNResult {
    pub key: String,
    /// Documents in the group, when the engine reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_in_group: Option<u64>,
    pub documents: Vec<Document>,
}
