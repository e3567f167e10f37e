//! Response shapes consumed from, and produced for, the search service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::Query;

/// Facet name -> (facet value -> hit count)
pub type FacetCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// Answer to a single search query
///
/// Only the fields the client interprets are typed; everything else the
/// service returns (`page`, `nbPages`, `processingTimeMS`, ...) is kept in
/// `extra` and handed back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Value>,
    #[serde(default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub facets: FacetCounts,
    /// Absent means the service made no exhaustiveness claim
    #[serde(default)]
    pub exhaustive_facets_count: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Merged answer to a disjunctive faceting search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub hits: Vec<Value>,
    pub nb_hits: u64,
    /// Counts for the non-disjunctive facets, from the primary query
    pub facets: FacetCounts,
    /// Counts for each disjunctive facet, from its side query
    pub disjunctive_facets: FacetCounts,
    /// True only if every contributing query reported exhaustive counts
    pub exhaustive_facets_count: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a multi-query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedQuery {
    pub index_name: String,
    pub params: Query,
}

/// Body of a multi-query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiQueryRequest {
    pub requests: Vec<IndexedQuery>,
}

impl MultiQueryRequest {
    /// Target every query at the same index
    pub fn for_index(index_name: &str, queries: &[Query]) -> Self {
        Self {
            requests: queries
                .iter()
                .map(|q| IndexedQuery {
                    index_name: index_name.to_string(),
                    params: q.clone(),
                })
                .collect(),
        }
    }
}

/// Answer to a multi-query request, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiQueryResponse {
    pub results: Vec<SearchResponse>,
}

/// One facet value matching a facet value search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetHit {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<String>,
    pub count: u64,
}

/// Answer to a search for facet values, most frequent first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetValuesResponse {
    #[serde(default)]
    pub facet_hits: Vec<FacetHit>,
    #[serde(default)]
    pub exhaustive_facets_count: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
