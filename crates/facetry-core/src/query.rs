//! Search query parameters

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Build a `facet:value` filter expression
pub fn facet_filter(facet: &str, value: &str) -> String {
    format!("{}:{}", facet, value)
}

/// Search query: an opaque, key-sorted map of query parameters
///
/// The client only reads or rewrites a handful of parameters (`facets`,
/// `facetFilters`, `hitsPerPage`, ...). Everything else is passed to the
/// service as is. Keys are kept sorted so that two equal queries always
/// serialize to the same body, which makes the body usable as a cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    params: BTreeMap<String, Value>,
}

impl Query {
    /// Create a full-text query
    pub fn new(text: impl Into<String>) -> Self {
        Self::default().set("query", text.into())
    }

    /// Set a parameter, builder style
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.params.remove(key)
    }

    /// Full-text part of the query, if any
    pub fn text(&self) -> Option<&str> {
        self.get("query").and_then(Value::as_str)
    }

    /// Facets to compute counts for
    pub fn with_facets<I, S>(self, facets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let facets: Vec<Value> = facets.into_iter().map(|f| Value::String(f.into())).collect();
        self.set("facets", facets)
    }

    pub fn with_hits_per_page(self, hits_per_page: u32) -> Self {
        self.set("hitsPerPage", hits_per_page)
    }

    pub fn with_page(self, page: u32) -> Self {
        self.set("page", page)
    }

    /// Existing `facetFilters`, flattened to a list of top-level entries
    ///
    /// A non-array value is treated as a single entry.
    pub fn facet_filters(&self) -> Vec<Value> {
        match self.get("facetFilters") {
            Some(Value::Array(filters)) => filters.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        }
    }

    /// Names listed in `facets`
    pub fn facet_names(&self) -> Vec<String> {
        match self.get("facets") {
            Some(Value::Array(facets)) => facets
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(facets)) => facets
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Request body for this query
    pub fn to_body(&self) -> Value {
        Value::Object(
            self.params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
