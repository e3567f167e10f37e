//! In-process search engine for end-to-end tests
//!
//! Serves the query, browse, multi-query and facet value endpoints over real
//! HTTP with a deliberately small matcher: case-insensitive substring match on
//! `name`, `facetFilters` as an AND of strings and OR arrays, `numericFilters`
//! as `attr op number` comparisons, facet counts over the matching records.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const DEFAULT_HITS_PER_PAGE: usize = 20;

/// Records of each index, plus a count of requests served
#[derive(Default)]
pub struct EngineState {
    indexes: HashMap<String, Vec<Value>>,
    requests: AtomicUsize,
}

impl EngineState {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn search(&self, index: &str, params: &Value) -> Option<Value> {
        let records = self.indexes.get(index)?;
        let matching = matching_records(records, params);

        let mut facets: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for facet in requested_facets(params) {
            let counts = facets.entry(facet.clone()).or_default();
            for record in &matching {
                for value in attribute_values(record, &facet) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }
        }

        let hits_per_page = params["hitsPerPage"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_HITS_PER_PAGE);
        let page = params["page"].as_u64().unwrap_or(0) as usize;
        let hits: Vec<Value> = matching
            .iter()
            .skip(page * hits_per_page)
            .take(hits_per_page)
            .map(|r| (*r).clone())
            .collect();
        let nb_pages = if hits_per_page == 0 {
            0
        } else {
            matching.len().div_ceil(hits_per_page)
        };

        Some(json!({
            "hits": hits,
            "nbHits": matching.len(),
            "page": page,
            "nbPages": nb_pages,
            "hitsPerPage": hits_per_page,
            "facets": facets,
            "exhaustiveFacetsCount": true,
            "query": params["query"].clone(),
            "processingTimeMS": 1
        }))
    }

    /// Values of `facet` containing `facetQuery`, most frequent first
    fn facet_values(&self, index: &str, facet: &str, params: &Value) -> Option<Value> {
        let records = self.indexes.get(index)?;
        let needle = params["facetQuery"].as_str().unwrap_or("").to_lowercase();

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for record in matching_records(records, params) {
            for value in attribute_values(record, facet) {
                if value.to_lowercase().contains(&needle) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }
        }
        let mut hits: Vec<(String, u64)> = counts.into_iter().collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let facet_hits: Vec<Value> = hits
            .into_iter()
            .map(|(value, count)| json!({"value": value, "count": count}))
            .collect();
        Some(json!({
            "facetHits": facet_hits,
            "exhaustiveFacetsCount": true,
            "processingTimeMS": 1
        }))
    }

    /// Browse pages through the records; the cursor is the next page number
    fn browse(&self, index: &str, params: &Value) -> Option<Value> {
        let page = params["cursor"]
            .as_str()
            .and_then(|c| c.parse::<u64>().ok())
            .unwrap_or(0);
        let mut params = params.clone();
        params["page"] = json!(page);
        let mut answer = self.search(index, &params)?;

        let nb_pages = answer["nbPages"].as_u64().unwrap_or(0);
        if let Value::Object(fields) = &mut answer {
            fields.remove("facets");
            if page + 1 < nb_pages {
                fields.insert("cursor".into(), json!((page + 1).to_string()));
            }
        }
        Some(answer)
    }
}

fn matching_records<'a>(records: &'a [Value], params: &Value) -> Vec<&'a Value> {
    let text = params["query"].as_str().unwrap_or("").to_lowercase();
    let filters = params.get("facetFilters").cloned().unwrap_or(Value::Null);
    let numeric = params.get("numericFilters").cloned().unwrap_or(Value::Null);
    records
        .iter()
        .filter(|r| {
            matches_text(r, &text) && matches_filters(r, &filters) && matches_numeric(r, &numeric)
        })
        .collect()
}

fn matches_text(record: &Value, text: &str) -> bool {
    text.is_empty()
        || record["name"]
            .as_str()
            .is_some_and(|name| name.to_lowercase().contains(text))
}

fn attribute_values(record: &Value, attribute: &str) -> Vec<String> {
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    match record.get(attribute) {
        Some(Value::Array(values)) => values.iter().filter_map(scalar).collect(),
        Some(value) => scalar(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn matches_filter(record: &Value, filter: &str) -> bool {
    match filter.split_once(':') {
        Some((facet, value)) => attribute_values(record, facet).iter().any(|v| v == value),
        None => false,
    }
}

fn matches_filters(record: &Value, filters: &Value) -> bool {
    match filters {
        Value::Array(entries) => entries.iter().all(|entry| match entry {
            Value::String(filter) => matches_filter(record, filter),
            Value::Array(any) => any
                .iter()
                .filter_map(Value::as_str)
                .any(|filter| matches_filter(record, filter)),
            _ => true,
        }),
        Value::String(filter) => matches_filter(record, filter),
        _ => true,
    }
}

/// `attr op number`, e.g. `born >= 1955`
fn matches_comparison(record: &Value, filter: &str) -> bool {
    let parts: Vec<&str> = filter.split_whitespace().collect();
    let [attribute, op, bound] = parts.as_slice() else {
        return false;
    };
    let (Some(actual), Ok(bound)) = (record[*attribute].as_f64(), bound.parse::<f64>()) else {
        return false;
    };
    match *op {
        ">=" => actual >= bound,
        ">" => actual > bound,
        "<=" => actual <= bound,
        "<" => actual < bound,
        "=" => actual == bound,
        "!=" => actual != bound,
        _ => false,
    }
}

fn matches_numeric(record: &Value, filters: &Value) -> bool {
    match filters {
        Value::Array(entries) => entries
            .iter()
            .filter_map(Value::as_str)
            .all(|filter| matches_comparison(record, filter)),
        Value::String(filters) => filters
            .split(',')
            .all(|filter| matches_comparison(record, filter)),
        _ => true,
    }
}

fn requested_facets(params: &Value) -> Vec<String> {
    match &params["facets"] {
        Value::Array(facets) => facets.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Value::String(facets) => facets.split(',').map(|f| f.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

fn missing_index() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "Index does not exist", "status": 404})),
    )
}

async fn handle(
    State(state): State<Arc<EngineState>>,
    Path((index, action)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let answer = match action.as_str() {
        "query" => state.search(&index, &body),
        "browse" => state.browse(&index, &body),
        "queries" if index == "*" => {
            let requests = body["requests"].as_array().cloned().unwrap_or_default();
            let mut results = Vec::with_capacity(requests.len());
            for request in &requests {
                let name = request["indexName"].as_str().unwrap_or_default();
                match state.search(name, &request["params"]) {
                    Some(result) => results.push(result),
                    None => return missing_index(),
                }
            }
            Some(json!({ "results": results }))
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"message": format!("unknown action {action}"), "status": 400})),
            )
        }
    };

    match answer {
        Some(answer) => (StatusCode::OK, Json(answer)),
        None => missing_index(),
    }
}

async fn handle_facet_values(
    State(state): State<Arc<EngineState>>,
    Path((index, facet)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.fetch_add(1, Ordering::SeqCst);
    match state.facet_values(&index, &facet, &body) {
        Some(answer) => (StatusCode::OK, Json(answer)),
        None => missing_index(),
    }
}

/// A running engine; shut down on drop
pub struct TestEngine {
    pub addr: SocketAddr,
    pub state: Arc<EngineState>,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl TestEngine {
    pub async fn start(indexes: Vec<(&str, Vec<Value>)>) -> Self {
        let state = Arc::new(EngineState {
            indexes: indexes
                .into_iter()
                .map(|(name, records)| (name.to_string(), with_object_ids(records)))
                .collect(),
            requests: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/1/indexes/:index/:action", post(handle))
            .route("/1/indexes/:index/facets/:facet/query", post(handle_facet_values))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            _shutdown: shutdown_tx,
        }
    }

    /// Host name as given to the client (`ip:port`)
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn requests(&self) -> usize {
        self.state.requests()
    }
}

fn with_object_ids(records: Vec<Value>) -> Vec<Value> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, mut record)| {
            if record.get("objectID").is_none() {
                record["objectID"] = json!(i.to_string());
            }
            record
        })
        .collect()
}

/// The phone catalogue: 8 products over 3 brands and 2 categories
pub fn products() -> Vec<Value> {
    vec![
        json!({"name": "iPhone 6", "brand": "Apple", "category": "device", "stars": 4}),
        json!({"name": "iPhone 6 Plus", "brand": "Apple", "category": "device", "stars": 5}),
        json!({"name": "iPhone cover", "brand": "Apple", "category": "accessory", "stars": 3}),
        json!({"name": "Galaxy S5", "brand": "Samsung", "category": "device", "stars": 4}),
        json!({"name": "Wonder Phone", "brand": "Samsung", "category": "device", "stars": 5}),
        json!({"name": "Platinum Phone Cover", "brand": "Samsung", "category": "accessory", "stars": 2}),
        json!({"name": "Lame Phone", "brand": "Whatever", "category": "device", "stars": 1}),
        json!({"name": "Lame Phone cover", "brand": "Whatever", "category": "accessory", "stars": 1}),
    ]
}

/// Five hotels with multi-valued `facilities`
pub fn hotels() -> Vec<Value> {
    vec![
        json!({"name": "Hotel A", "stars": "*", "facilities": ["wifi", "bath", "spa"], "city": "Paris"}),
        json!({"name": "Hotel B", "stars": "*", "facilities": ["wifi"], "city": "Paris"}),
        json!({"name": "Hotel C", "stars": "**", "facilities": ["bath"], "city": "San Francisco"}),
        json!({"name": "Hotel D", "stars": "****", "facilities": ["spa"], "city": "Paris"}),
        json!({"name": "Hotel E", "stars": "****", "facilities": ["spa"], "city": "New York"}),
    ]
}

/// Comic characters with a multi-valued `kind` and a numeric `born`
pub fn characters() -> Vec<Value> {
    vec![
        json!({"name": "Snoopy", "kind": ["dog", "animal"], "born": 1950, "series": "Peanuts"}),
        json!({"name": "Woodstock", "kind": ["bird", "animal"], "born": 1960, "series": "Peanuts"}),
        json!({"name": "Charlie Brown", "kind": ["human"], "born": 1950, "series": "Peanuts"}),
        json!({"name": "Hobbes", "kind": ["tiger", "animal", "teddy"], "born": 1985, "series": "Calvin & Hobbes"}),
        json!({"name": "Calvin", "kind": ["human"], "born": 1985, "series": "Calvin & Hobbes"}),
    ]
}
