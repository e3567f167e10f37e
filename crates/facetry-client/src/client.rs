//! Search client and per-index handles

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use facetry_core::constants::{DEFAULT_CACHE_MAX_SIZE, DEFAULT_CACHE_TTL_SECS};
use facetry_core::{
    ClientConfig, FacetValuesResponse, HostRole, MultiQueryRequest, MultiQueryResponse, Query,
    SearchResponse,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{ExpiringCache, NoopCache, ResponseCache};
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::host_pool::HostPool;
use crate::metrics;
use crate::transport::{AttemptTimeouts, HttpTransport, RawResponse, RequestSpec, Transport};

const MULTI_QUERY_PATH: &str = "/1/indexes/*/queries";

/// Bytes escaped in a path segment: everything but RFC 3986 unreserved
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

struct ClientInner<T> {
    executor: RequestExecutor<T>,
    config: ClientConfig,
}

/// Entry point: owns the host pool and the transport, hands out indexes
///
/// Cloning is cheap and every clone shares the same host liveness state.
pub struct SearchClient<T = HttpTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T> Clone for SearchClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SearchClient<HttpTransport> {
    /// Create a client talking HTTP to the configured hosts
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        info!(
            read_hosts = config.read_hosts.len(),
            write_hosts = config.write_hosts.len(),
            scheme = %config.scheme,
            "Search client created"
        );
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> SearchClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let pool = Arc::new(HostPool::from_config(&config));
        Self::with_pool(config, pool, Arc::new(transport))
    }

    /// Create a client over an existing host pool, e.g. one shared with
    /// another client
    pub fn with_pool(config: ClientConfig, pool: Arc<HostPool>, transport: Arc<T>) -> Self {
        let executor = RequestExecutor::new(pool, transport, AttemptTimeouts::from_config(&config));
        Self {
            inner: Arc::new(ClientInner { executor, config }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn host_pool(&self) -> &Arc<HostPool> {
        self.inner.executor.pool()
    }

    pub fn transport(&self) -> &Arc<T> {
        self.inner.executor.transport()
    }

    /// How long a failed host is skipped; takes effect on the next request
    pub fn set_host_down_delay(&self, delay: Duration) {
        self.host_pool().set_down_delay(delay);
    }

    /// Handle on one index, with its own search cache
    pub fn index(&self, name: impl Into<String>) -> Index<T> {
        let cache = &self.inner.config.cache;
        let slot = if cache.enabled {
            CacheSlot::expiring(cache.ttl, cache.max_size)
        } else {
            CacheSlot::disabled()
        };
        Index {
            client: self.clone(),
            name: name.into(),
            cache: Arc::new(ArcSwap::from_pointee(slot)),
        }
    }

    /// Run an arbitrary request with failover on the hosts of `role`
    pub async fn request(&self, spec: &RequestSpec, role: HostRole) -> Result<RawResponse> {
        self.inner.executor.execute(spec, role).await
    }

    pub async fn request_json<R: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        role: HostRole,
    ) -> Result<R> {
        self.inner.executor.execute_json(spec, role).await
    }

    /// Send several queries in one request; results come back in order
    pub async fn multiple_queries(&self, request: &MultiQueryRequest) -> Result<MultiQueryResponse> {
        let spec = RequestSpec::post(MULTI_QUERY_PATH, serde_json::to_value(request)?);
        self.request_json(&spec, HostRole::Read).await
    }
}

/// The cache currently in use by an index, and the lifetime of new entries
struct CacheSlot {
    cache: Box<dyn ResponseCache>,
    ttl: Duration,
}

impl CacheSlot {
    fn disabled() -> Self {
        Self {
            cache: Box::new(NoopCache),
            ttl: Duration::ZERO,
        }
    }

    fn expiring(ttl: Duration, max_size: usize) -> Self {
        Self {
            cache: Box::new(ExpiringCache::new(max_size)),
            ttl,
        }
    }
}

/// Handle on one index
///
/// Searches go through the index's cache, which is off unless the client
/// configuration enables it or [`Index::enable_search_cache`] is called.
/// Clones share the cache.
pub struct Index<T = HttpTransport> {
    pub(crate) client: SearchClient<T>,
    name: String,
    cache: Arc<ArcSwap<CacheSlot>>,
}

impl<T> Clone for Index<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            name: self.name.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<T: Transport> Index<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &SearchClient<T> {
        &self.client
    }

    /// Start caching search results; replaces any previous cache
    pub fn enable_search_cache(&self, ttl: Duration, max_size: usize) {
        self.cache.store(Arc::new(CacheSlot::expiring(ttl, max_size)));
        debug!(index = %self.name, ttl_ms = ttl.as_millis() as u64, max_size, "Search cache enabled");
    }

    /// Enable the cache with a 120 s lifetime and 64 entries
    pub fn enable_default_search_cache(&self) {
        self.enable_search_cache(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            DEFAULT_CACHE_MAX_SIZE,
        );
    }

    /// Stop caching and drop every cached entry
    pub fn disable_search_cache(&self) {
        self.cache.store(Arc::new(CacheSlot::disabled()));
        debug!(index = %self.name, "Search cache disabled");
    }

    pub fn is_search_cache_enabled(&self) -> bool {
        self.cache.load().cache.is_enabled()
    }

    /// Entries currently held by the search cache
    pub fn cached_entries(&self) -> usize {
        self.cache.load().cache.len()
    }

    /// Path of an index endpoint; the index name is sent as one escaped
    /// segment
    pub(crate) fn path(&self, action: &str) -> String {
        format!("/1/indexes/{}/{}", encode_segment(&self.name), action)
    }

    /// Search the index
    pub async fn search(&self, query: &Query) -> Result<SearchResponse> {
        let spec = RequestSpec::post(self.path("query"), query.to_body());
        let body = self.cached_read(&spec).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Search the index, returning the undecoded answer
    pub async fn search_raw(&self, query: &Query) -> Result<Value> {
        let spec = RequestSpec::post(self.path("query"), query.to_body());
        let body = self.cached_read(&spec).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Browse the index page by page; pass the previous page's cursor to
    /// continue. Never cached.
    pub async fn browse(&self, query: &Query, cursor: Option<&str>) -> Result<SearchResponse> {
        let mut body = query.to_body();
        if let (Some(cursor), Value::Object(params)) = (cursor, &mut body) {
            params.insert("cursor".to_string(), Value::String(cursor.to_string()));
        }
        let spec = RequestSpec::post(self.path("browse"), body);
        self.client.request_json(&spec, HostRole::Read).await
    }

    /// Search the values of `facet` matching `text`
    ///
    /// `query` narrows the records whose values are counted, e.g. with
    /// `facetFilters`. Goes through the search cache like [`Index::search`].
    pub async fn search_for_facet_values(
        &self,
        facet: &str,
        text: &str,
        query: Option<&Query>,
    ) -> Result<FacetValuesResponse> {
        let params = query.cloned().unwrap_or_default().set("facetQuery", text);
        let action = format!("facets/{}/query", encode_segment(facet));
        let spec = RequestSpec::post(self.path(&action), params.to_body());
        let body = self.cached_read(&spec).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Run several queries on this index in one cache-aware request
    pub async fn multiple_queries(&self, queries: &[Query]) -> Result<MultiQueryResponse> {
        let request = MultiQueryRequest::for_index(&self.name, queries);
        let spec = RequestSpec::post(MULTI_QUERY_PATH, serde_json::to_value(&request)?);
        let body = self.cached_read(&spec).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Read-role request served from the cache when possible
    ///
    /// The cache is consulted before any host is selected. Only successful
    /// bodies are stored.
    async fn cached_read(&self, spec: &RequestSpec) -> Result<Arc<[u8]>> {
        let slot = self.cache.load_full();
        let key = spec.cache_key();

        if let Some(body) = slot.cache.get(&key) {
            metrics::record_cache_lookup(true);
            debug!(index = %self.name, path = %spec.path, "Search cache hit");
            return Ok(body);
        }
        metrics::record_cache_lookup(false);

        let response = self
            .client
            .request(spec, HostRole::Read)
            .await?
            .error_for_status()?;
        slot.cache.put(&key, Arc::clone(&response.body), slot.ttl);
        Ok(response.body)
    }
}
