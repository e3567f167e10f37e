//! facetry: resilient multi-host search client with disjunctive faceting
//!
//! Re-exports the building blocks from the workspace crates:
//! - [`facetry_core`]: configuration, queries, responses, facet merging
//! - [`facetry_client`]: host pool, failover executor, caches, search client

pub use facetry_client::{
    AttemptTimeouts, ClientError, ExpiringCache, Host, HostFailure, HostPool, HttpTransport,
    Index, Method, NoopCache, RawResponse, RequestExecutor, RequestSpec, ResponseCache, Result,
    SearchClient, Transport, TransportError,
};
pub use facetry_core::{
    constants, facet_filter, AggregatedResult, CacheConfig, ClientConfig, DisjunctiveStrategy,
    FacetCounts, FacetHit, FacetQuerySet, FacetValuesResponse, HostRole, IndexedQuery,
    MultiQueryRequest, MultiQueryResponse, Query, Refinements, SearchResponse,
};
