//! facetry-core: Core types and merge logic for the facetry search client
//!
//! This crate holds everything that does not need a runtime:
//! - Host roles (read vs write traffic)
//! - Client configuration (timeouts, host-down delay, cache sizing)
//! - Search queries and the response shape consumed from the service
//! - Disjunctive faceting: query decomposition and result merging
//!
//! # Disjunctive faceting
//!
//! The search service can only AND filters together. To show, for an
//! OR-refined facet, how many hits each of its values *would* have, the client
//! issues one extra query per disjunctive facet:
//!
//! | Query | Filters applied |
//! |-------|-----------------|
//! | primary | every conjunctive refinement + every disjunctive refinement |
//! | side query for `F` | every conjunctive refinement + every disjunctive refinement except `F` |
//!
//! [`FacetQuerySet`] builds those N+1 queries and merges their answers into
//! one [`AggregatedResult`]. Issuing them is the job of `facetry-client`.

mod config;
mod error;
mod facets;
mod query;
mod response;
mod role;

pub use config::{CacheConfig, ClientConfig, DisjunctiveStrategy};
pub use error::Error;
pub use facets::{FacetQuerySet, Refinements};
pub use query::{facet_filter, Query};
pub use response::{
    AggregatedResult, FacetCounts, FacetHit, FacetValuesResponse, IndexedQuery, MultiQueryRequest,
    MultiQueryResponse, SearchResponse,
};
pub use role::HostRole;

pub type Result<T> = std::result::Result<T, Error>;

/// Defaults shared by the configuration and the client
pub mod constants {
    /// Per-attempt connect timeout in milliseconds
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

    /// Per-attempt read timeout in milliseconds
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;

    /// How long a failed host stays out of rotation, in milliseconds
    pub const DEFAULT_HOST_DOWN_DELAY_MS: u64 = 5 * 60 * 1_000;

    /// Search cache entry lifetime in seconds
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 120;

    /// Search cache capacity (entries)
    pub const DEFAULT_CACHE_MAX_SIZE: usize = 64;
}
