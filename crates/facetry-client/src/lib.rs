//! facetry-client: multi-host search client
//!
//! Requests fail over across an ordered list of hosts per role, remembering
//! which hosts recently failed. Searches can be served from a per-index
//! cache, and disjunctive faceting searches fan out into concurrent
//! sub-queries whose answers are merged into one result.
//!
//! ```no_run
//! use facetry_client::SearchClient;
//! use facetry_core::{ClientConfig, Query, Refinements};
//!
//! # async fn run() -> facetry_client::Result<()> {
//! let client = SearchClient::new(ClientConfig::with_hosts(["search-1.example", "search-2.example"]))?;
//! let index = client.index("products");
//!
//! let mut refinements = Refinements::new();
//! refinements.entry("brand".into()).or_default().insert("Apple".into());
//!
//! let result = index
//!     .search_disjunctive_faceting(&Query::new("phone"), ["brand"], &refinements)
//!     .await?;
//! println!("{} hits", result.nb_hits);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
mod disjunctive;
pub mod error;
pub mod executor;
pub mod host_pool;
pub mod metrics;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cache::{ExpiringCache, NoopCache, ResponseCache};
pub use client::{Index, SearchClient};
pub use error::{ClientError, HostFailure, Result, TransportError};
pub use executor::RequestExecutor;
pub use host_pool::{Host, HostPool};
pub use transport::{AttemptTimeouts, HttpTransport, Method, RawResponse, RequestSpec, Transport};
