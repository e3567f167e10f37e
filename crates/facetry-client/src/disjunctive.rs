//! Disjunctive faceting fan-out
//!
//! A search is decomposed by [`FacetQuerySet`] into a primary query and one
//! side query per disjunctive facet. All of them are dispatched at once, then
//! merged into a single [`AggregatedResult`]. Any failing sub-query fails the
//! whole search, and the remaining ones are aborted.

use std::time::{Duration, Instant};

use facetry_core::{
    AggregatedResult, DisjunctiveStrategy, FacetQuerySet, Query, Refinements, SearchResponse,
};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::client::Index;
use crate::error::{ClientError, Result};
use crate::metrics;
use crate::transport::Transport;

impl<T: Transport> Index<T> {
    /// Search with OR semantics on `disjunctive_facets`
    ///
    /// Every refined facet not listed as disjunctive is ANDed with the query.
    pub async fn search_disjunctive_faceting<I, S>(
        &self,
        query: &Query,
        disjunctive_facets: I,
        refinements: &Refinements,
    ) -> Result<AggregatedResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = FacetQuerySet::new(query.clone(), disjunctive_facets, refinements.clone());
        self.search_faceted(&set, None).await
    }

    /// Same as [`search_disjunctive_faceting`](Self::search_disjunctive_faceting),
    /// failing with [`ClientError::Timeout`] if the whole search outlives `deadline`
    pub async fn search_disjunctive_faceting_with_deadline<I, S>(
        &self,
        query: &Query,
        disjunctive_facets: I,
        refinements: &Refinements,
        deadline: Duration,
    ) -> Result<AggregatedResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = FacetQuerySet::new(query.clone(), disjunctive_facets, refinements.clone());
        self.search_faceted(&set, Some(deadline)).await
    }

    /// Run a prepared query set and merge its answers
    pub async fn search_faceted(
        &self,
        set: &FacetQuerySet,
        deadline: Option<Duration>,
    ) -> Result<AggregatedResult> {
        let started = Instant::now();
        let queries = set.queries();
        let width = queries.len();
        let strategy = self.client.config().disjunctive_strategy;

        debug!(
            index = %self.name(),
            queries = width,
            strategy = ?strategy,
            "Dispatching disjunctive search"
        );

        let dispatch = self.dispatch(queries, strategy);
        let results = match deadline {
            Some(deadline) => match tokio::time::timeout(deadline, dispatch).await {
                Ok(results) => results,
                Err(_) => {
                    warn!(index = %self.name(), ?deadline, "Disjunctive search deadline exceeded");
                    metrics::record_disjunctive_search(width, metrics::OUTCOME_TIMEOUT, started.elapsed());
                    return Err(ClientError::Timeout(deadline));
                }
            },
            None => dispatch.await,
        };

        let merged = results.and_then(|results| {
            set.merge(&results)
                .map_err(|e| ClientError::Aggregation(e.to_string()))
        });

        let outcome = match &merged {
            Ok(_) => metrics::OUTCOME_OK,
            Err(e) if e.is_api_error() => metrics::OUTCOME_API_ERROR,
            Err(_) => metrics::OUTCOME_TRANSPORT_ERROR,
        };
        metrics::record_disjunctive_search(width, outcome, started.elapsed());
        merged
    }

    async fn dispatch(
        &self,
        queries: Vec<Query>,
        strategy: DisjunctiveStrategy,
    ) -> Result<Vec<SearchResponse>> {
        match strategy {
            DisjunctiveStrategy::Parallel => self.dispatch_parallel(queries).await,
            DisjunctiveStrategy::Batched => Ok(self.multiple_queries(&queries).await?.results),
        }
    }

    /// One task per query, results reassembled by position
    ///
    /// Returning early drops the join set, which aborts the tasks still running.
    async fn dispatch_parallel(&self, queries: Vec<Query>) -> Result<Vec<SearchResponse>> {
        let width = queries.len();
        let mut tasks = JoinSet::new();
        for (position, query) in queries.into_iter().enumerate() {
            let index = self.clone();
            tasks.spawn(async move { (position, index.search(&query).await) });
        }

        let mut slots: Vec<Option<SearchResponse>> = vec![None; width];
        while let Some(joined) = tasks.join_next().await {
            let (position, result) = joined
                .map_err(|e| ClientError::Aggregation(format!("sub-query task failed: {e}")))?;
            slots[position] = Some(result?);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.ok_or_else(|| ClientError::Aggregation(format!("sub-query {position} returned nothing")))
            })
            .collect()
    }
}
