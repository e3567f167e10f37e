//! Disjunctive faceting: decomposition into N+1 queries and result merging

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::{facet_filter, AggregatedResult, Error, Query, SearchResponse};

/// Facet name -> selected values
pub type Refinements = BTreeMap<String, BTreeSet<String>>;

/// A faceted search where some facets are OR-refined
///
/// Every refined facet that is not declared disjunctive is conjunctive: its
/// values are ANDed with the rest of the query on every sub-query.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetQuerySet {
    base: Query,
    conjunctive_facets: BTreeSet<String>,
    disjunctive_facets: Vec<String>,
    refinements: Refinements,
}

impl FacetQuerySet {
    /// Build a query set, deriving the conjunctive facets from the base
    /// query's `facets` and from the refinements
    pub fn new<I, S>(base: Query, disjunctive_facets: I, refinements: Refinements) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let disjunctive_facets = dedup(disjunctive_facets);
        let conjunctive_facets = base
            .facet_names()
            .into_iter()
            .chain(refinements.keys().cloned())
            .filter(|f| !disjunctive_facets.contains(f))
            .collect();

        Self {
            base,
            conjunctive_facets,
            disjunctive_facets,
            refinements,
        }
    }

    /// Build a query set with an explicit conjunctive facet list
    ///
    /// Fails if a facet is declared both conjunctive and disjunctive.
    pub fn with_facets<C, D, S, T>(
        base: Query,
        conjunctive_facets: C,
        disjunctive_facets: D,
        refinements: Refinements,
    ) -> crate::Result<Self>
    where
        C: IntoIterator<Item = S>,
        D: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let disjunctive_facets = dedup(disjunctive_facets);
        let mut conjunctive: BTreeSet<String> =
            conjunctive_facets.into_iter().map(Into::into).collect();

        if let Some(conflict) = disjunctive_facets.iter().find(|f| conjunctive.contains(*f)) {
            return Err(Error::FacetConflict(conflict.clone()));
        }

        conjunctive.extend(
            refinements
                .keys()
                .filter(|f| !disjunctive_facets.contains(*f))
                .cloned(),
        );

        Ok(Self {
            base,
            conjunctive_facets: conjunctive,
            disjunctive_facets,
            refinements,
        })
    }

    pub fn base(&self) -> &Query {
        &self.base
    }

    pub fn conjunctive_facets(&self) -> &BTreeSet<String> {
        &self.conjunctive_facets
    }

    /// Disjunctive facets, in side-query order
    pub fn disjunctive_facets(&self) -> &[String] {
        &self.disjunctive_facets
    }

    pub fn refinements(&self) -> &Refinements {
        &self.refinements
    }

    pub fn is_disjunctive(&self, facet: &str) -> bool {
        self.disjunctive_facets.iter().any(|f| f == facet)
    }

    /// Number of queries the search decomposes into
    pub fn query_count(&self) -> usize {
        1 + self.disjunctive_facets.len()
    }

    /// Primary query followed by one side query per disjunctive facet
    pub fn queries(&self) -> Vec<Query> {
        let mut queries = Vec::with_capacity(self.query_count());
        queries.push(self.primary_query());
        for facet in &self.disjunctive_facets {
            queries.push(self.side_query(facet));
        }
        queries
    }

    /// Fully filtered query: hits, nbHits and conjunctive facet counts
    pub fn primary_query(&self) -> Query {
        let mut query = self.base.clone();
        query.insert("facetFilters", self.facet_filters(None));
        query
    }

    /// Counts-only query for `facet`, ignoring that facet's own refinements
    pub fn side_query(&self, facet: &str) -> Query {
        let mut query = self.base.clone();
        query.insert("facetFilters", self.facet_filters(Some(facet)));
        query.insert("facets", vec![Value::String(facet.to_string())]);
        query.insert("hitsPerPage", 0);
        query.insert("attributesToRetrieve", Vec::<Value>::new());
        query.insert("attributesToHighlight", Vec::<Value>::new());
        query.insert("attributesToSnippet", Vec::<Value>::new());
        query.insert("analytics", false);
        query
    }

    /// Filters for one sub-query
    ///
    /// Base filters come first, then one AND entry per conjunctive value, then
    /// one OR group per refined disjunctive facet other than `excluded`.
    fn facet_filters(&self, excluded: Option<&str>) -> Value {
        let mut filters = self.base.facet_filters();

        for (facet, values) in &self.refinements {
            if self.is_disjunctive(facet) {
                continue;
            }
            filters.extend(values.iter().map(|v| Value::String(facet_filter(facet, v))));
        }

        for facet in &self.disjunctive_facets {
            if Some(facet.as_str()) == excluded {
                continue;
            }
            let Some(values) = self.refinements.get(facet) else {
                continue;
            };
            if values.is_empty() {
                continue;
            }
            filters.push(Value::Array(
                values
                    .iter()
                    .map(|v| Value::String(facet_filter(facet, v)))
                    .collect(),
            ));
        }

        Value::Array(filters)
    }

    /// Merge sub-query answers, given in [`queries`](Self::queries) order
    ///
    /// The merge is a pure function of its inputs: merging the same answers
    /// twice yields equal results.
    pub fn merge(&self, results: &[SearchResponse]) -> crate::Result<AggregatedResult> {
        if results.len() != self.query_count() {
            return Err(Error::ResultCountMismatch {
                expected: self.query_count(),
                actual: results.len(),
            });
        }

        let (primary, sides) = results.split_first().ok_or(Error::ResultCountMismatch {
            expected: self.query_count(),
            actual: 0,
        })?;

        let mut exhaustive = primary.exhaustive_facets_count;
        let mut disjunctive_facets = BTreeMap::new();

        for (facet, side) in self.disjunctive_facets.iter().zip(sides) {
            exhaustive &= side.exhaustive_facets_count;

            let mut counts = side.facets.get(facet).cloned().unwrap_or_default();
            // Selected values must stay visible even when they match nothing.
            if let Some(selected) = self.refinements.get(facet) {
                for value in selected {
                    counts.entry(value.clone()).or_insert(0);
                }
            }
            disjunctive_facets.insert(facet.clone(), counts);
        }

        let facets = primary
            .facets
            .iter()
            .filter(|(name, _)| !self.is_disjunctive(name))
            .map(|(name, counts)| (name.clone(), counts.clone()))
            .collect();

        Ok(AggregatedResult {
            hits: primary.hits.clone(),
            nb_hits: primary.nb_hits,
            facets,
            disjunctive_facets,
            exhaustive_facets_count: exhaustive,
            cursor: primary.cursor.clone(),
            extra: primary.extra.clone(),
        })
    }
}

fn dedup<I, S>(facets: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = BTreeSet::new();
    facets
        .into_iter()
        .map(Into::into)
        .filter(|f| seen.insert(f.clone()))
        .collect()
}
