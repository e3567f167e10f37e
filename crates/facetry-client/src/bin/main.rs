//! facetry binary: run a (disjunctive) faceted search from the command line
//!
//! Example:
//! ```bash
//! facetry --host search-1.example --host search-2.example products phone \
//!     --disjunctive brand --refine brand=Apple --refine brand=Samsung --refine category=device
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use facetry_client::SearchClient;
use facetry_core::{ClientConfig, Query, Refinements};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "facetry")]
#[command(about = "Faceted search against a multi-host search service")]
struct Args {
    /// Index to search
    index: String,

    /// Full-text query
    query: Option<String>,

    /// Search host, in priority order (repeatable)
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// JSON configuration file; --host entries are appended to its hosts
    #[arg(long)]
    config: Option<PathBuf>,

    /// URL scheme
    #[arg(long)]
    scheme: Option<String>,

    /// Facet with OR semantics (repeatable)
    #[arg(long = "disjunctive")]
    disjunctive: Vec<String>,

    /// Selected facet value as facet=value (repeatable)
    #[arg(long = "refine", value_parser = parse_refinement)]
    refinements: Vec<(String, String)>,

    /// Extra facets to count
    #[arg(long = "facet")]
    facets: Vec<String>,

    /// Hits per page
    #[arg(long)]
    hits_per_page: Option<u32>,

    /// Page to fetch, starting at 0
    #[arg(long)]
    page: Option<u32>,

    /// Per-attempt connect timeout in milliseconds
    #[arg(long)]
    connect_timeout_ms: Option<u64>,

    /// Per-attempt read timeout in milliseconds
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Abort the search after this many milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Send the sub-queries as one multi-query request
    #[arg(long)]
    batched: bool,

    /// Enable the search cache
    #[arg(long)]
    cache: bool,
}

fn parse_refinement(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((facet, value)) if !facet.is_empty() => Ok((facet.to_string(), value.to_string())),
        _ => Err(format!("expected facet=value, got {raw:?}")),
    }
}

fn build_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ClientConfig::default(),
    };

    config.read_hosts.extend(args.hosts.iter().cloned());
    config.write_hosts.extend(args.hosts.iter().cloned());
    if config.read_hosts.is_empty() {
        anyhow::bail!("no search host given: pass --host or --config");
    }

    if let Some(scheme) = &args.scheme {
        config.scheme = scheme.clone();
    }
    if let Some(ms) = args.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.read_timeout_ms {
        config.read_timeout = Duration::from_millis(ms);
    }
    if args.cache {
        config.cache.enabled = true;
    }
    if args.batched {
        config.disjunctive_strategy = facetry_core::DisjunctiveStrategy::Batched;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("facetry=info".parse()?))
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let client = SearchClient::new(config)?;
    let index = client.index(args.index.as_str());

    let mut query = Query::new(args.query.clone().unwrap_or_default());
    if !args.facets.is_empty() {
        query = query.with_facets(args.facets.iter().cloned());
    }
    if let Some(hits) = args.hits_per_page {
        query = query.with_hits_per_page(hits);
    }
    if let Some(page) = args.page {
        query = query.with_page(page);
    }

    let mut refinements = Refinements::new();
    for (facet, value) in &args.refinements {
        refinements
            .entry(facet.clone())
            .or_default()
            .insert(value.clone());
    }

    tracing::info!(
        index = %args.index,
        disjunctive = args.disjunctive.len(),
        refinements = args.refinements.len(),
        "Searching"
    );

    let disjunctive = args.disjunctive.iter().cloned();
    let result = match args.deadline_ms {
        Some(ms) => {
            index
                .search_disjunctive_faceting_with_deadline(
                    &query,
                    disjunctive,
                    &refinements,
                    Duration::from_millis(ms),
                )
                .await?
        }
        None => {
            index
                .search_disjunctive_faceting(&query, disjunctive, &refinements)
                .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
