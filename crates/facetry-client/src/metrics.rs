//! Client-side metrics
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! embedding application installs a recorder. Labels carry host names and
//! outcomes only, never query content.

use facetry_core::HostRole;
use metrics::{counter, histogram};
use std::time::Duration;

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_TRANSPORT_ERROR: &str = "transport_error";
pub const OUTCOME_API_ERROR: &str = "api_error";
pub const OUTCOME_TIMEOUT: &str = "timeout";

pub fn record_attempt(role: HostRole, outcome: &str, duration: Duration) {
    counter!("facetry_attempts_total", "role" => role.to_string(), "outcome" => outcome.to_string())
        .increment(1);
    histogram!("facetry_attempt_duration_seconds", "role" => role.to_string(), "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_host_failure(role: HostRole, host: &str) {
    counter!("facetry_host_failures_total", "role" => role.to_string(), "host" => host.to_string())
        .increment(1);
}

pub fn record_exhaustion(role: HostRole) {
    counter!("facetry_hosts_exhausted_total", "role" => role.to_string()).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("facetry_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_disjunctive_search(queries: usize, outcome: &str, duration: Duration) {
    counter!("facetry_disjunctive_searches_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("facetry_disjunctive_fanout_width").record(queries as f64);
    histogram!("facetry_disjunctive_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}
