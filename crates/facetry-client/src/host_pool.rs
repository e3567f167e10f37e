//! Host pool: ordered hosts per role and their recent-failure state
//!
//! A host is down iff it failed less than `down_delay` ago. That predicate is
//! recomputed on every check from the stored failure timestamp, so hosts come
//! back on their own and a new delay applies immediately.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use facetry_core::{ClientConfig, HostRole};

/// One configured host and the time of its last transport failure
#[derive(Debug)]
pub struct Host {
    name: String,
    role: HostRole,
    last_failure: ArcSwapOption<Instant>,
}

impl Host {
    pub fn new(name: impl Into<String>, role: HostRole) -> Self {
        Self {
            name: name.into(),
            role,
            last_failure: ArcSwapOption::empty(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> HostRole {
        self.role
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.last_failure.load_full().map(|at| *at)
    }
}

/// Liveness view over the read and write host lists
///
/// Shared by every request of one client. Each host's state is swapped
/// atomically on its own; there is no lock spanning several hosts.
#[derive(Debug)]
pub struct HostPool {
    read: Vec<Arc<Host>>,
    write: Vec<Arc<Host>>,
    down_delay_nanos: AtomicU64,
}

impl HostPool {
    /// Create a pool; duplicate names within a role are collapsed
    pub fn new<R, W, S, T>(read_hosts: R, write_hosts: W, down_delay: Duration) -> Self
    where
        R: IntoIterator<Item = S>,
        W: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            read: build_hosts(read_hosts, HostRole::Read),
            write: build_hosts(write_hosts, HostRole::Write),
            down_delay_nanos: AtomicU64::new(to_nanos(down_delay)),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.read_hosts.iter().cloned(),
            config.write_hosts.iter().cloned(),
            config.host_down_delay,
        )
    }

    /// Configured hosts for a role, in priority order
    pub fn hosts(&self, role: HostRole) -> &[Arc<Host>] {
        match role {
            HostRole::Read => &self.read,
            HostRole::Write => &self.write,
        }
    }

    /// Look a host up by name
    pub fn host(&self, role: HostRole, name: &str) -> Option<&Arc<Host>> {
        self.hosts(role).iter().find(|h| h.name() == name)
    }

    pub fn down_delay(&self) -> Duration {
        Duration::from_nanos(self.down_delay_nanos.load(Ordering::Relaxed))
    }

    /// Change the down delay; applies from the next eligibility check
    pub fn set_down_delay(&self, delay: Duration) {
        self.down_delay_nanos.store(to_nanos(delay), Ordering::Relaxed);
    }

    pub fn is_eligible(&self, host: &Host) -> bool {
        self.is_eligible_at(host, Instant::now())
    }

    /// Eligibility as seen at `now`
    pub fn is_eligible_at(&self, host: &Host, now: Instant) -> bool {
        match host.last_failure() {
            None => true,
            Some(failed_at) => now.saturating_duration_since(failed_at) >= self.down_delay(),
        }
    }

    pub fn record_failure(&self, host: &Host) {
        self.record_failure_at(host, Instant::now());
    }

    pub fn record_failure_at(&self, host: &Host, at: Instant) {
        host.last_failure.store(Some(Arc::new(at)));
    }

    pub fn record_success(&self, host: &Host) {
        host.last_failure.store(None);
    }

    /// Hosts to attempt, in order, for one request
    ///
    /// Down hosts are skipped. If every host of the role is down the full list
    /// is returned instead, so a request still gets one pass over all of them.
    pub fn candidates(&self, role: HostRole) -> Vec<Arc<Host>> {
        let now = Instant::now();
        let hosts = self.hosts(role);
        let eligible: Vec<Arc<Host>> = hosts
            .iter()
            .filter(|h| self.is_eligible_at(h, now))
            .cloned()
            .collect();

        if eligible.is_empty() && !hosts.is_empty() {
            tracing::debug!(role = %role, hosts = hosts.len(), "All hosts down, retrying every host");
            return hosts.to_vec();
        }
        eligible
    }

    /// First host to try for a role
    pub fn next_candidate(&self, role: HostRole) -> Option<Arc<Host>> {
        self.candidates(role).into_iter().next()
    }

    /// Number of hosts of a role currently considered down
    pub fn down_count(&self, role: HostRole) -> usize {
        let now = Instant::now();
        self.hosts(role)
            .iter()
            .filter(|h| !self.is_eligible_at(h, now))
            .count()
    }
}

fn build_hosts<I, S>(names: I, role: HostRole) -> Vec<Arc<Host>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(Into::into)
        .filter(|name| seen.insert(name.clone()))
        .map(|name| Arc::new(Host::new(name, role)))
        .collect()
}

fn to_nanos(delay: Duration) -> u64 {
    u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX)
}
