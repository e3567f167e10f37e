//! Request executor: ordered failover across the hosts of one role

use std::sync::Arc;
use std::time::Instant;

use facetry_core::HostRole;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ClientError, HostFailure, Result, TransportError};
use crate::host_pool::HostPool;
use crate::metrics;
use crate::transport::{AttemptTimeouts, RawResponse, RequestSpec, Transport};

/// Runs a request against the pool's candidates until one answers
///
/// Hosts are tried strictly in pool order, each at most once per call, with
/// no backoff between attempts. Any HTTP answer ends the loop, whatever its
/// status; only transport failures move on to the next host. The worst case
/// therefore takes `candidates * timeouts.total()`.
pub struct RequestExecutor<T> {
    pool: Arc<HostPool>,
    transport: Arc<T>,
    timeouts: AttemptTimeouts,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(pool: Arc<HostPool>, transport: Arc<T>, timeouts: AttemptTimeouts) -> Self {
        Self {
            pool,
            transport,
            timeouts,
        }
    }

    pub fn pool(&self) -> &Arc<HostPool> {
        &self.pool
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn timeouts(&self) -> AttemptTimeouts {
        self.timeouts
    }

    fn timeouts_for(&self, spec: &RequestSpec) -> AttemptTimeouts {
        AttemptTimeouts {
            connect: self.timeouts.connect,
            read: spec.timeout.unwrap_or(self.timeouts.read),
        }
    }

    /// Execute a request, failing over on transport errors
    pub async fn execute(&self, spec: &RequestSpec, role: HostRole) -> Result<RawResponse> {
        let candidates = self.pool.candidates(role);
        if candidates.is_empty() {
            return Err(ClientError::NoHosts(role));
        }

        let timeouts = self.timeouts_for(spec);
        let budget = timeouts.total();
        let mut attempts = Vec::with_capacity(candidates.len());

        for host in candidates {
            let started = Instant::now();
            let outcome = tokio::time::timeout(budget, self.transport.send(host.name(), spec, timeouts))
                .await
                .unwrap_or(Err(TransportError::Timeout(budget)));

            match outcome {
                Ok(response) => {
                    self.pool.record_success(&host);
                    let outcome = if response.is_success() {
                        metrics::OUTCOME_OK
                    } else {
                        metrics::OUTCOME_API_ERROR
                    };
                    metrics::record_attempt(role, outcome, started.elapsed());
                    debug!(
                        host = %host.name(),
                        role = %role,
                        status = response.status,
                        path = %spec.path,
                        "Request answered"
                    );
                    return Ok(response);
                }
                Err(error) => {
                    self.pool.record_failure(&host);
                    metrics::record_attempt(role, metrics::OUTCOME_TRANSPORT_ERROR, started.elapsed());
                    metrics::record_host_failure(role, host.name());
                    warn!(
                        host = %host.name(),
                        role = %role,
                        error = %error,
                        "Host attempt failed, trying next host"
                    );
                    attempts.push(HostFailure {
                        host: host.name().to_string(),
                        error,
                    });
                }
            }
        }

        metrics::record_exhaustion(role);
        Err(ClientError::AllHostsFailed { role, attempts })
    }

    /// Execute a request and decode its success body
    pub async fn execute_json<R: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        role: HostRole,
    ) -> Result<R> {
        self.execute(spec, role).await?.json()
    }
}
