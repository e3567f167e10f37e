//! Scripted transport for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::error::TransportError;
use crate::transport::{AttemptTimeouts, RawResponse, RequestSpec, Transport};

type Handler = dyn Fn(&str, &RequestSpec) -> RawResponse + Send + Sync;

/// Answers requests from a closure, with per-host failures and delays
pub struct ScriptedTransport {
    handler: Arc<Handler>,
    failures: HashMap<String, TransportError>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<(String, RequestSpec)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &RequestSpec) -> RawResponse + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            failures: HashMap::new(),
            delays: HashMap::new(),
            default_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Every request gets a 200 with this body
    pub fn ok(body: Value) -> Self {
        Self::respond(200, body)
    }

    pub fn respond(status: u16, body: Value) -> Self {
        let bytes = body.to_string().into_bytes();
        Self::new(move |_, _| RawResponse::new(status, bytes.clone()))
    }

    pub fn fail_host(mut self, host: &str, error: TransportError) -> Self {
        self.failures.insert(host.to_string(), error);
        self
    }

    pub fn delay_host(mut self, host: &str, delay: Duration) -> Self {
        self.delays.insert(host.to_string(), delay);
        self
    }

    pub fn delay_all(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(String, RequestSpec)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn hosts_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|(host, _)| host).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Highest number of requests observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Requests that ran to completion (not cancelled)
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Transport for ScriptedTransport {
    async fn send(
        &self,
        host: &str,
        request: &RequestSpec,
        _timeouts: AttemptTimeouts,
    ) -> Result<RawResponse, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((host.to_string(), request.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = self.delays.get(host).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failures.get(host) {
            return Err(error.clone());
        }
        Ok((self.handler)(host, request))
    }
}
