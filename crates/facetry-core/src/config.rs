//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_MAX_SIZE, DEFAULT_CACHE_TTL_SECS, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_HOST_DOWN_DELAY_MS, DEFAULT_READ_TIMEOUT_MS,
};
use crate::Error;

/// How the N+1 queries of a disjunctive search are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisjunctiveStrategy {
    /// One spawned request per query, joined before merging
    #[default]
    Parallel,
    /// All queries in a single multi-query request, demultiplexed by position
    Batched,
}

/// Search cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Entry lifetime
    #[serde(with = "duration_ms", default = "default_cache_ttl")]
    pub ttl: Duration,
    /// Maximum number of entries kept
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: default_cache_ttl(),
            max_size: default_cache_max_size(),
        }
    }
}

/// Configuration consumed by the client core
///
/// Durations are (de)serialized as integer milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ordered hosts for search traffic
    #[serde(default)]
    pub read_hosts: Vec<String>,
    /// Ordered hosts for indexing traffic
    #[serde(default)]
    pub write_hosts: Vec<String>,
    /// URL scheme used to reach the hosts
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Per-attempt connect timeout
    #[serde(with = "duration_ms", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// Per-attempt read timeout
    #[serde(with = "duration_ms", default = "default_read_timeout")]
    pub read_timeout: Duration,
    /// Time a host stays ineligible after a transport failure
    #[serde(with = "duration_ms", default = "default_host_down_delay")]
    pub host_down_delay: Duration,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub disjunctive_strategy: DisjunctiveStrategy,
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(DEFAULT_READ_TIMEOUT_MS)
}

fn default_host_down_delay() -> Duration {
    Duration::from_millis(DEFAULT_HOST_DOWN_DELAY_MS)
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(DEFAULT_CACHE_TTL_SECS)
}

fn default_cache_max_size() -> usize {
    DEFAULT_CACHE_MAX_SIZE
}

impl ClientConfig {
    /// Create a configuration with the given read hosts, also used for writes
    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<String> = hosts.into_iter().map(Into::into).collect();
        Self {
            read_hosts: hosts.clone(),
            write_hosts: hosts,
            ..Self::default()
        }
    }

    /// Replace the write hosts
    pub fn with_write_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_host_down_delay(mut self, delay: Duration) -> Self {
        self.host_down_delay = delay;
        self
    }

    /// Enable the search cache with the given lifetime and capacity
    pub fn with_cache(mut self, ttl: Duration, max_size: usize) -> Self {
        self.cache = CacheConfig {
            enabled: true,
            ttl,
            max_size,
        };
        self
    }

    pub fn with_disjunctive_strategy(mut self, strategy: DisjunctiveStrategy) -> Self {
        self.disjunctive_strategy = strategy;
        self
    }

    /// Worst-case duration of a single host attempt
    pub fn attempt_timeout(&self) -> Duration {
        self.connect_timeout + self.read_timeout
    }

    /// Check the settings that would make the client misbehave
    pub fn validate(&self) -> crate::Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::InvalidConfig("connect_timeout must be positive".into()));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::InvalidConfig("read_timeout must be positive".into()));
        }
        if self.cache.enabled && self.cache.max_size == 0 {
            return Err(Error::InvalidConfig(
                "cache.max_size must be positive when the cache is enabled".into(),
            ));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(Error::InvalidConfig(format!(
                "unsupported scheme: {}",
                self.scheme
            )));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_hosts: Vec::new(),
            write_hosts: Vec::new(),
            scheme: default_scheme(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            host_down_delay: default_host_down_delay(),
            cache: CacheConfig::default(),
            disjunctive_strategy: DisjunctiveStrategy::default(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
