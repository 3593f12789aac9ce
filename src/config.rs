//! Guard configuration.
//!
//! [`GuardConfig`] holds the pass-through settings used to build the shared
//! HTTP client. [`GuardDefinition`] extends it with services and nodes so a
//! whole guard can be described in one JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::guard::GuardError;
use crate::specs::{Node, Service};
use crate::user_agent;

/// Default whole-request timeout (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default idle pooled connection lifetime (seconds).
pub const DEFAULT_IDLE_CONN_TIMEOUT_SECS: u64 = 90;

/// Default cap of idle pooled connections.
pub const DEFAULT_MAX_IDLE_CONNS: usize = 100;

/// Settings for the shared, connection-pooled HTTP client.
///
/// Serialized field names follow the established JSON layout
/// (`reqs_timeout`, `max_conns4host`, ...). A value of `0` for any duration
/// disables that timeout; `0` for a pool size leaves the client default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// User-Agent sent with every request; empty disables the header.
    pub user_agent: String,

    /// Whole-request timeout in seconds.
    #[serde(rename = "reqs_timeout")]
    pub request_timeout_secs: u64,

    /// Global idle connection cap.
    #[serde(rename = "max_idle_conns")]
    pub max_idle_connections: usize,

    /// Idle pooled connection lifetime in seconds.
    #[serde(rename = "idle_conn_timeout")]
    pub idle_connection_timeout_secs: u64,

    /// Maximum connections per host. Not enforced by the underlying client.
    #[serde(rename = "max_conns4host")]
    pub max_connections_per_host: usize,

    /// Idle connection cap per host.
    #[serde(rename = "max_idleconns4host")]
    pub max_idle_connections_per_host: usize,

    /// Disables transparent gzip decompression.
    pub disable_compression: bool,

    /// Accepts invalid TLS certificates.
    #[serde(rename = "insecure_skip_verify")]
    pub insecure_skip_tls_verify: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            user_agent: user_agent::default_user_agent(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_idle_connections: DEFAULT_MAX_IDLE_CONNS,
            idle_connection_timeout_secs: DEFAULT_IDLE_CONN_TIMEOUT_SECS,
            max_connections_per_host: 0,
            max_idle_connections_per_host: 0,
            disable_compression: false,
            insecure_skip_tls_verify: false,
        }
    }
}

impl GuardConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn idle_connection_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.idle_connection_timeout_secs)
    }

    /// Idle connections kept per host: the per-host cap, or the global cap
    /// when the per-host one is unset.
    #[must_use]
    pub fn effective_max_idle_per_host(&self) -> Option<usize> {
        [
            self.max_idle_connections_per_host,
            self.max_idle_connections,
        ]
        .into_iter()
        .find(|value| *value > 0)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// A node entry in a guard definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub disable: bool,
}

impl NodeDefinition {
    #[must_use]
    pub fn to_node(&self) -> Node {
        Node::new(&self.name, &self.base_url, self.ssl).disabled(self.disable)
    }
}

/// A service entry in a guard definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub retry_interval_ms: u64,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl ServiceDefinition {
    /// Builds the service with the default response validator.
    #[must_use]
    pub fn to_service(&self) -> Arc<Service> {
        let service = self.options.iter().fold(
            Service::new(&self.name)
                .with_retries(self.retries)
                .with_retry_interval_ms(self.retry_interval_ms),
            |service, (key, value)| service.with_option(key, value),
        );
        Arc::new(service.with_nodes(self.nodes.iter().map(NodeDefinition::to_node)))
    }
}

/// Client settings plus the services a guard serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardDefinition {
    pub config: GuardConfig,
    pub services: Vec<ServiceDefinition>,
}

impl GuardDefinition {
    /// Parses a definition from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`] if the text is not a valid definition.
    pub fn from_json(text: &str) -> Result<Self, GuardError> {
        serde_json::from_str(text).map_err(|e| GuardError::config("<inline>", e.to_string()))
    }

    /// Loads a definition from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GuardError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| GuardError::config(path, e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| GuardError::config(path, e.to_string()))
    }
}
