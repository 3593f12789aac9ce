//! Request execution engine.
//!
//! [`RestGuard`] owns the shared transport and a registry of services. For
//! each logical call it builds a request against a [`Ticket`], sends it,
//! validates the response and, on failure, rotates to another node until the
//! service's retry budget is spent.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rest_guard::{GuardConfig, Node, RestGuard, Service};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let guard = RestGuard::new(&GuardConfig::default())?;
//! guard.add_service(Arc::new(Service::new("mirrors").with_retries(2)));
//! guard.add_node("mirrors", Node::new("m1", "mirror1.example.org", true))?;
//! guard.add_node("mirrors", Node::new("m2", "mirror2.example.org", true))?;
//!
//! let mut ticket = guard.service("mirrors")?.ticket();
//! guard.create_request(&mut ticket, reqwest::Method::GET, "/pkg.tar.gz")?;
//! let artifact = guard.download(&mut ticket, "/tmp/pkg.tar.gz").await?;
//! println!("{} bytes, md5 {}", artifact.size(), artifact.digest());
//! # Ok(())
//! # }
//! ```
//!
//! [`Ticket`]: crate::specs::Ticket

mod client;
mod download;
mod engine;
mod error;
mod retry;
mod writer;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use reqwest::header::HeaderValue;
use tracing::{debug, instrument};

pub use client::{Transport, build_client};
pub use error::{BoxError, GuardError};
pub use retry::{RetrySelector, SkipFailedSelector};
pub use writer::{ArtifactWriter, DigestAlgorithm};

use crate::config::{GuardConfig, GuardDefinition};
use crate::specs::{Node, Service};

/// Resilient request executor shared by any number of concurrent tickets.
///
/// Share it through `Arc` across tasks; every method takes `&self`.
pub struct RestGuard {
    transport: Arc<dyn Transport>,
    user_agent: Option<HeaderValue>,
    services: DashMap<String, Arc<Service>>,
    retry_selector: Option<Arc<dyn RetrySelector>>,
}

impl fmt::Debug for RestGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestGuard")
            .field("user_agent", &self.user_agent)
            .field("services", &self.services.len())
            .field("has_retry_selector", &self.retry_selector.is_some())
            .finish_non_exhaustive()
    }
}

impl RestGuard {
    /// Creates a guard with a pooled client built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::ClientBuild`] if the client cannot be built or
    /// the configured User-Agent is not a valid header value.
    #[instrument(level = "debug", skip(config))]
    pub fn new(config: &GuardConfig) -> Result<Self, GuardError> {
        let client = build_client(config)?;
        Self::with_transport(config, Arc::new(client))
    }

    /// Creates a guard sending through a caller-supplied transport.
    ///
    /// Only the User-Agent is taken from `config`; client settings are the
    /// transport's concern.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::ClientBuild`] if the configured User-Agent is not
    /// a valid header value.
    pub fn with_transport(
        config: &GuardConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, GuardError> {
        let user_agent = if config.user_agent.is_empty() {
            None
        } else {
            Some(HeaderValue::from_str(&config.user_agent).map_err(|_| {
                GuardError::client_build(format!("invalid user agent: {}", config.user_agent))
            })?)
        };
        Ok(Self {
            transport,
            user_agent,
            services: DashMap::new(),
            retry_selector: None,
        })
    }

    /// Builds a guard and registers every service of a definition file.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_definition(definition: &GuardDefinition) -> Result<Self, GuardError> {
        let guard = Self::new(&definition.config)?;
        for service in &definition.services {
            guard.add_service(service.to_service());
        }
        Ok(guard)
    }

    /// Installs a custom node selector used on every retry.
    #[must_use]
    pub fn with_retry_selector(mut self, selector: impl RetrySelector + 'static) -> Self {
        self.retry_selector = Some(Arc::new(selector));
        self
    }

    /// User-Agent attached to every request; empty when disabled.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_ref()
            .and_then(|ua| ua.to_str().ok())
            .unwrap_or_default()
    }

    /// Registers (or replaces) a service under its name.
    pub fn add_service(&self, service: Arc<Service>) {
        debug!(service = %service.name(), nodes = service.nodes().len(), "registering service");
        self.services.insert(service.name().to_string(), service);
    }

    /// Looks up a registered service.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::ServiceNotFound`] for unknown names.
    pub fn service(&self, name: &str) -> Result<Arc<Service>, GuardError> {
        self.services
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GuardError::service_not_found(name))
    }

    /// Appends a node to a registered service.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::ServiceNotFound`] for unknown names.
    pub fn add_node(
        &self,
        service: &str,
        node: impl Into<Arc<Node>>,
    ) -> Result<Arc<Node>, GuardError> {
        Ok(self.service(service)?.add_node(node))
    }

    /// Names of all registered services, sorted.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent() {
        let guard = RestGuard::new(&GuardConfig::default()).unwrap();
        assert_eq!(
            guard.user_agent(),
            format!("RestGuard v{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_empty_user_agent_disables_header() {
        let config = GuardConfig {
            user_agent: String::new(),
            ..GuardConfig::default()
        };
        let guard = RestGuard::new(&config).unwrap();
        assert_eq!(guard.user_agent(), "");
    }

    #[test]
    fn test_invalid_user_agent_rejected() {
        let config = GuardConfig {
            user_agent: "bad\nagent".to_string(),
            ..GuardConfig::default()
        };
        assert!(matches!(
            RestGuard::new(&config),
            Err(GuardError::ClientBuild { .. })
        ));
    }

    #[test]
    fn test_service_registry() {
        let guard = RestGuard::new(&GuardConfig::default()).unwrap();
        guard.add_service(Arc::new(Service::new("b")));
        guard.add_service(Arc::new(Service::new("a")));

        assert_eq!(guard.service_names(), ["a", "b"]);
        assert_eq!(guard.service("a").unwrap().name(), "a");
        assert!(matches!(
            guard.service("missing"),
            Err(GuardError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_add_node_by_service_name() {
        let guard = RestGuard::new(&GuardConfig::default()).unwrap();
        guard.add_service(Arc::new(Service::new("svc")));

        guard.add_node("svc", Node::new("n1", "h1", false)).unwrap();
        guard.add_node("svc", Node::new("n2", "h2", true)).unwrap();
        assert_eq!(guard.service("svc").unwrap().nodes().len(), 2);

        assert!(matches!(
            guard.add_node("other", Node::new("n3", "h3", false)),
            Err(GuardError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_from_definition_registers_services() {
        let definition = GuardDefinition::from_json(
            r#"{"services": [{"name": "s1", "nodes": [{"name": "n", "base_url": "h"}]}]}"#,
        )
        .unwrap();
        let guard = RestGuard::from_definition(&definition).unwrap();
        assert_eq!(guard.service("s1").unwrap().nodes().len(), 1);
    }
}
