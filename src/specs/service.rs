//! Services: a named node pool plus request policy.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::debug;

use super::node::Node;
use super::ticket::Ticket;
use crate::guard::{BoxError, GuardError};

/// Decides whether the response currently held by a ticket counts as success.
///
/// `Ok(true)` accepts the response. `Ok(false)` rejects it without a cause;
/// `Err` rejects it and attaches an application error that is surfaced to
/// the caller if no later attempt succeeds.
///
/// Any `Fn(&Ticket) -> Result<bool, BoxError>` closure implements this trait.
pub trait ResponseValidator: Send + Sync {
    /// Validates `ticket.response()`.
    ///
    /// # Errors
    ///
    /// Returns an application error describing why the response was rejected.
    fn validate(&self, ticket: &Ticket) -> Result<bool, BoxError>;
}

impl<F> ResponseValidator for F
where
    F: Fn(&Ticket) -> Result<bool, BoxError> + Send + Sync,
{
    fn validate(&self, ticket: &Ticket) -> Result<bool, BoxError> {
        self(ticket)
    }
}

/// Accepts a response when its status is in a fixed set.
///
/// The default set is `{200, 201}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusValidator {
    accepted: Vec<u16>,
}

impl Default for StatusValidator {
    fn default() -> Self {
        Self {
            accepted: vec![200, 201],
        }
    }
}

impl StatusValidator {
    /// Creates a validator accepting exactly the given status codes.
    #[must_use]
    pub fn accepting(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            accepted: statuses.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn accepted(&self) -> &[u16] {
        &self.accepted
    }
}

impl ResponseValidator for StatusValidator {
    fn validate(&self, ticket: &Ticket) -> Result<bool, BoxError> {
        Ok(ticket
            .response()
            .is_some_and(|response| self.accepted.contains(&response.status().as_u16())))
    }
}

/// A logical remote API: a pool of interchangeable nodes and the policy used
/// to call them.
///
/// Services are created once and shared through `Arc` by every ticket that
/// targets them. Nodes are append-only and may be added while tickets run.
pub struct Service {
    name: String,
    nodes: RwLock<Vec<Arc<Node>>>,
    retries: u32,
    retry_interval_ms: u64,
    response_validator: Option<Arc<dyn ResponseValidator>>,
    options: HashMap<String, String>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("nodes", &self.nodes())
            .field("retries", &self.retries)
            .field("retry_interval_ms", &self.retry_interval_ms)
            .field("has_validator", &self.response_validator.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl Service {
    /// Creates a service with no nodes, no retries and the default
    /// [`StatusValidator`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: RwLock::new(Vec::new()),
            retries: 0,
            retry_interval_ms: 0,
            response_validator: Some(Arc::new(StatusValidator::default())),
            options: HashMap::new(),
        }
    }

    /// Sets how many retries follow the first attempt.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the pause applied before re-hitting an already failed node.
    #[must_use]
    pub fn with_retry_interval_ms(mut self, retry_interval_ms: u64) -> Self {
        self.retry_interval_ms = retry_interval_ms;
        self
    }

    #[must_use]
    pub fn with_response_validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.response_validator = Some(Arc::new(validator));
        self
    }

    /// Removes the validator. Request creation fails until one is set.
    #[must_use]
    pub fn without_response_validator(mut self) -> Self {
        self.response_validator = None;
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_nodes(self, nodes: impl IntoIterator<Item = Node>) -> Self {
        for node in nodes {
            self.add_node(node);
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    #[must_use]
    pub fn retry_interval_ms(&self) -> u64 {
        self.retry_interval_ms
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    #[must_use]
    pub fn response_validator(&self) -> Option<&Arc<dyn ResponseValidator>> {
        self.response_validator.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &HashMap<String, String> {
        &self.options
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Appends a node and returns the shared handle stored in the service.
    ///
    /// Accepts either an owned [`Node`] or an `Arc<Node>` shared with other
    /// services.
    pub fn add_node(&self, node: impl Into<Arc<Node>>) -> Arc<Node> {
        let node = node.into();
        debug!(service = %self.name, node = %node, "adding node");
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&node));
        node
    }

    /// Snapshot of the current node list.
    #[must_use]
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Creates a fresh ticket for one logical call against this service.
    #[must_use]
    pub fn ticket(self: &Arc<Self>) -> Ticket {
        Ticket::new(Arc::clone(self))
    }

    /// Round-robin selection keyed by the retry counter.
    ///
    /// Disabled nodes are filtered out first; the modulo then runs over the
    /// enabled candidates only.
    ///
    /// # Errors
    ///
    /// [`GuardError::NodeListEmpty`] when the service has no nodes and
    /// [`GuardError::NoEnabledNodes`] when every node is disabled.
    pub fn select_node(&self, retries: u32) -> Result<Arc<Node>, GuardError> {
        let nodes = self.nodes();
        if nodes.is_empty() {
            return Err(GuardError::node_list_empty(&self.name));
        }
        let candidates: Vec<Arc<Node>> = nodes
            .into_iter()
            .filter(|node| !node.is_disabled())
            .collect();
        if candidates.is_empty() {
            return Err(GuardError::no_enabled_nodes(&self.name));
        }
        let index = retries as usize % candidates.len();
        Ok(Arc::clone(&candidates[index]))
    }
}
