//! Tickets: the mutable execution context of one logical call.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reqwest::{Body, Request, Response};
use tracing::trace;
use uuid::Uuid;

use super::node::{Node, same_node};
use super::service::Service;
use crate::guard::BoxError;

/// Produces a fresh request body every time a request is (re)built.
///
/// Streamed bodies are consumed by the first send; a producer lets retries
/// resend a body safely. Returning `Ok(None)` leaves the body untouched.
pub trait BodyProducer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the body cannot be produced; request creation
    /// fails with it.
    fn produce(&self, ticket: &Ticket) -> Result<Option<Body>, BoxError>;
}

impl<F> BodyProducer for F
where
    F: Fn(&Ticket) -> Result<Option<Body>, BoxError> + Send + Sync,
{
    fn produce(&self, ticket: &Ticket) -> Result<Option<Body>, BoxError> {
        self(ticket)
    }
}

/// Called after the ticket closes a response it was holding.
pub trait ResponseCloseHook: Send + Sync {
    fn on_close(&self, ticket: &Ticket);
}

impl<F> ResponseCloseHook for F
where
    F: Fn(&Ticket) + Send + Sync,
{
    fn on_close(&self, ticket: &Ticket) {
        self(ticket);
    }
}

/// Execution context for one logical request, possibly spanning several
/// physical attempts against different nodes.
///
/// A ticket owns the last response it received. Call [`release`](Self::release)
/// when done with it; dropping the ticket releases it too.
pub struct Ticket {
    id: String,
    path: String,
    pub(crate) retries: u32,
    service: Arc<Service>,
    node: Option<Arc<Node>>,
    failed_nodes: Vec<Arc<Node>>,
    pub(crate) request: Option<Request>,
    response: Option<Response>,
    body_producer: Option<Arc<dyn BodyProducer>>,
    on_response_close: Option<Arc<dyn ResponseCloseHook>>,
    closures: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("retries", &self.retries)
            .field("service", &self.service.name())
            .field("node", &self.node.as_ref().map(|n| n.name()))
            .field(
                "failed_nodes",
                &self.failed_nodes.iter().map(|n| n.name()).collect::<Vec<_>>(),
            )
            .field("request", &self.request.as_ref().map(Request::url))
            .field("response", &self.response.as_ref().map(Response::status))
            .finish_non_exhaustive()
    }
}

impl Ticket {
    pub(crate) fn new(service: Arc<Service>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            path: String::new(),
            retries: 0,
            service,
            node: None,
            failed_nodes: Vec::new(),
            request: None,
            response: None,
            body_producer: None,
            on_response_close: None,
            closures: HashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path of the last built request.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: &str) {
        path.clone_into(&mut self.path);
    }

    /// Retries performed so far; equals attempts made minus one once
    /// execution finishes.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Node the current request targets.
    #[must_use]
    pub fn node(&self) -> Option<&Arc<Node>> {
        self.node.as_ref()
    }

    /// Pins the ticket to `node`; the next request build targets it instead
    /// of running round-robin selection.
    pub fn set_node(&mut self, node: Arc<Node>) {
        self.node = Some(node);
    }

    pub(crate) fn clear_node(&mut self) {
        self.node = None;
    }

    /// Nodes that already failed for this ticket, in failure order.
    #[must_use]
    pub fn failed_nodes(&self) -> &[Arc<Node>] {
        &self.failed_nodes
    }

    #[must_use]
    pub fn has_failed(&self, node: &Arc<Node>) -> bool {
        self.failed_nodes.iter().any(|n| same_node(n, node))
    }

    /// Records `node` as failed. Recording the same node again is a no-op.
    pub fn add_fail(&mut self, node: &Arc<Node>) {
        if !self.has_failed(node) {
            self.failed_nodes.push(Arc::clone(node));
        }
    }

    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn request_mut(&mut self) -> Option<&mut Request> {
        self.request.as_mut()
    }

    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Mutable access, e.g. to read the body with [`Response::chunk`].
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Moves the response out of the ticket. The close hook does not fire;
    /// the caller owns the body from here on.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Stores a new response, closing the previous one first.
    pub(crate) fn set_response(&mut self, response: Response) {
        self.close_response();
        self.response = Some(response);
    }

    #[must_use]
    pub fn body_producer(&self) -> Option<&Arc<dyn BodyProducer>> {
        self.body_producer.as_ref()
    }

    pub fn set_body_producer(&mut self, producer: impl BodyProducer + 'static) {
        self.body_producer = Some(Arc::new(producer));
    }

    pub fn set_response_close_hook(&mut self, hook: impl ResponseCloseHook + 'static) {
        self.on_response_close = Some(Arc::new(hook));
    }

    /// Stores a value callbacks can read back with [`closure`](Self::closure).
    pub fn set_closure<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.closures.insert(key.into(), Arc::new(value));
    }

    /// Reads a value stored with [`set_closure`](Self::set_closure).
    ///
    /// Returns `None` if the key is unknown or holds a different type.
    #[must_use]
    pub fn closure<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.closures.get(key)?.downcast_ref::<T>()
    }

    /// Closes the held response, if any. Safe to call any number of times.
    pub fn release(&mut self) {
        self.close_response();
    }

    /// Drops the held response and fires the close hook once for it.
    pub(crate) fn close_response(&mut self) {
        if let Some(response) = self.response.take() {
            trace!(ticket = %self.id, status = %response.status(), "closing response");
            drop(response);
            if let Some(hook) = self.on_response_close.clone() {
                hook.on_close(self);
            }
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.release();
    }
}
