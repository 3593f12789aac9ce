//! Pluggable node selection for retries.
//!
//! Without a selector the guard clears the ticket's node on retry and the
//! round-robin choice (`retries mod enabled nodes`) runs again. A
//! [`RetrySelector`] replaces that choice, e.g. to avoid nodes that already
//! failed for the ticket.

use std::sync::Arc;

use tracing::debug;

use super::RestGuard;
use super::error::BoxError;
use crate::specs::{Node, Ticket};

/// Chooses the node for the next attempt of a ticket.
///
/// Called after the retry counter was incremented and the failing node was
/// recorded in [`Ticket::failed_nodes`]. Any
/// `Fn(&RestGuard, &Ticket) -> Result<Arc<Node>, BoxError>` closure
/// implements this trait.
pub trait RetrySelector: Send + Sync {
    /// # Errors
    ///
    /// Returning an error aborts execution with
    /// [`GuardError::RetrySelection`](super::GuardError::RetrySelection).
    fn select_node(&self, guard: &RestGuard, ticket: &Ticket) -> Result<Arc<Node>, BoxError>;
}

impl<F> RetrySelector for F
where
    F: Fn(&RestGuard, &Ticket) -> Result<Arc<Node>, BoxError> + Send + Sync,
{
    fn select_node(&self, guard: &RestGuard, ticket: &Ticket) -> Result<Arc<Node>, BoxError> {
        self(guard, ticket)
    }
}

/// Prefers enabled nodes that have not failed for this ticket yet.
///
/// The scan starts at the round-robin position for the current retry count
/// and wraps around the enabled nodes. Once every enabled node has failed it
/// falls back to plain round-robin.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipFailedSelector;

impl RetrySelector for SkipFailedSelector {
    fn select_node(&self, _guard: &RestGuard, ticket: &Ticket) -> Result<Arc<Node>, BoxError> {
        let service = ticket.service();
        let fallback = service.select_node(ticket.retries())?;

        let enabled: Vec<Arc<Node>> = service
            .nodes()
            .into_iter()
            .filter(|node| !node.is_disabled())
            .collect();
        let start = ticket.retries() as usize % enabled.len().max(1);
        let fresh = enabled
            .iter()
            .cycle()
            .skip(start)
            .take(enabled.len())
            .find(|node| !ticket.has_failed(node));

        match fresh {
            Some(node) => Ok(Arc::clone(node)),
            None => {
                debug!(ticket = %ticket.id(), "all nodes failed, falling back to round-robin");
                Ok(fallback)
            }
        }
    }
}
