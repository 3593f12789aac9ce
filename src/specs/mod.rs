//! Data model shared by the guard: nodes, services, tickets and artifacts.
//!
//! A [`Service`] owns an append-only pool of [`Node`]s and the policy used to
//! call them. Each logical call gets its own [`Ticket`], which the guard
//! mutates while it executes attempts against the service's nodes.

mod artifact;
mod node;
mod service;
mod ticket;

pub use artifact::Artifact;
pub use node::Node;
pub(crate) use node::same_node;
pub use service::{ResponseValidator, Service, StatusValidator};
pub use ticket::{BodyProducer, ResponseCloseHook, Ticket};
