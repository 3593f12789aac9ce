//! Rest Guard Library
//!
//! This library sends HTTP requests to one of several interchangeable nodes
//! serving the same logical service, retrying on transport failures or on
//! responses rejected by an application validator, and rotating to another
//! node on every retry.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`specs`] - Nodes, services, tickets and artifact descriptors
//! - [`guard`] - Execution engine, transport, retry selection and downloads
//! - [`config`] - Client settings and guard definition files
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
//! let service = Arc::new(Service::new("mirrors").with_retries(1));
//! service.add_node(Node::new("primary", "mirror1.example.org", true));
//! service.add_node(Node::new("backup", "mirror2.example.org/", true));
//!
//! let mut ticket = service.ticket();
//! guard.create_request(&mut ticket, reqwest::Method::GET, "/index.json")?;
//! guard.execute(&mut ticket).await?;
//! println!("served by {:?}", ticket.node().map(|n| n.name().to_string()));
//! ticket.release();
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod guard;
pub mod specs;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use config::{GuardConfig, GuardDefinition, NodeDefinition, ServiceDefinition};
pub use guard::{
    ArtifactWriter, BoxError, DigestAlgorithm, GuardError, RestGuard, RetrySelector,
    SkipFailedSelector, Transport,
};
pub use specs::{
    Artifact, BodyProducer, Node, ResponseCloseHook, ResponseValidator, Service, StatusValidator,
    Ticket,
};
