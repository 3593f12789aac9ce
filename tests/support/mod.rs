//! Shared helpers for the integration suites.

#![allow(dead_code)]

pub mod socket_guard;

use std::sync::Arc;

use rest_guard::{GuardConfig, Node, RestGuard, Service};
use wiremock::MockServer;

/// Address nothing listens on; connections are refused immediately.
pub const UNREACHABLE: &str = "127.0.0.1:1";

/// The 26-byte alphabet body (note the missing `k`) and its digests.
pub const ALPHABET: &[u8] = b"abcdefghijlmnopqrstuvwxyz\n";
pub const ALPHABET_MD5: &str = "e959f9f3e8671e23055f00c25d4da8b2";
pub const ALPHABET_SHA256: &str =
    "e09a58188506155694cf8fc7c215ad7e59e50c9f434f67bfdd3bf80ed9580a6b";

/// Node pointing at a mock server (plain http).
pub fn node_for(name: &str, server: &MockServer) -> Node {
    Node::new(name, server.address().to_string(), false)
}

pub fn unreachable_node(name: &str) -> Node {
    Node::new(name, UNREACHABLE, false)
}

/// Guard with a short request timeout so stalled tests fail quickly.
pub fn guard() -> RestGuard {
    let config = GuardConfig {
        request_timeout_secs: 10,
        ..GuardConfig::default()
    };
    RestGuard::new(&config).expect("guard builds")
}

/// Registers a service with the given nodes on the guard.
pub fn register(guard: &RestGuard, service: Service, nodes: Vec<Node>) -> Arc<Service> {
    let service = Arc::new(service.with_nodes(nodes));
    guard.add_service(Arc::clone(&service));
    service
}
