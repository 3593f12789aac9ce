//! Transport layer: the shared, connection-pooled HTTP client.
//!
//! The engine only needs "send a request, get a response or an error" from
//! its transport. [`Transport`] captures that seam; `reqwest::Client` is the
//! production implementation and is safe to share across many tickets.

use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use tracing::{debug, warn};

use super::error::GuardError;
use crate::config::GuardConfig;

/// Sends one prepared request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns the client error for network-level failures (DNS, connect,
    /// TLS, timeout). HTTP error statuses are successful sends.
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[async_trait]
impl Transport for Client {
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.execute(request).await
    }
}

/// Builds the pooled client described by `config`.
///
/// # Errors
///
/// Returns [`GuardError::ClientBuild`] if the TLS backend or resolver cannot
/// be initialized.
pub fn build_client(config: &GuardConfig) -> Result<Client, GuardError> {
    let mut builder = Client::builder()
        .gzip(!config.disable_compression)
        .pool_idle_timeout(config.idle_connection_timeout());

    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(max_idle) = config.effective_max_idle_per_host() {
        builder = builder.pool_max_idle_per_host(max_idle);
    }
    if config.max_connections_per_host > 0 {
        warn!(
            max_connections_per_host = config.max_connections_per_host,
            "per-host connection cap is not enforced by the HTTP client; ignoring"
        );
    }
    if config.insecure_skip_tls_verify {
        warn!("TLS certificate verification disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    debug!(
        request_timeout_secs = config.request_timeout_secs,
        idle_connection_timeout_secs = config.idle_connection_timeout_secs,
        disable_compression = config.disable_compression,
        "building HTTP client"
    );
    builder
        .build()
        .map_err(|e| GuardError::client_build(e.to_string()))
}
