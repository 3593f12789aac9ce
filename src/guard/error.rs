//! Error types for the guard.
//!
//! Every terminal failure of request creation, execution or download is a
//! [`GuardError`] carrying the context (service, URL, path) it happened in.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed application error returned by pluggable callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while building, executing or downloading a request.
#[derive(Debug, Error)]
pub enum GuardError {
    /// No service registered under the requested name.
    #[error("service {name} not found")]
    ServiceNotFound {
        /// The requested service name.
        name: String,
    },

    /// The service has no nodes to send the request to.
    #[error("service {service} has no nodes")]
    NodeListEmpty {
        /// The service name.
        service: String,
    },

    /// Every node of the service is disabled.
    #[error("service {service} has no enabled nodes")]
    NoEnabledNodes {
        /// The service name.
        service: String,
    },

    /// The service has no response validator.
    #[error("service {service} has no response validator")]
    MissingValidator {
        /// The service name.
        service: String,
    },

    /// `execute` was called before `create_request`.
    #[error("ticket {ticket} has no request to execute")]
    RequestNotBuilt {
        /// The ticket id.
        ticket: String,
    },

    /// Node address and path do not form a valid URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Network-level failure (DNS, connection refused, TLS, per-request timeout).
    #[error("transport error requesting {url}: {source}")]
    Transport {
        /// The URL of the failed attempt.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The overall execution deadline expired before a terminal outcome.
    #[error("deadline of {seconds}s exceeded")]
    DeadlineExceeded {
        /// The deadline in seconds.
        seconds: u64,
    },

    /// The service validator rejected the response.
    #[error("response from {url} rejected by validator (status {status})")]
    ValidationFailed {
        /// The URL of the rejected attempt.
        url: String,
        /// HTTP status of the rejected response.
        status: u16,
        /// Application error returned by the validator, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A custom retry selector failed to pick the next node.
    #[error("retry node selection failed: {source}")]
    RetrySelection {
        /// The selector error.
        #[source]
        source: BoxError,
    },

    /// The ticket's body producer failed.
    #[error("request body producer failed: {source}")]
    BodyProducer {
        /// The producer error.
        #[source]
        source: BoxError,
    },

    /// No response or an unexpected status on the download path.
    #[error("invalid response received{}", status_suffix(.status))]
    InvalidResponse {
        /// The received status, `None` when no response was held.
        status: Option<u16>,
    },

    /// Artifact file could not be created, written or closed.
    #[error("IO error on {path}: {source}")]
    FileIo {
        /// The artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built from the configuration.
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild {
        /// What went wrong.
        reason: String,
    },

    /// A guard definition file could not be read or parsed.
    #[error("invalid guard definition {path}: {reason}")]
    Config {
        /// The definition file path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

impl GuardError {
    pub fn service_not_found(name: impl Into<String>) -> Self {
        Self::ServiceNotFound { name: name.into() }
    }

    pub fn node_list_empty(service: impl Into<String>) -> Self {
        Self::NodeListEmpty {
            service: service.into(),
        }
    }

    pub fn no_enabled_nodes(service: impl Into<String>) -> Self {
        Self::NoEnabledNodes {
            service: service.into(),
        }
    }

    pub fn missing_validator(service: impl Into<String>) -> Self {
        Self::MissingValidator {
            service: service.into(),
        }
    }

    pub fn request_not_built(ticket: impl Into<String>) -> Self {
        Self::RequestNotBuilt {
            ticket: ticket.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    #[must_use]
    pub fn deadline_exceeded(seconds: u64) -> Self {
        Self::DeadlineExceeded { seconds }
    }

    pub fn validation_failed(url: impl Into<String>, status: u16, source: Option<BoxError>) -> Self {
        Self::ValidationFailed {
            url: url.into(),
            status,
            source,
        }
    }

    #[must_use]
    pub fn retry_selection(source: BoxError) -> Self {
        Self::RetrySelection { source }
    }

    #[must_use]
    pub fn body_producer(source: BoxError) -> Self {
        Self::BodyProducer { source }
    }

    #[must_use]
    pub fn invalid_response(status: Option<u16>) -> Self {
        Self::InvalidResponse { status }
    }

    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    pub fn client_build(reason: impl Into<String>) -> Self {
        Self::ClientBuild {
            reason: reason.into(),
        }
    }

    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for transport failures caused by the per-request client timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    /// Application error attached by the validator, if this is a validation failure.
    #[must_use]
    pub fn validator_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::ValidationFailed {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: every variant needs
// context (url, path) the source error does not carry.
