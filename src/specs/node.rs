//! Endpoint descriptors.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One network endpoint serving a logical service.
///
/// Everything except the `disabled` flag is fixed at construction. Nodes are
/// shared through `Arc`, so the flag is atomic and may be toggled while
/// tickets are executing.
#[derive(Debug)]
pub struct Node {
    name: String,
    base_url: String,
    ssl: bool,
    disabled: AtomicBool,
}

impl Node {
    /// Creates a node. A single trailing `/` on `base_url` is stripped.
    ///
    /// `base_url` is the authority plus optional path prefix, without scheme
    /// (e.g. `mirror.example.org` or `127.0.0.1:8080/api`).
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, ssl: bool) -> Self {
        let mut base_url = base_url.into();
        if base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            name: name.into(),
            base_url,
            ssl,
            disabled: AtomicBool::new(false),
        }
    }

    /// Builder-style variant of [`set_disabled`](Self::set_disabled).
    #[must_use]
    pub fn disabled(self, disabled: bool) -> Self {
        self.set_disabled(disabled);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn ssl(&self) -> bool {
        self.ssl
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
    }

    /// Scheme plus base URL, e.g. `https://mirror.example.org`.
    #[must_use]
    pub fn url_prefix(&self) -> String {
        let scheme = if self.ssl { "https://" } else { "http://" };
        format!("{scheme}{}", self.base_url)
    }

    /// Full URL for `path`, inserting a separating `/` when `path` lacks one.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let prefix = self.url_prefix();
        if path.starts_with('/') {
            format!("{prefix}{path}")
        } else {
            format!("{prefix}/{path}")
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url_prefix())
    }
}

/// Identity comparison for shared nodes.
///
/// Two distinct nodes may carry the same name or address; failure
/// bookkeeping tracks the node objects themselves.
#[must_use]
pub(crate) fn same_node(a: &Arc<Node>, b: &Arc<Node>) -> bool {
    Arc::ptr_eq(a, b)
}
