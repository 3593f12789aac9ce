//! Per-ticket execution state machine.
//!
//! ```text
//! Built -> Sent -> { Accepted | Rejected | TransportError }
//!   Accepted                      -> done
//!   Rejected / TransportError     -> budget left ? retry -> Built : fail
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::{Method, Request};
use tracing::{debug, instrument, warn};
use url::Url;

use super::RestGuard;
use super::error::GuardError;
use crate::specs::{Node, Ticket};

impl RestGuard {
    /// Builds the ticket's request for `path` and stores it on the ticket.
    ///
    /// When the ticket has no node yet, one is picked round-robin from the
    /// service's enabled nodes using the retry counter. The returned request
    /// can be customized (headers, body) before [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// Fails before any network activity with
    /// - [`GuardError::MissingValidator`] if the service has no validator
    /// - [`GuardError::NodeListEmpty`] / [`GuardError::NoEnabledNodes`] if no
    ///   node can be selected
    /// - [`GuardError::InvalidUrl`] if node address and path are not a URL
    /// - [`GuardError::BodyProducer`] if the ticket's body producer fails
    pub fn create_request<'t>(
        &self,
        ticket: &'t mut Ticket,
        method: Method,
        path: &str,
    ) -> Result<&'t mut Request, GuardError> {
        let service = Arc::clone(ticket.service());
        if service.response_validator().is_none() {
            return Err(GuardError::missing_validator(service.name()));
        }
        if service.nodes().is_empty() {
            return Err(GuardError::node_list_empty(service.name()));
        }

        if ticket.request.is_some() {
            ticket.close_response();
        }
        ticket.set_path(path);

        let node = match ticket.node() {
            Some(node) => Arc::clone(node),
            None => {
                let node = service.select_node(ticket.retries())?;
                debug!(ticket = %ticket.id(), node = %node, retries = ticket.retries(), "node selected");
                ticket.set_node(Arc::clone(&node));
                node
            }
        };

        let url_str = node.url_for(path);
        let url = Url::parse(&url_str).map_err(|_| GuardError::invalid_url(&url_str))?;
        let mut request = Request::new(method, url);
        if let Some(ua) = &self.user_agent {
            request.headers_mut().insert(USER_AGENT, ua.clone());
        }

        if let Some(producer) = ticket.body_producer().cloned() {
            if let Some(body) = producer.produce(ticket).map_err(GuardError::body_producer)? {
                *request.body_mut() = Some(body);
            }
        }

        Ok(ticket.request.insert(request))
    }

    /// Executes the ticket's request, retrying and rotating nodes up to the
    /// service's retry budget.
    ///
    /// On success the accepted response is held by the ticket. On failure the
    /// last-seen cause is returned; if the final attempt reached validation,
    /// the rejected response stays on the ticket too. Either way the retry
    /// counter equals the number of attempts made minus one.
    ///
    /// # Errors
    ///
    /// - [`GuardError::MissingValidator`] / [`GuardError::RequestNotBuilt`]
    ///   before sending
    /// - [`GuardError::Transport`] or [`GuardError::ValidationFailed`] once
    ///   the budget is spent
    /// - [`GuardError::RetrySelection`] and request-creation errors raised
    ///   while preparing a retry
    #[instrument(skip(self, ticket), fields(ticket = %ticket.id(), service = %ticket.service().name()))]
    pub async fn execute(&self, ticket: &mut Ticket) -> Result<(), GuardError> {
        let service = Arc::clone(ticket.service());
        let validator = Arc::clone(
            service
                .response_validator()
                .ok_or_else(|| GuardError::missing_validator(service.name()))?,
        );

        loop {
            let request = take_attempt_request(ticket)?;
            let url = request.url().to_string();
            debug!(
                attempt = ticket.retries() + 1,
                node = ticket.node().map_or("-", |n| n.name()),
                %url,
                "sending request"
            );

            let failure = match self.transport.send(request).await {
                Err(source) => {
                    warn!(%url, error = %source, "transport error");
                    GuardError::transport(url, source)
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    ticket.set_response(response);
                    match validator.validate(ticket) {
                        Ok(true) => {
                            debug!(%url, status, retries = ticket.retries(), "response accepted");
                            return Ok(());
                        }
                        Ok(false) => {
                            debug!(%url, status, "response rejected");
                            GuardError::validation_failed(url, status, None)
                        }
                        Err(cause) => {
                            debug!(%url, status, error = %cause, "response rejected");
                            GuardError::validation_failed(url, status, Some(cause))
                        }
                    }
                }
            };

            if ticket.retries() >= service.retries() {
                if let Some(node) = ticket.node().cloned() {
                    ticket.add_fail(&node);
                }
                warn!(retries = ticket.retries(), error = %failure, "retry budget exhausted");
                return Err(failure);
            }
            self.retry(ticket).await?;
        }
    }

    /// Like [`execute`](Self::execute), but bounded by a total wall-clock
    /// budget across all attempts and backoff pauses.
    ///
    /// On expiry the in-flight request future is dropped, which cancels the
    /// connection attempt instead of leaving it running. A budget of zero
    /// seconds means no deadline.
    ///
    /// # Errors
    ///
    /// [`GuardError::DeadlineExceeded`] on expiry, otherwise the errors of
    /// [`execute`](Self::execute).
    pub async fn execute_with_timeout(
        &self,
        ticket: &mut Ticket,
        seconds: u64,
    ) -> Result<(), GuardError> {
        if seconds == 0 {
            return self.execute(ticket).await;
        }
        let outcome = tokio::time::timeout(Duration::from_secs(seconds), self.execute(ticket)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(ticket = %ticket.id(), seconds, "execution deadline exceeded");
                Err(GuardError::deadline_exceeded(seconds))
            }
        }
    }

    /// Prepares the next attempt: bumps the counter, records the failed
    /// node, picks the next node and rebuilds the request.
    async fn retry(&self, ticket: &mut Ticket) -> Result<(), GuardError> {
        ticket.retries += 1;
        let mut previous = ticket
            .request
            .take()
            .ok_or_else(|| GuardError::request_not_built(ticket.id()))?;
        ticket.close_response();

        if let Some(failed) = ticket.node().cloned() {
            ticket.add_fail(&failed);
        }

        match &self.retry_selector {
            Some(selector) => {
                let node = selector
                    .select_node(self, ticket)
                    .map_err(GuardError::retry_selection)?;
                ticket.set_node(node);
            }
            None => ticket.clear_node(),
        }

        let method = previous.method().clone();
        let headers = previous.headers().clone();
        let previous_body = previous.body_mut().take();

        let path = ticket.path().to_owned();
        let request = self.create_request(ticket, method, &path)?;
        *request.headers_mut() = headers;
        if request.body().is_none() {
            *request.body_mut() = previous_body;
        }

        let service = Arc::clone(ticket.service());
        let next: Option<Arc<Node>> = ticket.node().cloned();
        debug!(
            retries = ticket.retries(),
            node = next.as_ref().map_or("-", |n| n.name()),
            "retrying"
        );
        if next.is_some_and(|node| ticket.has_failed(&node)) && service.retry_interval_ms() > 0 {
            debug!(interval_ms = service.retry_interval_ms(), "node already failed, pausing");
            tokio::time::sleep(service.retry_interval()).await;
        }
        Ok(())
    }
}

/// Returns the request to send for this attempt.
///
/// Clonable requests are cloned so the ticket keeps the original for a
/// resend. A streamed body can only be sent once: the original goes out and
/// a body-less copy stays on the ticket.
fn take_attempt_request(ticket: &mut Ticket) -> Result<Request, GuardError> {
    let id = ticket.id().to_string();
    let Some(request) = ticket.request.as_mut() else {
        return Err(GuardError::request_not_built(id));
    };
    if let Some(copy) = request.try_clone() {
        return Ok(copy);
    }
    let mut skeleton = Request::new(request.method().clone(), request.url().clone());
    *skeleton.headers_mut() = request.headers().clone();
    Ok(std::mem::replace(request, skeleton))
}
