//! Transport seam between `Connection` and the network.
//!
//! # Design
//! `Connection` owns status interpretation and body decoding; a `Transport`
//! only executes one `HttpRequest` and reports what came back. The default
//! implementation drives ureq with automatic status-code-as-error behavior
//! disabled, so 4xx/5xx responses are returned as data rather than `Err` and
//! the client decides what each status means.

use std::time::Duration;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Network-level failure reported by a transport. `Connection` wraps it into
/// [`Error::Transport`](crate::Error::Transport) together with the request
/// context.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Executes a single HTTP round-trip.
///
/// Implementations must be safe for concurrent use; `Connection` is shared
/// across threads without locking.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Synchronous ureq-backed transport.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Apply a global deadline to every request, covering connect, write,
    /// and read.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let mut config = ureq::Agent::config_builder().http_status_as_error(false);
        if let Some(timeout) = timeout {
            config = config.timeout_global(Some(timeout));
        }
        UreqTransport {
            agent: config.build().new_agent(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let form = || request.form.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let query = || request.query.iter().map(|(k, v)| (k.as_str(), v.as_str()));

        let result = match request.method {
            HttpMethod::Get => {
                let mut call = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    call = call.header(name, value);
                }
                call.query_pairs(query()).call()
            }
            HttpMethod::Post => {
                let mut call = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    call = call.header(name, value);
                }
                call.query_pairs(query()).send_form(form())
            }
            HttpMethod::Put => {
                let mut call = self.agent.put(&request.url);
                for (name, value) in &request.headers {
                    call = call.header(name, value);
                }
                call.query_pairs(query()).send_form(form())
            }
            HttpMethod::Delete => {
                let mut call = self.agent.delete(&request.url).query_pairs(query());
                for (name, value) in &request.headers {
                    call = call.header(name, value);
                }
                if request.form.is_empty() {
                    call.call()
                } else {
                    call.force_send_body().send_form(form())
                }
            }
        };

        let mut response = result.map_err(|e| Box::new(e) as TransportError)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Box::new(e) as TransportError)?;

        Ok(HttpResponse { status, body })
    }
}
