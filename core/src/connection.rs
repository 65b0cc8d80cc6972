//! Authenticated connection and the generic call path.
//!
//! # Design
//! `Connection` never interprets business meaning: it builds the request,
//! hands it to the transport, validates the status against the expected set
//! for the verb, and decodes the body. Everything the server says beyond
//! that (conflicts, missing groups, privileges) is classified by the
//! resource layer on top.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::groups::Groups;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{CallResult, Payload};

/// Authenticated connection to one server.
///
/// Immutable after construction; a single instance may be shared across
/// threads for independent call sequences. Authentication is HTTP basic with
/// the token as username and an empty password.
pub struct Connection {
    base_url: String,
    auth_header: String,
    transport: Box<dyn Transport>,
}

// Manual impl so the credential never reaches log output.
impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .field("auth_header", &"[REDACTED]")
            .finish()
    }
}

impl Connection {
    /// Connect to `base_url` using the default ureq transport.
    ///
    /// Fails with [`Error::Configuration`] when `token` is empty.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_transport(base_url, token, Box::new(UreqTransport::new()))
    }

    /// Like [`Connection::new`] but with a caller-supplied transport.
    pub fn with_transport(
        base_url: &str,
        token: &str,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::Configuration(
                "authentication token is not provided".to_string(),
            ));
        }
        let auth_header = format!("Basic {}", STANDARD.encode(format!("{token}:")));
        Ok(Connection {
            base_url: base_url.to_string(),
            auth_header,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The user-group resource layered on this connection.
    pub fn groups(&self) -> Groups<'_> {
        Groups::new(self)
    }

    /// GET `path` with query parameters. Expects status 200.
    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<CallResult> {
        self.call(HttpMethod::Get, path, query, &[], &[200])
    }

    /// POST `path` with a form-encoded body. Expects status 200 or 201.
    pub fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<CallResult> {
        self.call(HttpMethod::Post, path, &[], form, &[200, 201])
    }

    /// PUT `path` with a form-encoded body. Expects status 200.
    pub fn put(&self, path: &str, form: &[(&str, &str)]) -> Result<CallResult> {
        self.call(HttpMethod::Put, path, &[], form, &[200])
    }

    /// DELETE `path` with an optional form-encoded body. Any 2xx is accepted.
    pub fn delete(&self, path: &str, form: Option<&[(&str, &str)]>) -> Result<CallResult> {
        self.call(HttpMethod::Delete, path, &[], form.unwrap_or(&[]), &[])
    }

    /// Execute one round-trip. `expected` empty means any 2xx passes.
    ///
    /// Paths must start with `/`; the URL is plain concatenation with no
    /// slash normalization.
    fn call(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
        expected: &[u16],
    ) -> Result<CallResult> {
        let url = format!("{}{}", self.base_url, path);
        let request = HttpRequest {
            method,
            url: url.clone(),
            headers: vec![("Authorization".to_string(), self.auth_header.clone())],
            query: to_owned_pairs(query),
            form: to_owned_pairs(form),
        };
        debug!(method = method.as_str(), url = %url, "api call");

        let response = self.transport.execute(&request).map_err(|source| {
            warn!(method = method.as_str(), url = %url, error = %source, "transport failure");
            Error::Transport {
                url: url.clone(),
                data: if form.is_empty() {
                    to_owned_pairs(query)
                } else {
                    to_owned_pairs(form)
                },
                source,
            }
        })?;

        let accepted = if expected.is_empty() {
            (200..300).contains(&response.status)
        } else {
            expected.contains(&response.status)
        };
        if !accepted {
            warn!(status = response.status, url = %url, "unexpected status");
            return Err(Error::UnexpectedStatus {
                url,
                expected: expected.to_vec(),
                actual: response.status,
                details: decode_error_details(&response.body),
            });
        }

        Ok(CallResult::unchanged(decode_body(response)))
    }
}

fn to_owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn decode_body(response: HttpResponse) -> Payload {
    if response.body.is_empty() {
        return Payload::Empty;
    }
    match serde_json::from_str(&response.body) {
        Ok(value) => Payload::Json(value),
        Err(_) => Payload::Text(response.body),
    }
}

/// Error bodies are usually `{"errors":[{"msg":..}]}` JSON; keep whatever
/// text the server sent when they are not.
fn decode_error_details(body: &str) -> serde_json::Value {
    if body.is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}
