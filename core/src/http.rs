//! Plain-data HTTP request/response types at the transport seam.
//!
//! # Design
//! `Connection` describes each call as an `HttpRequest` value and hands it to
//! a [`Transport`](crate::transport::Transport) for execution. Keeping the
//! request as plain data keeps status interpretation and body decoding out of
//! the I/O layer, and lets tests substitute scripted responses without a
//! network.
//!
//! All fields use owned types (`String`, `Vec`) so requests can be logged and
//! carried inside error values without lifetime concerns.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Connection`; the transport is responsible for encoding `query`
/// into the URL and `form` as an `application/x-www-form-urlencoded` body.
/// At most one of `query` / `form` is non-empty for any given call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Full URL, base URL and path already concatenated.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

/// An HTTP response described as plain data.
///
/// Produced by the transport after executing an `HttpRequest`, then handed
/// back to `Connection` for status validation and body decoding.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}
