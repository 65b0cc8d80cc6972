//! Error types for the SonarQube admin API client.
//!
//! # Design
//! `GroupNotFound` and `GroupAlreadyExists` get dedicated variants because
//! the automation wrapper consuming this crate downgrades exactly those two
//! into "no-op success" reports. `Connection` only ever produces the first
//! three variants; the business-meaning variants are assigned by the group
//! resource layer, which inspects `UnexpectedStatus` content (status code,
//! message substrings) to reclassify.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Connection`](crate::Connection) and
/// [`Groups`](crate::Groups) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid client construction, e.g. an empty token.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Network-level failure (connection refused, timeout, TLS) before a
    /// response was obtained. Carries the form/query pairs that were being
    /// sent, mirroring what the server never received.
    #[error("transport failure for {url} (data: {data:?}): {source}")]
    Transport {
        url: String,
        data: Vec<(String, String)>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server answered with a status outside the expected set for the
    /// verb. `expected` empty means any 2xx was acceptable. `details` holds
    /// the decoded JSON error payload when the body parses as JSON, the raw
    /// text otherwise.
    #[error(
        "unexpected status {actual} for {url} (expected {}): {details}",
        format_expected(.expected)
    )]
    UnexpectedStatus {
        url: String,
        expected: Vec<u16>,
        actual: u16,
        details: serde_json::Value,
    },

    /// The server denied the action (HTTP 403).
    #[error("insufficient privileges: {0}")]
    InsufficientPrivileges(String),

    /// The targeted group does not exist.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// The targeted group already exists.
    #[error("group already exists: {0}")]
    GroupAlreadyExists(String),

    /// Catch-all for decode/logic failures with no more specific kind.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

fn format_expected(expected: &[u16]) -> String {
    if expected.is_empty() {
        "2xx".to_string()
    } else {
        expected
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}
