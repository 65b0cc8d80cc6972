//! Domain DTOs for the user-group API.
//!
//! # Design
//! These types mirror the server's wire shapes but are defined independently
//! of the mock-server crate; the integration tests catch schema drift.
//! `Group` is a transient value — looked up by name, mutated by id — never a
//! long-lived handle.

use serde::Deserialize;

/// A user group as returned by `/api/user_groups/search`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Group {
    /// Server-assigned opaque identifier.
    pub id: String,
    /// Unique, user-facing name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Decoded response body of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The response body was empty.
    Empty,
    /// The body decoded as JSON.
    Json(serde_json::Value),
    /// The body was non-empty but not valid JSON; kept as raw text.
    Text(String),
}

impl Payload {
    /// The decoded JSON value, if this payload is JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Outcome of a call, as reported to the automation wrapper.
///
/// `Connection` always returns `changed: false` and no message; the group
/// resource layer stamps `changed` on mutations and attaches an informational
/// message on idempotent short-circuits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub changed: bool,
    pub message: Option<String>,
    pub payload: Payload,
}

impl CallResult {
    pub(crate) fn unchanged(payload: Payload) -> Self {
        CallResult {
            changed: false,
            message: None,
            payload,
        }
    }
}
