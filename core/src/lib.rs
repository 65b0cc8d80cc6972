//! Synchronous client for the SonarQube user-group administration API.
//!
//! # Overview
//! Two layers, strictly ordered: [`Connection`] owns the base URL, basic-auth
//! credential, and the generic call path (status validation, JSON decoding,
//! transport-error wrapping); [`Groups`] builds idempotent group lifecycle
//! operations (list, find-by-name, create, update, delete) on top of it and
//! performs all business-error classification.
//!
//! # Design
//! - `Connection` is immutable after construction and shareable across
//!   threads; no retries, no caching.
//! - The [`transport::Transport`] trait is the I/O seam; the default
//!   implementation drives ureq synchronously, tests substitute scripted
//!   fakes.
//! - "Not found" during name lookup is an `Option`, not an error; only
//!   genuine faults use the [`Error`] kinds.
//! - The crate emits `tracing` events and configures no logger; subscriber
//!   installation belongs to the caller.
//!
//! # Example
//! ```no_run
//! use sonar_core::Connection;
//!
//! # fn main() -> sonar_core::Result<()> {
//! let conn = Connection::new("http://localhost:9000", "squ_mytoken")?;
//! let created = conn.groups().create("platform", Some("Platform team"))?;
//! assert!(created.changed);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod groups;
pub mod http;
pub mod transport;
pub mod types;

pub use connection::Connection;
pub use error::{Error, Result};
pub use groups::Groups;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{CallResult, Group, Payload};
