//! # sqlbridge-session
//!
//! Runs statements built with `sqlbridge-core` against a database.
//!
//! This crate provides:
//! - The [`Connection`] / [`Connector`] seam drivers implement
//! - A [`Session`] with explicit transactions, read-only mode, dirty
//!   tracking and deferred statement release
//! - Insert/update fallback writes ([`WriteMode`]) that classify
//!   constraint violations with the active dialect profile
//! - Replayable [`Request`]s: every execution returns the request it ran
//!
//! Sessions are single-threaded; drivers are blocking.

pub mod config;
pub mod connection;
pub mod error;
pub mod request;
pub mod session;
pub mod write;

pub use config::SessionConfig;
pub use connection::{CallResult, Connection, Connector, ResultSet, StatementHandle, UpdateResult};
pub use error::{Result, SessionError};
pub use request::{Executed, Outcome, Request};
pub use session::{Session, SessionState, TransactionStart};
pub use write::{WriteKind, WriteMode, WriteOutcome};
