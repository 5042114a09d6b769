//! # sqlbridge-sqlite
//!
//! A blocking SQLite driver for `sqlbridge-session`.
//!
//! Each [`SqliteConnection`] owns one `sqlx` connection and a
//! current-thread tokio runtime that drives it, so sessions stay
//! synchronous. Auto-commit off is emulated with an explicit `BEGIN`
//! issued before the first statement of each unit of work.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use sqlbridge_core::Engine;
//! use sqlbridge_session::Session;
//! use sqlbridge_sqlite::SqliteConnector;
//!
//! let connector = SqliteConnector::new("sqlite://stations.db?mode=rwc")
//!     .login_timeout(Duration::from_secs(5));
//! let mut session = Session::new(Engine::Sqlite, connector);
//! session.open().unwrap();
//! session
//!     .execute_sql("CREATE TABLE IF NOT EXISTS stations (code TEXT PRIMARY KEY)")
//!     .unwrap();
//! ```
//!
//! SQLite has no stored procedures: [`SqliteConnection`] reports every
//! procedure as missing and rejects calls.

mod connection;

pub use connection::{SqliteConnection, SqliteConnector};
