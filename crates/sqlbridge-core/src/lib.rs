//! # sqlbridge-core
//!
//! Engine-agnostic SQL statement building.
//!
//! This crate provides:
//! - Immutable dialect profiles for the supported engines, looked up by
//!   [`Engine`]
//! - Builders for SELECT, INSERT/UPDATE and DELETE statements that render
//!   engine-specific SQL (identifier escaping, joins, row limiting)
//! - Stored-procedure parameter binding, including binding from
//!   where-clause fragments
//! - A small ad-hoc filter grammar for user-typed numeric and string
//!   filters
//!
//! Nothing here talks to a database; execution lives in
//! `sqlbridge-session`.
//!
//! ## Rendering for different engines
//!
//! ```rust
//! use sqlbridge_core::{Engine, Select};
//!
//! let select = Select::new()
//!     .fields(&["id", "name"])
//!     .table("users")
//!     .order_by("name")
//!     .limit(5);
//!
//! assert_eq!(
//!     select.render(Engine::SqlServer.profile()).unwrap(),
//!     "SELECT TOP 5 id, [name] FROM users ORDER BY name"
//! );
//! assert_eq!(
//!     select.render(Engine::PostgreSql.profile()).unwrap(),
//!     r#"SELECT id, "name" FROM users ORDER BY name LIMIT 5"#
//! );
//! assert_eq!(
//!     select.render(Engine::Oracle.profile()).unwrap(),
//!     r#"SELECT id, "name" FROM users WHERE ROWNUM <= 5 ORDER BY name"#
//! );
//! ```

pub mod bind;
pub mod builder;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod procedure;
pub mod value;

pub use bind::BindableStatement;
pub use builder::{Delete, JoinKind, Select, WriteStatement};
pub use dialect::{DialectProfile, Engine};
pub use error::{CoreError, DbError, Result};
pub use procedure::{ProcedureCall, ProcedureSpec, SqlType};
pub use value::{SqlValue, ToSqlValue};
