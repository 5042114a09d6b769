//! Dialect-aware statement builders.
//!
//! Builders accumulate clause fragments by chaining and render them for a
//! [`DialectProfile`](crate::dialect::DialectProfile).
//!
//! # Example
//!
//! ```rust
//! use sqlbridge_core::builder::Select;
//! use sqlbridge_core::dialect::Engine;
//!
//! let select = Select::new()
//!     .fields(&["o.id", "c.name"])
//!     .table("orders o")
//!     .inner_join("customers c", "o.cust_id = c.id")
//!     .limit(20);
//!
//! assert_eq!(
//!     select.render(Engine::SqlServer.profile()).unwrap(),
//!     "SELECT TOP 20 o.id, [c].[name] FROM orders o INNER JOIN customers c ON o.cust_id = c.id"
//! );
//! ```

mod clause;
mod delete;
mod select;
mod write;

pub use clause::{ClauseSet, Join, JoinKind};
pub use delete::Delete;
pub use select::Select;
pub use write::WriteStatement;
