//! The common interface of statements that accept positional values.

use crate::error::Result;
use crate::value::SqlValue;

/// A statement that values can be bound to by position.
///
/// Two variants exist and are chosen when the statement is created:
/// [`WriteStatement`](crate::builder::WriteStatement) collects values that
/// are rendered into SQL text, while
/// [`ProcedureCall`](crate::procedure::ProcedureCall) binds values to
/// callable-statement parameters.
pub trait BindableStatement {
    /// Binds the next value and returns the position it was bound to.
    fn add_value(&mut self, value: SqlValue) -> Result<usize>;

    /// Binds a value at an explicit 1-based position.
    fn set_value(&mut self, value: SqlValue, position: usize) -> Result<()>;

    /// A human-readable rendering for logs and diagnostics.
    fn describe(&self) -> String;
}
