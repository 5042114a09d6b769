//! The driver seam.
//!
//! A [`Connector`] opens a [`Connection`]; the session talks to the
//! database only through these two traits. Every statement a driver runs
//! hands back a [`StatementHandle`] that the session releases, either
//! immediately or at the end of the current transaction.

use sqlbridge_core::{DbError, ProcedureSpec, SqlValue};

/// Opaque identifier for a driver-side statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementHandle(pub u64);

/// Result of a statement that changes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    /// Handle to release once the statement is finished with.
    pub handle: StatementHandle,
    /// Rows the statement changed.
    pub rows_affected: u64,
}

/// Rows returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    handle: StatementHandle,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    /// Creates a result set. Each row must have one value per column.
    #[must_use]
    pub const fn new(handle: StatementHandle, columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            handle,
            columns,
            rows,
        }
    }

    /// Handle of the statement that produced these rows.
    #[must_use]
    pub const fn handle(&self) -> StatementHandle {
        self.handle
    }

    /// Column names, in select order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the query matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at `row` for the column named `column` (case-insensitive).
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(idx)
    }

    /// The first column of the first row, if any.
    #[must_use]
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first()?.first()
    }
}

/// Result of a stored-procedure call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    /// Handle to release once the call is finished with.
    pub handle: StatementHandle,
    /// Value of the return slot, when the procedure declares one.
    pub return_value: Option<SqlValue>,
    /// Rows changed by the procedure, as reported by the driver.
    pub rows_affected: u64,
}

/// An open database connection.
///
/// Auto-commit is on after `connect`. Drivers report every failure as a
/// [`DbError`] carrying whatever SQLSTATE and vendor code the database gave.
pub trait Connection {
    /// Runs an INSERT, UPDATE, DELETE or other non-query statement.
    fn execute_update(&mut self, sql: &str) -> Result<UpdateResult, DbError>;

    /// Runs a query and collects its rows.
    fn execute_query(&mut self, sql: &str) -> Result<ResultSet, DbError>;

    /// Frees the driver resources behind a statement.
    fn release(&mut self, handle: StatementHandle) -> Result<(), DbError>;

    /// Switches auto-commit on or off.
    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DbError>;

    /// Commits the current unit of work.
    fn commit(&mut self) -> Result<(), DbError>;

    /// Rolls back the current unit of work.
    fn rollback(&mut self) -> Result<(), DbError>;

    /// Looks up a stored procedure's signature. `Ok(None)` when no such
    /// procedure exists.
    fn describe_procedure(&mut self, name: &str) -> Result<Option<ProcedureSpec>, DbError>;

    /// Invokes a stored procedure through the callable API.
    ///
    /// `call_sql` is the escape-syntax call string and `params` the bound
    /// `(ordinal, value)` pairs. With `has_return` set, ordinal 1 is the
    /// return slot and must be registered as an output.
    fn call(
        &mut self,
        call_sql: &str,
        params: &[(usize, SqlValue)],
        has_return: bool,
    ) -> Result<CallResult, DbError>;

    /// Closes the connection.
    fn close(&mut self) -> Result<(), DbError>;
}

/// Opens connections.
pub trait Connector {
    /// Connection type produced.
    type Connection: Connection;

    /// Opens a new connection with auto-commit on.
    fn connect(&self) -> Result<Self::Connection, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        ResultSet::new(
            StatementHandle(7),
            vec!["id".into(), "Name".into()],
            vec![
                vec![SqlValue::Long(1), SqlValue::Text("a".into())],
                vec![SqlValue::Long(2), SqlValue::Null],
            ],
        )
    }

    #[test]
    fn test_result_set_lookup() {
        let rs = sample();
        assert_eq!(rs.handle(), StatementHandle(7));
        assert_eq!(rs.len(), 2);
        assert!(!rs.is_empty());
        assert_eq!(rs.get(0, "name"), Some(&SqlValue::Text("a".into())));
        assert_eq!(rs.get(1, "NAME"), Some(&SqlValue::Null));
        assert_eq!(rs.get(2, "id"), None);
        assert_eq!(rs.get(0, "missing"), None);
    }

    #[test]
    fn test_scalar() {
        assert_eq!(sample().scalar(), Some(&SqlValue::Long(1)));
        let empty = ResultSet::new(StatementHandle(1), vec!["n".into()], vec![]);
        assert!(empty.is_empty());
        assert_eq!(empty.scalar(), None);
    }
}
