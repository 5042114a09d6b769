//! Requests a session can execute, and what they produce.
//!
//! Every execution returns the request it ran alongside its outcome, so a
//! caller that wants to repeat the last statement keeps the [`Request`]
//! and hands it to [`Session::replay`](crate::Session::replay).

use sqlbridge_core::{Delete, ProcedureCall, Select, WriteStatement};

use crate::connection::{CallResult, ResultSet};
use crate::write::{WriteMode, WriteOutcome};

/// A unit of work for [`Session::execute`](crate::Session::execute).
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Run a SELECT and return its rows.
    Select(Select),
    /// Count the rows a SELECT would return.
    Count(Select),
    /// Apply a write statement in the given mode.
    Write {
        /// Statement to write.
        statement: WriteStatement,
        /// Strategy to apply it with.
        mode: WriteMode,
    },
    /// Run a DELETE.
    Delete(Delete),
    /// Run raw non-query SQL.
    Sql(String),
    /// Run a raw query.
    Query(String),
    /// Invoke a stored procedure.
    Call(ProcedureCall),
}

impl Request {
    /// Short name used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Count(_) => "count",
            Self::Write { .. } => "write",
            Self::Delete(_) => "delete",
            Self::Sql(_) => "sql",
            Self::Query(_) => "query",
            Self::Call(_) => "call",
        }
    }

    /// Returns true when the request can change data.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Delete(_) | Self::Sql(_))
    }
}

/// What a request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rows from a select or query. Release them with
    /// [`Session::release`](crate::Session::release).
    Rows(ResultSet),
    /// Row count from a count request.
    Count(i64),
    /// Result of a write.
    Written(WriteOutcome),
    /// Rows affected by a delete or raw SQL.
    Affected(u64),
    /// Result of a procedure call.
    Called(CallResult),
}

/// An outcome together with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    /// What the request produced.
    pub outcome: Outcome,
    /// The request, ready to pass to `replay`.
    pub replay: Request,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_is_write() {
        let select = Request::Select(Select::new().field("id").table("t"));
        assert_eq!(select.kind(), "select");
        assert!(!select.is_write());

        let delete = Request::Delete(Delete::from_table("t"));
        assert_eq!(delete.kind(), "delete");
        assert!(delete.is_write());

        let write = Request::Write {
            statement: WriteStatement::new().table("t").set("a", 1_i32),
            mode: WriteMode::Insert,
        };
        assert!(write.is_write());
        assert!(Request::Sql("DELETE FROM t".into()).is_write());
        assert!(!Request::Query("SELECT 1".into()).is_write());
    }
}
