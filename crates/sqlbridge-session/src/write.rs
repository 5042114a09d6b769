//! Write modes and the insert/update fallback strategies.

use std::fmt;
use std::str::FromStr;

use sqlbridge_core::{DbError, DialectProfile, WriteStatement};
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// How a [`WriteStatement`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Plain INSERT.
    Insert,
    /// Plain UPDATE using the statement's WHERE clause.
    Update,
    /// INSERT, falling back to UPDATE when the row already exists.
    InsertUpdate,
    /// UPDATE, falling back to INSERT when nothing matched.
    UpdateInsert,
    /// Recognized but not implemented; always fails.
    DeleteInsert,
}

impl WriteMode {
    /// Canonical kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::InsertUpdate => "insert-update",
            Self::UpdateInsert => "update-insert",
            Self::DeleteInsert => "delete-insert",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WriteMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "insert-update" | "insertupdate" | "upsert" => Ok(Self::InsertUpdate),
            "update-insert" | "updateinsert" => Ok(Self::UpdateInsert),
            "delete-insert" | "deleteinsert" => Ok(Self::DeleteInsert),
            _ => Err(SessionError::UnsupportedWriteMode(s.to_string())),
        }
    }
}

/// Which statement ended up changing the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// An INSERT ran last.
    Inserted,
    /// An UPDATE ran last.
    Updated,
}

/// Result of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Statement that did the work.
    pub kind: WriteKind,
    /// Rows it affected.
    pub rows_affected: u64,
}

impl WriteOutcome {
    const fn inserted(rows_affected: u64) -> Self {
        Self {
            kind: WriteKind::Inserted,
            rows_affected,
        }
    }

    const fn updated(rows_affected: u64) -> Self {
        Self {
            kind: WriteKind::Updated,
            rows_affected,
        }
    }
}

/// Applies `statement` in `mode`, running SQL through `exec`.
///
/// `exec` runs one statement and returns the affected row count. Both SQL
/// strings a mode may need are rendered before anything runs, so a
/// malformed statement never reaches the database.
///
/// # Errors
///
/// - [`SessionError::Build`] when the statement cannot be rendered
/// - [`SessionError::UnsupportedWriteMode`] for [`WriteMode::DeleteInsert`]
/// - [`SessionError::DialectConstraintUnrecognized`] when an insert fails
///   under [`WriteMode::InsertUpdate`] and the profile has no duplicate-key
///   signatures
/// - [`SessionError::Database`] for any other database failure
pub fn apply<F>(
    profile: &DialectProfile,
    statement: &WriteStatement,
    mode: WriteMode,
    mut exec: F,
) -> Result<WriteOutcome>
where
    F: FnMut(&str) -> std::result::Result<u64, DbError>,
{
    if updates_every_row(statement, mode) {
        warn!(
            table = statement.table_name().unwrap_or_default(),
            mode = %mode,
            "UPDATE has no WHERE clause and will touch every row"
        );
    }
    match mode {
        WriteMode::Insert => {
            let insert = statement.to_insert_string(profile)?;
            Ok(WriteOutcome::inserted(exec(&insert)?))
        }
        WriteMode::Update => {
            let update = statement.to_update_string(profile, false)?;
            Ok(WriteOutcome::updated(exec(&update)?))
        }
        WriteMode::InsertUpdate => {
            let insert = statement.to_insert_string(profile)?;
            let update = statement.to_update_string(profile, false)?;
            match exec(&insert) {
                Ok(rows) => Ok(WriteOutcome::inserted(rows)),
                Err(err) => match profile.is_duplicate_key(&err) {
                    Some(true) => {
                        debug!(error = %err, "Row exists, falling back to update");
                        Ok(WriteOutcome::updated(exec(&update)?))
                    }
                    Some(false) => Err(SessionError::Database(err)),
                    None => Err(SessionError::DialectConstraintUnrecognized {
                        engine: profile.engine,
                        source: err,
                    }),
                },
            }
        }
        WriteMode::UpdateInsert => {
            let update = statement.to_update_string(profile, true)?;
            let insert = statement.to_insert_string(profile)?;
            let rows = exec(&update)?;
            if rows > 0 {
                return Ok(WriteOutcome::updated(rows));
            }
            debug!("No rows updated, falling back to insert");
            Ok(WriteOutcome::inserted(exec(&insert)?))
        }
        WriteMode::DeleteInsert => Err(SessionError::UnsupportedWriteMode(mode.to_string())),
    }
}

/// True when `mode` runs the caller's UPDATE and that UPDATE has no WHERE.
fn updates_every_row(statement: &WriteStatement, mode: WriteMode) -> bool {
    matches!(mode, WriteMode::Update | WriteMode::InsertUpdate)
        && statement.where_clauses().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::Engine;

    fn station() -> WriteStatement {
        WriteStatement::new()
            .table("stations")
            .set("code", "01234")
            .set("elev", 12_i32)
            .where_clause("code = '01234'")
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("insert".parse::<WriteMode>().unwrap(), WriteMode::Insert);
        assert_eq!("UPDATE".parse::<WriteMode>().unwrap(), WriteMode::Update);
        assert_eq!(
            "insert_update".parse::<WriteMode>().unwrap(),
            WriteMode::InsertUpdate
        );
        assert_eq!(
            "update-insert".parse::<WriteMode>().unwrap(),
            WriteMode::UpdateInsert
        );
        assert_eq!(
            "delete-insert".parse::<WriteMode>().unwrap(),
            WriteMode::DeleteInsert
        );
        assert!(matches!(
            "merge".parse::<WriteMode>(),
            Err(SessionError::UnsupportedWriteMode(m)) if m == "merge"
        ));
    }

    #[test]
    fn test_insert_update_falls_back_once_on_duplicate() {
        let profile = Engine::MySql.profile();
        let mut ran = Vec::new();
        let outcome = apply(profile, &station(), WriteMode::InsertUpdate, |sql| {
            ran.push(sql.to_string());
            if sql.starts_with("INSERT") {
                Err(DbError::new("Duplicate entry").with_state("23000").with_code(1062))
            } else {
                Ok(1)
            }
        })
        .unwrap();

        assert_eq!(outcome, WriteOutcome::updated(1));
        assert_eq!(ran.len(), 2);
        assert_eq!(
            ran[1],
            "UPDATE stations SET `code`='01234', `elev`=12 WHERE code = '01234'"
        );
    }

    #[test]
    fn test_insert_update_reraises_other_errors() {
        let profile = Engine::MySql.profile();
        let mut count = 0;
        let err = apply(profile, &station(), WriteMode::InsertUpdate, |_| {
            count += 1;
            Err(DbError::new("no such table").with_state("42S02").with_code(1146))
        })
        .unwrap_err();

        assert_eq!(count, 1);
        assert!(matches!(err, SessionError::Database(ref e) if e.vendor_code == Some(1146)));
    }

    #[test]
    fn test_insert_update_without_signatures_does_not_fall_back() {
        let profile = Engine::Generic.profile();
        let mut count = 0;
        let err = apply(profile, &station(), WriteMode::InsertUpdate, |_| {
            count += 1;
            Err(DbError::new("constraint violated").with_state("23000"))
        })
        .unwrap_err();

        assert_eq!(count, 1);
        match err {
            SessionError::DialectConstraintUnrecognized { engine, source } => {
                assert_eq!(engine, Engine::Generic);
                assert_eq!(source.message, "constraint violated");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_update_insert_inserts_only_on_zero_rows() {
        let profile = Engine::Generic.profile();

        let mut ran = Vec::new();
        let outcome = apply(profile, &station(), WriteMode::UpdateInsert, |sql| {
            ran.push(sql.to_string());
            Ok(if sql.starts_with("UPDATE") { 0 } else { 1 })
        })
        .unwrap();
        assert_eq!(outcome, WriteOutcome::inserted(1));
        assert_eq!(ran.len(), 2);

        let mut ran = Vec::new();
        let outcome = apply(profile, &station(), WriteMode::UpdateInsert, |sql| {
            ran.push(sql.to_string());
            Ok(3)
        })
        .unwrap();
        assert_eq!(outcome, WriteOutcome::updated(3));
        assert_eq!(ran.len(), 1);
    }

    #[test]
    fn test_update_without_where_still_runs() {
        let unqualified = WriteStatement::new().table("stations").set("elev", 0_i32);
        assert!(updates_every_row(&unqualified, WriteMode::Update));
        assert!(updates_every_row(&unqualified, WriteMode::InsertUpdate));
        assert!(!updates_every_row(&unqualified, WriteMode::UpdateInsert));
        assert!(!updates_every_row(&unqualified, WriteMode::Insert));
        assert!(!updates_every_row(&station(), WriteMode::Update));

        let mut ran = Vec::new();
        let outcome = apply(
            Engine::Generic.profile(),
            &unqualified,
            WriteMode::Update,
            |sql| {
                ran.push(sql.to_string());
                Ok(4)
            },
        )
        .unwrap();
        assert_eq!(outcome, WriteOutcome::updated(4));
        assert_eq!(ran, ["UPDATE stations SET elev=0"]);
    }

    #[test]
    fn test_delete_insert_is_unsupported() {
        let mut called = false;
        let err = apply(
            Engine::Generic.profile(),
            &station(),
            WriteMode::DeleteInsert,
            |_| {
                called = true;
                Ok(1)
            },
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedWriteMode(_)));
        assert!(!called);
    }

    #[test]
    fn test_malformed_statement_never_executes() {
        let mut called = false;
        let broken = WriteStatement::new().table("t").field("a");
        let err = apply(Engine::Generic.profile(), &broken, WriteMode::Insert, |_| {
            called = true;
            Ok(1)
        })
        .unwrap_err();
        assert!(matches!(err, SessionError::Build(_)));
        assert!(!called);
    }
}
