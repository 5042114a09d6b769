//! sqlx-backed implementation of the session driver traits.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use sqlbridge_core::{DbError, ProcedureSpec, SqlValue};
use sqlbridge_session::{CallResult, Connection, Connector, ResultSet, StatementHandle, UpdateResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Row, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, trace};

/// Opens SQLite connections from a URL such as `sqlite::memory:` or
/// `sqlite://data.db?mode=rwc`.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    url: String,
    login_timeout: Option<Duration>,
}

impl SqliteConnector {
    /// Creates a connector with no login timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login_timeout: None,
        }
    }

    /// Limits how long establishing a connection may take.
    #[must_use]
    pub const fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = Some(timeout);
        self
    }

    /// The connection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    fn connect(&self) -> Result<SqliteConnection, DbError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::new(format!("failed to start runtime: {e}")))?;
        let options = SqliteConnectOptions::from_str(&self.url).map_err(db_error)?;

        let conn = runtime.block_on(async {
            match self.login_timeout {
                Some(limit) => tokio::time::timeout(limit, options.connect())
                    .await
                    .map_err(|_| {
                        DbError::new(format!("login timed out after {}ms", limit.as_millis()))
                    })?
                    .map_err(db_error),
                None => options.connect().await.map_err(db_error),
            }
        })?;

        debug!(url = %self.url, "Connected to SQLite");
        Ok(SqliteConnection {
            runtime,
            conn: Some(conn),
            auto_commit: true,
            in_unit_of_work: false,
            live: BTreeSet::new(),
            next_handle: 0,
        })
    }
}

/// A blocking SQLite connection.
pub struct SqliteConnection {
    runtime: Runtime,
    conn: Option<sqlx::SqliteConnection>,
    auto_commit: bool,
    // Set once BEGIN has been issued for the current unit of work.
    in_unit_of_work: bool,
    live: BTreeSet<u64>,
    next_handle: u64,
}

impl SqliteConnection {
    fn run(&mut self, sql: &str) -> Result<u64, DbError> {
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let done = self
            .runtime
            .block_on(sqlx::query(sql).execute(&mut *conn))
            .map_err(db_error)?;
        Ok(done.rows_affected())
    }

    fn begin_if_needed(&mut self) -> Result<(), DbError> {
        if !self.auto_commit && !self.in_unit_of_work {
            trace!("BEGIN");
            self.run("BEGIN")?;
            self.in_unit_of_work = true;
        }
        Ok(())
    }

    fn end_unit_of_work(&mut self, sql: &str) -> Result<(), DbError> {
        if self.in_unit_of_work {
            trace!("{sql}");
            self.run(sql)?;
            self.in_unit_of_work = false;
        }
        Ok(())
    }

    fn handle(&mut self) -> StatementHandle {
        self.next_handle += 1;
        self.live.insert(self.next_handle);
        StatementHandle(self.next_handle)
    }
}

impl Connection for SqliteConnection {
    fn execute_update(&mut self, sql: &str) -> Result<UpdateResult, DbError> {
        self.begin_if_needed()?;
        let rows_affected = self.run(sql)?;
        Ok(UpdateResult {
            handle: self.handle(),
            rows_affected,
        })
    }

    fn execute_query(&mut self, sql: &str) -> Result<ResultSet, DbError> {
        self.begin_if_needed()?;
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let rows = self
            .runtime
            .block_on(sqlx::query(sql).fetch_all(&mut *conn))
            .map_err(db_error)?;

        // Column names come from the rows; an empty result has none.
        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let values = rows.iter().map(row_values).collect::<Result<Vec<_>, _>>()?;
        Ok(ResultSet::new(self.handle(), columns, values))
    }

    fn release(&mut self, handle: StatementHandle) -> Result<(), DbError> {
        if self.live.remove(&handle.0) {
            Ok(())
        } else {
            Err(DbError::new(format!("unknown statement handle {}", handle.0)))
        }
    }

    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DbError> {
        if enabled {
            self.end_unit_of_work("COMMIT")?;
        }
        self.auto_commit = enabled;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.end_unit_of_work("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.end_unit_of_work("ROLLBACK")
    }

    fn describe_procedure(&mut self, _name: &str) -> Result<Option<ProcedureSpec>, DbError> {
        Ok(None)
    }

    fn call(
        &mut self,
        call_sql: &str,
        _params: &[(usize, SqlValue)],
        _has_return: bool,
    ) -> Result<CallResult, DbError> {
        Err(DbError::new(format!(
            "SQLite does not support stored procedures: {call_sql}"
        )))
    }

    fn close(&mut self) -> Result<(), DbError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        self.live.clear();
        self.in_unit_of_work = false;
        self.runtime
            .block_on(sqlx::Connection::close(conn))
            .map_err(db_error)
    }
}

fn row_values(row: &SqliteRow) -> Result<Vec<SqlValue>, DbError> {
    (0..row.len()).map(|i| column_value(row, i)).collect()
}

fn column_value(row: &SqliteRow, index: usize) -> Result<SqlValue, DbError> {
    let raw = row.try_get_raw(index).map_err(db_error)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let value = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => SqlValue::Long(row.try_get_unchecked(index).map_err(db_error)?),
        "REAL" | "NUMERIC" => SqlValue::Double(row.try_get_unchecked(index).map_err(db_error)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get_unchecked(index).map_err(db_error)?;
            SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => SqlValue::Text(row.try_get_unchecked(index).map_err(db_error)?),
    };
    Ok(value)
}

fn closed() -> DbError {
    DbError::new("connection is closed")
}

/// Converts a sqlx error, keeping SQLite's extended result code as the
/// vendor code.
fn db_error(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db) => {
            let converted = DbError::new(db.message());
            match db.code().and_then(|code| code.parse::<i64>().ok()) {
                Some(code) => converted.with_code(code),
                None => converted,
            }
        }
        _ => DbError::new(err.to_string()),
    }
}
