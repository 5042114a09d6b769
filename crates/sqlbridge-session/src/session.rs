//! The session state machine.

use std::collections::HashMap;
use std::sync::Arc;

use sqlbridge_core::{
    DbError, Delete, DialectProfile, Engine, ProcedureCall, ProcedureSpec, Select, SqlValue,
    WriteStatement,
};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::connection::{CallResult, Connection, Connector, ResultSet, StatementHandle};
use crate::error::{Result, SessionError};
use crate::request::{Executed, Outcome, Request};
use crate::write::{self, WriteMode, WriteOutcome};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    Closed,
    /// Connected, auto-commit on.
    Open,
    /// Connected, auto-commit off, inside an explicit transaction.
    InTransaction,
}

/// What to do with pending work when a transaction starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStart {
    /// Commit whatever the connection has pending.
    Commit,
    /// Discard whatever the connection has pending.
    Rollback,
}

/// A database session.
///
/// Statements are rendered with the session's dialect profile and run on
/// the connection opened by its [`Connector`]. Inside a transaction,
/// statement handles are kept until commit or rollback; outside, they are
/// released as soon as the caller is done with them.
///
/// # Example
///
/// ```rust,ignore
/// use sqlbridge_core::{Engine, WriteStatement};
/// use sqlbridge_session::{Session, TransactionStart, WriteMode};
///
/// let mut session = Session::new(Engine::Sqlite, connector);
/// session.open()?;
/// session.begin_transaction(TransactionStart::Commit)?;
/// let write = WriteStatement::new().table("stations").set("code", "01234");
/// session.write(&write, WriteMode::InsertUpdate)?;
/// session.commit()?;
/// session.close()?;
/// ```
pub struct Session<K: Connector> {
    profile: &'static DialectProfile,
    connector: K,
    conn: Option<K::Connection>,
    in_transaction: bool,
    read_only: bool,
    dirty: bool,
    pending: Vec<StatementHandle>,
    procedures: HashMap<String, Arc<ProcedureSpec>>,
}

impl<K: Connector> Session<K> {
    /// Creates a closed session for `engine`.
    pub fn new(engine: Engine, connector: K) -> Self {
        Self::with_config(SessionConfig::for_engine(engine), connector)
    }

    /// Creates a closed session from a configuration.
    pub fn with_config(config: SessionConfig, connector: K) -> Self {
        Self {
            profile: config.engine.profile(),
            connector,
            conn: None,
            in_transaction: false,
            read_only: config.read_only,
            dirty: false,
            pending: Vec::new(),
            procedures: HashMap::new(),
        }
    }

    /// Dialect profile used to render statements.
    pub const fn profile(&self) -> &'static DialectProfile {
        self.profile
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        if self.conn.is_none() {
            SessionState::Closed
        } else if self.in_transaction {
            SessionState::InTransaction
        } else {
            SessionState::Open
        }
    }

    /// Returns true when writes are rejected.
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Rejects (or allows) writes, deletes and raw SQL from now on.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Returns true when uncommitted changes exist.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of statement handles waiting for the transaction to end.
    pub fn pending_statements(&self) -> usize {
        self.pending.len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// [`SessionError::TransactionState`] when already open, or the
    /// connector's error.
    pub fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(SessionError::TransactionState(
                "session is already open".to_string(),
            ));
        }
        let conn = self.connector.connect()?;
        self.conn = Some(conn);
        info!(engine = %self.profile.engine, "Session opened");
        Ok(())
    }

    /// Closes the connection, rolling back an unfinished transaction.
    ///
    /// Does nothing on a closed session.
    ///
    /// # Errors
    ///
    /// Database errors from rollback, release or close. The session is
    /// closed even when one of them fails.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        let mut first_error = None;

        if self.in_transaction {
            warn!(
                pending = self.pending.len(),
                dirty = self.dirty,
                "Closing session inside a transaction, rolling back"
            );
            if let Err(err) = conn.rollback() {
                first_error.get_or_insert(err);
            }
        }
        for handle in self.pending.drain(..) {
            if let Err(err) = conn.release(handle) {
                first_error.get_or_insert(err);
            }
        }
        if let Err(err) = conn.close() {
            first_error.get_or_insert(err);
        }

        self.in_transaction = false;
        self.dirty = false;
        info!("Session closed");
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Starts a transaction: turns auto-commit off, then commits or rolls
    /// back whatever the connection had pending.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] when closed,
    /// [`SessionError::TransactionState`] when a transaction is already
    /// running, or the database error. On a database error the session
    /// stays open with auto-commit back on.
    pub fn begin_transaction(&mut self, start: TransactionStart) -> Result<()> {
        if self.in_transaction {
            return Err(SessionError::TransactionState(
                "transaction already in progress".to_string(),
            ));
        }
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        conn.set_auto_commit(false)?;
        let started = match start {
            TransactionStart::Commit => conn.commit(),
            TransactionStart::Rollback => conn.rollback(),
        };
        if let Err(err) = started {
            // The session stays Open, so the connection must be back in
            // auto-commit mode.
            if let Err(restore) = conn.set_auto_commit(true) {
                warn!(error = %restore, "Failed to restore auto-commit");
            }
            return Err(err.into());
        }
        self.in_transaction = true;
        debug!(start = ?start, "Transaction started");
        Ok(())
    }

    /// Commits the transaction and returns to auto-commit.
    ///
    /// # Errors
    ///
    /// [`SessionError::TransactionState`] outside a transaction, or the
    /// database error from committing or from restoring auto-commit. The
    /// transaction stays open after either.
    pub fn commit(&mut self) -> Result<()> {
        let conn = self.transaction_connection("commit")?;
        conn.commit()?;
        self.end_transaction()?;
        debug!("Transaction committed");
        Ok(())
    }

    /// Rolls the transaction back and returns to auto-commit.
    ///
    /// # Errors
    ///
    /// Same as [`Session::commit`].
    pub fn rollback(&mut self) -> Result<()> {
        let conn = self.transaction_connection("rollback")?;
        conn.rollback()?;
        self.end_transaction()?;
        debug!("Transaction rolled back");
        Ok(())
    }

    fn transaction_connection(&mut self, action: &str) -> Result<&mut K::Connection> {
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        if !self.in_transaction {
            return Err(SessionError::TransactionState(format!(
                "cannot {action} outside a transaction"
            )));
        }
        Ok(conn)
    }

    /// Runs after a successful commit or rollback. The session only leaves
    /// the transaction once auto-commit is back on.
    fn end_transaction(&mut self) -> Result<()> {
        self.dirty = false;
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        let mut first_error = None;
        for handle in self.pending.drain(..) {
            if let Err(err) = conn.release(handle) {
                first_error.get_or_insert(err);
            }
        }
        conn.set_auto_commit(true)?;
        self.in_transaction = false;
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Runs a SELECT. Hand the rows back with [`Session::release`].
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], render errors, database errors.
    pub fn select(&mut self, select: &Select) -> Result<ResultSet> {
        let sql = select.render(self.profile)?;
        self.query_sql(&sql)
    }

    /// Runs a raw query.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], database errors.
    pub fn query_sql(&mut self, sql: &str) -> Result<ResultSet> {
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        debug!(sql = %sql, "Executing query");
        Ok(conn.execute_query(sql)?)
    }

    /// Counts the rows `select` would return.
    ///
    /// # Errors
    ///
    /// As [`Session::select`], plus a database error when the count query
    /// does not return a number.
    pub fn count(&mut self, select: &Select) -> Result<i64> {
        let sql = select.render_count(self.profile)?;
        let rows = self.query_sql(&sql)?;
        let count = match rows.scalar() {
            Some(SqlValue::Long(n)) => Ok(*n),
            Some(SqlValue::Int(n)) => Ok(i64::from(*n)),
            Some(SqlValue::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| DbError::new(format!("count returned '{s}'"))),
            other => Err(DbError::new(format!(
                "count returned {}",
                other.map_or_else(|| "no rows".to_string(), SqlValue::display)
            ))),
        };
        self.release(rows)?;
        Ok(count?)
    }

    /// Applies a write statement using `mode`.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], [`SessionError::ReadOnlyViolation`],
    /// and everything [`write::apply`] reports.
    pub fn write(&mut self, statement: &WriteStatement, mode: WriteMode) -> Result<WriteOutcome> {
        self.check_writable()?;
        let profile = self.profile;
        debug!(mode = %mode, table = ?statement.table_name(), "Writing");
        let outcome = write::apply(profile, statement, mode, |sql| self.run_update(sql))?;
        self.mark_dirty();
        Ok(outcome)
    }

    /// Runs a DELETE and returns the affected row count.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], [`SessionError::ReadOnlyViolation`],
    /// render errors, database errors.
    pub fn delete(&mut self, delete: &Delete) -> Result<u64> {
        self.check_writable()?;
        let sql = delete.render()?;
        let rows = self.run_update(&sql)?;
        self.mark_dirty();
        Ok(rows)
    }

    /// Runs raw non-query SQL and returns the affected row count.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], [`SessionError::ReadOnlyViolation`],
    /// database errors.
    pub fn execute_sql(&mut self, sql: &str) -> Result<u64> {
        self.check_writable()?;
        let rows = self.run_update(sql)?;
        self.mark_dirty();
        Ok(rows)
    }

    /// Returns an unbound call for the named stored procedure.
    ///
    /// The signature is fetched from the database once and cached for the
    /// life of the session; lookups are case-insensitive.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], [`SessionError::ProcedureNotFound`],
    /// database errors.
    pub fn procedure(&mut self, name: &str) -> Result<ProcedureCall> {
        let key = name.to_lowercase();
        if let Some(spec) = self.procedures.get(&key) {
            return Ok(ProcedureCall::new(Arc::clone(spec)));
        }
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        let spec = conn
            .describe_procedure(name)?
            .ok_or_else(|| SessionError::ProcedureNotFound(name.to_string()))?;
        debug!(procedure = %name, params = spec.params.len(), "Cached procedure signature");
        let spec = Arc::new(spec);
        self.procedures.insert(key, Arc::clone(&spec));
        Ok(ProcedureCall::new(spec))
    }

    /// Invokes a stored procedure with its bound parameters.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], database errors.
    pub fn call(&mut self, call: &ProcedureCall) -> Result<CallResult> {
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        let spec = call.spec();
        debug!(call = %call.debug_string(), "Calling procedure");
        let result = conn.call(&spec.call_string(), &call.bindings(), spec.has_return_value())?;
        self.finish(result.handle)?;
        Ok(result)
    }

    /// Runs any request and returns its outcome with the request itself.
    ///
    /// # Errors
    ///
    /// Whatever the matching method reports.
    pub fn execute(&mut self, request: Request) -> Result<Executed> {
        let outcome = self.run(&request)?;
        Ok(Executed {
            outcome,
            replay: request,
        })
    }

    /// Runs `request` again, exactly as given.
    ///
    /// # Errors
    ///
    /// As [`Session::execute`].
    pub fn replay(&mut self, request: &Request) -> Result<Executed> {
        debug!(kind = request.kind(), "Replaying request");
        self.execute(request.clone())
    }

    fn run(&mut self, request: &Request) -> Result<Outcome> {
        Ok(match request {
            Request::Select(select) => Outcome::Rows(self.select(select)?),
            Request::Count(select) => Outcome::Count(self.count(select)?),
            Request::Write { statement, mode } => Outcome::Written(self.write(statement, *mode)?),
            Request::Delete(delete) => Outcome::Affected(self.delete(delete)?),
            Request::Sql(sql) => Outcome::Affected(self.execute_sql(sql)?),
            Request::Query(sql) => Outcome::Rows(self.query_sql(sql)?),
            Request::Call(call) => Outcome::Called(self.call(call)?),
        })
    }

    /// Hands rows back. Outside a transaction the statement is released
    /// now; inside, at commit or rollback.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`], the driver's release error.
    pub fn release(&mut self, rows: ResultSet) -> Result<()> {
        self.finish(rows.handle())
    }

    fn finish(&mut self, handle: StatementHandle) -> Result<()> {
        if self.in_transaction {
            self.pending.push(handle);
            return Ok(());
        }
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        conn.release(handle)?;
        Ok(())
    }

    fn run_update(&mut self, sql: &str) -> std::result::Result<u64, DbError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DbError::new("session is not connected"))?;
        debug!(sql = %sql, "Executing SQL");
        let result = conn.execute_update(sql)?;
        if self.in_transaction {
            self.pending.push(result.handle);
        } else {
            conn.release(result.handle)?;
        }
        Ok(result.rows_affected)
    }

    fn check_writable(&self) -> Result<()> {
        if self.conn.is_none() {
            return Err(SessionError::NotConnected);
        }
        if self.read_only {
            return Err(SessionError::ReadOnlyViolation);
        }
        Ok(())
    }

    fn mark_dirty(&mut self) {
        if self.in_transaction {
            self.dirty = true;
        }
    }
}

impl<K: Connector> Drop for Session<K> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "Failed to close session on drop");
        }
    }
}
