#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use sqlbridge_core::{DbError, Engine, ProcedureSpec, SqlValue};
use sqlbridge_session::{
    CallResult, Connection, Connector, ResultSet, Session, StatementHandle, UpdateResult,
};

/// Everything the mock connection saw, plus scripted responses.
#[derive(Default)]
pub struct MockState {
    pub log: Vec<String>,
    pub updates: VecDeque<Result<u64, DbError>>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    pub procedures: HashMap<String, ProcedureSpec>,
    pub describe_calls: usize,
    pub released: Vec<u64>,
    pub commit_failure: Option<DbError>,
    pub auto_commit_on_failure: Option<DbError>,
    next_handle: u64,
}

impl MockState {
    fn handle(&mut self) -> StatementHandle {
        self.next_handle += 1;
        StatementHandle(self.next_handle)
    }
}

/// Shared view of a mock database.
#[derive(Clone, Default)]
pub struct MockDb(Rc<RefCell<MockState>>);

impl MockDb {
    pub fn new() -> Self {
        let db = Self::default();
        db.set_rows(&["n"], vec![vec![SqlValue::Long(3)]]);
        db
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector(self.clone())
    }

    /// Next update fails with `err`.
    pub fn fail_next(&self, err: DbError) {
        self.0.borrow_mut().updates.push_back(Err(err));
    }

    /// Next update reports `rows` affected. Unscripted updates report 1.
    pub fn affect_next(&self, rows: u64) {
        self.0.borrow_mut().updates.push_back(Ok(rows));
    }

    /// Next commit fails with `err`.
    pub fn fail_next_commit(&self, err: DbError) {
        self.0.borrow_mut().commit_failure = Some(err);
    }

    /// Next attempt to turn auto-commit back on fails with `err`.
    pub fn fail_next_auto_commit_on(&self, err: DbError) {
        self.0.borrow_mut().auto_commit_on_failure = Some(err);
    }

    pub fn set_rows(&self, columns: &[&str], rows: Vec<Vec<SqlValue>>) {
        let mut state = self.0.borrow_mut();
        state.columns = columns.iter().map(|c| (*c).to_string()).collect();
        state.rows = rows;
    }

    pub fn add_procedure(&self, spec: ProcedureSpec) {
        self.0
            .borrow_mut()
            .procedures
            .insert(spec.name.to_lowercase(), spec);
    }

    pub fn log(&self) -> Vec<String> {
        self.0.borrow().log.clone()
    }

    /// SQL of every update statement, in order.
    pub fn updates(&self) -> Vec<String> {
        self.0
            .borrow()
            .log
            .iter()
            .filter_map(|entry| entry.strip_prefix("update ").map(str::to_string))
            .collect()
    }

    pub fn released(&self) -> Vec<u64> {
        self.0.borrow().released.clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.0.borrow().describe_calls
    }

    pub fn clear_log(&self) {
        self.0.borrow_mut().log.clear();
    }
}

pub struct MockConnector(MockDb);

impl Connector for MockConnector {
    type Connection = MockConnection;

    fn connect(&self) -> Result<MockConnection, DbError> {
        self.0 .0.borrow_mut().log.push("connect".to_string());
        Ok(MockConnection(self.0.clone()))
    }
}

pub struct MockConnection(MockDb);

impl MockConnection {
    fn record(&self, entry: String) {
        self.0 .0.borrow_mut().log.push(entry);
    }
}

impl Connection for MockConnection {
    fn execute_update(&mut self, sql: &str) -> Result<UpdateResult, DbError> {
        self.record(format!("update {sql}"));
        let mut state = self.0 .0.borrow_mut();
        let rows_affected = state.updates.pop_front().unwrap_or(Ok(1))?;
        Ok(UpdateResult {
            handle: state.handle(),
            rows_affected,
        })
    }

    fn execute_query(&mut self, sql: &str) -> Result<ResultSet, DbError> {
        self.record(format!("query {sql}"));
        let mut state = self.0 .0.borrow_mut();
        let handle = state.handle();
        Ok(ResultSet::new(handle, state.columns.clone(), state.rows.clone()))
    }

    fn release(&mut self, handle: StatementHandle) -> Result<(), DbError> {
        self.record(format!("release {}", handle.0));
        self.0 .0.borrow_mut().released.push(handle.0);
        Ok(())
    }

    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DbError> {
        self.record(format!("autocommit {}", if enabled { "on" } else { "off" }));
        if !enabled {
            return Ok(());
        }
        self.0 .0.borrow_mut().auto_commit_on_failure.take().map_or(Ok(()), Err)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.record("commit".to_string());
        self.0 .0.borrow_mut().commit_failure.take().map_or(Ok(()), Err)
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.record("rollback".to_string());
        Ok(())
    }

    fn describe_procedure(&mut self, name: &str) -> Result<Option<ProcedureSpec>, DbError> {
        self.record(format!("describe {name}"));
        let mut state = self.0 .0.borrow_mut();
        state.describe_calls += 1;
        Ok(state.procedures.get(&name.to_lowercase()).cloned())
    }

    fn call(
        &mut self,
        call_sql: &str,
        params: &[(usize, SqlValue)],
        has_return: bool,
    ) -> Result<CallResult, DbError> {
        let shown: Vec<String> = params
            .iter()
            .map(|(ordinal, value)| format!("{ordinal}={}", value.display()))
            .collect();
        self.record(format!("call {call_sql} [{}]", shown.join(", ")));
        let handle = self.0 .0.borrow_mut().handle();
        Ok(CallResult {
            handle,
            return_value: has_return.then_some(SqlValue::Int(0)),
            rows_affected: 0,
        })
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.record("close".to_string());
        Ok(())
    }
}

/// An open session over a fresh mock database.
pub fn open_session(engine: Engine) -> (Session<MockConnector>, MockDb) {
    let db = MockDb::new();
    let mut session = Session::new(engine, db.connector());
    session.open().expect("mock connect succeeds");
    db.clear_log();
    (session, db)
}
