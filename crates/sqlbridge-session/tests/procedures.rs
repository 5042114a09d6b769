//! Stored-procedure lookup and invocation through a session.

mod common;

use common::open_session;
use sqlbridge_core::{Engine, ProcedureSpec, SqlType, SqlValue};
use sqlbridge_session::{Outcome, Request, SessionError, TransactionStart};

fn station_report() -> ProcedureSpec {
    ProcedureSpec::new("StationReport")
        .returns(SqlType::Integer)
        .param("@Station", SqlType::Varchar, false)
        .param("@Flag", SqlType::Integer, true)
}

#[test]
fn procedure_spec_is_fetched_once() {
    let (mut session, db) = open_session(Engine::SqlServer);
    db.add_procedure(station_report());

    let first = session.procedure("StationReport").unwrap();
    let second = session.procedure("stationreport").unwrap();
    assert_eq!(first.spec(), second.spec());
    assert_eq!(db.describe_calls(), 1);
}

#[test]
fn unknown_procedure_is_reported() {
    let (mut session, _db) = open_session(Engine::SqlServer);
    assert!(matches!(
        session.procedure("nope"),
        Err(SessionError::ProcedureNotFound(name)) if name == "nope"
    ));
}

#[test]
fn call_passes_bound_parameters_to_driver() {
    let (mut session, db) = open_session(Engine::SqlServer);
    db.add_procedure(station_report());

    let mut call = session.procedure("StationReport").unwrap();
    call.bind_from_where_clause("Station = '01234'").unwrap();
    call.bind_from_where_clause("Flag IS NULL").unwrap();
    db.clear_log();

    let result = session.call(&call).unwrap();
    assert_eq!(result.return_value, Some(SqlValue::Int(0)));
    assert_eq!(
        db.log(),
        vec![
            "call {? = call StationReport (?, ?)} [2='01234', 3=NULL]".to_string(),
            format!("release {}", result.handle.0),
        ]
    );
}

#[test]
fn call_handles_wait_for_transaction_end() {
    let (mut session, db) = open_session(Engine::SqlServer);
    db.add_procedure(ProcedureSpec::new("Purge"));
    let call = session.procedure("Purge").unwrap();

    session.begin_transaction(TransactionStart::Commit).unwrap();
    let executed = session.execute(Request::Call(call)).unwrap();
    assert!(matches!(executed.outcome, Outcome::Called(_)));
    assert!(db.released().is_empty());

    session.commit().unwrap();
    assert_eq!(db.released().len(), 1);
}

#[test]
fn procedure_requires_open_session() {
    let (mut session, _db) = open_session(Engine::SqlServer);
    session.close().unwrap();
    assert!(matches!(
        session.procedure("anything"),
        Err(SessionError::NotConnected)
    ));
}
