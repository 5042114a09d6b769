#![allow(dead_code)]

use sqlbridge_core::{Engine, Select, SqlValue};
use sqlbridge_session::Session;
use sqlbridge_sqlite::SqliteConnector;

pub const CREATE_STATIONS: &str =
    "CREATE TABLE stations (code TEXT PRIMARY KEY, elev INTEGER, active INTEGER, note TEXT)";

/// An open session on a fresh in-memory database with a `stations` table.
pub fn memory_session() -> Session<SqliteConnector> {
    session_at("sqlite::memory:")
}

pub fn session_at(url: &str) -> Session<SqliteConnector> {
    let mut session = Session::new(Engine::Sqlite, SqliteConnector::new(url));
    session
        .open()
        .unwrap_or_else(|e| panic!("Failed to open {url}: {e}"));
    session
}

/// All rows of `stations` ordered by code.
pub fn stations(session: &mut Session<SqliteConnector>) -> Vec<Vec<SqlValue>> {
    let rows = session
        .select(
            &Select::new()
                .fields(&["code", "elev", "active", "note"])
                .table("stations")
                .order_by("code"),
        )
        .expect("select stations");
    let values = rows.rows().to_vec();
    session.release(rows).expect("release rows");
    values
}
