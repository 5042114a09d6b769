//! sqlbridge CLI
//!
//! Renders engine-specific SQL and runs statements and fallback writes
//! against SQLite databases.

use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use sqlbridge_core::{Engine, Select, SqlValue, WriteStatement};
use sqlbridge_session::{ResultSet, Session, SessionConfig, WriteMode};
use sqlbridge_sqlite::SqliteConnector;

/// Engine-agnostic SQL building and fallback writes.
#[derive(Parser)]
#[command(name = "sqlbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Seconds to wait for the database connection.
    #[arg(long)]
    login_timeout: Option<u64>,

    /// Reject writes.
    #[arg(long)]
    read_only: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL a SELECT renders to for an engine.
    Render {
        /// Target engine (access, sqlserver, sybase, mysql, postgresql,
        /// oracle, db2, sqlite, generic).
        #[arg(short, long, default_value = "generic")]
        engine: Engine,

        /// Table to select from (repeatable).
        #[arg(short, long, required = true)]
        table: Vec<String>,

        /// Field to select (repeatable).
        #[arg(short, long)]
        field: Vec<String>,

        /// WHERE predicate (repeatable).
        #[arg(short, long = "where")]
        predicate: Vec<String>,

        /// Numeric filter as `field=expression`, e.g. `qty=BETWEEN 1 AND 5`.
        #[arg(long)]
        numeric: Vec<String>,

        /// String filter as `field=expression`, e.g. `name=LIKE Sm*`.
        #[arg(long)]
        text: Vec<String>,

        /// ORDER BY term (repeatable).
        #[arg(short, long)]
        order_by: Vec<String>,

        /// Maximum number of rows.
        #[arg(short, long)]
        limit: Option<u64>,

        /// SELECT DISTINCT.
        #[arg(long)]
        distinct: bool,

        /// Render the --order-by terms as GROUP BY instead of ORDER BY.
        #[arg(long)]
        group_by: bool,

        /// Render the COUNT(*) form instead.
        #[arg(long)]
        count: bool,
    },

    /// Run a SQL statement. Query results are printed as JSON.
    Exec {
        /// SQL text.
        sql: String,
    },

    /// Write one row using a fallback write mode.
    Upsert {
        /// Target table.
        #[arg(short, long)]
        table: String,

        /// Column assignment as `column=value` (repeatable). `NULL`,
        /// numbers and `true`/`false` are typed; anything else is text.
        #[arg(short, long = "set", required = true)]
        assignments: Vec<String>,

        /// WHERE predicate used by the update (repeatable).
        #[arg(short, long = "where")]
        predicate: Vec<String>,

        /// insert, update, insert-update or update-insert.
        #[arg(short, long, default_value = "insert-update")]
        mode: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Render {
            engine,
            table,
            field,
            predicate,
            numeric,
            text,
            order_by,
            limit,
            distinct,
            group_by,
            count,
        } => {
            let mut select = Select::new().distinct(distinct).group_by(group_by);
            for name in &table {
                select = select.table(name);
            }
            for name in &field {
                select = select.field(name);
            }
            for p in &predicate {
                select = select.where_clause(p);
            }
            for filter in &numeric {
                let (name, expr) = split_assignment(filter)?;
                select = select.filter_numeric(name, expr)?;
            }
            for filter in &text {
                let (name, expr) = split_assignment(filter)?;
                select = select.filter_string(name, expr)?;
            }
            for term in &order_by {
                select = select.order_by(term);
            }
            if let Some(n) = limit {
                select = select.limit(n);
            }

            let profile = engine.profile();
            let sql = if count {
                select.render_count(profile)?
            } else {
                select.render(profile)?
            };
            println!("{}", profile.terminate(&sql));
        }

        Commands::Exec { sql } => {
            let mut session = open(&cli.database, cli.login_timeout, cli.read_only)?;
            if is_query(&sql) {
                let rows = session.query_sql(&sql)?;
                println!("{}", serde_json::to_string_pretty(&rows_to_json(&rows))?);
                session.release(rows)?;
            } else {
                let affected = session.execute_sql(&sql)?;
                info!("{affected} row(s) affected");
            }
            session.close()?;
        }

        Commands::Upsert {
            table,
            assignments,
            predicate,
            mode,
        } => {
            let mode: WriteMode = mode.parse()?;
            let mut write = WriteStatement::new().table(&table);
            for assignment in &assignments {
                let (column, value) = split_assignment(assignment)?;
                write = write.set(column, parse_value(value));
            }
            for p in &predicate {
                write = write.where_clause(p);
            }

            let mut session = open(&cli.database, cli.login_timeout, cli.read_only)?;
            let outcome = session.write(&write, mode)?;
            info!(
                "{:?} {} row(s) in {table} ({mode})",
                outcome.kind, outcome.rows_affected
            );
            session.close()?;
        }
    }

    Ok(())
}

fn open(
    url: &str,
    login_timeout: Option<u64>,
    read_only: bool,
) -> anyhow::Result<Session<SqliteConnector>> {
    let mut connector = SqliteConnector::new(url);
    if let Some(secs) = login_timeout {
        connector = connector.login_timeout(Duration::from_secs(secs));
    }
    let config = SessionConfig {
        engine: Engine::Sqlite,
        read_only,
    };
    let mut session = Session::with_config(config, connector);
    session
        .open()
        .with_context(|| format!("failed to open {url}"))?;
    debug!(url = %url, read_only, "Session ready");
    Ok(session)
}

fn split_assignment(text: &str) -> anyhow::Result<(&str, &str)> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("expected `name=value`, got `{text}`"),
    }
}

fn parse_value(text: &str) -> SqlValue {
    if text.eq_ignore_ascii_case("null") {
        SqlValue::Null
    } else if text.eq_ignore_ascii_case("true") {
        SqlValue::Bool(true)
    } else if text.eq_ignore_ascii_case("false") {
        SqlValue::Bool(false)
    } else if let Ok(n) = text.parse::<i64>() {
        SqlValue::Long(n)
    } else if let Some(f) = text.parse::<f64>().ok().filter(|f| f.is_finite()) {
        SqlValue::Double(f)
    } else {
        SqlValue::Text(text.to_string())
    }
}

fn is_query(sql: &str) -> bool {
    let first = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(first.as_str(), "SELECT" | "WITH" | "PRAGMA" | "VALUES")
}

fn rows_to_json(rows: &ResultSet) -> Value {
    let objects = rows
        .rows()
        .iter()
        .map(|row| {
            let object: Map<String, Value> = rows
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().map(json_value))
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(objects)
}

fn json_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => json!(b),
        SqlValue::Int(n) => json!(n),
        SqlValue::Long(n) => json!(n),
        SqlValue::Float(f) => json!(f),
        SqlValue::Double(f) => json!(f),
        SqlValue::Text(s) => json!(s),
        SqlValue::Date(d) => json!(d.format("%Y-%m-%d").to_string()),
        SqlValue::Timestamp(ts) => json!(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
    }
}
