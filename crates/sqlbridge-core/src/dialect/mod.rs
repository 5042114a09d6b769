//! SQL dialect support.
//!
//! Every supported engine is described by one immutable [`DialectProfile`]
//! in a lookup table keyed by [`Engine`]. A profile carries the syntax
//! conventions the builders need (identifier escaping, string and date
//! literals, row limiting, join nesting) and the error signatures used to
//! recognize duplicate-key failures.
//!
//! ```rust
//! use sqlbridge_core::dialect::{Engine, RowLimit};
//!
//! let profile = Engine::SqlServer.profile();
//! assert_eq!(profile.row_limit, RowLimit::Top);
//! assert_eq!(profile.escape_field("order date"), "[order date]");
//! ```

mod engines;

use std::fmt;
use std::str::FromStr;

use chrono::Timelike;
use serde::Deserialize;

use crate::error::{CoreError, DbError};
use crate::value::SqlValue;

/// Database engines with a known dialect profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Engine {
    /// Microsoft Access (Jet/ACE).
    Access,
    /// Microsoft SQL Server.
    SqlServer,
    /// Sybase ASE.
    Sybase,
    /// MySQL and MariaDB.
    MySql,
    /// PostgreSQL.
    PostgreSql,
    /// Oracle Database.
    Oracle,
    /// IBM Db2.
    Db2,
    /// SQLite.
    Sqlite,
    /// Plain ANSI SQL with no engine-specific behavior.
    Generic,
}

impl Engine {
    /// All engines, in lookup-table order.
    pub const ALL: [Self; 9] = [
        Self::Access,
        Self::SqlServer,
        Self::Sybase,
        Self::MySql,
        Self::PostgreSql,
        Self::Oracle,
        Self::Db2,
        Self::Sqlite,
        Self::Generic,
    ];

    /// Returns the dialect profile for this engine.
    #[must_use]
    pub fn profile(self) -> &'static DialectProfile {
        engines::profile(self)
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::SqlServer => "sqlserver",
            Self::Sybase => "sybase",
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
            Self::Oracle => "oracle",
            Self::Db2 => "db2",
            Self::Sqlite => "sqlite",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "access" | "msaccess" | "jet" => Ok(Self::Access),
            "sqlserver" | "sql-server" | "mssql" => Ok(Self::SqlServer),
            "sybase" | "ase" => Ok(Self::Sybase),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSql),
            "oracle" => Ok(Self::Oracle),
            "db2" => Ok(Self::Db2),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "generic" | "ansi" => Ok(Self::Generic),
            _ => Err(CoreError::UnknownEngine(s.to_string())),
        }
    }
}

impl TryFrom<String> for Engine {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How an engine limits the number of returned rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    /// `SELECT TOP n ...`
    Top,
    /// `... LIMIT n` after ORDER BY.
    Limit,
    /// `WHERE ... ROWNUM <= n`.
    RowNum,
    /// No row limiting; a requested limit is ignored.
    Unsupported,
}

/// How date and timestamp literals are written inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLiteral {
    /// `'2024-01-31'`
    Quoted,
    /// `#2024-01-31#`
    Hash,
    /// `DATE '2024-01-31'`, `TIMESTAMP '2024-01-31 10:00:00'`
    Keyword,
}

/// One (SQLSTATE, vendor code) pair identifying a duplicate-key failure.
///
/// A `None` side matches anything; a signature with both sides `None`
/// matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintSignature {
    /// Expected SQLSTATE.
    pub sql_state: Option<&'static str>,
    /// Expected vendor code.
    pub vendor_code: Option<i64>,
}

impl ConstraintSignature {
    /// Returns whether the error carries this signature.
    #[must_use]
    pub fn matches(&self, err: &DbError) -> bool {
        if self.sql_state.is_none() && self.vendor_code.is_none() {
            return false;
        }
        let state_ok = self
            .sql_state
            .is_none_or(|expected| err.sql_state.as_deref() == Some(expected));
        let code_ok = self
            .vendor_code
            .is_none_or(|expected| err.vendor_code == Some(expected));
        state_ok && code_ok
    }
}

/// Immutable syntax and error conventions of one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectProfile {
    /// Engine this profile describes.
    pub engine: Engine,
    /// Opening identifier delimiter (empty when identifiers are not escaped).
    pub left_escape: &'static str,
    /// Closing identifier delimiter.
    pub right_escape: &'static str,
    /// String literal delimiter.
    pub string_delimiter: char,
    /// Statement terminator appended by [`DialectProfile::terminate`].
    pub statement_terminator: &'static str,
    /// Row limiting style.
    pub row_limit: RowLimit,
    /// Whether joins are rendered as a nested-parenthesis chain.
    pub nested_joins: bool,
    /// Date literal style.
    pub date_literal: DateLiteral,
    /// Literals for `true` and `false`.
    pub bool_literals: (&'static str, &'static str),
    /// Error signatures that mean "duplicate primary key".
    pub duplicate_key: &'static [ConstraintSignature],
}

impl DialectProfile {
    /// Escapes a field or table name with the profile's delimiters.
    ///
    /// Each dot-separated part is wrapped separately. Names that already
    /// start with the left delimiter, function calls (anything containing
    /// `(`), and `*` parts are passed through.
    #[must_use]
    pub fn escape_field(&self, name: &str) -> String {
        if self.left_escape.is_empty() || name.starts_with(self.left_escape) || name.contains('(')
        {
            return name.to_string();
        }
        name.split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    format!("{}{part}{}", self.left_escape, self.right_escape)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a string with the profile's string delimiter, doubling any
    /// embedded delimiter.
    #[must_use]
    pub fn quote_string(&self, s: &str) -> String {
        let d = self.string_delimiter;
        let doubled: String = [d, d].iter().collect();
        format!("{d}{}{d}", s.replace(d, &doubled))
    }

    /// Renders a value as an inline SQL literal.
    #[must_use]
    pub fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => String::from("NULL"),
            SqlValue::Bool(b) => {
                let (t, f) = self.bool_literals;
                String::from(if *b { t } else { f })
            }
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Long(n) => n.to_string(),
            SqlValue::Float(x) => x.to_string(),
            SqlValue::Double(x) => x.to_string(),
            SqlValue::Text(s) => self.quote_string(s),
            SqlValue::Date(d) => self.date_literal("DATE", &d.format("%Y-%m-%d").to_string()),
            SqlValue::Timestamp(ts) => {
                let text = if ts.nanosecond() == 0 {
                    ts.format("%Y-%m-%d %H:%M:%S").to_string()
                } else {
                    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
                };
                self.date_literal("TIMESTAMP", &text)
            }
        }
    }

    fn date_literal(&self, keyword: &str, text: &str) -> String {
        match self.date_literal {
            DateLiteral::Quoted => self.quote_string(text),
            DateLiteral::Hash => format!("#{text}#"),
            DateLiteral::Keyword => format!("{keyword} {}", self.quote_string(text)),
        }
    }

    /// Appends the statement terminator.
    #[must_use]
    pub fn terminate(&self, sql: &str) -> String {
        format!("{sql}{}", self.statement_terminator)
    }

    /// Classifies an error as a duplicate-key violation.
    ///
    /// Returns `None` when the profile has no known signatures, so the
    /// error cannot be classified at all.
    #[must_use]
    pub fn is_duplicate_key(&self, err: &DbError) -> Option<bool> {
        if self.duplicate_key.is_empty() {
            return None;
        }
        Some(self.duplicate_key.iter().any(|sig| sig.matches(err)))
    }
}
