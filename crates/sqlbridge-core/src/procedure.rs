//! Stored-procedure parameter binding.
//!
//! A [`ProcedureSpec`] describes a procedure's declared parameters as
//! discovered from database metadata. A [`ProcedureCall`] binds values to
//! those parameters, either sequentially, by explicit ordinal, or by
//! parsing a where-clause fragment such as `Station = '01234'`.
//!
//! Ordinals are 1-based. When the procedure declares a return value,
//! ordinal 1 is the return slot and caller parameters start at 2.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sqlbridge_core::procedure::{ProcedureCall, ProcedureSpec, SqlType};
//! use sqlbridge_core::SqlValue;
//!
//! let spec = ProcedureSpec::new("GetReadings")
//!     .returns(SqlType::Integer)
//!     .param("@Station", SqlType::Varchar, false)
//!     .param("@Flag", SqlType::Integer, true);
//! assert_eq!(spec.call_string(), "{? = call GetReadings (?, ?)}");
//!
//! let mut call = ProcedureCall::new(Arc::new(spec));
//! assert_eq!(call.bind_from_where_clause("r.Station = '01234'").unwrap(), 2);
//! assert_eq!(call.bind_from_where_clause("Flag IS NULL").unwrap(), 3);
//! assert_eq!(call.debug_string(), "exec GetReadings '01234', NULL");
//! assert_eq!(call.bindings()[0], (2, SqlValue::Text("01234".into())));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::bind::BindableStatement;
use crate::error::{CoreError, Result};
use crate::value::SqlValue;

/// Declared SQL type of a procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    /// BIT / BOOLEAN
    Bit,
    /// TINYINT
    TinyInt,
    /// SMALLINT
    SmallInt,
    /// INTEGER
    Integer,
    /// BIGINT
    BigInt,
    /// REAL
    Real,
    /// FLOAT
    Float,
    /// DOUBLE
    Double,
    /// NUMERIC
    Numeric,
    /// DECIMAL
    Decimal,
    /// CHAR
    Char,
    /// VARCHAR
    Varchar,
    /// LONGVARCHAR / TEXT
    LongVarchar,
    /// DATE
    Date,
    /// TIME
    Time,
    /// TIMESTAMP / DATETIME
    Timestamp,
    /// BINARY / VARBINARY
    Binary,
    /// Any other driver-reported type name.
    Other(String),
}

impl SqlType {
    /// Maps a driver type name (case-insensitive) to a type.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "BIT" | "BOOLEAN" => Self::Bit,
            "TINYINT" => Self::TinyInt,
            "SMALLINT" => Self::SmallInt,
            "INT" | "INTEGER" => Self::Integer,
            "BIGINT" => Self::BigInt,
            "REAL" => Self::Real,
            "FLOAT" => Self::Float,
            "DOUBLE" | "DOUBLE PRECISION" => Self::Double,
            "NUMERIC" => Self::Numeric,
            "DECIMAL" | "MONEY" => Self::Decimal,
            "CHAR" | "NCHAR" => Self::Char,
            "VARCHAR" | "NVARCHAR" | "VARCHAR2" => Self::Varchar,
            "LONGVARCHAR" | "TEXT" | "NTEXT" => Self::LongVarchar,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" | "SMALLDATETIME" => Self::Timestamp,
            "BINARY" | "VARBINARY" => Self::Binary,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bit => "BIT",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Real => "REAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Numeric => "NUMERIC",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::LongVarchar => "LONGVARCHAR",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Binary => "BINARY",
            Self::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// A declared procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureParam {
    /// Parameter name as reported by the driver, e.g. `@Station`.
    pub name: String,
    /// Declared SQL type.
    pub sql_type: SqlType,
    /// Whether the parameter accepts NULL.
    pub nullable: bool,
}

/// A procedure signature discovered from database metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSpec {
    /// Procedure name.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<ProcedureParam>,
    /// Return type, when the procedure declares a return value.
    pub return_type: Option<SqlType>,
}

impl ProcedureSpec {
    /// Creates a signature with no parameters and no return value.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: vec![],
            return_type: None,
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, name: &str, sql_type: SqlType, nullable: bool) -> Self {
        self.params.push(ProcedureParam {
            name: name.to_string(),
            sql_type,
            nullable,
        });
        self
    }

    /// Declares a return value.
    #[must_use]
    pub fn returns(mut self, sql_type: SqlType) -> Self {
        self.return_type = Some(sql_type);
        self
    }

    /// Whether ordinal 1 is reserved for a return value.
    #[must_use]
    pub const fn has_return_value(&self) -> bool {
        self.return_type.is_some()
    }

    /// Ordinal of the first caller-supplied parameter.
    #[must_use]
    pub const fn first_param_ordinal(&self) -> usize {
        if self.has_return_value() {
            2
        } else {
            1
        }
    }

    /// Ordinal of the last caller-supplied parameter.
    ///
    /// Smaller than [`ProcedureSpec::first_param_ordinal`] when the
    /// procedure takes no parameters.
    #[must_use]
    pub fn last_param_ordinal(&self) -> usize {
        self.first_param_ordinal() + self.params.len() - 1
    }

    /// The callable-statement string, e.g. `{? = call name (?, ?)}`.
    #[must_use]
    pub fn call_string(&self) -> String {
        let placeholders = vec!["?"; self.params.len()].join(", ");
        let ret = if self.has_return_value() { "? = " } else { "" };
        format!("{{{ret}call {} ({placeholders})}}", self.name)
    }

    /// Declared parameter names in ordinal order.
    #[must_use]
    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Finds a parameter by name, ignoring case, and returns its ordinal.
    #[must_use]
    pub fn find_param(&self, name: &str) -> Option<(usize, &ProcedureParam)> {
        self.params
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
            .map(|idx| (self.first_param_ordinal() + idx, &self.params[idx]))
    }

    fn param_at(&self, ordinal: usize) -> Option<&ProcedureParam> {
        ordinal
            .checked_sub(self.first_param_ordinal())
            .and_then(|idx| self.params.get(idx))
    }
}

/// One invocation of a stored procedure with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    spec: Arc<ProcedureSpec>,
    bound: BTreeMap<usize, SqlValue>,
    // Literal form of each parameter, used only by `debug_string`.
    shown: Vec<String>,
    cursor: usize,
}

impl ProcedureCall {
    /// Creates a call with nothing bound.
    #[must_use]
    pub fn new(spec: Arc<ProcedureSpec>) -> Self {
        let shown = vec![String::from("?"); spec.params.len()];
        let cursor = spec.first_param_ordinal();
        Self {
            spec,
            bound: BTreeMap::new(),
            shown,
            cursor,
        }
    }

    /// The procedure signature.
    #[must_use]
    pub fn spec(&self) -> &ProcedureSpec {
        &self.spec
    }

    /// Bound parameters as `(ordinal, value)`, in ordinal order.
    #[must_use]
    pub fn bindings(&self) -> Vec<(usize, SqlValue)> {
        self.bound.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    /// Names of declared parameters that have no value yet.
    #[must_use]
    pub fn unbound(&self) -> Vec<&str> {
        let first = self.spec.first_param_ordinal();
        self.spec
            .params
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.bound.contains_key(&(first + idx)))
            .map(|(_, p)| p.name.as_str())
            .collect()
    }

    /// `exec name p1, p2, ...` with `?` for unbound parameters.
    #[must_use]
    pub fn debug_string(&self) -> String {
        if self.shown.is_empty() {
            format!("exec {}", self.spec.name)
        } else {
            format!("exec {} {}", self.spec.name, self.shown.join(", "))
        }
    }

    /// Binds a value at an explicit ordinal.
    ///
    /// # Errors
    ///
    /// [`CoreError::OrdinalOutOfRange`] for the return slot or an ordinal
    /// past the last parameter.
    pub fn set_value(&mut self, value: SqlValue, ordinal: usize) -> Result<()> {
        if self.spec.param_at(ordinal).is_none() {
            return Err(CoreError::OrdinalOutOfRange {
                ordinal,
                first: self.spec.first_param_ordinal(),
                last: self.spec.last_param_ordinal(),
            });
        }
        self.shown[ordinal - self.spec.first_param_ordinal()] = value.display();
        self.bound.insert(ordinal, value);
        Ok(())
    }

    /// Binds a value at the next sequential ordinal and returns it.
    ///
    /// # Errors
    ///
    /// [`CoreError::OrdinalOutOfRange`] once every parameter is bound.
    pub fn add_value(&mut self, value: SqlValue) -> Result<usize> {
        let ordinal = self.cursor;
        self.set_value(value, ordinal)?;
        self.cursor += 1;
        Ok(ordinal)
    }

    /// Parses `column = value`, `column LIKE value` or `column IS NULL`
    /// and binds the value to the parameter named `@column`.
    ///
    /// Returns the ordinal that was bound.
    ///
    /// # Errors
    ///
    /// - [`CoreError::WhereClauseParse`] when no operator is recognized or
    ///   the value does not parse as the parameter's type.
    /// - [`CoreError::ParameterLookup`] when no parameter has that name.
    /// - [`CoreError::UnsupportedParameterType`] when the parameter's type
    ///   has no binding rule.
    pub fn bind_from_where_clause(&mut self, predicate: &str) -> Result<usize> {
        let (column, raw) = split_predicate(predicate)?;
        let name = parameter_name(&column);
        if name.len() < 2 {
            return Err(CoreError::where_parse(predicate, "missing column name"));
        }

        let Some((ordinal, param)) = self.spec.find_param(&name) else {
            return Err(CoreError::ParameterLookup {
                procedure: self.spec.name.clone(),
                name,
                known: self.spec.param_names(),
            });
        };
        let value = match raw {
            Some(text) => convert(predicate, param, &text)?,
            None => SqlValue::Null,
        };
        self.set_value(value, ordinal)?;
        Ok(ordinal)
    }
}

impl BindableStatement for ProcedureCall {
    fn add_value(&mut self, value: SqlValue) -> Result<usize> {
        Self::add_value(self, value)
    }

    fn set_value(&mut self, value: SqlValue, position: usize) -> Result<()> {
        Self::set_value(self, value, position)
    }

    fn describe(&self) -> String {
        self.debug_string()
    }
}

// A column, optionally qualified, each part bare or delimited.
static COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    let part = r#"(?:\[[^\]]*\]|"[^"]*"|`[^`]*`|[\w@$#]+)"#;
    Regex::new(&format!(r"(?s)^\s*({part}(?:\.{part})*)\s*(.*)$"))
        .expect("column pattern is valid")
});

static LIKE_OP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^like\s+(.*)$").expect("LIKE pattern is valid"));

static IS_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^is\s+null\s*$").expect("IS NULL pattern is valid"));

/// Splits a predicate into its column and raw value; `None` means IS NULL.
///
/// The operator must directly follow the column, so `=` inside a LIKE
/// pattern and compound operators such as `>=` are not mistaken for it.
fn split_predicate(predicate: &str) -> Result<(String, Option<String>)> {
    let Some(caps) = COLUMN.captures(predicate) else {
        return Err(CoreError::where_parse(predicate, "missing column name"));
    };
    let column = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let rest = caps.get(2).map_or("", |m| m.as_str()).trim_end();

    let value = if let Some(value) = rest.strip_prefix('=') {
        value
    } else if let Some(like) = LIKE_OP.captures(rest) {
        like.get(1).map_or("", |m| m.as_str())
    } else if IS_NULL.is_match(rest) {
        return Ok((column, None));
    } else {
        return Err(CoreError::where_parse(
            predicate,
            "expected '=', LIKE or IS NULL after the column",
        ));
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::where_parse(predicate, "missing value"));
    }
    if value.eq_ignore_ascii_case("null") {
        return Ok((column, None));
    }
    Ok((column, Some(value.to_string())))
}

/// `tbl.[Station]` becomes `@Station`.
fn parameter_name(column: &str) -> String {
    let bare = column.rsplit('.').next().unwrap_or(column).trim();
    let bare = bare.trim_matches(|c| matches!(c, '[' | ']' | '"' | '`'));
    if bare.starts_with('@') {
        bare.to_string()
    } else {
        format!("@{bare}")
    }
}

fn convert(predicate: &str, param: &ProcedureParam, raw: &str) -> Result<SqlValue> {
    let bad = |what: &str| CoreError::where_parse(predicate, format!("'{raw}' is not a valid {what}"));
    match param.sql_type {
        SqlType::Char | SqlType::Varchar | SqlType::LongVarchar => Ok(SqlValue::Text(unquote(raw))),
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer => unquote(raw)
            .parse()
            .map(SqlValue::Int)
            .map_err(|_| bad("integer")),
        SqlType::BigInt => unquote(raw)
            .parse()
            .map(SqlValue::Long)
            .map_err(|_| bad("integer")),
        SqlType::Real => unquote(raw)
            .parse()
            .map(SqlValue::Float)
            .map_err(|_| bad("number")),
        SqlType::Float | SqlType::Double | SqlType::Numeric | SqlType::Decimal => unquote(raw)
            .parse()
            .map(SqlValue::Double)
            .map_err(|_| bad("number")),
        SqlType::Date => parse_date(&undelimit(raw))
            .map(SqlValue::Date)
            .ok_or_else(|| bad("date")),
        SqlType::Timestamp => parse_timestamp(&undelimit(raw))
            .map(SqlValue::Timestamp)
            .ok_or_else(|| bad("timestamp")),
        _ => Err(CoreError::UnsupportedParameterType {
            name: param.name.clone(),
            sql_type: param.sql_type.to_string(),
        }),
    }
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    match raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

/// Strips `'...'` or Access-style `#...#` delimiters.
fn undelimit(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_prefix('#').and_then(|rest| rest.strip_suffix('#')) {
        Some(inner) => inner.trim().to_string(),
        None => unquote(raw).trim().to_string(),
    }
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(with_return: bool) -> Arc<ProcedureSpec> {
        let mut spec = ProcedureSpec::new("GetReadings")
            .param("@Station", SqlType::Varchar, false)
            .param("@Flag", SqlType::Integer, true)
            .param("@Since", SqlType::Date, true)
            .param("@Count", SqlType::BigInt, true)
            .param("@Blob", SqlType::Binary, true);
        if with_return {
            spec = spec.returns(SqlType::Integer);
        }
        Arc::new(spec)
    }

    #[test]
    fn test_call_string() {
        assert_eq!(
            readings(true).call_string(),
            "{? = call GetReadings (?, ?, ?, ?, ?)}"
        );
        assert_eq!(
            readings(false).call_string(),
            "{call GetReadings (?, ?, ?, ?, ?)}"
        );
        assert_eq!(ProcedureSpec::new("Ping").call_string(), "{call Ping ()}");
    }

    #[test]
    fn test_sequential_ordinals_with_return_value() {
        let mut call = ProcedureCall::new(readings(true));
        for n in 1..=5 {
            assert_eq!(call.add_value(SqlValue::Int(1)).unwrap(), n + 1);
        }
        assert!(matches!(
            call.add_value(SqlValue::Null),
            Err(CoreError::OrdinalOutOfRange { ordinal: 7, .. })
        ));
    }

    #[test]
    fn test_sequential_ordinals_without_return_value() {
        let mut call = ProcedureCall::new(readings(false));
        for n in 1..=5 {
            assert_eq!(call.add_value(SqlValue::Int(1)).unwrap(), n);
        }
    }

    #[test]
    fn test_return_slot_is_not_bindable() {
        let mut call = ProcedureCall::new(readings(true));
        assert!(matches!(
            call.set_value(SqlValue::Int(1), 1),
            Err(CoreError::OrdinalOutOfRange {
                first: 2,
                last: 6,
                ..
            })
        ));
        call.set_value(SqlValue::Int(9), 3).unwrap();
        assert_eq!(call.bindings(), vec![(3, SqlValue::Int(9))]);
    }

    #[test]
    fn test_bind_string_from_where() {
        let mut call = ProcedureCall::new(readings(false));
        let ordinal = call.bind_from_where_clause("Station = '01234'").unwrap();
        assert_eq!(ordinal, 1);
        assert_eq!(call.bindings(), vec![(1, SqlValue::Text("01234".into()))]);
    }

    #[test]
    fn test_bind_is_case_insensitive_and_strips_qualifier() {
        let mut call = ProcedureCall::new(readings(true));
        assert_eq!(call.bind_from_where_clause("r.[station] = 'x'").unwrap(), 2);
        assert_eq!(call.bind_from_where_clause("flag is null").unwrap(), 3);
        assert_eq!(
            call.bindings(),
            vec![(2, SqlValue::Text("x".into())), (3, SqlValue::Null)]
        );
    }

    #[test]
    fn test_bind_like_and_numbers() {
        let mut call = ProcedureCall::new(readings(false));
        call.bind_from_where_clause("Station LIKE 'AB%'").unwrap();
        call.bind_from_where_clause("Flag = 3").unwrap();
        call.bind_from_where_clause("Count = '9000000000'").unwrap();
        call.bind_from_where_clause("Since = #2024-01-31#").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            call.bindings(),
            vec![
                (1, SqlValue::Text("AB%".into())),
                (2, SqlValue::Int(3)),
                (3, SqlValue::Date(date)),
                (4, SqlValue::Long(9_000_000_000)),
            ]
        );
        assert_eq!(
            call.debug_string(),
            "exec GetReadings 'AB%', 3, '2024-01-31', 9000000000, ?"
        );
        assert_eq!(call.unbound(), vec!["@Blob"]);
    }

    #[test]
    fn test_bind_errors_are_distinguishable() {
        let mut call = ProcedureCall::new(readings(false));
        assert!(matches!(
            call.bind_from_where_clause("Station > 4"),
            Err(CoreError::WhereClauseParse { .. })
        ));
        match call.bind_from_where_clause("Bogus = 1") {
            Err(CoreError::ParameterLookup { name, known, .. }) => {
                assert_eq!(name, "@Bogus");
                assert_eq!(known, readings(false).param_names());
            }
            other => panic!("expected lookup failure, got {other:?}"),
        }
        assert!(matches!(
            call.bind_from_where_clause("Blob = 'ff'"),
            Err(CoreError::UnsupportedParameterType { .. })
        ));
        assert!(matches!(
            call.bind_from_where_clause("Flag = abc"),
            Err(CoreError::WhereClauseParse { .. })
        ));
    }

    #[test]
    fn test_like_value_may_contain_equals() {
        let mut call = ProcedureCall::new(readings(false));
        assert_eq!(call.bind_from_where_clause("Station LIKE 'a=b%'").unwrap(), 1);
        assert_eq!(call.bindings()[0].1, SqlValue::Text("a=b%".into()));
    }

    #[test]
    fn test_compound_operators_are_parse_errors() {
        let mut call = ProcedureCall::new(readings(false));
        for predicate in ["Flag >= 3", "Flag <= 3", "Flag != 3", "Flag <> 3"] {
            assert!(
                matches!(
                    call.bind_from_where_clause(predicate),
                    Err(CoreError::WhereClauseParse { .. })
                ),
                "{predicate}"
            );
        }
        assert!(call.bindings().is_empty());
    }

    #[test]
    fn test_unquote_doubled_quotes() {
        let mut call = ProcedureCall::new(readings(false));
        call.bind_from_where_clause("Station = 'O''Brien'").unwrap();
        assert_eq!(call.bindings()[0].1, SqlValue::Text("O'Brien".into()));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-31 10:15:00").is_some());
        assert!(parse_timestamp("2024-01-31T10:15:00.250").is_some());
        assert_eq!(
            parse_timestamp("2024-01-31"),
            NaiveDate::from_ymd_opt(2024, 1, 31).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
    }

    #[test]
    fn test_sql_type_from_name() {
        assert_eq!(SqlType::from_name("nvarchar"), SqlType::Varchar);
        assert_eq!(SqlType::from_name("datetime"), SqlType::Timestamp);
        assert_eq!(
            SqlType::from_name("geometry"),
            SqlType::Other("GEOMETRY".into())
        );
    }
}
