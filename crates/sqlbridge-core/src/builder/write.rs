//! INSERT/UPDATE statement builder.
//!
//! A [`WriteStatement`] pairs fields with values and renders either an
//! INSERT or an UPDATE from the same data, which is what the fallback
//! write strategies rely on.

use super::clause::{render_where, ClauseSet};
use crate::bind::BindableStatement;
use crate::dialect::{DialectProfile, Engine};
use crate::error::{CoreError, Result};
use crate::value::{SqlValue, ToSqlValue};

/// An INSERT or UPDATE under construction.
///
/// # Example
///
/// ```rust
/// use sqlbridge_core::builder::WriteStatement;
/// use sqlbridge_core::dialect::Engine;
///
/// let write = WriteStatement::new()
///     .table("stations")
///     .set("code", "01234")
///     .set("active", true)
///     .where_clause("code = '01234'");
///
/// let pg = Engine::PostgreSql.profile();
/// assert_eq!(
///     write.to_insert_string(pg).unwrap(),
///     r#"INSERT INTO stations ("code", "active") VALUES ('01234', TRUE)"#
/// );
/// assert_eq!(
///     write.to_update_string(pg, false).unwrap(),
///     r#"UPDATE stations SET "code"='01234', "active"=TRUE WHERE code = '01234'"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteStatement {
    clauses: ClauseSet,
    values: Vec<SqlValue>,
}

impl WriteStatement {
    /// Creates an empty write statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target table.
    #[must_use]
    pub fn table(mut self, name: &str) -> Self {
        self.clauses.tables.push(name.to_string());
        self
    }

    /// Adds a field together with its value.
    #[must_use]
    pub fn set<V: ToSqlValue>(mut self, field: &str, value: V) -> Self {
        self.clauses.fields.push(field.to_string());
        self.values.push(value.to_sql_value());
        self
    }

    /// Adds a field without a value. Pair with [`WriteStatement::value`].
    #[must_use]
    pub fn field(mut self, name: &str) -> Self {
        self.clauses.fields.push(name.to_string());
        self
    }

    /// Appends a value for the next unpaired field.
    #[must_use]
    pub fn value<V: ToSqlValue>(mut self, value: V) -> Self {
        self.values.push(value.to_sql_value());
        self
    }

    /// Adds a WHERE predicate used by UPDATE.
    #[must_use]
    pub fn where_clause(mut self, predicate: &str) -> Self {
        self.clauses.wheres.push(predicate.to_string());
        self
    }

    /// Target table, if set.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.clauses.tables.first().map(String::as_str)
    }

    /// Fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.clauses.fields
    }

    /// Values in insertion order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// WHERE predicates added with [`WriteStatement::where_clause`].
    #[must_use]
    pub fn where_clauses(&self) -> &[String] {
        &self.clauses.wheres
    }

    /// Renders `INSERT INTO table (fields) VALUES (values)`.
    ///
    /// # Errors
    ///
    /// [`CoreError::MalformedStatement`] when the table or fields are
    /// missing, or the field and value counts differ.
    pub fn to_insert_string(&self, profile: &DialectProfile) -> Result<String> {
        let table = self.validate()?;
        let fields: Vec<String> = self
            .clauses
            .fields
            .iter()
            .map(|f| profile.escape_field(f))
            .collect();
        let values: Vec<String> = self.values.iter().map(|v| profile.literal(v)).collect();
        Ok(format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            fields.join(", "),
            values.join(", ")
        ))
    }

    /// Renders `UPDATE table SET field=value, ... [WHERE ...]`.
    ///
    /// With no WHERE predicates and `try_build_where_from_fields` set, a
    /// WHERE clause equating every field to its value is synthesized.
    ///
    /// # Errors
    ///
    /// Same as [`WriteStatement::to_insert_string`].
    pub fn to_update_string(
        &self,
        profile: &DialectProfile,
        try_build_where_from_fields: bool,
    ) -> Result<String> {
        let table = self.validate()?;
        let assignments: Vec<String> = self
            .pairs(profile)
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));

        let predicate = if self.clauses.wheres.is_empty() && try_build_where_from_fields {
            let synthesized: Vec<String> = self
                .pairs(profile)
                .zip(&self.values)
                .map(|((field, literal), value)| {
                    if value.is_null() {
                        format!("{field} IS NULL")
                    } else {
                        format!("{field}={literal}")
                    }
                })
                .collect();
            render_where(&synthesized, None)
        } else {
            render_where(&self.clauses.wheres, None)
        };
        if let Some(predicate) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        Ok(sql)
    }

    fn pairs<'a>(
        &'a self,
        profile: &'a DialectProfile,
    ) -> impl Iterator<Item = (String, String)> + 'a {
        self.clauses
            .fields
            .iter()
            .zip(&self.values)
            .map(move |(f, v)| (profile.escape_field(f), profile.literal(v)))
    }

    fn validate(&self) -> Result<&str> {
        let table = match self.clauses.tables.as_slice() {
            [] => return Err(CoreError::malformed("no table")),
            [table] => table.as_str(),
            _ => return Err(CoreError::malformed("write statements take exactly one table")),
        };
        if self.clauses.fields.is_empty() {
            return Err(CoreError::malformed("no fields"));
        }
        if self.clauses.fields.len() != self.values.len() {
            return Err(CoreError::malformed(format!(
                "{} fields but {} values",
                self.clauses.fields.len(),
                self.values.len()
            )));
        }
        Ok(table)
    }
}

impl BindableStatement for WriteStatement {
    fn add_value(&mut self, value: SqlValue) -> Result<usize> {
        self.values.push(value);
        Ok(self.values.len())
    }

    fn set_value(&mut self, value: SqlValue, position: usize) -> Result<()> {
        let last = self.values.len();
        match position.checked_sub(1).and_then(|i| self.values.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CoreError::OrdinalOutOfRange {
                ordinal: position,
                first: 1,
                last,
            }),
        }
    }

    fn describe(&self) -> String {
        self.to_insert_string(Engine::Generic.profile())
            .unwrap_or_else(|e| e.to_string())
    }
}
