//! DELETE statement builder.

use super::clause::render_where;
use crate::error::{CoreError, Result};

/// A DELETE statement under construction.
///
/// ```rust
/// use sqlbridge_core::builder::Delete;
///
/// let delete = Delete::from_table("stations")
///     .where_clause("code = '01234'")
///     .where_clause("active = 0");
/// assert_eq!(
///     delete.render().unwrap(),
///     "DELETE FROM stations WHERE code = '01234' AND (active = 0)"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delete {
    table: String,
    wheres: Vec<String>,
}

impl Delete {
    /// Creates a DELETE for the given table.
    #[must_use]
    pub fn from_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            wheres: vec![],
        }
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn where_clause(mut self, predicate: &str) -> Self {
        self.wheres.push(predicate.to_string());
        self
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// [`CoreError::MalformedStatement`] when the table name is empty.
    pub fn render(&self) -> Result<String> {
        if self.table.trim().is_empty() {
            return Err(CoreError::malformed("no table"));
        }
        let mut sql = format!("DELETE FROM {}", self.table);
        if let Some(predicate) = render_where(&self.wheres, None) {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        Ok(sql)
    }
}
