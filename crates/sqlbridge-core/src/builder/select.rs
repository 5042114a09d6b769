//! SELECT statement builder.
//!
//! Clauses are accumulated by chaining and rendered for a dialect profile.
//! The builder is not consumed by rendering, so the same statement can be
//! rendered for several engines or executed again later.

use tracing::debug;

use super::clause::{render_where, ClauseSet, Join, JoinKind};
use crate::dialect::{DialectProfile, RowLimit};
use crate::error::{CoreError, Result};
use crate::filter;

/// A SELECT statement under construction.
///
/// # Example
///
/// ```rust
/// use sqlbridge_core::builder::Select;
/// use sqlbridge_core::dialect::Engine;
///
/// let select = Select::new()
///     .fields(&["id", "name"])
///     .table("users")
///     .where_clause("active = 1")
///     .order_by("name")
///     .limit(10);
///
/// assert_eq!(
///     select.render(Engine::MySql.profile()).unwrap(),
///     "SELECT id, `name` FROM users WHERE active = 1 ORDER BY name LIMIT 10"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    clauses: ClauseSet,
}

impl Select {
    /// Creates an empty SELECT builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field to the select list.
    #[must_use]
    pub fn field(mut self, name: &str) -> Self {
        self.clauses.fields.push(name.to_string());
        self
    }

    /// Adds several fields.
    #[must_use]
    pub fn fields(mut self, names: &[&str]) -> Self {
        self.clauses
            .fields
            .extend(names.iter().map(|s| (*s).to_string()));
        self
    }

    /// Adds a base table.
    #[must_use]
    pub fn table(mut self, name: &str) -> Self {
        self.clauses.tables.push(name.to_string());
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, kind: JoinKind, table: &str, on: &str) -> Self {
        self.clauses.joins.push(Join {
            table: table.to_string(),
            kind,
            on: on.to_string(),
        });
        self
    }

    /// Adds an INNER JOIN.
    #[must_use]
    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    /// Adds a LEFT JOIN.
    #[must_use]
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    /// Adds a RIGHT JOIN.
    #[must_use]
    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    /// Adds a WHERE predicate. Predicates are combined with AND.
    #[must_use]
    pub fn where_clause(mut self, predicate: &str) -> Self {
        self.clauses.wheres.push(predicate.to_string());
        self
    }

    /// Adds an ORDER BY term. A term already present (ignoring case) is
    /// not added again.
    #[must_use]
    pub fn order_by(mut self, term: &str) -> Self {
        self.clauses.push_order_by(term);
        self
    }

    /// Sets DISTINCT.
    #[must_use]
    pub const fn distinct(mut self, distinct: bool) -> Self {
        self.clauses.distinct = distinct;
        self
    }

    /// Renders the order-by terms as GROUP BY instead of ORDER BY.
    #[must_use]
    pub const fn group_by(mut self, group_by: bool) -> Self {
        self.clauses.group_by = group_by;
        self
    }

    /// Limits the number of returned rows. Zero removes the limit.
    #[must_use]
    pub const fn limit(mut self, rows: u64) -> Self {
        self.clauses.limit = if rows == 0 { None } else { Some(rows) };
        self
    }

    /// Adds the predicate produced by a numeric ad-hoc filter.
    ///
    /// A match-all filter (`*`) adds nothing.
    pub fn filter_numeric(self, field: &str, input: &str) -> Result<Self> {
        Ok(match filter::numeric_filter(field, input)? {
            Some(predicate) => self.where_clause(&predicate),
            None => self,
        })
    }

    /// Adds the predicate produced by a string ad-hoc filter.
    pub fn filter_string(self, field: &str, input: &str) -> Result<Self> {
        Ok(match filter::string_filter(field, input)? {
            Some(predicate) => self.where_clause(&predicate),
            None => self,
        })
    }

    /// Returns the accumulated clauses.
    #[must_use]
    pub const fn clauses(&self) -> &ClauseSet {
        &self.clauses
    }

    /// Renders the statement for a dialect.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedStatement`] when joins were added
    /// without any base table.
    pub fn render(&self, profile: &DialectProfile) -> Result<String> {
        let c = &self.clauses;
        self.check_joins()?;

        let mut sql = String::from("SELECT ");
        if c.distinct {
            sql.push_str("DISTINCT ");
        }
        let limit = c.limit;
        if let (Some(n), RowLimit::Top) = (limit, profile.row_limit) {
            sql.push_str(&format!("TOP {n} "));
        }

        sql.push_str(&render_fields(&c.fields, profile));

        if let Some(from) = c.render_from(profile) {
            sql.push_str(" FROM ");
            sql.push_str(&from);
        }

        let rownum = match (limit, profile.row_limit) {
            (Some(n), RowLimit::RowNum) => Some(format!("ROWNUM <= {n}")),
            _ => None,
        };
        if let Some(predicate) = render_where(&c.wheres, rownum.as_deref()) {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }

        if !c.order_by.is_empty() {
            sql.push_str(if c.group_by {
                " GROUP BY "
            } else {
                " ORDER BY "
            });
            sql.push_str(&c.order_by.join(", "));
        }

        match (limit, profile.row_limit) {
            (Some(n), RowLimit::Limit) => sql.push_str(&format!(" LIMIT {n}")),
            (Some(n), RowLimit::Unsupported) => {
                debug!(engine = %profile.engine, limit = n, "row limit not supported, ignoring");
            }
            _ => {}
        }

        Ok(sql)
    }

    /// Renders a `SELECT COUNT(*)` counting the rows [`Select::render`]
    /// would return.
    ///
    /// DISTINCT, grouped and row-limited selects are counted through a
    /// derived table; plain selects count over the same FROM and WHERE.
    ///
    /// # Errors
    ///
    /// Same as [`Select::render`].
    pub fn render_count(&self, profile: &DialectProfile) -> Result<String> {
        let c = &self.clauses;
        self.check_joins()?;

        let limited = c.limit.is_some() && profile.row_limit != RowLimit::Unsupported;
        if c.distinct || c.group_by || limited {
            // Grouping and row limits both depend on the order-by terms.
            let keep_order = c.group_by || limited;
            let inner = Self {
                clauses: ClauseSet {
                    order_by: if keep_order { c.order_by.clone() } else { vec![] },
                    ..c.clone()
                },
            };
            return Ok(format!(
                "SELECT COUNT(*) FROM ({}) counted",
                inner.render(profile)?
            ));
        }

        let mut sql = String::from("SELECT COUNT(*)");
        if let Some(from) = c.render_from(profile) {
            sql.push_str(" FROM ");
            sql.push_str(&from);
        }
        if let Some(predicate) = render_where(&c.wheres, None) {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        Ok(sql)
    }

    fn check_joins(&self) -> Result<()> {
        if self.clauses.tables.is_empty() && !self.clauses.joins.is_empty() {
            return Err(CoreError::malformed("joins require at least one base table"));
        }
        Ok(())
    }
}

/// The first field is emitted verbatim; the rest are escaped.
fn render_fields(fields: &[String], profile: &DialectProfile) -> String {
    fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if i == 0 {
                f.clone()
            } else {
                profile.escape_field(f)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
