//! Clause storage shared by the statement builders.

use std::fmt;

use crate::dialect::DialectProfile;

/// Kind of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER JOIN"),
            Self::Left => write!(f, "LEFT JOIN"),
            Self::Right => write!(f, "RIGHT JOIN"),
        }
    }
}

/// A joined table with its ON predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Joined table.
    pub table: String,
    /// Join kind.
    pub kind: JoinKind,
    /// ON predicate.
    pub on: String,
}

/// Ordered clause lists accumulated by a builder.
///
/// Every list keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseSet {
    pub(crate) fields: Vec<String>,
    pub(crate) tables: Vec<String>,
    pub(crate) joins: Vec<Join>,
    pub(crate) wheres: Vec<String>,
    pub(crate) order_by: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) group_by: bool,
    pub(crate) limit: Option<u64>,
}

impl ClauseSet {
    /// Adds an order-by term unless an equal term (ignoring case and
    /// surrounding whitespace) is already present.
    pub(crate) fn push_order_by(&mut self, term: &str) {
        let wanted = term.trim();
        let exists = self
            .order_by
            .iter()
            .any(|existing| existing.trim().eq_ignore_ascii_case(wanted));
        if !exists {
            self.order_by.push(wanted.to_string());
        }
    }

    /// Fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Base tables in insertion order.
    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Joins in insertion order.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Where predicates in insertion order.
    #[must_use]
    pub fn wheres(&self) -> &[String] {
        &self.wheres
    }

    /// Order-by (or group-by) terms in insertion order.
    #[must_use]
    pub fn order_by(&self) -> &[String] {
        &self.order_by
    }

    /// Renders the FROM list, or `None` when there are no tables.
    pub(crate) fn render_from(&self, profile: &DialectProfile) -> Option<String> {
        let (first, rest) = self.tables.split_first()?;
        if self.joins.is_empty() {
            return Some(self.tables.join(", "));
        }
        let mut from = String::new();
        if profile.nested_joins {
            let count = self.joins.len();
            from.push_str(&"(".repeat(count - 1));
            from.push_str(first);
            for (i, join) in self.joins.iter().enumerate() {
                from.push_str(&format!(" {} {} ON {}", join.kind, join.table, join.on));
                if i + 1 < count {
                    from.push(')');
                }
            }
            for table in rest {
                from.push_str(", ");
                from.push_str(table);
            }
        } else {
            from.push_str(&self.tables.join(", "));
            for join in &self.joins {
                from.push_str(&format!(" {} {} ON {}", join.kind, join.table, join.on));
            }
        }
        Some(from)
    }
}

/// Joins predicates as `p1 AND (p2) AND (p3)`, followed by an optional
/// trailing condition that is not parenthesized.
pub(crate) fn render_where(predicates: &[String], trailing: Option<&str>) -> Option<String> {
    let mut parts: Vec<String> = predicates
        .iter()
        .enumerate()
        .map(|(i, p)| if i == 0 { p.clone() } else { format!("({p})") })
        .collect();
    if let Some(extra) = trailing {
        parts.push(extra.to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}
