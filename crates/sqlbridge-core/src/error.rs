//! Error types for statement building and parameter binding.

use std::fmt;

use thiserror::Error;

/// Errors raised while building statements or binding parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The statement is missing a required part (table, fields) or its
    /// field and value lists have different lengths.
    #[error("malformed statement: {0}")]
    MalformedStatement(String),

    /// A where-clause fragment could not be parsed into a parameter binding.
    #[error("cannot parse where clause '{predicate}': {reason}")]
    WhereClauseParse {
        /// The predicate as given by the caller.
        predicate: String,
        /// What went wrong.
        reason: String,
    },

    /// A parsed column does not name any declared procedure parameter.
    #[error(
        "parameter '{name}' not found in procedure '{procedure}' (known parameters: {})",
        .known.join(", ")
    )]
    ParameterLookup {
        /// Procedure being bound.
        procedure: String,
        /// Parameter name that was looked up (with the `@` prefix).
        name: String,
        /// Every declared parameter name, in ordinal order.
        known: Vec<String>,
    },

    /// The declared SQL type of a parameter has no binding rule.
    #[error("parameter '{name}' has unsupported SQL type {sql_type}")]
    UnsupportedParameterType {
        /// Parameter name.
        name: String,
        /// Declared type.
        sql_type: String,
    },

    /// An explicit ordinal is outside the bindable parameter range.
    #[error("ordinal {ordinal} is outside the bindable range {first}..={last}")]
    OrdinalOutOfRange {
        /// Requested ordinal.
        ordinal: usize,
        /// First bindable ordinal.
        first: usize,
        /// Last bindable ordinal.
        last: usize,
    },

    /// An ad-hoc filter expression was rejected.
    #[error("invalid filter for '{field}': {reason}")]
    InvalidFilter {
        /// Field the filter applies to.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An engine name did not match any known dialect.
    #[error("unknown database engine: {0}")]
    UnknownEngine(String),
}

impl CoreError {
    /// Creates a malformed-statement error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedStatement(reason.into())
    }

    pub(crate) fn where_parse(predicate: &str, reason: impl Into<String>) -> Self {
        Self::WhereClauseParse {
            predicate: predicate.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_filter(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// An error reported by the database driver.
///
/// Carries the SQLSTATE and vendor error code when the driver exposes them;
/// dialect profiles classify constraint violations from this pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    /// Five-character SQLSTATE, if reported.
    pub sql_state: Option<String>,
    /// Vendor-specific error code, if reported.
    pub vendor_code: Option<i64>,
    /// Driver message.
    pub message: String,
}

impl DbError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sql_state: None,
            vendor_code: None,
            message: message.into(),
        }
    }

    /// Sets the SQLSTATE.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.sql_state = Some(state.into());
        self
    }

    /// Sets the vendor error code.
    #[must_use]
    pub const fn with_code(mut self, code: i64) -> Self {
        self.vendor_code = Some(code);
        self
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (&self.sql_state, self.vendor_code) {
            (Some(state), Some(code)) => write!(f, " [SQLSTATE {state}, code {code}]"),
            (Some(state), None) => write!(f, " [SQLSTATE {state}]"),
            (None, Some(code)) => write!(f, " [code {code}]"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for DbError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_lookup_lists_known_names() {
        let err = CoreError::ParameterLookup {
            procedure: "GetStation".into(),
            name: "@Bogus".into(),
            known: vec!["@Station".into(), "@Flag".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("@Bogus"));
        assert!(msg.contains("@Station, @Flag"));
    }

    #[test]
    fn test_db_error_display() {
        let err = DbError::new("duplicate").with_state("23000").with_code(2627);
        assert_eq!(err.to_string(), "duplicate [SQLSTATE 23000, code 2627]");
        assert_eq!(DbError::new("boom").to_string(), "boom");
    }
}
