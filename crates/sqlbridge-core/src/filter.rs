//! Ad-hoc filter grammar.
//!
//! Turns short user-typed filter expressions into WHERE predicates for a
//! single field. Numeric filters accept:
//!
//! - `BETWEEN a AND b`
//! - a bare value (compared with `=`)
//! - a leading `=`, `<>`, `<`, `<=`, `>`, `>=`
//! - `is null`, `is not null`
//! - `*`, which matches everything and produces no predicate
//!
//! String filters accept `LIKE x`, `= x`, bare values, the null checks and
//! `*`. `*` is translated to the SQL `%` wildcard and embedded single
//! quotes are rejected.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, Result};

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^between\s+(\S+)\s+and\s+(\S+)$").expect("BETWEEN pattern is valid")
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(<=|>=|<>|=|<|>)\s*(.*)$").expect("comparison pattern is valid")
});

static NULL_CHECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^is\s+(not\s+)?null$").expect("null check pattern is valid")
});

static LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^like\s+(.+)$").expect("LIKE pattern is valid"));

/// Builds a predicate from a numeric filter expression.
///
/// Returns `Ok(None)` for match-all (`*`) and blank input.
///
/// # Errors
///
/// [`CoreError::InvalidFilter`] when a bound is not a number.
///
/// ```rust
/// use sqlbridge_core::filter::numeric_filter;
///
/// assert_eq!(
///     numeric_filter("qty", "<= 5").unwrap().as_deref(),
///     Some("qty <= 5")
/// );
/// assert!(numeric_filter("qty", "<= five").is_err());
/// ```
pub fn numeric_filter(field: &str, input: &str) -> Result<Option<String>> {
    let input = input.trim();
    if input.is_empty() || input == "*" {
        return Ok(None);
    }
    if let Some(predicate) = null_check(field, input) {
        return Ok(Some(predicate));
    }
    if let Some(caps) = BETWEEN.captures(input) {
        let low = number(field, &caps[1])?;
        let high = number(field, &caps[2])?;
        return Ok(Some(format!("{field} BETWEEN {low} AND {high}")));
    }
    if let Some(caps) = COMPARISON.captures(input) {
        let value = number(field, caps[2].trim())?;
        return Ok(Some(format!("{field} {} {value}", &caps[1])));
    }
    let value = number(field, input)?;
    Ok(Some(format!("{field} = {value}")))
}

/// Builds a predicate from a string filter expression.
///
/// Returns `Ok(None)` for match-all (`*`) and blank input.
///
/// # Errors
///
/// [`CoreError::InvalidFilter`] when the input contains a single quote or
/// an empty comparison value.
pub fn string_filter(field: &str, input: &str) -> Result<Option<String>> {
    let input = input.trim();
    if input.contains('\'') {
        return Err(CoreError::invalid_filter(field, "single quotes are not allowed"));
    }
    if input.is_empty() || input == "*" {
        return Ok(None);
    }
    if let Some(predicate) = null_check(field, input) {
        return Ok(Some(predicate));
    }
    if let Some(caps) = LIKE.captures(input) {
        let pattern = wildcards(caps[1].trim());
        return Ok(Some(format!("{field} LIKE '{pattern}'")));
    }
    if let Some(rest) = input.strip_prefix('=') {
        let value = rest.trim();
        if value.is_empty() {
            return Err(CoreError::invalid_filter(field, "missing value after '='"));
        }
        return Ok(Some(format!("{field} = '{value}'")));
    }
    let value = wildcards(input);
    if value.contains('%') {
        Ok(Some(format!("{field} LIKE '{value}'")))
    } else {
        Ok(Some(format!("{field} = '{value}'")))
    }
}

fn null_check(field: &str, input: &str) -> Option<String> {
    NULL_CHECK.captures(input).map(|caps| {
        if caps.get(1).is_some() {
            format!("{field} IS NOT NULL")
        } else {
            format!("{field} IS NULL")
        }
    })
}

fn number<'a>(field: &str, text: &'a str) -> Result<&'a str> {
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(text),
        _ => Err(CoreError::invalid_filter(
            field,
            format!("'{text}' is not a number"),
        )),
    }
}

fn wildcards(text: &str) -> String {
    text.replace('*', "%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_between() {
        assert_eq!(
            numeric_filter("qty", "BETWEEN 10 AND 20").unwrap().unwrap(),
            "qty BETWEEN 10 AND 20"
        );
        assert_eq!(
            numeric_filter("qty", "between 1.5 and 2").unwrap().unwrap(),
            "qty BETWEEN 1.5 AND 2"
        );
    }

    #[test]
    fn test_numeric_operators() {
        assert_eq!(numeric_filter("qty", "<= 5").unwrap().unwrap(), "qty <= 5");
        assert_eq!(numeric_filter("qty", ">=5").unwrap().unwrap(), "qty >= 5");
        assert_eq!(numeric_filter("qty", "<3").unwrap().unwrap(), "qty < 3");
        assert_eq!(numeric_filter("qty", "> -1").unwrap().unwrap(), "qty > -1");
        assert_eq!(numeric_filter("qty", "= 4").unwrap().unwrap(), "qty = 4");
        assert_eq!(numeric_filter("qty", "<> 4").unwrap().unwrap(), "qty <> 4");
        assert_eq!(numeric_filter("qty", "42").unwrap().unwrap(), "qty = 42");
    }

    #[test]
    fn test_numeric_nulls_and_match_all() {
        assert_eq!(
            numeric_filter("qty", "is null").unwrap().unwrap(),
            "qty IS NULL"
        );
        assert_eq!(
            numeric_filter("qty", "IS NOT NULL").unwrap().unwrap(),
            "qty IS NOT NULL"
        );
        assert!(numeric_filter("qty", "*").unwrap().is_none());
        assert!(numeric_filter("qty", "  ").unwrap().is_none());
    }

    #[test]
    fn test_numeric_rejects_non_numbers() {
        assert!(matches!(
            numeric_filter("qty", "BETWEEN 10 AND x"),
            Err(CoreError::InvalidFilter { .. })
        ));
        assert!(numeric_filter("qty", "<= abc").is_err());
        assert!(numeric_filter("qty", "1; DROP TABLE t").is_err());
        assert!(numeric_filter("qty", "NaN").is_err());
    }

    #[test]
    fn test_string_filters() {
        assert_eq!(
            string_filter("name", "LIKE Sm*").unwrap().unwrap(),
            "name LIKE 'Sm%'"
        );
        assert_eq!(
            string_filter("name", "= Smith").unwrap().unwrap(),
            "name = 'Smith'"
        );
        assert_eq!(
            string_filter("name", "Smith").unwrap().unwrap(),
            "name = 'Smith'"
        );
        assert_eq!(
            string_filter("name", "*mit%").unwrap().unwrap(),
            "name LIKE '%mit%'"
        );
        assert_eq!(
            string_filter("name", "is null").unwrap().unwrap(),
            "name IS NULL"
        );
        assert!(string_filter("name", "*").unwrap().is_none());
    }

    #[test]
    fn test_string_rejects_quotes() {
        assert!(matches!(
            string_filter("name", "O'Brien"),
            Err(CoreError::InvalidFilter { .. })
        ));
        assert!(string_filter("name", "=").is_err());
    }
}
