//! Comparison operators and predicate clauses.

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator applied between an attribute and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
}

impl Operator {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_lowercase().as_str() {
            "=" | "==" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "like" => Ok(Self::Like),
            "not like" => Ok(Self::NotLike),
            _ => Err(Error::invalid_format(
                "operator",
                format!("unknown comparison operator {s:?}"),
            )),
        }
    }
}

/// How a clause joins the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

impl Connector {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Which variant rows a translation predicate inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleScope {
    /// Only rows of this locale.
    Locale(String),
    /// Rows of any locale.
    Any,
}

/// A single filter on base records.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compare a base column.
    Column {
        /// Base column name.
        column: String,
        /// Comparison operator.
        op: Operator,
        /// Right-hand value.
        value: Value,
    },
    /// Require a variant row whose attribute satisfies the comparison.
    Translation {
        /// Translatable attribute name.
        attribute: String,
        /// Comparison operator.
        op: Operator,
        /// Right-hand value.
        value: Value,
        /// Locale filter on the variant rows.
        scope: LocaleScope,
    },
    /// Require (or forbid) any variant row in a locale.
    HasLocale {
        /// Locale code.
        locale: String,
        /// Whether the row must be absent.
        negated: bool,
    },
}

/// A predicate plus the connector joining it to the previous clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Connector to the preceding clauses (ignored for the first).
    pub connector: Connector,
    /// The filter itself.
    pub predicate: Predicate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("=", Operator::Eq)]
    #[test_case("==", Operator::Eq)]
    #[test_case("<>", Operator::Ne)]
    #[test_case("!=", Operator::Ne)]
    #[test_case("<", Operator::Lt)]
    #[test_case("<=", Operator::Le)]
    #[test_case(">", Operator::Gt)]
    #[test_case(">=", Operator::Ge)]
    #[test_case("LIKE", Operator::Like)]
    #[test_case("not   like", Operator::NotLike)]
    fn test_parse_operator(token: &str, expected: Operator) {
        assert_eq!(token.parse::<Operator>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_operator() {
        let err = "~=".parse::<Operator>().unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_operator_display_parses_back() {
        for op in [Operator::Eq, Operator::Ge, Operator::NotLike] {
            assert_eq!(op.to_string().parse::<Operator>().unwrap(), op);
        }
    }
}
