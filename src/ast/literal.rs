//! Literal values of the metamodel.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A literal leaf of the expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Literal {
    /// ISO-8601 text of a date/datetime literal; `None` for other variants.
    pub fn iso_date(&self) -> Option<String> {
        match self {
            Literal::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Literal::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            _ => None,
        }
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Integer(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_date() {
        let d = Literal::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(d.iso_date().unwrap(), "2024-01-15");

        let dt = Literal::DateTime(
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        );
        assert_eq!(dt.iso_date().unwrap(), "2024-01-15T10:30:00");

        assert_eq!(Literal::Integer(1).iso_date(), None);
    }
}
