//! Error types for relq.

use thiserror::Error;

/// Crate-level error taxonomy. Errors are raised eagerly at the point of
/// lowering, appending, or rendering; none of them are retryable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelqError {
    /// Table lookup miss against the bound database.
    #[error("Table '{table}' not found{}", suggestion_suffix(.suggestion))]
    TableNotFound {
        table: String,
        suggestion: Option<String>,
    },

    /// Column lookup miss against the current table snapshot.
    #[error("Column '{column}' not found in table '{table}'{}", suggestion_suffix(.suggestion))]
    ColumnNotFound {
        table: String,
        column: String,
        suggestion: Option<String>,
    },

    /// A column with this name already exists on the table snapshot.
    #[error("Column '{column}' already exists in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// The outer lambda has the wrong number of parameters for the operation.
    #[error("Lambda must have exactly {expected} parameter(s), got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// A group-by body that is not `aggregate(keys, aggs[, having])` or whose
    /// aggregates are not `alias := fn(expr)`.
    #[error("Invalid aggregate shape: {0}")]
    InvalidAggregateShape(String),

    /// A surface construct with no lowering rule in this position.
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A filter predicate that inferably does not produce a boolean.
    #[error("Filter predicate is not boolean: {0}")]
    NonBooleanPredicate(String),

    /// The metamodel contains an operator the target dialect cannot emit.
    #[error("Operator '{operator}' is not supported by the {dialect} dialect")]
    UnsupportedOperator {
        operator: String,
        dialect: &'static str,
    },

    /// The metamodel contains a function the target dialect cannot emit.
    #[error("Function '{function}' is not supported by the {dialect} dialect")]
    UnsupportedFunction {
        function: String,
        dialect: &'static str,
    },

    /// The external SQL parser rejected the input.
    #[error("Failed to parse SQL '{sql}': {cause}")]
    SqlParse { sql: String, cause: String },

    /// The SQL parsed but uses a feature outside the supported SELECT subset.
    #[error("Unsupported SQL feature: {0}")]
    UnsupportedSqlFeature(String),

    /// A value outside the accepted range (e.g. negative limit).
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(". Did you mean '{}'?", s),
        None => String::new(),
    }
}

impl RelqError {
    /// Create an arity error for a lambda with the wrong parameter count.
    pub fn arity(expected: usize, got: usize) -> Self {
        Self::ArityMismatch { expected, got }
    }

    /// Create a SQL parse error from the source text and underlying cause.
    pub fn sql_parse(sql: impl Into<String>, cause: impl ToString) -> Self {
        Self::SqlParse {
            sql: sql.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for relq operations.
pub type RelqResult<T> = Result<T, RelqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelqError::ColumnNotFound {
            table: "employees".to_string(),
            column: "salry".to_string(),
            suggestion: Some("salary".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Column 'salry' not found in table 'employees'. Did you mean 'salary'?"
        );

        let err = RelqError::arity(1, 2);
        assert_eq!(
            err.to_string(),
            "Lambda must have exactly 1 parameter(s), got 2"
        );
    }

    #[test]
    fn test_table_not_found_without_suggestion() {
        let err = RelqError::TableNotFound {
            table: "ghosts".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Table 'ghosts' not found");
    }
}
