//! Function identities and the lowering registry.

use serde::{Deserialize, Serialize};

/// Opaque callable identities. A function node carries only its identity;
/// its arguments live in the enclosing `Expression::Function`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    Count,
    Average,
    Sum,
    Modulo,
    Exponent,
    StringConcat,
    Left,
    Avg,
    Rank,
    RowNumber,
    Lead,
    Lag,
    Over,
    Rows,
    Range,
    Unbounded,
    Aggregate,
}

impl FunctionKind {
    /// Case-insensitive lookup over the fixed registry. Surface calls such as
    /// `avg(...)` or `ROW_NUMBER()` resolve through here.
    pub fn lookup(name: &str) -> Option<FunctionKind> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(FunctionKind::Count),
            "average" => Some(FunctionKind::Average),
            "sum" => Some(FunctionKind::Sum),
            "modulo" => Some(FunctionKind::Modulo),
            "exponent" => Some(FunctionKind::Exponent),
            "string_concat" => Some(FunctionKind::StringConcat),
            "left" => Some(FunctionKind::Left),
            "avg" => Some(FunctionKind::Avg),
            "rank" => Some(FunctionKind::Rank),
            "row_number" => Some(FunctionKind::RowNumber),
            "lead" => Some(FunctionKind::Lead),
            "lag" => Some(FunctionKind::Lag),
            "over" => Some(FunctionKind::Over),
            "rows" => Some(FunctionKind::Rows),
            "range" => Some(FunctionKind::Range),
            "unbounded" => Some(FunctionKind::Unbounded),
            "aggregate" => Some(FunctionKind::Aggregate),
            _ => None,
        }
    }

    /// Stable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            FunctionKind::Count => "count",
            FunctionKind::Average => "average",
            FunctionKind::Sum => "sum",
            FunctionKind::Modulo => "modulo",
            FunctionKind::Exponent => "exponent",
            FunctionKind::StringConcat => "string_concat",
            FunctionKind::Left => "left",
            FunctionKind::Avg => "avg",
            FunctionKind::Rank => "rank",
            FunctionKind::RowNumber => "row_number",
            FunctionKind::Lead => "lead",
            FunctionKind::Lag => "lag",
            FunctionKind::Over => "over",
            FunctionKind::Rows => "rows",
            FunctionKind::Range => "range",
            FunctionKind::Unbounded => "unbounded",
            FunctionKind::Aggregate => "aggregate",
        }
    }
}
