//! Top-level clauses of the query pipeline.

use serde::{Deserialize, Serialize};

use crate::ast::{Expression, GroupByExpr, JoinKind};

/// The source of a pipeline: a table bound to a database (and optionally a
/// schema group inside it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromSource {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
}

/// A top-level operator in the query pipeline. A query is an ordered list of
/// clauses; emission order is exactly insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    From(FromSource),
    Selection(Vec<Expression>),
    Filter(Expression),
    Extend(Vec<Expression>),
    GroupBy(GroupByExpr),
    Distinct(Vec<Expression>),
    OrderBy(Vec<Expression>),
    Limit(i64),
    Offset(i64),
    /// Each entry is a `ColumnAlias(new, ColumnRef(old))`.
    Rename(Vec<Expression>),
    Join {
        from: Vec<Clause>,
        kind: JoinKind,
        on: Expression,
    },
}

impl Clause {
    pub fn from_source(
        database: impl Into<String>,
        table: impl Into<String>,
        schema: Option<String>,
    ) -> Clause {
        Clause::From(FromSource {
            database: database.into(),
            table: table.into(),
            schema,
        })
    }
}
