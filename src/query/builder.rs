//! Fluent builder over [`Query`].
//!
//! Each operation lowers its lambda against the current table snapshot,
//! appends the resulting clause(s), and replaces the snapshot. Operations
//! never reorder clauses.

use crate::ast::{Clause, JoinKind};
use crate::dsl::{LowerKind, SurfaceLambda, lower, lower_join_condition};
use crate::error::{RelqError, RelqResult};
use crate::query::Query;
use crate::schema::{Column, Database, Table};
use crate::transpiler::{Dialect, PureRelationDialect};

/// Start a pipeline from an ad-hoc single-table database named `local::DB`.
pub fn table(name: impl Into<String>, columns: Vec<Column>) -> Relq {
    let table = Table::new(name, columns);
    let database = Database::from_tables("local::DB", vec![table.clone()]);
    let clauses = vec![Clause::from_source(
        database.name.clone(),
        table.name.clone(),
        None,
    )];
    Relq {
        query: Query {
            database,
            table_history: vec![table.clone()],
            table,
            clauses,
        },
    }
}

/// Assemble a database from tables.
pub fn db(name: impl Into<String>, tables: Vec<Table>) -> Database {
    Database::from_tables(name, tables)
}

/// Start a pipeline from a table of an existing database.
pub fn using_db(database: Database, table: &str) -> RelqResult<Relq> {
    Query::from_table(database, table).map(|query| Relq { query })
}

/// The fluent query builder.
#[derive(Debug, Clone)]
pub struct Relq {
    query: Query,
}

impl Relq {
    /// The underlying query state.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The table snapshot the pipeline currently exposes.
    pub fn current_table(&self) -> &Table {
        &self.query.table
    }

    /// Project to the referenced columns.
    pub fn select(self, lambda: SurfaceLambda) -> RelqResult<Self> {
        self.apply(LowerKind::Select, lambda)
    }

    /// Keep rows matching the predicate.
    pub fn filter(self, lambda: SurfaceLambda) -> RelqResult<Self> {
        self.apply(LowerKind::Filter, lambda)
    }

    /// Append derived columns (`alias := expr` entries).
    pub fn extend(self, lambda: SurfaceLambda) -> RelqResult<Self> {
        self.apply(LowerKind::Extend, lambda)
    }

    /// Rename columns (`new := old` entries). The old names are gone
    /// afterwards; later references to them fail.
    pub fn rename(self, lambda: SurfaceLambda) -> RelqResult<Self> {
        self.apply(LowerKind::Rename, lambda)
    }

    /// Group and aggregate via the `aggregate(keys, aggs[, having])`
    /// meta-call; a `having` argument appends a trailing filter.
    pub fn group_by(self, lambda: SurfaceLambda) -> RelqResult<Self> {
        self.apply(LowerKind::GroupBy, lambda)
    }

    /// Sort by the listed columns; a unary minus marks descending.
    pub fn order_by(self, lambda: SurfaceLambda) -> RelqResult<Self> {
        self.apply(LowerKind::OrderBy, lambda)
    }

    /// Project to distinct rows of the referenced columns.
    pub fn distinct(self, lambda: SurfaceLambda) -> RelqResult<Self> {
        self.apply(LowerKind::Distinct, lambda)
    }

    fn apply(mut self, kind: LowerKind, lambda: SurfaceLambda) -> RelqResult<Self> {
        let lowered = lower(kind, &lambda, &self.query.table)?;
        for clause in lowered.clauses {
            self.query.push(clause);
        }
        self.query.update_table(lowered.table);
        Ok(self)
    }

    /// Inner join against another pipeline on a two-row condition.
    pub fn join(self, other: Relq, on: SurfaceLambda) -> RelqResult<Self> {
        self.join_kind(other, JoinKind::Inner, on)
    }

    /// Left join against another pipeline on a two-row condition.
    pub fn left_join(self, other: Relq, on: SurfaceLambda) -> RelqResult<Self> {
        self.join_kind(other, JoinKind::Left, on)
    }

    fn join_kind(mut self, other: Relq, kind: JoinKind, on: SurfaceLambda) -> RelqResult<Self> {
        let (on_expr, joined) =
            lower_join_condition(&on, &self.query.table, &other.query.table)?;
        // permissive union of the two catalogs
        self.query.database.merge(&other.query.database);
        // the right side's full clause chain embeds by value; nested joins
        // are not flattened and this is observable in the rendered text
        self.query.push(Clause::Join {
            from: other.query.clauses,
            kind,
            on: on_expr,
        });
        self.query.update_table(joined);
        Ok(self)
    }

    /// Keep at most `n` rows.
    pub fn limit(mut self, n: i64) -> RelqResult<Self> {
        if n < 0 {
            return Err(RelqError::InvalidValue(format!("negative limit: {}", n)));
        }
        self.query.push(Clause::Limit(n));
        Ok(self)
    }

    /// Skip the first `n` rows.
    pub fn offset(mut self, n: i64) -> RelqResult<Self> {
        if n < 0 {
            return Err(RelqError::InvalidValue(format!("negative offset: {}", n)));
        }
        self.query.push(Clause::Offset(n));
        Ok(self)
    }

    /// Skip `offset` rows, then keep at most `limit`.
    pub fn take(self, offset: i64, limit: i64) -> RelqResult<Self> {
        self.offset(offset)?.limit(limit)
    }

    /// Render the pipeline through a dialect.
    pub fn render(&self, dialect: &dyn Dialect) -> RelqResult<String> {
        self.query.render(dialect)
    }

    /// Render the pipeline in the primary dialect with its default runtime.
    pub fn to_pure_relation(&self) -> RelqResult<String> {
        self.render(&PureRelationDialect::default())
    }
}
