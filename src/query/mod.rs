//! Query state: an ordered clause list plus the evolving table snapshot.

mod builder;

pub use builder::{Relq, db, table, using_db};

use serde::{Deserialize, Serialize};

use crate::ast::Clause;
use crate::error::RelqResult;
use crate::schema::{Database, Table};
use crate::transpiler::Dialect;

/// An in-flight query: the bound database, the table snapshot the pipeline
/// currently exposes, every snapshot it has exposed, and the clauses appended
/// so far. Emission order is exactly append order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub database: Database,
    pub table: Table,
    pub table_history: Vec<Table>,
    pub clauses: Vec<Clause>,
}

impl Query {
    /// Seed a query from a table of the database. The table's schema binding
    /// (if it lives in a schema group) is carried into the `From` clause.
    pub fn from_table(database: Database, table_name: &str) -> RelqResult<Self> {
        let table = database
            .table(table_name)
            .cloned()
            .ok_or_else(|| database.table_not_found(table_name))?;
        let clauses = vec![Clause::from_source(
            database.name.clone(),
            table.name.clone(),
            table.schema.clone(),
        )];
        Ok(Self {
            database,
            table_history: vec![table.clone()],
            table,
            clauses,
        })
    }

    /// Append a clause.
    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Replace the current table snapshot, keeping the old one in history.
    pub fn update_table(&mut self, table: Table) {
        self.table_history.push(table.clone());
        self.table = table;
    }

    /// Render the clause chain through a dialect.
    pub fn render(&self, dialect: &dyn Dialect) -> RelqResult<String> {
        dialect.render(&self.clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FromSource;
    use crate::error::RelqError;
    use crate::schema::{Column, ColumnType};

    fn database() -> Database {
        Database::from_tables(
            "local::DB",
            vec![Table::new(
                "employees",
                vec![Column::new("id", ColumnType::Integer)],
            )],
        )
    }

    #[test]
    fn test_from_table_seeds_clause() {
        let q = Query::from_table(database(), "employees").unwrap();
        assert_eq!(
            q.clauses,
            vec![Clause::From(FromSource {
                database: "local::DB".to_string(),
                table: "employees".to_string(),
                schema: None,
            })]
        );
        assert_eq!(q.table_history.len(), 1);
    }

    #[test]
    fn test_from_table_suggests() {
        let err = Query::from_table(database(), "employes").unwrap_err();
        assert!(matches!(
            err,
            RelqError::TableNotFound { suggestion: Some(ref s), .. } if s == "employees"
        ));
    }
}
