//! Table and database catalog.
//!
//! Columns, tables, and databases are value objects: every builder operation
//! works on its own cloned snapshot, never on the user's catalog. A database
//! can be assembled in code or loaded from JSON:
//!
//! ```
//! use relq::schema::Database;
//!
//! let json = r#"{
//!     "name": "local::DB",
//!     "children": [{
//!         "Table": {
//!             "name": "employees",
//!             "columns": [
//!                 { "name": "id", "column_type": "Integer" },
//!                 { "name": "name", "column_type": "String" }
//!             ]
//!         }
//!     }]
//! }"#;
//!
//! let db = Database::from_json(json).unwrap();
//! assert!(db.table("employees").is_some());
//! ```

use serde::{Deserialize, Serialize};
use strsim::levenshtein;

use crate::error::{RelqError, RelqResult};

/// Primitive type tag of a column.
///
/// `Unknown` is the recorded type of columns introduced by `extend` and
/// group-by aggregates; the design does not propagate inferred types, so
/// downstream users treat such columns as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Number,
    String,
    Boolean,
    Date,
    DateTime,
    StrictDate,
    Varchar(u32),
    Numeric(u32, u32),
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Unknown,
}

/// A named, typed column. Copy is cheap and structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A table: ordered columns plus an optional back-reference (by name) to the
/// schema group that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub schema: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            schema: None,
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column with this name exists.
    pub fn validate_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Append a column to this snapshot.
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Remove a column by name, if present.
    pub fn remove_column(&mut self, name: &str) {
        self.columns.retain(|c| c.name != name);
    }

    /// Rename `old` to `new`, keeping its type and position.
    /// Errors if `old` does not exist.
    pub fn rename_column(&mut self, old: &str, new: &str) -> RelqResult<()> {
        match self.columns.iter_mut().find(|c| c.name == old) {
            Some(col) => {
                col.name = new.to_string();
                Ok(())
            }
            None => Err(self.column_not_found(old)),
        }
    }

    /// Build a `ColumnNotFound` error with a fuzzy-match suggestion.
    pub fn column_not_found(&self, name: &str) -> RelqError {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        RelqError::ColumnNotFound {
            table: self.name.clone(),
            column: name.to_string(),
            suggestion: did_you_mean(name, &names),
        }
    }
}

/// A named grouping of tables inside a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaGroup {
    pub name: String,
    pub tables: Vec<Table>,
}

impl SchemaGroup {
    pub fn new(name: impl Into<String>, mut tables: Vec<Table>) -> Self {
        let name = name.into();
        for t in &mut tables {
            t.schema = Some(name.clone());
        }
        Self { name, tables }
    }
}

/// A child of a database: a top-level table or a schema group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseItem {
    Table(Table),
    Schema(SchemaGroup),
}

/// A database: a name and an ordered list of tables and schema groups.
///
/// Invariants: no duplicate top-level table names, no duplicate schema names,
/// and a schema may not share a name with a top-level table. `merge` keeps
/// these by preferring existing entries on collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub children: Vec<DatabaseItem>,
}

impl Database {
    pub fn new(name: impl Into<String>, children: Vec<DatabaseItem>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Convenience constructor for a database of top-level tables.
    pub fn from_tables(name: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            name: name.into(),
            children: tables.into_iter().map(DatabaseItem::Table).collect(),
        }
    }

    /// Load a catalog from its JSON form.
    pub fn from_json(json: &str) -> RelqResult<Self> {
        serde_json::from_str(json).map_err(|e| RelqError::InvalidValue(e.to_string()))
    }

    /// All tables, flattening schema groups.
    pub fn all_tables(&self) -> impl Iterator<Item = &Table> {
        self.children.iter().flat_map(|child| match child {
            DatabaseItem::Table(t) => std::slice::from_ref(t).iter(),
            DatabaseItem::Schema(s) => s.tables.iter(),
        })
    }

    /// Look up a table by name, searching top-level tables and schema groups.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.all_tables().find(|t| t.name == name)
    }

    /// Build a `TableNotFound` error with a fuzzy-match suggestion.
    pub fn table_not_found(&self, name: &str) -> RelqError {
        let names: Vec<&str> = self.all_tables().map(|t| t.name.as_str()).collect();
        RelqError::TableNotFound {
            table: name.to_string(),
            suggestion: did_you_mean(name, &names),
        }
    }

    /// Union another database's children into this one (used by `join`).
    ///
    /// Children of `other` not already present by name are appended; schema
    /// groups present on both sides union their tables by name, preferring
    /// the existing entry on collision.
    pub fn merge(&mut self, other: &Database) {
        for child in &other.children {
            match child {
                DatabaseItem::Table(t) => {
                    let exists = self.children.iter().any(
                        |c| matches!(c, DatabaseItem::Table(mine) if mine.name == t.name),
                    );
                    if !exists {
                        self.children.push(DatabaseItem::Table(t.clone()));
                    }
                }
                DatabaseItem::Schema(s) => {
                    let mine = self.children.iter_mut().find_map(|c| match c {
                        DatabaseItem::Schema(m) if m.name == s.name => Some(m),
                        _ => None,
                    });
                    match mine {
                        Some(mine) => {
                            for t in &s.tables {
                                if !mine.tables.iter().any(|m| m.name == t.name) {
                                    mine.tables.push(t.clone());
                                }
                            }
                        }
                        None => self.children.push(DatabaseItem::Schema(s.clone())),
                    }
                }
            }
        }
    }
}

/// Find the best candidate within a Levenshtein threshold scaled by input
/// length. Returns `None` when nothing is close enough.
pub(crate) fn did_you_mean(input: &str, candidates: &[&str]) -> Option<String> {
    let mut best_match = None;
    let mut min_dist = usize::MAX;

    for cand in candidates {
        let dist = levenshtein(input, cand);
        let threshold = match input.len() {
            0..=2 => 0,
            3..=5 => 2,
            _ => 3,
        };
        if dist <= threshold && dist < min_dist {
            min_dist = dist;
            best_match = Some(cand.to_string());
        }
    }

    best_match
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employees() -> Table {
        Table::new(
            "employees",
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("name", ColumnType::String),
                Column::new("salary", ColumnType::Number),
            ],
        )
    }

    #[test]
    fn test_column_lookup() {
        let t = employees();
        assert!(t.validate_column("salary"));
        assert!(!t.validate_column("salry"));
        assert_eq!(t.column("id").unwrap().column_type, ColumnType::Integer);
    }

    #[test]
    fn test_rename_column() {
        let mut t = employees();
        t.rename_column("salary", "pay").unwrap();
        assert!(t.validate_column("pay"));
        assert!(!t.validate_column("salary"));
        assert!(t.rename_column("gone", "x").is_err());
    }

    #[test]
    fn test_column_suggestion() {
        let t = employees();
        let err = t.column_not_found("salry");
        assert!(matches!(
            err,
            RelqError::ColumnNotFound { suggestion: Some(ref s), .. } if s == "salary"
        ));
    }

    #[test]
    fn test_database_lookup_through_schema_group() {
        let db = Database::new(
            "local::DB",
            vec![
                DatabaseItem::Table(employees()),
                DatabaseItem::Schema(SchemaGroup::new(
                    "hr",
                    vec![Table::new("reviews", vec![Column::new("score", ColumnType::Integer)])],
                )),
            ],
        );
        assert!(db.table("employees").is_some());
        let reviews = db.table("reviews").unwrap();
        assert_eq!(reviews.schema.as_deref(), Some("hr"));
        assert!(db.table("nope").is_none());
    }

    #[test]
    fn test_merge_prefers_existing() {
        let mut left = Database::from_tables("local::DB", vec![employees()]);
        let mut other_emp = employees();
        other_emp.columns.clear();
        let right = Database::from_tables(
            "local::DB",
            vec![other_emp, Table::new("departments", vec![])],
        );

        left.merge(&right);
        assert_eq!(left.children.len(), 2);
        // existing employees entry wins over the right-hand (emptied) one
        assert_eq!(left.table("employees").unwrap().columns.len(), 3);
        assert!(left.table("departments").is_some());
    }

    #[test]
    fn test_merge_unions_schema_groups() {
        let mut left = Database::new(
            "local::DB",
            vec![DatabaseItem::Schema(SchemaGroup::new(
                "hr",
                vec![Table::new("reviews", vec![])],
            ))],
        );
        let right = Database::new(
            "local::DB",
            vec![DatabaseItem::Schema(SchemaGroup::new(
                "hr",
                vec![Table::new("reviews", vec![]), Table::new("grades", vec![])],
            ))],
        );

        left.merge(&right);
        assert_eq!(left.children.len(), 1);
        let DatabaseItem::Schema(hr) = &left.children[0] else {
            panic!("expected schema group");
        };
        assert_eq!(hr.tables.len(), 2);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "name": "local::DB",
            "children": [
                { "Table": { "name": "t", "columns": [
                    { "name": "a", "column_type": "Integer" },
                    { "name": "v", "column_type": { "Varchar": 32 } }
                ] } }
            ]
        }"#;
        let db = Database::from_json(json).unwrap();
        let t = db.table("t").unwrap();
        assert_eq!(t.column("v").unwrap().column_type, ColumnType::Varchar(32));
    }
}
