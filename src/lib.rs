//! Relational query IR and multi-dialect code generator.
//!
//! Build pipelines as a typed clause algebra, not strings. Input arrives
//! either through the fluent builder with its expression DSL, or from a
//! restricted SQL SELECT grammar; output is rendered per dialect.
//!
//! ```
//! use relq::dsl::lambda;
//! use relq::query::table;
//! use relq::schema::{Column, ColumnType};
//!
//! let rendered = table("t", vec![Column::new("id", ColumnType::Integer)])
//!     .select(lambda("e", |e| e.col("id")))
//!     .unwrap()
//!     .to_pure_relation()
//!     .unwrap();
//! assert_eq!(rendered, "#>{local::DB.t}#->select(~[id])->from(legendql::Runtime)");
//! ```

pub mod ast;
pub mod dsl;
pub mod error;
pub mod query;
pub mod runtime;
pub mod schema;
pub mod sql;
pub mod transpiler;

pub use error::{RelqError, RelqResult};
pub use query::Relq;

pub mod prelude {
    pub use crate::Relq;
    pub use crate::ast::*;
    pub use crate::dsl::{
        SurfaceExpr, SurfaceLambda, aggregate, aggregate_having, avg, col, count, date, datetime,
        desc, lambda, lambda2, lit, named, sum,
    };
    pub use crate::error::*;
    pub use crate::query::{db, table, using_db};
    pub use crate::schema::{Column, ColumnType, Database, DatabaseItem, SchemaGroup, Table};
    pub use crate::sql::from_sql;
    pub use crate::transpiler::{Dialect, PureRelationDialect};
}
