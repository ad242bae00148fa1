//! The metamodel: a typed algebra of literals, operators, expressions,
//! functions, and clauses, plus the visitor interface over it.

mod clause;
mod expr;
mod functions;
mod literal;
mod operators;
mod visitor;

pub use clause::{Clause, FromSource};
pub use expr::{Expression, GroupByExpr, JoinKind, OrderDirection};
pub use functions::FunctionKind;
pub use literal::Literal;
pub use operators::{BinaryOp, UnaryOp};
pub use visitor::Visitor;
