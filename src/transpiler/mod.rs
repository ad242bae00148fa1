//! Rendering targets. One visitor per dialect over the shared metamodel.

mod pure;
mod traits;

pub use pure::PureRelationDialect;
pub use traits::Dialect;
