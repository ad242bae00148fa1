//! The dialect seam.

use crate::ast::Clause;
use crate::error::RelqResult;

/// A rendering target. Adding a dialect means implementing this trait with a
/// new visitor over the metamodel; the metamodel itself never changes.
pub trait Dialect {
    /// Stable dialect name, used in unsupported-operator/function errors.
    fn name(&self) -> &'static str;

    /// Render a clause chain to the dialect's textual form.
    fn render(&self, clauses: &[Clause]) -> RelqResult<String>;
}
