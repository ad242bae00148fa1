//! Visitor dispatch over the metamodel.
//!
//! Emission, validation, and transformation are all visitors over the closed
//! algebra: adding a rendering target is a new visitor, not a metamodel
//! change. The visitor's return type is an associated type so that renderers
//! can produce `RelqResult<String>` while other passes produce their own
//! result types; any contextual state lives inside the visitor itself.

use crate::ast::{
    BinaryOp, Clause, Expression, FromSource, FunctionKind, GroupByExpr, JoinKind, Literal,
    OrderDirection, UnaryOp,
};

/// One handler per concrete variant of the metamodel.
pub trait Visitor {
    type Output;

    // literals
    fn visit_integer_literal(&mut self, value: i64) -> Self::Output;
    fn visit_string_literal(&mut self, value: &str) -> Self::Output;
    fn visit_boolean_literal(&mut self, value: bool) -> Self::Output;
    fn visit_date_literal(&mut self, literal: &Literal) -> Self::Output;

    // expressions
    fn visit_column_ref(&mut self, name: &str) -> Self::Output;
    fn visit_column_alias(&mut self, alias: &str, reference: &Expression) -> Self::Output;
    fn visit_variable_alias(&mut self, alias: &str) -> Self::Output;
    fn visit_computed_column_alias(&mut self, alias: &str, expression: &Expression)
    -> Self::Output;
    fn visit_operand(&mut self, expression: &Expression) -> Self::Output;
    fn visit_unary(&mut self, op: UnaryOp, operand: &Expression) -> Self::Output;
    fn visit_binary(&mut self, left: &Expression, op: BinaryOp, right: &Expression)
    -> Self::Output;
    fn visit_function(
        &mut self,
        function: FunctionKind,
        parameters: &[Expression],
    ) -> Self::Output;
    fn visit_if(
        &mut self,
        test: &Expression,
        body: &Expression,
        orelse: &Expression,
    ) -> Self::Output;
    fn visit_order_by(&mut self, direction: OrderDirection, expression: &Expression)
    -> Self::Output;
    fn visit_lambda(&mut self, parameters: &[String], body: &Expression) -> Self::Output;
    fn visit_map_reduce(&mut self, map: &Expression, reduce: &Expression) -> Self::Output;

    // clauses
    fn visit_from(&mut self, source: &FromSource) -> Self::Output;
    fn visit_selection(&mut self, expressions: &[Expression]) -> Self::Output;
    fn visit_filter(&mut self, expression: &Expression) -> Self::Output;
    fn visit_extend(&mut self, expressions: &[Expression]) -> Self::Output;
    fn visit_group_by(&mut self, group_by: &GroupByExpr) -> Self::Output;
    fn visit_distinct(&mut self, expressions: &[Expression]) -> Self::Output;
    fn visit_order_by_clause(&mut self, ordering: &[Expression]) -> Self::Output;
    fn visit_limit(&mut self, value: i64) -> Self::Output;
    fn visit_offset(&mut self, value: i64) -> Self::Output;
    fn visit_rename(&mut self, aliases: &[Expression]) -> Self::Output;
    fn visit_join(&mut self, from: &[Clause], kind: JoinKind, on: &Expression) -> Self::Output;
}

impl Expression {
    /// Dispatch on the visitor handler for this variant.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expression::Literal(lit) => match lit {
                Literal::Integer(v) => visitor.visit_integer_literal(*v),
                Literal::String(v) => visitor.visit_string_literal(v),
                Literal::Boolean(v) => visitor.visit_boolean_literal(*v),
                Literal::Date(_) | Literal::DateTime(_) => visitor.visit_date_literal(lit),
            },
            Expression::ColumnRef { name } => visitor.visit_column_ref(name),
            Expression::ColumnAlias { alias, reference } => {
                visitor.visit_column_alias(alias, reference)
            }
            Expression::VariableAlias { alias } => visitor.visit_variable_alias(alias),
            Expression::ComputedColumnAlias { alias, expression } => {
                visitor.visit_computed_column_alias(alias, expression)
            }
            Expression::Operand(inner) => visitor.visit_operand(inner),
            Expression::Unary { op, operand } => visitor.visit_unary(*op, operand),
            Expression::Binary { left, op, right } => visitor.visit_binary(left, *op, right),
            Expression::Function {
                function,
                parameters,
            } => visitor.visit_function(*function, parameters),
            Expression::If { test, body, orelse } => visitor.visit_if(test, body, orelse),
            Expression::OrderBy {
                direction,
                expression,
            } => visitor.visit_order_by(*direction, expression),
            Expression::Lambda { parameters, body } => visitor.visit_lambda(parameters, body),
            Expression::MapReduce { map, reduce } => visitor.visit_map_reduce(map, reduce),
        }
    }
}

impl Clause {
    /// Dispatch on the visitor handler for this variant.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Clause::From(source) => visitor.visit_from(source),
            Clause::Selection(exprs) => visitor.visit_selection(exprs),
            Clause::Filter(expr) => visitor.visit_filter(expr),
            Clause::Extend(exprs) => visitor.visit_extend(exprs),
            Clause::GroupBy(group_by) => visitor.visit_group_by(group_by),
            Clause::Distinct(exprs) => visitor.visit_distinct(exprs),
            Clause::OrderBy(ordering) => visitor.visit_order_by_clause(ordering),
            Clause::Limit(value) => visitor.visit_limit(*value),
            Clause::Offset(value) => visitor.visit_offset(*value),
            Clause::Rename(aliases) => visitor.visit_rename(aliases),
            Clause::Join { from, kind, on } => visitor.visit_join(from, *kind, on),
        }
    }
}
