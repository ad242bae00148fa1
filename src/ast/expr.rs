//! The expression algebra.
//!
//! Expressions form an ownership tree: no back-references, no interning,
//! nodes are immutable once constructed.

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, FunctionKind, Literal, UnaryOp};

/// Sort direction of an `OrderBy` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Join flavor carried by a `Clause::Join`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
}

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A literal value.
    Literal(Literal),
    /// A bare column reference.
    ColumnRef { name: String },
    /// A column reference qualified by a row variable (`$row.column`).
    ColumnAlias {
        alias: String,
        reference: Box<Expression>,
    },
    /// A bound row variable with no column (`$row`).
    VariableAlias { alias: String },
    /// Introduction of a new named column in `extend`/`group_by`.
    ComputedColumnAlias {
        alias: String,
        expression: Box<Expression>,
    },
    /// Wrapper marking a subexpression in a unary/binary operand position;
    /// the renderer's hook for inserting parentheses uniformly.
    Operand(Box<Expression>),
    /// A unary application. The operand is always `Operand`-wrapped.
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// A binary application. Both sides are always `Operand`-wrapped.
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    /// A function application; the identity carries no arguments itself.
    Function {
        function: FunctionKind,
        parameters: Vec<Expression>,
    },
    /// A conditional (`if test then body else orelse`).
    If {
        test: Box<Expression>,
        body: Box<Expression>,
        orelse: Box<Expression>,
    },
    /// A sort key with direction.
    OrderBy {
        direction: OrderDirection,
        expression: Box<Expression>,
    },
    /// An anonymous function over row variables.
    Lambda {
        parameters: Vec<String>,
        body: Box<Expression>,
    },
    /// The group-by kernel: `map` produces per-row values, `reduce` folds a
    /// collection.
    MapReduce {
        map: Box<Expression>,
        reduce: Box<Expression>,
    },
}

/// The payload of a `Clause::GroupBy`: group keys plus aggregate outputs
/// (each a `ComputedColumnAlias` wrapping a `MapReduce`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByExpr {
    pub selections: Vec<Expression>,
    pub expressions: Vec<Expression>,
}

impl Expression {
    pub fn column(name: impl Into<String>) -> Expression {
        Expression::ColumnRef { name: name.into() }
    }

    pub fn column_alias(alias: impl Into<String>, column: impl Into<String>) -> Expression {
        Expression::ColumnAlias {
            alias: alias.into(),
            reference: Box::new(Expression::column(column)),
        }
    }

    pub fn variable(alias: impl Into<String>) -> Expression {
        Expression::VariableAlias {
            alias: alias.into(),
        }
    }

    pub fn computed(alias: impl Into<String>, expression: Expression) -> Expression {
        Expression::ComputedColumnAlias {
            alias: alias.into(),
            expression: Box::new(expression),
        }
    }

    pub fn literal(literal: impl Into<Literal>) -> Expression {
        Expression::Literal(literal.into())
    }

    /// Build a binary expression, wrapping both sides in `Operand`.
    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(Expression::Operand(Box::new(left))),
            op,
            right: Box::new(Expression::Operand(Box::new(right))),
        }
    }

    /// Build a unary expression, wrapping the operand in `Operand`.
    pub fn unary(op: UnaryOp, operand: Expression) -> Expression {
        Expression::Unary {
            op,
            operand: Box::new(Expression::Operand(Box::new(operand))),
        }
    }

    pub fn function(function: FunctionKind, parameters: Vec<Expression>) -> Expression {
        Expression::Function {
            function,
            parameters,
        }
    }

    pub fn lambda(parameters: Vec<String>, body: Expression) -> Expression {
        Expression::Lambda {
            parameters,
            body: Box::new(body),
        }
    }

    pub fn order_by(direction: OrderDirection, expression: Expression) -> Expression {
        Expression::OrderBy {
            direction,
            expression: Box::new(expression),
        }
    }

    /// The expression inside an `Operand` wrapper, or the expression itself.
    pub fn unwrap_operand(&self) -> &Expression {
        match self {
            Expression::Operand(inner) => inner,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_wraps_operands() {
        let e = Expression::binary(
            Expression::column("a"),
            BinaryOp::Eq,
            Expression::literal(1),
        );
        let Expression::Binary { left, right, .. } = &e else {
            panic!("expected binary");
        };
        assert!(matches!(left.as_ref(), Expression::Operand(_)));
        assert!(matches!(right.as_ref(), Expression::Operand(_)));
        assert_eq!(left.unwrap_operand(), &Expression::column("a"));
        assert_eq!(right.unwrap_operand(), &Expression::literal(1));
    }
}
