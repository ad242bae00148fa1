//! Surface-to-metamodel lowering.
//!
//! Each builder operation lowers its lambda with a fixed outer arity (2 for
//! join, 1 otherwise) and its own rules for the body. The lowerer works on a
//! cloned table snapshot and returns the snapshot the resulting clause
//! produces; the builder never mutates the catalog.

use std::collections::HashMap;

use crate::ast::{BinaryOp, Clause, Expression, FunctionKind, GroupByExpr, OrderDirection, UnaryOp};
use crate::dsl::{ArithOp, BoolChainOp, CompareOp, FStringPart, SurfaceExpr, SurfaceLambda, SurfaceUnaryOp};
use crate::error::{RelqError, RelqResult};
use crate::schema::{Column, ColumnType, Table};

/// Which builder operation is consuming the lambda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerKind {
    Select,
    Filter,
    Extend,
    Rename,
    GroupBy,
    OrderBy,
    Distinct,
    Over,
}

impl LowerKind {
    fn arity(self) -> usize {
        1
    }
}

/// The product of lowering one lambda: the clause(s) to append and the table
/// snapshot the pipeline exposes afterwards.
#[derive(Debug, Clone)]
pub struct Lowered {
    pub clauses: Vec<Clause>,
    pub table: Table,
}

/// Lower a single-row lambda for the given operation.
pub fn lower(kind: LowerKind, lambda: &SurfaceLambda, src_table: &Table) -> RelqResult<Lowered> {
    if lambda.params.len() != kind.arity() {
        return Err(RelqError::arity(kind.arity(), lambda.params.len()));
    }
    let mut cx = BodyCx::new(&lambda.params, vec![src_table]);
    match kind {
        LowerKind::Select => lower_select(&mut cx, lambda, src_table, Clause::Selection),
        LowerKind::Distinct => lower_select(&mut cx, lambda, src_table, Clause::Distinct),
        LowerKind::Filter => lower_filter(&mut cx, lambda, src_table),
        LowerKind::Extend => lower_extend(&mut cx, lambda, src_table),
        LowerKind::Rename => lower_rename(lambda, src_table),
        LowerKind::GroupBy => lower_group_by(&mut cx, lambda, src_table),
        LowerKind::OrderBy => lower_order_by(&mut cx, lambda, src_table),
        // Window lowering is not implemented; the arity check still applies.
        LowerKind::Over => Err(RelqError::UnsupportedExpression(format!(
            "over: {}",
            lambda.body
        ))),
    }
}

/// Lower a two-row join condition. Returns the `on` expression (a two-param
/// lambda) and the joined table: columns concatenated in source order, name
/// underscore-joined, no deduplication.
pub fn lower_join_condition(
    lambda: &SurfaceLambda,
    left: &Table,
    right: &Table,
) -> RelqResult<(Expression, Table)> {
    if lambda.params.len() != 2 {
        return Err(RelqError::arity(2, lambda.params.len()));
    }
    let mut cx = BodyCx::new(&lambda.params, vec![left, right]);
    cx.qualify = true;
    let body = cx.lower_expr(&lambda.body)?;
    let on = Expression::lambda(lambda.params.clone(), body);

    let mut columns = left.columns.clone();
    columns.extend(right.columns.iter().cloned());
    let joined = Table::new(format!("{}_{}", left.name, right.name), columns);
    Ok((on, joined))
}

// ==================== per-operation rules ====================

fn lower_select(
    cx: &mut BodyCx<'_>,
    lambda: &SurfaceLambda,
    src_table: &Table,
    make: fn(Vec<Expression>) -> Clause,
) -> RelqResult<Lowered> {
    let mut exprs = Vec::new();
    let mut columns = Vec::new();
    for item in as_list(&lambda.body) {
        let name = cx.column_name_of(item)?;
        let col = src_table
            .column(&name)
            .ok_or_else(|| src_table.column_not_found(&name))?;
        columns.push(col.clone());
        exprs.push(Expression::column(name));
    }
    let mut table = src_table.clone();
    table.columns = columns;
    Ok(Lowered {
        clauses: vec![make(exprs)],
        table,
    })
}

fn lower_filter(
    cx: &mut BodyCx<'_>,
    lambda: &SurfaceLambda,
    src_table: &Table,
) -> RelqResult<Lowered> {
    reject_non_boolean(&lambda.body)?;
    cx.qualify = true;
    let body = cx.lower_expr(&lambda.body)?;
    Ok(Lowered {
        clauses: vec![Clause::Filter(Expression::lambda(
            lambda.params.clone(),
            body,
        ))],
        table: src_table.clone(),
    })
}

fn lower_extend(
    cx: &mut BodyCx<'_>,
    lambda: &SurfaceLambda,
    src_table: &Table,
) -> RelqResult<Lowered> {
    cx.qualify = true;
    let mut table = src_table.clone();
    let mut exprs = Vec::new();
    for item in as_list(&lambda.body) {
        let SurfaceExpr::Named { alias, value } = item else {
            return Err(RelqError::UnsupportedExpression(format!(
                "extend entries must be named: {}",
                item
            )));
        };
        if table.validate_column(alias) {
            return Err(RelqError::DuplicateColumn {
                table: table.name.clone(),
                column: alias.clone(),
            });
        }
        let lowered = cx.lower_expr(value)?;
        exprs.push(Expression::computed(
            alias.clone(),
            Expression::lambda(lambda.params.clone(), lowered),
        ));
        // later entries in the same list may reference this alias by name
        cx.aliases
            .insert(alias.clone(), lambda.params[0].clone());
        table.add_column(Column::new(alias.clone(), ColumnType::Unknown));
    }
    Ok(Lowered {
        clauses: vec![Clause::Extend(exprs)],
        table,
    })
}

fn lower_rename(lambda: &SurfaceLambda, src_table: &Table) -> RelqResult<Lowered> {
    let mut table = src_table.clone();
    let mut exprs = Vec::new();
    for item in as_list(&lambda.body) {
        let SurfaceExpr::Named { alias, value } = item else {
            return Err(RelqError::UnsupportedExpression(format!(
                "rename entries must be named: {}",
                item
            )));
        };
        // earlier entries in the same list may already have renamed their
        // source column, so resolve against the evolving snapshot
        let old = match value.as_ref() {
            SurfaceExpr::Attribute { var, name } => {
                if !lambda.params.iter().any(|p| p == var) {
                    return Err(RelqError::UnsupportedExpression(format!(
                        "unknown row variable '{}'",
                        var
                    )));
                }
                name.clone()
            }
            SurfaceExpr::Name(name) => name.clone(),
            other => {
                return Err(RelqError::UnsupportedExpression(format!(
                    "expected a column reference: {}",
                    other
                )));
            }
        };
        table.rename_column(&old, alias)?;
        exprs.push(Expression::column_alias(alias.clone(), old));
    }
    Ok(Lowered {
        clauses: vec![Clause::Rename(exprs)],
        table,
    })
}

fn lower_group_by(
    cx: &mut BodyCx<'_>,
    lambda: &SurfaceLambda,
    src_table: &Table,
) -> RelqResult<Lowered> {
    let SurfaceExpr::Call { name, args } = &lambda.body else {
        return Err(RelqError::InvalidAggregateShape(format!(
            "group_by body must be aggregate(keys, aggs[, having]): {}",
            lambda.body
        )));
    };
    if name != "aggregate" || !(args.len() == 2 || args.len() == 3) {
        return Err(RelqError::InvalidAggregateShape(format!(
            "group_by body must be aggregate(keys, aggs[, having]): {}",
            lambda.body
        )));
    }
    let (SurfaceExpr::List(keys), SurfaceExpr::List(aggs)) = (&args[0], &args[1]) else {
        return Err(RelqError::InvalidAggregateShape(format!(
            "aggregate keys and aggregates must be lists: {}",
            lambda.body
        )));
    };

    let mut table = src_table.clone();
    table.columns.clear();

    let mut selections = Vec::new();
    for key in keys {
        let name = cx.column_name_of(key)?;
        let col = src_table
            .column(&name)
            .ok_or_else(|| src_table.column_not_found(&name))?;
        table.columns.push(col.clone());
        selections.push(Expression::column(name));
    }

    let mut expressions = Vec::new();
    for agg in aggs {
        let SurfaceExpr::Named { alias, value } = agg else {
            return Err(RelqError::InvalidAggregateShape(format!(
                "aggregates must be named function applications: {}",
                agg
            )));
        };
        let SurfaceExpr::Call {
            name: fn_name,
            args: fn_args,
        } = value.as_ref()
        else {
            return Err(RelqError::InvalidAggregateShape(format!(
                "aggregates must be named function applications: {}",
                agg
            )));
        };
        let function = FunctionKind::lookup(fn_name).ok_or_else(|| {
            RelqError::InvalidAggregateShape(format!("unknown aggregate function: {}", fn_name))
        })?;
        if fn_args.len() != 1 {
            return Err(RelqError::InvalidAggregateShape(format!(
                "aggregate function takes one argument: {}",
                agg
            )));
        }
        cx.qualify = true;
        let mapped = cx.lower_expr(&fn_args[0])?;
        cx.qualify = false;
        let map = Expression::lambda(lambda.params.clone(), mapped);
        let reduce = Expression::lambda(
            lambda.params.clone(),
            Expression::function(function, vec![Expression::variable(&lambda.params[0])]),
        );
        expressions.push(Expression::computed(
            alias.clone(),
            Expression::MapReduce {
                map: Box::new(map),
                reduce: Box::new(reduce),
            },
        ));
        cx.aliases
            .insert(alias.clone(), lambda.params[0].clone());
        table.add_column(Column::new(alias.clone(), ColumnType::Unknown));
    }

    let mut clauses = vec![Clause::GroupBy(GroupByExpr {
        selections,
        expressions,
    })];

    if let Some(having) = args.get(2) {
        // having sees the aggregate outputs, not the source columns
        let mut having_cx = BodyCx::new(&lambda.params, vec![&table]);
        having_cx.qualify = true;
        having_cx.aliases = cx.aliases.clone();
        reject_non_boolean(having)?;
        let body = having_cx.lower_expr(having)?;
        clauses.push(Clause::Filter(Expression::lambda(
            lambda.params.clone(),
            body,
        )));
    }

    Ok(Lowered { clauses, table })
}

fn lower_order_by(
    cx: &mut BodyCx<'_>,
    lambda: &SurfaceLambda,
    src_table: &Table,
) -> RelqResult<Lowered> {
    let mut exprs = Vec::new();
    for item in as_list(&lambda.body) {
        let (direction, operand) = match item {
            SurfaceExpr::Unary {
                op: SurfaceUnaryOp::Minus,
                operand,
            } => (OrderDirection::Desc, operand.as_ref()),
            SurfaceExpr::Unary {
                op: SurfaceUnaryOp::Plus,
                operand,
            } => (OrderDirection::Asc, operand.as_ref()),
            other => (OrderDirection::Asc, other),
        };
        let name = cx.column_name_of(operand)?;
        exprs.push(Expression::order_by(direction, Expression::column(name)));
    }
    Ok(Lowered {
        clauses: vec![Clause::OrderBy(exprs)],
        table: src_table.clone(),
    })
}

// ==================== body lowering ====================

/// Context for lowering a lambda body: one table per row parameter, plus the
/// implicit-alias map that makes earlier list entries referencable by bare
/// name later in the same list.
struct BodyCx<'a> {
    params: &'a [String],
    tables: Vec<&'a Table>,
    aliases: HashMap<String, String>,
    /// When set, attributes lower to `ColumnAlias($row.col)`; otherwise to
    /// bare `ColumnRef` (select / rename / order_by / group keys).
    qualify: bool,
}

impl<'a> BodyCx<'a> {
    fn new(params: &'a [String], tables: Vec<&'a Table>) -> Self {
        Self {
            params,
            tables,
            aliases: HashMap::new(),
            qualify: false,
        }
    }

    fn table_for(&self, var: &str) -> RelqResult<&'a Table> {
        self.params
            .iter()
            .position(|p| p == var)
            .and_then(|i| self.tables.get(i).copied())
            .ok_or_else(|| {
                RelqError::UnsupportedExpression(format!("unknown row variable '{}'", var))
            })
    }

    fn check_column(&self, table: &Table, name: &str) -> RelqResult<()> {
        if table.validate_column(name) || self.aliases.contains_key(name) {
            Ok(())
        } else {
            Err(table.column_not_found(name))
        }
    }

    /// The column name an item in a column-list position refers to.
    fn column_name_of(&self, item: &SurfaceExpr) -> RelqResult<String> {
        match item {
            SurfaceExpr::Attribute { var, name } => {
                let table = self.table_for(var)?;
                self.check_column(table, name)?;
                Ok(name.clone())
            }
            SurfaceExpr::Name(name) => {
                self.check_column(self.tables[0], name)?;
                Ok(name.clone())
            }
            other => Err(RelqError::UnsupportedExpression(format!(
                "expected a column reference: {}",
                other
            ))),
        }
    }

    fn lower_expr(&mut self, expr: &SurfaceExpr) -> RelqResult<Expression> {
        match expr {
            SurfaceExpr::Attribute { var, name } => {
                let table = self.table_for(var)?;
                self.check_column(table, name)?;
                if self.qualify {
                    Ok(Expression::column_alias(var.clone(), name.clone()))
                } else {
                    Ok(Expression::column(name.clone()))
                }
            }
            SurfaceExpr::Name(name) => {
                self.check_column(self.tables[0], name)?;
                match self.aliases.get(name) {
                    Some(var) if self.qualify => {
                        Ok(Expression::column_alias(var.clone(), name.clone()))
                    }
                    _ => Ok(Expression::column(name.clone())),
                }
            }
            SurfaceExpr::Int(v) => Ok(Expression::literal(*v)),
            SurfaceExpr::Str(v) => Ok(Expression::literal(v.as_str())),
            SurfaceExpr::Bool(v) => Ok(Expression::literal(*v)),
            SurfaceExpr::Date(v) => Ok(Expression::Literal(crate::ast::Literal::Date(*v))),
            SurfaceExpr::DateTime(v) => Ok(Expression::Literal(crate::ast::Literal::DateTime(*v))),
            SurfaceExpr::InvalidDate(s) => Err(RelqError::InvalidValue(format!(
                "invalid date literal: {}",
                s
            ))),
            SurfaceExpr::Compare { left, op, right } => {
                let l = self.lower_expr(left)?;
                let r = self.lower_expr(right)?;
                Ok(Expression::binary(l, map_compare(*op), r))
            }
            SurfaceExpr::Arith { left, op, right } => {
                let l = self.lower_expr(left)?;
                let r = self.lower_expr(right)?;
                match op {
                    ArithOp::Mod => Ok(Expression::function(FunctionKind::Modulo, vec![l, r])),
                    ArithOp::Pow => Ok(Expression::function(FunctionKind::Exponent, vec![l, r])),
                    other => Ok(Expression::binary(l, map_arith(*other), r)),
                }
            }
            SurfaceExpr::BoolChain { op, values } => {
                let binop = match op {
                    BoolChainOp::And => BinaryOp::And,
                    BoolChainOp::Or => BinaryOp::Or,
                };
                let mut iter = values.iter();
                let first = iter.next().ok_or_else(|| {
                    RelqError::UnsupportedExpression("empty boolean chain".to_string())
                })?;
                let mut acc = self.lower_expr(first)?;
                for value in iter {
                    let rhs = self.lower_expr(value)?;
                    acc = Expression::binary(acc, binop, rhs);
                }
                Ok(acc)
            }
            SurfaceExpr::Unary { op, operand } => {
                let inner = self.lower_expr(operand)?;
                match op {
                    SurfaceUnaryOp::Not => Ok(Expression::unary(UnaryOp::Not, inner)),
                    // unary plus and minus pass through
                    SurfaceUnaryOp::Plus | SurfaceUnaryOp::Minus => Ok(inner),
                }
            }
            SurfaceExpr::IfElse { test, body, orelse } => Ok(Expression::If {
                test: Box::new(self.lower_expr(test)?),
                body: Box::new(self.lower_expr(body)?),
                orelse: Box::new(self.lower_expr(orelse)?),
            }),
            SurfaceExpr::List(_) => Err(RelqError::UnsupportedExpression(format!(
                "list in scalar position: {}",
                expr
            ))),
            SurfaceExpr::Named { alias, value } => {
                let inner = self.lower_expr(value)?;
                Ok(Expression::ColumnAlias {
                    alias: alias.clone(),
                    reference: Box::new(inner),
                })
            }
            SurfaceExpr::Call { name, args } => {
                let function = FunctionKind::lookup(name).ok_or_else(|| {
                    RelqError::UnsupportedExpression(format!("unknown function: {}", expr))
                })?;
                let mut parameters = Vec::with_capacity(args.len());
                for arg in args {
                    parameters.push(self.lower_expr(arg)?);
                }
                Ok(Expression::function(function, parameters))
            }
            SurfaceExpr::FString(parts) => {
                let mut parameters = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        FStringPart::Text(s) => parameters.push(Expression::literal(s.as_str())),
                        FStringPart::Interp {
                            format_spec: Some(_),
                            ..
                        } => {
                            return Err(RelqError::UnsupportedExpression(format!(
                                "format specs are not supported: {}",
                                expr
                            )));
                        }
                        FStringPart::Interp { value, .. } => {
                            parameters.push(self.lower_expr(value)?)
                        }
                    }
                }
                Ok(Expression::function(FunctionKind::StringConcat, parameters))
            }
        }
    }
}

fn map_compare(op: CompareOp) -> BinaryOp {
    match op {
        CompareOp::Eq => BinaryOp::Eq,
        CompareOp::NotEq => BinaryOp::NotEq,
        CompareOp::Lt => BinaryOp::Lt,
        CompareOp::LtE => BinaryOp::LtE,
        CompareOp::Gt => BinaryOp::Gt,
        CompareOp::GtE => BinaryOp::GtE,
        CompareOp::In => BinaryOp::In,
        CompareOp::NotIn => BinaryOp::NotIn,
        CompareOp::Is => BinaryOp::Is,
        CompareOp::IsNot => BinaryOp::IsNot,
    }
}

fn map_arith(op: ArithOp) -> BinaryOp {
    match op {
        ArithOp::Add => BinaryOp::Add,
        ArithOp::Sub => BinaryOp::Sub,
        ArithOp::Mul => BinaryOp::Mul,
        ArithOp::Div => BinaryOp::Div,
        ArithOp::BitAnd => BinaryOp::BitAnd,
        ArithOp::BitOr => BinaryOp::BitOr,
        // handled as function applications before this point
        ArithOp::Mod | ArithOp::Pow => unreachable!("lowered as functions"),
    }
}

/// A lambda body in list position: either an explicit list, or a single item
/// treated as a one-element list.
fn as_list(body: &SurfaceExpr) -> &[SurfaceExpr] {
    match body {
        SurfaceExpr::List(items) => items,
        single => std::slice::from_ref(single),
    }
}

/// Reject a filter predicate that inferably does not produce a boolean:
/// a bare non-boolean literal, or a top-level arithmetic application.
fn reject_non_boolean(body: &SurfaceExpr) -> RelqResult<()> {
    let non_boolean = matches!(
        body,
        SurfaceExpr::Int(_)
            | SurfaceExpr::Str(_)
            | SurfaceExpr::Date(_)
            | SurfaceExpr::DateTime(_)
            | SurfaceExpr::InvalidDate(_)
            | SurfaceExpr::Arith { .. }
    );
    if non_boolean {
        Err(RelqError::NonBooleanPredicate(body.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{
        aggregate, aggregate_having, avg, col, date, fstring, if_else, interp, interp_fmt, lambda,
        lambda2, lit, named, text,
    };

    fn employees() -> Table {
        Table::new(
            "employees",
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("title", ColumnType::String),
                Column::new("salary", ColumnType::Number),
                Column::new("bonus", ColumnType::Number),
            ],
        )
    }

    #[test]
    fn test_select_shrinks_table() {
        let l = lambda("e", |e| SurfaceExpr::List(vec![e.col("id"), e.col("title")]));
        let lowered = lower(LowerKind::Select, &l, &employees()).unwrap();
        assert_eq!(lowered.table.columns.len(), 2);
        let Clause::Selection(exprs) = &lowered.clauses[0] else {
            panic!("expected selection");
        };
        assert_eq!(exprs[0], Expression::column("id"));
    }

    #[test]
    fn test_select_unknown_column() {
        let l = lambda("e", |e| e.col("salry"));
        let err = lower(LowerKind::Select, &l, &employees()).unwrap_err();
        assert!(matches!(
            err,
            RelqError::ColumnNotFound { suggestion: Some(ref s), .. } if s == "salary"
        ));
    }

    #[test]
    fn test_filter_wraps_lambda() {
        let l = lambda("e", |e| e.col("id").eq(1));
        let lowered = lower(LowerKind::Filter, &l, &employees()).unwrap();
        let Clause::Filter(Expression::Lambda { parameters, body }) = &lowered.clauses[0] else {
            panic!("expected filter lambda");
        };
        assert_eq!(parameters, &vec!["e".to_string()]);
        assert!(matches!(body.as_ref(), Expression::Binary { .. }));
    }

    #[test]
    fn test_filter_rejects_arithmetic_predicate() {
        let l = lambda("e", |e| e.col("salary") + lit(10));
        let err = lower(LowerKind::Filter, &l, &employees()).unwrap_err();
        assert!(matches!(err, RelqError::NonBooleanPredicate(_)));
    }

    #[test]
    fn test_arity_enforced_before_body() {
        let l = lambda2("l", "r", |l, _r| l.col("no_such"));
        let err = lower(LowerKind::Filter, &l, &employees()).unwrap_err();
        assert_eq!(err, RelqError::arity(1, 2));
    }

    #[test]
    fn test_extend_implicit_alias() {
        let l = lambda("e", |e| {
            SurfaceExpr::List(vec![
                named("gross", e.col("salary") + lit(10)),
                named("total", col("gross") + e.col("bonus")),
            ])
        });
        let lowered = lower(LowerKind::Extend, &l, &employees()).unwrap();
        assert_eq!(lowered.table.columns.len(), 6);
        assert_eq!(
            lowered.table.column("gross").unwrap().column_type,
            ColumnType::Unknown
        );
        let Clause::Extend(exprs) = &lowered.clauses[0] else {
            panic!("expected extend");
        };
        // the bare `gross` in the second entry resolves through the alias map
        let Expression::ComputedColumnAlias { expression, .. } = &exprs[1] else {
            panic!("expected computed alias");
        };
        let Expression::Lambda { body, .. } = expression.as_ref() else {
            panic!("expected lambda");
        };
        let Expression::Binary { left, .. } = body.as_ref() else {
            panic!("expected binary");
        };
        assert_eq!(
            left.unwrap_operand(),
            &Expression::column_alias("e", "gross")
        );
    }

    #[test]
    fn test_extend_duplicate_column() {
        let l = lambda("e", |e| named("salary", e.col("bonus")));
        let err = lower(LowerKind::Extend, &l, &employees()).unwrap_err();
        assert!(matches!(err, RelqError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_rename_removes_old_name() {
        let l = lambda("e", |e| named("pay", e.col("salary")));
        let lowered = lower(LowerKind::Rename, &l, &employees()).unwrap();
        assert!(lowered.table.validate_column("pay"));
        assert!(!lowered.table.validate_column("salary"));
        let Clause::Rename(exprs) = &lowered.clauses[0] else {
            panic!("expected rename");
        };
        assert_eq!(exprs[0], Expression::column_alias("pay", "salary"));
    }

    #[test]
    fn test_rename_chain_sees_earlier_entries() {
        let l = lambda("e", |_e| {
            SurfaceExpr::List(vec![
                named("pay", col("salary")),
                named("pay2", col("pay")),
            ])
        });
        let lowered = lower(LowerKind::Rename, &l, &employees()).unwrap();
        assert!(lowered.table.validate_column("pay2"));
        assert!(!lowered.table.validate_column("pay"));
        assert!(!lowered.table.validate_column("salary"));
        let Clause::Rename(exprs) = &lowered.clauses[0] else {
            panic!("expected rename");
        };
        assert_eq!(exprs[0], Expression::column_alias("pay", "salary"));
        assert_eq!(exprs[1], Expression::column_alias("pay2", "pay"));
    }

    #[test]
    fn test_fstring_lowers_to_string_concat() {
        let l = lambda("e", |e| {
            named("label", fstring(vec![text("emp-"), interp(e.col("id"))]))
        });
        let lowered = lower(LowerKind::Extend, &l, &employees()).unwrap();
        let Clause::Extend(exprs) = &lowered.clauses[0] else {
            panic!("expected extend");
        };
        let Expression::ComputedColumnAlias { expression, .. } = &exprs[0] else {
            panic!("expected computed alias");
        };
        let Expression::Lambda { body, .. } = expression.as_ref() else {
            panic!("expected lambda");
        };
        let Expression::Function {
            function,
            parameters,
        } = body.as_ref()
        else {
            panic!("expected function");
        };
        assert_eq!(*function, FunctionKind::StringConcat);
        assert_eq!(parameters[0], Expression::literal("emp-"));
        assert_eq!(parameters[1], Expression::column_alias("e", "id"));
    }

    #[test]
    fn test_fstring_format_spec_rejected() {
        let l = lambda("e", |e| {
            named("label", fstring(vec![interp_fmt(e.col("salary"), ".2f")]))
        });
        let err = lower(LowerKind::Extend, &l, &employees()).unwrap_err();
        assert!(matches!(err, RelqError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_if_else_lowers_to_conditional() {
        let l = lambda("e", |e| {
            named(
                "band",
                if_else(e.col("salary").gt(100), lit("high"), lit("low")),
            )
        });
        let lowered = lower(LowerKind::Extend, &l, &employees()).unwrap();
        let Clause::Extend(exprs) = &lowered.clauses[0] else {
            panic!("expected extend");
        };
        let Expression::ComputedColumnAlias { expression, .. } = &exprs[0] else {
            panic!("expected computed alias");
        };
        let Expression::Lambda { body, .. } = expression.as_ref() else {
            panic!("expected lambda");
        };
        let Expression::If { test, body, orelse } = body.as_ref() else {
            panic!("expected conditional");
        };
        assert!(matches!(test.as_ref(), Expression::Binary { .. }));
        assert_eq!(body.as_ref(), &Expression::literal("high"));
        assert_eq!(orelse.as_ref(), &Expression::literal("low"));
    }

    #[test]
    fn test_invalid_date_rejected_at_lowering() {
        let l = lambda("e", |e| e.col("salary").gt(date(2024, 2, 30)));
        let err = lower(LowerKind::Filter, &l, &employees()).unwrap_err();
        assert!(matches!(err, RelqError::InvalidValue(_)));
    }

    #[test]
    fn test_group_by_shapes() {
        let l = lambda("r", |r| {
            aggregate(vec![r.col("title")], vec![named("avg_sal", avg(r.col("salary")))])
        });
        let lowered = lower(LowerKind::GroupBy, &l, &employees()).unwrap();
        assert_eq!(lowered.clauses.len(), 1);
        let Clause::GroupBy(group) = &lowered.clauses[0] else {
            panic!("expected group_by");
        };
        assert_eq!(group.selections, vec![Expression::column("title")]);
        let Expression::ComputedColumnAlias { alias, expression } = &group.expressions[0] else {
            panic!("expected computed alias");
        };
        assert_eq!(alias, "avg_sal");
        assert!(matches!(expression.as_ref(), Expression::MapReduce { .. }));
        // result schema is keys plus aggregate outputs
        assert_eq!(lowered.table.columns.len(), 2);
    }

    #[test]
    fn test_group_by_having_appends_filter() {
        let l = lambda("r", |r| {
            aggregate_having(
                vec![r.col("title")],
                vec![named("avg_sal", avg(r.col("salary")))],
                col("avg_sal").gt(100),
            )
        });
        let lowered = lower(LowerKind::GroupBy, &l, &employees()).unwrap();
        assert_eq!(lowered.clauses.len(), 2);
        assert!(matches!(lowered.clauses[1], Clause::Filter(_)));
    }

    #[test]
    fn test_group_by_bad_shape() {
        let l = lambda("r", |r| r.col("title"));
        let err = lower(LowerKind::GroupBy, &l, &employees()).unwrap_err();
        assert!(matches!(err, RelqError::InvalidAggregateShape(_)));

        let l = lambda("r", |r| call_unnamed(r));
        let err = lower(LowerKind::GroupBy, &l, &employees()).unwrap_err();
        assert!(matches!(err, RelqError::InvalidAggregateShape(_)));
    }

    fn call_unnamed(r: crate::dsl::RowVar) -> SurfaceExpr {
        // aggregates must be `alias := fn(expr)`; a bare call is rejected
        aggregate(vec![r.col("title")], vec![avg(r.col("salary"))])
    }

    #[test]
    fn test_order_by_directions() {
        let l = lambda("e", |e| {
            SurfaceExpr::List(vec![-e.col("salary"), e.col("id")])
        });
        let lowered = lower(LowerKind::OrderBy, &l, &employees()).unwrap();
        let Clause::OrderBy(exprs) = &lowered.clauses[0] else {
            panic!("expected order_by");
        };
        assert_eq!(
            exprs[0],
            Expression::order_by(OrderDirection::Desc, Expression::column("salary"))
        );
        assert_eq!(
            exprs[1],
            Expression::order_by(OrderDirection::Asc, Expression::column("id"))
        );
    }

    #[test]
    fn test_join_condition() {
        let departments = Table::new(
            "departments",
            vec![
                Column::new("dept_id", ColumnType::Integer),
                Column::new("dept_name", ColumnType::String),
            ],
        );
        let l = lambda2("l", "r", |l, r| l.col("id").eq(r.col("dept_id")));
        let (on, joined) = lower_join_condition(&l, &employees(), &departments).unwrap();
        assert!(matches!(on, Expression::Lambda { .. }));
        assert_eq!(joined.name, "employees_departments");
        assert_eq!(joined.columns.len(), 6);
    }

    #[test]
    fn test_over_rejected_after_arity() {
        let l = lambda("e", |e| e.col("id"));
        let err = lower(LowerKind::Over, &l, &employees()).unwrap_err();
        assert!(matches!(err, RelqError::UnsupportedExpression(_)));
    }
}
