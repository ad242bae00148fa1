//! SQL `SELECT` lowering.
//!
//! A restricted grammar: one plain SELECT over one table, bare or aliased
//! projection items, a WHERE predicate of comparisons and boolean
//! connectives, column-only ORDER BY, and integer-literal LIMIT/OFFSET.
//! Everything else is rejected before any clause is produced. The resulting
//! clauses appear in the canonical order From, Selection, Filter, OrderBy,
//! Limit, Offset.

use sqlparser::ast as sql;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::ast::{BinaryOp, Clause, Expression, OrderDirection, UnaryOp};
use crate::error::{RelqError, RelqResult};
use crate::query::Query;
use crate::schema::{Column, ColumnType, Database};

/// Lower a SQL SELECT into a query bound to `database`.
pub fn from_sql(database: Database, text: &str) -> RelqResult<Query> {
    let statements = Parser::parse_sql(&GenericDialect {}, text)
        .map_err(|e| RelqError::sql_parse(text, e))?;
    let [statement] = statements.as_slice() else {
        return Err(RelqError::UnsupportedSqlFeature(
            "expected exactly one statement".to_string(),
        ));
    };
    let sql::Statement::Query(outer) = statement else {
        return Err(RelqError::UnsupportedSqlFeature(
            "only SELECT statements are supported".to_string(),
        ));
    };
    if outer.with.is_some() {
        return Err(RelqError::UnsupportedSqlFeature(
            "WITH is not supported".to_string(),
        ));
    }
    let sql::SetExpr::Select(select) = outer.body.as_ref() else {
        return Err(RelqError::UnsupportedSqlFeature(
            "only plain SELECT bodies are supported".to_string(),
        ));
    };
    if select.distinct.is_some() {
        return Err(RelqError::UnsupportedSqlFeature(
            "DISTINCT is not supported in SQL input".to_string(),
        ));
    }
    if select.having.is_some() || has_group_by(select) {
        return Err(RelqError::UnsupportedSqlFeature(
            "GROUP BY / HAVING are not supported in SQL input".to_string(),
        ));
    }

    let table_name = extract_table(select)?;
    let mut query = Query::from_table(database, &table_name)?;

    lower_projection(&mut query, select)?;

    if let Some(predicate) = &select.selection {
        query.push(Clause::Filter(lower_expr(predicate)?));
    }

    if let Some(order_by) = &outer.order_by {
        query.push(lower_order_by(order_by)?);
    }

    if let Some(limit_clause) = &outer.limit_clause {
        lower_limit(&mut query, limit_clause)?;
    }

    Ok(query)
}

fn has_group_by(select: &sql::Select) -> bool {
    match &select.group_by {
        sql::GroupByExpr::Expressions(exprs, modifiers) => {
            !exprs.is_empty() || !modifiers.is_empty()
        }
        sql::GroupByExpr::All(_) => true,
    }
}

fn extract_table(select: &sql::Select) -> RelqResult<String> {
    let [table_with_joins] = select.from.as_slice() else {
        return Err(RelqError::UnsupportedSqlFeature(
            "exactly one FROM table is required".to_string(),
        ));
    };
    if !table_with_joins.joins.is_empty() {
        return Err(RelqError::UnsupportedSqlFeature(
            "JOIN is not supported in SQL input".to_string(),
        ));
    }
    let sql::TableFactor::Table { name, .. } = &table_with_joins.relation else {
        return Err(RelqError::UnsupportedSqlFeature(
            "complex table expressions are not supported".to_string(),
        ));
    };
    // `schema.table` resolves by its table part; the schema binding comes
    // from the catalog, not the SQL text
    let dotted = name.to_string();
    Ok(dotted
        .rsplit('.')
        .next()
        .unwrap_or(dotted.as_str())
        .to_string())
}

fn lower_projection(query: &mut Query, select: &sql::Select) -> RelqResult<()> {
    let mut exprs = Vec::with_capacity(select.projection.len());
    let mut columns = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        match item {
            sql::SelectItem::UnnamedExpr(sql::Expr::Identifier(ident)) => {
                let col = query
                    .table
                    .column(&ident.value)
                    .cloned()
                    .ok_or_else(|| query.table.column_not_found(&ident.value))?;
                columns.push(col);
                exprs.push(Expression::column(ident.value.clone()));
            }
            sql::SelectItem::ExprWithAlias { expr, alias } => {
                columns.push(Column::new(alias.value.clone(), ColumnType::Unknown));
                exprs.push(Expression::computed(
                    alias.value.clone(),
                    lower_expr(expr)?,
                ));
            }
            sql::SelectItem::Wildcard(_) | sql::SelectItem::QualifiedWildcard(..) => {
                return Err(RelqError::UnsupportedSqlFeature(
                    "SELECT * is not supported".to_string(),
                ));
            }
            sql::SelectItem::UnnamedExpr(other) => {
                return Err(RelqError::UnsupportedSqlFeature(format!(
                    "unaliased projection expression: {}",
                    other
                )));
            }
        }
    }
    query.push(Clause::Selection(exprs));
    let mut table = query.table.clone();
    table.columns = columns;
    query.update_table(table);
    Ok(())
}

fn lower_expr(expr: &sql::Expr) -> RelqResult<Expression> {
    match expr {
        sql::Expr::Identifier(ident) => Ok(Expression::column(ident.value.clone())),
        sql::Expr::CompoundIdentifier(parts) => {
            let column = parts
                .last()
                .map(|i| i.value.clone())
                .unwrap_or_default();
            Ok(Expression::column(column))
        }
        sql::Expr::Value(value) => lower_value(&value.value),
        sql::Expr::Nested(inner) => lower_expr(inner),
        sql::Expr::UnaryOp {
            op: sql::UnaryOperator::Not,
            expr,
        } => Ok(Expression::unary(UnaryOp::Not, lower_expr(expr)?)),
        sql::Expr::UnaryOp {
            op: sql::UnaryOperator::Minus,
            expr,
        } => match lower_expr(expr)? {
            Expression::Literal(crate::ast::Literal::Integer(n)) => Ok(Expression::literal(-n)),
            _ => Err(RelqError::UnsupportedSqlFeature(format!(
                "unary minus on non-integer: {}",
                expr
            ))),
        },
        sql::Expr::BinaryOp { left, op, right } => Ok(Expression::binary(
            lower_expr(left)?,
            map_operator(op)?,
            lower_expr(right)?,
        )),
        other => Err(RelqError::UnsupportedSqlFeature(format!(
            "unsupported expression: {}",
            other
        ))),
    }
}

fn lower_value(value: &sql::Value) -> RelqResult<Expression> {
    match value {
        sql::Value::Number(text, _) => text
            .parse::<i64>()
            .map(Expression::literal)
            .map_err(|_| RelqError::InvalidValue(format!("non-integer number: {}", text))),
        sql::Value::SingleQuotedString(s) | sql::Value::DoubleQuotedString(s) => {
            Ok(Expression::literal(s.as_str()))
        }
        sql::Value::Boolean(b) => Ok(Expression::literal(*b)),
        other => Err(RelqError::UnsupportedSqlFeature(format!(
            "unsupported literal: {}",
            other
        ))),
    }
}

fn map_operator(op: &sql::BinaryOperator) -> RelqResult<BinaryOp> {
    match op {
        sql::BinaryOperator::Eq => Ok(BinaryOp::Eq),
        sql::BinaryOperator::NotEq => Ok(BinaryOp::NotEq),
        sql::BinaryOperator::Lt => Ok(BinaryOp::Lt),
        sql::BinaryOperator::LtEq => Ok(BinaryOp::LtE),
        sql::BinaryOperator::Gt => Ok(BinaryOp::Gt),
        sql::BinaryOperator::GtEq => Ok(BinaryOp::GtE),
        sql::BinaryOperator::And => Ok(BinaryOp::And),
        sql::BinaryOperator::Or => Ok(BinaryOp::Or),
        sql::BinaryOperator::Plus => Ok(BinaryOp::Add),
        sql::BinaryOperator::Minus => Ok(BinaryOp::Sub),
        sql::BinaryOperator::Multiply => Ok(BinaryOp::Mul),
        sql::BinaryOperator::Divide => Ok(BinaryOp::Div),
        other => Err(RelqError::UnsupportedOperator {
            operator: other.to_string(),
            dialect: "sql",
        }),
    }
}

fn lower_order_by(order_by: &sql::OrderBy) -> RelqResult<Clause> {
    let sql::OrderByKind::Expressions(entries) = &order_by.kind else {
        return Err(RelqError::UnsupportedSqlFeature(
            "ORDER BY ALL is not supported".to_string(),
        ));
    };
    let mut exprs = Vec::with_capacity(entries.len());
    for entry in entries {
        let sql::Expr::Identifier(ident) = &entry.expr else {
            return Err(RelqError::UnsupportedSqlFeature(format!(
                "ORDER BY supports columns only: {}",
                entry.expr
            )));
        };
        let direction = if entry.options.asc == Some(false) {
            OrderDirection::Desc
        } else {
            OrderDirection::Asc
        };
        exprs.push(Expression::order_by(
            direction,
            Expression::column(ident.value.clone()),
        ));
    }
    Ok(Clause::OrderBy(exprs))
}

fn lower_limit(query: &mut Query, limit_clause: &sql::LimitClause) -> RelqResult<()> {
    let sql::LimitClause::LimitOffset {
        limit,
        offset,
        limit_by,
    } = limit_clause
    else {
        return Err(RelqError::UnsupportedSqlFeature(
            "unsupported LIMIT form".to_string(),
        ));
    };
    if !limit_by.is_empty() {
        return Err(RelqError::UnsupportedSqlFeature(
            "LIMIT BY is not supported".to_string(),
        ));
    }
    if let Some(expr) = limit {
        query.push(Clause::Limit(int_literal(expr)?));
    }
    if let Some(offset) = offset {
        query.push(Clause::Offset(int_literal(&offset.value)?));
    }
    Ok(())
}

fn int_literal(expr: &sql::Expr) -> RelqResult<i64> {
    match lower_expr(expr)? {
        Expression::Literal(crate::ast::Literal::Integer(n)) => Ok(n),
        _ => Err(RelqError::UnsupportedSqlFeature(format!(
            "LIMIT/OFFSET must be integer literals: {}",
            expr
        ))),
    }
}
