//! The primary dialect: a `->`-chained relational pipeline.
//!
//! A clause chain renders as `c1->c2->...->from(<runtime>)` where the
//! runtime name is supplied by the dialect. No whitespace is emitted between
//! operators except inside ` && ` and ` || `.

use crate::ast::{
    BinaryOp, Clause, Expression, FromSource, FunctionKind, GroupByExpr, JoinKind, Literal,
    OrderDirection, UnaryOp, Visitor,
};
use crate::error::{RelqError, RelqResult};
use crate::transpiler::Dialect;

const DIALECT: &str = "pure_relation";

/// Renderer for the primary dialect. The runtime name lands in the trailing
/// `->from(...)` terminator.
#[derive(Debug, Clone)]
pub struct PureRelationDialect {
    runtime: String,
}

impl PureRelationDialect {
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }
}

impl Default for PureRelationDialect {
    fn default() -> Self {
        Self::new("legendql::Runtime")
    }
}

impl Dialect for PureRelationDialect {
    fn name(&self) -> &'static str {
        DIALECT
    }

    fn render(&self, clauses: &[Clause]) -> RelqResult<String> {
        let mut renderer = PureRenderer;
        let mut parts = Vec::with_capacity(clauses.len() + 1);
        for clause in clauses {
            parts.push(clause.accept(&mut renderer)?);
        }
        parts.push(format!("from({})", self.runtime));
        Ok(parts.join("->"))
    }
}

struct PureRenderer;

impl PureRenderer {
    fn render_list(&mut self, expressions: &[Expression]) -> RelqResult<String> {
        let mut parts = Vec::with_capacity(expressions.len());
        for e in expressions {
            parts.push(e.accept(self)?);
        }
        Ok(parts.join(", "))
    }

    /// Render one side of a unary/binary application. The side is an
    /// `Operand` wrapper by construction; a wrapped binary whose operator
    /// binds looser than the enclosing one is parenthesized.
    fn render_operand(&mut self, side: &Expression, outer: u8) -> RelqResult<String> {
        let inner = side.unwrap_operand();
        let rendered = inner.accept(self)?;
        if let Expression::Binary { op, .. } = inner
            && op.precedence() < outer
        {
            return Ok(format!("({})", rendered));
        }
        Ok(rendered)
    }
}

fn glyph(op: BinaryOp) -> RelqResult<&'static str> {
    let g = match op {
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::LtE => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtE => ">=",
        BinaryOp::And => " && ",
        BinaryOp::Or => " || ",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::In
        | BinaryOp::NotIn
        | BinaryOp::Is
        | BinaryOp::IsNot
        | BinaryOp::BitAnd
        | BinaryOp::BitOr => {
            return Err(RelqError::UnsupportedOperator {
                operator: op.name().to_string(),
                dialect: DIALECT,
            });
        }
    };
    Ok(g)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Visitor for PureRenderer {
    type Output = RelqResult<String>;

    fn visit_integer_literal(&mut self, value: i64) -> Self::Output {
        Ok(value.to_string())
    }

    fn visit_string_literal(&mut self, value: &str) -> Self::Output {
        Ok(format!("'{}'", escape(value)))
    }

    fn visit_boolean_literal(&mut self, value: bool) -> Self::Output {
        Ok(if value { "true" } else { "false" }.to_string())
    }

    fn visit_date_literal(&mut self, literal: &Literal) -> Self::Output {
        match literal.iso_date() {
            Some(iso) => Ok(format!("%{}", iso)),
            None => Err(RelqError::InvalidValue(format!(
                "not a date literal: {:?}",
                literal
            ))),
        }
    }

    fn visit_column_ref(&mut self, name: &str) -> Self::Output {
        Ok(name.to_string())
    }

    fn visit_column_alias(&mut self, alias: &str, reference: &Expression) -> Self::Output {
        Ok(format!("${}.{}", alias, reference.accept(self)?))
    }

    fn visit_variable_alias(&mut self, alias: &str) -> Self::Output {
        Ok(format!("${}", alias))
    }

    fn visit_computed_column_alias(
        &mut self,
        alias: &str,
        expression: &Expression,
    ) -> Self::Output {
        Ok(format!("{}:{}", alias, expression.accept(self)?))
    }

    fn visit_operand(&mut self, expression: &Expression) -> Self::Output {
        expression.accept(self)
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Expression) -> Self::Output {
        // unary binds tighter than any binary operator
        let inner = self.render_operand(operand, u8::MAX)?;
        match op {
            UnaryOp::Not => Ok(format!("!{}", inner)),
        }
    }

    fn visit_binary(
        &mut self,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
    ) -> Self::Output {
        let g = glyph(op)?;
        let l = self.render_operand(left, op.precedence())?;
        let r = self.render_operand(right, op.precedence())?;
        Ok(format!("{}{}{}", l, g, r))
    }

    fn visit_function(
        &mut self,
        function: FunctionKind,
        parameters: &[Expression],
    ) -> Self::Output {
        // params[0] renders as the head; the rest feed the suffix
        let head = match parameters.first() {
            Some(h) => h.accept(self)?,
            None => String::new(),
        };
        let rest = self.render_list(&parameters[parameters.len().min(1)..])?;
        let suffix = match function {
            FunctionKind::Count => "->count()".to_string(),
            FunctionKind::Avg | FunctionKind::Average => "->avg()".to_string(),
            FunctionKind::Sum => "->sum()".to_string(),
            FunctionKind::Modulo => format!("->mod({})", rest),
            FunctionKind::Exponent => format!("->pow({})", rest),
            other => {
                return Err(RelqError::UnsupportedFunction {
                    function: other.name().to_string(),
                    dialect: DIALECT,
                });
            }
        };
        Ok(format!("{}{}", head, suffix))
    }

    fn visit_if(
        &mut self,
        test: &Expression,
        body: &Expression,
        orelse: &Expression,
    ) -> Self::Output {
        Ok(format!(
            "if({}, | {}, | {})",
            test.accept(self)?,
            body.accept(self)?,
            orelse.accept(self)?
        ))
    }

    fn visit_order_by(
        &mut self,
        direction: OrderDirection,
        expression: &Expression,
    ) -> Self::Output {
        let suffix = match direction {
            OrderDirection::Asc => "->ascending()",
            OrderDirection::Desc => "->descending()",
        };
        Ok(format!("~{}{}", expression.accept(self)?, suffix))
    }

    fn visit_lambda(&mut self, parameters: &[String], body: &Expression) -> Self::Output {
        let rendered = body.accept(self)?;
        if parameters.len() == 1 {
            Ok(format!("{} | {}", parameters[0], rendered))
        } else {
            Ok(format!("{{{} | {}}}", parameters.join(", "), rendered))
        }
    }

    fn visit_map_reduce(&mut self, map: &Expression, reduce: &Expression) -> Self::Output {
        Ok(format!("{} : {}", map.accept(self)?, reduce.accept(self)?))
    }

    fn visit_from(&mut self, source: &FromSource) -> Self::Output {
        match &source.schema {
            Some(schema) => Ok(format!(
                "#>{{{}.{}.{}}}#",
                source.database, schema, source.table
            )),
            None => Ok(format!("#>{{{}.{}}}#", source.database, source.table)),
        }
    }

    fn visit_selection(&mut self, expressions: &[Expression]) -> Self::Output {
        Ok(format!("select(~[{}])", self.render_list(expressions)?))
    }

    fn visit_filter(&mut self, expression: &Expression) -> Self::Output {
        Ok(format!("filter({})", expression.accept(self)?))
    }

    fn visit_extend(&mut self, expressions: &[Expression]) -> Self::Output {
        Ok(format!("extend(~[{}])", self.render_list(expressions)?))
    }

    fn visit_group_by(&mut self, group_by: &GroupByExpr) -> Self::Output {
        Ok(format!(
            "groupBy(~[{}], ~[{}])",
            self.render_list(&group_by.selections)?,
            self.render_list(&group_by.expressions)?
        ))
    }

    fn visit_distinct(&mut self, expressions: &[Expression]) -> Self::Output {
        Ok(format!("distinct(~[{}])", self.render_list(expressions)?))
    }

    fn visit_order_by_clause(&mut self, ordering: &[Expression]) -> Self::Output {
        Ok(format!("sort([{}])", self.render_list(ordering)?))
    }

    fn visit_limit(&mut self, value: i64) -> Self::Output {
        Ok(format!("limit({})", value))
    }

    fn visit_offset(&mut self, value: i64) -> Self::Output {
        Ok(format!("drop({})", value))
    }

    fn visit_rename(&mut self, aliases: &[Expression]) -> Self::Output {
        let mut parts = Vec::with_capacity(aliases.len());
        for entry in aliases {
            let Expression::ColumnAlias { alias, reference } = entry else {
                return Err(RelqError::UnsupportedExpression(format!(
                    "rename entries must be column aliases: {:?}",
                    entry
                )));
            };
            parts.push(format!("rename(~{}, ~{})", reference.accept(self)?, alias));
        }
        Ok(parts.join("->"))
    }

    fn visit_join(&mut self, from: &[Clause], kind: JoinKind, on: &Expression) -> Self::Output {
        let mut parts = Vec::with_capacity(from.len());
        for clause in from {
            parts.push(clause.accept(self)?);
        }
        let kind_name = match kind {
            JoinKind::Inner => "JoinKind.INNER",
            JoinKind::Left => "JoinKind.LEFT",
        };
        Ok(format!(
            "join({}, {}, {})",
            parts.join("->"),
            kind_name,
            on.accept(self)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression as E;

    fn render_expr(e: &Expression) -> RelqResult<String> {
        e.accept(&mut PureRenderer)
    }

    #[test]
    fn test_comparison_glyphs() {
        let e = E::binary(E::column_alias("e", "id"), BinaryOp::Eq, E::literal(1));
        assert_eq!(render_expr(&e).unwrap(), "$e.id==1");

        let e = E::binary(E::column("a"), BinaryOp::GtE, E::literal(10));
        assert_eq!(render_expr(&e).unwrap(), "a>=10");
    }

    #[test]
    fn test_logical_glyphs_keep_spaces() {
        let e = E::binary(
            E::binary(E::column("a"), BinaryOp::Eq, E::literal(1)),
            BinaryOp::And,
            E::binary(E::column("b"), BinaryOp::Eq, E::literal(2)),
        );
        assert_eq!(render_expr(&e).unwrap(), "a==1 && b==2");
    }

    #[test]
    fn test_or_inside_and_parenthesized() {
        let or = E::binary(
            E::binary(E::column("a"), BinaryOp::Eq, E::literal(1)),
            BinaryOp::Or,
            E::binary(E::column("b"), BinaryOp::Eq, E::literal(2)),
        );
        let e = E::binary(
            or,
            BinaryOp::And,
            E::binary(E::column("c"), BinaryOp::Eq, E::literal(3)),
        );
        assert_eq!(render_expr(&e).unwrap(), "(a==1 || b==2) && c==3");
    }

    #[test]
    fn test_add_inside_mul_parenthesized() {
        let add = E::binary(E::column("a"), BinaryOp::Add, E::literal(1));
        let e = E::binary(add, BinaryOp::Mul, E::literal(2));
        assert_eq!(render_expr(&e).unwrap(), "(a+1)*2");

        // tighter inside looser stays bare
        let mul = E::binary(E::column("a"), BinaryOp::Mul, E::literal(2));
        let e = E::binary(mul, BinaryOp::Add, E::literal(1));
        assert_eq!(render_expr(&e).unwrap(), "a*2+1");
    }

    #[test]
    fn test_not_parenthesizes_binary() {
        let e = E::unary(
            UnaryOp::Not,
            E::binary(E::column("a"), BinaryOp::Eq, E::literal(1)),
        );
        assert_eq!(render_expr(&e).unwrap(), "!(a==1)");
    }

    #[test]
    fn test_unsupported_operator() {
        let e = E::binary(E::column("a"), BinaryOp::In, E::literal(1));
        let err = render_expr(&e).unwrap_err();
        assert_eq!(
            err,
            RelqError::UnsupportedOperator {
                operator: "in".to_string(),
                dialect: "pure_relation",
            }
        );
    }

    #[test]
    fn test_string_escaping() {
        let e = E::literal("it's");
        assert_eq!(render_expr(&e).unwrap(), r"'it\'s'");
        let e = E::literal(r"a\b");
        assert_eq!(render_expr(&e).unwrap(), r"'a\\b'");
    }

    #[test]
    fn test_date_literal() {
        let e = E::Literal(Literal::Date(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        ));
        assert_eq!(render_expr(&e).unwrap(), "%2024-01-15");
    }

    #[test]
    fn test_function_suffixes() {
        let e = E::function(FunctionKind::Avg, vec![E::variable("r")]);
        assert_eq!(render_expr(&e).unwrap(), "$r->avg()");

        let e = E::function(FunctionKind::Modulo, vec![E::column("a"), E::literal(2)]);
        assert_eq!(render_expr(&e).unwrap(), "a->mod(2)");

        let e = E::function(FunctionKind::Exponent, vec![E::column("a"), E::literal(3)]);
        assert_eq!(render_expr(&e).unwrap(), "a->pow(3)");
    }

    #[test]
    fn test_unsupported_function() {
        let e = E::function(FunctionKind::Rank, vec![E::variable("r")]);
        let err = render_expr(&e).unwrap_err();
        assert!(matches!(err, RelqError::UnsupportedFunction { .. }));
    }

    #[test]
    fn test_lambda_forms() {
        let one = E::lambda(
            vec!["e".to_string()],
            E::binary(E::column_alias("e", "id"), BinaryOp::Eq, E::literal(1)),
        );
        assert_eq!(render_expr(&one).unwrap(), "e | $e.id==1");

        let two = E::lambda(
            vec!["l".to_string(), "r".to_string()],
            E::binary(
                E::column_alias("l", "dept"),
                BinaryOp::Eq,
                E::column_alias("r", "id"),
            ),
        );
        assert_eq!(render_expr(&two).unwrap(), "{l, r | $l.dept==$r.id}");
    }

    #[test]
    fn test_if_form() {
        let e = E::If {
            test: Box::new(E::binary(E::column("a"), BinaryOp::Gt, E::literal(0))),
            body: Box::new(E::literal(1)),
            orelse: Box::new(E::literal(0)),
        };
        assert_eq!(render_expr(&e).unwrap(), "if(a>0, | 1, | 0)");
    }

    #[test]
    fn test_clause_chain_and_terminator() {
        let clauses = vec![
            Clause::from_source("local::DB", "t", None),
            Clause::Selection(vec![E::column("id")]),
            Clause::Limit(10),
            Clause::Offset(5),
        ];
        let rendered = PureRelationDialect::default().render(&clauses).unwrap();
        assert_eq!(
            rendered,
            "#>{local::DB.t}#->select(~[id])->limit(10)->drop(5)->from(legendql::Runtime)"
        );
    }

    #[test]
    fn test_from_with_schema() {
        let clauses = vec![Clause::from_source(
            "local::DB",
            "reviews",
            Some("hr".to_string()),
        )];
        let rendered = PureRelationDialect::default().render(&clauses).unwrap();
        assert_eq!(rendered, "#>{local::DB.hr.reviews}#->from(legendql::Runtime)");
    }

    #[test]
    fn test_rename_chain() {
        let clauses = vec![Clause::Rename(vec![
            E::column_alias("pay", "salary"),
            E::column_alias("label", "title"),
        ])];
        let rendered = PureRelationDialect::default().render(&clauses).unwrap();
        assert_eq!(
            rendered,
            "rename(~salary, ~pay)->rename(~title, ~label)->from(legendql::Runtime)"
        );
    }

    #[test]
    fn test_sort_directions() {
        let clauses = vec![Clause::OrderBy(vec![
            E::order_by(OrderDirection::Desc, E::column("salary")),
            E::order_by(OrderDirection::Asc, E::column("id")),
        ])];
        let rendered = PureRelationDialect::default().render(&clauses).unwrap();
        assert_eq!(
            rendered,
            "sort([~salary->descending(), ~id->ascending()])->from(legendql::Runtime)"
        );
    }

    #[test]
    fn test_custom_runtime_name() {
        let clauses = vec![Clause::from_source("local::DB", "t", None)];
        let rendered = PureRelationDialect::new("my::Runtime")
            .render(&clauses)
            .unwrap();
        assert_eq!(rendered, "#>{local::DB.t}#->from(my::Runtime)");
    }
}
