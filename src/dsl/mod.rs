//! Surface expression DSL.
//!
//! The builder accepts short predicates and projections written against row
//! proxies. They are data, not code: `lambda("e", |e| e.col("id").eq(1))`
//! builds an untyped surface tree which the lowerer translates into
//! metamodel expressions without evaluating anything. Operator overloading
//! covers arithmetic (`+ - * / %`), bitwise (`& |`), negation, and `!`;
//! comparisons and boolean connectives are methods since Rust cannot
//! overload `==` or `&&` to return a non-bool.

mod lower;

pub use lower::{LowerKind, Lowered, lower, lower_join_condition};

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// One segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Text(String),
    Interp {
        value: SurfaceExpr,
        format_spec: Option<String>,
    },
}

/// An untyped surface expression, mirroring the host constructs the lowerer
/// understands. Anything else simply cannot be built.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceExpr {
    /// `row.col` - attribute access on a row variable.
    Attribute { var: String, name: String },
    /// A bare identifier.
    Name(String),
    Int(i64),
    Str(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Date/datetime components that did not form a valid value; the
    /// lowerer rejects this with `InvalidValue`.
    InvalidDate(String),
    Compare {
        left: Box<SurfaceExpr>,
        op: CompareOp,
        right: Box<SurfaceExpr>,
    },
    Arith {
        left: Box<SurfaceExpr>,
        op: ArithOp,
        right: Box<SurfaceExpr>,
    },
    /// `a and b and c` / `a or b or c`; folded left-associatively.
    BoolChain {
        op: BoolChainOp,
        values: Vec<SurfaceExpr>,
    },
    Unary {
        op: SurfaceUnaryOp,
        operand: Box<SurfaceExpr>,
    },
    IfElse {
        test: Box<SurfaceExpr>,
        body: Box<SurfaceExpr>,
        orelse: Box<SurfaceExpr>,
    },
    List(Vec<SurfaceExpr>),
    /// `alias := expr` - a named expression.
    Named {
        alias: String,
        value: Box<SurfaceExpr>,
    },
    /// `fn(args...)` - a call into the function registry.
    Call {
        name: String,
        args: Vec<SurfaceExpr>,
    },
    /// An interpolated string.
    FString(Vec<FStringPart>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolChainOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceUnaryOp {
    Not,
    Plus,
    Minus,
}

/// A surface lambda: parameter names plus a body tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLambda {
    pub params: Vec<String>,
    pub body: SurfaceExpr,
}

/// A row variable proxy handed to lambda closures.
#[derive(Debug, Clone)]
pub struct RowVar {
    name: String,
}

impl RowVar {
    /// `row.col` - reference a column of this row.
    pub fn col(&self, name: impl Into<String>) -> SurfaceExpr {
        SurfaceExpr::Attribute {
            var: self.name.clone(),
            name: name.into(),
        }
    }
}

/// Build a single-parameter lambda.
pub fn lambda<B: Into<SurfaceExpr>>(param: &str, f: impl FnOnce(RowVar) -> B) -> SurfaceLambda {
    let row = RowVar {
        name: param.to_string(),
    };
    SurfaceLambda {
        params: vec![param.to_string()],
        body: f(row).into(),
    }
}

/// Build a two-parameter lambda (join conditions).
pub fn lambda2<B: Into<SurfaceExpr>>(
    left: &str,
    right: &str,
    f: impl FnOnce(RowVar, RowVar) -> B,
) -> SurfaceLambda {
    let l = RowVar {
        name: left.to_string(),
    };
    let r = RowVar {
        name: right.to_string(),
    };
    SurfaceLambda {
        params: vec![left.to_string(), right.to_string()],
        body: f(l, r).into(),
    }
}

// ==================== constructors ====================

/// A bare identifier. Resolves to a column reference, or through the
/// implicit-alias map when the name was introduced earlier in the same list.
pub fn col(name: impl Into<String>) -> SurfaceExpr {
    SurfaceExpr::Name(name.into())
}

/// A literal.
pub fn lit(value: impl Into<SurfaceExpr>) -> SurfaceExpr {
    value.into()
}

/// `alias := expr` - introduce a named expression.
pub fn named(alias: impl Into<String>, value: impl Into<SurfaceExpr>) -> SurfaceExpr {
    SurfaceExpr::Named {
        alias: alias.into(),
        value: Box::new(value.into()),
    }
}

/// A date literal, evaluated eagerly. Invalid components surface as an
/// `InvalidValue` error when the lambda is lowered.
pub fn date(year: i32, month: u32, day: u32) -> SurfaceExpr {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(d) => SurfaceExpr::Date(d),
        None => SurfaceExpr::InvalidDate(format!("{:04}-{:02}-{:02}", year, month, day)),
    }
}

/// A datetime literal, evaluated eagerly. Invalid components surface as an
/// `InvalidValue` error when the lambda is lowered.
pub fn datetime(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> SurfaceExpr {
    match NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, min, sec)) {
        Some(dt) => SurfaceExpr::DateTime(dt),
        None => SurfaceExpr::InvalidDate(format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            year, month, day, hour, min, sec
        )),
    }
}

/// `fn(args...)` against the function registry (resolved at lowering time).
pub fn call(name: impl Into<String>, args: Vec<SurfaceExpr>) -> SurfaceExpr {
    SurfaceExpr::Call {
        name: name.into(),
        args,
    }
}

/// `count(expr)`.
pub fn count(value: impl Into<SurfaceExpr>) -> SurfaceExpr {
    call("count", vec![value.into()])
}

/// `sum(expr)`.
pub fn sum(value: impl Into<SurfaceExpr>) -> SurfaceExpr {
    call("sum", vec![value.into()])
}

/// `avg(expr)`.
pub fn avg(value: impl Into<SurfaceExpr>) -> SurfaceExpr {
    call("avg", vec![value.into()])
}

/// The `aggregate(keys, aggs)` meta-call consumed by `group_by`.
pub fn aggregate(keys: Vec<SurfaceExpr>, aggs: Vec<SurfaceExpr>) -> SurfaceExpr {
    call(
        "aggregate",
        vec![SurfaceExpr::List(keys), SurfaceExpr::List(aggs)],
    )
}

/// The `aggregate(keys, aggs, having)` meta-call consumed by `group_by`.
pub fn aggregate_having(
    keys: Vec<SurfaceExpr>,
    aggs: Vec<SurfaceExpr>,
    having: impl Into<SurfaceExpr>,
) -> SurfaceExpr {
    call(
        "aggregate",
        vec![SurfaceExpr::List(keys), SurfaceExpr::List(aggs), having.into()],
    )
}

/// `b if t else e` - a conditional expression.
pub fn if_else(
    test: impl Into<SurfaceExpr>,
    body: impl Into<SurfaceExpr>,
    orelse: impl Into<SurfaceExpr>,
) -> SurfaceExpr {
    SurfaceExpr::IfElse {
        test: Box::new(test.into()),
        body: Box::new(body.into()),
        orelse: Box::new(orelse.into()),
    }
}

/// An interpolated string from parts.
pub fn fstring(parts: Vec<FStringPart>) -> SurfaceExpr {
    SurfaceExpr::FString(parts)
}

/// A literal segment of an interpolated string.
pub fn text(s: impl Into<String>) -> FStringPart {
    FStringPart::Text(s.into())
}

/// An interpolated segment.
pub fn interp(value: impl Into<SurfaceExpr>) -> FStringPart {
    FStringPart::Interp {
        value: value.into(),
        format_spec: None,
    }
}

/// An interpolated segment with a format spec (always rejected by lowering).
pub fn interp_fmt(value: impl Into<SurfaceExpr>, spec: impl Into<String>) -> FStringPart {
    FStringPart::Interp {
        value: value.into(),
        format_spec: Some(spec.into()),
    }
}

/// Ascending sort marker (unary plus).
pub fn asc(value: impl Into<SurfaceExpr>) -> SurfaceExpr {
    SurfaceExpr::Unary {
        op: SurfaceUnaryOp::Plus,
        operand: Box::new(value.into()),
    }
}

/// Descending sort marker (unary minus); `-row.col(...)` does the same.
pub fn desc(value: impl Into<SurfaceExpr>) -> SurfaceExpr {
    SurfaceExpr::Unary {
        op: SurfaceUnaryOp::Minus,
        operand: Box::new(value.into()),
    }
}

// ==================== comparison / boolean methods ====================

impl SurfaceExpr {
    fn compare(self, op: CompareOp, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        SurfaceExpr::Compare {
            left: Box::new(self),
            op,
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::Eq, right)
    }

    pub fn neq(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::NotEq, right)
    }

    pub fn lt(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::Lt, right)
    }

    pub fn lte(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::LtE, right)
    }

    pub fn gt(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::Gt, right)
    }

    pub fn gte(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::GtE, right)
    }

    pub fn is_in(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::In, right)
    }

    pub fn not_in(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::NotIn, right)
    }

    pub fn is(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::Is, right)
    }

    pub fn is_not(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.compare(CompareOp::IsNot, right)
    }

    /// `a and b`; chains flatten left-associatively.
    pub fn and(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.chain(BoolChainOp::And, right.into())
    }

    /// `a or b`; chains flatten left-associatively.
    pub fn or(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        self.chain(BoolChainOp::Or, right.into())
    }

    fn chain(self, op: BoolChainOp, right: SurfaceExpr) -> SurfaceExpr {
        match self {
            SurfaceExpr::BoolChain {
                op: existing,
                mut values,
            } if existing == op => {
                values.push(right);
                SurfaceExpr::BoolChain { op, values }
            }
            other => SurfaceExpr::BoolChain {
                op,
                values: vec![other, right],
            },
        }
    }

    /// `a ** b` - exponentiation.
    pub fn pow(self, right: impl Into<SurfaceExpr>) -> SurfaceExpr {
        SurfaceExpr::Arith {
            left: Box::new(self),
            op: ArithOp::Pow,
            right: Box::new(right.into()),
        }
    }
}

// ==================== operator overloading ====================

macro_rules! surface_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<SurfaceExpr>> std::ops::$trait<R> for SurfaceExpr {
            type Output = SurfaceExpr;
            fn $method(self, rhs: R) -> SurfaceExpr {
                SurfaceExpr::Arith {
                    left: Box::new(self),
                    op: $op,
                    right: Box::new(rhs.into()),
                }
            }
        }
    };
}

surface_binop!(Add, add, ArithOp::Add);
surface_binop!(Sub, sub, ArithOp::Sub);
surface_binop!(Mul, mul, ArithOp::Mul);
surface_binop!(Div, div, ArithOp::Div);
surface_binop!(Rem, rem, ArithOp::Mod);
surface_binop!(BitAnd, bitand, ArithOp::BitAnd);
surface_binop!(BitOr, bitor, ArithOp::BitOr);

impl std::ops::Neg for SurfaceExpr {
    type Output = SurfaceExpr;
    fn neg(self) -> SurfaceExpr {
        SurfaceExpr::Unary {
            op: SurfaceUnaryOp::Minus,
            operand: Box::new(self),
        }
    }
}

impl std::ops::Not for SurfaceExpr {
    type Output = SurfaceExpr;
    fn not(self) -> SurfaceExpr {
        SurfaceExpr::Unary {
            op: SurfaceUnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

// ==================== conversions ====================

impl From<i64> for SurfaceExpr {
    fn from(v: i64) -> Self {
        SurfaceExpr::Int(v)
    }
}

impl From<i32> for SurfaceExpr {
    fn from(v: i32) -> Self {
        SurfaceExpr::Int(v as i64)
    }
}

impl From<&str> for SurfaceExpr {
    fn from(v: &str) -> Self {
        SurfaceExpr::Str(v.to_string())
    }
}

impl From<String> for SurfaceExpr {
    fn from(v: String) -> Self {
        SurfaceExpr::Str(v)
    }
}

impl From<bool> for SurfaceExpr {
    fn from(v: bool) -> Self {
        SurfaceExpr::Bool(v)
    }
}

impl From<Vec<SurfaceExpr>> for SurfaceExpr {
    fn from(v: Vec<SurfaceExpr>) -> Self {
        SurfaceExpr::List(v)
    }
}

// ==================== dump ====================

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtE => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtE => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Pow => "**",
            ArithOp::BitAnd => "&",
            ArithOp::BitOr => "|",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for SurfaceExpr {
    /// Human-readable dump used by `UnsupportedExpression` errors.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceExpr::Attribute { var, name } => write!(f, "{}.{}", var, name),
            SurfaceExpr::Name(name) => write!(f, "{}", name),
            SurfaceExpr::Int(v) => write!(f, "{}", v),
            SurfaceExpr::Str(v) => write!(f, "'{}'", v),
            SurfaceExpr::Bool(v) => write!(f, "{}", v),
            SurfaceExpr::Date(v) => write!(f, "date({})", v),
            SurfaceExpr::DateTime(v) => write!(f, "datetime({})", v),
            SurfaceExpr::InvalidDate(v) => write!(f, "date({})", v),
            SurfaceExpr::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            SurfaceExpr::Arith { left, op, right } => write!(f, "{} {} {}", left, op, right),
            SurfaceExpr::BoolChain { op, values } => {
                let glue = match op {
                    BoolChainOp::And => " and ",
                    BoolChainOp::Or => " or ",
                };
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(glue))
            }
            SurfaceExpr::Unary { op, operand } => {
                let glyph = match op {
                    SurfaceUnaryOp::Not => "not ",
                    SurfaceUnaryOp::Plus => "+",
                    SurfaceUnaryOp::Minus => "-",
                };
                write!(f, "{}{}", glyph, operand)
            }
            SurfaceExpr::IfElse { test, body, orelse } => {
                write!(f, "{} if {} else {}", body, test, orelse)
            }
            SurfaceExpr::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            SurfaceExpr::Named { alias, value } => write!(f, "({} := {})", alias, value),
            SurfaceExpr::Call { name, args } => {
                let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name, parts.join(", "))
            }
            SurfaceExpr::FString(parts) => {
                write!(f, "f\"")?;
                for part in parts {
                    match part {
                        FStringPart::Text(s) => write!(f, "{}", s)?,
                        FStringPart::Interp { value, .. } => write!(f, "{{{}}}", value)?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}
