//! Defines the AST for SQL expressions.

use crate::query::ast::select::Select;
use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or table identifier, e.g., `users` or `users.id`.
    Identifier(Ident),

    /// A bound value, rendered as a positional placeholder.
    Value(Value),

    /// A fragment emitted verbatim, e.g. `1` in `SELECT 1` or `1 = 0`.
    Raw(String),

    /// A binary comparison, e.g., `column = 'value'`.
    BinaryOp(Box<BinaryOp>),

    /// Operands joined by one logical operator, rendered as one group.
    Logical {
        op: LogicalOperator,
        operands: Vec<Expr>,
    },

    /// A function call, e.g., `COUNT(*)` or `LOWER(name)`.
    FunctionCall(FunctionCall),

    /// `CAST(expr AS type)` with a dialect-specific type name.
    Cast {
        expr: Box<Expr>,
        data_type: CastType,
    },

    /// `expr [NOT] IN (a, b, ...)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// `expr [NOT] BETWEEN low AND high`
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// `expr IS [NOT] NULL`
    IsNull { expr: Box<Expr>, negated: bool },

    /// `EXISTS (subquery)`
    Exists(Box<Select>),

    /// `expr [NOT] IN (subquery)`
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Select>,
        negated: bool,
    },

    /// A scalar sub-select, e.g. `(SELECT COUNT(*) FROM ...)`.
    Subquery(Box<Select>),

    /// Scalar text extracted from a JSON row source. Without a key the
    /// whole matched value is extracted; with a key, the named member. The
    /// key is sent as a parameter.
    JsonValue {
        source: String,
        key: Option<String>,
    },

    /// Length of the JSON array held by `expr`.
    JsonArrayLength(Box<Expr>),

    /// A date/time component of `expr`.
    DatePart { part: DatePart, expr: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub qualifier: Option<String>, // e.g., the 'users' in 'users.id'
    pub name: String,              // e.g., the 'id' in 'users.id'
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub wildcard: bool, // represents the '*' in 'COUNT(*)'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,      // =
    NotEq,   // !=
    Lt,      // <
    LtEq,    // <=
    Gt,      // >
    GtEq,    // >=
    Like,    // LIKE
    NotLike, // NOT LIKE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Numeric,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Week,
    Day,
    Weekday,
    Hour,
    Minute,
    Second,
}

impl Expr {
    /// Groups `operands` under `op`, collapsing a single operand to itself.
    pub fn logical(op: LogicalOperator, mut operands: Vec<Expr>) -> Option<Expr> {
        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(Expr::Logical { op, operands }),
        }
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    pub fn cast(expr: Expr, data_type: CastType) -> Expr {
        Expr::Cast {
            expr: Box::new(expr),
            data_type,
        }
    }
}

impl LogicalOperator {
    pub fn keyword(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}
