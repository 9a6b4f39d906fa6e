//! Expression values carried inside plan nodes
//!
//! Plan nodes store the expressions the planner attached to them (scan
//! filters, projection lists, join conditions, sort keys). This layer never
//! evaluates them; the only thing it interprets is the column references
//! they read, which column resolution binds to positions in a child node's
//! output row.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Literal value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

// Floats compare and hash by bit pattern so two plans carrying the same
// literal are structurally equal.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Null, Literal::Null) => true,
            (Literal::Boolean(a), Literal::Boolean(b)) => a == b,
            (Literal::Integer(a), Literal::Integer(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::String(a), Literal::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Literal::Null => 0u8.hash(state),
            Literal::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Literal::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Literal::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            Literal::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::String(s) => write!(f, "'{}'", s),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    Or,
    // String
    Like,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Like => "LIKE",
        };
        write!(f, "{}", sym)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Avg => "avg",
            AggregateFunc::Min => "min",
            AggregateFunc::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// Column reference (optionally qualified with a table name)
///
/// `index` is absent until column resolution binds the reference to a
/// position in the input row produced by a child node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Qualifying table name, if the reference was written qualified
    pub table: Option<String>,
    /// Referenced column name or alias
    pub column: String,
    /// Zero-based position in the input row, bound during resolution
    pub index: Option<usize>,
}

impl ColumnRef {
    /// Create an unqualified, unbound reference
    pub fn unqualified(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
            index: None,
        }
    }

    /// Create a qualified, unbound reference
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
            index: None,
        }
    }

    /// Create a reference already bound to an input position
    pub fn bound(table: impl Into<String>, column: impl Into<String>, index: usize) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
            index: Some(index),
        }
    }

    /// The reference as written, e.g. `t.a` or `a`
    pub fn qualified_name(&self) -> String {
        match &self.table {
            Some(t) => format!("{}.{}", t, self.column),
            None => self.column.clone(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// Column reference
    Column(ColumnRef),
    /// Literal value
    Literal(Literal),
    /// Unary operation
    Unary { op: UnaryOp, expr: Box<Expression> },
    /// Binary operation
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    /// Aggregate call; `arg` of `None` means `count(*)`
    Aggregate {
        func: AggregateFunc,
        arg: Option<Box<Expression>>,
        distinct: bool,
    },
}

impl Expression {
    /// Shorthand for a column reference expression
    pub fn column(col: ColumnRef) -> Self {
        Expression::Column(col)
    }

    /// Shorthand for a literal expression
    pub fn literal(lit: Literal) -> Self {
        Expression::Literal(lit)
    }

    /// Shorthand for a binary expression
    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Collect every column reference this expression reads
    pub fn column_refs(&self) -> Vec<&ColumnRef> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, refs: &mut Vec<&'a ColumnRef>) {
        match self {
            Expression::Column(col) => refs.push(col),
            Expression::Literal(_) => {}
            Expression::Unary { expr, .. } => expr.collect_refs(refs),
            Expression::Binary { left, right, .. } => {
                left.collect_refs(refs);
                right.collect_refs(refs);
            }
            Expression::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.collect_refs(refs);
                }
            }
        }
    }

    /// Apply a fallible binding function to every column reference, in
    /// left-to-right order
    pub fn try_bind_columns<E>(
        &mut self,
        bind: &mut impl FnMut(&mut ColumnRef) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            Expression::Column(col) => bind(col),
            Expression::Literal(_) => Ok(()),
            Expression::Unary { expr, .. } => expr.try_bind_columns(bind),
            Expression::Binary { left, right, .. } => {
                left.try_bind_columns(bind)?;
                right.try_bind_columns(bind)
            }
            Expression::Aggregate { arg, .. } => match arg {
                Some(arg) => arg.try_bind_columns(bind),
                None => Ok(()),
            },
        }
    }

    /// Check that every column reference has a bound input position
    pub fn is_resolved(&self) -> bool {
        self.column_refs().iter().all(|c| c.index.is_some())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(col) => write!(f, "{}", col),
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Unary { op, expr } => match op {
                UnaryOp::Not => write!(f, "NOT {}", expr),
                UnaryOp::Neg => write!(f, "-{}", expr),
            },
            Expression::Binary { left, op, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::Aggregate {
                func,
                arg,
                distinct,
            } => {
                let prefix = if *distinct { "DISTINCT " } else { "" };
                match arg {
                    Some(arg) => write!(f, "{}({}{})", func, prefix, arg),
                    None => write!(f, "{}(*)", func),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_display() {
        assert_eq!(ColumnRef::unqualified("a").to_string(), "a");
        assert_eq!(ColumnRef::qualified("t", "a").to_string(), "t.a");
        assert_eq!(ColumnRef::bound("t", "a", 3).to_string(), "t.a");
    }

    #[test]
    fn test_expression_display() {
        let expr = Expression::binary(
            Expression::column(ColumnRef::qualified("users", "age")),
            BinaryOp::Gt,
            Expression::literal(Literal::Integer(18)),
        );
        assert_eq!(expr.to_string(), "(users.age > 18)");

        let agg = Expression::Aggregate {
            func: AggregateFunc::Count,
            arg: None,
            distinct: false,
        };
        assert_eq!(agg.to_string(), "count(*)");

        let agg = Expression::Aggregate {
            func: AggregateFunc::Sum,
            arg: Some(Box::new(Expression::column(ColumnRef::unqualified(
                "total",
            )))),
            distinct: true,
        };
        assert_eq!(agg.to_string(), "sum(DISTINCT total)");
    }

    #[test]
    fn test_collect_and_bind_refs() {
        let mut expr = Expression::binary(
            Expression::column(ColumnRef::qualified("t", "a")),
            BinaryOp::And,
            Expression::Unary {
                op: UnaryOp::Not,
                expr: Box::new(Expression::column(ColumnRef::unqualified("b"))),
            },
        );

        assert_eq!(expr.column_refs().len(), 2);
        assert!(!expr.is_resolved());

        expr.try_bind_columns::<()>(&mut |col| {
            col.index = Some(if col.column == "a" { 0 } else { 1 });
            Ok(())
        })
        .unwrap();

        assert!(expr.is_resolved());
        let refs = expr.column_refs();
        assert_eq!(refs[0].index, Some(0));
        assert_eq!(refs[1].index, Some(1));
    }

    #[test]
    fn test_bind_stops_on_error() {
        let mut expr = Expression::binary(
            Expression::column(ColumnRef::unqualified("a")),
            BinaryOp::Add,
            Expression::column(ColumnRef::unqualified("b")),
        );

        let result = expr.try_bind_columns(&mut |col| {
            if col.column == "b" {
                Err("unknown column")
            } else {
                col.index = Some(0);
                Ok(())
            }
        });
        assert_eq!(result, Err("unknown column"));
    }

    #[test]
    fn test_float_literal_equality() {
        assert_eq!(Literal::Float(1.5), Literal::Float(1.5));
        assert_ne!(Literal::Float(0.0), Literal::Float(-0.0));
        assert_ne!(Literal::Float(1.5), Literal::Integer(1));
    }
}
