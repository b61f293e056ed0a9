//! Expression syntax tree.
//!
//! Expressions are plain data: parsing produces them, the join resolver fills
//! in the `resolved` slot of path expressions, and the renderer walks them
//! with exhaustive matches. Subqueries are referenced by index into the
//! owning query's subquery table rather than held inline, which keeps the
//! tree `Clone + PartialEq` and safe to share through the parse cache.

mod predicate;

pub use predicate::{ComparisonOp, Connective, InList, Predicate, Quantifier};

use crate::value::Value;
use smallvec::SmallVec;

/// A single node of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(PathExpression),
    Literal(Value),
    /// Named parameter reference, `:name`.
    Parameter(String),
    Function(FunctionExpression),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Case(CaseExpression),
    /// Reference into the owning query's subquery table.
    Subquery(SubqueryRef),
}

impl Expression {
    /// Whether this expression contains an aggregate function call. The
    /// aggregate property is resolved at parse time and carried on the
    /// function node, so this never inspects rendered text.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expression::Function(f) => f.aggregate || f.args.iter().any(Expression::is_aggregate),
            Expression::Arithmetic { left, right, .. } => {
                left.is_aggregate() || right.is_aggregate()
            }
            Expression::Case(c) => {
                c.whens.iter().any(|w| w.result.is_aggregate())
                    || c.otherwise.as_deref().is_some_and(Expression::is_aggregate)
            }
            _ => false,
        }
    }
}

/// Dotted path, each segment optionally carrying an array-index expression.
///
/// `resolved` starts out `None` and is filled in by the join resolver; a
/// resolved path with an empty tail renders as the bare join alias.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    pub segments: SmallVec<[PathSegment; 4]>,
    pub resolved: Option<ResolvedPath>,
}

impl PathExpression {
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathExpression {
            segments: names
                .into_iter()
                .map(|name| PathSegment {
                    name: name.into(),
                    index: None,
                })
                .collect(),
            resolved: None,
        }
    }

    /// The raw dotted form of the path, without index expressions.
    pub fn dotted(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&seg.name);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: String,
    /// Index sub-expression of a `base[index]` segment; may itself be an
    /// arbitrary path or parameter expression.
    pub index: Option<Box<Expression>>,
}

/// Join alias plus the trailing attribute names hanging off it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub alias: String,
    pub tail: SmallVec<[String; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub name: String,
    pub args: Vec<Expression>,
    /// Resolved at parse time for COUNT/AVG/SUM/MIN/MAX.
    pub aggregate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
        }
    }
}

/// `CASE WHEN ... THEN ... [ELSE ...] END`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpression {
    pub whens: Vec<WhenClause>,
    pub otherwise: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub condition: Predicate,
    pub result: Expression,
}

/// Index into the owning query core's subquery table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubqueryRef(pub(crate) usize);
