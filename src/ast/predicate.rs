use super::{Expression, SubqueryRef};

/// A boolean restriction tree.
///
/// Negation is a uniform flag on every variant, including `Exists`; there is
/// no wrapper node, so double negation cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// AND/OR group with an ordered child list. A freshly created compound
    /// has zero children and renders as nothing.
    Compound {
        connective: Connective,
        children: Vec<Predicate>,
        negated: bool,
    },
    Comparison {
        op: ComparisonOp,
        quantifier: Quantifier,
        left: Expression,
        right: Expression,
        negated: bool,
    },
    Between {
        left: Expression,
        start: Expression,
        end: Expression,
        negated: bool,
    },
    Like {
        left: Expression,
        pattern: Expression,
        case_sensitive: bool,
        escape: Option<char>,
        negated: bool,
    },
    In {
        left: Expression,
        values: InList,
        negated: bool,
    },
    IsNull {
        left: Expression,
        negated: bool,
    },
    IsEmpty {
        left: Expression,
        negated: bool,
    },
    MemberOf {
        left: Expression,
        collection: Expression,
        negated: bool,
    },
    Exists {
        subquery: SubqueryRef,
        negated: bool,
    },
}

impl Predicate {
    /// Builds a compound, collapsing a single child to itself.
    pub fn compound(connective: Connective, mut children: Vec<Predicate>) -> Predicate {
        if children.len() == 1 {
            children.pop().unwrap()
        } else {
            Predicate::Compound {
                connective,
                children,
                negated: false,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub const fn as_str(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
        }
    }
}

/// Subquery comparison quantifier, `>= ALL(...)` / `>= ANY(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quantifier {
    #[default]
    None,
    All,
    Any,
}

/// Right-hand side of an `IN` restriction.
#[derive(Debug, Clone, PartialEq)]
pub enum InList {
    /// A single collection-valued parameter, rendered `IN (:name)`.
    Parameter(String),
    /// Explicit item expressions, rendered `IN (a, b, ...)`.
    Items(Vec<Expression>),
    Subquery(SubqueryRef),
}
