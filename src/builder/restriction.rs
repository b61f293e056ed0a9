//! Fluent restriction building.
//!
//! A restriction builder is opened with the left-hand expression already
//! parsed; every terminal method closes the builder, registers the finished
//! predicate with its sink and hands back the surface it was opened from.
//! Values bind as generated positional parameters (`:param_0`, ...),
//! `*_expression` variants parse their argument as scalar expression text.

use super::chain::ChainRef;
use super::subquery::{SubqueryBuilder, SubqueryFinish};
use super::{CoreRef, PredicateSink};
use crate::ast::{ComparisonOp, Expression, InList, Predicate, Quantifier};
use crate::error::Result;
use crate::parser::parse_scalar;
use crate::value::Value;

pub struct RestrictionBuilder<R> {
    result: R,
    core: CoreRef,
    sink: PredicateSink,
    left: Expression,
    chain: ChainRef,
    token: usize,
}

impl<R> RestrictionBuilder<R> {
    pub(crate) fn new(
        result: R,
        core: CoreRef,
        sink: PredicateSink,
        left: Expression,
        chain: ChainRef,
        token: usize,
    ) -> Self {
        RestrictionBuilder {
            result,
            core,
            sink,
            left,
            chain,
            token,
        }
    }

    fn close(self, predicate: Predicate) -> Result<R> {
        self.chain.borrow_mut().end(self.token)?;
        self.sink.push(predicate);
        Ok(self.result)
    }

    fn bind(&self, value: Value) -> Expression {
        let params = self.core.borrow().params.clone();
        let name = params.borrow_mut().add_positional(value);
        Expression::Parameter(name)
    }

    fn compare(self, op: ComparisonOp, right: Expression, negated: bool) -> Result<R> {
        let left = self.left.clone();
        self.close(Predicate::Comparison {
            op,
            quantifier: Quantifier::None,
            left,
            right,
            negated,
        })
    }

    // ==================== comparisons ====================

    pub fn eq(self, value: impl Into<Value>) -> Result<R> {
        let right = self.bind(value.into());
        self.compare(ComparisonOp::Eq, right, false)
    }

    pub fn not_eq(self, value: impl Into<Value>) -> Result<R> {
        let right = self.bind(value.into());
        self.compare(ComparisonOp::Eq, right, true)
    }

    pub fn gt(self, value: impl Into<Value>) -> Result<R> {
        let right = self.bind(value.into());
        self.compare(ComparisonOp::Gt, right, false)
    }

    pub fn ge(self, value: impl Into<Value>) -> Result<R> {
        let right = self.bind(value.into());
        self.compare(ComparisonOp::Ge, right, false)
    }

    pub fn lt(self, value: impl Into<Value>) -> Result<R> {
        let right = self.bind(value.into());
        self.compare(ComparisonOp::Lt, right, false)
    }

    pub fn le(self, value: impl Into<Value>) -> Result<R> {
        let right = self.bind(value.into());
        self.compare(ComparisonOp::Le, right, false)
    }

    pub fn eq_expression(self, text: &str) -> Result<R> {
        let right = parse_scalar(text)?;
        self.compare(ComparisonOp::Eq, right, false)
    }

    pub fn not_eq_expression(self, text: &str) -> Result<R> {
        let right = parse_scalar(text)?;
        self.compare(ComparisonOp::Eq, right, true)
    }

    pub fn gt_expression(self, text: &str) -> Result<R> {
        let right = parse_scalar(text)?;
        self.compare(ComparisonOp::Gt, right, false)
    }

    pub fn ge_expression(self, text: &str) -> Result<R> {
        let right = parse_scalar(text)?;
        self.compare(ComparisonOp::Ge, right, false)
    }

    pub fn lt_expression(self, text: &str) -> Result<R> {
        let right = parse_scalar(text)?;
        self.compare(ComparisonOp::Lt, right, false)
    }

    pub fn le_expression(self, text: &str) -> Result<R> {
        let right = parse_scalar(text)?;
        self.compare(ComparisonOp::Le, right, false)
    }

    // ==================== between ====================

    pub fn between(self, start: impl Into<Value>) -> BetweenBuilder<R> {
        let start = self.bind(start.into());
        BetweenBuilder {
            inner: self,
            start,
            negated: false,
        }
    }

    pub fn not_between(self, start: impl Into<Value>) -> BetweenBuilder<R> {
        let start = self.bind(start.into());
        BetweenBuilder {
            inner: self,
            start,
            negated: true,
        }
    }

    pub fn between_expression(self, text: &str) -> Result<BetweenBuilder<R>> {
        let start = parse_scalar(text)?;
        Ok(BetweenBuilder {
            inner: self,
            start,
            negated: false,
        })
    }

    // ==================== like ====================

    fn like_inner(
        self,
        pattern: Expression,
        case_sensitive: bool,
        escape: Option<char>,
        negated: bool,
    ) -> Result<R> {
        let left = self.left.clone();
        self.close(Predicate::Like {
            left,
            pattern,
            case_sensitive,
            escape,
            negated,
        })
    }

    pub fn like(self, pattern: impl Into<String>) -> Result<R> {
        let pattern = self.bind(Value::Text(pattern.into()));
        self.like_inner(pattern, true, None, false)
    }

    pub fn not_like(self, pattern: impl Into<String>) -> Result<R> {
        let pattern = self.bind(Value::Text(pattern.into()));
        self.like_inner(pattern, true, None, true)
    }

    /// Case-insensitive match, rendered by wrapping both sides in `UPPER`.
    pub fn like_insensitive(self, pattern: impl Into<String>) -> Result<R> {
        let pattern = self.bind(Value::Text(pattern.into()));
        self.like_inner(pattern, false, None, false)
    }

    pub fn not_like_insensitive(self, pattern: impl Into<String>) -> Result<R> {
        let pattern = self.bind(Value::Text(pattern.into()));
        self.like_inner(pattern, false, None, true)
    }

    pub fn like_escape(self, pattern: impl Into<String>, escape: char) -> Result<R> {
        let pattern = self.bind(Value::Text(pattern.into()));
        self.like_inner(pattern, true, Some(escape), false)
    }

    pub fn like_expression(self, text: &str) -> Result<R> {
        let pattern = parse_scalar(text)?;
        self.like_inner(pattern, true, None, false)
    }

    // ==================== in ====================

    /// Binds the whole list as one positional collection parameter.
    pub fn in_values<I, V>(self, values: I) -> Result<R>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        let name = match self.bind(list) {
            Expression::Parameter(name) => name,
            _ => unreachable!(),
        };
        let left = self.left.clone();
        self.close(Predicate::In {
            left,
            values: InList::Parameter(name),
            negated: false,
        })
    }

    pub fn not_in_values<I, V>(self, values: I) -> Result<R>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        let name = match self.bind(list) {
            Expression::Parameter(name) => name,
            _ => unreachable!(),
        };
        let left = self.left.clone();
        self.close(Predicate::In {
            left,
            values: InList::Parameter(name),
            negated: true,
        })
    }

    /// References a named collection parameter, pending until bound.
    pub fn in_named(self, name: &str) -> Result<R> {
        self.core.borrow().params.borrow_mut().register_named(name);
        let left = self.left.clone();
        self.close(Predicate::In {
            left,
            values: InList::Parameter(name.to_owned()),
            negated: false,
        })
    }

    pub fn in_expressions(self, texts: &[&str]) -> Result<R> {
        let mut items = Vec::with_capacity(texts.len());
        for text in texts {
            items.push(parse_scalar(text)?);
        }
        let left = self.left.clone();
        self.close(Predicate::In {
            left,
            values: InList::Items(items),
            negated: false,
        })
    }

    pub fn in_subquery(self) -> SubqueryBuilder<R> {
        self.into_subquery(|left, sink| SubqueryFinish::InList {
            left,
            negated: false,
            sink,
        })
    }

    pub fn not_in_subquery(self) -> SubqueryBuilder<R> {
        self.into_subquery(|left, sink| SubqueryFinish::InList {
            left,
            negated: true,
            sink,
        })
    }

    // ==================== null / empty / membership ====================

    pub fn is_null(self) -> Result<R> {
        let left = self.left.clone();
        self.close(Predicate::IsNull {
            left,
            negated: false,
        })
    }

    pub fn is_not_null(self) -> Result<R> {
        let left = self.left.clone();
        self.close(Predicate::IsNull {
            left,
            negated: true,
        })
    }

    pub fn is_empty(self) -> Result<R> {
        let left = self.left.clone();
        self.close(Predicate::IsEmpty {
            left,
            negated: false,
        })
    }

    pub fn is_not_empty(self) -> Result<R> {
        let left = self.left.clone();
        self.close(Predicate::IsEmpty {
            left,
            negated: true,
        })
    }

    /// The builder's expression must be a value, `text` names the collection.
    pub fn member_of(self, text: &str) -> Result<R> {
        let collection = parse_scalar(text)?;
        let left = self.left.clone();
        self.close(Predicate::MemberOf {
            left,
            collection,
            negated: false,
        })
    }

    pub fn not_member_of(self, text: &str) -> Result<R> {
        let collection = parse_scalar(text)?;
        let left = self.left.clone();
        self.close(Predicate::MemberOf {
            left,
            collection,
            negated: true,
        })
    }

    // ==================== subquery comparisons ====================

    fn into_subquery(
        self,
        finish: impl FnOnce(Expression, PredicateSink) -> SubqueryFinish,
    ) -> SubqueryBuilder<R> {
        let finish = finish(self.left, self.sink);
        SubqueryBuilder::open(self.result, &self.core, finish, self.chain, self.token)
    }

    fn quantified(self, op: ComparisonOp, quantifier: Quantifier) -> SubqueryBuilder<R> {
        self.into_subquery(|left, sink| SubqueryFinish::Comparison {
            left,
            op,
            quantifier,
            sink,
        })
    }

    pub fn eq_subquery(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Eq, Quantifier::None)
    }

    pub fn eq_all(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Eq, Quantifier::All)
    }

    pub fn eq_any(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Eq, Quantifier::Any)
    }

    pub fn gt_subquery(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Gt, Quantifier::None)
    }

    pub fn gt_all(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Gt, Quantifier::All)
    }

    pub fn gt_any(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Gt, Quantifier::Any)
    }

    pub fn ge_subquery(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Ge, Quantifier::None)
    }

    pub fn ge_all(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Ge, Quantifier::All)
    }

    pub fn ge_any(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Ge, Quantifier::Any)
    }

    pub fn lt_subquery(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Lt, Quantifier::None)
    }

    pub fn lt_all(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Lt, Quantifier::All)
    }

    pub fn lt_any(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Lt, Quantifier::Any)
    }

    pub fn le_subquery(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Le, Quantifier::None)
    }

    pub fn le_all(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Le, Quantifier::All)
    }

    pub fn le_any(self) -> SubqueryBuilder<R> {
        self.quantified(ComparisonOp::Le, Quantifier::Any)
    }
}

/// Second half of a `BETWEEN` restriction, closed by `and`.
pub struct BetweenBuilder<R> {
    inner: RestrictionBuilder<R>,
    start: Expression,
    negated: bool,
}

impl<R> BetweenBuilder<R> {
    pub fn and(self, end: impl Into<Value>) -> Result<R> {
        let end = self.inner.bind(end.into());
        self.finish(end)
    }

    pub fn and_expression(self, text: &str) -> Result<R> {
        let end = parse_scalar(text)?;
        self.finish(end)
    }

    fn finish(self, end: Expression) -> Result<R> {
        let BetweenBuilder {
            inner,
            start,
            negated,
        } = self;
        let left = inner.left.clone();
        inner.close(Predicate::Between {
            left,
            start,
            end,
            negated,
        })
    }
}
