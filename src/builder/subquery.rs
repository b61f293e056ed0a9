//! Subquery sub-builder.
//!
//! Opened from a restriction (`in_subquery`, quantified comparisons), from
//! the query surface (`where_exists`, `select_subquery`) or from a case-when
//! chain (`when_exists`). The builder owns a nested query core sharing the
//! outer parameter registry; `end` registers the core in the outer subquery
//! table and hands the finished node to the opener's sink.

use super::chain::ChainRef;
use super::core::QueryCore;
use super::restriction::RestrictionBuilder;
use super::{CoreRef, PredicateSink};
use crate::ast::{ComparisonOp, Expression, InList, Predicate, Quantifier};
use crate::error::{CriteriaError, Result};
use crate::parser::{parse_scalar, parse_simple};
use std::cell::RefCell;
use std::rc::Rc;

/// What the finished subquery node becomes in the outer query.
pub(crate) enum SubqueryFinish {
    Comparison {
        left: Expression,
        op: ComparisonOp,
        quantifier: Quantifier,
        sink: PredicateSink,
    },
    Exists {
        negated: bool,
        sink: PredicateSink,
    },
    InList {
        left: Expression,
        negated: bool,
        sink: PredicateSink,
    },
    Select {
        alias: Option<String>,
    },
}

pub struct SubqueryBuilder<R> {
    result: R,
    outer: CoreRef,
    inner: CoreRef,
    finish: SubqueryFinish,
    chain: ChainRef,
    token: usize,
}

impl<R> SubqueryBuilder<R> {
    pub(crate) fn open(
        result: R,
        outer: &CoreRef,
        finish: SubqueryFinish,
        chain: ChainRef,
        token: usize,
    ) -> Self {
        let (schema, params, outer_aliases) = {
            let outer = outer.borrow();
            let mut aliases = outer.outer_aliases.clone();
            aliases.push(outer.alias.clone());
            (outer.schema.clone(), outer.params.clone(), aliases)
        };
        let inner = Rc::new(RefCell::new(QueryCore::new(
            schema,
            "",
            "",
            params,
            outer_aliases,
        )));
        SubqueryBuilder {
            result,
            outer: outer.clone(),
            inner,
            finish,
            chain,
            token,
        }
    }

    pub fn from(self, entity: &str, alias: &str) -> Result<Self> {
        self.chain.borrow().require_current(self.token)?;
        {
            let mut inner = self.inner.borrow_mut();
            if inner.schema.entity(entity).is_none() {
                return Err(CriteriaError::resolution(format!(
                    "unknown entity '{entity}'"
                )));
            }
            inner.entity = entity.to_owned();
            inner.alias = alias.to_owned();
        }
        Ok(self)
    }

    pub fn select(self, text: &str) -> Result<Self> {
        self.chain.borrow().require_current(self.token)?;
        let expr = parse_scalar(text)?;
        self.inner.borrow_mut().select.add(expr, None);
        Ok(self)
    }

    pub fn group_by(self, text: &str) -> Result<Self> {
        self.chain.borrow().require_current(self.token)?;
        let expr = parse_scalar(text)?;
        self.inner.borrow_mut().group_by.add(expr);
        Ok(self)
    }

    pub fn order_by(self, text: &str, ascending: bool, nulls_first: bool) -> Result<Self> {
        self.chain.borrow().require_current(self.token)?;
        let expr = parse_scalar(text)?;
        self.inner
            .borrow_mut()
            .order_by
            .add(expr, ascending, nulls_first);
        Ok(self)
    }

    /// Ascending order, defaulting to NULLS LAST.
    pub fn order_by_asc(self, text: &str) -> Result<Self> {
        self.order_by(text, true, false)
    }

    /// Descending order, defaulting to NULLS FIRST.
    pub fn order_by_desc(self, text: &str) -> Result<Self> {
        self.order_by(text, false, true)
    }

    pub fn where_(self, text: &str) -> Result<RestrictionBuilder<SubqueryBuilder<R>>> {
        self.chain.borrow().require_current(self.token)?;
        let left = parse_simple(text)?;
        let token = self.chain.borrow_mut().start();
        let core = self.inner.clone();
        let sink = PredicateSink::Where(self.inner.clone());
        let chain = self.chain.clone();
        Ok(RestrictionBuilder::new(self, core, sink, left, chain, token))
    }

    /// Closes the subquery and surfaces the node through the opener's sink.
    pub fn end(self) -> Result<R> {
        self.chain.borrow_mut().end(self.token)?;
        if self.inner.borrow().entity.is_empty() {
            return Err(CriteriaError::chaining(
                "subquery builder requires a FROM entity before end",
            ));
        }
        let reference = {
            let mut outer = self.outer.borrow_mut();
            let reference = outer.add_subquery(self.inner.clone());
            outer.mark_dirty();
            reference
        };
        match self.finish {
            SubqueryFinish::Comparison {
                left,
                op,
                quantifier,
                sink,
            } => sink.push(Predicate::Comparison {
                op,
                quantifier,
                left,
                right: Expression::Subquery(reference),
                negated: false,
            }),
            SubqueryFinish::Exists { negated, sink } => sink.push(Predicate::Exists {
                subquery: reference,
                negated,
            }),
            SubqueryFinish::InList {
                left,
                negated,
                sink,
            } => sink.push(Predicate::In {
                left,
                values: InList::Subquery(reference),
                negated,
            }),
            SubqueryFinish::Select { alias } => {
                let mut outer = self.outer.borrow_mut();
                outer.select.add(Expression::Subquery(reference), alias);
                outer.mark_dirty();
            }
        }
        Ok(self.result)
    }
}
