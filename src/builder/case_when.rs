//! `CASE WHEN` sub-builders for the select clause.
//!
//! A case chain accumulates when/then pairs and closes through `otherwise`,
//! which registers the finished case expression as a select item. `when`
//! opens a restriction whose terminal leads into `then`; `when_and` and
//! `when_or` collect several restrictions for one branch.

use super::chain::ChainRef;
use super::restriction::RestrictionBuilder;
use super::subquery::{SubqueryBuilder, SubqueryFinish};
use super::{CoreRef, PredicateSink};
use crate::ast::{CaseExpression, Connective, Expression, Predicate, WhenClause};
use crate::error::{CriteriaError, Result};
use crate::parser::{parse_scalar, parse_simple};
use std::cell::RefCell;
use std::rc::Rc;

pub struct CaseWhenBuilder<R> {
    result: R,
    core: CoreRef,
    whens: Vec<WhenClause>,
    alias: Option<String>,
    chain: ChainRef,
    token: usize,
}

impl<R> CaseWhenBuilder<R> {
    pub(crate) fn open(
        result: R,
        core: CoreRef,
        alias: Option<String>,
        chain: ChainRef,
        token: usize,
    ) -> Self {
        CaseWhenBuilder {
            result,
            core,
            whens: Vec::new(),
            alias,
            chain,
            token,
        }
    }

    pub fn when(self, text: &str) -> Result<RestrictionBuilder<CaseWhenThenBuilder<R>>> {
        self.chain.borrow().require_current(self.token)?;
        let left = parse_simple(text)?;
        let token = self.chain.borrow_mut().start();
        let slot = Rc::new(RefCell::new(None));
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(RestrictionBuilder::new(
            CaseWhenThenBuilder {
                case: self,
                condition: slot.clone(),
            },
            core,
            PredicateSink::Pending(slot),
            left,
            chain,
            token,
        ))
    }

    pub fn when_and(self) -> Result<WhenGroupBuilder<R>> {
        self.when_group(Connective::And)
    }

    pub fn when_or(self) -> Result<WhenGroupBuilder<R>> {
        self.when_group(Connective::Or)
    }

    fn when_group(self, connective: Connective) -> Result<WhenGroupBuilder<R>> {
        self.chain.borrow().require_current(self.token)?;
        let token = self.chain.borrow_mut().start();
        Ok(WhenGroupBuilder {
            case: self,
            connective,
            parts: Rc::new(RefCell::new(Vec::new())),
            token,
        })
    }

    pub fn when_exists(self) -> Result<SubqueryBuilder<CaseWhenThenBuilder<R>>> {
        self.when_exists_inner(false)
    }

    pub fn when_not_exists(self) -> Result<SubqueryBuilder<CaseWhenThenBuilder<R>>> {
        self.when_exists_inner(true)
    }

    fn when_exists_inner(self, negated: bool) -> Result<SubqueryBuilder<CaseWhenThenBuilder<R>>> {
        self.chain.borrow().require_current(self.token)?;
        let token = self.chain.borrow_mut().start();
        let slot = Rc::new(RefCell::new(None));
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(SubqueryBuilder::open(
            CaseWhenThenBuilder {
                case: self,
                condition: slot.clone(),
            },
            &core,
            SubqueryFinish::Exists {
                negated,
                sink: PredicateSink::Pending(slot),
            },
            chain,
            token,
        ))
    }

    /// Closes the case chain with its ELSE branch and registers the select
    /// item.
    pub fn otherwise(self, text: &str) -> Result<R> {
        let otherwise = parse_scalar(text)?;
        self.chain.borrow_mut().end(self.token)?;
        if self.whens.is_empty() {
            return Err(CriteriaError::chaining(
                "a CASE expression requires at least one WHEN branch",
            ));
        }
        let case = Expression::Case(CaseExpression {
            whens: self.whens,
            otherwise: Some(Box::new(otherwise)),
        });
        let mut core = self.core.borrow_mut();
        core.select.add(case, self.alias);
        core.mark_dirty();
        drop(core);
        Ok(self.result)
    }
}

/// Accepts the THEN result of the branch whose condition just finished.
pub struct CaseWhenThenBuilder<R> {
    case: CaseWhenBuilder<R>,
    condition: Rc<RefCell<Option<Predicate>>>,
}

impl<R> CaseWhenThenBuilder<R> {
    pub fn then(self, text: &str) -> Result<CaseWhenBuilder<R>> {
        let condition = self.condition.borrow_mut().take().ok_or_else(|| {
            CriteriaError::chaining("the WHEN restriction was not finished before THEN")
        })?;
        let result = parse_scalar(text)?;
        let mut case = self.case;
        case.whens.push(WhenClause { condition, result });
        Ok(case)
    }
}

/// Multi-restriction WHEN branch, closed by `then`.
pub struct WhenGroupBuilder<R> {
    case: CaseWhenBuilder<R>,
    connective: Connective,
    parts: Rc<RefCell<Vec<Predicate>>>,
    token: usize,
}

impl<R> WhenGroupBuilder<R> {
    fn restrict(self, text: &str) -> Result<RestrictionBuilder<WhenGroupBuilder<R>>> {
        self.case.chain.borrow().require_current(self.token)?;
        let left = parse_simple(text)?;
        let token = self.case.chain.borrow_mut().start();
        let core = self.case.core.clone();
        let sink = PredicateSink::Parts(self.parts.clone());
        let chain = self.case.chain.clone();
        Ok(RestrictionBuilder::new(self, core, sink, left, chain, token))
    }

    /// Opens a restriction joined by the branch connective.
    pub fn and(self, text: &str) -> Result<RestrictionBuilder<WhenGroupBuilder<R>>> {
        self.restrict(text)
    }

    /// Opens a restriction joined by the branch connective.
    pub fn or(self, text: &str) -> Result<RestrictionBuilder<WhenGroupBuilder<R>>> {
        self.restrict(text)
    }

    pub fn then(self, text: &str) -> Result<CaseWhenBuilder<R>> {
        let result = parse_scalar(text)?;
        self.case.chain.borrow_mut().end(self.token)?;
        let parts: Vec<Predicate> = self.parts.borrow_mut().drain(..).collect();
        if parts.is_empty() {
            return Err(CriteriaError::chaining(
                "a WHEN group requires at least one restriction before THEN",
            ));
        }
        let mut case = self.case;
        case.whens.push(WhenClause {
            condition: Predicate::compound(self.connective, parts),
            result,
        });
        Ok(case)
    }
}
