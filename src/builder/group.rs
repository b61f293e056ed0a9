//! AND/OR group sub-builders for where and having clauses.

use super::chain::ChainRef;
use super::restriction::RestrictionBuilder;
use super::{CoreRef, PredicateSink};
use crate::ast::{Connective, Predicate};
use crate::error::Result;
use crate::parser::parse_simple;
use std::cell::RefCell;
use std::rc::Rc;

/// Collects restrictions combined with one connective. An empty group
/// contributes nothing to its target clause.
pub struct PredicateGroupBuilder<R> {
    result: R,
    connective: Connective,
    parts: Rc<RefCell<Vec<Predicate>>>,
    target: PredicateSink,
    core: CoreRef,
    chain: ChainRef,
    token: usize,
}

impl<R> PredicateGroupBuilder<R> {
    pub(crate) fn open(
        result: R,
        connective: Connective,
        target: PredicateSink,
        core: CoreRef,
        chain: ChainRef,
        token: usize,
    ) -> Self {
        PredicateGroupBuilder {
            result,
            connective,
            parts: Rc::new(RefCell::new(Vec::new())),
            target,
            core,
            chain,
            token,
        }
    }

    fn restrict(self, text: &str) -> Result<RestrictionBuilder<Self>> {
        self.chain.borrow().require_current(self.token)?;
        let left = parse_simple(text)?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let sink = PredicateSink::Parts(self.parts.clone());
        let chain = self.chain.clone();
        Ok(RestrictionBuilder::new(self, core, sink, left, chain, token))
    }

    /// Opens a restriction joined by the group's connective.
    pub fn or(self, text: &str) -> Result<RestrictionBuilder<Self>> {
        self.restrict(text)
    }

    /// Opens a restriction joined by the group's connective.
    pub fn and(self, text: &str) -> Result<RestrictionBuilder<Self>> {
        self.restrict(text)
    }

    fn group(self, connective: Connective) -> Result<PredicateGroupBuilder<Self>> {
        self.chain.borrow().require_current(self.token)?;
        let token = self.chain.borrow_mut().start();
        let target = PredicateSink::Parts(self.parts.clone());
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(PredicateGroupBuilder::open(
            self, connective, target, core, chain, token,
        ))
    }

    /// Opens a nested AND group whose result joins this group.
    pub fn and_group(self) -> Result<PredicateGroupBuilder<Self>> {
        self.group(Connective::And)
    }

    /// Opens a nested OR group whose result joins this group.
    pub fn or_group(self) -> Result<PredicateGroupBuilder<Self>> {
        self.group(Connective::Or)
    }

    pub fn end(self) -> Result<R> {
        self.chain.borrow_mut().end(self.token)?;
        let parts: Vec<Predicate> = self.parts.borrow_mut().drain(..).collect();
        if !parts.is_empty() {
            self.target.push(Predicate::compound(self.connective, parts));
        }
        Ok(self.result)
    }
}
