//! Explicit joins with an ON restriction.

use super::chain::ChainRef;
use super::restriction::RestrictionBuilder;
use super::{CoreRef, PredicateSink};
use crate::ast::{Connective, PathExpression, Predicate};
use crate::error::Result;
use crate::join::{ExplicitJoin, JoinKind};
use crate::parser::{parse_predicate, parse_simple};
use std::cell::RefCell;
use std::rc::Rc;

pub struct JoinOnBuilder<R> {
    result: R,
    core: CoreRef,
    path: PathExpression,
    alias: String,
    kind: JoinKind,
    parts: Rc<RefCell<Vec<Predicate>>>,
    chain: ChainRef,
    token: usize,
}

impl<R> JoinOnBuilder<R> {
    pub(crate) fn open(
        result: R,
        core: CoreRef,
        path: PathExpression,
        alias: String,
        kind: JoinKind,
        chain: ChainRef,
        token: usize,
    ) -> Self {
        JoinOnBuilder {
            result,
            core,
            path,
            alias,
            kind,
            parts: Rc::new(RefCell::new(Vec::new())),
            chain,
            token,
        }
    }

    /// Opens a restriction contributing to the join's ON clause.
    pub fn on(self, text: &str) -> Result<RestrictionBuilder<JoinOnBuilder<R>>> {
        self.chain.borrow().require_current(self.token)?;
        let left = parse_simple(text)?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let sink = PredicateSink::Parts(self.parts.clone());
        let chain = self.chain.clone();
        Ok(RestrictionBuilder::new(self, core, sink, left, chain, token))
    }

    /// Adds a complete predicate, parsed with the join-on grammar.
    pub fn on_predicate(self, text: &str) -> Result<Self> {
        self.chain.borrow().require_current(self.token)?;
        let predicate = parse_predicate(text)?;
        self.parts.borrow_mut().push(predicate);
        Ok(self)
    }

    pub fn end(self) -> Result<R> {
        self.chain.borrow_mut().end(self.token)?;
        let parts: Vec<Predicate> = self.parts.borrow_mut().drain(..).collect();
        let on = if parts.is_empty() {
            None
        } else {
            Some(Predicate::compound(Connective::And, parts))
        };
        let mut core = self.core.borrow_mut();
        core.joins.pending_explicit.push(ExplicitJoin {
            path: self.path,
            alias: self.alias,
            kind: self.kind,
            on,
        });
        core.mark_dirty();
        drop(core);
        Ok(self.result)
    }
}
