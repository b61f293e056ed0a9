//! Runtime enforcement of fluent-builder nesting.
//!
//! Every open sub-builder holds a token on a shared stack. Ownership already
//! rules out most misuse, but the query facade is cheaply cloneable, so a
//! caller can still start a sibling while another sub-builder is open or ask
//! for the query string mid-chain. The stack catches exactly those cases.

use crate::error::{CriteriaError, Result};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) type ChainRef = Rc<RefCell<BuilderChain>>;

#[derive(Debug, Default)]
pub(crate) struct BuilderChain {
    stack: Vec<usize>,
    next: usize,
}

impl BuilderChain {
    pub(crate) fn new_ref() -> ChainRef {
        Rc::new(RefCell::new(BuilderChain::default()))
    }

    /// Opens a sub-builder nested under the current innermost one and
    /// returns its token.
    pub(crate) fn start(&mut self) -> usize {
        let token = self.next;
        self.next += 1;
        self.stack.push(token);
        token
    }

    /// Closes the sub-builder identified by `token`.
    pub(crate) fn end(&mut self, token: usize) -> Result<()> {
        match self.stack.last() {
            Some(&top) if top == token => {
                self.stack.pop();
                Ok(())
            }
            _ if self.stack.contains(&token) => Err(CriteriaError::chaining(
                "a nested sub-builder is still open and must be ended first",
            )),
            _ => Err(CriteriaError::chaining("this builder has already ended")),
        }
    }

    /// Verifies that `token` is the innermost open sub-builder.
    pub(crate) fn require_current(&self, token: usize) -> Result<()> {
        match self.stack.last() {
            Some(&top) if top == token => Ok(()),
            _ if self.stack.contains(&token) => Err(CriteriaError::chaining(
                "a nested sub-builder is still open and must be ended first",
            )),
            _ => Err(CriteriaError::chaining("this builder has already ended")),
        }
    }

    /// Verifies that no sub-builder is open at all. Required before any
    /// top-level structural operation or render.
    pub(crate) fn require_settled(&self) -> Result<()> {
        if self.stack.is_empty() {
            Ok(())
        } else {
            Err(CriteriaError::chaining(
                "a sub-builder is still open; end it before continuing on the query",
            ))
        }
    }
}
