//! The fluent query-building surface.
//!
//! `CriteriaBuilder` is a cheap clone over shared query state; sub-builders
//! move through the fluent chain by value and return the surface they were
//! opened from. Expression text is parsed eagerly at each call, so malformed
//! input fails at the call site; path resolution stays lazy until the first
//! render.

mod case_when;
pub(crate) mod chain;
pub(crate) mod core;
mod group;
mod join_on;
mod restriction;
mod subquery;

pub use case_when::{CaseWhenBuilder, CaseWhenThenBuilder, WhenGroupBuilder};
pub use group::PredicateGroupBuilder;
pub use join_on::JoinOnBuilder;
pub use restriction::{BetweenBuilder, RestrictionBuilder};
pub use subquery::SubqueryBuilder;

use self::chain::{BuilderChain, ChainRef};
use self::core::{CoreRef, QueryCore};
use self::subquery::SubqueryFinish;
use crate::ast::{Connective, Expression, PathExpression, Predicate};
use crate::error::{CriteriaError, Result};
use crate::join::{ExplicitJoin, JoinKind};
use crate::pagination::{PageRequest, PaginatedCriteria};
use crate::params::{ParameterBinding, ParameterRegistry};
use crate::parser::{parse_scalar, parse_simple};
use crate::render::{RenderSettings, Renderer};
use crate::schema::Schema;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Join kind of an explicit join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub(crate) fn kind(self) -> JoinKind {
        match self {
            JoinType::Inner => JoinKind::Inner,
            JoinType::Left => JoinKind::Left,
        }
    }
}

/// Where a finished predicate lands when its builder closes.
#[derive(Clone)]
pub(crate) enum PredicateSink {
    Where(CoreRef),
    Having(CoreRef),
    /// Part list of a group or ON builder.
    Parts(Rc<RefCell<Vec<Predicate>>>),
    /// Single pending slot, e.g. the condition of a CASE branch.
    Pending(Rc<RefCell<Option<Predicate>>>),
}

impl PredicateSink {
    pub(crate) fn push(&self, predicate: Predicate) {
        match self {
            PredicateSink::Where(core) => {
                let mut core = core.borrow_mut();
                core.wher.add(predicate);
                core.mark_dirty();
            }
            PredicateSink::Having(core) => {
                let mut core = core.borrow_mut();
                core.having.add(predicate);
                core.mark_dirty();
            }
            PredicateSink::Parts(parts) => parts.borrow_mut().push(predicate),
            PredicateSink::Pending(slot) => *slot.borrow_mut() = Some(predicate),
        }
    }
}

/// Entry point for building and rendering one logical query.
#[derive(Clone)]
pub struct CriteriaBuilder {
    core: CoreRef,
    chain: ChainRef,
}

impl CriteriaBuilder {
    pub fn new(
        schema: impl Into<Rc<Schema>>,
        entity: &str,
        alias: &str,
    ) -> Result<CriteriaBuilder> {
        let schema = schema.into();
        if schema.entity(entity).is_none() {
            return Err(CriteriaError::resolution(format!(
                "unknown entity '{entity}'"
            )));
        }
        let params = Rc::new(RefCell::new(ParameterRegistry::new()));
        let core = Rc::new(RefCell::new(QueryCore::new(
            schema,
            entity,
            alias,
            params,
            Vec::new(),
        )));
        Ok(CriteriaBuilder {
            core,
            chain: BuilderChain::new_ref(),
        })
    }

    fn settled(&self) -> Result<()> {
        self.chain.borrow().require_settled()
    }

    // ==================== select ====================

    pub fn select(self, text: &str) -> Result<Self> {
        self.settled()?;
        let expr = parse_scalar(text)?;
        let mut core = self.core.borrow_mut();
        core.select.add(expr, None);
        core.mark_dirty();
        drop(core);
        Ok(self)
    }

    pub fn select_as(self, text: &str, alias: &str) -> Result<Self> {
        self.settled()?;
        let expr = parse_scalar(text)?;
        let mut core = self.core.borrow_mut();
        core.select.add(expr, Some(alias.to_owned()));
        core.mark_dirty();
        drop(core);
        Ok(self)
    }

    pub fn distinct(self) -> Result<Self> {
        self.settled()?;
        let mut core = self.core.borrow_mut();
        if core.paginated {
            return Err(CriteriaError::pagination(
                "cannot add DISTINCT to a paginated query",
            ));
        }
        core.select.distinct = true;
        core.mark_dirty();
        drop(core);
        Ok(self)
    }

    /// Opens a `CASE WHEN` chain registered as an unaliased select item.
    pub fn select_case(self) -> Result<CaseWhenBuilder<Self>> {
        self.open_case(None)
    }

    pub fn select_case_as(self, alias: &str) -> Result<CaseWhenBuilder<Self>> {
        self.open_case(Some(alias.to_owned()))
    }

    fn open_case(self, alias: Option<String>) -> Result<CaseWhenBuilder<Self>> {
        self.settled()?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(CaseWhenBuilder::open(self, core, alias, chain, token))
    }

    pub fn select_subquery(self) -> Result<SubqueryBuilder<Self>> {
        self.open_select_subquery(None)
    }

    pub fn select_subquery_as(self, alias: &str) -> Result<SubqueryBuilder<Self>> {
        self.open_select_subquery(Some(alias.to_owned()))
    }

    fn open_select_subquery(self, alias: Option<String>) -> Result<SubqueryBuilder<Self>> {
        self.settled()?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(SubqueryBuilder::open(
            self,
            &core,
            SubqueryFinish::Select { alias },
            chain,
            token,
        ))
    }

    // ==================== where ====================

    pub fn where_(self, text: &str) -> Result<RestrictionBuilder<Self>> {
        self.settled()?;
        let left = parse_simple(text)?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let sink = PredicateSink::Where(self.core.clone());
        let chain = self.chain.clone();
        Ok(RestrictionBuilder::new(self, core, sink, left, chain, token))
    }

    /// Opens an OR group of where restrictions.
    pub fn where_or(self) -> Result<PredicateGroupBuilder<Self>> {
        self.settled()?;
        let token = self.chain.borrow_mut().start();
        let target = PredicateSink::Where(self.core.clone());
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(PredicateGroupBuilder::open(
            self,
            Connective::Or,
            target,
            core,
            chain,
            token,
        ))
    }

    pub fn where_exists(self) -> Result<SubqueryBuilder<Self>> {
        self.open_exists(false)
    }

    pub fn where_not_exists(self) -> Result<SubqueryBuilder<Self>> {
        self.open_exists(true)
    }

    fn open_exists(self, negated: bool) -> Result<SubqueryBuilder<Self>> {
        self.settled()?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let sink = PredicateSink::Where(self.core.clone());
        let chain = self.chain.clone();
        Ok(SubqueryBuilder::open(
            self,
            &core,
            SubqueryFinish::Exists { negated, sink },
            chain,
            token,
        ))
    }

    // ==================== group by / having ====================

    pub fn group_by(self, text: &str) -> Result<Self> {
        self.settled()?;
        let expr = parse_scalar(text)?;
        let mut core = self.core.borrow_mut();
        if core.paginated {
            return Err(CriteriaError::pagination(
                "cannot add GROUP BY to a paginated query",
            ));
        }
        core.group_by.add(expr);
        core.mark_dirty();
        drop(core);
        Ok(self)
    }

    pub fn having(self, text: &str) -> Result<RestrictionBuilder<Self>> {
        self.settled()?;
        if self.core.borrow().group_by.is_empty() {
            return Err(CriteriaError::chaining(
                "HAVING requires a GROUP BY clause",
            ));
        }
        let left = parse_simple(text)?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let sink = PredicateSink::Having(self.core.clone());
        let chain = self.chain.clone();
        Ok(RestrictionBuilder::new(self, core, sink, left, chain, token))
    }

    pub fn having_or(self) -> Result<PredicateGroupBuilder<Self>> {
        self.settled()?;
        if self.core.borrow().group_by.is_empty() {
            return Err(CriteriaError::chaining(
                "HAVING requires a GROUP BY clause",
            ));
        }
        let token = self.chain.borrow_mut().start();
        let target = PredicateSink::Having(self.core.clone());
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(PredicateGroupBuilder::open(
            self,
            Connective::Or,
            target,
            core,
            chain,
            token,
        ))
    }

    // ==================== order by ====================

    pub fn order_by(self, text: &str, ascending: bool, nulls_first: bool) -> Result<Self> {
        self.settled()?;
        let expr = parse_scalar(text)?;
        let mut core = self.core.borrow_mut();
        core.order_by.add(expr, ascending, nulls_first);
        core.mark_dirty();
        drop(core);
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

    // ==================== joins ====================

    fn join_path(text: &str) -> Result<PathExpression> {
        match parse_scalar(text)? {
            Expression::Path(path) => Ok(path),
            _ => Err(CriteriaError::resolution(format!(
                "'{text}' is not a join path"
            ))),
        }
    }

    /// Registers an explicit join; the node is resolved with the rest of the
    /// query at first render.
    pub fn join(self, path: &str, alias: &str, kind: JoinType) -> Result<Self> {
        self.settled()?;
        let path = Self::join_path(path)?;
        let mut core = self.core.borrow_mut();
        core.joins.pending_explicit.push(ExplicitJoin {
            path,
            alias: alias.to_owned(),
            kind: kind.kind(),
            on: None,
        });
        core.mark_dirty();
        drop(core);
        Ok(self)
    }

    pub fn inner_join(self, path: &str, alias: &str) -> Result<Self> {
        self.join(path, alias, JoinType::Inner)
    }

    pub fn left_join(self, path: &str, alias: &str) -> Result<Self> {
        self.join(path, alias, JoinType::Left)
    }

    pub fn join_on(self, path: &str, alias: &str, kind: JoinType) -> Result<JoinOnBuilder<Self>> {
        self.settled()?;
        let path = Self::join_path(path)?;
        let token = self.chain.borrow_mut().start();
        let core = self.core.clone();
        let chain = self.chain.clone();
        Ok(JoinOnBuilder::open(
            self,
            core,
            path,
            alias.to_owned(),
            kind.kind(),
            chain,
            token,
        ))
    }

    pub fn left_join_on(self, path: &str, alias: &str) -> Result<JoinOnBuilder<Self>> {
        self.join_on(path, alias, JoinType::Left)
    }

    pub fn inner_join_on(self, path: &str, alias: &str) -> Result<JoinOnBuilder<Self>> {
        self.join_on(path, alias, JoinType::Inner)
    }

    // ==================== parameters ====================

    /// Binds or rebinds a named parameter.
    pub fn set_parameter(self, name: &str, value: impl Into<Value>) -> Self {
        self.core
            .borrow()
            .params
            .borrow_mut()
            .bind(name, value.into());
        self
    }

    /// All parameters in registration order, pending ones included.
    pub fn parameters(&self) -> Vec<ParameterBinding> {
        self.core.borrow().params.borrow().bindings()
    }

    // ==================== rendering ====================

    /// Renders the base query. Resolution runs lazily here, so unknown
    /// attributes surface as `ResolutionError` from this call.
    pub fn query_string(&self) -> Result<String> {
        self.settled()?;
        self.core.borrow_mut().prepare()?;
        let core = self.core.borrow();
        let query = Renderer::new(&core, RenderSettings::base()).render()?;
        tracing::debug!(query, "rendered base query");
        Ok(query)
    }

    /// Ordered projection metadata, one `(expression text, alias)` pair per
    /// select item, for result-row materialization.
    pub fn projection(&self) -> Result<Vec<(String, Option<String>)>> {
        self.settled()?;
        self.core.borrow_mut().prepare()?;
        let core = self.core.borrow();
        let renderer = Renderer::new(&core, RenderSettings::base());
        let mut items = Vec::with_capacity(core.select.items.len());
        for item in &core.select.items {
            items.push((renderer.expression_text(&item.expr)?, item.alias.clone()));
        }
        Ok(items)
    }

    // ==================== pagination ====================

    /// Splits the query for offset pagination.
    pub fn page(&self, first_result: usize, max_results: usize) -> Result<PaginatedCriteria> {
        self.paginate(PageRequest::Offset { first_result }, max_results)
    }

    /// Pages to wherever the entity with the given id lands under the
    /// current ordering.
    pub fn page_at(&self, reference: impl Into<Value>, max_results: usize) -> Result<PaginatedCriteria> {
        self.paginate(PageRequest::Position(reference.into()), max_results)
    }

    /// Keyset continuation after the anchor row's order-by values.
    pub fn page_after(&self, anchor: Vec<Value>, max_results: usize) -> Result<PaginatedCriteria> {
        self.paginate(PageRequest::After(anchor), max_results)
    }

    /// Keyset continuation before the anchor row's order-by values.
    pub fn page_before(&self, anchor: Vec<Value>, max_results: usize) -> Result<PaginatedCriteria> {
        self.paginate(PageRequest::Before(anchor), max_results)
    }

    fn paginate(&self, request: PageRequest, max_results: usize) -> Result<PaginatedCriteria> {
        self.settled()?;
        PaginatedCriteria::new(self.core.clone(), self.chain.clone(), request, max_results)
    }
}
