//! Shared state of one query under construction.
//!
//! Every builder facade over the same logical query holds an `Rc<RefCell<..>>`
//! of this core. Clause entries accumulate in parsed form; `prepare` runs the
//! lazy resolution pass at first render and is idempotent until the next
//! structural mutation resets it.

use crate::ast::{Expression, SubqueryRef};
use crate::clause::{GroupByManager, OrderByManager, PredicateManager, SelectManager};
use crate::error::{CriteriaError, Result};
use crate::join::{JoinManager, Resolver, usage};
use crate::params::ParameterRegistry;
use crate::schema::Schema;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) type CoreRef = Rc<RefCell<QueryCore>>;

pub(crate) struct QueryCore {
    pub(crate) schema: Rc<Schema>,
    /// Root entity type name.
    pub(crate) entity: String,
    pub(crate) alias: String,
    pub(crate) select: SelectManager,
    pub(crate) wher: PredicateManager,
    pub(crate) having: PredicateManager,
    pub(crate) group_by: GroupByManager,
    pub(crate) order_by: OrderByManager,
    pub(crate) joins: JoinManager,
    /// Shared across the whole query tree so positional names never collide.
    pub(crate) params: Rc<RefCell<ParameterRegistry>>,
    pub(crate) subqueries: Vec<CoreRef>,
    /// Aliases of enclosing queries, visible to correlated paths.
    pub(crate) outer_aliases: Vec<String>,
    /// Set once pagination parameters are supplied; structural changes that
    /// would corrupt the split fail fast afterwards.
    pub(crate) paginated: bool,
    prepared: bool,
}

impl QueryCore {
    pub(crate) fn new(
        schema: Rc<Schema>,
        entity: impl Into<String>,
        alias: impl Into<String>,
        params: Rc<RefCell<ParameterRegistry>>,
        outer_aliases: Vec<String>,
    ) -> Self {
        QueryCore {
            schema,
            entity: entity.into(),
            alias: alias.into(),
            select: SelectManager::default(),
            wher: PredicateManager::default(),
            having: PredicateManager::default(),
            group_by: GroupByManager::default(),
            order_by: OrderByManager::default(),
            joins: JoinManager::new(),
            params,
            subqueries: Vec::new(),
            outer_aliases,
            paginated: false,
            prepared: false,
        }
    }

    /// Name of the root entity's identifier attribute.
    pub(crate) fn id_attribute(&self) -> Result<String> {
        self.schema
            .entity(&self.entity)
            .map(|e| e.id_attribute().to_owned())
            .ok_or_else(|| {
                CriteriaError::resolution(format!("unknown entity '{}'", self.entity))
            })
    }

    pub(crate) fn add_subquery(&mut self, core: CoreRef) -> SubqueryRef {
        self.subqueries.push(core);
        SubqueryRef(self.subqueries.len() - 1)
    }

    /// Structural mutations reset the resolution state so a later render
    /// re-resolves with the new clause contents.
    pub(crate) fn mark_dirty(&mut self) {
        self.prepared = false;
    }

    /// Resolves implicit joins and clause usage. Idempotent between
    /// mutations; resolved paths short-circuit, so re-preparing after a new
    /// restriction only walks the additions plus usage marking.
    pub(crate) fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        self.joins.clear_usage();

        // order-by entries naming a select alias expand to that expression;
        // the alias itself is still rendered where it is in scope
        for entry in &mut self.order_by.entries {
            if let Expression::Path(path) = &entry.expression {
                if path.segments.len() == 1 && path.segments[0].index.is_none() {
                    if let Some(expr) = self.select.aliased(&path.segments[0].name) {
                        entry.select_alias = Some(path.segments[0].name.clone());
                        entry.expression = expr.clone();
                    }
                }
            }
        }

        let QueryCore {
            schema,
            entity,
            alias,
            select,
            wher,
            having,
            group_by,
            order_by,
            joins,
            params,
            outer_aliases,
            ..
        } = self;
        let mut resolver = Resolver {
            schema: &**schema,
            joins,
            params: &*params,
            root_alias: alias.as_str(),
            root_entity: entity.as_str(),
            outer_aliases: outer_aliases.as_slice(),
            clause: usage::JOIN,
        };

        for explicit in std::mem::take(&mut resolver.joins.pending_explicit) {
            resolver.resolve_explicit(explicit)?;
        }

        resolver.clause = usage::SELECT;
        for item in &mut select.items {
            resolver.resolve_expression(&mut item.expr)?;
        }
        resolver.clause = usage::WHERE;
        for child in &mut wher.children {
            resolver.resolve_predicate(child)?;
        }
        resolver.clause = usage::GROUP;
        for item in &mut group_by.items {
            resolver.resolve_expression(item)?;
        }
        resolver.clause = usage::HAVING;
        for child in &mut having.children {
            resolver.resolve_predicate(child)?;
        }
        resolver.clause = usage::ORDER;
        for entry in &mut order_by.entries {
            resolver.resolve_expression(&mut entry.expression)?;
        }

        for subquery in &self.subqueries {
            subquery.borrow_mut().prepare()?;
        }
        self.prepared = true;
        Ok(())
    }
}
