//! Pagination split of a logical query.
//!
//! A paginated view renders three cooperating queries: a row count, an id
//! query the limits actually apply to, and a content query restricted to the
//! fetched ids. The split is inherently sequential; the content query's
//! `ids` parameter stays pending until the id query has executed.
//!
//! Incompatible queries fail fast when pagination parameters are supplied:
//! there must be an order-by whose last key is unique and non-null, no user
//! group-by or having, and DISTINCT only over the sole root-id projection.

use crate::ast::{Expression, InList, Predicate, ResolvedPath};
use crate::builder::chain::ChainRef;
use crate::builder::core::CoreRef;
use crate::clause::OrderByEntry;
use crate::error::{CriteriaError, Result};
use crate::params::ParameterBinding;
use crate::render::{QueryKind, RenderSettings, Renderer};
use crate::value::Value;
use smallvec::smallvec;

/// Parameter name of the `PAGE_POSITION` reference id.
const PAGE_POSITION_PARAMETER: &str = "_entityPagePositionParameter";

/// How the page window is anchored.
#[derive(Debug, Clone, PartialEq)]
pub enum PageRequest {
    /// Plain offset window.
    Offset { first_result: usize },
    /// Window containing the entity with this id under the current ordering;
    /// the count query carries a `PAGE_POSITION` marker resolving the offset.
    Position(Value),
    /// Keyset window strictly after the anchor row's order-by values.
    After(Vec<Value>),
    /// Keyset window strictly before the anchor row's order-by values.
    Before(Vec<Value>),
}

/// Read-only pagination view over a logical query.
pub struct PaginatedCriteria {
    core: CoreRef,
    chain: ChainRef,
    request: PageRequest,
    max_results: usize,
}

impl PaginatedCriteria {
    pub(crate) fn new(
        core: CoreRef,
        chain: ChainRef,
        request: PageRequest,
        max_results: usize,
    ) -> Result<PaginatedCriteria> {
        core.borrow_mut().prepare()?;
        {
            let core = core.borrow();

            if core.order_by.is_empty() {
                return Err(CriteriaError::pagination(
                    "pagination requires an ORDER BY clause",
                ));
            }
            if !core.group_by.is_empty() {
                return Err(CriteriaError::pagination(
                    "cannot paginate a query with a GROUP BY clause",
                ));
            }
            if !core.having.is_empty() {
                return Err(CriteriaError::pagination(
                    "cannot paginate a query with a HAVING clause",
                ));
            }
            let last = core
                .order_by
                .entries
                .last()
                .expect("order by was checked non-empty");
            check_unique_last_key(&core, last)?;

            if core.select.distinct && !is_sole_root_id_projection(&core)? {
                return Err(CriteriaError::pagination(
                    "DISTINCT pagination requires the projection to be exactly the root id",
                ));
            }
            if let PageRequest::After(anchor) | PageRequest::Before(anchor) = &request {
                if anchor.len() != core.order_by.entries.len() {
                    return Err(CriteriaError::pagination(format!(
                        "keyset anchor has {} values but the query orders by {} keys",
                        anchor.len(),
                        core.order_by.entries.len()
                    )));
                }
            }
        }

        // register the split's parameters up front
        {
            let core = core.borrow();
            let params = core.params.clone();
            let mut params = params.borrow_mut();
            params.register_named("ids");
            match &request {
                PageRequest::Position(reference) => {
                    params.bind(PAGE_POSITION_PARAMETER, reference.clone());
                }
                PageRequest::After(anchor) | PageRequest::Before(anchor) => {
                    for (i, value) in anchor.iter().enumerate() {
                        params.bind(&format!("keyset_{i}"), value.clone());
                    }
                }
                PageRequest::Offset { .. } => {}
            }
        }

        core.borrow_mut().paginated = true;
        Ok(PaginatedCriteria {
            core,
            chain,
            request,
            max_results,
        })
    }

    /// Offset the id query should be executed with; `None` when the offset
    /// comes from a keyset or page-position anchor instead.
    pub fn first_result(&self) -> Option<usize> {
        match &self.request {
            PageRequest::Offset { first_result } => Some(*first_result),
            _ => None,
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn parameters(&self) -> Vec<ParameterBinding> {
        self.core.borrow().params.borrow().bindings()
    }

    /// The total-count query. For position requests it additionally reports
    /// the page of the reference entity through `PAGE_POSITION`.
    pub fn count_query_string(&self) -> Result<String> {
        self.prepare()?;
        let core = self.core.borrow();
        let settings = RenderSettings {
            kind: QueryKind::Count,
            page_position: match self.request {
                PageRequest::Position(_) => Some(PAGE_POSITION_PARAMETER),
                _ => None,
            },
            ..RenderSettings::base()
        };
        let query = Renderer::new(&core, settings).render()?;
        tracing::debug!(query, "rendered page count query");
        Ok(query)
    }

    /// The id query the window limits apply to.
    pub fn id_query_string(&self) -> Result<String> {
        self.prepare()?;
        let core = self.core.borrow();
        let keyset = self.keyset_predicate(&core.order_by.entries);
        let settings = RenderSettings {
            kind: QueryKind::Id,
            invert_order: matches!(self.request, PageRequest::Before(_)),
            extra_where: keyset.as_ref(),
            ..RenderSettings::base()
        };
        let query = Renderer::new(&core, settings).render()?;
        tracing::debug!(query, "rendered page id query");
        Ok(query)
    }

    /// The content query, restricted to the ids the id query produced.
    pub fn query_string(&self) -> Result<String> {
        self.prepare()?;
        let core = self.core.borrow();
        let id_filter = Predicate::In {
            left: self.root_id_expression()?,
            values: InList::Parameter("ids".to_owned()),
            negated: false,
        };
        let settings = RenderSettings {
            kind: QueryKind::Content,
            extra_where: Some(&id_filter),
            ..RenderSettings::base()
        };
        let query = Renderer::new(&core, settings).render()?;
        tracing::debug!(query, "rendered page content query");
        Ok(query)
    }

    fn prepare(&self) -> Result<()> {
        self.chain.borrow().require_settled()?;
        self.core.borrow_mut().prepare()
    }

    fn root_id_expression(&self) -> Result<Expression> {
        let core = self.core.borrow();
        let id = core.id_attribute()?;
        let mut path = crate::ast::PathExpression::of([core.alias.clone(), id.clone()]);
        path.resolved = Some(ResolvedPath {
            alias: core.alias.clone(),
            tail: smallvec![id],
        });
        Ok(Expression::Path(path))
    }

    /// The lexicographic inequality chain of a keyset anchor: an OR over
    /// prefixes, each fixing the leading keys with equalities and comparing
    /// the next key strictly. Direction flips per key for descending order
    /// and flips wholesale for backward paging.
    fn keyset_predicate(&self, entries: &[OrderByEntry]) -> Option<Predicate> {
        let (anchor, backward) = match &self.request {
            PageRequest::After(anchor) => (anchor, false),
            PageRequest::Before(anchor) => (anchor, true),
            _ => return None,
        };
        let mut groups: Vec<Predicate> = Vec::with_capacity(anchor.len());
        for depth in 0..anchor.len() {
            let mut parts: Vec<Predicate> = Vec::with_capacity(depth + 1);
            for (i, entry) in entries.iter().take(depth).enumerate() {
                parts.push(Predicate::Comparison {
                    op: crate::ast::ComparisonOp::Eq,
                    quantifier: crate::ast::Quantifier::None,
                    left: entry.expression.clone(),
                    right: Expression::Parameter(format!("keyset_{i}")),
                    negated: false,
                });
            }
            let entry = &entries[depth];
            let forward = entry.ascending != backward;
            parts.push(Predicate::Comparison {
                op: if forward {
                    crate::ast::ComparisonOp::Gt
                } else {
                    crate::ast::ComparisonOp::Lt
                },
                quantifier: crate::ast::Quantifier::None,
                left: entry.expression.clone(),
                right: Expression::Parameter(format!("keyset_{depth}")),
                negated: false,
            });
            groups.push(Predicate::compound(crate::ast::Connective::And, parts));
        }
        Some(Predicate::compound(crate::ast::Connective::Or, groups))
    }
}

/// The last order-by key must identify a row on its own, otherwise page
/// boundaries are ambiguous.
fn check_unique_last_key(
    core: &crate::builder::core::QueryCore,
    last: &OrderByEntry,
) -> Result<()> {
    let err = || {
        CriteriaError::pagination(
            "the last ORDER BY key must be a unique, non-null attribute",
        )
    };
    let Expression::Path(path) = &last.expression else {
        return Err(err());
    };
    let Some(resolved) = &path.resolved else {
        return Err(err());
    };
    if resolved.tail.len() != 1 {
        return Err(err());
    }
    let entity = if resolved.alias == core.alias {
        core.entity.clone()
    } else {
        let Some(pos) = core.joins.find_alias(&resolved.alias) else {
            return Err(err());
        };
        match &core.joins.nodes[pos].target {
            Some(target) => target.clone(),
            None => return Err(err()),
        }
    };
    let attribute = core
        .schema
        .entity(&entity)
        .and_then(|e| e.attribute(&resolved.tail[0]))
        .ok_or_else(err)?;
    if attribute.unique && !attribute.nullable {
        Ok(())
    } else {
        Err(err())
    }
}

/// Whether the projection is exactly the root entity's id path.
fn is_sole_root_id_projection(core: &crate::builder::core::QueryCore) -> Result<bool> {
    if core.select.items.len() != 1 {
        return Ok(false);
    }
    let id = core.id_attribute()?;
    Ok(match &core.select.items[0].expr {
        Expression::Path(path) => match &path.resolved {
            Some(resolved) => {
                resolved.alias == core.alias
                    && resolved.tail.len() == 1
                    && resolved.tail[0] == id
            }
            None => false,
        },
        _ => false,
    })
}
