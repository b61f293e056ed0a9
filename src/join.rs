//! Implicit join inference and alias bookkeeping.
//!
//! Dotted path expressions are resolved against the schema lazily, at first
//! render, in clause order. Each relation segment resolves to a join node,
//! creating one on first reference and reusing it afterwards; dedup compares
//! parent alias, relation name and the index sub-expression structurally.
//! Indexed segments always produce a LEFT join carrying a generated
//! `KEY(alias) = index` or `INDEX(alias) = index` restriction.

use crate::ast::{Expression, PathExpression, Predicate};
use crate::error::{CriteriaError, Result};
use crate::params::ParameterRegistry;
use crate::schema::{Attribute, AttributeKind, Schema};
use crate::value::Value;
use hashbrown::HashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Clause-usage bits recorded per join node; joins referenced only by the
/// select clause are pruned from count and id queries.
pub(crate) mod usage {
    pub(crate) const SELECT: u8 = 1;
    pub(crate) const WHERE: u8 = 2;
    pub(crate) const GROUP: u8 = 4;
    pub(crate) const HAVING: u8 = 8;
    pub(crate) const ORDER: u8 = 16;
    pub(crate) const JOIN: u8 = 32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// KEY for map collections, INDEX for list collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexKind {
    Key,
    Index,
}

impl IndexKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            IndexKind::Key => "KEY",
            IndexKind::Index => "INDEX",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct JoinNode {
    pub(crate) parent_alias: String,
    pub(crate) relation: String,
    pub(crate) alias: String,
    pub(crate) kind: JoinKind,
    /// Resolved index expression of an array-index segment.
    pub(crate) index: Option<Expression>,
    pub(crate) index_kind: Option<IndexKind>,
    /// Extra ON restriction of an explicit join-on builder.
    pub(crate) on_extra: Option<Predicate>,
    /// Target entity name; `None` for basic-element collections.
    pub(crate) target: Option<String>,
    /// Explicit joins are always rendered; implicit ones are subject to
    /// select-only pruning.
    pub(crate) explicit: bool,
    pub(crate) usage: u8,
}

/// An explicit join registered through the builder, resolved lazily with the
/// rest of the query.
#[derive(Debug, Clone)]
pub(crate) struct ExplicitJoin {
    pub(crate) path: PathExpression,
    pub(crate) alias: String,
    pub(crate) kind: JoinKind,
    pub(crate) on: Option<Predicate>,
}

#[derive(Debug, Default)]
pub(crate) struct JoinManager {
    pub(crate) nodes: Vec<JoinNode>,
    counters: HashMap<String, usize>,
    pub(crate) pending_explicit: Vec<ExplicitJoin>,
}

impl JoinManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn find_alias(&self, alias: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.alias == alias)
    }

    pub(crate) fn clear_usage(&mut self) {
        for node in &mut self.nodes {
            node.usage = 0;
        }
    }

    fn mark_used(&mut self, alias: &str, bits: u8) {
        let mut pending = vec![alias.to_owned()];
        while let Some(current) = pending.pop() {
            let Some(pos) = self.find_alias(&current) else {
                continue;
            };
            if self.nodes[pos].usage & bits == bits {
                continue;
            }
            self.nodes[pos].usage |= bits;
            pending.push(self.nodes[pos].parent_alias.clone());
            // the joins behind an index restriction must stay in any
            // render that keeps the indexed join
            if let Some(index) = &self.nodes[pos].index {
                index_aliases(index, &mut pending);
            }
        }
    }

    /// Resolves or creates the join node for one relation segment and
    /// returns its alias. Re-referencing an identical segment (structural
    /// equality on the index expression) reuses the existing node.
    #[allow(clippy::too_many_arguments)]
    fn get_or_create(
        &mut self,
        parent: &str,
        relation: &str,
        kind: JoinKind,
        index: Option<Expression>,
        index_kind: Option<IndexKind>,
        explicit_alias: Option<&str>,
        target: Option<&str>,
        bits: u8,
    ) -> Result<String> {
        if let Some(pos) = self.nodes.iter().position(|n| {
            n.parent_alias == parent && n.relation == relation && n.index == index
        }) {
            let alias = self.nodes[pos].alias.clone();
            self.mark_used(&alias, bits);
            return Ok(alias);
        }

        let alias = match explicit_alias {
            Some(alias) => {
                if self.find_alias(alias).is_some() {
                    return Err(CriteriaError::resolution(format!(
                        "join alias '{alias}' is already in use"
                    )));
                }
                alias.to_owned()
            }
            None => {
                let base = match &index {
                    Some(ix) => format!("{relation}_{}", index_desc(ix)),
                    None => relation.to_owned(),
                };
                let n = self.counters.entry(base.clone()).or_insert(0);
                *n += 1;
                format!("{base}_{n}")
            }
        };

        self.nodes.push(JoinNode {
            parent_alias: parent.to_owned(),
            relation: relation.to_owned(),
            alias: alias.clone(),
            kind,
            index,
            index_kind,
            on_extra: None,
            target: target.map(str::to_owned),
            explicit: explicit_alias.is_some(),
            usage: 0,
        });
        self.mark_used(&alias, bits);
        Ok(alias)
    }
}

/// Join aliases a resolved index expression refers to.
fn index_aliases(expr: &Expression, out: &mut Vec<String>) {
    match expr {
        Expression::Path(path) => {
            if let Some(resolved) = &path.resolved {
                out.push(resolved.alias.clone());
            }
        }
        Expression::Function(f) => {
            for arg in &f.args {
                index_aliases(arg, out);
            }
        }
        Expression::Arithmetic { left, right, .. } => {
            index_aliases(left, out);
            index_aliases(right, out);
        }
        _ => {}
    }
}

/// Deterministic alias fragment derived from an index expression. Path-like
/// indexes use their resolved alias so that differently-indexed accesses to
/// the same collection cannot collide.
fn index_desc(index: &Expression) -> String {
    match index {
        Expression::Parameter(name) => name.clone(),
        Expression::Literal(Value::Int(n)) => n.to_string(),
        Expression::Path(p) => match &p.resolved {
            Some(res) if res.tail.is_empty() => res.alias.clone(),
            Some(res) => format!("{}_{}", res.alias, res.tail.join("_")),
            None => p.dotted().replace('.', "_"),
        },
        _ => "expr".to_owned(),
    }
}

/// One clause-scoped resolution pass over expressions and predicates.
pub(crate) struct Resolver<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) joins: &'a mut JoinManager,
    pub(crate) params: &'a Rc<RefCell<ParameterRegistry>>,
    pub(crate) root_alias: &'a str,
    pub(crate) root_entity: &'a str,
    pub(crate) outer_aliases: &'a [String],
    pub(crate) clause: u8,
}

impl Resolver<'_> {
    pub(crate) fn resolve_expression(&mut self, expr: &mut Expression) -> Result<()> {
        match expr {
            Expression::Path(path) => self.resolve_path(path, false),
            Expression::Literal(_) => Ok(()),
            Expression::Parameter(name) => {
                self.params.borrow_mut().register_named(name);
                Ok(())
            }
            Expression::Function(f) => {
                for arg in &mut f.args {
                    self.resolve_expression(arg)?;
                }
                Ok(())
            }
            Expression::Arithmetic { left, right, .. } => {
                self.resolve_expression(left)?;
                self.resolve_expression(right)
            }
            Expression::Case(case) => {
                for when in &mut case.whens {
                    self.resolve_predicate(&mut when.condition)?;
                    self.resolve_expression(&mut when.result)?;
                }
                if let Some(otherwise) = &mut case.otherwise {
                    self.resolve_expression(otherwise)?;
                }
                Ok(())
            }
            // nested query cores resolve themselves during prepare
            Expression::Subquery(_) => Ok(()),
        }
    }

    pub(crate) fn resolve_predicate(&mut self, predicate: &mut Predicate) -> Result<()> {
        match predicate {
            Predicate::Compound { children, .. } => {
                for child in children {
                    self.resolve_predicate(child)?;
                }
                Ok(())
            }
            Predicate::Comparison { left, right, .. } => {
                self.resolve_expression(left)?;
                self.resolve_expression(right)
            }
            Predicate::Between {
                left, start, end, ..
            } => {
                self.resolve_expression(left)?;
                self.resolve_expression(start)?;
                self.resolve_expression(end)
            }
            Predicate::Like { left, pattern, .. } => {
                self.resolve_expression(left)?;
                self.resolve_expression(pattern)
            }
            Predicate::In { left, values, .. } => {
                self.resolve_expression(left)?;
                match values {
                    crate::ast::InList::Items(items) => {
                        for item in items {
                            self.resolve_expression(item)?;
                        }
                    }
                    crate::ast::InList::Parameter(name) => {
                        self.params.borrow_mut().register_named(name);
                    }
                    crate::ast::InList::Subquery(_) => {}
                }
                Ok(())
            }
            // value-position operands keep their final segment unjoined
            Predicate::IsNull { left, .. } => self.resolve_collection_operand(left),
            Predicate::IsEmpty { left, .. } => self.resolve_collection_operand(left),
            Predicate::MemberOf {
                left, collection, ..
            } => {
                self.resolve_collection_operand(left)?;
                self.resolve_collection_operand(collection)
            }
            Predicate::Exists { .. } => Ok(()),
        }
    }

    fn resolve_collection_operand(&mut self, expr: &mut Expression) -> Result<()> {
        match expr {
            Expression::Path(path) => self.resolve_path(path, true),
            other => self.resolve_expression(other),
        }
    }

    /// Resolves the pending explicit joins registered through the builder.
    pub(crate) fn resolve_explicit(&mut self, join: ExplicitJoin) -> Result<()> {
        let ExplicitJoin {
            mut path,
            alias,
            kind,
            on,
        } = join;
        let (mut current_alias, mut current_entity, start) = self.anchor(&path);
        let last = path.segments.len() - 1;
        if start > last {
            return Err(CriteriaError::resolution(format!(
                "explicit join path '{}' has no relation segment",
                path.dotted()
            )));
        }
        for i in start..path.segments.len() {
            let entity = current_entity.ok_or_else(|| {
                CriteriaError::resolution(format!(
                    "cannot dereference a basic-element path in '{}'",
                    path.dotted()
                ))
            })?;
            let attr = attribute(self.schema, &entity, &path.segments[i].name)?;
            if !attr.kind.is_relation() {
                return Err(CriteriaError::resolution(format!(
                    "explicit join attribute '{}' is not a relation",
                    attr.name
                )));
            }
            let index = self.resolve_index(&mut path.segments[i].index)?;
            let index_kind = self.index_kind(attr, index.as_ref(), &path.segments[i].name)?;
            let (node_kind, explicit_alias) = if i == last {
                (kind, Some(alias.as_str()))
            } else {
                (implied_kind(attr), None)
            };
            current_alias = self.joins.get_or_create(
                &current_alias,
                &attr.name,
                node_kind,
                index,
                index_kind,
                explicit_alias,
                attr.target.as_deref(),
                usage::JOIN,
            )?;
            current_entity = attr.target.clone();
        }
        if let Some(on) = on {
            let mut on = on;
            self.resolve_predicate(&mut on)?;
            let pos = self
                .joins
                .find_alias(&alias)
                .expect("explicit join node was just created");
            self.joins.nodes[pos].on_extra = Some(on);
        }
        Ok(())
    }

    /// Determines where a path starts: the root alias, a registered join
    /// alias, or implicitly the root entity. Returns the anchor alias, the
    /// anchor entity name and the index of the first unconsumed segment.
    fn anchor(&self, path: &PathExpression) -> (String, Option<String>, usize) {
        let first = &path.segments[0];
        if first.index.is_none() {
            if first.name == self.root_alias {
                return (
                    self.root_alias.to_owned(),
                    Some(self.root_entity.to_owned()),
                    1,
                );
            }
            if let Some(pos) = self.joins.find_alias(&first.name) {
                return (first.name.clone(), self.joins.nodes[pos].target.clone(), 1);
            }
        }
        (
            self.root_alias.to_owned(),
            Some(self.root_entity.to_owned()),
            0,
        )
    }

    fn resolve_index(&mut self, index: &mut Option<Box<Expression>>) -> Result<Option<Expression>> {
        match index {
            Some(ix) => {
                self.resolve_expression(ix)?;
                Ok(Some((**ix).clone()))
            }
            None => Ok(None),
        }
    }

    fn index_kind(
        &self,
        attr: &Attribute,
        index: Option<&Expression>,
        segment: &str,
    ) -> Result<Option<IndexKind>> {
        if index.is_none() {
            return Ok(None);
        }
        match attr.kind {
            AttributeKind::MapCollection => Ok(Some(IndexKind::Key)),
            AttributeKind::ListCollection => Ok(Some(IndexKind::Index)),
            _ => Err(CriteriaError::resolution(format!(
                "attribute '{segment}' does not support index access"
            ))),
        }
    }

    fn resolve_path(&mut self, path: &mut PathExpression, last_as_value: bool) -> Result<()> {
        if let Some(resolved) = &path.resolved {
            let alias = resolved.alias.clone();
            self.joins.mark_used(&alias, self.clause);
            return Ok(());
        }
        if path.segments.is_empty() {
            return Err(CriteriaError::resolution("empty path expression"));
        }

        // correlated paths of a subquery pass through unresolved
        let first = &path.segments[0].name;
        if self.outer_aliases.iter().any(|a| a == first) {
            return Ok(());
        }

        let (mut current_alias, mut current_entity, start) = self.anchor(path);
        if start == 1 {
            self.joins.mark_used(&current_alias, self.clause);
        }
        if start == 1 && path.segments.len() == 1 {
            path.resolved = Some(crate::ast::ResolvedPath {
                alias: current_alias,
                tail: smallvec::SmallVec::new(),
            });
            return Ok(());
        }

        let mut tail: smallvec::SmallVec<[String; 2]> = smallvec::SmallVec::new();
        for i in start..path.segments.len() {
            let is_last = i + 1 == path.segments.len();
            if !tail.is_empty() {
                return Err(CriteriaError::resolution(format!(
                    "cannot dereference basic attribute in path '{}'",
                    path.dotted()
                )));
            }
            let entity = current_entity.clone().ok_or_else(|| {
                CriteriaError::resolution(format!(
                    "cannot dereference a basic-element value in path '{}'",
                    path.dotted()
                ))
            })?;
            let attr = attribute(self.schema, &entity, &path.segments[i].name)?;
            let index = self.resolve_index(&mut path.segments[i].index)?;
            let index_kind = self.index_kind(attr, index.as_ref(), &attr.name)?;

            match attr.kind {
                AttributeKind::Basic => {
                    tail.push(attr.name.clone());
                }
                _ if is_last && last_as_value => {
                    tail.push(attr.name.clone());
                }
                _ => {
                    let alias = self.joins.get_or_create(
                        &current_alias,
                        &attr.name,
                        implied_kind(attr),
                        index,
                        index_kind,
                        None,
                        attr.target.as_deref(),
                        self.clause,
                    )?;
                    current_alias = alias;
                    current_entity = attr.target.clone();
                }
            }
        }

        path.resolved = Some(crate::ast::ResolvedPath {
            alias: current_alias,
            tail,
        });
        Ok(())
    }
}

fn implied_kind(attr: &Attribute) -> JoinKind {
    if attr.kind.is_collection() || attr.nullable {
        JoinKind::Left
    } else {
        JoinKind::Inner
    }
}

fn attribute<'s>(schema: &'s Schema, entity: &str, name: &str) -> Result<&'s Attribute> {
    let entity_type = schema
        .entity(entity)
        .ok_or_else(|| CriteriaError::resolution(format!("unknown entity '{entity}'")))?;
    entity_type.attribute(name).ok_or_else(|| {
        CriteriaError::resolution(format!("unknown attribute '{name}' on entity '{entity}'"))
    })
}
