//! Per-clause state carried by a query core.
//!
//! Each manager owns the parsed entries of one clause. Entries keep their
//! parsed form until the lazy resolution pass runs at first render.

use crate::ast::{Connective, Expression, Predicate};

// ================================================================================================
// Select
// ================================================================================================

#[derive(Debug, Clone)]
pub(crate) struct SelectItem {
    pub(crate) expr: Expression,
    pub(crate) alias: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct SelectManager {
    pub(crate) items: Vec<SelectItem>,
    pub(crate) distinct: bool,
}

impl SelectManager {
    pub(crate) fn add(&mut self, expr: Expression, alias: Option<String>) {
        self.items.push(SelectItem { expr, alias });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up the select expression bound to `alias`, used to substitute
    /// select aliases referenced by the order-by clause.
    pub(crate) fn aliased(&self, alias: &str) -> Option<&Expression> {
        self.items
            .iter()
            .find(|item| item.alias.as_deref() == Some(alias))
            .map(|item| &item.expr)
    }
}

// ================================================================================================
// Where / Having
// ================================================================================================

/// Root-level conjunction of a WHERE or HAVING clause. Every top-level
/// restriction becomes one child; rendering combines them with AND.
#[derive(Debug, Default)]
pub(crate) struct PredicateManager {
    pub(crate) children: Vec<Predicate>,
}

impl PredicateManager {
    pub(crate) fn add(&mut self, predicate: Predicate) {
        self.children.push(predicate);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn combined(&self) -> Option<Predicate> {
        if self.children.is_empty() {
            None
        } else {
            Some(Predicate::compound(Connective::And, self.children.clone()))
        }
    }
}

// ================================================================================================
// Group by
// ================================================================================================

#[derive(Debug, Default)]
pub(crate) struct GroupByManager {
    pub(crate) items: Vec<Expression>,
}

impl GroupByManager {
    pub(crate) fn add(&mut self, expr: Expression) {
        self.items.push(expr);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ================================================================================================
// Order by
// ================================================================================================

#[derive(Debug, Clone)]
pub(crate) struct OrderByEntry {
    pub(crate) expression: Expression,
    /// Select alias this entry referred to, if any. The alias is rendered
    /// where it is in scope (base and content queries); the expanded
    /// expression everywhere else.
    pub(crate) select_alias: Option<String>,
    pub(crate) ascending: bool,
    pub(crate) nulls_first: bool,
}

#[derive(Debug, Default)]
pub(crate) struct OrderByManager {
    pub(crate) entries: Vec<OrderByEntry>,
}

impl OrderByManager {
    pub(crate) fn add(&mut self, expression: Expression, ascending: bool, nulls_first: bool) {
        self.entries.push(OrderByEntry {
            expression,
            select_alias: None,
            ascending,
            nulls_first,
        });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
