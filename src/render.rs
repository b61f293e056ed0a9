//! Query-string assembly.
//!
//! The renderer walks a prepared query core and produces one query string per
//! variant: the base query, and the count / id / content queries of a
//! pagination split. Variants differ only in the select head, which joins are
//! kept, the where source, and order handling; the expression and predicate
//! walks are shared.

use crate::ast::{
    ArithmeticOp, ComparisonOp, Connective, Expression, InList, Predicate, Quantifier,
};
use crate::builder::core::QueryCore;
use crate::error::Result;
use crate::join::{JoinNode, usage};

/// Which of the query variants to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryKind {
    Base,
    /// `SELECT COUNT(DISTINCT id)`, joins pruned to where-reachable ones.
    Count,
    /// Identifier query of the pagination split.
    Id,
    /// Content query, filtered by the pending `ids` parameter.
    Content,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderSettings<'a> {
    pub(crate) kind: QueryKind,
    /// Flips every order-by entry, for backward keyset paging.
    pub(crate) invert_order: bool,
    /// Alias prefix of the id query embedded in `PAGE_POSITION`.
    pub(crate) alias_prefix: Option<&'a str>,
    /// Additional restriction ANDed to (or, for the content query, standing
    /// in for) the where clause.
    pub(crate) extra_where: Option<&'a Predicate>,
    /// Parameter name of a `PAGE_POSITION` count variant.
    pub(crate) page_position: Option<&'a str>,
}

impl RenderSettings<'_> {
    pub(crate) fn base() -> Self {
        RenderSettings {
            kind: QueryKind::Base,
            invert_order: false,
            alias_prefix: None,
            extra_where: None,
            page_position: None,
        }
    }
}

pub(crate) struct Renderer<'a> {
    core: &'a QueryCore,
    settings: RenderSettings<'a>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(core: &'a QueryCore, settings: RenderSettings<'a>) -> Self {
        Renderer { core, settings }
    }

    pub(crate) fn render(&self) -> Result<String> {
        let mut out = String::with_capacity(128);
        self.write_select(&mut out)?;
        self.write_from(&mut out)?;
        self.write_where(&mut out)?;
        self.write_group_by(&mut out)?;
        self.write_having(&mut out)?;
        self.write_order_by(&mut out)?;
        Ok(out)
    }

    /// Renders one expression on its own, for projection metadata.
    pub(crate) fn expression_text(&self, expr: &Expression) -> Result<String> {
        let mut out = String::new();
        self.write_expression(&mut out, expr)?;
        Ok(out)
    }

    fn alias(&self, out: &mut String, alias: &str) {
        if let Some(prefix) = self.settings.alias_prefix {
            out.push_str(prefix);
        }
        out.push_str(alias);
    }

    /// Root id path, `alias.id`.
    fn write_root_id(&self, out: &mut String) -> Result<()> {
        self.alias(out, &self.core.alias);
        out.push('.');
        out.push_str(&self.core.id_attribute()?);
        Ok(())
    }

    // ==================== clauses ====================

    fn write_select(&self, out: &mut String) -> Result<()> {
        out.push_str("SELECT ");
        match self.settings.kind {
            QueryKind::Count => {
                out.push_str("COUNT(DISTINCT ");
                self.write_root_id(out)?;
                out.push(')');
                if let Some(param) = self.settings.page_position {
                    let embedded = Renderer::new(
                        self.core,
                        RenderSettings {
                            kind: QueryKind::Id,
                            invert_order: false,
                            alias_prefix: Some("_page_position_"),
                            extra_where: None,
                            page_position: None,
                        },
                    )
                    .render()?;
                    out.push_str(", PAGE_POSITION((");
                    out.push_str(&embedded);
                    out.push_str("), :");
                    out.push_str(param);
                    out.push(')');
                }
            }
            QueryKind::Id => {
                let mut seen = Vec::new();
                let mut id = String::new();
                self.write_root_id(&mut id)?;
                out.push_str(&id);
                seen.push(id);
                for extra in self.id_query_order_expressions()? {
                    if !seen.contains(&extra) {
                        out.push_str(", ");
                        out.push_str(&extra);
                        seen.push(extra);
                    }
                }
            }
            QueryKind::Base | QueryKind::Content => {
                if self.core.select.distinct {
                    out.push_str("DISTINCT ");
                }
                if self.core.select.is_empty() {
                    self.alias(out, &self.core.alias);
                } else {
                    for (i, item) in self.core.select.items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.write_expression(out, &item.expr)?;
                        if let Some(alias) = &item.alias {
                            out.push_str(" AS ");
                            out.push_str(alias);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn include_join(&self, node: &JoinNode) -> bool {
        if node.explicit {
            return true;
        }
        let mask = match self.settings.kind {
            QueryKind::Base => return true,
            QueryKind::Count => usage::WHERE | usage::GROUP | usage::HAVING,
            QueryKind::Id => usage::WHERE | usage::GROUP | usage::HAVING | usage::ORDER,
            QueryKind::Content => usage::SELECT | usage::ORDER | usage::JOIN,
        };
        node.usage & mask != 0
    }

    fn write_from(&self, out: &mut String) -> Result<()> {
        out.push_str(" FROM ");
        out.push_str(&self.core.entity);
        out.push(' ');
        self.alias(out, &self.core.alias);

        for node in &self.core.joins.nodes {
            if !self.include_join(node) {
                continue;
            }
            out.push(' ');
            out.push_str(node.kind.as_str());
            out.push(' ');
            self.alias(out, &node.parent_alias);
            out.push('.');
            out.push_str(&node.relation);
            out.push(' ');
            self.alias(out, &node.alias);

            let mut wrote_on = false;
            if let (Some(index), Some(index_kind)) = (&node.index, node.index_kind) {
                out.push_str(" ON ");
                wrote_on = true;
                out.push_str(index_kind.as_str());
                out.push('(');
                self.alias(out, &node.alias);
                out.push_str(") = ");
                self.write_expression(out, index)?;
            }
            if let Some(extra) = &node.on_extra {
                out.push_str(if wrote_on { " AND " } else { " ON " });
                self.write_predicate(out, extra, Some(Connective::And))?;
            }
        }
        Ok(())
    }

    fn write_where(&self, out: &mut String) -> Result<()> {
        let base = match self.settings.kind {
            QueryKind::Content => None,
            _ => self.core.wher.combined(),
        };
        let combined = match (base, self.settings.extra_where) {
            (Some(base), Some(extra)) => Some(Predicate::compound(
                Connective::And,
                vec![base, extra.clone()],
            )),
            (Some(base), None) => Some(base),
            (None, Some(extra)) => Some(extra.clone()),
            (None, None) => None,
        };
        if let Some(predicate) = combined {
            out.push_str(" WHERE ");
            self.write_predicate(out, &predicate, None)?;
        }
        Ok(())
    }

    /// Rendered non-aggregate order-by expressions, in order, for the id
    /// query's select list and synthesized group by.
    fn id_query_order_expressions(&self) -> Result<Vec<String>> {
        let mut rendered = Vec::new();
        for entry in &self.core.order_by.entries {
            if entry.expression.is_aggregate() {
                continue;
            }
            let mut text = String::new();
            self.write_expression(&mut text, &entry.expression)?;
            rendered.push(text);
        }
        Ok(rendered)
    }

    fn write_group_by(&self, out: &mut String) -> Result<()> {
        match self.settings.kind {
            QueryKind::Base => {
                if self.core.group_by.is_empty() {
                    return Ok(());
                }
                out.push_str(" GROUP BY ");
                for (i, item) in self.core.group_by.items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_expression(out, item)?;
                }
                Ok(())
            }
            QueryKind::Id => {
                // collapses collection-join duplicates of the root id
                out.push_str(" GROUP BY ");
                let mut seen = Vec::new();
                let mut id = String::new();
                self.write_root_id(&mut id)?;
                out.push_str(&id);
                seen.push(id);
                for extra in self.id_query_order_expressions()? {
                    if !seen.contains(&extra) {
                        out.push_str(", ");
                        out.push_str(&extra);
                        seen.push(extra);
                    }
                }
                Ok(())
            }
            QueryKind::Count | QueryKind::Content => Ok(()),
        }
    }

    fn write_having(&self, out: &mut String) -> Result<()> {
        if self.settings.kind != QueryKind::Base || self.core.having.is_empty() {
            return Ok(());
        }
        if let Some(predicate) = self.core.having.combined() {
            out.push_str(" HAVING ");
            self.write_predicate(out, &predicate, None)?;
        }
        Ok(())
    }

    fn write_order_by(&self, out: &mut String) -> Result<()> {
        if self.settings.kind == QueryKind::Count || self.core.order_by.is_empty() {
            return Ok(());
        }
        out.push_str(" ORDER BY ");
        for (i, entry) in self.core.order_by.entries.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let alias_in_scope = matches!(
                self.settings.kind,
                QueryKind::Base | QueryKind::Content
            );
            match &entry.select_alias {
                Some(alias) if alias_in_scope => out.push_str(alias),
                _ => self.write_expression(out, &entry.expression)?,
            }
            let (ascending, nulls_first) = if self.settings.invert_order {
                (!entry.ascending, !entry.nulls_first)
            } else {
                (entry.ascending, entry.nulls_first)
            };
            out.push_str(if ascending { " ASC" } else { " DESC" });
            out.push_str(if nulls_first {
                " NULLS FIRST"
            } else {
                " NULLS LAST"
            });
        }
        Ok(())
    }

    // ==================== expressions ====================

    fn write_expression(&self, out: &mut String, expr: &Expression) -> Result<()> {
        match expr {
            Expression::Path(path) => {
                match &path.resolved {
                    Some(resolved) => {
                        self.alias(out, &resolved.alias);
                        for part in &resolved.tail {
                            out.push('.');
                            out.push_str(part);
                        }
                    }
                    // unresolved paths are correlated references to an
                    // enclosing query and render verbatim
                    None => {
                        for (i, segment) in path.segments.iter().enumerate() {
                            if i > 0 {
                                out.push('.');
                            }
                            out.push_str(&segment.name);
                            if let Some(index) = &segment.index {
                                out.push('[');
                                self.write_expression(out, index)?;
                                out.push(']');
                            }
                        }
                    }
                }
                Ok(())
            }
            Expression::Literal(value) => {
                value.write_literal(out);
                Ok(())
            }
            Expression::Parameter(name) => {
                out.push(':');
                out.push_str(name);
                Ok(())
            }
            Expression::Function(f) => {
                out.push_str(&f.name);
                out.push('(');
                for (i, arg) in f.args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_expression(out, arg)?;
                }
                out.push(')');
                Ok(())
            }
            Expression::Arithmetic { op, left, right } => {
                self.write_arithmetic_operand(out, left, *op, false)?;
                out.push(' ');
                out.push_str(op.as_str());
                out.push(' ');
                self.write_arithmetic_operand(out, right, *op, true)
            }
            Expression::Case(case) => {
                out.push_str("CASE");
                for when in &case.whens {
                    out.push_str(" WHEN ");
                    self.write_predicate(out, &when.condition, None)?;
                    out.push_str(" THEN ");
                    self.write_expression(out, &when.result)?;
                }
                if let Some(otherwise) = &case.otherwise {
                    out.push_str(" ELSE ");
                    self.write_expression(out, otherwise)?;
                }
                out.push_str(" END");
                Ok(())
            }
            Expression::Subquery(subquery) => {
                let inner = self.core.subqueries[subquery.0].borrow();
                let text = Renderer::new(&inner, RenderSettings::base()).render()?;
                out.push('(');
                out.push_str(&text);
                out.push(')');
                Ok(())
            }
        }
    }

    fn write_arithmetic_operand(
        &self,
        out: &mut String,
        operand: &Expression,
        parent: ArithmeticOp,
        right_side: bool,
    ) -> Result<()> {
        let precedence = |op: ArithmeticOp| match op {
            ArithmeticOp::Add | ArithmeticOp::Sub => 1,
            ArithmeticOp::Mul | ArithmeticOp::Div => 2,
        };
        let needs_parens = match operand {
            Expression::Arithmetic { op, .. } => {
                precedence(*op) < precedence(parent)
                    || (right_side
                        && precedence(*op) == precedence(parent)
                        && matches!(parent, ArithmeticOp::Sub | ArithmeticOp::Div))
            }
            _ => false,
        };
        if needs_parens {
            out.push('(');
            self.write_expression(out, operand)?;
            out.push(')');
        } else {
            self.write_expression(out, operand)?;
        }
        Ok(())
    }

    // ==================== predicates ====================

    fn write_predicate(
        &self,
        out: &mut String,
        predicate: &Predicate,
        parent: Option<Connective>,
    ) -> Result<()> {
        match predicate {
            Predicate::Compound {
                connective,
                children,
                negated,
            } => {
                let parens =
                    *negated || (children.len() > 1 && parent.is_some_and(|p| p != *connective));
                if *negated {
                    out.push_str("NOT ");
                }
                if parens {
                    out.push('(');
                }
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                        out.push_str(connective.as_str());
                        out.push(' ');
                    }
                    self.write_predicate(out, child, Some(*connective))?;
                }
                if parens {
                    out.push(')');
                }
                Ok(())
            }
            Predicate::Comparison {
                op,
                quantifier,
                left,
                right,
                negated,
            } => {
                if *negated && *op != ComparisonOp::Eq {
                    out.push_str("NOT (");
                }
                self.write_expression(out, left)?;
                out.push(' ');
                if *negated && *op == ComparisonOp::Eq {
                    out.push_str("<>");
                } else {
                    out.push_str(op.as_str());
                }
                out.push(' ');
                match quantifier {
                    Quantifier::None => self.write_expression(out, right)?,
                    Quantifier::All => {
                        out.push_str("ALL");
                        self.write_expression(out, right)?;
                    }
                    Quantifier::Any => {
                        out.push_str("ANY");
                        self.write_expression(out, right)?;
                    }
                }
                if *negated && *op != ComparisonOp::Eq {
                    out.push(')');
                }
                Ok(())
            }
            Predicate::Between {
                left,
                start,
                end,
                negated,
            } => {
                self.write_expression(out, left)?;
                out.push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                self.write_expression(out, start)?;
                out.push_str(" AND ");
                self.write_expression(out, end)
            }
            Predicate::Like {
                left,
                pattern,
                case_sensitive,
                escape,
                negated,
            } => {
                let wrap = |out: &mut String,
                            renderer: &Renderer<'_>,
                            expr: &Expression|
                 -> Result<()> {
                    if *case_sensitive {
                        renderer.write_expression(out, expr)
                    } else {
                        out.push_str("UPPER(");
                        renderer.write_expression(out, expr)?;
                        out.push(')');
                        Ok(())
                    }
                };
                wrap(out, self, left)?;
                out.push_str(if *negated { " NOT LIKE " } else { " LIKE " });
                wrap(out, self, pattern)?;
                if let Some(escape) = escape {
                    out.push_str(" ESCAPE '");
                    out.push(*escape);
                    out.push('\'');
                }
                Ok(())
            }
            Predicate::In {
                left,
                values,
                negated,
            } => {
                self.write_expression(out, left)?;
                out.push_str(if *negated { " NOT IN " } else { " IN " });
                match values {
                    InList::Parameter(name) => {
                        out.push_str("(:");
                        out.push_str(name);
                        out.push(')');
                    }
                    InList::Items(items) => {
                        out.push('(');
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            self.write_expression(out, item)?;
                        }
                        out.push(')');
                    }
                    InList::Subquery(subquery) => {
                        self.write_expression(out, &Expression::Subquery(*subquery))?;
                    }
                }
                Ok(())
            }
            Predicate::IsNull { left, negated } => {
                self.write_expression(out, left)?;
                out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
                Ok(())
            }
            Predicate::IsEmpty { left, negated } => {
                self.write_expression(out, left)?;
                out.push_str(if *negated { " IS NOT EMPTY" } else { " IS EMPTY" });
                Ok(())
            }
            Predicate::MemberOf {
                left,
                collection,
                negated,
            } => {
                self.write_expression(out, left)?;
                out.push_str(if *negated {
                    " NOT MEMBER OF "
                } else {
                    " MEMBER OF "
                });
                self.write_expression(out, collection)
            }
            Predicate::Exists { subquery, negated } => {
                if *negated {
                    out.push_str("NOT ");
                }
                out.push_str("EXISTS ");
                self.write_expression(out, &Expression::Subquery(*subquery))
            }
        }
    }
}
