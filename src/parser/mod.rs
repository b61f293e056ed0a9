//! Expression text parsing.
//!
//! Two entry grammars matter: the predicate-capable grammar (`Simple`,
//! `JoinOn`) used for restriction left-hand sides and join ON text, and the
//! scalar grammar (`Scalar`, `Arithmetic`) used for select items, THEN/ELSE
//! results and arithmetic operands, which rejects top-level boolean
//! connectives. Parsing is pure: no alias resolution, no side effects.
//! Identical inputs are served from a process-wide cache of parsed trees.

mod cache;
mod lexer;

use crate::ast::{
    ArithmeticOp, CaseExpression, ComparisonOp, Connective, Expression, FunctionExpression, InList,
    PathExpression, PathSegment, Predicate, Quantifier, WhenClause,
};
use crate::error::{CriteriaError, Result};
use crate::value::Value;
use lexer::{Lexeme, Tok, lex};
use smallvec::SmallVec;

/// Entry grammar selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    /// Full expression grammar, CASE allowed at top level.
    Simple,
    /// Scalar grammar for select/THEN/operands; rejects top-level CASE and
    /// boolean connectives.
    Scalar,
    /// Alias of `Scalar`: arithmetic operand position.
    Arithmetic,
    /// Full boolean predicate grammar for join ON and textual restrictions.
    JoinOn,
}

/// A parsed tree, expression or predicate depending on the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Expression(Expression),
    Predicate(Predicate),
}

/// Parses expression text under the given grammar, consulting the parse
/// cache first. Cached trees are cloned out; the cache never hands out
/// shared nodes.
pub fn parse(text: &str, grammar: Grammar) -> Result<Parsed> {
    if let Some(hit) = cache::lookup(grammar, text) {
        tracing::trace!(text, ?grammar, "expression parse cache hit");
        return Ok(hit);
    }
    let toks = lex(text)?;
    let mut parser = Parser {
        toks,
        pos: 0,
        len: text.len(),
        allow_case: !matches!(grammar, Grammar::Scalar | Grammar::Arithmetic),
    };
    let parsed = match grammar {
        Grammar::Simple | Grammar::Scalar | Grammar::Arithmetic => {
            let expr = parser.expression()?;
            parser.expect_eof()?;
            Parsed::Expression(expr)
        }
        Grammar::JoinOn => {
            let pred = parser.or_predicate()?;
            parser.expect_eof()?;
            Parsed::Predicate(pred)
        }
    };
    cache::insert(grammar, text, &parsed);
    Ok(parsed)
}

/// Parses a scalar expression (select items, operands, THEN results).
pub(crate) fn parse_scalar(text: &str) -> Result<Expression> {
    match parse(text, Grammar::Scalar)? {
        Parsed::Expression(e) => Ok(e),
        Parsed::Predicate(_) => unreachable!("scalar grammar yields expressions"),
    }
}

/// Parses a restriction left-hand side or similar predicate-capable slot.
pub(crate) fn parse_simple(text: &str) -> Result<Expression> {
    match parse(text, Grammar::Simple)? {
        Parsed::Expression(e) => Ok(e),
        Parsed::Predicate(_) => unreachable!("simple grammar yields expressions"),
    }
}

/// Parses full boolean predicate text (join ON clauses).
pub(crate) fn parse_predicate(text: &str) -> Result<Predicate> {
    match parse(text, Grammar::JoinOn)? {
        Parsed::Predicate(p) => Ok(p),
        Parsed::Expression(_) => unreachable!("join-on grammar yields predicates"),
    }
}

const AGGREGATES: [&str; 5] = ["COUNT", "AVG", "SUM", "MIN", "MAX"];

struct Parser {
    toks: Vec<Lexeme>,
    pos: usize,
    len: usize,
    /// CASE expressions are only legal in the predicate-capable grammars.
    allow_case: bool,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|l| &l.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.toks.get(self.pos + offset).map(|l| &l.tok)
    }

    fn position(&self) -> usize {
        self.toks.get(self.pos).map_or(self.len, |l| l.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).map(|l| l.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> CriteriaError {
        CriteriaError::Parse {
            message: message.into(),
            position: self.position(),
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<()> {
        if self.peek() == Some(&tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.pos == self.toks.len() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    /// Case-insensitive keyword check without consuming.
    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // ==================== predicate grammar ====================

    fn or_predicate(&mut self) -> Result<Predicate> {
        let first = self.and_predicate()?;
        if !self.at_keyword("OR") {
            return Ok(first);
        }
        let mut children = vec![first];
        while self.eat_keyword("OR") {
            children.push(self.and_predicate()?);
        }
        Ok(Predicate::Compound {
            connective: Connective::Or,
            children,
            negated: false,
        })
    }

    fn and_predicate(&mut self) -> Result<Predicate> {
        let first = self.unary_predicate()?;
        if !self.at_keyword("AND") {
            return Ok(first);
        }
        let mut children = vec![first];
        while self.eat_keyword("AND") {
            children.push(self.unary_predicate()?);
        }
        Ok(Predicate::Compound {
            connective: Connective::And,
            children,
            negated: false,
        })
    }

    fn unary_predicate(&mut self) -> Result<Predicate> {
        if self.eat_keyword("NOT") {
            let mut inner = self.unary_predicate()?;
            negate(&mut inner);
            return Ok(inner);
        }
        if self.peek() == Some(&Tok::LParen) {
            // Could be a parenthesized predicate group or a parenthesized
            // scalar operand; try the predicate reading and backtrack.
            let mark = self.pos;
            self.pos += 1;
            if let Ok(group) = self.or_predicate()
                && self.peek() == Some(&Tok::RParen)
                && !self.scalar_follows(1)
            {
                self.pos += 1;
                return Ok(group);
            }
            self.pos = mark;
        }
        self.atom_predicate()
    }

    /// Whether the token after `offset` continues a scalar expression,
    /// meaning the parenthesized group we just read was an operand after all.
    fn scalar_follows(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset),
            Some(
                Tok::Plus
                    | Tok::Minus
                    | Tok::Star
                    | Tok::Slash
                    | Tok::Eq
                    | Tok::Neq
                    | Tok::Lt
                    | Tok::Le
                    | Tok::Gt
                    | Tok::Ge
            )
        )
    }

    fn atom_predicate(&mut self) -> Result<Predicate> {
        let left = self.additive()?;

        if let Some(op) = self.comparison_op() {
            let right = self.additive()?;
            return Ok(Predicate::Comparison {
                op: op.0,
                quantifier: Quantifier::None,
                left,
                right,
                negated: op.1,
            });
        }

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            if self.eat_keyword("NULL") {
                return Ok(Predicate::IsNull { left, negated });
            }
            if self.eat_keyword("EMPTY") {
                return Ok(Predicate::IsEmpty { left, negated });
            }
            return Err(self.error("expected NULL or EMPTY after IS"));
        }

        let negated = self.eat_keyword("NOT");
        if self.eat_keyword("BETWEEN") {
            let start = self.additive()?;
            if !self.eat_keyword("AND") {
                return Err(self.error("expected AND in BETWEEN"));
            }
            let end = self.additive()?;
            return Ok(Predicate::Between {
                left,
                start,
                end,
                negated,
            });
        }
        if self.eat_keyword("LIKE") {
            let pattern = self.additive()?;
            let escape = if self.eat_keyword("ESCAPE") {
                match self.bump() {
                    Some(Tok::Str(s)) if s.chars().count() == 1 => s.chars().next(),
                    _ => return Err(self.error("expected single-character escape literal")),
                }
            } else {
                None
            };
            return Ok(Predicate::Like {
                left,
                pattern,
                case_sensitive: true,
                escape,
                negated,
            });
        }
        if self.eat_keyword("IN") {
            self.expect(Tok::LParen, "'(' after IN")?;
            let mut items = vec![self.additive()?];
            while self.peek() == Some(&Tok::Comma) {
                self.pos += 1;
                items.push(self.additive()?);
            }
            self.expect(Tok::RParen, "')' after IN list")?;
            return Ok(Predicate::In {
                left,
                values: InList::Items(items),
                negated,
            });
        }
        if self.eat_keyword("MEMBER") {
            self.eat_keyword("OF");
            let collection = self.additive()?;
            return Ok(Predicate::MemberOf {
                left,
                collection,
                negated,
            });
        }
        if negated {
            return Err(self.error("expected BETWEEN, LIKE, IN or MEMBER after NOT"));
        }
        Err(self.error("expected a predicate"))
    }

    /// Returns the comparison operator plus whether it is the negated form.
    fn comparison_op(&mut self) -> Option<(ComparisonOp, bool)> {
        let op = match self.peek()? {
            Tok::Eq => (ComparisonOp::Eq, false),
            Tok::Neq => (ComparisonOp::Eq, true),
            Tok::Gt => (ComparisonOp::Gt, false),
            Tok::Ge => (ComparisonOp::Ge, false),
            Tok::Lt => (ComparisonOp::Lt, false),
            Tok::Le => (ComparisonOp::Le, false),
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    // ==================== scalar grammar ====================

    fn expression(&mut self) -> Result<Expression> {
        self.additive()
    }

    fn additive(&mut self) -> Result<Expression> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => ArithmeticOp::Add,
                Some(Tok::Minus) => ArithmeticOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expression::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expression> {
        let mut left = self.primary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => ArithmeticOp::Mul,
                Some(Tok::Slash) => ArithmeticOp::Div,
                _ => break,
            };
            self.pos += 1;
            let right = self.primary()?;
            left = Expression::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expression> {
        match self.peek() {
            Some(Tok::Int(_)) => {
                let Some(Tok::Int(n)) = self.bump() else {
                    unreachable!()
                };
                Ok(Expression::Literal(Value::Int(n)))
            }
            Some(Tok::Real(_)) => {
                let Some(Tok::Real(n)) = self.bump() else {
                    unreachable!()
                };
                Ok(Expression::Literal(Value::Real(n)))
            }
            Some(Tok::Str(_)) => {
                let Some(Tok::Str(s)) = self.bump() else {
                    unreachable!()
                };
                Ok(Expression::Literal(Value::Text(s)))
            }
            Some(Tok::Param(_)) => {
                let Some(Tok::Param(name)) = self.bump() else {
                    unreachable!()
                };
                Ok(Expression::Parameter(name))
            }
            Some(Tok::LParen) => {
                self.pos += 1;
                let inner = self.additive()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(inner)
            }
            Some(Tok::Ident(_)) => self.ident_expression(),
            _ => Err(self.error("expected an expression")),
        }
    }

    fn ident_expression(&mut self) -> Result<Expression> {
        if self.at_keyword("CASE") {
            if !self.allow_case {
                return Err(self.error("CASE is not allowed in a scalar context"));
            }
            return self.case_expression();
        }
        if self.at_keyword("TRUE") || self.at_keyword("FALSE") {
            let value = self.at_keyword("TRUE");
            self.pos += 1;
            return Ok(Expression::Literal(Value::Bool(value)));
        }
        if self.at_keyword("NULL") {
            self.pos += 1;
            return Ok(Expression::Literal(Value::Null));
        }
        // function call: IDENT '('
        if self.peek_at(1) == Some(&Tok::LParen) {
            let Some(Tok::Ident(name)) = self.bump() else {
                unreachable!()
            };
            self.pos += 1; // '('
            let mut args = Vec::new();
            if self.peek() != Some(&Tok::RParen) {
                args.push(self.additive()?);
                while self.peek() == Some(&Tok::Comma) {
                    self.pos += 1;
                    args.push(self.additive()?);
                }
            }
            self.expect(Tok::RParen, "')' after function arguments")?;
            let aggregate = AGGREGATES
                .iter()
                .any(|agg| name.eq_ignore_ascii_case(agg));
            return Ok(Expression::Function(FunctionExpression {
                name,
                args,
                aggregate,
            }));
        }
        self.path()
    }

    fn path(&mut self) -> Result<Expression> {
        let mut segments: SmallVec<[PathSegment; 4]> = SmallVec::new();
        loop {
            let Some(Tok::Ident(name)) = self.bump() else {
                return Err(self.error("expected a path segment"));
            };
            let index = if self.peek() == Some(&Tok::LBracket) {
                self.pos += 1;
                // the index re-enters the full scalar grammar
                let index = self.additive()?;
                self.expect(Tok::RBracket, "']' after index expression")?;
                Some(Box::new(index))
            } else {
                None
            };
            segments.push(PathSegment { name, index });
            if self.peek() == Some(&Tok::Dot) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(Expression::Path(PathExpression {
            segments,
            resolved: None,
        }))
    }

    fn case_expression(&mut self) -> Result<Expression> {
        self.pos += 1; // CASE
        let mut whens = Vec::new();
        while self.eat_keyword("WHEN") {
            let condition = self.or_predicate()?;
            if !self.eat_keyword("THEN") {
                return Err(self.error("expected THEN"));
            }
            let result = self.additive()?;
            whens.push(WhenClause { condition, result });
        }
        if whens.is_empty() {
            return Err(self.error("expected WHEN after CASE"));
        }
        let otherwise = if self.eat_keyword("ELSE") {
            Some(Box::new(self.additive()?))
        } else {
            None
        };
        if !self.eat_keyword("END") {
            return Err(self.error("expected END"));
        }
        Ok(Expression::Case(CaseExpression { whens, otherwise }))
    }
}

/// Flips the negation flag of a predicate in place.
fn negate(predicate: &mut Predicate) {
    match predicate {
        Predicate::Compound { negated, .. }
        | Predicate::Comparison { negated, .. }
        | Predicate::Between { negated, .. }
        | Predicate::Like { negated, .. }
        | Predicate::In { negated, .. }
        | Predicate::IsNull { negated, .. }
        | Predicate::IsEmpty { negated, .. }
        | Predicate::MemberOf { negated, .. }
        | Predicate::Exists { negated, .. } => *negated = !*negated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(text: &str) -> Expression {
        parse_scalar(text).unwrap()
    }

    #[test]
    fn parses_dotted_path() {
        let Expression::Path(p) = scalar("d.owner.name") else {
            panic!("expected path");
        };
        assert_eq!(p.dotted(), "d.owner.name");
        assert!(p.segments.iter().all(|s| s.index.is_none()));
    }

    #[test]
    fn parses_array_index_with_nested_path() {
        let Expression::Path(p) = scalar("d.contacts[d.versions.idx].name") else {
            panic!("expected path");
        };
        assert_eq!(p.segments.len(), 3);
        let index = p.segments[1].index.as_deref().unwrap();
        let Expression::Path(ix) = index else {
            panic!("expected path index");
        };
        assert_eq!(ix.dotted(), "d.versions.idx");
    }

    #[test]
    fn parses_parameter_index() {
        let Expression::Path(p) = scalar("contacts[:age]") else {
            panic!("expected path");
        };
        assert_eq!(
            p.segments[0].index.as_deref(),
            Some(&Expression::Parameter("age".into()))
        );
    }

    #[test]
    fn tags_aggregates_at_parse_time() {
        let expr = scalar("COUNT(contacts.id)");
        assert!(expr.is_aggregate());
        let expr = scalar("CONCAT(name, ' user')");
        assert!(!expr.is_aggregate());
    }

    #[test]
    fn arithmetic_precedence() {
        let Expression::Arithmetic { op, right, .. } = scalar("age + idx * 2") else {
            panic!("expected arithmetic");
        };
        assert_eq!(op, ArithmeticOp::Add);
        assert!(matches!(
            *right,
            Expression::Arithmetic {
                op: ArithmeticOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn scalar_grammar_rejects_boolean_connectives() {
        let err = parse_scalar("a AND b").unwrap_err();
        assert!(matches!(err, CriteriaError::Parse { .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let pred = parse_predicate("a = 1 OR b = 2 AND c = 3").unwrap();
        let Predicate::Compound {
            connective,
            children,
            ..
        } = pred
        else {
            panic!("expected compound");
        };
        assert_eq!(connective, Connective::Or);
        assert_eq!(children.len(), 2);
        assert!(matches!(
            children[1],
            Predicate::Compound {
                connective: Connective::And,
                ..
            }
        ));
    }

    #[test]
    fn not_sets_the_negation_flag() {
        let pred = parse_predicate("NOT a.b IS NULL").unwrap();
        assert!(matches!(pred, Predicate::IsNull { negated: true, .. }));
    }

    #[test]
    fn parses_case_when_in_simple_grammar() {
        let expr = parse_simple("CASE WHEN age > 20 THEN 'old' ELSE 'young' END").unwrap();
        let Expression::Case(case) = expr else {
            panic!("expected case");
        };
        assert_eq!(case.whens.len(), 1);
        assert!(case.otherwise.is_some());
    }

    #[test]
    fn parenthesized_predicate_groups() {
        let pred = parse_predicate("(a = 1 OR b = 2) AND c = 3").unwrap();
        let Predicate::Compound {
            connective,
            children,
            ..
        } = pred
        else {
            panic!("expected compound");
        };
        assert_eq!(connective, Connective::And);
        assert!(matches!(
            children[0],
            Predicate::Compound {
                connective: Connective::Or,
                ..
            }
        ));
    }

    #[test]
    fn parenthesized_scalar_operands_still_compare() {
        let pred = parse_predicate("(a + b) > 2").unwrap();
        assert!(matches!(
            pred,
            Predicate::Comparison {
                op: ComparisonOp::Gt,
                ..
            }
        ));
    }

    #[test]
    fn cached_parse_returns_equal_tree() {
        let first = parse("d.owner.name", Grammar::Scalar).unwrap();
        let second = parse("d.owner.name", Grammar::Scalar).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parse_error_carries_position() {
        let err = parse_scalar("CONCAT(a,").unwrap_err();
        let CriteriaError::Parse { position, .. } = err else {
            panic!("expected parse error");
        };
        assert_eq!(position, 9);
    }
}
