//! A small, total evaluator for the CloudEvents SQL subset actually used by
//! Subscriptions-API `cesql` filters: attribute/extension references,
//! literals, comparisons, boolean connectives, and `LIKE`.
//!
//! Structured as a typed filter tree (`FilterNode`/`FilterOp`) in the same
//! shape as an OData filter expression, but over a dynamic CloudEvents
//! attribute namespace: a reference is a bare attribute name rather than a
//! fixed enum variant, and an unknown attribute evaluates to SQL `NULL`
//! instead of a parse error.

use thiserror::Error;

use crate::event::CloudEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub enum FilterNode {
    Binary { attribute: String, op: FilterOp, value: Literal },
    Composite { op: FilterOp, children: Vec<FilterNode> },
    Not(Box<FilterNode>),
}

impl FilterNode {
    #[must_use]
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Composite { op: FilterOp::And, children }
    }

    #[must_use]
    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Composite { op: FilterOp::Or, children }
    }

    /// Evaluate against an event's attributes. An attribute this event does
    /// not carry resolves to SQL `NULL`; any comparison against `NULL` is
    /// `false`, never an evaluation error, keeping the evaluator total.
    #[must_use]
    pub fn eval(&self, event: &CloudEvent) -> bool {
        match self {
            FilterNode::Binary { attribute, op, value } => {
                let Some(actual) = event.attribute(attribute) else {
                    return false;
                };
                eval_binary(&actual, *op, value)
            }
            FilterNode::Composite { op: FilterOp::And, children } => children.iter().all(|c| c.eval(event)),
            FilterNode::Composite { op: FilterOp::Or, children } => children.iter().any(|c| c.eval(event)),
            FilterNode::Composite { .. } => false,
            FilterNode::Not(inner) => !inner.eval(event),
        }
    }
}

fn eval_binary(actual: &str, op: FilterOp, value: &Literal) -> bool {
    match (op, value) {
        (FilterOp::Like, Literal::String(pattern)) => like_match(actual, pattern),
        (FilterOp::Eq, Literal::String(s)) => actual == s,
        (FilterOp::Ne, Literal::String(s)) => actual != s,
        (FilterOp::Eq, Literal::Bool(b)) => actual.parse::<bool>().is_ok_and(|a| a == *b),
        (FilterOp::Ne, Literal::Bool(b)) => actual.parse::<bool>().is_ok_and(|a| a != *b),
        (_, Literal::Number(n)) => {
            let Ok(actual_n) = actual.parse::<f64>() else { return false };
            match op {
                FilterOp::Eq => (actual_n - n).abs() < f64::EPSILON,
                FilterOp::Ne => (actual_n - n).abs() >= f64::EPSILON,
                FilterOp::Lt => actual_n < *n,
                FilterOp::Le => actual_n <= *n,
                FilterOp::Gt => actual_n > *n,
                FilterOp::Ge => actual_n >= *n,
                FilterOp::Like | FilterOp::And | FilterOp::Or => false,
            }
        }
        (FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge, Literal::String(s)) => {
            match op {
                FilterOp::Lt => actual < s.as_str(),
                FilterOp::Le => actual <= s.as_str(),
                FilterOp::Gt => actual > s.as_str(),
                FilterOp::Ge => actual >= s.as_str(),
                _ => unreachable!(),
            }
        }
        _ => false,
    }
}

/// `%` matches any run of characters, `_` matches exactly one; no escaping.
fn like_match(actual: &str, pattern: &str) -> bool {
    fn recurse(s: &[u8], p: &[u8]) -> bool {
        match p.first() {
            None => s.is_empty(),
            Some(b'%') => recurse(s, &p[1..]) || (!s.is_empty() && recurse(&s[1..], p)),
            Some(b'_') => !s.is_empty() && recurse(&s[1..], &p[1..]),
            Some(&c) => s.first() == Some(&c) && recurse(&s[1..], &p[1..]),
        }
    }
    recurse(actual.as_bytes(), pattern.as_bytes())
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of expression")]
    UnexpectedEof,
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
}

/// Parse a `cesql`-subset boolean expression into a [`FilterNode`] tree.
///
/// Grammar (lowest to highest precedence): `OR` > `AND` > `NOT` > comparison
/// > primary (parenthesized expression or `attribute op literal`).
pub fn parse(expr: &str) -> Result<FilterNode, ParseError> {
    let tokens = tokenize(expr);
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ParseError::UnexpectedToken(parser.tokens[parser.pos].clone()));
    }
    Ok(node)
}

fn tokenize(expr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' || c == ')' {
            tokens.push(c.to_string());
            i += 1;
            continue;
        }
        if c == '\'' {
            let mut j = i + 1;
            let mut s = String::new();
            while j < chars.len() && chars[j] != '\'' {
                s.push(chars[j]);
                j += 1;
            }
            tokens.push(format!("'{s}'"));
            i = j + 1;
            continue;
        }
        if "=!<>".contains(c) {
            let mut op = c.to_string();
            if i + 1 < chars.len() && chars[i + 1] == '=' {
                op.push('=');
                i += 2;
            } else {
                i += 1;
            }
            tokens.push(op);
            continue;
        }
        let mut j = i;
        while j < chars.len() && !chars[j].is_whitespace() && !"()=!<>".contains(chars[j]) {
            j += 1;
        }
        tokens.push(chars[i..j].iter().collect());
        i = j;
    }
    tokens
}

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<String> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<FilterNode, ParseError> {
        let mut node = self.parse_and()?;
        while self.peek().is_some_and(|t| t.eq_ignore_ascii_case("or")) {
            self.bump();
            let rhs = self.parse_and()?;
            node = FilterNode::or(vec![node, rhs]);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<FilterNode, ParseError> {
        let mut node = self.parse_not()?;
        while self.peek().is_some_and(|t| t.eq_ignore_ascii_case("and")) {
            self.bump();
            let rhs = self.parse_not()?;
            node = FilterNode::and(vec![node, rhs]);
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<FilterNode, ParseError> {
        if self.peek().is_some_and(|t| t.eq_ignore_ascii_case("not")) {
            self.bump();
            return Ok(FilterNode::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterNode, ParseError> {
        if self.peek() == Some("(") {
            self.bump();
            let node = self.parse_or()?;
            match self.bump() {
                Some(t) if t == ")" => Ok(node),
                Some(t) => Err(ParseError::UnexpectedToken(t)),
                None => Err(ParseError::UnexpectedEof),
            }
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<FilterNode, ParseError> {
        let attribute = self.bump().ok_or(ParseError::UnexpectedEof)?;
        let op_token = self.bump().ok_or(ParseError::UnexpectedEof)?;
        let op = match op_token.to_ascii_uppercase().as_str() {
            "=" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Le,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Ge,
            "LIKE" => FilterOp::Like,
            other => return Err(ParseError::UnexpectedToken(other.to_owned())),
        };
        let value_token = self.bump().ok_or(ParseError::UnexpectedEof)?;
        let value = parse_literal(&value_token);
        Ok(FilterNode::Binary { attribute, op, value })
    }
}

fn parse_literal(token: &str) -> Literal {
    if let Some(stripped) = token.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Literal::String(stripped.to_owned());
    }
    if let Ok(n) = token.parse::<f64>() {
        return Literal::Number(n);
    }
    if let Ok(b) = token.parse::<bool>() {
        return Literal::Bool(b);
    }
    Literal::String(token.to_owned())
}
