//! The search query language: recursive-descent parser, AST and the
//! canonical rendering used as the cache key.
//!
//! Grammar, with descending precedence (note that OR binds tighter than AND,
//! and bare whitespace between terms means AND):
//!
//! ```text
//! expression := term ( ('&' | whitespace) term )*
//! term       := factor ( '|' factor )*
//! factor     := string | quoted | '(' expression ')' | ('-'|'+') factor | date_expr
//! date_expr  := ':date(' ( date ('-' date)? | '<' date | '>' date ) ')'
//! date       := d d? '/' d d? '/' d d (d d)? | "now" | "tomorrow" | "yesterday"
//! ```

use std::fmt;

use thiserror::Error;

use crate::date::{DatePredicate, QueryDate};

/// The query could not be fully consumed; `position` is the first offending
/// character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query syntax error at position {position}")]
pub struct ParseError {
    pub position: usize,
}

/// One variant per grammar production. Nodes are immutable after parse and
/// live for a single parse/evaluate cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Bare literal term.
    Term(String),
    /// Quoted literal, unescaped.
    Phrase(String),
    /// Unary `+`.
    Must(Box<QueryNode>),
    /// Unary `-`.
    Not(Box<QueryNode>),
    And(Box<QueryNode>, Box<QueryNode>),
    Or(Box<QueryNode>, Box<QueryNode>),
    Date(DatePredicate),
}

impl fmt::Display for QueryNode {
    /// Canonical rendering: binary nodes fully parenthesized, unary as
    /// `OP(operand)`, dates as `:date(...)`. `a&b` and `a b` render
    /// identically; spelling and case of terms are preserved.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Term(s) => write!(f, "{s}"),
            QueryNode::Phrase(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "\"")
            }
            QueryNode::Must(inner) => write!(f, "+({inner})"),
            QueryNode::Not(inner) => write!(f, "-({inner})"),
            QueryNode::And(left, right) => write!(f, "({left} & {right})"),
            QueryNode::Or(left, right) => write!(f, "({left} | {right})"),
            QueryNode::Date(pred) => write!(f, ":date({pred})"),
        }
    }
}

/// Parse a query string into its AST.
pub fn parse(input: &str) -> Result<QueryNode, ParseError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.skip_spaces();
    let node = parser.expression()?;
    parser.skip_spaces();
    if parser.pos != parser.chars.len() {
        return Err(ParseError {
            position: parser.pos,
        });
    }
    Ok(node)
}

/// Characters allowed inside a bare term. Operators, grouping, quotes and
/// the unary signs all break a term.
fn is_term_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '&' | '|' | '(' | ')' | '"' | '+' | '-')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_spaces(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn error<T>(&self) -> Result<T, ParseError> {
        Err(ParseError { position: self.pos })
    }

    fn expression(&mut self) -> Result<QueryNode, ParseError> {
        let mut node = self.term()?;
        loop {
            let mark = self.pos;
            let had_space = self.skip_spaces();
            if self.peek() == Some('&') {
                self.bump();
                self.skip_spaces();
                let rhs = self.term()?;
                node = QueryNode::And(Box::new(node), Box::new(rhs));
            } else if had_space && self.starts_factor() {
                // Adjacent terms: whitespace acts as AND.
                let rhs = self.term()?;
                node = QueryNode::And(Box::new(node), Box::new(rhs));
            } else {
                self.pos = mark;
                return Ok(node);
            }
        }
    }

    fn starts_factor(&self) -> bool {
        matches!(self.peek(), Some(c) if !matches!(c, ')' | '&' | '|'))
    }

    fn term(&mut self) -> Result<QueryNode, ParseError> {
        let mut node = self.factor()?;
        loop {
            let mark = self.pos;
            self.skip_spaces();
            if self.peek() == Some('|') {
                self.bump();
                self.skip_spaces();
                let rhs = self.factor()?;
                node = QueryNode::Or(Box::new(node), Box::new(rhs));
            } else {
                self.pos = mark;
                return Ok(node);
            }
        }
    }

    fn factor(&mut self) -> Result<QueryNode, ParseError> {
        match self.peek() {
            Some('"') => self.quoted(),
            Some('(') => {
                self.bump();
                self.skip_spaces();
                let node = self.expression()?;
                self.skip_spaces();
                if self.peek() == Some(')') {
                    self.bump();
                    Ok(node)
                } else {
                    self.error()
                }
            }
            Some(sign @ ('-' | '+')) => {
                self.bump();
                self.skip_spaces();
                let inner = Box::new(self.factor()?);
                Ok(if sign == '-' {
                    QueryNode::Not(inner)
                } else {
                    QueryNode::Must(inner)
                })
            }
            Some(':') if self.starts_date_expr() => self.date_expr(),
            Some(_) => self.string_expr(),
            None => self.error(),
        }
    }

    /// True when `:date` (any case) followed by `(` starts here; a lone
    /// `:something` stays an ordinary term.
    fn starts_date_expr(&self) -> bool {
        let keyword: Vec<char> = ":date".chars().collect();
        let mut i = self.pos;
        for &k in &keyword {
            match self.chars.get(i) {
                Some(c) if c.to_ascii_lowercase() == k => i += 1,
                _ => return false,
            }
        }
        while self.chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        self.chars.get(i) == Some(&'(')
    }

    fn date_expr(&mut self) -> Result<QueryNode, ParseError> {
        self.pos += ":date".len();
        self.skip_spaces();
        if self.peek() != Some('(') {
            return self.error();
        }
        self.bump();
        self.skip_spaces();

        let pred = match self.peek() {
            Some('<') => {
                self.bump();
                self.skip_spaces();
                DatePredicate::Before(self.date()?)
            }
            Some('>') => {
                self.bump();
                self.skip_spaces();
                DatePredicate::After(self.date()?)
            }
            _ => {
                let first = self.date()?;
                self.skip_spaces();
                if self.peek() == Some('-') {
                    self.bump();
                    self.skip_spaces();
                    DatePredicate::Between(first, self.date()?)
                } else {
                    DatePredicate::On(first)
                }
            }
        };

        self.skip_spaces();
        if self.peek() == Some(')') {
            self.bump();
            Ok(QueryNode::Date(pred))
        } else {
            self.error()
        }
    }

    fn date(&mut self) -> Result<QueryDate, ParseError> {
        for (keyword, date) in [
            ("now", QueryDate::Now),
            ("tomorrow", QueryDate::Tomorrow),
            ("yesterday", QueryDate::Yesterday),
        ] {
            if self.eat_keyword(keyword) {
                return Ok(date);
            }
        }

        let start = self.pos;
        let day = self.digits(2)?;
        self.expect('/')?;
        let month = self.digits(2)?;
        self.expect('/')?;
        let year = self.year()?;
        QueryDate::from_dmy(day, month, year as i32).ok_or(ParseError { position: start })
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let n = keyword.chars().count();
        let matches = self
            .chars
            .get(self.pos..)
            .is_some_and(|rest| rest.len() >= n && rest[..n].iter().copied().eq(keyword.chars()));
        if matches {
            self.pos += n;
        }
        matches
    }

    /// One or two digits.
    fn digits(&mut self, max: usize) -> Result<u32, ParseError> {
        let start = self.pos;
        let mut value = 0u32;
        while self.pos - start < max {
            match self.peek().and_then(|c| c.to_digit(10)) {
                Some(d) => {
                    value = value * 10 + d;
                    self.pos += 1;
                }
                None => break,
            }
        }
        if self.pos == start {
            self.error()
        } else {
            Ok(value)
        }
    }

    /// Exactly two or four digits.
    fn year(&mut self) -> Result<u32, ParseError> {
        let first = self.two_digits()?;
        let mark = self.pos;
        match self.two_digits() {
            Ok(second) => Ok(first * 100 + second),
            Err(_) => {
                self.pos = mark;
                Ok(first)
            }
        }
    }

    fn two_digits(&mut self) -> Result<u32, ParseError> {
        let a = self.peek().and_then(|c| c.to_digit(10));
        let b = self.chars.get(self.pos + 1).and_then(|c| c.to_digit(10));
        match (a, b) {
            (Some(a), Some(b)) => {
                self.pos += 2;
                Ok(a * 10 + b)
            }
            _ => self.error(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            self.error()
        }
    }

    fn string_expr(&mut self) -> Result<QueryNode, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(is_term_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return self.error();
        }
        Ok(QueryNode::Term(
            self.chars[start..self.pos].iter().collect(),
        ))
    }

    fn quoted(&mut self) -> Result<QueryNode, ParseError> {
        self.bump(); // opening quote
        let mut content = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(QueryNode::Phrase(content)),
                Some('\\') => match self.bump() {
                    Some('n') => content.push('\n'),
                    Some('t') => content.push('\t'),
                    Some('r') => content.push('\r'),
                    Some(other) => content.push(other),
                    None => return self.error(),
                },
                Some(other) => content.push(other),
                None => return self.error(),
            }
        }
    }
}
