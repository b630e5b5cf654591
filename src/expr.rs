//! Row predicate expressions used by filter stages.
//!
//! Supports expressions like:
//! - `score > 90`
//! - `name == 'Alice'`
//! - `score > 90 AND name != 'Bob'`
//! - `(age >= 18) OR NOT (blocked == true)`
//! - `value IS NULL`, `value IS NOT NULL`
//!
//! An [`Expr`] names columns; [`Expr::bind`] resolves the names against a
//! schema once, and the resulting [`BoundExpr`] evaluates rows by position.

use crate::column::ColumnValue;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::table::Row;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Compare column to a literal value
    Compare {
        column: String,
        op: CompareOp,
        value: Literal,
    },
    IsNull(String),
    IsNotNull(String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn holds<T: PartialOrd>(&self, a: T, b: T) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        }
    }
}

/// Literal values that can appear in expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { column, op, value } => write!(f, "{} {} {}", column, op.symbol(), value),
            Expr::IsNull(column) => write!(f, "{} IS NULL", column),
            Expr::IsNotNull(column) => write!(f, "{} IS NOT NULL", column),
            Expr::And(l, r) => write!(f, "({}) AND ({})", l, r),
            Expr::Or(l, r) => write!(f, "({}) OR ({})", l, r),
            Expr::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

impl Expr {
    /// Parses an expression string.
    pub fn parse(input: &str) -> Result<Expr> {
        let mut parser = Parser::new(input)?;
        let expr = parser.parse_or()?;
        if parser.current != Token::Eof {
            return Err(Error::invalid(format!(
                "Unexpected token after expression: {:?}",
                parser.current
            )));
        }
        Ok(expr)
    }

    /// All column names referenced, sorted and deduplicated.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Compare { column, .. } | Expr::IsNull(column) | Expr::IsNotNull(column) => {
                out.push(column)
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
            Expr::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Resolves column names against `schema`.
    ///
    /// Fails with `UnknownColumn` if the expression references a column the
    /// schema does not have.
    pub fn bind(&self, schema: &Schema) -> Result<BoundExpr> {
        let column = |name: &str| {
            schema
                .get_column_index(name)
                .ok_or_else(|| Error::UnknownColumn(name.to_string()))
        };
        Ok(match self {
            Expr::Compare { column: name, op, value } => BoundExpr::Compare {
                column: column(name.as_str())?,
                op: *op,
                value: value.clone(),
            },
            Expr::IsNull(name) => BoundExpr::IsNull(column(name.as_str())?),
            Expr::IsNotNull(name) => BoundExpr::IsNotNull(column(name.as_str())?),
            Expr::And(l, r) => BoundExpr::And(Box::new(l.bind(schema)?), Box::new(r.bind(schema)?)),
            Expr::Or(l, r) => BoundExpr::Or(Box::new(l.bind(schema)?), Box::new(r.bind(schema)?)),
            Expr::Not(inner) => BoundExpr::Not(Box::new(inner.bind(schema)?)),
        })
    }
}

impl FromStr for Expr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Expr::parse(s)
    }
}

/// An expression with column names resolved to row positions.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Compare {
        column: usize,
        op: CompareOp,
        value: Literal,
    },
    IsNull(usize),
    IsNotNull(usize),
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
    Not(Box<BoundExpr>),
}

impl BoundExpr {
    pub fn eval(&self, row: &Row) -> bool {
        match self {
            BoundExpr::Compare { column, op, value } => match row.get(*column) {
                Some(cell) => compare_cell(cell, *op, value),
                None => false,
            },
            BoundExpr::IsNull(column) => row.get(*column).map_or(true, ColumnValue::is_null),
            BoundExpr::IsNotNull(column) => row.get(*column).map_or(false, |c| !c.is_null()),
            BoundExpr::And(l, r) => l.eval(row) && r.eval(row),
            BoundExpr::Or(l, r) => l.eval(row) || r.eval(row),
            BoundExpr::Not(inner) => !inner.eval(row),
        }
    }
}

/// SQL-like comparison: anything involving NULL is false, as are mismatched
/// types. Use `IS NULL` to test for nulls.
fn compare_cell(cell: &ColumnValue, op: CompareOp, literal: &Literal) -> bool {
    match (cell, literal) {
        (ColumnValue::Null, _) | (_, Literal::Null) => false,
        (ColumnValue::Int32(a), Literal::Int(b)) => op.holds(*a as i64, *b),
        (ColumnValue::Int64(a), Literal::Int(b)) => op.holds(*a, *b),
        (ColumnValue::String(a), Literal::String(b)) => op.holds(a.as_str(), b.as_str()),
        (ColumnValue::Bool(a), Literal::Bool(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => false,
        },
        (cell, Literal::Int(b)) => cell.as_f64().map_or(false, |a| op.holds(a, *b as f64)),
        (cell, Literal::Float(b)) => cell.as_f64().map_or(false, |a| op.holds(a, *b)),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Op(CompareOp),
    And,
    Or,
    Not,
    Is,
    LParen,
    RParen,
    Eof,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn take_while(&mut self, mut keep: impl FnMut(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if !keep(c) {
                break;
            }
            out.push(c);
            self.chars.next();
        }
        out
    }

    fn number(&mut self, negative: bool) -> Result<Token> {
        let mut seen_dot = false;
        let digits = self.take_while(|c| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                true
            } else {
                c.is_ascii_digit()
            }
        });
        let text = if negative { format!("-{}", digits) } else { digits };
        let bad = || Error::invalid(format!("Malformed number: {}", text));
        if seen_dot {
            text.parse().map(Token::Float).map_err(|_| bad())
        } else {
            text.parse().map(Token::Int).map_err(|_| bad())
        }
    }

    fn string(&mut self, quote: char) -> Result<Token> {
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                c if c == quote => return Ok(Token::Str(out)),
                '\\' => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(Error::invalid("Unterminated string literal"))
    }

    /// Consumes `next` if it follows, returning `then`, otherwise `otherwise`.
    fn pair(&mut self, next: char, then: Token, otherwise: Token) -> Token {
        if self.chars.peek() == Some(&next) {
            self.chars.next();
            then
        } else {
            otherwise
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        while self.chars.peek().map_or(false, |c| c.is_whitespace()) {
            self.chars.next();
        }
        let c = match self.chars.peek() {
            Some(&c) => c,
            None => return Ok(Token::Eof),
        };

        if c.is_ascii_digit() || c == '.' {
            return self.number(false);
        }
        if c.is_alphabetic() || c == '_' {
            let word = self.take_while(|c| c.is_alphanumeric() || c == '_');
            return Ok(match word.to_ascii_uppercase().as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                "NOT" => Token::Not,
                "IS" => Token::Is,
                "NULL" => Token::Null,
                "TRUE" => Token::Bool(true),
                "FALSE" => Token::Bool(false),
                _ => Token::Ident(word),
            });
        }

        self.chars.next();
        Ok(match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '\'' | '"' => return self.string(c),
            // A lone `=` means equality too.
            '=' => self.pair('=', Token::Op(CompareOp::Eq), Token::Op(CompareOp::Eq)),
            '!' => self.pair('=', Token::Op(CompareOp::Ne), Token::Not),
            '<' => match self.chars.peek() {
                Some('>') => {
                    self.chars.next();
                    Token::Op(CompareOp::Ne)
                }
                _ => self.pair('=', Token::Op(CompareOp::Le), Token::Op(CompareOp::Lt)),
            },
            '>' => self.pair('=', Token::Op(CompareOp::Ge), Token::Op(CompareOp::Gt)),
            '&' => self.pair('&', Token::And, Token::And),
            '|' if self.chars.peek() == Some(&'|') => {
                self.chars.next();
                Token::Or
            }
            '-' if self.chars.peek().map_or(false, |c| c.is_ascii_digit() || *c == '.') => {
                return self.number(true);
            }
            other => return Err(Error::invalid(format!("Unexpected character: {}", other))),
        })
    }
}

/// Deepest expression tree the parser builds. Each parenthesis, `NOT` and
/// chained `AND`/`OR` counts one level.
pub const MAX_EXPR_DEPTH: usize = 256;

/// Recursive-descent parser. Precedence, lowest first: OR, AND, NOT, comparison.
struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            depth: 0,
        })
    }

    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err(Error::invalid(format!(
                "Expression nested deeper than {} levels",
                MAX_EXPR_DEPTH
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn bump(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let outer = self.depth;
        let mut left = self.parse_and()?;
        while self.current == Token::Or {
            self.descend()?;
            self.bump()?;
            left = Expr::Or(Box::new(left), Box::new(self.parse_and()?));
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let outer = self.depth;
        let mut left = self.parse_not()?;
        while self.current == Token::And {
            self.descend()?;
            self.bump()?;
            left = Expr::And(Box::new(left), Box::new(self.parse_not()?));
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.current == Token::Not {
            self.descend()?;
            self.bump()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr> {
        if self.current == Token::LParen {
            self.descend()?;
            self.bump()?;
            let inner = self.parse_or()?;
            if self.bump()? != Token::RParen {
                return Err(Error::invalid("Expected ')'"));
            }
            self.depth -= 1;
            return Ok(inner);
        }

        let column = match self.bump()? {
            Token::Ident(name) => name,
            other => return Err(Error::invalid(format!("Expected column name, got {:?}", other))),
        };

        match self.bump()? {
            Token::Is => {
                let negated = if self.current == Token::Not {
                    self.bump()?;
                    true
                } else {
                    false
                };
                if self.bump()? != Token::Null {
                    return Err(Error::invalid("Expected NULL after IS"));
                }
                Ok(if negated {
                    Expr::IsNotNull(column)
                } else {
                    Expr::IsNull(column)
                })
            }
            Token::Op(op) => {
                let value = match self.bump()? {
                    Token::Int(n) => Literal::Int(n),
                    Token::Float(f) => Literal::Float(f),
                    Token::Str(s) => Literal::String(s),
                    Token::Bool(b) => Literal::Bool(b),
                    Token::Null => Literal::Null,
                    other => return Err(Error::invalid(format!("Expected literal, got {:?}", other))),
                };
                Ok(Expr::Compare { column, op, value })
            }
            other => Err(Error::invalid(format!(
                "Expected comparison operator after '{}', got {:?}",
                column, other
            ))),
        }
    }
}
