//! WHERE / HAVING predicate evaluation
//!
//! Predicates are a deliberately small language: comparisons between
//! operands joined by `AND` / `OR`. There are no parentheses and no `NOT`;
//! `AND` binds tighter than `OR`.
//!
//! Evaluation happens in three steps:
//!
//! 1. The predicate text is tokenized.
//! 2. Every identifier that names an attribute of the row is substituted
//!    with that attribute's value, leaving only literals and operators.
//! 3. The literal tokens are parsed into a tree of
//!    {literal, comparison, conjunction, disjunction} nodes and evaluated.
//!
//! Nothing outside that closed set of node kinds can be expressed, so the
//! predicate text can never reach anything but the row it is applied to.

use std::cmp::Ordering;

use tracing::warn;

use crate::error::PredicateError;
use crate::table::{resolve_column, TableRow, Value};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::LtEq => "<=",
            CompareOp::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(Value),
    Ident(String),
    Compare(CompareOp),
    And,
    Or,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Literal(v) => v.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Compare(op) => op.symbol().to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
        }
    }

    /// Whether a `-` after this token starts a negative number
    fn expects_operand(prev: Option<&Token>) -> bool {
        matches!(
            prev,
            None | Some(Token::Compare(_)) | Some(Token::And) | Some(Token::Or)
        )
    }
}

/// Evaluated predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A bare literal, tested for truthiness
    Literal(Value),
    /// `left op right`
    Comparison(Value, CompareOp, Value),
    /// Every child must hold
    And(Vec<Expr>),
    /// At least one child must hold
    Or(Vec<Expr>),
}

impl Expr {
    /// Evaluate the tree
    pub fn evaluate(&self) -> bool {
        match self {
            Expr::Literal(v) => is_truthy(v),
            Expr::Comparison(left, op, right) => compare(left, *op, right),
            Expr::And(children) => children.iter().all(Expr::evaluate),
            Expr::Or(children) => children.iter().any(Expr::evaluate),
        }
    }
}

/// Evaluate a predicate against one row, failing closed
///
/// Any tokenize, substitution or parse failure is logged and reported as
/// `false`, so the row is treated as not matching.
pub fn evaluate_condition(columns: &[String], row: &TableRow, predicate: &str) -> bool {
    match try_evaluate_condition(columns, row, predicate) {
        Ok(result) => result,
        Err(e) => {
            warn!(row = %row.id, predicate, "Evaluation error: {}", e);
            false
        }
    }
}

/// Evaluate a predicate against one row, reporting failures
pub fn try_evaluate_condition(
    columns: &[String],
    row: &TableRow,
    predicate: &str,
) -> Result<bool, PredicateError> {
    let tokens = tokenize(predicate)?;
    let literals = substitute(tokens, columns, row)?;
    let expr = parse_tokens(literals)?;
    Ok(expr.evaluate())
}

fn tokenize(text: &str) -> Result<Vec<Token>, PredicateError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '\'' || c == '"' {
            let (s, next) = read_string(&chars, i)?;
            tokens.push(Token::Literal(Value::String(s)));
            i = next;
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
            || (c == '-'
                && Token::expects_operand(tokens.last())
                && chars
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_digit() || *n == '.'));
        if starts_number {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Token::Literal(parse_number(&literal)?));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();

            // An aggregate reference such as COUNT(*) in HAVING
            let mut j = i;
            while j < chars.len() && chars[j] == ' ' {
                j += 1;
            }
            if j < chars.len() && chars[j] == '(' {
                let close = chars[j..]
                    .iter()
                    .position(|&ch| ch == ')')
                    .map(|p| j + p)
                    .ok_or(PredicateError::UnexpectedChar('('))?;
                let call: String = chars[start..=close].iter().collect();
                tokens.push(Token::Ident(call));
                i = close + 1;
                continue;
            }

            tokens.push(keyword_or_ident(word));
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('=', Some('=')) => (Token::Compare(CompareOp::Eq), 2),
            ('=', _) => (Token::Compare(CompareOp::Eq), 1),
            ('!', Some('=')) => (Token::Compare(CompareOp::NotEq), 2),
            ('<', Some('>')) => (Token::Compare(CompareOp::NotEq), 2),
            ('<', Some('=')) => (Token::Compare(CompareOp::LtEq), 2),
            ('>', Some('=')) => (Token::Compare(CompareOp::GtEq), 2),
            ('<', _) => (Token::Compare(CompareOp::Lt), 1),
            ('>', _) => (Token::Compare(CompareOp::Gt), 1),
            _ => return Err(PredicateError::UnexpectedChar(c)),
        };
        tokens.push(token);
        i += width;
    }

    if tokens.is_empty() {
        return Err(PredicateError::Empty);
    }
    Ok(tokens)
}

/// Read a quoted string starting at `start`; a doubled quote is an escape
fn read_string(chars: &[char], start: usize) -> Result<(String, usize), PredicateError> {
    let quote = chars[start];
    let mut s = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                s.push(quote);
                i += 2;
                continue;
            }
            return Ok((s, i + 1));
        }
        s.push(chars[i]);
        i += 1;
    }

    Err(PredicateError::UnterminatedString)
}

fn parse_number(literal: &str) -> Result<Value, PredicateError> {
    if let Ok(i) = literal.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    literal
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| PredicateError::UnexpectedToken(literal.to_string()))
}

fn keyword_or_ident(word: String) -> Token {
    match word.to_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "TRUE" => Token::Literal(Value::Boolean(true)),
        "FALSE" => Token::Literal(Value::Boolean(false)),
        "NULL" => Token::Literal(Value::Null),
        _ => Token::Ident(word),
    }
}

/// Replace every identifier with the row's value for that attribute
fn substitute(
    tokens: Vec<Token>,
    columns: &[String],
    row: &TableRow,
) -> Result<Vec<Token>, PredicateError> {
    tokens
        .into_iter()
        .map(|token| match token {
            Token::Ident(name) => lookup(columns, &name)
                .map(|idx| Token::Literal(row.get(idx).clone()))
                .ok_or(PredicateError::UnknownIdentifier(name)),
            other => Ok(other),
        })
        .collect()
}

fn lookup(columns: &[String], name: &str) -> Option<usize> {
    resolve_column(columns, name).or_else(|| {
        let wanted = compact(name);
        columns.iter().position(|c| compact(c) == wanted)
    })
}

/// Upper-cased text with whitespace removed, for matching `count( * )`
/// against a `COUNT(*)` column
fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

fn parse_tokens(tokens: Vec<Token>) -> Result<Expr, PredicateError> {
    let mut parser = TokenParser { tokens, pos: 0 };
    let expr = parser.disjunction()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(PredicateError::UnexpectedToken(token.describe())),
    }
}

struct TokenParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn disjunction(&mut self) -> Result<Expr, PredicateError> {
        let mut children = vec![self.conjunction()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            children.push(self.conjunction()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Expr::Or(children)
        })
    }

    fn conjunction(&mut self) -> Result<Expr, PredicateError> {
        let mut children = vec![self.term()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            children.push(self.term()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Expr::And(children)
        })
    }

    fn term(&mut self) -> Result<Expr, PredicateError> {
        let left = self.operand()?;
        match self.peek() {
            Some(Token::Compare(op)) => {
                let op = *op;
                self.pos += 1;
                let right = self.operand()?;
                Ok(Expr::Comparison(left, op, right))
            }
            _ => Ok(Expr::Literal(left)),
        }
    }

    fn operand(&mut self) -> Result<Value, PredicateError> {
        match self.next() {
            Some(Token::Literal(v)) => Ok(v),
            Some(other) => Err(PredicateError::UnexpectedToken(other.describe())),
            None => Err(PredicateError::UnexpectedEnd),
        }
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0 && !f.is_nan(),
        Value::String(s) => !s.is_empty(),
    }
}

/// Loose equality: same kinds compare directly, NULL equals only NULL,
/// other mixes compare by numeric reading
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(_), Value::String(_)) | (Value::Boolean(_), Value::Boolean(_)) => {
            left == right
        }
        _ if left.is_number() && right.is_number() => left == right,
        _ => match (left.loose_number(), right.loose_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
    match op {
        CompareOp::Eq => return loose_eq(left, right),
        CompareOp::NotEq => return !loose_eq(left, right),
        _ => {}
    }

    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.loose_number(), right.loose_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    match ordering {
        Some(ord) => match op {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::LtEq => ord != Ordering::Greater,
            CompareOp::GtEq => ord != Ordering::Less,
            CompareOp::Eq | CompareOp::NotEq => unreachable!("handled above"),
        },
        // NaN-like readings compare false with everything
        None => false,
    }
}
