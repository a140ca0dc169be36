//! Row filter expressions.
//!
//! A `where_string` such as
//!
//! ```text
//! BETA1Year1 > 0 and BETA1Year2 < 0 or InstitutionID in ('0', '7')
//! ```
//!
//! is parsed once into an [`Expr`] tree and evaluated against every row.
//! Precedence, loosest first: `or`, `and`, `not`, comparison.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use super::dataset::Dataset;
use super::value::Value;

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    #[error("unexpected token '{found}', expected {expected}")]
    UnexpectedToken { found: String, expected: String },

    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(String),

    #[error("filter references unknown column '{0}'")]
    UnknownColumn(String),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Either side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Literal(Value),
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare(Operand, CmpOp, Operand),
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression string.
    pub fn parse(input: &str) -> Result<Expr, FilterError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(FilterError::UnexpectedToken {
                found: tok.to_string(),
                expected: "end of expression".into(),
            }),
        }
    }

    /// Every column the expression reads, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        fn push<'a>(out: &mut Vec<&'a str>, name: &'a str) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        match self {
            Expr::Compare(a, _, b) => {
                for side in [a, b] {
                    if let Operand::Column(name) = side {
                        push(out, name);
                    }
                }
            }
            Expr::In { column, .. } => push(out, column),
            Expr::Not(inner) => inner.collect_columns(out),
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
        }
    }

    fn eval(&self, dataset: &Dataset, row: usize) -> bool {
        match self {
            Expr::Compare(a, op, b) => {
                compare(&operand(dataset, a, row), *op, &operand(dataset, b, row))
            }
            Expr::In {
                column,
                values,
                negated,
            } => {
                let cell = dataset
                    .column(column)
                    .map(|c| c.values[row].clone())
                    .unwrap_or(Value::Null);
                let hit = !cell.is_null() && values.iter().any(|v| compare(&cell, CmpOp::Eq, v));
                hit != *negated
            }
            Expr::Not(inner) => !inner.eval(dataset, row),
            Expr::And(a, b) => a.eval(dataset, row) && b.eval(dataset, row),
            Expr::Or(a, b) => a.eval(dataset, row) || b.eval(dataset, row),
        }
    }
}

fn operand(dataset: &Dataset, op: &Operand, row: usize) -> Value {
    match op {
        Operand::Literal(v) => v.clone(),
        Operand::Column(name) => dataset
            .column(name)
            .map(|c| c.values[row].clone())
            .unwrap_or(Value::Null),
    }
}

/// Numbers, and quoted literals that spell a number (`'7'` against an integer column).
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
}

/// Missing cells never compare true, except under `!=`.
fn compare(a: &Value, op: CmpOp, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return op == CmpOp::Ne;
    }
    let ord = match (numeric(a), numeric(b), a, b) {
        (_, _, Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Some(x), Some(y), _, _) => x.partial_cmp(&y),
        _ => None,
    };
    match (ord, op) {
        (None, CmpOp::Ne) => true,
        (None, _) => false,
        (Some(o), CmpOp::Eq) => o == Ordering::Equal,
        (Some(o), CmpOp::Ne) => o != Ordering::Equal,
        (Some(o), CmpOp::Lt) => o == Ordering::Less,
        (Some(o), CmpOp::Le) => o != Ordering::Greater,
        (Some(o), CmpOp::Gt) => o == Ordering::Greater,
        (Some(o), CmpOp::Ge) => o != Ordering::Less,
    }
}

/// Apply an optional filter string to a dataset.
///
/// `None` or a blank string keeps every row.
pub fn apply_filter(dataset: &Dataset, where_string: Option<&str>) -> Result<Dataset, FilterError> {
    let Some(text) = where_string.filter(|s| !s.trim().is_empty()) else {
        return Ok(dataset.clone());
    };
    let expr = Expr::parse(text)?;
    for name in expr.columns() {
        if !dataset.has_column(name) {
            return Err(FilterError::UnknownColumn(name.to_string()));
        }
    }
    let rows: Vec<usize> = (0..dataset.n_rows())
        .filter(|&row| expr.eval(dataset, row))
        .collect();
    Ok(dataset.take_rows(&rows))
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(Value),
    Str(String),
    Op(CmpOp),
    And,
    Or,
    Not,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{s}"),
            Token::Number(v) => write!(f, "{v}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Op(op) => write!(f, "{op}"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::In => f.write_str("in"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::Comma => f.write_str(","),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '&' => {
                tokens.push(Token::And);
                i += if next == Some('&') { 2 } else { 1 };
            }
            '|' => {
                tokens.push(Token::Or);
                i += if next == Some('|') { 2 } else { 1 };
            }
            '=' => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += if next == Some('=') { 2 } else { 1 };
            }
            '!' | '^' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Ne));
                i += 2;
            }
            '<' => match next {
                Some('=') => {
                    tokens.push(Token::Op(CmpOp::Le));
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Op(CmpOp::Ne));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op(CmpOp::Lt));
                    i += 1;
                }
            },
            '>' => {
                if next == Some('=') {
                    tokens.push(Token::Op(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                    i += 1;
                }
            }
            '\'' | '"' => {
                let start = i;
                let mut j = i + 1;
                while j < chars.len() && chars[j] != c {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(FilterError::UnterminatedString(start));
                }
                tokens.push(Token::Str(chars[i + 1..j].iter().collect()));
                i = j + 1;
            }
            '`' => {
                let start = i;
                let mut j = i + 1;
                while j < chars.len() && chars[j] != '`' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(FilterError::UnterminatedString(start));
                }
                tokens.push(Token::Ident(chars[i + 1..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit()
                || (matches!(c, '-' | '+' | '.')
                    && next.is_some_and(|n| n.is_ascii_digit() || n == '.')) =>
            {
                let mut j = i + 1;
                while j < chars.len()
                    && (chars[j].is_ascii_alphanumeric()
                        || chars[j] == '.'
                        || (matches!(chars[j], '-' | '+') && matches!(chars[j - 1], 'e' | 'E')))
                {
                    j += 1;
                }
                let text: String = chars[i..j].iter().collect();
                let value = if let Ok(v) = text.parse::<i64>() {
                    Value::Integer(v)
                } else if let Ok(v) = text.parse::<f64>() {
                    Value::Float(v)
                } else {
                    return Err(FilterError::UnexpectedChar { ch: c, offset: i });
                };
                tokens.push(Token::Number(value));
                i = j;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut j = i + 1;
                while j < chars.len()
                    && (chars[j].is_alphanumeric() || chars[j] == '_' || chars[j] == '.')
                {
                    j += 1;
                }
                let word: String = chars[i..j].iter().collect();
                let token = match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "eq" => Token::Op(CmpOp::Eq),
                    "ne" => Token::Op(CmpOp::Ne),
                    "lt" => Token::Op(CmpOp::Lt),
                    "le" => Token::Op(CmpOp::Le),
                    "gt" => Token::Op(CmpOp::Gt),
                    "ge" => Token::Op(CmpOp::Ge),
                    _ => Token::Ident(word),
                };
                tokens.push(token);
                i = j;
            }
            other => return Err(FilterError::UnexpectedChar { ch: other, offset: i }),
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Recursive-descent parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &str) -> Result<Token, FilterError> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| FilterError::UnexpectedEnd(expected.to_string()))?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, want: &Token, expected: &str) -> Result<(), FilterError> {
        let tok = self.next(expected)?;
        if &tok == want {
            Ok(())
        } else {
            Err(FilterError::UnexpectedToken {
                found: tok.to_string(),
                expected: expected.to_string(),
            })
        }
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, FilterError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(inner);
        }

        let lhs = self.parse_operand()?;

        // `col in (...)` / `col not in (...)`
        let negated = match self.peek() {
            Some(Token::Not) if self.tokens.get(self.pos + 1) == Some(&Token::In) => {
                self.pos += 2;
                Some(true)
            }
            Some(Token::In) => {
                self.pos += 1;
                Some(false)
            }
            _ => None,
        };
        if let Some(negated) = negated {
            let Operand::Column(column) = lhs else {
                return Err(FilterError::UnexpectedToken {
                    found: "literal".into(),
                    expected: "column name before 'in'".into(),
                });
            };
            let values = self.parse_list()?;
            return Ok(Expr::In {
                column,
                values,
                negated,
            });
        }

        let op = match self.next("comparison operator")? {
            Token::Op(op) => op,
            other => {
                return Err(FilterError::UnexpectedToken {
                    found: other.to_string(),
                    expected: "comparison operator".into(),
                })
            }
        };
        let rhs = self.parse_operand()?;
        Ok(Expr::Compare(lhs, op, rhs))
    }

    fn parse_operand(&mut self) -> Result<Operand, FilterError> {
        match self.next("column name or literal")? {
            Token::Ident(name) => Ok(Operand::Column(name)),
            Token::Number(v) => Ok(Operand::Literal(v)),
            Token::Str(s) => Ok(Operand::Literal(Value::Text(s))),
            other => Err(FilterError::UnexpectedToken {
                found: other.to_string(),
                expected: "column name or literal".into(),
            }),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Value>, FilterError> {
        let close = match self.next("'(' or '['")? {
            Token::LParen => Token::RParen,
            Token::LBracket => Token::RBracket,
            other => {
                return Err(FilterError::UnexpectedToken {
                    found: other.to_string(),
                    expected: "'(' or '['".into(),
                })
            }
        };
        let mut values = Vec::new();
        loop {
            if self.peek() == Some(&close) {
                self.pos += 1;
                return Ok(values);
            }
            match self.next("list value")? {
                Token::Number(v) => values.push(v),
                Token::Str(s) => values.push(Value::Text(s)),
                other => {
                    return Err(FilterError::UnexpectedToken {
                        found: other.to_string(),
                        expected: "list value".into(),
                    })
                }
            }
            if self.peek() == Some(&Token::Comma) {
                self.pos += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_csv_str;

    fn dataset() -> Dataset {
        read_csv_str(
            "a,b,code,name\n\
             1,-2,0,x\n\
             2,3,7,y\n\
             3,,0,z\n\
             -1,4,9,x\n",
        )
        .unwrap()
    }

    fn kept(where_string: &str) -> Vec<String> {
        let filtered = apply_filter(&dataset(), Some(where_string)).unwrap();
        filtered
            .column("a")
            .unwrap()
            .values
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn test_simple_comparisons() {
        assert_eq!(kept("a > 1"), vec!["2", "3"]);
        assert_eq!(kept("a >= 2 and b > 0"), vec!["2"]);
        assert_eq!(kept("name == 'x'"), vec!["1", "-1"]);
        assert_eq!(kept("name ^= 'x'"), vec!["2", "3"]);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // (a > 2 and b > 0) or a < 0
        assert_eq!(kept("a > 2 and b > 0 or a < 0"), vec!["-1"]);
        assert_eq!(kept("a > 2 and (b > 0 or a < 0)"), Vec::<String>::new());
    }

    #[test]
    fn test_missing_cells() {
        // b is missing on the third row
        assert_eq!(kept("b < 100"), vec!["1", "2", "-1"]);
        assert_eq!(kept("b != 3"), vec!["1", "3", "-1"]);
    }

    #[test]
    fn test_membership() {
        assert_eq!(kept("code in (0, 9)"), vec!["1", "3", "-1"]);
        assert_eq!(kept("name not in ('x')"), vec!["2", "3"]);
        assert_eq!(kept("name in ['y', 'z'] & a < 3"), vec!["2"]);
        // quoted codes still match an integer column
        assert_eq!(kept("code in ('0', '7')"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_not_and_symbols() {
        assert_eq!(kept("not a > 1"), vec!["1", "-1"]);
        assert_eq!(kept("a == 1 | a == 3"), vec!["1", "3"]);
    }

    #[test]
    fn test_blank_filter_keeps_everything() {
        let ds = dataset();
        assert_eq!(apply_filter(&ds, None).unwrap().n_rows(), 4);
        assert_eq!(apply_filter(&ds, Some("   ")).unwrap().n_rows(), 4);
    }

    #[test]
    fn test_errors() {
        let ds = dataset();
        assert_eq!(
            apply_filter(&ds, Some("missing > 1")),
            Err(FilterError::UnknownColumn("missing".into()))
        );
        assert!(matches!(
            apply_filter(&ds, Some("a >")),
            Err(FilterError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            apply_filter(&ds, Some("name == 'x")),
            Err(FilterError::UnterminatedString(_))
        ));
        assert!(matches!(
            apply_filter(&ds, Some("a > 1 b")),
            Err(FilterError::UnexpectedToken { .. })
        ));
    }
}
