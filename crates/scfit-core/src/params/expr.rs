//! Arithmetic tie expressions such as `C_0` or `2 * epsilon_0 - 1`.

use crate::domain::{ScfitError, ScfitResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Name(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Expr {
    pub fn parse(source: &str) -> ScfitResult<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens,
            cursor: 0,
        };
        let expr = parser.parse_sum()?;
        if parser.cursor != parser.tokens.len() {
            return Err(syntax_error(source, "unexpected trailing input"));
        }
        Ok(expr)
    }

    /// `None` when a referenced name has no value.
    pub fn evaluate<F>(&self, lookup: &F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Self::Number(value) => Some(*value),
            Self::Name(name) => lookup(name),
            Self::Negate(inner) => inner.evaluate(lookup).map(|value| -value),
            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(lookup)?;
                let rhs = rhs.evaluate(lookup)?;
                Some(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => lhs / rhs,
                })
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Number(_) => {}
            Self::Name(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Self::Negate(inner) => inner.collect_names(names),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_names(names);
                rhs.collect_names(names);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(source: &str) -> ScfitResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        match ch {
            ' ' | '\t' => index += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(ch));
                index += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                index += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                index += 1;
            }
            _ if ch.is_ascii_digit() || ch == '.' => {
                let start = index;
                while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.')
                {
                    index += 1;
                }
                if index < chars.len() && matches!(chars[index], 'e' | 'E') {
                    let mut exponent = index + 1;
                    if exponent < chars.len() && matches!(chars[exponent], '+' | '-') {
                        exponent += 1;
                    }
                    if exponent < chars.len() && chars[exponent].is_ascii_digit() {
                        index = exponent;
                        while index < chars.len() && chars[index].is_ascii_digit() {
                            index += 1;
                        }
                    }
                }
                let literal: String = chars[start..index].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| syntax_error(source, &format!("bad number '{literal}'")))?;
                tokens.push(Token::Number(value));
            }
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                let start = index;
                while index < chars.len() && (chars[index].is_ascii_alphanumeric() || chars[index] == '_')
                {
                    index += 1;
                }
                tokens.push(Token::Name(chars[start..index].iter().collect()));
            }
            _ => return Err(syntax_error(source, &format!("unexpected character '{ch}'"))),
        }
    }
    if tokens.is_empty() {
        return Err(syntax_error(source, "expression is empty"));
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn parse_sum(&mut self) -> ScfitResult<Expr> {
        let mut expr = self.parse_product()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = if *op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            self.cursor += 1;
            let rhs = self.parse_product()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_product(&mut self) -> ScfitResult<Expr> {
        let mut expr = self.parse_unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = if *op == '*' { BinaryOp::Mul } else { BinaryOp::Div };
            self.cursor += 1;
            let rhs = self.parse_unary()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ScfitResult<Expr> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.cursor += 1;
                Ok(Expr::Negate(Box::new(self.parse_unary()?)))
            }
            Some(Token::Op('+')) => {
                self.cursor += 1;
                self.parse_unary()
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> ScfitResult<Expr> {
        let token = self.tokens.get(self.cursor).cloned();
        self.cursor += 1;
        match token {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Name(name)) => Ok(Expr::Name(name)),
            Some(Token::Open) => {
                let inner = self.parse_sum()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(syntax_error(self.source, "missing ')'"));
                }
                self.cursor += 1;
                Ok(inner)
            }
            _ => Err(syntax_error(self.source, "expected a number, name or '('")),
        }
    }
}

fn syntax_error(source: &str, detail: &str) -> ScfitError {
    ScfitError::invalid_input(
        "INPUT.PARAM_EXPR",
        format!("invalid expression '{source}': {detail}"),
    )
}
