//! Restricted arithmetic over decimal numbers.
//!
//! Only digits, `.`, `+ - * /`, parentheses and whitespace are accepted.
//! There are no identifiers, calls or exponent operators, so nothing but
//! plain arithmetic can ever be evaluated.
//!
//! ```text
//! expr   := term   (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | '(' expr ')' | number
//! ```

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;

use crate::error::ArithError;

const MAX_DEPTH: usize = 64;

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
  Num(Decimal),
  Plus,
  Minus,
  Star,
  Slash,
  Open,
  Close,
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Token::Num(n) => write!(f, "{n}"),
      Token::Plus => f.write_str("+"),
      Token::Minus => f.write_str("-"),
      Token::Star => f.write_str("*"),
      Token::Slash => f.write_str("/"),
      Token::Open => f.write_str("("),
      Token::Close => f.write_str(")"),
    }
  }
}

fn is_allowed(c: char) -> bool {
  c.is_ascii_digit() || c.is_ascii_whitespace() || "+-*/().".contains(c)
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ArithError> {
  let mut tokens = Vec::new();
  let mut chars = expr.char_indices().peekable();

  while let Some((start, c)) = chars.next() {
    let token = match c {
      c if c.is_ascii_whitespace() => continue,
      '+' => Token::Plus,
      '-' => Token::Minus,
      '*' => Token::Star,
      '/' => Token::Slash,
      '(' => Token::Open,
      ')' => Token::Close,
      c if c.is_ascii_digit() || c == '.' => {
        let mut end = start + 1;
        while let Some(&(i, d)) = chars.peek() {
          if !(d.is_ascii_digit() || d == '.') {
            break;
          }
          end = i + 1;
          chars.next();
        }
        Token::Num(parse_number(&expr[start..end])?)
      }
      other => return Err(ArithError::InvalidCharacter(other)),
    };
    tokens.push(token);
  }

  Ok(tokens)
}

/// Accepts `12`, `12.5`, `.5` and `12.`; rejects a lone dot or two dots.
fn parse_number(raw: &str) -> Result<Decimal, ArithError> {
  let bad = || ArithError::BadNumber(raw.to_owned());
  if raw == "." || raw.matches('.').count() > 1 {
    return Err(bad());
  }
  let mut text = raw.to_owned();
  if text.starts_with('.') {
    text.insert(0, '0');
  }
  if text.ends_with('.') {
    text.push('0');
  }
  Decimal::from_str(&text).map_err(|_| bad())
}

// ─── Parser ──────────────────────────────────────────────────────────────────

struct Parser<'a> {
  tokens: &'a [Token],
  pos:    usize,
  depth:  usize,
}

impl Parser<'_> {
  fn peek(&self) -> Option<Token> { self.tokens.get(self.pos).copied() }

  fn next(&mut self) -> Option<Token> {
    let t = self.peek();
    if t.is_some() {
      self.pos += 1;
    }
    t
  }

  fn expr(&mut self) -> Result<Decimal, ArithError> {
    let mut acc = self.term()?;
    while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
      self.pos += 1;
      let rhs = self.term()?;
      acc = match op {
        Token::Plus => acc.checked_add(rhs),
        _ => acc.checked_sub(rhs),
      }
      .ok_or(ArithError::Overflow)?;
    }
    Ok(acc)
  }

  fn term(&mut self) -> Result<Decimal, ArithError> {
    let mut acc = self.factor()?;
    while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
      self.pos += 1;
      let rhs = self.factor()?;
      acc = match op {
        Token::Star => acc.checked_mul(rhs).ok_or(ArithError::Overflow)?,
        _ if rhs.is_zero() => return Err(ArithError::DivisionByZero),
        _ => acc.checked_div(rhs).ok_or(ArithError::Overflow)?,
      };
    }
    Ok(acc)
  }

  fn factor(&mut self) -> Result<Decimal, ArithError> {
    self.depth += 1;
    if self.depth > MAX_DEPTH {
      return Err(ArithError::TooDeep);
    }
    let value = match self.next() {
      Some(Token::Num(n)) => n,
      Some(Token::Plus) => self.factor()?,
      Some(Token::Minus) => -self.factor()?,
      Some(Token::Open) => {
        let inner = self.expr()?;
        match self.next() {
          Some(Token::Close) => inner,
          Some(other) => return Err(ArithError::UnexpectedToken(other.to_string())),
          None => return Err(ArithError::UnexpectedEnd),
        }
      }
      Some(other) => return Err(ArithError::UnexpectedToken(other.to_string())),
      None => return Err(ArithError::UnexpectedEnd),
    };
    self.depth -= 1;
    Ok(value)
  }
}

/// Evaluate a restricted arithmetic expression with exact decimal division.
pub fn evaluate(expr: &str) -> Result<Decimal, ArithError> {
  if let Some(c) = expr.chars().find(|c| !is_allowed(*c)) {
    return Err(ArithError::InvalidCharacter(c));
  }
  let tokens = tokenize(expr)?;
  if tokens.is_empty() {
    return Err(ArithError::Empty);
  }

  let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
  let value = parser.expr()?;
  match parser.peek() {
    Some(extra) => Err(ArithError::UnexpectedToken(extra.to_string())),
    None => Ok(value),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn eval(s: &str) -> Decimal { evaluate(s).unwrap() }

  fn d(n: i64, scale: u32) -> Decimal { Decimal::new(n, scale) }

  #[test]
  fn plain_numbers() {
    assert_eq!(eval("50"), d(50, 0));
    assert_eq!(eval("10.25"), d(1025, 2));
    assert_eq!(eval(".5"), d(5, 1));
    assert_eq!(eval("5."), d(5, 0));
  }

  #[test]
  fn precedence_and_parentheses() {
    assert_eq!(eval("2 + 3 * 4"), d(14, 0));
    assert_eq!(eval("(2 + 3) * 4"), d(20, 0));
    assert_eq!(eval("100 - 20 - 30"), d(50, 0));
    assert_eq!(eval("-(3 - 5)"), d(2, 0));
    assert_eq!(eval("1000/4"), d(250, 0));
  }

  #[test]
  fn division_is_exact_decimal() {
    assert_eq!(eval("10 / 4"), d(25, 1));
    assert_eq!(eval("0.3 / 3"), d(1, 1));
  }

  #[test]
  fn division_by_zero_is_rejected() {
    assert_eq!(evaluate("10/0"), Err(ArithError::DivisionByZero));
    assert_eq!(evaluate("1/(2-2)"), Err(ArithError::DivisionByZero));
  }

  #[test]
  fn anything_but_arithmetic_is_rejected() {
    assert!(matches!(evaluate("abs(5)"), Err(ArithError::InvalidCharacter('a'))));
    assert!(matches!(evaluate("5 .real"), Err(ArithError::InvalidCharacter('r'))));
    assert!(matches!(evaluate("__import__"), Err(ArithError::InvalidCharacter('_'))));
    assert!(matches!(evaluate("1,000"), Err(ArithError::InvalidCharacter(','))));
  }

  #[test]
  fn malformed_expressions_are_rejected() {
    assert_eq!(evaluate(""), Err(ArithError::Empty));
    assert_eq!(evaluate("   "), Err(ArithError::Empty));
    assert_eq!(evaluate("2 **3"), Err(ArithError::UnexpectedToken("*".into())));
    assert_eq!(evaluate("(1 + 2"), Err(ArithError::UnexpectedEnd));
    assert_eq!(evaluate("1 + 2)"), Err(ArithError::UnexpectedToken(")".into())));
    assert!(matches!(evaluate("1 2"), Err(ArithError::UnexpectedToken(_))));
    assert!(matches!(evaluate("1.2.3"), Err(ArithError::BadNumber(_))));
    assert!(matches!(evaluate("."), Err(ArithError::BadNumber(_))));
  }

  #[test]
  fn deep_nesting_is_bounded() {
    let expr = format!("{}1{}", "(".repeat(200), ")".repeat(200));
    assert_eq!(evaluate(&expr), Err(ArithError::TooDeep));
  }
}
