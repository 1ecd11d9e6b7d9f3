//! Error types for the command grammar.

use thiserror::Error;

/// Why an arithmetic income expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithError {
  #[error("empty expression")]
  Empty,

  #[error("character {0:?} is not allowed")]
  InvalidCharacter(char),

  #[error("malformed number {0:?}")]
  BadNumber(String),

  #[error("unexpected {0:?}")]
  UnexpectedToken(String),

  #[error("expression ends too early")]
  UnexpectedEnd,

  #[error("parentheses nested too deeply")]
  TooDeep,

  #[error("division by zero")]
  DivisionByZero,

  #[error("result out of range")]
  Overflow,
}

/// A recognised command whose payload could not be read. Each variant maps
/// to a short corrective hint for the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("invalid income expression: {0}")]
  Income(#[from] ArithError),

  #[error("invalid negative income amount {0:?}")]
  NegativeIncome(String),

  #[error("invalid payout amount {0:?}")]
  Payout(String),

  #[error("missing or non-positive exchange rate")]
  ExchangeRate,

  #[error("missing fee rate")]
  FeeRate,

  #[error("missing or invalid operator id to add")]
  AddOperator,

  #[error("missing or invalid operator id to remove")]
  RemoveOperator,
}

impl ParseError {
  /// The reply shown to the sender.
  pub fn hint(&self) -> &'static str {
    match self {
      Self::Income(_) => "⚠️ Invalid income format.",
      Self::NegativeIncome(_) => "⚠️ Invalid negative income format.",
      Self::Payout(_) => "⚠️ Invalid payout format.",
      Self::ExchangeRate => "⚠️ Example: exchange 106",
      Self::FeeRate => "⚠️ Example: fee 2",
      Self::AddOperator => "⚠️ Example: add 123456789",
      Self::RemoveOperator => "⚠️ Example: del 123456789",
    }
  }
}
