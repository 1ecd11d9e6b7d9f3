//! Line classification.
//!
//! Every rule matches against the whole trimmed line. Rules are tried in a
//! fixed order and the first match decides the command.

use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use tally_core::settings::OperatorId;

use crate::{arith::evaluate, error::ParseError};

// ─── Commands ────────────────────────────────────────────────────────────────

/// Bot commands written as `/name` (optionally `/name@botname`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
  Start,
  Summary,
  ViewFull,
  WhoAmI,
  Clear,
  DbPeek,
}

impl SlashCommand {
  fn from_word(word: &str) -> Option<Self> {
    let name = word.split('@').next().unwrap_or(word);
    match name.to_lowercase().as_str() {
      "/start" => Some(Self::Start),
      "/summary" => Some(Self::Summary),
      "/viewfull" => Some(Self::ViewFull),
      "/whoami" => Some(Self::WhoAmI),
      "/clear" => Some(Self::Clear),
      "/dbpeek" => Some(Self::DbPeek),
      _ => None,
    }
  }
}

/// What a chat line asks the ledger to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// `+<expr>`: income in local currency, the evaluated expression.
  Income(Decimal),
  /// `-<n>`: an income correction; always `<= 0`.
  NegativeIncome(Decimal),
  /// `T<n>U` / `T-<n>U`: payout in foreign currency, sign as typed.
  Payout(Decimal),
  SetExchangeRate(Decimal),
  SetFeeRate(Decimal),
  /// Plain-text `clear` or `clearing bills…`.
  Clear,
  AddOperator(OperatorId),
  RemoveOperator(OperatorId),
  Slash(SlashCommand),
  /// A line starting with `T` that is not a valid payout. Dropped without a
  /// reply so chatter does not trigger error messages.
  Ignored,
  /// Anything else; no reply.
  Unrecognized,
}

// ─── Grammar options ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
  /// When `false`, `T100` is accepted as well as `T100U`.
  pub payout_suffix_required: bool,
}

impl Default for Grammar {
  fn default() -> Self { Self { payout_suffix_required: true } }
}

// ─── Patterns ────────────────────────────────────────────────────────────────

static NUMBER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"-?[0-9]+(?:\.[0-9]+)?").expect("valid regex"));

static NEGATIVE_INCOME: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^-\s*([0-9]+(?:\.[0-9]+)?)$").expect("valid regex")
});

static PAYOUT_STRICT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^T(-?[0-9]+(?:\.[0-9]+)?)[Uu]$").expect("valid regex")
});

static PAYOUT_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^T(-?[0-9]+(?:\.[0-9]+)?)[Uu]?$").expect("valid regex")
});

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Classify one chat line.
///
/// `Ok(Command::Unrecognized)` and `Ok(Command::Ignored)` are normal
/// outcomes; `Err` means the line was recognised but its payload was bad.
pub fn parse(line: &str, grammar: &Grammar) -> Result<Command, ParseError> {
  let text = line.trim();
  let lower = text.to_lowercase();

  if text.starts_with('/') {
    let word = text.split_whitespace().next().unwrap_or(text);
    return Ok(
      SlashCommand::from_word(word)
        .map(Command::Slash)
        .unwrap_or(Command::Unrecognized),
    );
  }

  if lower == "clear" || lower.starts_with("clearing bills") {
    return Ok(Command::Clear);
  }

  if lower.starts_with("add ") {
    return operator_id(text)
      .map(Command::AddOperator)
      .ok_or(ParseError::AddOperator);
  }
  if lower.starts_with("del ") {
    return operator_id(text)
      .map(Command::RemoveOperator)
      .ok_or(ParseError::RemoveOperator);
  }

  if lower.starts_with("exchange") {
    return match first_number(text.get("exchange".len()..).unwrap_or("")) {
      Some(rate) if rate > Decimal::ZERO => Ok(Command::SetExchangeRate(rate)),
      _ => Err(ParseError::ExchangeRate),
    };
  }
  if lower.starts_with("fee") {
    return match first_number(text.get("fee".len()..).unwrap_or("")) {
      Some(fee) if !fee.is_sign_negative() || fee.is_zero() => Ok(Command::SetFeeRate(fee)),
      _ => Err(ParseError::FeeRate),
    };
  }

  if let Some(expr) = text.strip_prefix('+') {
    return Ok(Command::Income(evaluate(expr.trim())?));
  }

  if let Some(caps) = NEGATIVE_INCOME.captures(text) {
    let raw = &caps[1];
    let magnitude = Decimal::from_str(raw)
      .map_err(|_| ParseError::NegativeIncome(raw.to_owned()))?;
    return Ok(Command::NegativeIncome(Decimal::ZERO - magnitude));
  }

  let payout = if grammar.payout_suffix_required { &PAYOUT_STRICT } else { &PAYOUT_LOOSE };
  if let Some(caps) = payout.captures(text) {
    let raw = &caps[1];
    let amount =
      Decimal::from_str(raw).map_err(|_| ParseError::Payout(raw.to_owned()))?;
    return Ok(Command::Payout(amount));
  }
  if text.starts_with('T') {
    return Ok(Command::Ignored);
  }

  Ok(Command::Unrecognized)
}

/// The second whitespace-separated token as an operator id.
fn operator_id(text: &str) -> Option<OperatorId> {
  text.split_whitespace().nth(1)?.parse().ok()
}

fn first_number(rest: &str) -> Option<Decimal> {
  let m = NUMBER.find(rest)?;
  Decimal::from_str(m.as_str()).ok()
}
