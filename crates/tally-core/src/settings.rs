//! Per-chat settings and the operator roster.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::transaction::ChatId;

/// Identifies an operator (a chat user id).
pub type OperatorId = i64;

// ─── Settings ────────────────────────────────────────────────────────────────

/// Values applied when a chat has never set the corresponding column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsDefaults {
  pub exchange_rate: Decimal,
  pub fee_rate:      Decimal,
}

impl Default for SettingsDefaults {
  fn default() -> Self {
    Self { exchange_rate: Decimal::from(106), fee_rate: Decimal::ZERO }
  }
}

/// The settings row exactly as persisted; a column never set is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
  pub chat_id:       ChatId,
  pub exchange_rate: Option<Decimal>,
  pub fee_rate:      Option<Decimal>,
}

/// A single-column change to a chat's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsUpdate {
  ExchangeRate(Decimal),
  FeeRate(Decimal),
}

/// Effective settings for a chat, with defaults filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatSettings {
  pub chat_id:       ChatId,
  /// Local currency units per foreign unit; always positive.
  pub exchange_rate: Decimal,
  /// Percentage shown in reports; never applied to any amount.
  pub fee_rate:      Decimal,
}

impl ChatSettings {
  pub fn resolve(
    chat_id: ChatId,
    stored: Option<&StoredSettings>,
    defaults: &SettingsDefaults,
  ) -> Self {
    Self {
      chat_id,
      exchange_rate: stored
        .and_then(|s| s.exchange_rate)
        .unwrap_or(defaults.exchange_rate),
      fee_rate: stored.and_then(|s| s.fee_rate).unwrap_or(defaults.fee_rate),
    }
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

/// An operator added at runtime. Built-in operators come from configuration
/// and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
  pub operator_id: OperatorId,
  pub added_at:    DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_row_uses_defaults() {
    let s = ChatSettings::resolve(7, None, &SettingsDefaults::default());
    assert_eq!(s.exchange_rate, Decimal::from(106));
    assert_eq!(s.fee_rate, Decimal::ZERO);
  }

  #[test]
  fn partial_row_falls_back_per_column() {
    let stored = StoredSettings {
      chat_id:       7,
      exchange_rate: None,
      fee_rate:      Some(Decimal::from(2)),
    };
    let s = ChatSettings::resolve(7, Some(&stored), &SettingsDefaults::default());
    assert_eq!(s.exchange_rate, Decimal::from(106));
    assert_eq!(s.fee_rate, Decimal::from(2));
  }
}
