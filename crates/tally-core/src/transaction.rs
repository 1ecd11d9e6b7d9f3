//! Transactions: the append-only facts of a chat ledger.
//!
//! A transaction is written once and never updated. Corrections are made by
//! recording an offsetting transaction, or by clearing the whole chat.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifies one ledger partition (one chat or group).
pub type ChatId = i64;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Which side of the ledger a transaction lives on. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
  /// Funds received, recorded in the local currency.
  Income,
  /// Funds paid out, recorded in the foreign currency.
  Payout,
}

impl TxKind {
  /// The discriminant string stored in the `kind` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Income => "income",
      Self::Payout => "payout",
    }
  }
}

impl fmt::Display for TxKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TxKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "income" => Ok(Self::Income),
      "payout" => Ok(Self::Payout),
      other => Err(Error::UnknownKind(other.to_owned())),
    }
  }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// A persisted ledger entry. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
  /// Store-assigned, strictly increasing across the whole store.
  pub id:             i64,
  pub chat_id:        ChatId,
  /// Display name of the operator; informational only.
  pub user:           String,
  pub kind:           TxKind,
  pub amount_local:   Decimal,
  pub amount_foreign: Decimal,
  /// Exchange rate (local per foreign unit) in force when recorded.
  pub rate:           Decimal,
  /// Server-assigned timestamp; never changes after creation.
  pub recorded_at:    DateTime<Utc>,
}

// ─── NewTransaction ──────────────────────────────────────────────────────────

/// Input to [`crate::store::LedgerStore::append`].
/// `id` and `recorded_at` are always set by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
  pub chat_id:        ChatId,
  pub user:           String,
  pub kind:           TxKind,
  pub amount_local:   Decimal,
  pub amount_foreign: Decimal,
  pub rate:           Decimal,
}

impl NewTransaction {
  /// An income entered in local currency; the foreign amount is
  /// `amount_local / rate`.
  pub fn income(
    chat_id: ChatId,
    user: impl Into<String>,
    amount_local: Decimal,
    rate: Decimal,
  ) -> Result<Self> {
    check_rate(rate)?;
    let amount_foreign = amount_local
      .checked_div(rate)
      .ok_or_else(|| Error::Overflow(format!("{amount_local} / {rate}")))?;
    Ok(Self {
      chat_id,
      user: user.into(),
      kind: TxKind::Income,
      amount_local,
      amount_foreign,
      rate,
    })
  }

  /// A payout entered in foreign currency; the local amount is
  /// `amount_foreign * rate`. The sign is kept exactly as given.
  pub fn payout(
    chat_id: ChatId,
    user: impl Into<String>,
    amount_foreign: Decimal,
    rate: Decimal,
  ) -> Result<Self> {
    check_rate(rate)?;
    let amount_local = amount_foreign
      .checked_mul(rate)
      .ok_or_else(|| Error::Overflow(format!("{amount_foreign} * {rate}")))?;
    Ok(Self {
      chat_id,
      user: user.into(),
      kind: TxKind::Payout,
      amount_local,
      amount_foreign,
      rate,
    })
  }
}

fn check_rate(rate: Decimal) -> Result<()> {
  if rate <= Decimal::ZERO {
    return Err(Error::NonPositiveRate(rate));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn income_divides_by_rate() {
    let tx = NewTransaction::income(1, "ana", Decimal::from(50), Decimal::from(100)).unwrap();
    assert_eq!(tx.kind, TxKind::Income);
    assert_eq!(tx.amount_foreign, Decimal::new(5, 1));
  }

  #[test]
  fn payout_keeps_typed_sign() {
    let tx = NewTransaction::payout(1, "ana", Decimal::new(-25, 1), Decimal::from(100)).unwrap();
    assert_eq!(tx.amount_foreign, Decimal::new(-25, 1));
    assert_eq!(tx.amount_local, Decimal::from(-250));
  }

  #[test]
  fn zero_rate_is_rejected() {
    let err = NewTransaction::income(1, "ana", Decimal::ONE, Decimal::ZERO).unwrap_err();
    assert!(matches!(err, Error::NonPositiveRate(_)));
  }

  #[test]
  fn kind_round_trips_through_str() {
    for kind in [TxKind::Income, TxKind::Payout] {
      assert_eq!(kind.as_str().parse::<TxKind>().unwrap(), kind);
    }
    assert!("refund".parse::<TxKind>().is_err());
  }
}
