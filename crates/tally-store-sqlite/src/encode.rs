//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch (UTC),
//! which keeps window comparisons exact. Decimals are stored as their
//! canonical string form so no precision is lost to `REAL`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_core::{
  settings::{Operator, StoredSettings},
  transaction::{Transaction, TxKind},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> i64 { dt.timestamp_micros() }

pub fn decode_dt(micros: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_micros(micros).ok_or(Error::Timestamp(micros))
}

// ─── Decimal ─────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal) -> String { d.to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `transactions` row.
pub struct RawTransaction {
  pub id:             i64,
  pub chat_id:        i64,
  pub user:           String,
  pub kind:           String,
  pub amount_local:   String,
  pub amount_foreign: String,
  pub rate:           String,
  pub recorded_at:    i64,
}

/// Column list matching [`RawTransaction::from_row`].
pub const TRANSACTION_COLUMNS: &str =
  "id, chat_id, user, kind, amount_local, amount_foreign, rate, recorded_at";

impl RawTransaction {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      chat_id:        row.get(1)?,
      user:           row.get(2)?,
      kind:           row.get(3)?,
      amount_local:   row.get(4)?,
      amount_foreign: row.get(5)?,
      rate:           row.get(6)?,
      recorded_at:    row.get(7)?,
    })
  }

  pub fn into_transaction(self) -> Result<Transaction> {
    Ok(Transaction {
      id:             self.id,
      chat_id:        self.chat_id,
      user:           self.user,
      kind:           TxKind::from_str(&self.kind)?,
      amount_local:   decode_decimal(&self.amount_local)?,
      amount_foreign: decode_decimal(&self.amount_foreign)?,
      rate:           decode_decimal(&self.rate)?,
      recorded_at:    decode_dt(self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `chat_settings` row.
pub struct RawSettings {
  pub chat_id:       i64,
  pub exchange_rate: Option<String>,
  pub fee_rate:      Option<String>,
}

impl RawSettings {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      chat_id:       row.get(0)?,
      exchange_rate: row.get(1)?,
      fee_rate:      row.get(2)?,
    })
  }

  pub fn into_settings(self) -> Result<StoredSettings> {
    Ok(StoredSettings {
      chat_id:       self.chat_id,
      exchange_rate: self.exchange_rate.as_deref().map(decode_decimal).transpose()?,
      fee_rate:      self.fee_rate.as_deref().map(decode_decimal).transpose()?,
    })
  }
}

/// Raw values read directly from an `operators` row.
pub struct RawOperator {
  pub operator_id: i64,
  pub added_at:    i64,
}

impl RawOperator {
  pub fn into_operator(self) -> Result<Operator> {
    Ok(Operator {
      operator_id: self.operator_id,
      added_at:    decode_dt(self.added_at)?,
    })
  }
}
