//! Error types for `tally-core`.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("exchange rate must be positive, got {0}")]
  NonPositiveRate(Decimal),

  #[error("amount out of range: {0}")]
  Overflow(String),

  #[error("unknown transaction kind: {0:?}")]
  UnknownKind(String),

  #[error("local time {0} cannot be placed on the time line")]
  UnresolvableLocalTime(NaiveDateTime),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
