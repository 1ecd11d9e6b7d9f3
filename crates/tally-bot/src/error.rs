//! Error type for `tally-bot`.
//!
//! Malformed commands are not errors here: they become hint replies. What
//! remains is storage failure and the rare arithmetic or time-zone failure
//! from the core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("core error: {0}")]
  Core(#[from] tally_core::Error),
}

impl Error {
  pub(crate) fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
