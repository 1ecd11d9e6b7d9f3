//! The Tally command engine.
//!
//! [`Ledger`] is the single entry point used by a transport layer: it takes
//! raw chat lines, checks the operator roster, records transactions through
//! any [`tally_core::store::LedgerStore`] and answers with rendered reports.
//! Delivering those replies is the caller's responsibility.

pub mod cache;
pub mod error;
pub mod ledger;
pub mod report;
pub mod rollover;

pub use cache::{RemoveOutcome, SettingsCache};
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerConfig, Reply, Report};
pub use report::RenderOptions;
pub use rollover::{ChatNotice, RolloverReport};
