//! Aggregation over one business-day window.
//!
//! Everything here is plain exact summation. Rounding only happens when a
//! report is rendered.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  transaction::{NewTransaction, Transaction, TxKind},
  window::Window,
};

// ─── Amounts ─────────────────────────────────────────────────────────────────

/// A pair of sums, one per currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Amounts {
  pub local:   Decimal,
  pub foreign: Decimal,
}

impl Amounts {
  pub fn checked_add(self, rhs: Amounts) -> Result<Amounts> {
    Ok(Amounts {
      local:   sum(self.local, rhs.local)?,
      foreign: sum(self.foreign, rhs.foreign)?,
    })
  }

  pub fn checked_sub(self, rhs: Amounts) -> Result<Amounts> {
    Ok(Amounts {
      local:   difference(self.local, rhs.local)?,
      foreign: difference(self.foreign, rhs.foreign)?,
    })
  }
}

fn sum(a: Decimal, b: Decimal) -> Result<Decimal> {
  a.checked_add(b).ok_or_else(|| Error::Overflow(format!("{a} + {b}")))
}

fn difference(a: Decimal, b: Decimal) -> Result<Decimal> {
  a.checked_sub(b).ok_or_else(|| Error::Overflow(format!("{a} - {b}")))
}

// ─── Totals ──────────────────────────────────────────────────────────────────

/// Counts and sums for a window. Negative entries are included as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
  pub income_count: usize,
  pub payout_count: usize,
  pub income:       Amounts,
  pub payout:       Amounts,
  /// Collected but not yet disbursed: `income - payout`.
  pub outstanding:  Amounts,
}

impl Totals {
  /// Fails with [`Error::Overflow`] when a sum leaves the `Decimal` range.
  pub fn compute(incomes: &[Transaction], payouts: &[Transaction]) -> Result<Self> {
    let mut totals = Totals::default();
    for tx in incomes.iter().chain(payouts) {
      totals = totals.add(tx.kind, tx.amount_local, tx.amount_foreign)?;
    }
    Ok(totals)
  }

  /// The totals once `tx` is recorded as well.
  pub fn including(&self, tx: &NewTransaction) -> Result<Self> {
    self.add(tx.kind, tx.amount_local, tx.amount_foreign)
  }

  fn add(&self, kind: TxKind, local: Decimal, foreign: Decimal) -> Result<Self> {
    let entry = Amounts { local, foreign };
    let mut next = *self;
    match kind {
      TxKind::Income => {
        next.income_count += 1;
        next.income = next.income.checked_add(entry)?;
      }
      TxKind::Payout => {
        next.payout_count += 1;
        next.payout = next.payout.checked_add(entry)?;
      }
    }
    next.outstanding = next.income.checked_sub(next.payout)?;
    Ok(next)
  }
}

// ─── Day summary ─────────────────────────────────────────────────────────────

/// A window's rows split by kind, in ascending id order, plus their totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
  pub window:  Window,
  pub incomes: Vec<Transaction>,
  pub payouts: Vec<Transaction>,
  pub totals:  Totals,
}

impl DaySummary {
  pub fn from_window(window: Window, rows: Vec<Transaction>) -> Result<Self> {
    let (incomes, payouts): (Vec<_>, Vec<_>) =
      rows.into_iter().partition(|tx| tx.kind == TxKind::Income);
    let totals = Totals::compute(&incomes, &payouts)?;
    Ok(Self { window, incomes, payouts, totals })
  }

  /// All rows of the window, merged back into id order.
  pub fn chronological(&self) -> Vec<&Transaction> {
    let mut all: Vec<&Transaction> =
      self.incomes.iter().chain(self.payouts.iter()).collect();
    all.sort_by_key(|tx| tx.id);
    all
  }
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// Which total the "already issued" and "should be issued" report lines show.
/// One deployment-wide choice; "not yet issued" is always the outstanding
/// balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMapping {
  /// Already issued = payouts, should be issued = incomes.
  #[default]
  PayoutIssued,
  /// Already issued = incomes, should be issued = payouts.
  IncomeIssued,
}

impl LabelMapping {
  pub fn already_issued(&self, totals: &Totals) -> Amounts {
    match self {
      Self::PayoutIssued => totals.payout,
      Self::IncomeIssued => totals.income,
    }
  }

  pub fn should_be_issued(&self, totals: &Totals) -> Amounts {
    match self {
      Self::PayoutIssued => totals.income,
      Self::IncomeIssued => totals.payout,
    }
  }
}
