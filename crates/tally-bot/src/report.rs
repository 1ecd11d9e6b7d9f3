//! Plain-text rendering of a [`DaySummary`].
//!
//! Two views share the same totals block: the compact view sent after every
//! transaction, and the full report offered as a downloadable file.

use chrono::SecondsFormat;
use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use tally_core::{
  settings::ChatSettings,
  summary::{Amounts, DaySummary, LabelMapping},
  transaction::{ChatId, Transaction},
};

const INTEGER_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Presentation knobs shared by both views.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
  /// How many of the latest incomes and payouts the compact view lists.
  pub recent_entries: usize,
  pub labels:         LabelMapping,
  pub local_code:     String,
  pub foreign_code:   String,
  /// Appended to every foreign amount.
  pub foreign_suffix: String,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      recent_entries: 5,
      labels:         LabelMapping::default(),
      local_code:     "INR".into(),
      foreign_code:   "USD".into(),
      foreign_suffix: "U".into(),
    }
  }
}

// ─── Numbers ─────────────────────────────────────────────────────────────────

/// A bare integer when the value is within `1e-6` of one, else two decimals.
pub fn format_local(value: Decimal) -> String {
  let whole = value.round();
  if (value - whole).abs() < INTEGER_EPSILON {
    if whole.is_zero() { "0".into() } else { whole.to_string() }
  } else {
    two_places(value)
  }
}

pub fn format_foreign(value: Decimal, suffix: &str) -> String {
  format!("{}{suffix}", two_places(value))
}

/// Rates and fees without trailing zeros.
pub fn format_rate(value: Decimal) -> String { value.normalize().to_string() }

fn two_places(value: Decimal) -> String {
  let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
  if rounded.is_zero() { "0.00".into() } else { format!("{rounded:.2}") }
}

// ─── Lines ───────────────────────────────────────────────────────────────────

fn local_time(tx: &Transaction, tz: Tz) -> String {
  tx.recorded_at.with_timezone(&tz).format("%H:%M:%S").to_string()
}

fn income_line(tx: &Transaction, tz: Tz, opts: &RenderOptions) -> String {
  format!(
    "{}   {} / {} = {}   {}",
    local_time(tx, tz),
    format_local(tx.amount_local),
    format_rate(tx.rate),
    format_foreign(tx.amount_foreign, &opts.foreign_suffix),
    tx.user,
  )
}

fn payout_line(tx: &Transaction, tz: Tz, opts: &RenderOptions) -> String {
  format!(
    "{}   {} ({})   {}",
    local_time(tx, tz),
    format_foreign(tx.amount_foreign, &opts.foreign_suffix),
    format_local(tx.amount_local),
    tx.user,
  )
}

fn push_section(out: &mut Vec<String>, title: &str, total: usize, lines: Vec<String>) {
  out.push(format!("{title} ({total})"));
  if lines.is_empty() {
    out.push("None".into());
  } else {
    out.extend(lines);
  }
}

fn push_totals(
  out: &mut Vec<String>,
  summary: &DaySummary,
  settings: &ChatSettings,
  opts: &RenderOptions,
) {
  let totals = &summary.totals;
  let pair = |a: Amounts| {
    format!("{} | {}", format_local(a.local), format_foreign(a.foreign, &opts.foreign_suffix))
  };

  out.push(format!("Total Income : {}", format_local(totals.income.local)));
  out.push(format!("Exchange Rate : {}", format_rate(settings.exchange_rate)));
  out.push(format!("Fee Rate : {}%", format_rate(settings.fee_rate)));
  out.push(String::new());
  out.push(format!("Already issued : {}", pair(opts.labels.already_issued(totals))));
  out.push(format!("Should be issued : {}", pair(opts.labels.should_be_issued(totals))));
  out.push(format!("Not yet issued : {}", pair(totals.outstanding)));
}

fn tail(rows: &[Transaction], n: usize) -> &[Transaction] {
  &rows[rows.len().saturating_sub(n)..]
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// The short view: the latest few rows of each kind plus window totals.
pub fn compact(
  summary: &DaySummary,
  settings: &ChatSettings,
  tz: Tz,
  opts: &RenderOptions,
) -> String {
  let n = opts.recent_entries;
  let mut out = Vec::new();

  let incomes = tail(&summary.incomes, n).iter().map(|tx| income_line(tx, tz, opts)).collect();
  push_section(&mut out, "Today's Income", summary.totals.income_count, incomes);
  out.push(String::new());

  let payouts = tail(&summary.payouts, n).iter().map(|tx| payout_line(tx, tz, opts)).collect();
  push_section(&mut out, "Today's Issued", summary.totals.payout_count, payouts);
  out.push(String::new());

  push_totals(&mut out, summary, settings, opts);
  out.push(String::new());
  out.push("Use /viewfull to download full report".into());

  out.join("\n")
}

/// Every row of the window, the totals block and a chronological audit
/// listing with UTC timestamps.
pub fn full(
  chat_id: ChatId,
  summary: &DaySummary,
  settings: &ChatSettings,
  tz: Tz,
  opts: &RenderOptions,
) -> String {
  let mut out = vec![
    format!("Full report for chat_id={chat_id} date={}", summary.window.business_date),
    "=".repeat(40),
    String::new(),
  ];

  let incomes = summary.incomes.iter().map(|tx| income_line(tx, tz, opts)).collect();
  push_section(&mut out, "Today's Income", summary.totals.income_count, incomes);
  out.push(String::new());

  let payouts = summary.payouts.iter().map(|tx| payout_line(tx, tz, opts)).collect();
  push_section(&mut out, "Today's Issued", summary.totals.payout_count, payouts);
  out.push(String::new());

  push_totals(&mut out, summary, settings, opts);
  out.push(String::new());
  out.push("All transactions (chronological):".into());
  out.push(String::new());

  for tx in summary.chronological() {
    out.push(format!(
      "{} | type={} | {}={} | {}={} | rate={} | user={}",
      tx.recorded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
      tx.kind,
      opts.local_code,
      format_local(tx.amount_local),
      opts.foreign_code,
      two_places(tx.amount_foreign),
      format_rate(tx.rate),
      tx.user,
    ));
  }

  let mut text = out.join("\n");
  text.push('\n');
  text
}
