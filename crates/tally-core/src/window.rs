//! Business-day windows.
//!
//! A ledger day does not start at midnight: it starts at a fixed wall-clock
//! cutover in a named time zone and runs until the same wall-clock time on
//! the next local date. Timestamps are stored in UTC, so every boundary is
//! computed through the zone's rules rather than a fixed offset.

use chrono::{
  DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset as _,
  TimeDelta, TimeZone as _, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{Error, Result};

// ─── Window ──────────────────────────────────────────────────────────────────

/// A half-open interval `[from, to)` of one business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
  pub from:          DateTime<Utc>,
  pub to:            DateTime<Utc>,
  /// The local date on which the window opened.
  pub business_date: NaiveDate,
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Computes the current business day for a fixed cutover in a fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
  tz:      Tz,
  cutover: NaiveTime,
}

impl DayWindow {
  pub fn new(tz: Tz, cutover: NaiveTime) -> Self { Self { tz, cutover } }

  pub fn tz(&self) -> Tz { self.tz }

  pub fn cutover(&self) -> NaiveTime { self.cutover }

  /// The UTC instant of the cutover on local `date`.
  pub fn cutover_on(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
    resolve_local(self.tz, date.and_time(self.cutover))
  }

  /// The window that `now` falls into. A timestamp exactly at a cutover
  /// belongs to the window that cutover opens.
  pub fn window_containing(&self, now: DateTime<Utc>) -> Result<Window> {
    let (business_date, from) = latest_occurrence(self.tz, self.cutover, now)?;
    let next = business_date
      .succ_opt()
      .ok_or_else(|| Error::UnresolvableLocalTime(business_date.and_time(self.cutover)))?;
    let to = self.cutover_on(next)?;
    Ok(Window { from, to, business_date })
  }
}

// ─── Local time helpers ──────────────────────────────────────────────────────

/// The latest occurrence of local wall time `at` that is `<= now`, together
/// with the local date it occurs on.
pub(crate) fn latest_occurrence(
  tz: Tz,
  at: NaiveTime,
  now: DateTime<Utc>,
) -> Result<(NaiveDate, DateTime<Utc>)> {
  let today = now.with_timezone(&tz).date_naive();
  let instant = resolve_local(tz, today.and_time(at))?;
  if instant <= now {
    return Ok((today, instant));
  }
  let yesterday = today
    .pred_opt()
    .ok_or_else(|| Error::UnresolvableLocalTime(today.and_time(at)))?;
  Ok((yesterday, resolve_local(tz, yesterday.and_time(at))?))
}

/// Place a local wall time on the UTC time line.
///
/// An ambiguous time (clocks going back) resolves to its earlier instant.
/// A time inside a gap (clocks going forward) is shifted forward by the
/// length of the gap, using the offset in force before it.
pub(crate) fn resolve_local(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>> {
  match tz.from_local_datetime(&local) {
    LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Ok(t.with_timezone(&Utc)),
    LocalResult::None => {
      let probe = local
        .checked_sub_signed(TimeDelta::days(1))
        .ok_or(Error::UnresolvableLocalTime(local))?;
      let offset = tz.offset_from_utc_datetime(&probe).fix().local_minus_utc();
      local
        .checked_sub_signed(TimeDelta::seconds(i64::from(offset)))
        .map(|naive| naive.and_utc())
        .ok_or(Error::UnresolvableLocalTime(local))
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;
  use chrono_tz::{Asia::Kolkata, Europe::Berlin};

  use super::*;

  fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
  }

  fn six() -> NaiveTime { NaiveTime::from_hms_opt(6, 0, 0).unwrap() }

  #[test]
  fn window_after_cutover_opens_today() {
    let w = DayWindow::new(Kolkata, six());
    // 10:30 IST
    let win = w.window_containing(utc(2024, 3, 10, 5, 0, 0)).unwrap();
    assert_eq!(win.from, utc(2024, 3, 10, 0, 30, 0));
    assert_eq!(win.to, utc(2024, 3, 11, 0, 30, 0));
    assert_eq!(win.business_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
  }

  #[test]
  fn before_cutover_belongs_to_previous_day() {
    let w = DayWindow::new(Kolkata, six());
    // 05:59:59 IST
    let win = w.window_containing(utc(2024, 3, 10, 0, 29, 59)).unwrap();
    assert_eq!(win.business_date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    assert_eq!(win.to, utc(2024, 3, 10, 0, 30, 0));
  }

  #[test]
  fn cutover_instant_is_inclusive_lower_bound() {
    let w = DayWindow::new(Kolkata, six());
    let cut = utc(2024, 3, 10, 0, 30, 0);
    let win = w.window_containing(cut).unwrap();
    assert_eq!(win.from, cut);
    assert!(cut < win.to);

    let previous = w.window_containing(cut - TimeDelta::microseconds(1)).unwrap();
    assert_eq!(previous.to, cut);
  }

  #[test]
  fn window_follows_dst_transition() {
    let w = DayWindow::new(Berlin, six());
    // Day before the spring-forward switch: CET opens, CEST closes.
    let win = w.window_containing(utc(2024, 3, 30, 12, 0, 0)).unwrap();
    assert_eq!(win.from, utc(2024, 3, 30, 5, 0, 0));
    assert_eq!(win.to, utc(2024, 3, 31, 4, 0, 0));
    assert_eq!(win.to - win.from, TimeDelta::hours(23));
  }

  #[test]
  fn gap_time_is_shifted_forward() {
    let at = NaiveDate::from_ymd_opt(2024, 3, 31)
      .unwrap()
      .and_hms_opt(2, 30, 0)
      .unwrap();
    // 02:30 does not exist; it becomes 03:30 CEST.
    assert_eq!(resolve_local(Berlin, at).unwrap(), utc(2024, 3, 31, 1, 30, 0));
  }

  #[test]
  fn ambiguous_time_takes_earliest() {
    let at = NaiveDate::from_ymd_opt(2024, 10, 27)
      .unwrap()
      .and_hms_opt(2, 30, 0)
      .unwrap();
    assert_eq!(resolve_local(Berlin, at).unwrap(), utc(2024, 10, 27, 0, 30, 0));
  }
}
