//! The daily rollover schedule.
//!
//! Kept pure: callers pass in "now" and the instant of the last rollover, and
//! get back whether a scheduled instant has passed since. The timer that
//! drives it lives in the server.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::{
  Error, Result,
  window::{latest_occurrence, resolve_local},
};

/// Fires once a day at local wall time `at` in zone `tz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloverSchedule {
  tz: Tz,
  at: NaiveTime,
}

impl RolloverSchedule {
  pub fn new(tz: Tz, at: NaiveTime) -> Self { Self { tz, at } }

  /// The most recent scheduled instant that is `<= now`.
  pub fn latest_at_or_before(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Ok(latest_occurrence(self.tz, self.at, now)?.1)
  }

  /// The first scheduled instant strictly after `now`.
  pub fn next_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let (date, _) = latest_occurrence(self.tz, self.at, now)?;
    let next = date
      .succ_opt()
      .ok_or_else(|| Error::UnresolvableLocalTime(date.and_time(self.at)))?;
    resolve_local(self.tz, next.and_time(self.at))
  }

  /// Whether a scheduled instant lies in `(last_fired, now]`.
  pub fn should_fire(
    &self,
    now: DateTime<Utc>,
    last_fired: DateTime<Utc>,
  ) -> Result<bool> {
    Ok(self.latest_at_or_before(now)? > last_fired)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};
  use chrono_tz::Asia::Kolkata;

  use super::*;

  fn schedule() -> RolloverSchedule {
    RolloverSchedule::new(Kolkata, NaiveTime::from_hms_opt(6, 0, 0).unwrap())
  }

  // 06:00 IST on 2024-03-10.
  fn fire_at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap() }

  #[test]
  fn next_after_is_strictly_later() {
    let s = schedule();
    assert_eq!(s.next_after(fire_at() - TimeDelta::seconds(1)).unwrap(), fire_at());
    assert_eq!(s.next_after(fire_at()).unwrap(), fire_at() + TimeDelta::days(1));
  }

  #[test]
  fn fires_once_per_scheduled_instant() {
    let s = schedule();
    let last = fire_at() - TimeDelta::hours(3);

    assert!(!s.should_fire(fire_at() - TimeDelta::seconds(1), last).unwrap());
    assert!(s.should_fire(fire_at(), last).unwrap());
    // Having fired at the instant, the rest of the day stays quiet.
    assert!(!s.should_fire(fire_at() + TimeDelta::hours(20), fire_at()).unwrap());
    assert!(s.should_fire(fire_at() + TimeDelta::days(1), fire_at()).unwrap());
  }

  #[test]
  fn missed_instants_collapse_into_one_firing() {
    let s = schedule();
    let last = fire_at() - TimeDelta::days(3);
    assert!(s.should_fire(fire_at(), last).unwrap());
    assert_eq!(s.latest_at_or_before(fire_at() + TimeDelta::hours(1)).unwrap(), fire_at());
  }
}
