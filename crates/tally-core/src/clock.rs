//! Time sources. Stores and handlers read "now" through [`Clock`] so tests
//! can pin the time line.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to. Microsecond resolution.
#[derive(Debug)]
pub struct ManualClock {
  micros: AtomicI64,
}

impl ManualClock {
  pub fn new(at: DateTime<Utc>) -> Self {
    Self { micros: AtomicI64::new(at.timestamp_micros()) }
  }

  pub fn set(&self, at: DateTime<Utc>) {
    self.micros.store(at.timestamp_micros(), Ordering::SeqCst);
  }

  pub fn advance(&self, by: TimeDelta) {
    let step = by.num_microseconds().unwrap_or(i64::MAX);
    self.micros.fetch_add(step, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst))
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn manual_clock_moves_only_when_told() {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    assert_eq!(clock.now(), start);

    clock.advance(TimeDelta::minutes(90));
    assert_eq!(clock.now(), start + TimeDelta::minutes(90));

    clock.set(start);
    assert_eq!(clock.now(), start);
  }
}
