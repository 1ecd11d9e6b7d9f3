//! The daily rollover timer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_bot::{Ledger, RolloverReport};
use tally_core::{clock::Clock, schedule::RolloverSchedule, store::LedgerStore};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::notices::NoticeOutbox;

pub struct Scheduler<S> {
  ledger:     Arc<Ledger<S>>,
  schedule:   RolloverSchedule,
  outbox:     Arc<NoticeOutbox>,
  last_fired: DateTime<Utc>,
}

impl<S: LedgerStore + 'static> Scheduler<S> {
  /// A scheduler that treats the most recent scheduled instant before `now`
  /// as already handled. Notices of each run are queued on `outbox`.
  pub fn new(
    ledger: Arc<Ledger<S>>,
    schedule: RolloverSchedule,
    outbox: Arc<NoticeOutbox>,
    now: DateTime<Utc>,
  ) -> tally_core::Result<Self> {
    let last_fired = schedule.latest_at_or_before(now)?;
    Ok(Self { ledger, schedule, outbox, last_fired })
  }

  /// Run the rollover if a scheduled instant has passed since the last run.
  pub async fn tick(&mut self, now: DateTime<Utc>) -> tally_bot::Result<Option<RolloverReport>> {
    if !self.schedule.should_fire(now, self.last_fired)? {
      return Ok(None);
    }
    let report = self.ledger.handle_scheduled_rollover().await?;
    self.last_fired = self.schedule.latest_at_or_before(now)?;

    for notice in &report.notices {
      info!(chat_id = notice.chat_id, text = %notice.text, "rollover notice queued");
    }
    self.outbox.push(report.notices.iter().cloned()).await;
    Ok(Some(report))
  }

  /// Sleep until each scheduled instant and tick. Runs until the task is
  /// aborted or the schedule cannot be resolved.
  pub async fn run(mut self, clock: Arc<dyn Clock>) {
    loop {
      let now = clock.now();
      let next = match self.schedule.next_after(now) {
        Ok(next) => next,
        Err(e) => {
          error!(error = %e, "cannot compute next rollover; scheduler stopped");
          return;
        }
      };
      info!(%next, "next rollover scheduled");
      tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

      // A failed rollover is retried at the next scheduled instant.
      if let Err(e) = self.tick(clock.now()).await {
        error!(error = %e, "rollover tick failed");
        if let Ok(latest) = self.schedule.latest_at_or_before(clock.now()) {
          self.last_fired = latest;
        }
      }
    }
  }

  pub fn spawn(self, clock: Arc<dyn Clock>) -> JoinHandle<()> { tokio::spawn(self.run(clock)) }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveTime, TimeDelta, TimeZone};
  use chrono_tz::Asia::Kolkata;
  use tally_bot::{LedgerConfig, SettingsCache};
  use tally_core::{clock::ManualClock, settings::SettingsDefaults, window::DayWindow};
  use tally_store_sqlite::SqliteStore;

  use super::*;

  fn six() -> NaiveTime { NaiveTime::from_hms_opt(6, 0, 0).unwrap() }

  /// 06:00 IST on 2024-03-10.
  fn fire_at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap() }

  async fn ledger(clock: Arc<ManualClock>) -> Arc<Ledger<SqliteStore>> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap().with_clock(clock.clone()));
    let cache = SettingsCache::new(store.clone(), SettingsDefaults::default(), [1]);
    let config = LedgerConfig::new(DayWindow::new(Kolkata, six()));
    Arc::new(Ledger::new(store, cache, clock, config))
  }

  #[tokio::test]
  async fn ticks_once_per_scheduled_instant() {
    let before = fire_at() - TimeDelta::minutes(1);
    let clock = Arc::new(ManualClock::new(before));
    let ledger = ledger(clock.clone()).await;
    ledger.handle_command(7, 1, "ana", "+50").await.unwrap();

    let outbox = Arc::new(NoticeOutbox::default());
    let mut scheduler = Scheduler::new(
      ledger.clone(),
      RolloverSchedule::new(Kolkata, six()),
      outbox.clone(),
      before,
    )
    .unwrap();

    assert!(scheduler.tick(before).await.unwrap().is_none());
    assert!(outbox.drain().await.is_empty());

    let report = scheduler.tick(fire_at()).await.unwrap().unwrap();
    assert_eq!(report.notices.len(), 1);
    assert_eq!(report.notices[0].chat_id, 7);
    assert_eq!(outbox.drain().await, report.notices);

    assert!(scheduler.tick(fire_at() + TimeDelta::hours(3)).await.unwrap().is_none());

    let next_day = fire_at() + TimeDelta::days(1);
    let report = scheduler.tick(next_day).await.unwrap().unwrap();
    assert!(report.notices.is_empty());
  }

  #[tokio::test]
  async fn startup_does_not_fire_for_a_past_instant() {
    let after = fire_at() + TimeDelta::minutes(5);
    let clock = Arc::new(ManualClock::new(after));
    let ledger = ledger(clock).await;

    let outbox = Arc::new(NoticeOutbox::default());
    let mut scheduler =
      Scheduler::new(ledger, RolloverSchedule::new(Kolkata, six()), outbox, after).unwrap();
    assert!(scheduler.tick(after).await.unwrap().is_none());
  }
}
