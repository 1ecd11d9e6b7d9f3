//! Rollover notices waiting for a chat transport to deliver them.
//!
//! The timer-driven rollover has no caller to answer, so its notices are
//! queued here and handed out by `POST /notices/drain`.

use std::collections::VecDeque;

use tally_bot::ChatNotice;
use tokio::sync::Mutex;
use tracing::warn;

pub struct NoticeOutbox {
  pending:  Mutex<VecDeque<ChatNotice>>,
  capacity: usize,
}

impl NoticeOutbox {
  pub fn new(capacity: usize) -> Self {
    Self { pending: Mutex::new(VecDeque::new()), capacity: capacity.max(1) }
  }

  /// Queue `notices`. When full, the oldest pending notice is dropped.
  pub async fn push(&self, notices: impl IntoIterator<Item = ChatNotice>) {
    let mut pending = self.pending.lock().await;
    for notice in notices {
      if pending.len() == self.capacity
        && let Some(dropped) = pending.pop_front()
      {
        warn!(chat_id = dropped.chat_id, "notice outbox full; dropped oldest notice");
      }
      pending.push_back(notice);
    }
  }

  /// Everything queued so far, oldest first. The outbox is left empty.
  pub async fn drain(&self) -> Vec<ChatNotice> {
    self.pending.lock().await.drain(..).collect()
  }
}

impl Default for NoticeOutbox {
  fn default() -> Self { Self::new(1024) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn notice(chat_id: i64) -> ChatNotice {
    ChatNotice { chat_id, cleared: 1, text: "cleared".into() }
  }

  #[tokio::test]
  async fn drain_empties_in_order() {
    let outbox = NoticeOutbox::default();
    outbox.push([notice(1), notice(2)]).await;
    outbox.push([notice(3)]).await;

    let ids: Vec<_> = outbox.drain().await.iter().map(|n| n.chat_id).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert!(outbox.drain().await.is_empty());
  }

  #[tokio::test]
  async fn full_outbox_drops_the_oldest() {
    let outbox = NoticeOutbox::new(2);
    outbox.push([notice(1), notice(2), notice(3)]).await;

    let ids: Vec<_> = outbox.drain().await.iter().map(|n| n.chat_id).collect();
    assert_eq!(ids, [2, 3]);
  }
}
