//! The end-of-day clear.

use serde::Serialize;
use tracing::{error, info};

use tally_core::{store::LedgerStore, transaction::ChatId};

use crate::{Error, Ledger, Result};

const NOTICE_TEXT: &str = "New day started, the bill has been cleared";

/// A message for one chat whose ledger was cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatNotice {
  pub chat_id: ChatId,
  pub cleared: u64,
  pub text:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolloverReport {
  pub notices: Vec<ChatNotice>,
  /// Chats whose clear failed. They keep their rows until the next run.
  pub failed:  Vec<ChatId>,
}

impl<S: LedgerStore> Ledger<S> {
  /// Clear every chat that has rows. A failing chat is logged and skipped;
  /// the rest are still cleared.
  pub async fn rollover(&self) -> Result<RolloverReport> {
    let chats = match self.store.list_chats_with_transactions().await {
      Ok(chats) => chats,
      Err(e) => {
        error!(error = %e, "rollover could not list chats");
        return Err(Error::storage(e));
      }
    };

    let mut report = RolloverReport::default();
    for chat_id in chats {
      match self.store.clear_chat(chat_id).await {
        Ok(cleared) => {
          info!(chat_id, cleared, "day rolled over");
          report.notices.push(ChatNotice { chat_id, cleared, text: NOTICE_TEXT.into() });
        }
        Err(e) => {
          error!(chat_id, error = %e, "rollover failed for chat");
          report.failed.push(chat_id);
        }
      }
    }
    Ok(report)
  }

  /// Entry point for the daily timer.
  pub async fn handle_scheduled_rollover(&self) -> Result<RolloverReport> {
    let report = self.rollover().await?;
    info!(
      cleared_chats = report.notices.len(),
      failed_chats = report.failed.len(),
      "scheduled rollover finished"
    );
    Ok(report)
  }
}
