//! [`Ledger`]: turns one chat line into at most one reply.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};

use tally_command::{Command, Grammar, SlashCommand, parse};
use tally_core::{
  clock::Clock,
  settings::{OperatorId, SettingsUpdate},
  store::LedgerStore,
  summary::DaySummary,
  transaction::{ChatId, NewTransaction},
  window::DayWindow,
};

use crate::{
  Error, Result,
  cache::{RemoveOutcome, SettingsCache},
  report::{self, RenderOptions},
};

const START_TEXT: &str = "✅ Bot ready. Use + / - / T for transactions. \
                          /summary for quick view. /viewfull to download full report.";
const DENIED_TEXT: &str = "❌ You are not authorized.";
const CLEARED_TEXT: &str = "Today's bill has been cleared and recording can be restarted";
const OUT_OF_RANGE_TEXT: &str = "⚠️ Amount is out of range.";
const NO_ROWS_TEXT: &str = "No transactions found for this chat_id.";
const DEFAULT_USER_NAME: &str = "user";

// ─── Replies ─────────────────────────────────────────────────────────────────

/// A rendered file for the transport to deliver as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  pub filename: String,
  pub body:     Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
  Text(String),
  /// The compact view. Transports may attach a "full report" affordance.
  Summary(String),
  Document(Report),
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LedgerConfig {
  pub window:     DayWindow,
  pub grammar:    Grammar,
  pub render:     RenderOptions,
  /// Rows shown by `/dbpeek`.
  pub peek_limit: usize,
}

impl LedgerConfig {
  pub fn new(window: DayWindow) -> Self {
    Self {
      window,
      grammar: Grammar::default(),
      render: RenderOptions::default(),
      peek_limit: 20,
    }
  }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

pub struct Ledger<S> {
  pub(crate) store:  Arc<S>,
  pub(crate) cache:  SettingsCache<S>,
  pub(crate) clock:  Arc<dyn Clock>,
  pub(crate) config: LedgerConfig,
}

impl<S: LedgerStore> Ledger<S> {
  pub fn new(
    store: Arc<S>,
    cache: SettingsCache<S>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
  ) -> Self {
    Self { store, cache, clock, config }
  }

  /// Handle one chat line. `Ok(None)` means the line gets no reply.
  pub async fn handle_command(
    &self,
    chat_id: ChatId,
    user_id: OperatorId,
    user_name: &str,
    text: &str,
  ) -> Result<Option<Reply>> {
    match self.dispatch(chat_id, user_id, user_name, text).await {
      Err(Error::Core(e @ tally_core::Error::Overflow(_))) => Ok(Some(out_of_range(chat_id, e))),
      Err(e) => {
        error!(chat_id, user_id, error = %e, "command failed");
        Err(e)
      }
      ok => ok,
    }
  }

  /// The full report as a file, or `None` for a caller without access.
  pub async fn handle_full_report_request(
    &self,
    chat_id: ChatId,
    user_id: OperatorId,
  ) -> Result<Option<Report>> {
    if !self.authorized(user_id).await? {
      return Ok(None);
    }
    let result = self.full_report(chat_id).await;
    if let Err(e) = &result {
      error!(chat_id, user_id, error = %e, "full report failed");
    }
    result.map(Some)
  }

  async fn dispatch(
    &self,
    chat_id: ChatId,
    user_id: OperatorId,
    user_name: &str,
    text: &str,
  ) -> Result<Option<Reply>> {
    let command = match parse(text, &self.config.grammar) {
      Ok(command) => command,
      Err(e) => {
        if !self.authorized(user_id).await? {
          return Ok(None);
        }
        warn!(chat_id, user_id, error = %e, "rejected command");
        return Ok(Some(Reply::Text(e.hint().to_owned())));
      }
    };

    match command {
      Command::Unrecognized | Command::Ignored => return Ok(None),
      Command::Slash(SlashCommand::Start) => return Ok(Some(Reply::Text(START_TEXT.into()))),
      Command::Slash(SlashCommand::WhoAmI) => {
        return Ok(Some(Reply::Text(format!(
          "Your user_id: {user_id}\nchat_id: {chat_id}\nname: {}",
          display_name(user_name),
        ))));
      }
      _ => {}
    }

    if !self.authorized(user_id).await? {
      return Ok(match command {
        Command::Slash(SlashCommand::Clear) => Some(Reply::Text(DENIED_TEXT.into())),
        _ => None,
      });
    }

    let user = display_name(user_name);
    let reply = match command {
      Command::Income(amount) | Command::NegativeIncome(amount) => {
        let rate = self.cache.settings(chat_id).await.map_err(Error::storage)?.exchange_rate;
        match NewTransaction::income(chat_id, user, amount, rate) {
          Ok(input) => self.record(input).await?,
          Err(e) => out_of_range(chat_id, e),
        }
      }
      Command::Payout(amount) => {
        let rate = self.cache.settings(chat_id).await.map_err(Error::storage)?.exchange_rate;
        match NewTransaction::payout(chat_id, user, amount, rate) {
          Ok(input) => self.record(input).await?,
          Err(e) => out_of_range(chat_id, e),
        }
      }
      Command::SetExchangeRate(rate) => {
        self
          .cache
          .update(chat_id, SettingsUpdate::ExchangeRate(rate))
          .await
          .map_err(Error::storage)?;
        info!(chat_id, user_id, %rate, "exchange rate set");
        Reply::Text(format!("Exchange rate set: {}", report::format_rate(rate)))
      }
      Command::SetFeeRate(fee) => {
        self
          .cache
          .update(chat_id, SettingsUpdate::FeeRate(fee))
          .await
          .map_err(Error::storage)?;
        info!(chat_id, user_id, %fee, "fee rate set");
        Reply::Text(format!("Fee rate set: {}%", report::format_rate(fee)))
      }
      Command::Clear | Command::Slash(SlashCommand::Clear) => {
        let removed = self.store.clear_chat(chat_id).await.map_err(Error::storage)?;
        info!(chat_id, user_id, removed, "chat cleared");
        Reply::Text(CLEARED_TEXT.into())
      }
      Command::AddOperator(id) => {
        self.cache.add_operator(id).await.map_err(Error::storage)?;
        info!(user_id, operator_id = id, "operator added");
        Reply::Text(format!("✅ Added operator with ID: {id}"))
      }
      Command::RemoveOperator(id) => {
        match self.cache.remove_operator(id).await.map_err(Error::storage)? {
          RemoveOutcome::BuiltIn => {
            warn!(user_id, operator_id = id, "refused to remove built-in operator");
            Reply::Text(format!("⚠️ Operator {id} is built in and cannot be removed"))
          }
          RemoveOutcome::Removed | RemoveOutcome::NotPresent => {
            info!(user_id, operator_id = id, "operator removed");
            Reply::Text(format!("❌ Removed operator with ID: {id}"))
          }
        }
      }
      Command::Slash(SlashCommand::Summary) => Reply::Summary(self.compact_view(chat_id).await?),
      Command::Slash(SlashCommand::ViewFull) => Reply::Document(self.full_report(chat_id).await?),
      Command::Slash(SlashCommand::DbPeek) => Reply::Text(self.peek(chat_id).await?),
      Command::Slash(SlashCommand::Start | SlashCommand::WhoAmI)
      | Command::Unrecognized
      | Command::Ignored => return Ok(None),
    };

    Ok(Some(reply))
  }

  async fn authorized(&self, user_id: OperatorId) -> Result<bool> {
    self.cache.is_authorized(user_id).await.map_err(Error::storage)
  }

  /// Appends `input` unless the window's totals could no longer be summed
  /// with it.
  async fn record(&self, input: NewTransaction) -> Result<Reply> {
    let chat_id = input.chat_id;
    if let Err(e) = self.day_summary(chat_id).await?.totals.including(&input) {
      return Ok(out_of_range(chat_id, e));
    }
    let tx = self.store.append(input).await.map_err(Error::storage)?;
    info!(
      chat_id,
      id = tx.id,
      kind = %tx.kind,
      local = %tx.amount_local,
      foreign = %tx.amount_foreign,
      "transaction recorded"
    );
    Ok(Reply::Summary(self.compact_view(chat_id).await?))
  }

  // ── Views ─────────────────────────────────────────────────────────────────

  /// Everything recorded for `chat_id` in the window containing now.
  pub async fn day_summary(&self, chat_id: ChatId) -> Result<DaySummary> {
    let window = self.config.window.window_containing(self.clock.now())?;
    let rows = self
      .store
      .query_window(chat_id, window.from, window.to)
      .await
      .map_err(Error::storage)?;
    Ok(DaySummary::from_window(window, rows)?)
  }

  pub async fn compact_view(&self, chat_id: ChatId) -> Result<String> {
    let summary = self.day_summary(chat_id).await?;
    let settings = self.cache.settings(chat_id).await.map_err(Error::storage)?;
    Ok(report::compact(&summary, &settings, self.config.window.tz(), &self.config.render))
  }

  pub async fn full_report(&self, chat_id: ChatId) -> Result<Report> {
    let summary = self.day_summary(chat_id).await?;
    let settings = self.cache.settings(chat_id).await.map_err(Error::storage)?;
    let text = report::full(
      chat_id,
      &summary,
      &settings,
      self.config.window.tz(),
      &self.config.render,
    );
    Ok(Report {
      filename: format!("report_{chat_id}_{}.txt", summary.window.business_date),
      body:     Bytes::from(text),
    })
  }

  async fn peek(&self, chat_id: ChatId) -> Result<String> {
    let rows = self
      .store
      .latest(chat_id, self.config.peek_limit)
      .await
      .map_err(Error::storage)?;
    if rows.is_empty() {
      return Ok(NO_ROWS_TEXT.into());
    }

    let render = &self.config.render;
    let mut lines = vec!["Last transactions for this chat:".to_owned()];
    lines.extend(rows.iter().map(|tx| {
      format!(
        "{} | {} | {}={} | {}={} | {}",
        tx.recorded_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        tx.kind,
        render.local_code,
        report::format_local(tx.amount_local),
        render.foreign_code,
        report::format_foreign(tx.amount_foreign, ""),
        tx.user,
      )
    }));
    Ok(lines.join("\n"))
  }
}

fn display_name(user_name: &str) -> &str {
  let trimmed = user_name.trim();
  if trimmed.is_empty() { DEFAULT_USER_NAME } else { trimmed }
}

fn out_of_range(chat_id: ChatId, e: tally_core::Error) -> Reply {
  warn!(chat_id, error = %e, "amount cannot be converted");
  Reply::Text(OUT_OF_RANGE_TEXT.into())
}
