//! The `LedgerStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-bot`, `tally-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  settings::{Operator, OperatorId, SettingsUpdate, StoredSettings},
  transaction::{ChatId, NewTransaction, Transaction},
};

/// Abstraction over a Tally ledger backend.
///
/// Transactions are append-only; the only removal is the chat-wide
/// [`clear_chat`](LedgerStore::clear_chat). Each method is atomic on its own.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Persist a transaction. The store assigns `id` and `recorded_at`.
  fn append(
    &self,
    input: NewTransaction,
  ) -> impl Future<Output = Result<Transaction, Self::Error>> + Send + '_;

  /// All of a chat's transactions with `from <= recorded_at < to`, in
  /// ascending id order.
  fn query_window(
    &self,
    chat_id: ChatId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Transaction>, Self::Error>> + Send + '_;

  /// The newest `limit` transactions of a chat regardless of time, returned
  /// in ascending id order.
  fn latest(
    &self,
    chat_id: ChatId,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Transaction>, Self::Error>> + Send + '_;

  /// Delete every transaction of a chat. Returns the number removed.
  fn clear_chat(
    &self,
    chat_id: ChatId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Distinct chats that currently hold at least one transaction.
  fn list_chats_with_transactions(
    &self,
  ) -> impl Future<Output = Result<Vec<ChatId>, Self::Error>> + Send + '_;

  // ── Settings ──────────────────────────────────────────────────────────

  /// The persisted settings row, or `None` if the chat never set anything.
  fn get_settings(
    &self,
    chat_id: ChatId,
  ) -> impl Future<Output = Result<Option<StoredSettings>, Self::Error>> + Send + '_;

  /// Set one column, creating the row if needed, and return the new row.
  fn update_settings(
    &self,
    chat_id: ChatId,
    update: SettingsUpdate,
  ) -> impl Future<Output = Result<StoredSettings, Self::Error>> + Send + '_;

  // ── Roster ────────────────────────────────────────────────────────────

  fn list_operators(
    &self,
  ) -> impl Future<Output = Result<Vec<Operator>, Self::Error>> + Send + '_;

  /// Returns `true` if the operator was not already present.
  fn add_operator(
    &self,
    operator_id: OperatorId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `true` if the operator was present.
  fn remove_operator(
    &self,
    operator_id: OperatorId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
