//! [`SqliteStore`], the SQLite implementation of [`LedgerStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use tally_core::{
  clock::{Clock, SystemClock},
  settings::{Operator, OperatorId, SettingsUpdate, StoredSettings},
  store::LedgerStore,
  transaction::{ChatId, NewTransaction, Transaction},
};

use crate::{
  Result,
  encode::{
    RawOperator, RawSettings, RawTransaction, TRANSACTION_COLUMNS, encode_decimal,
    encode_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally ledger backed by a single SQLite file.
///
/// Cloning shares the inner reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  clock: Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, clock: Arc::new(SystemClock) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, clock: Arc::new(SystemClock) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the clock used to stamp new rows.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = crate::Error;

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn append(&self, input: NewTransaction) -> Result<Transaction> {
    let user           = input.user.clone();
    let kind_str       = input.kind.as_str();
    let local_str      = encode_decimal(input.amount_local);
    let foreign_str    = encode_decimal(input.amount_foreign);
    let rate_str       = encode_decimal(input.rate);
    let clock          = Arc::clone(&self.clock);

    // The timestamp is taken on the connection thread so that id order and
    // time order agree.
    let (id, recorded_at): (i64, DateTime<Utc>) = self
      .conn
      .call(move |conn| {
        let recorded_at = clock.now();
        conn.execute(
          "INSERT INTO transactions (
             chat_id, user, kind, amount_local, amount_foreign, rate, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            input.chat_id,
            user,
            kind_str,
            local_str,
            foreign_str,
            rate_str,
            encode_dt(recorded_at),
          ],
        )?;
        Ok((conn.last_insert_rowid(), recorded_at))
      })
      .await?;

    Ok(Transaction {
      id,
      chat_id:        input.chat_id,
      user:           input.user,
      kind:           input.kind,
      amount_local:   input.amount_local,
      amount_foreign: input.amount_foreign,
      rate:           input.rate,
      recorded_at,
    })
  }

  async fn query_window(
    &self,
    chat_id: ChatId,
    from:    DateTime<Utc>,
    to:      DateTime<Utc>,
  ) -> Result<Vec<Transaction>> {
    let from_us = encode_dt(from);
    let to_us   = encode_dt(to);

    let raws: Vec<RawTransaction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TRANSACTION_COLUMNS}
           FROM transactions
           WHERE chat_id = ?1 AND recorded_at >= ?2 AND recorded_at < ?3
           ORDER BY id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![chat_id, from_us, to_us], RawTransaction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTransaction::into_transaction).collect()
  }

  async fn latest(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Transaction>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawTransaction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TRANSACTION_COLUMNS}
           FROM transactions
           WHERE chat_id = ?1
           ORDER BY id DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![chat_id, limit_val], RawTransaction::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .rev()
      .map(RawTransaction::into_transaction)
      .collect()
  }

  async fn clear_chat(&self, chat_id: ChatId) -> Result<u64> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM transactions WHERE chat_id = ?1",
          rusqlite::params![chat_id],
        )?)
      })
      .await?;
    Ok(removed as u64)
  }

  async fn list_chats_with_transactions(&self) -> Result<Vec<ChatId>> {
    let chats = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT DISTINCT chat_id FROM transactions ORDER BY chat_id")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<ChatId>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(chats)
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn get_settings(&self, chat_id: ChatId) -> Result<Option<StoredSettings>> {
    let raw: Option<RawSettings> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT chat_id, exchange_rate, fee_rate FROM chat_settings WHERE chat_id = ?1",
            rusqlite::params![chat_id],
            RawSettings::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSettings::into_settings).transpose()
  }

  async fn update_settings(
    &self,
    chat_id: ChatId,
    update:  SettingsUpdate,
  ) -> Result<StoredSettings> {
    // One UPSERT per column so a concurrent update of the other column is
    // never overwritten.
    let (sql, value) = match update {
      SettingsUpdate::ExchangeRate(rate) => (
        "INSERT INTO chat_settings (chat_id, exchange_rate) VALUES (?1, ?2)
         ON CONFLICT (chat_id) DO UPDATE SET exchange_rate = excluded.exchange_rate
         RETURNING chat_id, exchange_rate, fee_rate",
        encode_decimal(rate),
      ),
      SettingsUpdate::FeeRate(fee) => (
        "INSERT INTO chat_settings (chat_id, fee_rate) VALUES (?1, ?2)
         ON CONFLICT (chat_id) DO UPDATE SET fee_rate = excluded.fee_rate
         RETURNING chat_id, exchange_rate, fee_rate",
        encode_decimal(fee),
      ),
    };

    let raw: RawSettings = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(sql, rusqlite::params![chat_id, value], RawSettings::from_row)?)
      })
      .await?;

    raw.into_settings()
  }

  // ── Roster ────────────────────────────────────────────────────────────────

  async fn list_operators(&self) -> Result<Vec<Operator>> {
    let raws: Vec<RawOperator> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT operator_id, added_at FROM operators ORDER BY operator_id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawOperator {
              operator_id: row.get(0)?,
              added_at:    row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOperator::into_operator).collect()
  }

  async fn add_operator(&self, operator_id: OperatorId) -> Result<bool> {
    let at = encode_dt(self.clock.now());
    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO operators (operator_id, added_at) VALUES (?1, ?2)",
          rusqlite::params![operator_id, at],
        )?)
      })
      .await?;
    Ok(inserted == 1)
  }

  async fn remove_operator(&self, operator_id: OperatorId) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM operators WHERE operator_id = ?1",
          rusqlite::params![operator_id],
        )?)
      })
      .await?;
    Ok(removed == 1)
  }
}
