//! In-memory views of per-chat settings and the operator roster.
//!
//! The store stays the single source of truth. Settings are read through on
//! a miss and written through on every update; the roster is loaded once
//! and kept in step with every add and remove.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use tokio::sync::RwLock;

use tally_core::{
  settings::{ChatSettings, OperatorId, SettingsDefaults, SettingsUpdate},
  store::LedgerStore,
  transaction::ChatId,
};

/// What happened to a `del <id>` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
  Removed,
  NotPresent,
  /// Built-in operators come from configuration and cannot be revoked.
  BuiltIn,
}

pub struct SettingsCache<S> {
  store:    Arc<S>,
  defaults: SettingsDefaults,
  settings: RwLock<HashMap<ChatId, ChatSettings>>,
  builtin:  HashSet<OperatorId>,
  /// `None` until the persisted roster has been read once.
  roster:   RwLock<Option<HashSet<OperatorId>>>,
}

impl<S: LedgerStore> SettingsCache<S> {
  pub fn new(
    store: Arc<S>,
    defaults: SettingsDefaults,
    builtin: impl IntoIterator<Item = OperatorId>,
  ) -> Self {
    Self {
      store,
      defaults,
      settings: RwLock::new(HashMap::new()),
      builtin: builtin.into_iter().collect(),
      roster: RwLock::new(None),
    }
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  /// Effective settings for `chat_id`.
  pub async fn settings(&self, chat_id: ChatId) -> Result<ChatSettings, S::Error> {
    if let Some(cached) = self.settings.read().await.get(&chat_id) {
      return Ok(*cached);
    }

    let stored = self.store.get_settings(chat_id).await?;
    let resolved = ChatSettings::resolve(chat_id, stored.as_ref(), &self.defaults);

    // An update that landed while we were reading wins over our older view.
    let mut map = self.settings.write().await;
    Ok(*map.entry(chat_id).or_insert(resolved))
  }

  /// Writes are serialised on the map lock, so the cached row always matches
  /// the store's last write.
  pub async fn update(
    &self,
    chat_id: ChatId,
    update: SettingsUpdate,
  ) -> Result<ChatSettings, S::Error> {
    let mut map = self.settings.write().await;
    let stored = self.store.update_settings(chat_id, update).await?;
    let resolved = ChatSettings::resolve(chat_id, Some(&stored), &self.defaults);
    map.insert(chat_id, resolved);
    Ok(resolved)
  }

  // ── Roster ────────────────────────────────────────────────────────────────

  pub fn is_builtin(&self, user_id: OperatorId) -> bool { self.builtin.contains(&user_id) }

  pub async fn is_authorized(&self, user_id: OperatorId) -> Result<bool, S::Error> {
    if self.is_builtin(user_id) {
      return Ok(true);
    }
    self.load_roster().await?;
    Ok(
      self
        .roster
        .read()
        .await
        .as_ref()
        .is_some_and(|ids| ids.contains(&user_id)),
    )
  }

  /// Returns `true` when the id was not yet an operator.
  pub async fn add_operator(&self, user_id: OperatorId) -> Result<bool, S::Error> {
    self.load_roster().await?;
    let added = self.store.add_operator(user_id).await?;
    if let Some(ids) = self.roster.write().await.as_mut() {
      ids.insert(user_id);
    }
    Ok(added && !self.is_builtin(user_id))
  }

  pub async fn remove_operator(&self, user_id: OperatorId) -> Result<RemoveOutcome, S::Error> {
    if self.is_builtin(user_id) {
      return Ok(RemoveOutcome::BuiltIn);
    }
    self.load_roster().await?;
    let removed = self.store.remove_operator(user_id).await?;
    if let Some(ids) = self.roster.write().await.as_mut() {
      ids.remove(&user_id);
    }
    Ok(if removed { RemoveOutcome::Removed } else { RemoveOutcome::NotPresent })
  }

  async fn load_roster(&self) -> Result<(), S::Error> {
    if self.roster.read().await.is_some() {
      return Ok(());
    }
    let persisted: HashSet<_> = self
      .store
      .list_operators()
      .await?
      .into_iter()
      .map(|op| op.operator_id)
      .collect();

    let mut roster = self.roster.write().await;
    if roster.is_none() {
      *roster = Some(persisted);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use chrono::{DateTime, Utc};
  use rust_decimal::Decimal;
  use tally_core::{
    settings::{Operator, StoredSettings},
    transaction::{NewTransaction, Transaction},
  };
  use tally_store_sqlite::SqliteStore;

  use super::*;

  async fn cache(builtin: &[OperatorId]) -> (Arc<SqliteStore>, SettingsCache<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let cache = SettingsCache::new(
      store.clone(),
      SettingsDefaults::default(),
      builtin.iter().copied(),
    );
    (store, cache)
  }

  #[tokio::test]
  async fn settings_fall_back_to_defaults() {
    let (_, cache) = cache(&[]).await;
    let s = cache.settings(5).await.unwrap();
    assert_eq!(s.exchange_rate, Decimal::from(106));
    assert_eq!(s.fee_rate, Decimal::ZERO);
  }

  #[tokio::test]
  async fn updates_are_written_through() {
    let (store, cache) = cache(&[]).await;
    cache.settings(5).await.unwrap();

    let s = cache
      .update(5, SettingsUpdate::ExchangeRate(Decimal::from(90)))
      .await
      .unwrap();
    assert_eq!(s.exchange_rate, Decimal::from(90));
    assert_eq!(cache.settings(5).await.unwrap().exchange_rate, Decimal::from(90));

    let fresh = SettingsCache::new(store, SettingsDefaults::default(), []);
    assert_eq!(fresh.settings(5).await.unwrap().exchange_rate, Decimal::from(90));
  }

  #[tokio::test]
  async fn roster_tracks_adds_and_removes() {
    let (store, cache) = cache(&[1]).await;
    assert!(cache.is_authorized(1).await.unwrap());
    assert!(!cache.is_authorized(2).await.unwrap());

    assert!(cache.add_operator(2).await.unwrap());
    assert!(!cache.add_operator(2).await.unwrap());
    assert!(cache.is_authorized(2).await.unwrap());

    let fresh = SettingsCache::new(store, SettingsDefaults::default(), [1]);
    assert!(fresh.is_authorized(2).await.unwrap());

    assert_eq!(cache.remove_operator(2).await.unwrap(), RemoveOutcome::Removed);
    assert_eq!(cache.remove_operator(2).await.unwrap(), RemoveOutcome::NotPresent);
    assert!(!cache.is_authorized(2).await.unwrap());
  }

  #[tokio::test]
  async fn builtin_operators_cannot_be_removed() {
    let (_, cache) = cache(&[1]).await;
    assert_eq!(cache.remove_operator(1).await.unwrap(), RemoveOutcome::BuiltIn);
    assert!(cache.is_authorized(1).await.unwrap());
  }

  /// Lets an exchange-rate write finish in the store but return late.
  struct SlowRateWrites(SqliteStore);

  impl LedgerStore for SlowRateWrites {
    type Error = <SqliteStore as LedgerStore>::Error;

    async fn append(&self, tx: NewTransaction) -> Result<Transaction, Self::Error> {
      self.0.append(tx).await
    }
    async fn query_window(
      &self,
      chat_id: ChatId,
      from: DateTime<Utc>,
      to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, Self::Error> {
      self.0.query_window(chat_id, from, to).await
    }
    async fn latest(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Transaction>, Self::Error> {
      self.0.latest(chat_id, limit).await
    }
    async fn clear_chat(&self, chat_id: ChatId) -> Result<u64, Self::Error> {
      self.0.clear_chat(chat_id).await
    }
    async fn list_chats_with_transactions(&self) -> Result<Vec<ChatId>, Self::Error> {
      self.0.list_chats_with_transactions().await
    }
    async fn get_settings(&self, chat_id: ChatId) -> Result<Option<StoredSettings>, Self::Error> {
      self.0.get_settings(chat_id).await
    }
    async fn update_settings(
      &self,
      chat_id: ChatId,
      update: SettingsUpdate,
    ) -> Result<StoredSettings, Self::Error> {
      let slow = matches!(update, SettingsUpdate::ExchangeRate(_));
      let stored = self.0.update_settings(chat_id, update).await?;
      if slow {
        tokio::time::sleep(Duration::from_millis(50)).await;
      }
      Ok(stored)
    }
    async fn list_operators(&self) -> Result<Vec<Operator>, Self::Error> {
      self.0.list_operators().await
    }
    async fn add_operator(&self, id: OperatorId) -> Result<bool, Self::Error> {
      self.0.add_operator(id).await
    }
    async fn remove_operator(&self, id: OperatorId) -> Result<bool, Self::Error> {
      self.0.remove_operator(id).await
    }
  }

  #[tokio::test]
  async fn concurrent_updates_keep_the_latest_row() {
    let store = Arc::new(SlowRateWrites(SqliteStore::open_in_memory().await.unwrap()));
    let cache = SettingsCache::new(store.clone(), SettingsDefaults::default(), []);

    let (rate, fee) = tokio::join!(
      cache.update(5, SettingsUpdate::ExchangeRate(Decimal::from(90))),
      async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.update(5, SettingsUpdate::FeeRate(Decimal::from(2))).await
      },
    );
    rate.unwrap();
    fee.unwrap();

    let cached = cache.settings(5).await.unwrap();
    let fresh = SettingsCache::new(store, SettingsDefaults::default(), []);
    assert_eq!(cached, fresh.settings(5).await.unwrap());
    assert_eq!(cached.exchange_rate, Decimal::from(90));
    assert_eq!(cached.fee_rate, Decimal::from(2));
  }
}
