//! HTTP front end for the Tally ledger.
//!
//! Chat transports post raw lines to [`router`] and relay whatever comes
//! back. Every route requires the configured bearer token; operator checks
//! happen inside the ledger.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod notices;
pub mod scheduler;

pub use config::{ConfigError, ServerConfig, Settings};
pub use error::Error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tally_bot::Ledger;
use tally_core::store::LedgerStore;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use notices::NoticeOutbox;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub ledger:  Arc<Ledger<S>>,
  pub auth:    Arc<AuthConfig>,
  /// Notices from timer-driven rollovers, until a transport drains them.
  pub notices: Arc<NoticeOutbox>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      ledger:  Arc::clone(&self.ledger),
      auth:    Arc::clone(&self.auth),
      notices: Arc::clone(&self.notices),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router<S>(state: AppState<S>) -> Router
where
  S: LedgerStore + 'static,
{
  Router::new()
    .route("/chats/{chat_id}/messages", post(api::post_message::<S>))
    .route("/chats/{chat_id}/report",   get(api::get_report::<S>))
    .route("/rollover",                 post(api::post_rollover::<S>))
    .route("/notices/drain",            post(api::drain_notices::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
