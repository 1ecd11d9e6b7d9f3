//! Route handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/chats/{chat_id}/messages` | Body: `{"user_id":1,"user_name":"ana","text":"+50"}`; `204` when there is no reply |
//! | `GET`  | `/chats/{chat_id}/report` | `?user_id=<id>`; plain-text attachment, `204` for non-operators |
//! | `POST` | `/rollover` | Clears every chat now; the notices are in the response |
//! | `POST` | `/notices/drain` | Hands out and forgets the notices of timer-driven rollovers |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tally_bot::{ChatNotice, Reply, Report, RolloverReport};
use tally_core::{settings::OperatorId, store::LedgerStore, transaction::ChatId};

use crate::{AppState, auth::Authenticated, error::Error};

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MessageBody {
  pub user_id:   OperatorId,
  #[serde(default)]
  pub user_name: String,
  pub text:      String,
}

/// A reply as sent back to the transport.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyBody {
  Text { text: String },
  /// `full_report` is the path to fetch the downloadable report from.
  Summary { text: String, full_report: String },
  Document { filename: String, content: String },
}

impl ReplyBody {
  fn new(chat_id: ChatId, user_id: OperatorId, reply: Reply) -> Self {
    match reply {
      Reply::Text(text) => Self::Text { text },
      Reply::Summary(text) => Self::Summary {
        text,
        full_report: format!("/chats/{chat_id}/report?user_id={user_id}"),
      },
      Reply::Document(Report { filename, body }) => Self::Document {
        filename,
        content: String::from_utf8_lossy(&body).into_owned(),
      },
    }
  }
}

/// `POST /chats/{chat_id}/messages`
pub async fn post_message<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(chat_id): Path<ChatId>,
  Json(body): Json<MessageBody>,
) -> Result<Response, Error>
where
  S: LedgerStore + 'static,
{
  let reply = state
    .ledger
    .handle_command(chat_id, body.user_id, &body.user_name, &body.text)
    .await?;

  Ok(match reply {
    Some(reply) => Json(ReplyBody::new(chat_id, body.user_id, reply)).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  pub user_id: OperatorId,
}

/// `GET /chats/{chat_id}/report?user_id=<id>`
pub async fn get_report<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(chat_id): Path<ChatId>,
  Query(params): Query<ReportParams>,
) -> Result<Response, Error>
where
  S: LedgerStore + 'static,
{
  let Some(report) = state
    .ledger
    .handle_full_report_request(chat_id, params.user_id)
    .await?
  else {
    return Ok(StatusCode::NO_CONTENT.into_response());
  };

  let disposition = format!("attachment; filename=\"{}\"", report.filename);
  Ok(
    (
      [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      report.body,
    )
      .into_response(),
  )
}

// ─── Rollover ────────────────────────────────────────────────────────────────

/// `POST /rollover`
pub async fn post_rollover<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<RolloverReport>, Error>
where
  S: LedgerStore + 'static,
{
  Ok(Json(state.ledger.rollover().await?))
}

// ─── Notices ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct NoticesBody {
  pub notices: Vec<ChatNotice>,
}

/// `POST /notices/drain`
pub async fn drain_notices<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Json<NoticesBody>
where
  S: LedgerStore + 'static,
{
  Json(NoticesBody { notices: state.notices.drain().await })
}
