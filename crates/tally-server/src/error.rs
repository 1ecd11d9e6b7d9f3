//! HTTP error type and its `IntoResponse` mapping.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Ledger(#[from] tally_bot::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    // Details were already logged by the ledger; clients get a fixed message.
    let (status, message) = match &self {
      Error::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
        res
          .headers_mut()
          .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"tally\""));
        return res;
      }
      Error::Ledger(tally_bot::Error::Storage(_)) => {
        (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
      }
      Error::Ledger(tally_bot::Error::Core(tally_core::Error::Overflow(_))) => {
        (StatusCode::UNPROCESSABLE_ENTITY, "amount out of range")
      }
      Error::Ledger(tally_bot::Error::Core(_)) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
