//! Bearer-token extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use tally_core::store::LedgerStore;

use crate::{AppState, error::Error};

#[derive(Clone)]
pub struct AuthConfig {
  pub access_token: String,
}

/// Present in a handler's arguments means the request carried the token.
pub struct Authenticated;

pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(Error::Unauthorized)?;

  if constant_time_eq(token.trim().as_bytes(), config.access_token.as_bytes()) {
    Ok(())
  } else {
    Err(Error::Unauthorized)
  }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: LedgerStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)?;
    Ok(Authenticated)
  }
}
