//! Server configuration.
//!
//! [`ServerConfig`] is what `config.toml` and `TALLY_*` variables
//! deserialise into; [`ServerConfig::validate`] turns it into typed
//! [`Settings`] or explains what is wrong.

use std::path::PathBuf;

use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use tally_bot::{LedgerConfig, RenderOptions};
use tally_command::Grammar;
use tally_core::{
  schedule::RolloverSchedule,
  settings::{OperatorId, SettingsDefaults},
  summary::LabelMapping,
  window::DayWindow,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("access_token must be set")]
  MissingAccessToken,
  #[error("unknown time zone {0:?}")]
  UnknownTimeZone(String),
  #[error("{field} must be HH:MM or HH:MM:SS, got {value:?}")]
  BadTime { field: &'static str, value: String },
  #[error("default_exchange_rate must be positive, got {0}")]
  NonPositiveRate(Decimal),
  #[error("default_fee_rate must not be negative, got {0}")]
  NegativeFee(Decimal),
  #[error("recent_entries must be at least 1")]
  NoRecentEntries,
}

/// Raw configuration as read from file and environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  pub access_token:           Option<String>,
  pub admins:                 Vec<OperatorId>,
  pub timezone:               String,
  pub cutover:                String,
  /// Local time of the daily clear; the cutover when unset.
  pub rollover_at:            Option<String>,
  pub default_exchange_rate:  Decimal,
  pub default_fee_rate:       Decimal,
  pub recent_entries:         usize,
  pub payout_suffix_required: bool,
  pub label_mapping:          LabelMapping,
  pub local_currency:         String,
  pub foreign_currency:       String,
  pub scheduler_enabled:      bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let defaults = SettingsDefaults::default();
    Self {
      host:                   "127.0.0.1".into(),
      port:                   8080,
      store_path:             PathBuf::from("tally.db"),
      access_token:           None,
      admins:                 Vec::new(),
      timezone:               "Asia/Kolkata".into(),
      cutover:                "06:00".into(),
      rollover_at:            None,
      default_exchange_rate:  defaults.exchange_rate,
      default_fee_rate:       defaults.fee_rate,
      recent_entries:         5,
      payout_suffix_required: true,
      label_mapping:          LabelMapping::default(),
      local_currency:         "INR".into(),
      foreign_currency:       "USD".into(),
      scheduler_enabled:      true,
    }
  }
}

/// Validated settings, ready to build the ledger and the router from.
#[derive(Debug, Clone)]
pub struct Settings {
  pub address:           String,
  pub store_path:        PathBuf,
  pub access_token:      String,
  pub admins:            Vec<OperatorId>,
  pub defaults:          SettingsDefaults,
  pub ledger:            LedgerConfig,
  pub schedule:          RolloverSchedule,
  pub scheduler_enabled: bool,
}

impl ServerConfig {
  pub fn validate(self) -> Result<Settings, ConfigError> {
    let access_token = self
      .access_token
      .filter(|t| !t.trim().is_empty())
      .ok_or(ConfigError::MissingAccessToken)?;

    let tz: Tz = self
      .timezone
      .parse()
      .map_err(|_| ConfigError::UnknownTimeZone(self.timezone.clone()))?;
    let cutover = parse_time("cutover", &self.cutover)?;
    let rollover_at = match &self.rollover_at {
      Some(value) => parse_time("rollover_at", value)?,
      None => cutover,
    };

    if self.default_exchange_rate <= Decimal::ZERO {
      return Err(ConfigError::NonPositiveRate(self.default_exchange_rate));
    }
    if self.default_fee_rate.is_sign_negative() && !self.default_fee_rate.is_zero() {
      return Err(ConfigError::NegativeFee(self.default_fee_rate));
    }
    if self.recent_entries == 0 {
      return Err(ConfigError::NoRecentEntries);
    }

    let mut ledger = LedgerConfig::new(DayWindow::new(tz, cutover));
    ledger.grammar = Grammar { payout_suffix_required: self.payout_suffix_required };
    ledger.render = RenderOptions {
      recent_entries: self.recent_entries,
      labels:         self.label_mapping,
      local_code:     self.local_currency,
      foreign_code:   self.foreign_currency,
      ..RenderOptions::default()
    };

    Ok(Settings {
      address: format!("{}:{}", self.host, self.port),
      store_path: self.store_path,
      access_token,
      admins: self.admins,
      defaults: SettingsDefaults {
        exchange_rate: self.default_exchange_rate,
        fee_rate:      self.default_fee_rate,
      },
      ledger,
      schedule: RolloverSchedule::new(tz, rollover_at),
      scheduler_enabled: self.scheduler_enabled,
    })
  }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
  NaiveTime::parse_from_str(value, "%H:%M:%S")
    .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
    .map_err(|_| ConfigError::BadTime { field, value: value.to_owned() })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn with_token() -> ServerConfig {
    ServerConfig { access_token: Some("secret".into()), ..Default::default() }
  }

  #[test]
  fn defaults_validate_once_a_token_is_set() {
    assert_eq!(
      ServerConfig::default().validate().unwrap_err(),
      ConfigError::MissingAccessToken
    );

    let s = with_token().validate().unwrap();
    assert_eq!(s.address, "127.0.0.1:8080");
    assert_eq!(s.defaults.exchange_rate, Decimal::from(106));
    assert_eq!(s.ledger.window.tz(), chrono_tz::Asia::Kolkata);
    assert_eq!(s.ledger.window.cutover(), NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    assert_eq!(s.ledger.render.recent_entries, 5);
    assert!(s.ledger.grammar.payout_suffix_required);
  }

  #[test]
  fn blank_token_is_missing() {
    let cfg = ServerConfig { access_token: Some("  ".into()), ..Default::default() };
    assert_eq!(cfg.validate().unwrap_err(), ConfigError::MissingAccessToken);
  }

  #[test]
  fn bad_values_are_rejected() {
    let cfg = ServerConfig { timezone: "Mars/Olympus".into(), ..with_token() };
    assert!(matches!(cfg.validate(), Err(ConfigError::UnknownTimeZone(_))));

    let cfg = ServerConfig { cutover: "25:00".into(), ..with_token() };
    assert!(matches!(cfg.validate(), Err(ConfigError::BadTime { field: "cutover", .. })));

    let cfg = ServerConfig { default_exchange_rate: Decimal::ZERO, ..with_token() };
    assert!(matches!(cfg.validate(), Err(ConfigError::NonPositiveRate(_))));

    let cfg = ServerConfig { default_fee_rate: Decimal::from(-1), ..with_token() };
    assert!(matches!(cfg.validate(), Err(ConfigError::NegativeFee(_))));

    let cfg = ServerConfig { recent_entries: 0, ..with_token() };
    assert_eq!(cfg.validate().unwrap_err(), ConfigError::NoRecentEntries);
  }

  #[test]
  fn reads_toml() {
    let raw = r#"
      access_token = "secret"
      admins = [1, 2]
      timezone = "Europe/Berlin"
      cutover = "05:30:00"
      rollover_at = "23:59"
      default_exchange_rate = "92.5"
      label_mapping = "income_issued"
    "#;
    let cfg: ServerConfig = ::config::Config::builder()
      .add_source(::config::File::from_str(raw, ::config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    let s = cfg.validate().unwrap();

    assert_eq!(s.admins, [1, 2]);
    assert_eq!(s.defaults.exchange_rate, Decimal::new(925, 1));
    assert_eq!(s.ledger.render.labels, LabelMapping::IncomeIssued);
    assert_eq!(s.ledger.window.cutover(), NaiveTime::from_hms_opt(5, 30, 0).unwrap());
    assert_eq!(
      s.schedule,
      RolloverSchedule::new(chrono_tz::Europe::Berlin, NaiveTime::from_hms_opt(23, 59, 0).unwrap())
    );
  }
}
