//! Configuration for the circulation desk.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::ConfigError;
use crate::fines::{DEFAULT_MAX_FINE, FineSchedule};
use crate::types::Money;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use circulation_core::environment::{Clock, SystemClock};
use circulation_runtime::StoreConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Log filter used when neither `LIBRARY_LOG` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "info,library_checkout=debug";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// `tracing` filter directive (`LIBRARY_LOG`, then `RUST_LOG`)
    pub log_filter: String,
    /// Fixed "today" (`LIBRARY_BUSINESS_DATE`, `YYYY-MM-DD`); system clock when unset
    pub business_date: Option<NaiveDate>,
    /// Ceiling on a single fine in cents (`LIBRARY_MAX_FINE_CENTS`)
    pub max_fine_cents: u64,
    /// Store shutdown timeout in seconds (`LIBRARY_SHUTDOWN_TIMEOUT_SECS`)
    pub shutdown_timeout_secs: u64,
    /// How long a desk caller waits for its decision (`LIBRARY_REPLY_TIMEOUT_MS`)
    pub reply_timeout_ms: u64,
}

impl LibraryConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults; a malformed business
    /// date is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from environment variables, rejecting a malformed
    /// business date.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBusinessDate`] if `LIBRARY_BUSINESS_DATE`
    /// is set but is not `YYYY-MM-DD`.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|key| env::var(key).ok())
    }

    /// Like [`LibraryConfig::from_env`] with an explicit variable source
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let business_date = read(&lookup, "LIBRARY_BUSINESS_DATE")
            .and_then(|raw| parse_business_date(&raw).ok());

        Self {
            business_date,
            ..Self::without_business_date(&lookup)
        }
    }

    /// Like [`LibraryConfig::try_from_env`] with an explicit variable source
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBusinessDate`] for a malformed date.
    pub fn try_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let business_date = read(&lookup, "LIBRARY_BUSINESS_DATE")
            .map(|raw| parse_business_date(&raw))
            .transpose()?;

        Ok(Self {
            business_date,
            ..Self::without_business_date(&lookup)
        })
    }

    fn without_business_date(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_filter: read(lookup, "LIBRARY_LOG")
                .or_else(|| read(lookup, "RUST_LOG"))
                .unwrap_or(defaults.log_filter),
            business_date: None,
            max_fine_cents: read(lookup, "LIBRARY_MAX_FINE_CENTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_fine_cents),
            shutdown_timeout_secs: read(lookup, "LIBRARY_SHUTDOWN_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.shutdown_timeout_secs),
            reply_timeout_ms: read(lookup, "LIBRARY_REPLY_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reply_timeout_ms),
        }
    }

    /// Fine rules with the configured cap
    #[must_use]
    pub const fn fine_schedule(&self) -> FineSchedule {
        FineSchedule::with_max_fine(Money::from_cents(self.max_fine_cents))
    }

    /// Store shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Desk reply timeout
    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Store settings derived from this configuration
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_shutdown_timeout(self.shutdown_timeout())
    }

    /// The clock the desk should run on
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.business_date {
            Some(date) => Arc::new(BusinessDateClock::new(date)),
            None => Arc::new(SystemClock),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            business_date: None,
            max_fine_cents: DEFAULT_MAX_FINE.cents(),
            shutdown_timeout_secs: 5,
            reply_timeout_ms: 10_000,
        }
    }
}

fn read(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn parse_business_date(raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| ConfigError::InvalidBusinessDate {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Clock pinned to midnight UTC of a configured business date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessDateClock {
    date: NaiveDate,
}

impl BusinessDateClock {
    /// Creates a clock that always reports `date`
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl Clock for BusinessDateClock {
    fn now(&self) -> DateTime<Utc> {
        self.date.and_time(NaiveTime::MIN).and_utc()
    }
}
