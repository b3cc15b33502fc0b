//! Application configuration: credentials, instrument, session clock, trading.
//!
//! Loaded from a JSON file (created with placeholders when missing), then
//! overridden from the environment. `.env` files are honoured via dotenvy.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TradeError;
use crate::trading::TradingConfig;

pub const PLACEHOLDER_CLIENT_ID: &str = "YOUR_CLIENT_ID";
pub const PLACEHOLDER_ACCESS_TOKEN: &str = "YOUR_ACCESS_TOKEN";

/// Market session timing, all in `timezone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// IANA timezone name of the exchange
    pub timezone: String,
    pub market_open: NaiveTime,
    /// When the snapshot is taken and the day gate evaluated
    pub gate_check_at: NaiveTime,
    /// Open positions are force-closed at this time
    pub market_close: NaiveTime,
    pub poll_interval_secs: u64,
    /// Delay before asking again for a price the broker did not return,
    /// both within a tick and between forced exit attempts
    pub quote_retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Kolkata".to_string(),
            market_open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            gate_check_at: NaiveTime::from_hms_opt(9, 16, 1).unwrap_or_default(),
            market_close: NaiveTime::from_hms_opt(15, 15, 0).unwrap_or_default(),
            poll_interval_secs: 1,
            quote_retry_delay_ms: 1000,
        }
    }
}

impl SessionConfig {
    pub fn tz(&self) -> Result<Tz, TradeError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| TradeError::ConfigInvalid(format!("timezone {}: {}", self.timezone, e)))
    }

    pub fn validate(&self) -> Result<(), TradeError> {
        self.tz()?;
        if !(self.market_open <= self.gate_check_at && self.gate_check_at < self.market_close) {
            return Err(TradeError::ConfigInvalid(format!(
                "expected market_open <= gate_check_at < market_close, got {} / {} / {}",
                self.market_open, self.gate_check_at, self.market_close
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(TradeError::ConfigInvalid(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything the bot needs at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub access_token: String,
    /// Instrument whose range is traded
    pub symbol: String,
    #[serde(default = "default_trade_log")]
    pub trade_log_path: String,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_trade_log() -> String {
    "trade_log.txt".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: PLACEHOLDER_CLIENT_ID.to_string(),
            access_token: PLACEHOLDER_ACCESS_TOKEN.to_string(),
            symbol: "NSE:NIFTY50-INDEX".to_string(),
            trade_log_path: default_trade_log(),
            trading: TradingConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, writing a default file first if none exists.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, creating default");
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Apply `FYERS_CLIENT_ID`, `FYERS_ACCESS_TOKEN` and `TRADER_SYMBOL`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("FYERS_CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = non_empty("FYERS_ACCESS_TOKEN") {
            self.access_token = v;
        }
        if let Some(v) = non_empty("TRADER_SYMBOL") {
            self.symbol = v;
        }
    }

    pub fn has_credentials(&self) -> bool {
        let missing = |v: &str, placeholder: &str| v.trim().is_empty() || v == placeholder;
        !missing(&self.client_id, PLACEHOLDER_CLIENT_ID)
            && !missing(&self.access_token, PLACEHOLDER_ACCESS_TOKEN)
    }

    /// Full validation before live trading.
    pub fn validate(&self) -> Result<(), TradeError> {
        if !self.has_credentials() {
            return Err(TradeError::ConfigInvalid(
                "client_id and access_token must be set (config file or FYERS_* env)".to_string(),
            ));
        }
        self.validate_strategy()
    }

    /// Validation that does not require broker credentials (dry runs).
    pub fn validate_strategy(&self) -> Result<(), TradeError> {
        if self.symbol.trim().is_empty() {
            return Err(TradeError::ConfigInvalid("symbol must be set".to_string()));
        }
        self.trading.validate()?;
        self.session.validate()
    }
}
