//! Trading configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::TradeError;

/// How the entry quantity is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Always trade `fixed_quantity` units
    Fixed,
    /// Risk a percentage of capital against the distance to the stop
    #[default]
    Risk,
}

/// What to do when the option proxy cannot be resolved to exactly one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyFailurePolicy {
    /// Trade the underlying without a proxy
    #[default]
    UnderlyingOnly,
    /// Skip the entry for this tick
    Abort,
}

/// Configuration for signals, sizing and proxy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Trading capital in account currency
    pub capital: Decimal,

    /// Percentage of capital risked per trade (1 = 1%)
    pub risk_per_trade_pct: Decimal,

    /// Which position sizing method to use
    pub sizing_mode: SizingMode,

    /// Quantity used by `SizingMode::Fixed`
    pub fixed_quantity: u32,

    /// Day gate: maximum previous-day open-to-close move, in percent
    pub max_prev_day_change_pct: Decimal,

    /// Allow re-entry after a completed round trip
    pub allow_multiple_trades: bool,

    /// Trade an in-the-money option instead of the underlying
    pub use_option_proxy: bool,

    /// Underlying whose option chain is consulted
    pub option_underlying: String,

    /// Spacing between listed strikes
    pub strike_interval: Decimal,

    /// Roll to the next expiry when the nearest is closer than this
    pub min_days_to_expiry: i64,

    /// Strikes either side of ATM requested from the chain endpoint
    pub strike_count: u32,

    pub proxy_failure_policy: ProxyFailurePolicy,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            capital: dec!(100000),
            risk_per_trade_pct: dec!(1),
            sizing_mode: SizingMode::Risk,
            fixed_quantity: 1,
            max_prev_day_change_pct: dec!(0.5),
            allow_multiple_trades: false,
            use_option_proxy: false,
            option_underlying: "NSE:NIFTY50-INDEX".to_string(),
            strike_interval: dec!(50),
            min_days_to_expiry: 3,
            strike_count: 2,
            proxy_failure_policy: ProxyFailurePolicy::UnderlyingOnly,
        }
    }
}

impl TradingConfig {
    pub fn validate(&self) -> Result<(), TradeError> {
        if self.capital <= Decimal::ZERO {
            return Err(TradeError::ConfigInvalid(format!(
                "capital must be positive, got {}",
                self.capital
            )));
        }
        if self.risk_per_trade_pct <= Decimal::ZERO || self.risk_per_trade_pct > dec!(100) {
            return Err(TradeError::ConfigInvalid(format!(
                "risk_per_trade_pct must be in (0, 100], got {}",
                self.risk_per_trade_pct
            )));
        }
        if self.fixed_quantity == 0 {
            return Err(TradeError::ConfigInvalid(
                "fixed_quantity must be at least 1".to_string(),
            ));
        }
        if self.max_prev_day_change_pct <= Decimal::ZERO {
            return Err(TradeError::ConfigInvalid(
                "max_prev_day_change_pct must be positive".to_string(),
            ));
        }
        if self.strike_interval <= Decimal::ZERO {
            return Err(TradeError::ConfigInvalid(
                "strike_interval must be positive".to_string(),
            ));
        }
        if self.min_days_to_expiry < 0 {
            return Err(TradeError::ConfigInvalid(
                "min_days_to_expiry cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TradingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_capital() {
        let config = TradingConfig {
            capital: Decimal::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TradeError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TradingConfig =
            serde_json::from_str(r#"{"sizing_mode": "fixed", "fixed_quantity": 5}"#).unwrap();
        assert_eq!(config.sizing_mode, SizingMode::Fixed);
        assert_eq!(config.fixed_quantity, 5);
        assert_eq!(config.strike_interval, dec!(50));
    }
}
