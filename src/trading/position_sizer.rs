//! Position sizing: fixed quantity or risk-based against the stop distance.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{SizingMode, TradingConfig};

/// Risk-based quantity.
///
/// `risk = capital * risk_pct / 100`, `quantity = floor(risk / |entry - stop|)`,
/// never below 1. A zero stop distance also yields 1.
pub fn risk_quantity(capital: Decimal, risk_pct: Decimal, entry_price: Decimal, stop_price: Decimal) -> u32 {
    let risk_amount = capital * risk_pct / dec!(100);
    let price_diff = (entry_price - stop_price).abs();

    if price_diff.is_zero() {
        return 1;
    }

    let raw = (risk_amount / price_diff).floor();
    raw.to_u32().unwrap_or(if raw > Decimal::ZERO { u32::MAX } else { 1 }).max(1)
}

/// Calculator for entry quantities.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    mode: SizingMode,
    capital: Decimal,
    risk_pct: Decimal,
    fixed_quantity: u32,
}

impl PositionSizer {
    pub fn new(config: &TradingConfig) -> Self {
        Self {
            mode: config.sizing_mode,
            capital: config.capital,
            risk_pct: config.risk_per_trade_pct,
            fixed_quantity: config.fixed_quantity.max(1),
        }
    }

    /// Quantity for an entry at `entry_price` with its stop at `stop_price`.
    pub fn quantity(&self, entry_price: Decimal, stop_price: Decimal) -> u32 {
        match self.mode {
            SizingMode::Fixed => self.fixed_quantity,
            SizingMode::Risk => risk_quantity(self.capital, self.risk_pct, entry_price, stop_price),
        }
    }
}
