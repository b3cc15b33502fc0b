//! The single open position owned by the trade lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{OptionType, TradeSide};

/// Option contract traded alongside (or instead of) the underlying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyInstrument {
    pub symbol: String,
    pub option_type: OptionType,
    pub strike: Decimal,
    /// Direction of the option position itself. Bought contracts are `Long`.
    pub side: TradeSide,
    pub entry_price: Decimal,
}

impl ProxyInstrument {
    /// P&L of the proxy leg for a given exit quote.
    pub fn pnl(&self, exit_price: Decimal, quantity: u32) -> Decimal {
        self.side.pnl(self.entry_price, exit_price, quantity)
    }
}

/// Open position on the configured instrument.
///
/// The stop is the range edge on the far side of the breakout: previous low
/// for a long, previous high for a short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub stop_level: Decimal,
    pub quantity: u32,
    pub proxy: Option<ProxyInstrument>,
}

impl Position {
    /// Unrealized P&L at the given price.
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        self.side.pnl(self.entry_price, current_price, self.quantity)
    }

    /// Distance from entry to stop, always non-negative.
    pub fn risk_per_unit(&self) -> Decimal {
        (self.entry_price - self.stop_level).abs()
    }

    /// Symbol the broker orders go to: the proxy when one is held.
    pub fn order_symbol(&self) -> &str {
        self.proxy
            .as_ref()
            .map(|p| p.symbol.as_str())
            .unwrap_or(self.symbol.as_str())
    }
}
