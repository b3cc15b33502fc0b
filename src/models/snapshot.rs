//! Market snapshot: the previous session's range plus today's open.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TradeError;

/// One daily candle as returned by the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyOhlc {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Immutable per-session view of the previous day's range and today's open.
///
/// Built once after the market opens; never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketSnapshot {
    prev_open: Decimal,
    prev_high: Decimal,
    prev_low: Decimal,
    prev_close: Decimal,
    today_open: Decimal,
}

impl MarketSnapshot {
    /// Build a snapshot, rejecting inverted ranges and non-positive prices.
    pub fn new(prev_day: DailyOhlc, today_open: Decimal) -> Result<Self, TradeError> {
        if prev_day.low > prev_day.high {
            return Err(TradeError::InvalidSnapshot(format!(
                "previous low {} above previous high {}",
                prev_day.low, prev_day.high
            )));
        }

        let prices = [
            prev_day.open,
            prev_day.high,
            prev_day.low,
            prev_day.close,
            today_open,
        ];
        if prices.iter().any(|p| *p <= Decimal::ZERO) {
            return Err(TradeError::InvalidSnapshot(
                "prices must be positive".to_string(),
            ));
        }

        Ok(Self {
            prev_open: prev_day.open,
            prev_high: prev_day.high,
            prev_low: prev_day.low,
            prev_close: prev_day.close,
            today_open,
        })
    }

    pub fn prev_open(&self) -> Decimal {
        self.prev_open
    }

    pub fn prev_high(&self) -> Decimal {
        self.prev_high
    }

    pub fn prev_low(&self) -> Decimal {
        self.prev_low
    }

    pub fn prev_close(&self) -> Decimal {
        self.prev_close
    }

    pub fn today_open(&self) -> Decimal {
        self.today_open
    }

    /// Width of the previous day's range.
    pub fn range(&self) -> Decimal {
        self.prev_high - self.prev_low
    }
}
