//! Trade direction, exit reasons, and the record of a completed round trip.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Width of the separator line framing each block in the trade log.
pub const LOG_SEPARATOR_WIDTH: usize = 60;

/// Direction of the position on the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "LONG",
            TradeSide::Short => "SHORT",
        }
    }

    /// Order side that opens a position in this direction.
    pub fn entry_order(&self) -> OrderSide {
        match self {
            TradeSide::Long => OrderSide::Buy,
            TradeSide::Short => OrderSide::Sell,
        }
    }

    /// Order side that flattens a position in this direction.
    pub fn exit_order(&self) -> OrderSide {
        self.entry_order().opposite()
    }

    /// Signed P&L of moving from `entry` to `exit` with `quantity` units.
    pub fn pnl(&self, entry: Decimal, exit: Decimal, quantity: u32) -> Decimal {
        let qty = Decimal::from(quantity);
        match self {
            TradeSide::Long => (exit - entry) * qty,
            TradeSide::Short => (entry - exit) * qty,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a single broker order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Why a position was closed. P&L is computed the same way for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    Manual,
    SessionClose,
}

impl ExitReason {
    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "Stop Loss Hit",
            ExitReason::Manual => "Manual Exit",
            ExitReason::SessionClose => "Market Close",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Proxy leg of a completed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyOutcome {
    pub symbol: String,
    pub side: TradeSide,
    pub entry_price: Decimal,
    /// `None` when no quote could be fetched for the proxy at exit.
    pub exit_price: Option<Decimal>,
    pub profit: Option<Decimal>,
}

/// Immutable result of one round trip. Produced exactly once per closed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u32,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_time: DateTime<Utc>,
    pub exit_price: Decimal,
    pub stop_level: Decimal,
    /// Absolute P&L on the underlying
    pub profit: Decimal,
    /// P&L as a percentage of entry notional
    pub profit_pct: Decimal,
    pub proxy: Option<ProxyOutcome>,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.profit > Decimal::ZERO
    }

    /// Render the append-only text block: separator, header, `key: value`
    /// lines, separator. Timestamps are shown in the session timezone.
    pub fn to_log_block(&self, tz: Tz, logged_at: DateTime<Utc>) -> String {
        const TS: &str = "%Y-%m-%d %H:%M:%S";
        let sep = "=".repeat(LOG_SEPARATOR_WIDTH);
        let mut lines = vec![
            String::new(),
            sep.clone(),
            format!(
                "Trade Log Entry - {}",
                logged_at.with_timezone(&tz).format(TS)
            ),
            sep.clone(),
            format!("trade_id: {}", self.id),
            format!("symbol: {}", self.symbol),
            format!("entry_datetime: {}", self.entry_time.with_timezone(&tz).format(TS)),
            format!("entry_price: {}", self.entry_price),
            format!("exit_datetime: {}", self.exit_time.with_timezone(&tz).format(TS)),
            format!("exit_price: {}", self.exit_price),
            format!("stop_loss: {}", self.stop_level),
            format!("quantity: {}", self.quantity),
            format!("profit_absolute: {}", self.profit.round_dp(2)),
            format!("profit_percentage: {}", self.profit_pct.round_dp(2)),
            format!("trade_type: {}", self.side),
            format!("exit_reason: {}", self.exit_reason),
        ];

        if let Some(proxy) = &self.proxy {
            let show = |v: Option<Decimal>| {
                v.map(|d| d.round_dp(2).to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            };
            lines.push(format!("proxy_symbol: {}", proxy.symbol));
            lines.push(format!("proxy_entry_price: {}", proxy.entry_price));
            lines.push(format!("proxy_exit_price: {}", show(proxy.exit_price)));
            lines.push(format!("proxy_profit_absolute: {}", show(proxy.profit)));
        }

        lines.push(sep);
        let mut block = lines.join("\n");
        block.push('\n');
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn record(proxy: Option<ProxyOutcome>) -> TradeRecord {
        TradeRecord {
            id: "t-1".to_string(),
            symbol: "NSE:SBIN-EQ".to_string(),
            side: TradeSide::Long,
            quantity: 3,
            entry_time: Utc.with_ymd_and_hms(2025, 1, 6, 4, 0, 0).unwrap(),
            entry_price: dec!(106),
            exit_time: Utc.with_ymd_and_hms(2025, 1, 6, 5, 30, 0).unwrap(),
            exit_price: dec!(97),
            stop_level: dec!(98),
            profit: dec!(-27),
            profit_pct: dec!(-8.490566),
            proxy,
            exit_reason: ExitReason::StopLoss,
        }
    }

    #[test]
    fn test_pnl_is_mirrored_between_sides() {
        let long = TradeSide::Long.pnl(dec!(106), dec!(97), 2);
        let short = TradeSide::Short.pnl(dec!(106), dec!(97), 2);
        assert_eq!(long, dec!(-18));
        assert_eq!(short, -long);
    }

    #[test]
    fn test_order_sides() {
        assert_eq!(TradeSide::Long.entry_order(), OrderSide::Buy);
        assert_eq!(TradeSide::Long.exit_order(), OrderSide::Sell);
        assert_eq!(TradeSide::Short.entry_order(), OrderSide::Sell);
        assert_eq!(TradeSide::Short.exit_order(), OrderSide::Buy);
    }

    #[test]
    fn test_log_block_layout() {
        let rec = record(None);
        let block = rec.to_log_block(chrono_tz::Asia::Kolkata, rec.exit_time);
        let lines: Vec<&str> = block.lines().collect();
        let sep = "=".repeat(LOG_SEPARATOR_WIDTH);

        assert_eq!(lines[0], "");
        assert_eq!(lines[1], sep);
        assert_eq!(lines[2], "Trade Log Entry - 2025-01-06 11:00:00");
        assert_eq!(lines[3], sep);
        assert!(lines.contains(&"entry_datetime: 2025-01-06 09:30:00"));
        assert!(lines.contains(&"profit_absolute: -27"));
        assert!(lines.contains(&"profit_percentage: -8.49"));
        assert!(lines.contains(&"exit_reason: Stop Loss Hit"));
        assert_eq!(*lines.last().unwrap(), sep);
        assert!(!block.contains("proxy_symbol"));
    }

    #[test]
    fn test_log_block_includes_proxy_leg() {
        let rec = record(Some(ProxyOutcome {
            symbol: "NSE:NIFTY25JAN24000CE".to_string(),
            side: TradeSide::Long,
            entry_price: dec!(120.5),
            exit_price: None,
            profit: None,
        }));
        let block = rec.to_log_block(chrono_tz::Asia::Kolkata, rec.exit_time);
        assert!(block.contains("proxy_symbol: NSE:NIFTY25JAN24000CE"));
        assert!(block.contains("proxy_exit_price: n/a"));
    }
}
