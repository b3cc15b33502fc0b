//! Structured events emitted at the decision points of a session.

use tracing::{info, warn};

use crate::models::{MarketSnapshot, Position, TradeRecord, TradeSide};

use super::DayGateReport;

/// Sink for the points the core reports on: gate verdict, entry, exit, and
/// entries that were skipped.
pub trait TradeEvents: Send + Sync {
    fn day_gate(&self, symbol: &str, snapshot: &MarketSnapshot, report: &DayGateReport);
    fn entered(&self, position: &Position);
    fn exited(&self, record: &TradeRecord);
    fn entry_skipped(&self, side: TradeSide, reason: &str);
}

/// Default sink writing everything through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl TradeEvents for TracingEvents {
    fn day_gate(&self, symbol: &str, snapshot: &MarketSnapshot, report: &DayGateReport) {
        info!(
            symbol = %symbol,
            prev_open = %snapshot.prev_open(),
            prev_high = %snapshot.prev_high(),
            prev_low = %snapshot.prev_low(),
            prev_close = %snapshot.prev_close(),
            today_open = %snapshot.today_open(),
            range = %snapshot.range(),
            "Checking trade day conditions"
        );
        for check in &report.checks {
            if check.passed {
                info!(check = check.name, "PASS {}", check.detail);
            } else {
                warn!(check = check.name, "FAIL {}", check.detail);
            }
        }
        if report.is_trade_day() {
            info!(symbol = %symbol, "Today is a trade day");
        } else {
            info!(symbol = %symbol, "Today is not a trade day");
        }
    }

    fn entered(&self, position: &Position) {
        info!(
            symbol = %position.symbol,
            side = %position.side,
            entry_price = %position.entry_price,
            stop = %position.stop_level,
            risk_per_unit = %position.risk_per_unit(),
            quantity = position.quantity,
            proxy = ?position.proxy.as_ref().map(|p| &p.symbol),
            proxy_entry = ?position.proxy.as_ref().map(|p| p.entry_price),
            "Position opened"
        );
    }

    fn exited(&self, record: &TradeRecord) {
        info!(
            symbol = %record.symbol,
            side = %record.side,
            entry_price = %record.entry_price,
            exit_price = %record.exit_price,
            quantity = record.quantity,
            profit = %record.profit.round_dp(2),
            profit_pct = %record.profit_pct.round_dp(2),
            proxy_profit = ?record.proxy.as_ref().and_then(|p| p.profit),
            reason = %record.exit_reason,
            "Position closed"
        );
    }

    fn entry_skipped(&self, side: TradeSide, reason: &str) {
        warn!(side = %side, reason = %reason, "Entry skipped");
    }
}
