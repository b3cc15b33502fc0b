//! Day gate: decides whether today qualifies for trading at all.
//!
//! Rules, in order, first failure wins:
//! 1. today's open lies inside yesterday's range (inclusive);
//! 2. yesterday's open-to-close move, as a percentage of the close, is
//!    strictly below the configured threshold.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::models::MarketSnapshot;

/// Outcome of a single gate rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Human-readable trace of the gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayGateReport {
    pub checks: Vec<GateCheck>,
    pub prev_day_change_pct: Option<Decimal>,
}

impl DayGateReport {
    pub fn is_trade_day(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }
}

/// Previous day's absolute open-to-close move in percent of the close.
pub fn prev_day_change_pct(snapshot: &MarketSnapshot) -> Decimal {
    ((snapshot.prev_open() - snapshot.prev_close()) * dec!(100) / snapshot.prev_close()).abs()
}

/// Evaluate both rules and keep a trace of what was checked.
pub fn evaluate(snapshot: &MarketSnapshot, max_change_pct: Decimal) -> DayGateReport {
    let mut checks = Vec::with_capacity(2);

    let open_inside = snapshot.prev_low() <= snapshot.today_open()
        && snapshot.today_open() <= snapshot.prev_high();
    checks.push(GateCheck {
        name: "open_inside_prev_range",
        passed: open_inside,
        detail: format!(
            "today open {} {} prev range [{}, {}]",
            snapshot.today_open(),
            if open_inside { "inside" } else { "outside" },
            snapshot.prev_low(),
            snapshot.prev_high()
        ),
    });
    if !open_inside {
        return DayGateReport {
            checks,
            prev_day_change_pct: None,
        };
    }

    let change = prev_day_change_pct(snapshot);
    let calm = change < max_change_pct;
    checks.push(GateCheck {
        name: "prev_day_change",
        passed: calm,
        detail: format!(
            "prev day change {}% {} {}%",
            change.round_dp(2),
            if calm { "<" } else { ">=" },
            max_change_pct
        ),
    });

    DayGateReport {
        checks,
        prev_day_change_pct: Some(change),
    }
}

/// Convenience wrapper returning only the verdict.
pub fn is_trade_day(snapshot: &MarketSnapshot, max_change_pct: Decimal) -> bool {
    evaluate(snapshot, max_change_pct).is_trade_day()
}
