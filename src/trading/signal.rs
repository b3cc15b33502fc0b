//! Breakout signals against the previous day's range.

use rust_decimal::Decimal;

use crate::models::TradeSide;

/// Entry signal: a strict break above the previous high goes long, a strict
/// break below the previous low goes short. Touching a level does nothing.
pub fn detect_entry(ltp: Decimal, prev_high: Decimal, prev_low: Decimal) -> Option<TradeSide> {
    if ltp > prev_high {
        Some(TradeSide::Long)
    } else if ltp < prev_low {
        Some(TradeSide::Short)
    } else {
        None
    }
}

/// Exit signal: price trades back through the opposite range edge.
/// Unlike entry, touching the level counts.
pub fn detect_exit(ltp: Decimal, side: TradeSide, prev_high: Decimal, prev_low: Decimal) -> bool {
    match side {
        TradeSide::Long => ltp <= prev_low,
        TradeSide::Short => ltp >= prev_high,
    }
}
