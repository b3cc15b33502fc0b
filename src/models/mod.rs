//! Data models for snapshots, positions, trade records, and option chains.

mod option;
mod position;
mod snapshot;
mod trade;

pub use option::{ExpiryEntry, ExpirySelection, OptionQuote, OptionType, StrikeSelection};
pub use position::{Position, ProxyInstrument};
pub use snapshot::{DailyOhlc, MarketSnapshot};
pub use trade::{ExitReason, OrderSide, ProxyOutcome, TradeRecord, TradeSide, LOG_SEPARATOR_WIDTH};
