//! Trading logic: day gate, breakout signals, sizing, option proxy selection,
//! and the trade lifecycle.

mod config;
pub mod day_gate;
pub mod derivative;
mod events;
mod lifecycle;
mod position_sizer;
pub mod signal;

pub use config::{ProxyFailurePolicy, SizingMode, TradingConfig};
pub use day_gate::DayGateReport;
pub use events::{TracingEvents, TradeEvents};
pub use lifecycle::{EntryOutcome, TickDecision, TradeLifecycle};
pub use position_sizer::PositionSizer;
