//! Error kinds raised by the trading core and its collaborators.
//!
//! Pure components (day gate, signals, sizer) never fail. Everything that can
//! fail in the lifecycle or at its edges returns one of these, so the driver
//! can tell a transient quote problem from a rejected order or a bad config.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::OptionType;

#[derive(Debug, Error)]
pub enum TradeError {
    /// Missing or placeholder credentials, or nonsensical risk settings.
    /// Fatal: the bot aborts before any trading.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// No usable last traded price this tick. Transient.
    #[error("Quote unavailable for {symbol}")]
    QuoteUnavailable { symbol: String },

    /// Broker answered an order with a non-ok status.
    #[error("Order rejected for {symbol}: status={status} {message}")]
    OrderRejected {
        symbol: String,
        status: String,
        message: String,
    },

    /// Exit attempted while flat.
    #[error("No active position to exit")]
    NoActivePosition,

    /// Entry attempted after the session's single round trip completed.
    #[error("Trade limit reached for this session")]
    TradeLimitReached,

    #[error("No option contract found for strike {strike} {option_type}")]
    DerivativeNotFound {
        strike: Decimal,
        option_type: OptionType,
    },

    #[error("{matches} option contracts match strike {strike} {option_type}")]
    DerivativeResolutionAmbiguous {
        strike: Decimal,
        option_type: OptionType,
        matches: usize,
    },

    #[error("Invalid market snapshot: {0}")]
    InvalidSnapshot(String),
}

impl TradeError {
    /// True for errors where the driver should simply try again next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TradeError::QuoteUnavailable { .. } | TradeError::OrderRejected { .. }
        )
    }
}
