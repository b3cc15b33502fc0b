//! Broker collaborators: market data and order placement.
//!
//! The trading core never calls these directly; the session driver resolves
//! quotes and orders and hands plain values to the lifecycle.

mod fyers_client;
mod paper;
mod types;

use anyhow::Result;
use rust_decimal::Decimal;

use crate::models::{DailyOhlc, ExpiryEntry, OptionQuote, OrderSide};

pub use fyers_client::FyersClient;
pub use paper::PaperGateway;

/// Read-only market data.
#[allow(async_fn_in_trait)]
pub trait MarketData {
    /// Last completed daily candle before today.
    async fn previous_day_ohlc(&self, symbol: &str) -> Result<DailyOhlc>;

    /// Last traded price. Fails with `TradeError::QuoteUnavailable` when the
    /// broker has no price.
    async fn last_traded_price(&self, symbol: &str) -> Result<Decimal>;

    async fn today_open(&self, symbol: &str) -> Result<Decimal>;

    async fn option_expiries(&self, underlying: &str) -> Result<Vec<ExpiryEntry>>;

    async fn option_chain(&self, underlying: &str, expiry_token: &str) -> Result<Vec<OptionQuote>>;
}

/// Order placement.
#[allow(async_fn_in_trait)]
pub trait OrderGateway {
    /// Place a market order. A returned ack may still carry a non-ok status.
    async fn place_order(&self, symbol: &str, side: OrderSide, quantity: u32) -> Result<OrderAck>;
}

/// Broker acknowledgement of an order.
#[derive(Debug, Clone)]
pub struct OrderAck {
    pub status: String,
    pub message: String,
    pub order_id: Option<String>,
    /// Raw response body for logging
    pub raw: serde_json::Value,
}

impl OrderAck {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
