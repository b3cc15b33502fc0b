//! Fyers API v3 client for quotes, history, option chains, and orders.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::{Client, Request};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TradeError;
use crate::models::{DailyOhlc, ExpiryEntry, OptionQuote, OptionType, OrderSide};

use super::types::*;
use super::{MarketData, OrderAck, OrderGateway};

const FYERS_API_BASE: &str = "https://api-t1.fyers.in";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
/// Calendar days of history requested to find the previous session.
const HISTORY_LOOKBACK_DAYS: i64 = 7;

/// Client for the Fyers REST API.
#[derive(Clone)]
pub struct FyersClient {
    client: Client,
    base_url: String,
    auth_header: String,
    tz: Tz,
    strike_count: u32,
}

impl FyersClient {
    /// Create a client authorised with `client_id:access_token`.
    pub fn new(client_id: &str, access_token: &str, tz: Tz) -> Result<Self> {
        Self::with_base_url(client_id, access_token, tz, FYERS_API_BASE.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(client_id: &str, access_token: &str, tz: Tz, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            auth_header: format!("{}:{}", client_id, access_token),
            tz,
            strike_count: 2,
        })
    }

    /// Strikes either side of ATM requested from the option chain.
    pub fn with_strike_count(mut self, strike_count: u32) -> Self {
        self.strike_count = strike_count;
        self
    }

    /// Authorised GET with `query` percent-encoded by reqwest.
    fn get_request(&self, path: &str, query: &[(&str, &str)]) -> Result<Request> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", &self.auth_header)
            .query(query)
            .build()
            .with_context(|| format!("Failed to build request for {}", path))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let request = self.get_request(path, query)?;
        debug!(url = %request.url(), "Fetching {}", what);

        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("Failed to fetch {}", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} request failed: {} - {}", what, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }

    async fn quote(&self, symbol: &str) -> Result<QuoteValues> {
        let resp: QuotesResponse = self
            .get_json("/data/quotes", &[("symbols", symbol)], "quotes")
            .await?;

        if resp.s != "ok" {
            warn!(symbol = %symbol, message = %resp.message, "Quote request not ok");
            return Err(TradeError::QuoteUnavailable {
                symbol: symbol.to_string(),
            }
            .into());
        }

        resp.d
            .into_iter()
            .find(|q| q.s == "ok")
            .map(|q| q.v)
            .ok_or_else(|| {
                TradeError::QuoteUnavailable {
                    symbol: symbol.to_string(),
                }
                .into()
            })
    }

    async fn chain(&self, underlying: &str, expiry_token: &str) -> Result<OptionChainData> {
        let strike_count = self.strike_count.to_string();
        let query = [
            ("symbol", underlying),
            ("strikecount", strike_count.as_str()),
            ("timestamp", expiry_token),
        ];
        let resp: OptionChainResponse = self
            .get_json("/data/options-chain-v3", &query, "option chain")
            .await?;

        if resp.s != "ok" {
            anyhow::bail!("Option chain request failed: {}", resp.message);
        }
        resp.data.context("Option chain response has no data")
    }
}

/// Pick the last candle dated strictly before `today`.
pub(crate) fn previous_session(candles: &[Candle], today: NaiveDate, tz: Tz) -> Option<DailyOhlc> {
    candles
        .iter()
        .filter(|c| {
            tz.timestamp_opt(c.0, 0)
                .single()
                .map(|t| t.date_naive() < today)
                .unwrap_or(false)
        })
        .max_by_key(|c| c.0)
        .map(|c| DailyOhlc {
            open: c.1,
            high: c.2,
            low: c.3,
            close: c.4,
        })
}

pub(crate) fn convert_expiries(entries: Vec<ExpiryDataEntry>) -> Vec<ExpiryEntry> {
    entries
        .into_iter()
        .filter_map(|e| match NaiveDate::parse_from_str(&e.date, "%d-%m-%Y") {
            Ok(date) => Some(ExpiryEntry {
                date,
                expiry: e.expiry,
            }),
            Err(err) => {
                warn!(date = %e.date, error = %err, "Unparseable expiry date");
                None
            }
        })
        .collect()
}

pub(crate) fn convert_chain(rows: Vec<OptionChainRow>) -> Vec<OptionQuote> {
    rows.into_iter()
        .filter_map(|r| {
            let option_type = OptionType::parse(&r.option_type)?;
            Some(OptionQuote {
                strike: r.strike_price,
                option_type,
                symbol: r.symbol,
                ltp: r.ltp,
            })
        })
        .collect()
}

impl MarketData for FyersClient {
    async fn previous_day_ohlc(&self, symbol: &str) -> Result<DailyOhlc> {
        let today = Utc::now().with_timezone(&self.tz).date_naive();
        let from = today - ChronoDuration::days(HISTORY_LOOKBACK_DAYS);
        let range_from = from.format("%Y-%m-%d").to_string();
        let range_to = today.format("%Y-%m-%d").to_string();
        let query = [
            ("symbol", symbol),
            ("resolution", "D"),
            ("date_format", "1"),
            ("range_from", range_from.as_str()),
            ("range_to", range_to.as_str()),
            ("cont_flag", "1"),
        ];

        let resp: HistoryResponse = self.get_json("/data/history", &query, "history").await?;
        if resp.s != "ok" {
            anyhow::bail!("History request failed for {}: {}", symbol, resp.message);
        }

        previous_session(&resp.candles, today, self.tz)
            .with_context(|| format!("No completed daily candle for {} before {}", symbol, today))
    }

    async fn last_traded_price(&self, symbol: &str) -> Result<Decimal> {
        self.quote(symbol).await?.lp.ok_or_else(|| {
            TradeError::QuoteUnavailable {
                symbol: symbol.to_string(),
            }
            .into()
        })
    }

    async fn today_open(&self, symbol: &str) -> Result<Decimal> {
        self.quote(symbol)
            .await?
            .open_price
            .filter(|p| *p > Decimal::ZERO)
            .with_context(|| format!("No opening price for {}", symbol))
    }

    async fn option_expiries(&self, underlying: &str) -> Result<Vec<ExpiryEntry>> {
        let data = self.chain(underlying, "").await?;
        Ok(convert_expiries(data.expiry_data))
    }

    async fn option_chain(&self, underlying: &str, expiry_token: &str) -> Result<Vec<OptionQuote>> {
        let data = self.chain(underlying, expiry_token).await?;
        Ok(convert_chain(data.options_chain))
    }
}

impl OrderGateway for FyersClient {
    async fn place_order(&self, symbol: &str, side: OrderSide, quantity: u32) -> Result<OrderAck> {
        let request = OrderRequest {
            symbol: symbol.to_string(),
            qty: quantity,
            order_type: 2,
            side: match side {
                OrderSide::Buy => 1,
                OrderSide::Sell => -1,
            },
            product_type: "INTRADAY".to_string(),
            limit_price: Decimal::ZERO,
            stop_price: Decimal::ZERO,
            validity: "DAY".to_string(),
            disclosed_qty: 0,
            offline_order: false,
        };

        let url = format!("{}/api/v3/orders/sync", self.base_url);
        debug!(symbol = %symbol, side = side.as_str(), qty = quantity, "Placing order");

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .json(&request)
            .send()
            .await
            .context("Failed to send order")?;

        let raw: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse order response")?;
        let parsed: OrderResponse =
            serde_json::from_value(raw.clone()).context("Unexpected order response shape")?;

        Ok(OrderAck {
            status: parsed.s,
            message: parsed.message,
            order_id: parsed.id,
            raw,
        })
    }
}
