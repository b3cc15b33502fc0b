//! Response and request types for the Fyers REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily candle: `[epoch_secs, open, high, low, close, volume]`.
pub type Candle = (i64, Decimal, Decimal, Decimal, Decimal, Decimal);

/// Response from `/data/history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub s: String,
    #[serde(default)]
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub message: String,
}

/// Response from `/data/quotes`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotesResponse {
    pub s: String,
    #[serde(default)]
    pub d: Vec<QuoteEntry>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteEntry {
    pub s: String,
    pub v: QuoteValues,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteValues {
    /// Last traded price
    #[serde(default)]
    pub lp: Option<Decimal>,
    #[serde(default)]
    pub open_price: Option<Decimal>,
}

/// Response from `/data/options-chain-v3`.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionChainResponse {
    pub s: String,
    #[serde(default)]
    pub message: String,
    pub data: Option<OptionChainData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainData {
    #[serde(default)]
    pub expiry_data: Vec<ExpiryDataEntry>,
    #[serde(default)]
    pub options_chain: Vec<OptionChainRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpiryDataEntry {
    /// `dd-mm-yyyy`
    pub date: String,
    pub expiry: String,
}

/// Chain row. The underlying itself appears with an empty option type.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionChainRow {
    #[serde(default)]
    pub strike_price: Decimal,
    #[serde(default)]
    pub option_type: String,
    pub symbol: String,
    #[serde(default)]
    pub ltp: Decimal,
}

/// Body for `/api/v3/orders/sync`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: u32,
    /// 2 = market order
    #[serde(rename = "type")]
    pub order_type: u8,
    /// 1 = buy, -1 = sell
    pub side: i8,
    pub product_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub limit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub stop_price: Decimal,
    pub validity: String,
    pub disclosed_qty: u32,
    pub offline_order: bool,
}

/// Response from order placement.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub s: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_history() {
        let body = r#"{"s":"ok","candles":[[1736121600,100,105,98,101.5,12000],[1736208000,101.5,103,100,102,9000]]}"#;
        let resp: HistoryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.candles.len(), 2);
        assert_eq!(resp.candles[0].4, dec!(101.5));
    }

    #[test]
    fn test_parse_option_chain() {
        let body = r#"{"s":"ok","code":200,"message":"","data":{
            "expiryData":[{"date":"09-01-2025","expiry":"1736416800"}],
            "optionsChain":[
                {"strike_price":-1,"option_type":"","symbol":"NSE:NIFTY50-INDEX","ltp":24010.5},
                {"strike_price":24000,"option_type":"CE","symbol":"NSE:NIFTY2510924000CE","ltp":120.35}
            ]}}"#;
        let resp: OptionChainResponse = serde_json::from_str(body).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.expiry_data[0].expiry, "1736416800");
        assert_eq!(data.options_chain[1].strike_price, dec!(24000));
        assert_eq!(data.options_chain[1].option_type, "CE");
    }

    #[test]
    fn test_order_request_shape() {
        let req = OrderRequest {
            symbol: "NSE:SBIN-EQ".to_string(),
            qty: 3,
            order_type: 2,
            side: -1,
            product_type: "INTRADAY".to_string(),
            limit_price: Decimal::ZERO,
            stop_price: Decimal::ZERO,
            validity: "DAY".to_string(),
            disclosed_qty: 0,
            offline_order: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], 2);
        assert_eq!(json["side"], -1);
        assert_eq!(json["productType"], "INTRADAY");
        assert_eq!(json["offlineOrder"], false);
        assert_eq!(json["limitPrice"], 0.0);
    }
}
