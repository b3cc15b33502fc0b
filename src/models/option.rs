//! Option-chain data used when trading a derivative proxy.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call
    CE,
    /// Put
    PE,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::CE => "CE",
            OptionType::PE => "PE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CE" => Some(OptionType::CE),
            "PE" => Some(OptionType::PE),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One listed expiry: calendar date plus the broker's expiry token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryEntry {
    pub date: NaiveDate,
    pub expiry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirySelection {
    pub date: NaiveDate,
    pub expiry_token: String,
    pub days_until_expiry: i64,
}

/// At-the-money strike plus one interval in-the-money on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrikeSelection {
    pub atm_strike: Decimal,
    pub call_1_itm: Decimal,
    pub put_1_itm: Decimal,
}

/// Row of an option-chain snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionQuote {
    pub strike: Decimal,
    pub option_type: OptionType,
    pub symbol: String,
    pub ltp: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_type_parse() {
        assert_eq!(OptionType::parse("ce"), Some(OptionType::CE));
        assert_eq!(OptionType::parse(" PE"), Some(OptionType::PE));
        assert_eq!(OptionType::parse(""), None);
    }
}
