//! Option proxy selection: expiry, strikes, and contract lookup.
//!
//! A long breakout buys the call one strike in-the-money, a short breakout
//! buys the put one strike in-the-money, both on the chosen expiry.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::TradeError;
use crate::models::{
    ExpiryEntry, ExpirySelection, OptionQuote, OptionType, ProxyInstrument, StrikeSelection,
    TradeSide,
};

/// Pick the expiry to trade.
///
/// Only expiries on or after `today` are considered. The nearest one is used
/// unless it is fewer than `min_days` away and a later one exists, in which
/// case the second nearest is used.
pub fn select_expiry(expiries: &[ExpiryEntry], today: NaiveDate, min_days: i64) -> Option<ExpirySelection> {
    let mut upcoming: Vec<&ExpiryEntry> = expiries.iter().filter(|e| e.date >= today).collect();
    upcoming.sort_by_key(|e| e.date);

    let nearest = *upcoming.first()?;
    let days = (nearest.date - today).num_days();

    let chosen = match upcoming.get(1) {
        Some(next) if days < min_days => *next,
        _ => nearest,
    };

    Some(ExpirySelection {
        date: chosen.date,
        expiry_token: chosen.expiry.clone(),
        days_until_expiry: (chosen.date - today).num_days(),
    })
}

/// ATM strike and the one-interval ITM call/put strikes around it.
///
/// Midpoints round to the even multiple of `interval`.
pub fn select_strikes(current_price: Decimal, interval: Decimal) -> StrikeSelection {
    let atm = (current_price / interval).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        * interval;
    StrikeSelection {
        atm_strike: atm,
        call_1_itm: atm - interval,
        put_1_itm: atm + interval,
    }
}

/// Option type and strike that express `side`.
pub fn contract_for(side: TradeSide, strikes: &StrikeSelection) -> (Decimal, OptionType) {
    match side {
        TradeSide::Long => (strikes.call_1_itm, OptionType::CE),
        TradeSide::Short => (strikes.put_1_itm, OptionType::PE),
    }
}

/// Find exactly one chain row matching `strike` and `option_type`.
pub fn resolve_contract<'a>(
    chain: &'a [OptionQuote],
    strike: Decimal,
    option_type: OptionType,
) -> Result<&'a OptionQuote, TradeError> {
    let mut matches = chain
        .iter()
        .filter(|q| q.strike == strike && q.option_type == option_type);

    match (matches.next(), matches.count()) {
        (Some(quote), 0) => Ok(quote),
        (Some(_), extra) => Err(TradeError::DerivativeResolutionAmbiguous {
            strike,
            option_type,
            matches: extra + 1,
        }),
        (None, _) => Err(TradeError::DerivativeNotFound {
            strike,
            option_type,
        }),
    }
}

/// Resolve the proxy instrument for a signal at `underlying_price`.
pub fn select_proxy(
    side: TradeSide,
    underlying_price: Decimal,
    interval: Decimal,
    chain: &[OptionQuote],
) -> Result<ProxyInstrument, TradeError> {
    let strikes = select_strikes(underlying_price, interval);
    let (strike, option_type) = contract_for(side, &strikes);
    let quote = resolve_contract(chain, strike, option_type)?;

    Ok(ProxyInstrument {
        symbol: quote.symbol.clone(),
        option_type,
        strike,
        side: TradeSide::Long,
        entry_price: quote.ltp,
    })
}
