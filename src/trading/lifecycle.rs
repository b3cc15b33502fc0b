//! Trade lifecycle: the state machine owning the single position.
//!
//! `Flat -> Open -> Flat` when re-entry is allowed, otherwise
//! `Flat -> Open -> Done` for the rest of the session. Callers serialize
//! access; nothing here blocks or performs I/O.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::TradeError;
use crate::models::{
    ExitReason, MarketSnapshot, Position, ProxyInstrument, ProxyOutcome, TradeRecord, TradeSide,
};

use super::events::{TracingEvents, TradeEvents};
use super::signal::{detect_entry, detect_exit};
use super::{PositionSizer, TradingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Flat,
    Open,
    /// A round trip completed and re-entry is disabled.
    Done,
}

/// What the driver should do with the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Flat and no breakout.
    Wait,
    /// Flat and price broke out of the range.
    Enter(TradeSide),
    /// Open and the stop has not been touched.
    Hold,
    /// Open and the stop was touched.
    Exit(ExitReason),
    /// Session's trade budget is used up.
    Finished,
}

/// Entry computed from a signal, ready to be sent to the broker.
///
/// Only the lifecycle builds these, so the stop and quantity always follow
/// the session's snapshot and sizing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPlan {
    side: TradeSide,
    price: Decimal,
    stop_level: Decimal,
    quantity: u32,
    proxy: Option<ProxyInstrument>,
}

impl EntryPlan {
    pub fn side(&self) -> TradeSide {
        self.side
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn stop_level(&self) -> Decimal {
        self.stop_level
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn proxy(&self) -> Option<&ProxyInstrument> {
        self.proxy.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Opened(Position),
    /// A position was already open; nothing changed.
    AlreadyOpen(Position),
}

impl EntryOutcome {
    pub fn position(&self) -> &Position {
        match self {
            EntryOutcome::Opened(p) | EntryOutcome::AlreadyOpen(p) => p,
        }
    }
}

pub struct TradeLifecycle {
    symbol: String,
    snapshot: MarketSnapshot,
    sizer: PositionSizer,
    allow_multiple_trades: bool,
    events: Arc<dyn TradeEvents>,
    position: Option<Position>,
    completed: Vec<TradeRecord>,
}

impl TradeLifecycle {
    pub fn new(symbol: impl Into<String>, snapshot: MarketSnapshot, config: &TradingConfig) -> Self {
        Self::with_events(symbol, snapshot, config, Arc::new(TracingEvents))
    }

    pub fn with_events(
        symbol: impl Into<String>,
        snapshot: MarketSnapshot,
        config: &TradingConfig,
        events: Arc<dyn TradeEvents>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            snapshot,
            sizer: PositionSizer::new(config),
            allow_multiple_trades: config.allow_multiple_trades,
            events,
            position: None,
            completed: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> LifecycleState {
        if self.position.is_some() {
            LifecycleState::Open
        } else if !self.allow_multiple_trades && !self.completed.is_empty() {
            LifecycleState::Done
        } else {
            LifecycleState::Flat
        }
    }

    pub fn has_open_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn completed_trades(&self) -> &[TradeRecord] {
        &self.completed
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.completed.iter().map(|t| t.profit).sum()
    }

    /// Map a live price to the action for this tick.
    pub fn evaluate(&self, ltp: Decimal) -> TickDecision {
        let (high, low) = (self.snapshot.prev_high(), self.snapshot.prev_low());
        match self.state() {
            LifecycleState::Open => match &self.position {
                Some(pos) if detect_exit(ltp, pos.side, high, low) => {
                    TickDecision::Exit(ExitReason::StopLoss)
                }
                _ => TickDecision::Hold,
            },
            LifecycleState::Flat => match detect_entry(ltp, high, low) {
                Some(side) => TickDecision::Enter(side),
                None => TickDecision::Wait,
            },
            LifecycleState::Done => TickDecision::Finished,
        }
    }

    /// Stop level for a position in `side`: the range edge that was not broken.
    pub fn stop_for(&self, side: TradeSide) -> Decimal {
        match side {
            TradeSide::Long => self.snapshot.prev_low(),
            TradeSide::Short => self.snapshot.prev_high(),
        }
    }

    /// Compute stop and quantity for an entry at `ltp`.
    pub fn plan_entry(&self, side: TradeSide, ltp: Decimal, proxy: Option<ProxyInstrument>) -> EntryPlan {
        let stop_level = self.stop_for(side);
        EntryPlan {
            side,
            price: ltp,
            stop_level,
            quantity: self.sizer.quantity(ltp, stop_level),
            proxy,
        }
    }

    /// Open a position from a plan whose order the broker accepted.
    ///
    /// While open this is a no-op returning the existing position.
    pub fn enter(&mut self, plan: EntryPlan, now: DateTime<Utc>) -> Result<EntryOutcome, TradeError> {
        if let Some(existing) = &self.position {
            return Ok(EntryOutcome::AlreadyOpen(existing.clone()));
        }
        if self.state() == LifecycleState::Done {
            return Err(TradeError::TradeLimitReached);
        }

        let position = Position {
            symbol: self.symbol.clone(),
            side: plan.side,
            entry_price: plan.price,
            entry_time: now,
            stop_level: plan.stop_level,
            quantity: plan.quantity,
            proxy: plan.proxy,
        };
        self.events.entered(&position);
        self.position = Some(position.clone());

        Ok(EntryOutcome::Opened(position))
    }

    /// Close the open position at `ltp` and produce its trade record.
    ///
    /// `proxy_exit` is the fresh quote for the proxy contract, if one is held
    /// and a quote could be fetched.
    pub fn exit(
        &mut self,
        ltp: Decimal,
        proxy_exit: Option<Decimal>,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Result<TradeRecord, TradeError> {
        let position = self.position.take().ok_or(TradeError::NoActivePosition)?;

        let profit = position.side.pnl(position.entry_price, ltp, position.quantity);
        let notional = position.entry_price * Decimal::from(position.quantity);
        let profit_pct = if notional.is_zero() {
            Decimal::ZERO
        } else {
            profit / notional * dec!(100)
        };

        let proxy = position.proxy.as_ref().map(|p| ProxyOutcome {
            symbol: p.symbol.clone(),
            side: p.side,
            entry_price: p.entry_price,
            exit_price: proxy_exit,
            profit: proxy_exit.map(|exit| p.pnl(exit, position.quantity)),
        });

        let record = TradeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: position.symbol,
            side: position.side,
            quantity: position.quantity,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time: now,
            exit_price: ltp,
            stop_level: position.stop_level,
            profit,
            profit_pct,
            proxy,
            exit_reason: reason,
        };

        self.events.exited(&record);
        self.completed.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::models::{DailyOhlc, OptionType};
    use crate::trading::{DayGateReport, SizingMode};

    #[derive(Default)]
    struct RecordingEvents {
        seen: Mutex<Vec<String>>,
    }

    impl TradeEvents for RecordingEvents {
        fn day_gate(&self, _: &str, _: &MarketSnapshot, _: &DayGateReport) {}

        fn entered(&self, position: &Position) {
            self.seen.lock().unwrap().push(format!("enter {}", position.side));
        }

        fn exited(&self, record: &TradeRecord) {
            self.seen.lock().unwrap().push(format!("exit {}", record.profit));
        }

        fn entry_skipped(&self, _: TradeSide, _: &str) {}
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot::new(
            DailyOhlc {
                open: dec!(100),
                high: dec!(105),
                low: dec!(98),
                close: dec!(100.2),
            },
            dec!(101),
        )
        .unwrap()
    }

    fn fixed_config(qty: u32) -> TradingConfig {
        TradingConfig {
            sizing_mode: SizingMode::Fixed,
            fixed_quantity: qty,
            ..Default::default()
        }
    }

    fn open(lc: &mut TradeLifecycle, side: TradeSide, ltp: Decimal) -> Position {
        let plan = lc.plan_entry(side, ltp, None);
        lc.enter(plan, Utc::now()).unwrap().position().clone()
    }

    #[test]
    fn test_long_round_trip_to_stop() {
        let events = Arc::new(RecordingEvents::default());
        let mut lc = TradeLifecycle::with_events("SBIN", snapshot(), &fixed_config(2), events.clone());

        assert_eq!(lc.evaluate(dec!(106)), TickDecision::Enter(TradeSide::Long));
        let pos = open(&mut lc, TradeSide::Long, dec!(106));
        assert_eq!(pos.stop_level, dec!(98));
        assert_eq!(lc.state(), LifecycleState::Open);

        assert_eq!(lc.evaluate(dec!(100)), TickDecision::Hold);
        assert_eq!(lc.evaluate(dec!(97)), TickDecision::Exit(ExitReason::StopLoss));

        let record = lc.exit(dec!(97), None, ExitReason::StopLoss, Utc::now()).unwrap();
        assert_eq!(record.profit, dec!(-18));
        assert!(record.profit < Decimal::ZERO);
        assert_eq!(record.profit_pct, dec!(-18) / dec!(212) * dec!(100));
        assert_eq!(record.exit_reason, ExitReason::StopLoss);
        assert!(record.proxy.is_none());

        assert_eq!(lc.state(), LifecycleState::Done);
        assert_eq!(lc.evaluate(dec!(110)), TickDecision::Finished);
        assert_eq!(
            *events.seen.lock().unwrap(),
            vec!["enter LONG".to_string(), "exit -18".to_string()]
        );
    }

    #[test]
    fn test_short_profit_mirrors_long() {
        let mut long_lc = TradeLifecycle::new("X", snapshot(), &fixed_config(3));
        open(&mut long_lc, TradeSide::Long, dec!(106));
        let long = long_lc.exit(dec!(97), None, ExitReason::Manual, Utc::now()).unwrap();

        let mut short_lc = TradeLifecycle::new("X", snapshot(), &fixed_config(3));
        let pos = open(&mut short_lc, TradeSide::Short, dec!(106));
        assert_eq!(pos.stop_level, dec!(105));
        let short = short_lc.exit(dec!(97), None, ExitReason::Manual, Utc::now()).unwrap();

        assert_eq!(long.profit, dec!(-27));
        assert_eq!(short.profit, -long.profit);
    }

    #[test]
    fn test_exit_while_flat_fails() {
        let mut lc = TradeLifecycle::new("X", snapshot(), &fixed_config(1));
        let err = lc
            .exit(dec!(100), None, ExitReason::SessionClose, Utc::now())
            .unwrap_err();
        assert!(matches!(err, TradeError::NoActivePosition));
        assert!(lc.completed_trades().is_empty());
    }

    #[test]
    fn test_enter_while_open_is_noop() {
        let mut lc = TradeLifecycle::new("X", snapshot(), &fixed_config(1));
        let first = open(&mut lc, TradeSide::Long, dec!(106));

        let plan = lc.plan_entry(TradeSide::Short, dec!(97), None);
        match lc.enter(plan, Utc::now()).unwrap() {
            EntryOutcome::AlreadyOpen(p) => assert_eq!(p, first),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(lc.position(), Some(&first));
    }

    #[test]
    fn test_single_trade_per_session() {
        let mut lc = TradeLifecycle::new("X", snapshot(), &fixed_config(1));
        open(&mut lc, TradeSide::Long, dec!(106));
        lc.exit(dec!(98), None, ExitReason::StopLoss, Utc::now()).unwrap();

        let plan = lc.plan_entry(TradeSide::Short, dec!(97), None);
        assert!(matches!(
            lc.enter(plan, Utc::now()),
            Err(TradeError::TradeLimitReached)
        ));
    }

    #[test]
    fn test_multiple_trades_when_allowed() {
        let config = TradingConfig {
            allow_multiple_trades: true,
            ..fixed_config(1)
        };
        let mut lc = TradeLifecycle::new("X", snapshot(), &config);
        open(&mut lc, TradeSide::Long, dec!(106));
        lc.exit(dec!(98), None, ExitReason::StopLoss, Utc::now()).unwrap();

        assert_eq!(lc.state(), LifecycleState::Flat);
        assert_eq!(lc.evaluate(dec!(97)), TickDecision::Enter(TradeSide::Short));
        open(&mut lc, TradeSide::Short, dec!(97));
        lc.exit(dec!(96), None, ExitReason::SessionClose, Utc::now()).unwrap();

        assert_eq!(lc.completed_trades().len(), 2);
        assert_eq!(lc.realized_pnl(), dec!(-8) + dec!(1));
    }

    #[test]
    fn test_risk_sizing_applied_at_entry() {
        let mut lc = TradeLifecycle::new("X", snapshot(), &TradingConfig::default());
        let pos = open(&mut lc, TradeSide::Long, dec!(106));
        // 1% of 100000 over 8 points
        assert_eq!(pos.quantity, 125);
    }

    #[test]
    fn test_proxy_profit_recorded() {
        let mut lc = TradeLifecycle::new("NIFTY", snapshot(), &fixed_config(2));
        let proxy = ProxyInstrument {
            symbol: "NIFTY100CE".to_string(),
            option_type: OptionType::CE,
            strike: dec!(100),
            side: TradeSide::Long,
            entry_price: dec!(7.5),
        };
        let plan = lc.plan_entry(TradeSide::Long, dec!(106), Some(proxy));
        lc.enter(plan, Utc::now()).unwrap();

        let record = lc
            .exit(dec!(108), Some(dec!(9)), ExitReason::SessionClose, Utc::now())
            .unwrap();
        let leg = record.proxy.unwrap();
        assert_eq!(leg.exit_price, Some(dec!(9)));
        assert_eq!(leg.profit, Some(dec!(3)));
        assert_eq!(record.profit, dec!(4));
    }

    #[test]
    fn test_proxy_without_exit_quote() {
        let mut lc = TradeLifecycle::new("NIFTY", snapshot(), &fixed_config(1));
        let proxy = ProxyInstrument {
            symbol: "NIFTY110PE".to_string(),
            option_type: OptionType::PE,
            strike: dec!(110),
            side: TradeSide::Long,
            entry_price: dec!(12),
        };
        let plan = lc.plan_entry(TradeSide::Short, dec!(97), Some(proxy));
        lc.enter(plan, Utc::now()).unwrap();

        let record = lc.exit(dec!(95), None, ExitReason::Manual, Utc::now()).unwrap();
        let leg = record.proxy.unwrap();
        assert!(leg.exit_price.is_none());
        assert!(leg.profit.is_none());
    }
}
