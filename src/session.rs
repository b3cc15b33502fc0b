//! Session driver: one trading day from gate check to market close.
//!
//! Handles:
//! - Waiting for the gate check time and building the market snapshot
//! - Running the day gate
//! - Polling the last traded price and feeding the trade lifecycle
//! - Placing entry and exit orders, resolving the option proxy when enabled
//! - Forced exits on Ctrl-C and at market close

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::{MarketData, OrderGateway};
use crate::config::AppConfig;
use crate::error::TradeError;
use crate::models::{ExitReason, MarketSnapshot, Position, ProxyInstrument, TradeRecord, TradeSide};
use crate::sink::FanoutSink;
use crate::trading::derivative::{select_expiry, select_proxy};
use crate::trading::{
    day_gate, DayGateReport, EntryOutcome, ProxyFailurePolicy, TickDecision, TracingEvents,
    TradeEvents, TradeLifecycle,
};

/// Attempts made to flatten a position on shutdown or at market close.
const FORCED_EXIT_ATTEMPTS: u32 = 3;

/// Price requests made per tick before the tick is skipped.
const QUOTE_ATTEMPTS: u32 = 2;

pub struct Session<M, O> {
    config: AppConfig,
    tz: Tz,
    market: M,
    orders: O,
    sink: FanoutSink,
    events: Arc<dyn TradeEvents>,
    dry_run: bool,

    gate: Option<DayGateReport>,
    lifecycle: Option<TradeLifecycle>,
    failed_orders: usize,

    // Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl<M: MarketData, O: OrderGateway> Session<M, O> {
    pub fn new(config: AppConfig, market: M, orders: O, sink: FanoutSink) -> Result<Self> {
        let tz = config.session.tz()?;
        Ok(Self {
            config,
            tz,
            market,
            orders,
            sink,
            events: Arc::new(TracingEvents),
            dry_run: false,
            gate: None,
            lifecycle: None,
            failed_orders: 0,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Only labels the summary; the gateway decides whether orders are real.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn has_open_position(&self) -> bool {
        self.lifecycle
            .as_ref()
            .map(|lc| lc.has_open_position())
            .unwrap_or(false)
    }

    fn at_local(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    }

    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    fn market_close_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.at_local(self.today(now), self.config.session.market_close)
            .context("Market close does not exist in the session timezone today")
    }

    /// Why the session must stop trading at `now`, if it must.
    fn closing_reason(&self, now: DateTime<Utc>) -> Result<Option<ExitReason>> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(Some(ExitReason::Manual));
        }
        if now >= self.market_close_at(now)? {
            return Ok(Some(ExitReason::SessionClose));
        }
        Ok(None)
    }

    /// Build the snapshot and run the day gate. Arms the lifecycle on a trade day.
    pub async fn prepare(&mut self) -> Result<DayGateReport> {
        let symbol = self.config.symbol.clone();

        let prev_day = self
            .market
            .previous_day_ohlc(&symbol)
            .await
            .with_context(|| format!("Failed to fetch previous day candle for {}", symbol))?;
        let today_open = self
            .market
            .today_open(&symbol)
            .await
            .with_context(|| format!("Failed to fetch today's open for {}", symbol))?;

        let snapshot = MarketSnapshot::new(prev_day, today_open)?;
        let report = day_gate::evaluate(&snapshot, self.config.trading.max_prev_day_change_pct);
        self.events.day_gate(&symbol, &snapshot, &report);

        self.lifecycle = if report.is_trade_day() {
            Some(TradeLifecycle::with_events(
                symbol,
                snapshot,
                &self.config.trading,
                self.events.clone(),
            ))
        } else {
            None
        };
        self.gate = Some(report.clone());

        Ok(report)
    }

    /// Run the whole session and return its summary.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        // Register shutdown handler
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        });

        let now = Utc::now();
        let close_at = self.market_close_at(now)?;
        if now >= close_at {
            warn!(close = %self.config.session.market_close, "Market already closed for today");
            return Ok(self.summary());
        }

        self.wait_for_gate_check().await?;
        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(self.summary());
        }

        if !self.prepare().await?.is_trade_day() {
            return Ok(self.summary());
        }

        info!(
            symbol = %self.config.symbol,
            poll_interval = self.config.session.poll_interval_secs,
            close = %self.config.session.market_close,
            "Starting tick loop"
        );

        let mut ticker = interval(Duration::from_secs(self.config.session.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let now = Utc::now();
            let closing = self.closing_reason(now)?;
            if let Some(reason) = closing {
                info!(reason = %reason, "Session ending");
            }

            let Some(ltp) = self.poll_price().await else {
                if let Some(reason) = closing {
                    self.force_exit(reason).await;
                    break;
                }
                continue;
            };

            match self.process_tick(ltp, now).await {
                Ok(TickDecision::Finished) if closing.is_none() => {
                    info!("Trade completed for the session, stopping");
                    break;
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Error in session tick"),
            }

            if let Some(reason) = closing {
                // Retries a closing order the tick could not get accepted
                self.force_exit(reason).await;
                break;
            }
        }

        Ok(self.summary())
    }

    /// Last traded price of the session symbol, asking again after
    /// `quote_retry_delay_ms` when the first request fails.
    async fn poll_price(&self) -> Option<Decimal> {
        let symbol = self.config.symbol.as_str();
        let retry_delay = Duration::from_millis(self.config.session.quote_retry_delay_ms);

        for attempt in 1..=QUOTE_ATTEMPTS {
            match self.market.last_traded_price(symbol).await {
                Ok(ltp) => return Some(ltp),
                Err(e) => {
                    let transient = e
                        .downcast_ref::<TradeError>()
                        .map(|t| t.is_transient())
                        .unwrap_or(false);
                    if transient {
                        warn!(symbol = %symbol, attempt = attempt, error = %e, "No price this tick");
                    } else {
                        error!(symbol = %symbol, attempt = attempt, error = %e, "Price request failed");
                    }
                    if attempt < QUOTE_ATTEMPTS {
                        sleep(retry_delay).await;
                    }
                }
            }
        }
        None
    }

    async fn wait_for_gate_check(&self) -> Result<()> {
        let now = Utc::now();
        let gate_at = self
            .at_local(self.today(now), self.config.session.gate_check_at)
            .context("Gate check time does not exist in the session timezone today")?;

        if now >= gate_at {
            return Ok(());
        }

        info!(at = %self.config.session.gate_check_at, "Waiting for gate check");
        while Utc::now() < gate_at && !self.shutdown.load(Ordering::SeqCst) {
            let remaining = (gate_at - Utc::now()).to_std().unwrap_or_default();
            sleep(remaining.min(Duration::from_secs(1))).await;
        }
        Ok(())
    }

    /// Feed one price into the lifecycle and act on its decision.
    ///
    /// A failed entry leaves the session flat; a failed exit leaves the
    /// position open so the next tick tries again. From market close (or
    /// after a shutdown request) an open position is closed and no new
    /// entries are made.
    pub async fn process_tick(&mut self, ltp: Decimal, now: DateTime<Utc>) -> Result<TickDecision> {
        let lifecycle = self
            .lifecycle
            .as_ref()
            .context("Session has no active trade day")?;

        if let Some(reason) = self.closing_reason(now)? {
            if !lifecycle.has_open_position() {
                return Ok(TickDecision::Finished);
            }
            if let Err(e) = self.close(ltp, reason, now).await {
                self.failed_orders += 1;
                warn!(reason = %reason, error = %e, "Closing exit failed, position stays open");
            }
            return Ok(TickDecision::Exit(reason));
        }

        let decision = lifecycle.evaluate(ltp);
        debug!(ltp = %ltp, decision = ?decision, "Tick");

        match decision {
            TickDecision::Enter(side) => {
                if let Err(e) = self.open(side, ltp, now).await {
                    self.failed_orders += 1;
                    self.events.entry_skipped(side, &e.to_string());
                }
            }
            TickDecision::Exit(reason) => {
                if let Err(e) = self.close(ltp, reason, now).await {
                    self.failed_orders += 1;
                    warn!(error = %e, "Exit failed, position stays open");
                }
            }
            TickDecision::Hold => {
                if let Some(pos) = self.lifecycle.as_ref().and_then(|lc| lc.position()) {
                    debug!(unrealized = %pos.unrealized_pnl(ltp), "Holding");
                }
            }
            TickDecision::Wait | TickDecision::Finished => {}
        }

        Ok(decision)
    }

    async fn open(&mut self, side: TradeSide, ltp: Decimal, now: DateTime<Utc>) -> Result<()> {
        let proxy = if self.config.trading.use_option_proxy {
            match self.resolve_proxy(side, ltp, now).await {
                Ok(proxy) => Some(proxy),
                Err(e) => match self.config.trading.proxy_failure_policy {
                    ProxyFailurePolicy::UnderlyingOnly => {
                        warn!(side = %side, error = %e, "Proxy unavailable, trading the underlying");
                        None
                    }
                    ProxyFailurePolicy::Abort => {
                        return Err(e.context("Proxy unavailable, entry aborted"));
                    }
                },
            }
        } else {
            None
        };

        let lifecycle = self
            .lifecycle
            .as_mut()
            .context("Session has no active trade day")?;
        let plan = lifecycle.plan_entry(side, ltp, proxy);

        let (symbol, order_side) = match plan.proxy() {
            Some(p) => (p.symbol.clone(), p.side.entry_order()),
            None => (lifecycle.symbol().to_string(), side.entry_order()),
        };

        let ack = self
            .orders
            .place_order(&symbol, order_side, plan.quantity())
            .await
            .with_context(|| format!("Entry order for {} failed", symbol))?;
        if !ack.is_ok() {
            return Err(TradeError::OrderRejected {
                symbol,
                status: ack.status,
                message: ack.message,
            }
            .into());
        }
        info!(
            symbol = %symbol,
            order_id = ?ack.order_id,
            side = %plan.side(),
            price = %plan.price(),
            stop = %plan.stop_level(),
            quantity = plan.quantity(),
            "Entry order accepted"
        );

        if let EntryOutcome::AlreadyOpen(p) = lifecycle.enter(plan, now)? {
            warn!(symbol = %p.symbol, "Entry ignored, position already open");
        }
        Ok(())
    }

    async fn resolve_proxy(&self, side: TradeSide, ltp: Decimal, now: DateTime<Utc>) -> Result<ProxyInstrument> {
        let trading = &self.config.trading;
        let underlying = trading.option_underlying.as_str();

        let underlying_price = if underlying == self.config.symbol {
            ltp
        } else {
            self.market.last_traded_price(underlying).await?
        };

        let expiries = self.market.option_expiries(underlying).await?;
        let expiry = select_expiry(&expiries, self.today(now), trading.min_days_to_expiry)
            .with_context(|| format!("No upcoming expiry for {}", underlying))?;
        debug!(
            expiry = %expiry.date,
            days = expiry.days_until_expiry,
            "Expiry selected"
        );

        let chain = self.market.option_chain(underlying, &expiry.expiry_token).await?;
        let proxy = select_proxy(side, underlying_price, trading.strike_interval, &chain)?;

        info!(
            symbol = %proxy.symbol,
            strike = %proxy.strike,
            option_type = %proxy.option_type,
            ltp = %proxy.entry_price,
            "Proxy resolved"
        );
        Ok(proxy)
    }

    async fn close(&mut self, ltp: Decimal, reason: ExitReason, now: DateTime<Utc>) -> Result<TradeRecord> {
        let position = self
            .lifecycle
            .as_ref()
            .and_then(|lc| lc.position())
            .cloned()
            .ok_or(TradeError::NoActivePosition)?;

        let symbol = position.order_symbol().to_string();
        let order_side = match &position.proxy {
            Some(p) => p.side.exit_order(),
            None => position.side.exit_order(),
        };

        let ack = self
            .orders
            .place_order(&symbol, order_side, position.quantity)
            .await
            .with_context(|| format!("Exit order for {} failed", symbol))?;
        if !ack.is_ok() {
            return Err(TradeError::OrderRejected {
                symbol,
                status: ack.status,
                message: ack.message,
            }
            .into());
        }
        info!(symbol = %symbol, order_id = ?ack.order_id, reason = %reason, "Exit order accepted");

        let proxy_exit = match &position.proxy {
            Some(p) => match self.market.last_traded_price(&p.symbol).await {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!(symbol = %p.symbol, error = %e, "No exit quote for proxy");
                    None
                }
            },
            None => None,
        };

        let lifecycle = self
            .lifecycle
            .as_mut()
            .context("Session has no active trade day")?;
        let record = lifecycle.exit(ltp, proxy_exit, reason, now)?;
        self.sink.record_all(&record);

        Ok(record)
    }

    /// Flatten any open position, retrying a few times on a missing quote or
    /// a rejected order.
    async fn force_exit(&mut self, reason: ExitReason) {
        let retry_delay = Duration::from_millis(self.config.session.quote_retry_delay_ms);

        for attempt in 1..=FORCED_EXIT_ATTEMPTS {
            if !self.has_open_position() {
                return;
            }

            let result = match self.market.last_traded_price(&self.config.symbol).await {
                Ok(ltp) => self.close(ltp, reason, Utc::now()).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => return,
                Err(e) => {
                    self.failed_orders += 1;
                    warn!(attempt = attempt, reason = %reason, error = %e, "Forced exit failed");
                    sleep(retry_delay).await;
                }
            }
        }

        if self.has_open_position() {
            error!(reason = %reason, "Position still open after forced exit attempts");
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let (trades, realized_pnl, open_position) = match &self.lifecycle {
            Some(lc) => (
                lc.completed_trades().to_vec(),
                lc.realized_pnl(),
                lc.position().cloned(),
            ),
            None => (Vec::new(), Decimal::ZERO, None),
        };

        SessionSummary {
            symbol: self.config.symbol.clone(),
            trade_day: self.gate.as_ref().map(|g| g.is_trade_day()),
            prev_day_change_pct: self.gate.as_ref().and_then(|g| g.prev_day_change_pct),
            trades,
            realized_pnl,
            open_position,
            failed_orders: self.failed_orders,
            dry_run: self.dry_run,
        }
    }
}

/// End-of-session statistics.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub symbol: String,
    /// `None` when the gate was never evaluated
    pub trade_day: Option<bool>,
    pub prev_day_change_pct: Option<Decimal>,
    pub trades: Vec<TradeRecord>,
    pub realized_pnl: Decimal,
    pub open_position: Option<Position>,
    pub failed_orders: usize,
    pub dry_run: bool,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(f, "Symbol:          {}", self.symbol)?;
        writeln!(
            f,
            "Trade Day:       {}",
            match self.trade_day {
                Some(true) => "Yes",
                Some(false) => "No",
                None => "Not evaluated",
            }
        )?;
        if let Some(change) = self.prev_day_change_pct {
            writeln!(f, "Prev Day Change: {:.2}%", change)?;
        }
        let winners = self.trades.iter().filter(|t| t.is_winner()).count();
        writeln!(f, "Trades:          {} (Winners: {})", self.trades.len(), winners)?;
        for trade in &self.trades {
            writeln!(
                f,
                "  {} {} x{} {:.2} -> {:.2} P&L {:.2} ({})",
                trade.side,
                trade.symbol,
                trade.quantity,
                trade.entry_price,
                trade.exit_price,
                trade.profit,
                trade.exit_reason
            )?;
        }
        writeln!(f, "Realized P&L:    {:.2}", self.realized_pnl)?;
        if let Some(pos) = &self.open_position {
            writeln!(
                f,
                "Open Position:   {} {} x{} @ {:.2}",
                pos.side, pos.symbol, pos.quantity, pos.entry_price
            )?;
        }
        writeln!(f, "Failed Orders:   {}", self.failed_orders)?;
        writeln!(f, "Mode:            {}", if self.dry_run { "Dry Run" } else { "Live" })?;
        Ok(())
    }
}
