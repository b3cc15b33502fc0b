//! Intraday Breakout Trader
//!
//! Trades a breakout of the previous day's range on quiet days, optionally
//! through an in-the-money option, with one position and a range-edge stop.

mod api;
mod config;
mod error;
mod models;
mod session;
mod sink;
mod trading;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{FyersClient, MarketData, OrderGateway, PaperGateway};
use crate::config::AppConfig;
use crate::models::{OptionType, TradeSide};
use crate::session::Session;
use crate::sink::{ConsoleTradeLog, FanoutSink, FileTradeLog};
use crate::trading::derivative::{contract_for, resolve_contract, select_expiry, select_strikes};

/// Previous-day range breakout trader CLI.
#[derive(Parser)]
#[command(name = "breakout-trader")]
#[command(about = "Trade breakouts of the previous day's range", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.json", env = "TRADER_CONFIG")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "TRADER_LOG_LEVEL")]
    log_level: String,

    /// Dry run (don't send orders)
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run today's session until market close
    Run,

    /// Evaluate today's day gate and exit
    CheckDay,

    /// Show expiry, strikes and proxy contracts for the option underlying
    Chain,

    /// Show the effective configuration
    Config,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Init { force } = cli.command {
        return init_config(&cli.config, force);
    }

    let mut config = AppConfig::load_or_create(&cli.config)?;
    config.apply_env();

    match cli.command {
        Commands::Run => {
            config.validate()?;
            let market = fyers_client(&config)?;

            println!("\n=== Breakout Trader ===");
            println!("Symbol:         {}", config.symbol);
            println!("Gate check at:  {}", config.session.gate_check_at);
            println!("Market close:   {}", config.session.market_close);
            println!("Trade log:      {}", config.trade_log_path);
            println!("Mode:           {}", if cli.dry_run { "DRY RUN (no real orders)" } else { "LIVE TRADING" });
            println!("\nPress Ctrl+C to stop.\n");

            if cli.dry_run {
                run_session(config, market, PaperGateway, true).await?;
            } else {
                let orders = market.clone();
                run_session(config, market, orders, false).await?;
            }
        }

        Commands::CheckDay => {
            config.validate()?;
            let market = fyers_client(&config)?;
            let mut session = Session::new(config, market, PaperGateway, FanoutSink::new())?;

            let report = session.prepare().await?;

            println!("\n=== Day Gate ===");
            for check in &report.checks {
                println!("  [{}] {:<24} {}", if check.passed { "PASS" } else { "FAIL" }, check.name, check.detail);
            }
            println!("\nTrade day: {}", if report.is_trade_day() { "Yes" } else { "No" });
        }

        Commands::Chain => {
            config.validate()?;
            let market = fyers_client(&config)?;
            show_chain(&config, &market).await?;
        }

        Commands::Config => {
            let t = &config.trading;
            let s = &config.session;

            println!("\n=== Configuration ({}) ===\n", cli.config.display());
            println!("Broker:");
            println!("  Client ID:            {}", config.client_id);
            println!("  Credentials set:      {}", if config.has_credentials() { "Yes" } else { "No" });
            println!("  Symbol:               {}", config.symbol);
            println!("  Trade Log:            {}", config.trade_log_path);

            println!("\nSizing:");
            println!("  Mode:                 {:?}", t.sizing_mode);
            println!("  Capital:              {}", t.capital);
            println!("  Risk Per Trade:       {}%", t.risk_per_trade_pct);
            println!("  Fixed Quantity:       {}", t.fixed_quantity);

            println!("\nRules:");
            println!("  Max Prev Day Change:  {}%", t.max_prev_day_change_pct);
            println!("  Multiple Trades:      {}", t.allow_multiple_trades);

            println!("\nOption Proxy:");
            println!("  Enabled:              {}", t.use_option_proxy);
            println!("  Underlying:           {}", t.option_underlying);
            println!("  Strike Interval:      {}", t.strike_interval);
            println!("  Min Days To Expiry:   {}", t.min_days_to_expiry);
            println!("  On Failure:           {:?}", t.proxy_failure_policy);

            println!("\nSession ({}):", s.timezone);
            println!("  Market Open:          {}", s.market_open);
            println!("  Gate Check:           {}", s.gate_check_at);
            println!("  Market Close:         {}", s.market_close);
            println!("  Poll Interval:        {}s", s.poll_interval_secs);

            match config.validate_strategy() {
                Ok(()) => println!("\nStrategy settings are valid."),
                Err(e) => println!("\n{}", e),
            }
        }

        Commands::Init { .. } => unreachable!("handled before loading config"),
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("{} already exists. Use --force to overwrite.", path.display());
        return Ok(());
    }
    AppConfig::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    println!("Set client_id and access_token (or FYERS_CLIENT_ID / FYERS_ACCESS_TOKEN) before running.");
    Ok(())
}

fn fyers_client(config: &AppConfig) -> Result<FyersClient> {
    let client = FyersClient::new(&config.client_id, &config.access_token, config.session.tz()?)?
        .with_strike_count(config.trading.strike_count);
    Ok(client)
}

async fn run_session<O: OrderGateway>(config: AppConfig, market: FyersClient, orders: O, dry_run: bool) -> Result<()> {
    let tz = config.session.tz()?;
    let file_log = FileTradeLog::new(&config.trade_log_path, tz);
    info!(path = %file_log.path().display(), "Recording trades");

    let mut sinks = FanoutSink::new().with(file_log);
    if dry_run {
        sinks = sinks.with(ConsoleTradeLog::new(tz));
    }

    let mut session = Session::new(config, market, orders, sinks)?.dry_run(dry_run);
    let summary = session.run().await?;

    println!("\n{}", summary);
    Ok(())
}

async fn show_chain(config: &AppConfig, market: &FyersClient) -> Result<()> {
    let t = &config.trading;
    let tz = config.session.tz()?;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let price = market.last_traded_price(&t.option_underlying).await?;
    let expiries = market.option_expiries(&t.option_underlying).await?;
    let expiry = select_expiry(&expiries, today, t.min_days_to_expiry)
        .with_context(|| format!("No upcoming expiry for {}", t.option_underlying))?;
    let strikes = select_strikes(price, t.strike_interval);

    println!("\n=== Option Chain: {} ===", t.option_underlying);
    println!("Underlying LTP:  {}", price);
    println!("Expiry:          {} ({} days)", expiry.date, expiry.days_until_expiry);
    println!("ATM Strike:      {}", strikes.atm_strike);
    println!("1 ITM Call:      {}", strikes.call_1_itm);
    println!("1 ITM Put:       {}", strikes.put_1_itm);

    let chain = market.option_chain(&t.option_underlying, &expiry.expiry_token).await?;
    println!("\n{:<8} {:<8} {:>10} {:<30}", "SIGNAL", "TYPE", "LTP", "CONTRACT");
    println!("{}", "-".repeat(60));
    for side in [TradeSide::Long, TradeSide::Short] {
        let (strike, option_type) = contract_for(side, &strikes);
        match resolve_contract(&chain, strike, option_type) {
            Ok(q) => println!("{:<8} {:<8} {:>10} {:<30}", side.as_str(), option_label(option_type, strike), q.ltp, q.symbol),
            Err(e) => println!("{:<8} {:<8} {:>10} {}", side.as_str(), option_label(option_type, strike), "-", e),
        }
    }
    Ok(())
}

fn option_label(option_type: OptionType, strike: Decimal) -> String {
    format!("{}{}", strike, option_type)
}
