//! Append-only sinks for completed trade records.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::models::TradeRecord;

/// Destination for completed trades. Failures are reported, never fatal.
pub trait TradeSink {
    fn record(&self, trade: &TradeRecord) -> Result<()>;
}

/// Appends one text block per trade to a file.
#[derive(Debug, Clone)]
pub struct FileTradeLog {
    path: PathBuf,
    tz: Tz,
}

impl FileTradeLog {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        Self {
            path: path.into(),
            tz,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TradeSink for FileTradeLog {
    fn record(&self, trade: &TradeRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open trade log {}", self.path.display()))?;

        file.write_all(trade.to_log_block(self.tz, Utc::now()).as_bytes())
            .with_context(|| format!("Failed to write trade log {}", self.path.display()))?;

        info!(path = %self.path.display(), trade_id = %trade.id, "Trade logged");
        Ok(())
    }
}

/// Prints each trade block to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleTradeLog {
    tz: Tz,
}

impl ConsoleTradeLog {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl TradeSink for ConsoleTradeLog {
    fn record(&self, trade: &TradeRecord) -> Result<()> {
        print!("{}", trade.to_log_block(self.tz, Utc::now()));
        Ok(())
    }
}

/// Fans a record out to several sinks; one failing does not stop the rest.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn TradeSink + Send + Sync>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl TradeSink + Send + Sync + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Record to every sink, logging failures. Returns how many succeeded.
    pub fn record_all(&self, trade: &TradeRecord) -> usize {
        let mut ok = 0;
        for sink in &self.sinks {
            match sink.record(trade) {
                Ok(()) => ok += 1,
                Err(e) => warn!(trade_id = %trade.id, error = %e, "Failed to record trade"),
            }
        }
        ok
    }
}

impl TradeSink for FanoutSink {
    fn record(&self, trade: &TradeRecord) -> Result<()> {
        self.record_all(trade);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;
    use rust_decimal_macros::dec;

    use crate::models::{ExitReason, TradeSide, LOG_SEPARATOR_WIDTH};

    fn trade(id: &str) -> TradeRecord {
        TradeRecord {
            id: id.to_string(),
            symbol: "NSE:SBIN-EQ".to_string(),
            side: TradeSide::Short,
            quantity: 10,
            entry_time: Utc.with_ymd_and_hms(2025, 1, 6, 4, 0, 0).unwrap(),
            entry_price: dec!(97),
            exit_time: Utc.with_ymd_and_hms(2025, 1, 6, 9, 45, 0).unwrap(),
            exit_price: dec!(95.5),
            stop_level: dec!(105),
            profit: dec!(15),
            profit_pct: dec!(1.5463),
            proxy: None,
            exit_reason: ExitReason::SessionClose,
        }
    }

    fn temp_log() -> PathBuf {
        std::env::temp_dir().join(format!("trade-log-{}.txt", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_file_log_appends_blocks() {
        let path = temp_log();
        let log = FileTradeLog::new(&path, Kolkata);

        log.record(&trade("a")).unwrap();
        log.record(&trade("b")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let sep = "=".repeat(LOG_SEPARATOR_WIDTH);
        assert_eq!(contents.matches("Trade Log Entry - ").count(), 2);
        assert_eq!(contents.lines().filter(|l| *l == sep).count(), 6);
        assert!(contents.contains("trade_id: a"));
        assert!(contents.contains("trade_id: b"));
        assert!(contents.contains("exit_datetime: 2025-01-06 15:15:00"));
        assert!(contents.contains("profit_percentage: 1.55"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_fanout_survives_failing_sink() {
        struct Broken;
        impl TradeSink for Broken {
            fn record(&self, _: &TradeRecord) -> Result<()> {
                anyhow::bail!("disk full")
            }
        }

        let path = temp_log();
        let fanout = FanoutSink::new()
            .with(Broken)
            .with(FileTradeLog::new(&path, Kolkata));

        assert_eq!(fanout.record_all(&trade("c")), 1);
        assert!(fanout.record(&trade("d")).is_ok());
        assert!(std::fs::read_to_string(&path).unwrap().contains("trade_id: d"));

        std::fs::remove_file(&path).ok();
    }
}
