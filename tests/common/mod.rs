#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, TimeDelta};
use nmltrader::domain::bar::{Bar, BarSeries};
use nmltrader::domain::error::TraderError;
use nmltrader::domain::record::{parse_timestamp, OhlcvRecord, TradeRecord};
use nmltrader::ports::data_port::DataPort;
use rust_decimal::Decimal;

pub fn ts(raw: &str) -> DateTime<FixedOffset> {
    parse_timestamp(raw).unwrap()
}

pub fn start() -> DateTime<FixedOffset> {
    ts("2024-01-01T00:00:00Z")
}

pub fn trade(at: DateTime<FixedOffset>, price: Decimal, volume: Decimal) -> TradeRecord {
    TradeRecord {
        timestamp: at,
        price,
        volume,
    }
}

/// One trade per minute, stamped 30 seconds into each minute.
pub fn minute_trades(prices: &[Decimal]) -> Vec<TradeRecord> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| trade(start() + TimeDelta::seconds(60 * i as i64 + 30), p, Decimal::ONE))
        .collect()
}

/// One-minute bars with flat bodies at each close.
pub fn series_from_closes(closes: &[Decimal]) -> BarSeries {
    let mut series = BarSeries::new("test");
    for (i, &c) in closes.iter().enumerate() {
        let end = start() + TimeDelta::minutes(i as i64 + 1);
        let bar = Bar::new(end - TimeDelta::minutes(1), end, c, c, c, c, Decimal::ONE, 1).unwrap();
        series.push(bar).unwrap();
    }
    series
}

/// A repeating swing around 100 that crosses a short Bollinger line often.
pub fn wave_closes(len: usize) -> Vec<Decimal> {
    const SWING: [i64; 8] = [0, 3, 5, 3, 0, -3, -5, -3];
    (0..len)
        .map(|i| Decimal::from(100 + SWING[i % 8]))
        .collect()
}

pub struct MockDataPort {
    pub name: String,
    pub trades: Vec<TradeRecord>,
    pub rows: Vec<OhlcvRecord>,
    pub error: Option<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            trades: Vec::new(),
            rows: Vec::new(),
            error: None,
        }
    }

    pub fn with_trades(mut self, trades: Vec<TradeRecord>) -> Self {
        self.trades = trades;
        self
    }

    pub fn with_rows(mut self, rows: Vec<OhlcvRecord>) -> Self {
        self.rows = rows;
        self
    }

    /// Fail every fetch with a malformed record at `line`.
    pub fn with_malformed_line(mut self, line: usize) -> Self {
        self.error = Some(line);
        self
    }

    fn check(&self) -> Result<(), TraderError> {
        match self.error {
            Some(line) => Err(TraderError::MalformedRecord {
                line,
                reason: "bad price".to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn series_name(&self) -> String {
        self.name.clone()
    }

    fn fetch_trades(&self) -> Result<Vec<TradeRecord>, TraderError> {
        self.check()?;
        Ok(self.trades.clone())
    }

    fn fetch_ohlcv(&self) -> Result<Vec<OhlcvRecord>, TraderError> {
        self.check()?;
        Ok(self.rows.clone())
    }
}
