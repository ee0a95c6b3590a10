//! Bars and bar series.
//!
//! A [`Bar`] is built through an [`OpenBar`] while the aggregator is inside
//! its interval and becomes immutable once closed. A [`BarSeries`] only
//! accepts bars whose `end_time` is strictly later than the last one.

use crate::domain::error::TraderError;
use crate::domain::record::OhlcvRecord;
use chrono::{DateTime, FixedOffset, TimeDelta};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    open_time: DateTime<FixedOffset>,
    end_time: DateTime<FixedOffset>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    trade_count: u64,
}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        open_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        trade_count: u64,
    ) -> Result<Self, TraderError> {
        if open_time >= end_time {
            return Err(TraderError::InvalidBar {
                reason: format!("open time {open_time} is not before end time {end_time}"),
            });
        }
        if low > open.min(close) || high < open.max(close) {
            return Err(TraderError::InvalidBar {
                reason: format!("low/high {low}/{high} do not bracket open/close {open}/{close}"),
            });
        }
        Ok(Bar {
            open_time,
            end_time,
            open,
            high,
            low,
            close,
            volume,
            trade_count,
        })
    }

    pub fn open_time(&self) -> DateTime<FixedOffset> {
        self.open_time
    }

    pub fn end_time(&self) -> DateTime<FixedOffset> {
        self.end_time
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    /// close < open
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// A bar still accumulating trades.
#[derive(Debug, Clone)]
pub struct OpenBar {
    open_time: DateTime<FixedOffset>,
    end_time: DateTime<FixedOffset>,
    includes_open_time: bool,
    prices: Option<(Decimal, Decimal, Decimal, Decimal)>,
    volume: Decimal,
    trade_count: u64,
}

impl OpenBar {
    /// Bar covering `(end_time - duration, end_time]`.
    pub fn new(end_time: DateTime<FixedOffset>, duration: TimeDelta) -> Self {
        OpenBar {
            open_time: end_time - duration,
            end_time,
            includes_open_time: false,
            prices: None,
            volume: Decimal::ZERO,
            trade_count: 0,
        }
    }

    /// Bar covering `[end_time - duration, end_time]`; used for the first
    /// bar of a window so a record stamped at the window start is kept.
    pub fn new_first(end_time: DateTime<FixedOffset>, duration: TimeDelta) -> Self {
        OpenBar {
            includes_open_time: true,
            ..OpenBar::new(end_time, duration)
        }
    }

    pub fn in_period(&self, ts: DateTime<FixedOffset>) -> bool {
        let after_start = if self.includes_open_time {
            ts >= self.open_time
        } else {
            ts > self.open_time
        };
        after_start && ts <= self.end_time
    }

    pub fn end_time(&self) -> DateTime<FixedOffset> {
        self.end_time
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    pub fn add_trade(&mut self, price: Decimal, volume: Decimal) -> Result<(), TraderError> {
        self.merge(price, price, price, price, volume, 1)
    }

    pub fn add_row(&mut self, row: &OhlcvRecord) -> Result<(), TraderError> {
        self.merge(row.open, row.high, row.low, row.close, row.volume, 1)
    }

    /// Fails without touching the bar when the volume total overflows.
    fn merge(
        &mut self,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        trades: u64,
    ) -> Result<(), TraderError> {
        let total = self
            .volume
            .checked_add(volume)
            .ok_or_else(|| TraderError::InvalidBar {
                reason: format!("volume overflows in bar ending {}", self.end_time),
            })?;
        self.prices = Some(match self.prices {
            None => (open, high, low, close),
            Some((first, hi, lo, _)) => (first, hi.max(high), lo.min(low), close),
        });
        self.volume = total;
        self.trade_count += trades;
        Ok(())
    }

    /// Close the bar. Returns `None` when no trade was merged.
    pub fn close(self) -> Option<Bar> {
        let (open, high, low, close) = self.prices?;
        Some(Bar {
            open_time: self.open_time,
            end_time: self.end_time,
            open,
            high,
            low,
            close,
            volume: self.volume,
            trade_count: self.trade_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarSeries {
    name: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(name: impl Into<String>) -> Self {
        BarSeries {
            name: name.into(),
            bars: Vec::new(),
        }
    }

    /// One bar per row; each row's timestamp is taken as its end time.
    /// Rows listed most-recent-first are loaded in reverse.
    pub fn from_rows(
        name: impl Into<String>,
        rows: &[OhlcvRecord],
        duration: TimeDelta,
    ) -> Result<Self, TraderError> {
        let mut ordered: Vec<&OhlcvRecord> = rows.iter().collect();
        if let (Some(f), Some(l)) = (rows.first(), rows.last()) {
            if f.timestamp > l.timestamp {
                ordered.reverse();
            }
        }

        let mut series = BarSeries::new(name);
        for row in ordered {
            let open_time = row
                .timestamp
                .checked_sub_signed(duration)
                .ok_or_else(|| TraderError::InvalidBar {
                    reason: format!("bar duration {duration} reaches before {}", row.timestamp),
                })?;
            let bar = Bar::new(
                open_time,
                row.timestamp,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume,
                1,
            )?;
            series.push(bar)?;
        }
        Ok(series)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, bar: Bar) -> Result<(), TraderError> {
        if let Some(last) = self.bars.last() {
            if bar.end_time <= last.end_time {
                return Err(TraderError::NonMonotonicSeries {
                    position: self.bars.len(),
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Panics when `index` is out of range, like slice indexing.
    pub fn bar(&self, index: usize) -> &Bar {
        &self.bars[index]
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}
