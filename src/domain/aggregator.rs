//! Bar aggregation.
//!
//! Buckets time-ordered records into fixed-duration bars over a window.
//! Each bar covers `(end - D, end]`; the first bar of a window also covers
//! its start instant. Bars that receive no record are dropped, never padded.
//! Input that arrives most-recent-first is reversed before bucketing.

use crate::domain::bar::{BarSeries, OpenBar};
use crate::domain::error::TraderError;
use crate::domain::record::{OhlcvRecord, TradeRecord};
use chrono::{DateTime, FixedOffset, TimeDelta};
use tracing::{debug, info};

/// Anything the aggregator can merge into an open bar.
pub trait Aggregatable {
    fn timestamp(&self) -> DateTime<FixedOffset>;
    fn merge_into(&self, bar: &mut OpenBar) -> Result<(), TraderError>;
}

impl Aggregatable for TradeRecord {
    fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    fn merge_into(&self, bar: &mut OpenBar) -> Result<(), TraderError> {
        bar.add_trade(self.price, self.volume)
    }
}

impl Aggregatable for OhlcvRecord {
    fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    fn merge_into(&self, bar: &mut OpenBar) -> Result<(), TraderError> {
        bar.add_row(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    pub fn new(begin: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        TimeWindow { begin, end }
    }

    /// Swap the bounds when given back to front.
    fn normalized(self) -> Self {
        if self.begin > self.end {
            TimeWindow {
                begin: self.end,
                end: self.begin,
            }
        } else {
            self
        }
    }
}

/// Aggregate over the window spanned by the first and last record.
pub fn aggregate_trades<R: Aggregatable>(
    name: &str,
    records: Vec<R>,
    duration: TimeDelta,
) -> Result<BarSeries, TraderError> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(f), Some(l)) => (f.timestamp(), l.timestamp()),
        _ => {
            info!(series = name, "no records to aggregate");
            return Ok(BarSeries::new(name));
        }
    };
    aggregate(name, records, duration, TimeWindow::new(first, last))
}

pub fn aggregate<R: Aggregatable>(
    name: &str,
    mut records: Vec<R>,
    duration: TimeDelta,
    window: TimeWindow,
) -> Result<BarSeries, TraderError> {
    if duration <= TimeDelta::zero() {
        return Err(TraderError::InvalidBar {
            reason: format!("bar duration must be positive, got {duration}"),
        });
    }

    let window = window.normalized();
    let reversed = match (records.first(), records.last()) {
        (Some(f), Some(l)) => f.timestamp() > l.timestamp(),
        _ => false,
    };
    if reversed {
        debug!(series = name, "records arrive most-recent-first; reversing");
        records.reverse();
    }
    check_order(&records, reversed)?;

    let mut series = BarSeries::new(name);
    let total = records.len();
    let mut cursor = 0;

    while cursor < total && records[cursor].timestamp() < window.begin {
        cursor += 1;
    }
    if cursor > 0 {
        debug!(series = name, skipped = cursor, "records before window start");
    }
    let leading = cursor;

    let mut bar_end = window.begin;
    let mut first_bar = true;
    loop {
        bar_end = advance(bar_end, duration)?;
        let mut bar = if first_bar {
            OpenBar::new_first(bar_end, duration)
        } else {
            OpenBar::new(bar_end, duration)
        };
        first_bar = false;

        while cursor < total {
            let record = &records[cursor];
            let ts = record.timestamp();
            if ts > window.end || !bar.in_period(ts) {
                break;
            }
            record.merge_into(&mut bar)?;
            cursor += 1;
        }

        if let Some(closed) = bar.close() {
            series.push(closed)?;
        }

        if bar_end >= window.end || cursor >= total {
            break;
        }
        let next = records[cursor].timestamp();
        if next > window.end {
            break;
        }
        bar_end = last_empty_bar_end(bar_end, next, duration);
    }

    let trailing = total - cursor;
    if trailing > 0 {
        debug!(series = name, skipped = trailing, "records after window end");
    }
    if series.is_empty() {
        info!(series = name, "window produced no bars");
    } else {
        info!(
            series = name,
            bars = series.len(),
            records = total - leading - trailing,
            "aggregated records into bars"
        );
    }
    Ok(series)
}

fn advance(bar_end: DateTime<FixedOffset>, duration: TimeDelta) -> Result<DateTime<FixedOffset>, TraderError> {
    bar_end
        .checked_add_signed(duration)
        .ok_or_else(|| TraderError::InvalidBar {
            reason: format!("bar after {bar_end} ends out of range"),
        })
}

/// End of the last empty bar before the one holding `next`, so a sparse
/// record stream does not walk every empty bar in between.
fn last_empty_bar_end(
    bar_end: DateTime<FixedOffset>,
    next: DateTime<FixedOffset>,
    duration: TimeDelta,
) -> DateTime<FixedOffset> {
    let (Some(gap), Some(step)) = ((next - bar_end).num_nanoseconds(), duration.num_nanoseconds()) else {
        return bar_end;
    };
    if gap <= step {
        return bar_end;
    }
    ((gap - 1) / step)
        .checked_mul(step)
        .and_then(|skip| bar_end.checked_add_signed(TimeDelta::nanoseconds(skip)))
        .unwrap_or(bar_end)
}

fn check_order<R: Aggregatable>(records: &[R], reversed: bool) -> Result<(), TraderError> {
    let total = records.len();
    for i in 1..total {
        if records[i].timestamp() < records[i - 1].timestamp() {
            let position = if reversed { total - 1 - i } else { i };
            return Err(TraderError::UnorderedRecords { position });
        }
    }
    Ok(())
}
