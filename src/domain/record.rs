//! Raw input records and their field parsing.
//!
//! Two shapes feed the aggregator: single trades (`timestamp,price,volume`)
//! and pre-aggregated OHLCV rows (`timestamp,open,high,low,close,volume`).
//! Parsing is all-or-nothing per load: the first bad field fails with
//! [`TraderError::MalformedRecord`] carrying the source line.

use crate::domain::error::TraderError;
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub price: Decimal,
    pub volume: Decimal,
}

/// A pre-aggregated bar row. `timestamp` is the row's end time.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Parse a timestamp in any of the accepted input layouts.
///
/// Accepts RFC 3339, minute precision with an offset
/// (`2021-02-25T21:33+01:00`), either of those followed by a bracketed zone
/// id (`...+01:00[Europe/Zurich]`, the offset wins), or a bare date, which
/// maps to midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    let without_zone = match trimmed.find('[') {
        Some(pos) if trimmed.ends_with(']') => &trimmed[..pos],
        _ => trimmed,
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(without_zone) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(without_zone, "%Y-%m-%dT%H:%M%:z") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(without_zone, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().fixed_offset())
}

pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

fn field<'a>(fields: &[&'a str], pos: usize, name: &str, line: usize) -> Result<&'a str, TraderError> {
    fields
        .get(pos)
        .copied()
        .ok_or_else(|| TraderError::malformed(line, format!("missing {name} column")))
}

fn timestamp_field(fields: &[&str], line: usize) -> Result<DateTime<FixedOffset>, TraderError> {
    let raw = field(fields, 0, "timestamp", line)?;
    parse_timestamp(raw)
        .ok_or_else(|| TraderError::malformed(line, format!("invalid timestamp '{raw}'")))
}

fn decimal_field(fields: &[&str], pos: usize, name: &str, line: usize) -> Result<Decimal, TraderError> {
    let raw = field(fields, pos, name, line)?;
    let value = parse_decimal(raw)
        .ok_or_else(|| TraderError::malformed(line, format!("invalid {name} '{raw}'")))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(TraderError::malformed(
            line,
            format!("{name} must not be negative, got {value}"),
        ));
    }
    Ok(value)
}

impl TradeRecord {
    pub fn parse(fields: &[&str], line: usize) -> Result<Self, TraderError> {
        Ok(TradeRecord {
            timestamp: timestamp_field(fields, line)?,
            price: decimal_field(fields, 1, "price", line)?,
            volume: decimal_field(fields, 2, "volume", line)?,
        })
    }
}

impl OhlcvRecord {
    pub fn parse(fields: &[&str], line: usize) -> Result<Self, TraderError> {
        let record = OhlcvRecord {
            timestamp: timestamp_field(fields, line)?,
            open: decimal_field(fields, 1, "open", line)?,
            high: decimal_field(fields, 2, "high", line)?,
            low: decimal_field(fields, 3, "low", line)?,
            close: decimal_field(fields, 4, "close", line)?,
            volume: decimal_field(fields, 5, "volume", line)?,
        };

        let body_low = record.open.min(record.close);
        let body_high = record.open.max(record.close);
        if record.low > body_low || record.high < body_high {
            return Err(TraderError::malformed(
                line,
                format!(
                    "low/high {}/{} do not bracket open/close {}/{}",
                    record.low, record.high, record.open, record.close
                ),
            ));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use rust_decimal_macros::dec;

    #[test]
    fn parses_rfc3339() {
        let ts = parse_timestamp("2021-02-25T21:33:10+01:00").unwrap();
        assert_eq!(ts.hour(), 21);
        assert_eq!(ts.second(), 10);
        assert_eq!(ts.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn parses_minute_precision_with_zone_id() {
        let ts = parse_timestamp("2021-02-25T21:33+01:00[Europe/Zurich]").unwrap();
        assert_eq!(ts.minute(), 33);
        assert_eq!(ts.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn parses_bare_date_as_utc_midnight() {
        let ts = parse_timestamp("2013-01-02").unwrap();
        assert_eq!(ts.year(), 2013);
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts.offset().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn trade_record_parses_fields() {
        let rec = TradeRecord::parse(&["2021-02-25T21:33+01:00", "0.0312", "12.5"], 2).unwrap();
        assert_eq!(rec.price, dec!(0.0312));
        assert_eq!(rec.volume, dec!(12.5));
    }

    #[test]
    fn trade_record_reports_line_on_bad_price() {
        let err = TradeRecord::parse(&["2021-02-25T21:33+01:00", "abc", "1"], 9).unwrap_err();
        match err {
            TraderError::MalformedRecord { line, reason } => {
                assert_eq!(line, 9);
                assert!(reason.contains("price"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn trade_record_reports_missing_column() {
        let err = TradeRecord::parse(&["2021-02-25T21:33+01:00", "1.0"], 4).unwrap_err();
        assert!(matches!(err, TraderError::MalformedRecord { line: 4, .. }));
    }

    #[test]
    fn trade_record_rejects_negative_volume() {
        let err = TradeRecord::parse(&["2021-02-25T21:33+01:00", "1.0", "-3"], 3).unwrap_err();
        assert!(matches!(err, TraderError::MalformedRecord { line: 3, .. }));
    }

    #[test]
    fn ohlcv_record_parses() {
        let rec = OhlcvRecord::parse(&["2013-01-02", "10", "12", "9", "11", "1000"], 2).unwrap();
        assert_eq!(rec.open, dec!(10));
        assert_eq!(rec.high, dec!(12));
        assert_eq!(rec.low, dec!(9));
        assert_eq!(rec.close, dec!(11));
        assert_eq!(rec.volume, dec!(1000));
    }

    #[test]
    fn ohlcv_record_rejects_inconsistent_range() {
        let err = OhlcvRecord::parse(&["2013-01-02", "10", "10.5", "9", "11", "1000"], 5).unwrap_err();
        assert!(matches!(err, TraderError::MalformedRecord { line: 5, .. }));
    }
}
