//! Candle-shape indicators.

use crate::domain::bar::{Bar, BarSeries};
use crate::domain::indicator::Num;
use rust_decimal::Decimal;

/// Fraction of the open-close body lying below `level`.
///
/// 1 when open and close are both below, 0 when neither is, otherwise the
/// crossing point interpolated between the lower and higher body edge.
pub fn calculate_body_percent_below(bar: &Bar, level: Num) -> Num {
    let level = level?;
    let open = bar.open();
    let close = bar.close();

    match (open < level, close < level) {
        (true, true) => Some(Decimal::ONE),
        (false, false) => Some(Decimal::ZERO),
        (true, false) => level.checked_sub(open)?.checked_div(close.checked_sub(open)?),
        (false, true) => level.checked_sub(close)?.checked_div(open.checked_sub(close)?),
    }
}

/// close < open; false at index 0.
pub fn calculate_red_candle(series: &BarSeries, index: usize) -> bool {
    if index < 1 {
        return false;
    }
    series.get(index).is_some_and(Bar::is_bearish)
}
