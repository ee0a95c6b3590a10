//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(S[i-j] for j in 0..n) / n
//! Below index n-1 the mean runs over the bars available so far; those
//! values exist but are inside the unstable period.

use crate::domain::indicator::{IndicatorGraph, NumericId, Num};
use rust_decimal::Decimal;

pub fn calculate_sma(graph: &IndicatorGraph<'_>, source: NumericId, period: usize, index: usize) -> Num {
    if period == 0 {
        return None;
    }
    let start = (index + 1).saturating_sub(period);
    let mut sum = Decimal::ZERO;
    for i in start..=index {
        sum = sum.checked_add(graph.value(source, i)?)?;
    }
    sum.checked_div(Decimal::from(index - start + 1))
}
