//! Exponential Moving Average.
//!
//! k = 2/(n+1). Up to index n-1 the value is the running mean (so index
//! n-1 is the SMA seed), then EMA[i] = S[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are unstable.

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorGraph, NumericId, Num};
use rust_decimal::Decimal;

pub fn calculate_ema(
    graph: &IndicatorGraph<'_>,
    id: NumericId,
    source: NumericId,
    period: usize,
    index: usize,
) -> Num {
    if period == 0 {
        return None;
    }
    if index < period {
        return calculate_sma(graph, source, period, index);
    }

    let current = graph.value(source, index)?;
    let prev = graph.value(id, index - 1)?;
    let k = Decimal::TWO.checked_div(Decimal::from(period + 1))?;
    current
        .checked_mul(k)?
        .checked_add(prev.checked_mul(Decimal::ONE - k)?)
}
