//! Standard Deviation indicator.
//!
//! Population standard deviation over n values of the source, measured
//! against the paired SMA node's mean rather than a second mean pass.
//! STDDEV(n)[i] = sqrt(sum((S[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) bars are unstable.

use crate::domain::indicator::{IndicatorGraph, NumericId, Num};
use rust_decimal::{Decimal, MathematicalOps};

pub fn calculate_stddev(
    graph: &IndicatorGraph<'_>,
    source: NumericId,
    mean: NumericId,
    period: usize,
    index: usize,
) -> Num {
    if period == 0 {
        return None;
    }
    let mean_value = graph.value(mean, index)?;
    let start = (index + 1).saturating_sub(period);

    let mut squares = Decimal::ZERO;
    for i in start..=index {
        let diff = graph.value(source, i)?.checked_sub(mean_value)?;
        squares = squares.checked_add(diff.checked_mul(diff)?)?;
    }
    let variance = squares.checked_div(Decimal::from(index - start + 1))?;
    variance.sqrt()
}
