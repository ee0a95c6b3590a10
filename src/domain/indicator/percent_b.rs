//! Percent-B indicators.
//!
//! %B = (S - lower) / (upper - lower), unbounded outside [0, 1]; undefined
//! when the band is flat. The double variant averages two %B values.

use crate::domain::indicator::Num;
use rust_decimal::Decimal;

pub fn calculate_percent_b(source: Num, upper: Num, lower: Num) -> Num {
    let lower = lower?;
    let width = upper?.checked_sub(lower)?;
    if width.is_zero() {
        return None;
    }
    source?.checked_sub(lower)?.checked_div(width)
}

pub fn calculate_double_percent_b(first: Num, second: Num) -> Num {
    first?.checked_add(second?)?.checked_div(Decimal::TWO)
}
