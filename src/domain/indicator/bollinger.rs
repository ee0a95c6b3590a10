//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (k × StdDev)
//! - Lower: Middle - (k × StdDev)
//!
//! A negative k draws the No-Man's-Land band: the "lower" band then sits
//! above the middle, inside the usual envelope.

use crate::domain::indicator::Num;
use rust_decimal::Decimal;

pub fn calculate_upper(middle: Num, deviation: Num, k: Decimal) -> Num {
    middle?.checked_add(k.checked_mul(deviation?)?)
}

pub fn calculate_lower(middle: Num, deviation: Num, k: Decimal) -> Num {
    middle?.checked_sub(k.checked_mul(deviation?)?)
}
