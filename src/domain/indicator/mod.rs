//! Technical indicators as a memoized DAG.
//!
//! This module provides:
//! - `Num`: a decimal indicator value, `None` when undefined
//! - `NumericId` / `BooleanId`: stable node identifiers inside a graph
//! - `IndicatorKind` / `BooleanKind`: node definitions (tagged data; the
//!   interning key of a graph)
//! - `NumericSeries` / `BooleanSeries`: the capabilities rules evaluate against
//! - `IndicatorGraph`: node storage, per-node caches and evaluation dispatch

pub mod bollinger;
pub mod candle;
pub mod ema;
pub mod graph;
pub mod percent_b;
pub mod sma;
pub mod stddev;

pub use graph::{BollingerBands, IndicatorGraph};

use rust_decimal::Decimal;
use std::fmt;

/// An indicator value. `None` is the "undefined" sentinel (flat band,
/// index past the end of the series, arithmetic overflow).
pub type Num = Option<Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NumericId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BooleanId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    ClosePrice,
    OpenPrice,
    Constant(Decimal),
    Sma {
        source: NumericId,
        period: usize,
    },
    Ema {
        source: NumericId,
        period: usize,
    },
    StandardDeviation {
        source: NumericId,
        mean: NumericId,
        period: usize,
    },
    BollingerMiddle {
        mean: NumericId,
    },
    BollingerUpper {
        middle: NumericId,
        deviation: NumericId,
        k: Decimal,
    },
    BollingerLower {
        middle: NumericId,
        deviation: NumericId,
        k: Decimal,
    },
    PercentB {
        source: NumericId,
        upper: NumericId,
        lower: NumericId,
    },
    DoublePercentB {
        first: NumericId,
        second: NumericId,
    },
    CandleBodyPercentBelow {
        level: NumericId,
    },
    Difference {
        minuend: NumericId,
        subtrahend: NumericId,
    },
}

impl IndicatorKind {
    /// Raw bar fields and constants; everything else is derived.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            IndicatorKind::ClosePrice
                | IndicatorKind::OpenPrice
                | IndicatorKind::Constant(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanKind {
    RedCandle,
}

/// Anything producing one comparable numeric value per bar index.
pub trait NumericSeries {
    fn numeric(&self, id: NumericId, index: usize) -> Num;
}

/// Anything producing one boolean per bar index.
pub trait BooleanSeries {
    fn boolean(&self, id: BooleanId, index: usize) -> bool;
}


impl fmt::Display for BooleanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanKind::RedCandle => write!(f, "RED_CANDLE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn kinds_with_equal_parameters_hash_equal() {
        let mut map = HashMap::new();
        let a = IndicatorKind::BollingerLower {
            middle: NumericId(2),
            deviation: NumericId(3),
            k: dec!(-1),
        };
        let b = IndicatorKind::BollingerLower {
            middle: NumericId(2),
            deviation: NumericId(3),
            k: dec!(-1.0),
        };
        map.insert(a, NumericId(4));
        assert_eq!(map.get(&b), Some(&NumericId(4)));
    }

    #[test]
    fn kinds_with_different_inputs_differ() {
        let a = IndicatorKind::Sma {
            source: NumericId(0),
            period: 20,
        };
        let b = IndicatorKind::Sma {
            source: NumericId(1),
            period: 20,
        };
        assert_ne!(a, b);
    }

    #[test]
    fn boolean_kind_display() {
        assert_eq!(BooleanKind::RedCandle.to_string(), "RED_CANDLE");
    }
}
