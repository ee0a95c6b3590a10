//! Indicator graph: node storage, interning, memoization and dispatch.
//!
//! Every node owns a cache with one slot per bar. A slot is filled the first
//! time its index is requested and never recomputed, so a shared ancestor
//! (one SMA under two bands) is scanned once per index no matter how many
//! consumers ask for it. Identical definitions are interned to one id.
//!
//! Caches use `RefCell`, which makes the graph `!Sync`: a graph belongs to
//! exactly one run.

use crate::domain::bar::BarSeries;
use crate::domain::indicator::{
    bollinger, candle, ema, percent_b, sma, stddev, BooleanId, BooleanKind, BooleanSeries,
    IndicatorKind, NumericId, NumericSeries, Num,
};
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

struct NumericNode {
    kind: IndicatorKind,
    unstable_period: usize,
    cache: RefCell<Vec<Option<Num>>>,
    computations: Cell<usize>,
}

struct BooleanNode {
    kind: BooleanKind,
    unstable_period: usize,
    cache: RefCell<Vec<Option<bool>>>,
    computations: Cell<usize>,
}

/// Ids of a Bollinger envelope built over one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BollingerBands {
    pub middle: NumericId,
    pub deviation: NumericId,
    pub upper: NumericId,
    pub lower: NumericId,
}

pub struct IndicatorGraph<'a> {
    series: &'a BarSeries,
    numeric: Vec<NumericNode>,
    boolean: Vec<BooleanNode>,
    numeric_index: HashMap<IndicatorKind, NumericId>,
    boolean_index: HashMap<BooleanKind, BooleanId>,
}

impl<'a> IndicatorGraph<'a> {
    pub fn new(series: &'a BarSeries) -> Self {
        IndicatorGraph {
            series,
            numeric: Vec::new(),
            boolean: Vec::new(),
            numeric_index: HashMap::new(),
            boolean_index: HashMap::new(),
        }
    }

    pub fn series(&self) -> &'a BarSeries {
        self.series
    }

    /// Add a node, or return the id of an identical existing one.
    pub fn add(&mut self, kind: IndicatorKind) -> NumericId {
        if let Some(id) = self.numeric_index.get(&kind) {
            return *id;
        }
        let id = NumericId(self.numeric.len());
        let unstable_period = self.derive_unstable_period(&kind);
        self.numeric.push(NumericNode {
            kind: kind.clone(),
            unstable_period,
            cache: RefCell::new(vec![None; self.series.len()]),
            computations: Cell::new(0),
        });
        self.numeric_index.insert(kind, id);
        id
    }

    pub fn add_boolean(&mut self, kind: BooleanKind) -> BooleanId {
        if let Some(id) = self.boolean_index.get(&kind) {
            return *id;
        }
        let id = BooleanId(self.boolean.len());
        let unstable_period = match kind {
            BooleanKind::RedCandle => 1,
        };
        self.boolean.push(BooleanNode {
            kind,
            unstable_period,
            cache: RefCell::new(vec![None; self.series.len()]),
            computations: Cell::new(0),
        });
        self.boolean_index.insert(kind, id);
        id
    }

    pub fn close_price(&mut self) -> NumericId {
        self.add(IndicatorKind::ClosePrice)
    }

    pub fn open_price(&mut self) -> NumericId {
        self.add(IndicatorKind::OpenPrice)
    }

    pub fn constant(&mut self, value: Decimal) -> NumericId {
        self.add(IndicatorKind::Constant(value))
    }

    pub fn sma(&mut self, source: NumericId, period: usize) -> NumericId {
        self.add(IndicatorKind::Sma { source, period })
    }

    pub fn ema(&mut self, source: NumericId, period: usize) -> NumericId {
        self.add(IndicatorKind::Ema { source, period })
    }

    /// Population deviation paired with `SMA(source, period)`.
    pub fn standard_deviation(&mut self, source: NumericId, period: usize) -> NumericId {
        let mean = self.sma(source, period);
        self.add(IndicatorKind::StandardDeviation {
            source,
            mean,
            period,
        })
    }

    pub fn bollinger_middle(&mut self, mean: NumericId) -> NumericId {
        self.add(IndicatorKind::BollingerMiddle { mean })
    }

    pub fn bollinger_upper(&mut self, middle: NumericId, deviation: NumericId, k: Decimal) -> NumericId {
        self.add(IndicatorKind::BollingerUpper {
            middle,
            deviation,
            k,
        })
    }

    pub fn bollinger_lower(&mut self, middle: NumericId, deviation: NumericId, k: Decimal) -> NumericId {
        self.add(IndicatorKind::BollingerLower {
            middle,
            deviation,
            k,
        })
    }

    /// Middle = SMA(source, sma_window); deviation over `stddev_window`.
    pub fn bollinger_bands(
        &mut self,
        source: NumericId,
        sma_window: usize,
        stddev_window: usize,
        k: Decimal,
    ) -> BollingerBands {
        let mean = self.sma(source, sma_window);
        let middle = self.bollinger_middle(mean);
        let deviation = self.standard_deviation(source, stddev_window);
        BollingerBands {
            middle,
            deviation,
            upper: self.bollinger_upper(middle, deviation, k),
            lower: self.bollinger_lower(middle, deviation, k),
        }
    }

    pub fn percent_b(&mut self, source: NumericId, period: usize, k: Decimal) -> NumericId {
        let bands = self.bollinger_bands(source, period, period, k);
        self.add(IndicatorKind::PercentB {
            source,
            upper: bands.upper,
            lower: bands.lower,
        })
    }

    /// Mean of `%B(first, n, -1)` and `%B(second, n, -1)`.
    pub fn double_percent_b(&mut self, first: NumericId, second: NumericId, period: usize) -> NumericId {
        let first = self.percent_b(first, period, Decimal::NEGATIVE_ONE);
        let second = self.percent_b(second, period, Decimal::NEGATIVE_ONE);
        self.add(IndicatorKind::DoublePercentB { first, second })
    }

    pub fn candle_body_percent_below(&mut self, level: NumericId) -> NumericId {
        self.add(IndicatorKind::CandleBodyPercentBelow { level })
    }

    pub fn difference(&mut self, minuend: NumericId, subtrahend: NumericId) -> NumericId {
        self.add(IndicatorKind::Difference {
            minuend,
            subtrahend,
        })
    }

    pub fn red_candle(&mut self) -> BooleanId {
        self.add_boolean(BooleanKind::RedCandle)
    }

    pub fn kind(&self, id: NumericId) -> &IndicatorKind {
        &self.numeric[id.0].kind
    }

    /// Lowest index at which the node's value is meaningful.
    pub fn unstable_period(&self, id: NumericId) -> usize {
        self.numeric[id.0].unstable_period
    }

    pub fn boolean_unstable_period(&self, id: BooleanId) -> usize {
        self.boolean[id.0].unstable_period
    }

    /// How many times the node's value has actually been computed.
    pub fn computations(&self, id: NumericId) -> usize {
        self.numeric[id.0].computations.get()
    }

    pub fn boolean_computations(&self, id: BooleanId) -> usize {
        self.boolean[id.0].computations.get()
    }

    pub fn node_count(&self) -> usize {
        self.numeric.len() + self.boolean.len()
    }

    pub fn value(&self, id: NumericId, index: usize) -> Num {
        let node = &self.numeric[id.0];
        if index >= self.series.len() {
            return None;
        }
        if let Some(cached) = node.cache.borrow()[index] {
            return cached;
        }
        if let IndicatorKind::Ema { .. } = node.kind {
            self.warm_recursive(id, index);
        }

        let value = self.calculate(id, index);
        node.computations.set(node.computations.get() + 1);
        node.cache.borrow_mut()[index] = Some(value);
        value
    }

    pub fn flag(&self, id: BooleanId, index: usize) -> bool {
        let node = &self.boolean[id.0];
        if index >= self.series.len() {
            return false;
        }
        if let Some(cached) = node.cache.borrow()[index] {
            return cached;
        }
        let value = match node.kind {
            BooleanKind::RedCandle => candle::calculate_red_candle(self.series, index),
        };
        node.computations.set(node.computations.get() + 1);
        node.cache.borrow_mut()[index] = Some(value);
        value
    }

    /// All values of a node, index by index.
    pub fn values(&self, id: NumericId) -> Vec<Num> {
        (0..self.series.len()).map(|i| self.value(id, i)).collect()
    }

    /// Human-readable name with inputs spelled out, e.g. `SMA(CLOSE,20)`.
    pub fn label(&self, id: NumericId) -> String {
        match self.kind(id) {
            IndicatorKind::ClosePrice => "CLOSE".to_string(),
            IndicatorKind::OpenPrice => "OPEN".to_string(),
            IndicatorKind::Constant(v) => v.to_string(),
            IndicatorKind::Sma { source, period } => format!("SMA({},{})", self.label(*source), period),
            IndicatorKind::Ema { source, period } => format!("EMA({},{})", self.label(*source), period),
            IndicatorKind::StandardDeviation { source, period, .. } => {
                format!("STDDEV({},{})", self.label(*source), period)
            }
            IndicatorKind::BollingerMiddle { mean } => format!("BB_MIDDLE({})", self.label(*mean)),
            IndicatorKind::BollingerUpper { middle, deviation, k } => format!(
                "BB_UPPER({},{},{})",
                self.label(*middle),
                self.label(*deviation),
                k
            ),
            IndicatorKind::BollingerLower { middle, deviation, k } => format!(
                "BB_LOWER({},{},{})",
                self.label(*middle),
                self.label(*deviation),
                k
            ),
            IndicatorKind::PercentB { source, upper, .. } => {
                format!("PERCENT_B({},{})", self.label(*source), self.label(*upper))
            }
            IndicatorKind::DoublePercentB { first, second } => {
                format!("DOUBLE_PERCENT_B({},{})", self.label(*first), self.label(*second))
            }
            IndicatorKind::CandleBodyPercentBelow { level } => {
                format!("BODY_BELOW({})", self.label(*level))
            }
            IndicatorKind::Difference {
                minuend,
                subtrahend,
            } => format!("DIFF({},{})", self.label(*minuend), self.label(*subtrahend)),
        }
    }

    /// Fill the cache of a self-referencing node from its last cached
    /// index upward, so evaluation never recurses more than one step.
    fn warm_recursive(&self, id: NumericId, index: usize) {
        let start = {
            let cache = self.numeric[id.0].cache.borrow();
            let mut start = index;
            while start > 0 && cache[start - 1].is_none() {
                start -= 1;
            }
            start
        };
        for i in start..index {
            self.value(id, i);
        }
    }

    fn calculate(&self, id: NumericId, index: usize) -> Num {
        let bar = self.series.get(index)?;
        match self.numeric[id.0].kind {
            IndicatorKind::ClosePrice => Some(bar.close()),
            IndicatorKind::OpenPrice => Some(bar.open()),
            IndicatorKind::Constant(v) => Some(v),
            IndicatorKind::Sma { source, period } => sma::calculate_sma(self, source, period, index),
            IndicatorKind::Ema { source, period } => ema::calculate_ema(self, id, source, period, index),
            IndicatorKind::StandardDeviation {
                source,
                mean,
                period,
            } => stddev::calculate_stddev(self, source, mean, period, index),
            IndicatorKind::BollingerMiddle { mean } => self.value(mean, index),
            IndicatorKind::BollingerUpper {
                middle,
                deviation,
                k,
            } => bollinger::calculate_upper(self.value(middle, index), self.value(deviation, index), k),
            IndicatorKind::BollingerLower {
                middle,
                deviation,
                k,
            } => bollinger::calculate_lower(self.value(middle, index), self.value(deviation, index), k),
            IndicatorKind::PercentB {
                source,
                upper,
                lower,
            } => percent_b::calculate_percent_b(
                self.value(source, index),
                self.value(upper, index),
                self.value(lower, index),
            ),
            IndicatorKind::DoublePercentB { first, second } => {
                percent_b::calculate_double_percent_b(self.value(first, index), self.value(second, index))
            }
            IndicatorKind::CandleBodyPercentBelow { level } => {
                candle::calculate_body_percent_below(bar, self.value(level, index))
            }
            IndicatorKind::Difference {
                minuend,
                subtrahend,
            } => self.value(minuend, index)?.checked_sub(self.value(subtrahend, index)?),
        }
    }

    fn derive_unstable_period(&self, kind: &IndicatorKind) -> usize {
        let of = |id: &NumericId| self.numeric[id.0].unstable_period;
        match kind {
            IndicatorKind::ClosePrice
            | IndicatorKind::OpenPrice
            | IndicatorKind::Constant(_) => 0,
            IndicatorKind::Sma { source, period } | IndicatorKind::Ema { source, period } => {
                of(source) + period.saturating_sub(1)
            }
            IndicatorKind::StandardDeviation {
                source,
                mean,
                period,
            } => (of(source) + period.saturating_sub(1)).max(of(mean)),
            IndicatorKind::BollingerMiddle { mean } => of(mean),
            IndicatorKind::BollingerUpper {
                middle, deviation, ..
            }
            | IndicatorKind::BollingerLower {
                middle, deviation, ..
            } => of(middle).max(of(deviation)),
            IndicatorKind::PercentB {
                source,
                upper,
                lower,
            } => of(source).max(of(upper)).max(of(lower)),
            IndicatorKind::DoublePercentB { first, second } => of(first).max(of(second)),
            IndicatorKind::CandleBodyPercentBelow { level } => of(level),
            IndicatorKind::Difference {
                minuend,
                subtrahend,
            } => of(minuend).max(of(subtrahend)),
        }
    }
}

impl NumericSeries for IndicatorGraph<'_> {
    fn numeric(&self, id: NumericId, index: usize) -> Num {
        self.value(id, index)
    }
}

impl BooleanSeries for IndicatorGraph<'_> {
    fn boolean(&self, id: BooleanId, index: usize) -> bool {
        self.flag(id, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::series_from_closes;
    use rust_decimal_macros::dec;

    #[test]
    fn identical_definitions_share_one_node() {
        let series = series_from_closes(&[dec!(1), dec!(2), dec!(3)]);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let a = graph.sma(close, 2);
        let b = graph.sma(close, 2);
        assert_eq!(a, b);
        assert_eq!(graph.close_price(), close);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn bands_share_their_sma() {
        let series = series_from_closes(&[dec!(1), dec!(2), dec!(3)]);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let bands = graph.bollinger_bands(close, 3, 3, dec!(2));
        let IndicatorKind::StandardDeviation { mean, .. } = *graph.kind(bands.deviation) else {
            panic!("expected deviation node");
        };
        assert_eq!(*graph.kind(bands.middle), IndicatorKind::BollingerMiddle { mean });
    }

    #[test]
    fn each_index_is_computed_at_most_once() {
        let closes: Vec<_> = (1..=30).map(rust_decimal::Decimal::from).collect();
        let series = series_from_closes(&closes);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let bands = graph.bollinger_bands(close, 20, 20, dec!(2));
        let mean = graph.sma(close, 20);

        for i in 0..series.len() {
            graph.value(bands.upper, i);
            graph.value(bands.lower, i);
            graph.value(bands.middle, i);
        }
        for i in 0..series.len() {
            graph.value(bands.upper, i);
        }

        assert_eq!(graph.computations(mean), series.len());
        assert_eq!(graph.computations(close), series.len());
        assert_eq!(graph.computations(bands.deviation), series.len());
        assert_eq!(graph.computations(bands.upper), series.len());
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let closes = [dec!(10.1), dec!(10.7), dec!(9.3), dec!(11.9), dec!(10.05)];
        let series = series_from_closes(&closes);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let pb = graph.percent_b(close, 3, dec!(2));
        let first: Vec<_> = graph.values(pb);
        let second: Vec<_> = graph.values(pb);
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            if let (Some(a), Some(b)) = (a, b) {
                assert_eq!(a.serialize(), b.serialize());
            }
        }
    }

    #[test]
    fn out_of_range_index_is_undefined() {
        let series = series_from_closes(&[dec!(1)]);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let red = graph.red_candle();
        assert_eq!(graph.value(close, 5), None);
        assert!(!graph.flag(red, 5));
    }

    #[test]
    fn unstable_periods_follow_inputs() {
        let series = series_from_closes(&[dec!(1)]);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let sma = graph.sma(close, 20);
        let ema_fast = graph.ema(close, 9);
        let ema_slow = graph.ema(close, 26);
        let macd = graph.difference(ema_fast, ema_slow);
        let signal = graph.ema(macd, 18);
        let bands = graph.bollinger_bands(close, 20, 20, dec!(-1));
        let body = graph.candle_body_percent_below(bands.lower);
        let red = graph.red_candle();

        assert_eq!(graph.unstable_period(close), 0);
        assert_eq!(graph.unstable_period(sma), 19);
        assert_eq!(graph.unstable_period(macd), 25);
        assert_eq!(graph.unstable_period(signal), 42);
        assert_eq!(graph.unstable_period(body), 19);
        assert_eq!(graph.boolean_unstable_period(red), 1);
    }

    #[test]
    fn labels_spell_out_inputs() {
        let series = series_from_closes(&[dec!(1)]);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let sma = graph.sma(close, 20);
        assert_eq!(graph.label(sma), "SMA(CLOSE,20)");
        let bands = graph.bollinger_bands(close, 20, 20, dec!(-1));
        assert_eq!(
            graph.label(bands.lower),
            "BB_LOWER(BB_MIDDLE(SMA(CLOSE,20)),STDDEV(CLOSE,20),-1)"
        );
    }

    #[test]
    fn difference_subtracts() {
        let series = series_from_closes(&[dec!(5), dec!(7)]);
        let mut graph = IndicatorGraph::new(&series);
        let close = graph.close_price();
        let open = graph.open_price();
        let three = graph.constant(dec!(3));
        let diff = graph.difference(close, three);
        assert_eq!(graph.value(diff, 1), Some(dec!(4)));
        assert_eq!(graph.value(open, 0), Some(dec!(5)));
    }
}
