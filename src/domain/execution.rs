//! Strategy execution: the FLAT/LONG walk over a bar series.
//!
//! Fills happen at the bar's close with a fixed amount. Transaction costs
//! are charged when a trade closes.

use crate::domain::bar::BarSeries;
use crate::domain::indicator::{BooleanSeries, NumericSeries};
use crate::domain::rule_eval::evaluate;
use crate::domain::strategy::Strategy;
use crate::domain::trade::TradingRecord;
use rust_decimal::Decimal;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostModel {
    #[default]
    Zero,
    /// rate × (entry price + exit price) × amount
    Linear { rate: Decimal },
}

impl CostModel {
    /// `None` when the cost does not fit in a `Decimal`.
    pub fn cost(&self, entry_price: Decimal, exit_price: Decimal, amount: Decimal) -> Option<Decimal> {
        match self {
            CostModel::Zero => Some(Decimal::ZERO),
            CostModel::Linear { rate } => entry_price
                .checked_add(exit_price)?
                .checked_mul(*rate)?
                .checked_mul(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub amount: Decimal,
    pub costs: CostModel,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            amount: Decimal::ONE,
            costs: CostModel::Zero,
        }
    }
}

/// Walk `series` once. At each index exactly one rule is consulted: the
/// entry rule when flat, the exit rule when long. Indices below the
/// strategy's unstable period never trigger. A position still open after
/// the last bar stays open in the returned record.
pub fn run_strategy<S>(
    strategy: &Strategy,
    series: &BarSeries,
    source: &S,
    config: &ExecutionConfig,
) -> TradingRecord
where
    S: NumericSeries + BooleanSeries + ?Sized,
{
    let mut record = TradingRecord::new();

    for index in strategy.unstable_period..series.len() {
        let price = series.bar(index).close();
        if record.is_open() {
            if !evaluate(&strategy.exit, source, index, &record) {
                continue;
            }
            if let Some(trade) = record.exit(index, price, &config.costs) {
                debug!(
                    strategy = %strategy.name,
                    entry = trade.entry().index,
                    exit = index,
                    profit = ?trade.net_profit(),
                    "closed trade"
                );
            }
        } else if evaluate(&strategy.entry, source, index, &record) {
            record.enter(index, price, config.amount);
            debug!(strategy = %strategy.name, index, %price, "entered long");
        }
    }

    record
}
