//! Analysis criteria over a trading record.
//!
//! Returns are ratios (1.1 = +10%), not percentages. Only closed trades
//! count; an entry still open at the end of the series is ignored. A sum
//! or product that does not fit in a `Decimal` is reported as `None`.

use crate::domain::bar::BarSeries;
use crate::domain::trade::{Trade, TradingRecord};
use rust_decimal::{Decimal, MathematicalOps};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub trade_count: usize,
    pub profitable_trades: usize,
    /// `None` when no trade closed.
    pub profitable_ratio: Option<Decimal>,
    /// Product of exit/entry over closed trades, before costs.
    pub total_return: Option<Decimal>,
    pub net_profit: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    /// Bars spent in closed trades, entry and exit bars included.
    pub bars_held: usize,
    /// Geometric mean return per held bar: `total_return^(1/bars_held)`.
    pub average_profit_per_bar: Option<Decimal>,
    /// Largest peak-to-trough fall of the equity curve, as a fraction of
    /// the peak.
    pub max_drawdown: Option<Decimal>,
    /// `total_return / max_drawdown`; `None` without a drawdown.
    pub reward_risk_ratio: Option<Decimal>,
    /// Last close / first close; `None` for an empty series.
    pub buy_and_hold_return: Option<Decimal>,
    pub versus_buy_and_hold: Option<Decimal>,
}

impl Metrics {
    pub fn compute(series: &BarSeries, record: &TradingRecord) -> Self {
        let trades = record.trades();

        let total_return = trades.iter().try_fold(Decimal::ONE, |acc, trade| {
            trade.gross_return().and_then(|ratio| acc.checked_mul(ratio))
        });
        let net_profit = checked_sum(trades.iter().map(Trade::net_profit));
        let total_cost = checked_sum(trades.iter().map(Trade::cost));
        let profitable_trades = trades.iter().filter(|t| t.is_profitable()).count();

        let profitable_ratio = if trades.is_empty() {
            None
        } else {
            Decimal::from(profitable_trades).checked_div(Decimal::from(trades.len()))
        };

        let bars_held = trades.iter().map(Trade::bars_held).sum();
        let average_profit_per_bar = total_return.and_then(|r| average_per_bar(r, bars_held));
        let max_drawdown = equity_curve(series, record).and_then(|curve| max_drawdown(&curve));
        let reward_risk_ratio = match (total_return, max_drawdown) {
            (Some(r), Some(dd)) => r.checked_div(dd),
            _ => None,
        };

        let buy_and_hold_return = buy_and_hold(series);
        let versus_buy_and_hold = match (total_return, buy_and_hold_return) {
            (Some(r), Some(bh)) => r.checked_div(bh),
            _ => None,
        };

        Metrics {
            trade_count: trades.len(),
            profitable_trades,
            profitable_ratio,
            total_return,
            net_profit,
            total_cost,
            bars_held,
            average_profit_per_bar,
            max_drawdown,
            reward_risk_ratio,
            buy_and_hold_return,
            versus_buy_and_hold,
        }
    }
}

fn checked_sum(values: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    values.fold(Some(Decimal::ZERO), |acc, v| acc?.checked_add(v?))
}

fn average_per_bar(total_return: Decimal, bars_held: usize) -> Option<Decimal> {
    if bars_held == 0 {
        return Some(Decimal::ONE);
    }
    if total_return.is_zero() {
        return Some(Decimal::ZERO);
    }
    let exponent = Decimal::ONE.checked_div(Decimal::from(bars_held))?;
    total_return.checked_powd(exponent)
}

/// Equity per bar, starting at 1. While a trade is held the equity
/// follows the close relative to the entry price; when flat it stays put.
fn equity_curve(series: &BarSeries, record: &TradingRecord) -> Option<Vec<Decimal>> {
    let mut curve = Vec::with_capacity(series.len());
    let mut equity = Decimal::ONE;
    let mut pending = record.trades().iter().peekable();
    let mut held: Option<(&Trade, Decimal)> = None;

    for (index, bar) in series.bars().iter().enumerate() {
        if let Some((trade, base)) = held {
            let price = if index == trade.exit().index {
                trade.exit().price
            } else {
                bar.close()
            };
            equity = base.checked_mul(price.checked_div(trade.entry().price)?)?;
            if index == trade.exit().index {
                held = None;
            }
        }
        curve.push(equity);
        if held.is_none() {
            if let Some(trade) = pending.next_if(|t| t.entry().index == index) {
                held = Some((trade, equity));
            }
        }
    }
    Some(curve)
}

fn max_drawdown(curve: &[Decimal]) -> Option<Decimal> {
    let mut peak = Decimal::ONE;
    let mut worst = Decimal::ZERO;
    for &value in curve {
        if value > peak {
            peak = value;
        }
        let drawdown = peak.checked_sub(value)?.checked_div(peak)?;
        worst = worst.max(drawdown);
    }
    Some(worst)
}

fn buy_and_hold(series: &BarSeries) -> Option<Decimal> {
    let first = series.first()?.close();
    let last = series.last()?.close();
    last.checked_div(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::CostModel;
    use crate::domain::indicator::test_support::series_from_closes;
    use rust_decimal_macros::dec;

    fn record_with(trades: &[(usize, Decimal, usize, Decimal)], costs: CostModel) -> TradingRecord {
        let mut record = TradingRecord::new();
        for &(entry, entry_price, exit, exit_price) in trades {
            record.enter(entry, entry_price, Decimal::ONE);
            record.exit(exit, exit_price, &costs);
        }
        record
    }

    #[test]
    fn empty_record() {
        let series = series_from_closes(&[dec!(10), dec!(12)]);
        let m = Metrics::compute(&series, &TradingRecord::new());
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.profitable_ratio, None);
        assert_eq!(m.total_return, Some(dec!(1)));
        assert_eq!(m.net_profit, Some(dec!(0)));
        assert_eq!(m.bars_held, 0);
        assert_eq!(m.average_profit_per_bar, Some(dec!(1)));
        assert_eq!(m.max_drawdown, Some(dec!(0)));
        assert_eq!(m.reward_risk_ratio, None);
        assert_eq!(m.buy_and_hold_return, Some(dec!(1.2)));
    }

    #[test]
    fn total_return_is_product_of_ratios() {
        let series = series_from_closes(&[dec!(10), dec!(11), dec!(10), dec!(8), dec!(10)]);
        let record = record_with(
            &[(0, dec!(10), 1, dec!(11)), (3, dec!(8), 4, dec!(10))],
            CostModel::Zero,
        );
        let m = Metrics::compute(&series, &record);
        assert_eq!(m.trade_count, 2);
        assert_eq!(m.total_return, Some(dec!(1.375)));
        assert_eq!(m.net_profit, Some(dec!(3)));
        assert_eq!(m.profitable_trades, 2);
        assert_eq!(m.profitable_ratio, Some(dec!(1)));
        assert_eq!(m.buy_and_hold_return, Some(dec!(1)));
        assert_eq!(m.versus_buy_and_hold, Some(dec!(1.375)));
    }

    #[test]
    fn costs_reduce_net_profit_only() {
        let series = series_from_closes(&[dec!(100), dec!(101)]);
        let record = record_with(&[(0, dec!(100), 1, dec!(101))], CostModel::Linear { rate: dec!(0.01) });
        let m = Metrics::compute(&series, &record);
        assert_eq!(m.total_return, Some(dec!(1.01)));
        assert_eq!(m.total_cost, Some(dec!(2.01)));
        assert_eq!(m.net_profit, Some(dec!(-1.01)));
        assert_eq!(m.profitable_trades, 0);
        assert_eq!(m.profitable_ratio, Some(dec!(0)));
    }

    #[test]
    fn open_entry_is_ignored() {
        let series = series_from_closes(&[dec!(10), dec!(20)]);
        let mut record = TradingRecord::new();
        record.enter(0, dec!(10), Decimal::ONE);
        let m = Metrics::compute(&series, &record);
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.net_profit, Some(dec!(0)));
        assert_eq!(m.bars_held, 0);
    }

    #[test]
    fn empty_series_has_no_buy_and_hold() {
        let m = Metrics::compute(&BarSeries::new("empty"), &TradingRecord::new());
        assert_eq!(m.buy_and_hold_return, None);
        assert_eq!(m.versus_buy_and_hold, None);
    }

    #[test]
    fn bars_held_and_average_profit_per_bar() {
        let series = series_from_closes(&[dec!(10), dec!(11), dec!(12.1), dec!(12)]);
        let record = record_with(&[(0, dec!(10), 1, dec!(11))], CostModel::Zero);
        let m = Metrics::compute(&series, &record);
        // entry and exit bar both count
        assert_eq!(m.bars_held, 2);
        let per_bar = m.average_profit_per_bar.unwrap();
        assert!((per_bar - dec!(1.0488088)).abs() < dec!(0.000001), "got {per_bar}");
    }

    #[test]
    fn drawdown_follows_closes_while_held() {
        // held from 10 through 12 and 9 down to an exit at 11
        let series = series_from_closes(&[dec!(10), dec!(12), dec!(9), dec!(11), dec!(5)]);
        let record = record_with(&[(0, dec!(10), 3, dec!(11))], CostModel::Zero);
        let m = Metrics::compute(&series, &record);
        // equity 1, 1.2, 0.9, 1.1, then flat at 1.1 after the exit
        assert_eq!(m.max_drawdown, Some(dec!(0.25)));
        assert_eq!(m.total_return, Some(dec!(1.1)));
        assert_eq!(m.reward_risk_ratio, Some(dec!(4.4)));
        assert_eq!(m.bars_held, 4);
    }

    #[test]
    fn flat_equity_has_no_reward_risk_ratio() {
        let series = series_from_closes(&[dec!(10), dec!(11), dec!(12)]);
        let record = record_with(&[(0, dec!(10), 2, dec!(12))], CostModel::Zero);
        let m = Metrics::compute(&series, &record);
        assert_eq!(m.max_drawdown, Some(dec!(0)));
        assert_eq!(m.reward_risk_ratio, None);
    }

    #[test]
    fn overflowing_totals_are_undefined() {
        let series = series_from_closes(&[dec!(1), dec!(3)]);
        let mut record = TradingRecord::new();
        record.enter(0, dec!(1), Decimal::MAX);
        record.exit(1, dec!(3), &CostModel::Zero);
        let m = Metrics::compute(&series, &record);
        assert_eq!(m.net_profit, None);
        assert_eq!(m.total_cost, Some(dec!(0)));
        assert_eq!(m.total_return, Some(dec!(3)));
        assert_eq!(m.profitable_trades, 0);
    }
}
