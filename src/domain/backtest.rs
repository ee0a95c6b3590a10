//! Run configuration and the per-run owner of series, config and strategy.
//!
//! `StrategyRun::execute` builds a fresh indicator graph every time, so two
//! runs (or two executions of one run) never share a cache.

use crate::domain::bar::BarSeries;
use crate::domain::execution::{run_strategy, ExecutionConfig};
use crate::domain::indicator::{IndicatorGraph, Num};
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{BandParams, StrategyPreset};
use crate::domain::trade::TradingRecord;
use chrono::TimeDelta;
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    #[default]
    Trades,
    Bars,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub bar_duration: TimeDelta,
    pub input: InputKind,
    pub bands: BandParams,
    pub preset: StrategyPreset,
    pub unstable_period: usize,
    /// Percent below the entry price that forces an exit; zero is off.
    pub stop_loss_pct: Decimal,
    /// Percent above the entry price that forces an exit; zero is off.
    pub take_profit_pct: Decimal,
    pub execution: ExecutionConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            bar_duration: TimeDelta::seconds(60),
            input: InputKind::Trades,
            bands: BandParams::default(),
            preset: StrategyPreset::NmlCross,
            unstable_period: 0,
            stop_loss_pct: Decimal::ZERO,
            take_profit_pct: Decimal::ZERO,
            execution: ExecutionConfig::default(),
        }
    }
}

/// One exported indicator: its label and a value per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub label: String,
    pub values: Vec<Num>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub strategy: String,
    pub unstable_period: usize,
    pub derived_unstable_period: usize,
    pub record: TradingRecord,
    pub indicators: Vec<IndicatorColumn>,
    pub metrics: Metrics,
}

pub struct StrategyRun {
    series: BarSeries,
    config: RunConfig,
}

impl StrategyRun {
    pub fn new(series: BarSeries, config: RunConfig) -> Self {
        StrategyRun { series, config }
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    pub fn execute(&self) -> RunOutput {
        let mut graph = IndicatorGraph::new(&self.series);
        let strategy = self
            .config
            .preset
            .build(&mut graph, &self.config.bands)
            .with_stops(&mut graph, self.config.stop_loss_pct, self.config.take_profit_pct)
            .with_unstable_period(self.config.unstable_period);

        let derived = strategy.derived_unstable_period(&graph);
        if derived > strategy.unstable_period {
            warn!(
                strategy = %strategy.name,
                configured = strategy.unstable_period,
                derived,
                "unstable period shorter than indicator warm-up"
            );
        }

        let record = run_strategy(&strategy, &self.series, &graph, &self.config.execution);

        let indicators = strategy
            .indicators()
            .into_iter()
            .filter(|id| !graph.kind(*id).is_source())
            .map(|id| IndicatorColumn {
                label: graph.label(id),
                values: graph.values(id),
            })
            .collect();

        let metrics = Metrics::compute(&self.series, &record);
        info!(
            strategy = %strategy.name,
            series = self.series.name(),
            bars = self.series.len(),
            trades = metrics.trade_count,
            open = record.is_open(),
            net_profit = ?metrics.net_profit,
            "strategy run complete"
        );

        RunOutput {
            strategy: strategy.name,
            unstable_period: strategy.unstable_period,
            derived_unstable_period: derived,
            record,
            indicators,
            metrics,
        }
    }
}
