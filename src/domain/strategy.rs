//! Strategy definition and the named No-Man's-Land presets.
//!
//! Every preset draws the No-Man's-Land line as the "lower" Bollinger band
//! with a negative multiplier, so with k = -1 it sits one deviation above
//! the middle band.

use crate::domain::indicator::{IndicatorGraph, NumericId};
use crate::domain::rule::Rule;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub entry: Rule,
    pub exit: Rule,
    /// Indices below this never trigger either rule.
    pub unstable_period: usize,
}

impl Strategy {
    pub fn new(name: impl Into<String>, entry: Rule, exit: Rule) -> Self {
        Strategy {
            name: name.into(),
            entry,
            exit,
            unstable_period: 0,
        }
    }

    pub fn with_unstable_period(mut self, unstable_period: usize) -> Self {
        self.unstable_period = unstable_period;
        self
    }

    /// OR a stop loss and a take profit into the exit rule. Both are
    /// percentages of the entry price checked against the close; zero
    /// leaves that stop off.
    pub fn with_stops(
        mut self,
        graph: &mut IndicatorGraph,
        stop_loss_pct: Decimal,
        take_profit_pct: Decimal,
    ) -> Self {
        let close = graph.close_price();
        if stop_loss_pct > Decimal::ZERO {
            self.exit = self.exit.or(Rule::StopLoss {
                price: close,
                pct: stop_loss_pct,
            });
        }
        if take_profit_pct > Decimal::ZERO {
            self.exit = self.exit.or(Rule::StopGain {
                price: close,
                pct: take_profit_pct,
            });
        }
        self
    }

    /// Warm-up implied by the indicators both rules read. A cross rule
    /// looks one bar back, so the first meaningful cross comes one bar
    /// after its inputs stabilize; that is not added here.
    pub fn derived_unstable_period(&self, graph: &IndicatorGraph) -> usize {
        let numeric = self
            .entry
            .numeric_inputs()
            .into_iter()
            .chain(self.exit.numeric_inputs())
            .map(|id| graph.unstable_period(id));
        let boolean = self
            .entry
            .boolean_inputs()
            .into_iter()
            .chain(self.exit.boolean_inputs())
            .map(|id| graph.boolean_unstable_period(id));
        numeric.chain(boolean).max().unwrap_or(0)
    }

    /// Numeric indicators read by either rule, entry first.
    pub fn indicators(&self) -> Vec<NumericId> {
        let mut ids = self.entry.numeric_inputs();
        for id in self.exit.numeric_inputs() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Band parameters shared by every preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandParams {
    pub sma_window: usize,
    pub stddev_window: usize,
    pub band_multiplier: Decimal,
}

impl Default for BandParams {
    fn default() -> Self {
        BandParams {
            sma_window: 20,
            stddev_window: 20,
            band_multiplier: Decimal::NEGATIVE_ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyPreset {
    /// Enter when the close crosses up through the No-Man's-Land line,
    /// leave when it crosses back down.
    NmlCross,
    /// Enter on the No-Man's-Land cross; leave on a red candle once the
    /// averaged close/open %B crosses up through 0.5.
    NmlDoublePercentB,
    /// EMA and MACD trend filter on the entry; leave on a red candle whose
    /// body sits at least 75% below the line.
    Nml75Below,
}

impl StrategyPreset {
    pub const ALL: [StrategyPreset; 3] = [
        StrategyPreset::NmlCross,
        StrategyPreset::NmlDoublePercentB,
        StrategyPreset::Nml75Below,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyPreset::NmlCross => "nml-cross",
            StrategyPreset::NmlDoublePercentB => "nml-double-percent-b",
            StrategyPreset::Nml75Below => "nml-75-below",
        }
    }

    /// Register the preset's indicators on `graph` and return its rules.
    pub fn build(&self, graph: &mut IndicatorGraph, params: &BandParams) -> Strategy {
        let close = graph.close_price();
        let nml = graph
            .bollinger_bands(
                close,
                params.sma_window,
                params.stddev_window,
                params.band_multiplier,
            )
            .lower;
        let entry_cross = Rule::CrossedUp {
            left: close,
            right: nml,
        };

        match self {
            StrategyPreset::NmlCross => Strategy::new(
                self.name(),
                entry_cross,
                Rule::CrossedDown {
                    left: close,
                    right: nml,
                },
            ),
            StrategyPreset::NmlDoublePercentB => {
                let open = graph.open_price();
                let double = graph.double_percent_b(close, open, params.sma_window);
                let half = graph.constant(dec!(0.5));
                let exit = Rule::CrossedUp {
                    left: double,
                    right: half,
                }
                .and(Rule::Boolean(graph.red_candle()));
                Strategy::new(self.name(), entry_cross, exit)
            }
            StrategyPreset::Nml75Below => {
                let short = graph.ema(close, 9);
                let long = graph.ema(close, 26);
                let macd = graph.difference(short, long);
                let signal = graph.ema(macd, 18);
                let entry = Rule::Over {
                    left: short,
                    right: long,
                }
                .and(Rule::Over {
                    left: macd,
                    right: signal,
                })
                .and(entry_cross);

                let below = graph.candle_body_percent_below(nml);
                let three_quarters = graph.constant(dec!(0.75));
                let exit = Rule::Boolean(graph.red_candle()).and(Rule::Over {
                    left: below,
                    right: three_quarters,
                });
                Strategy::new(self.name(), entry, exit)
            }
        }
    }
}

impl fmt::Display for StrategyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        StrategyPreset::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = StrategyPreset::ALL.iter().map(|p| p.name()).collect();
                format!("unknown preset '{}', expected one of {}", s.trim(), names.join(", "))
            })
    }
}
