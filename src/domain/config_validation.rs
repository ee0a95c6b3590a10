//! Configuration validation.
//!
//! Reads every known key through the port, checks its range, and builds a
//! typed `RunConfig`. Absent keys take the `RunConfig` defaults, except
//! `[strategy] preset` and `[costs] rate` under the linear model.

use crate::domain::backtest::{InputKind, RunConfig};
use crate::domain::error::TraderError;
use crate::domain::execution::{CostModel, ExecutionConfig};
use crate::domain::strategy::{BandParams, StrategyPreset};
use crate::ports::config_port::ConfigPort;
use chrono::TimeDelta;
use rust_decimal::Decimal;

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, TraderError> {
    let defaults = RunConfig::default();

    let bar_duration = match positive_uint(config, "data", "bar_duration_secs")? {
        Some(secs) => i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| invalid("data", "bar_duration_secs", "bar_duration_secs is too large"))?,
        None => defaults.bar_duration,
    };

    Ok(RunConfig {
        bar_duration,
        input: input_kind(config)?.unwrap_or(defaults.input),
        bands: band_params(config, defaults.bands)?,
        preset: preset(config)?,
        unstable_period: uint(config, "strategy", "unstable_period")?
            .unwrap_or(defaults.unstable_period),
        execution: execution(config, &defaults.execution)?,
        stop_loss_pct: non_negative(config, "strategy", "stop_loss")?
            .unwrap_or(defaults.stop_loss_pct),
        take_profit_pct: non_negative(config, "strategy", "take_profit")?
            .unwrap_or(defaults.take_profit_pct),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> TraderError {
    TraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn uint(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<usize>, TraderError> {
    let value = config
        .get_uint(section, key)
        .map_err(|reason| invalid(section, key, reason))?;
    value
        .map(|v| usize::try_from(v).map_err(|_| invalid(section, key, format!("{key} is too large"))))
        .transpose()
}

fn positive_uint(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, TraderError> {
    match uint(config, section, key)? {
        Some(0) => Err(invalid(section, key, format!("{key} must be at least 1"))),
        other => Ok(other),
    }
}

fn decimal(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<Decimal>, TraderError> {
    config
        .get_decimal(section, key)
        .map_err(|reason| invalid(section, key, reason))
}

fn non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Decimal>, TraderError> {
    match decimal(config, section, key)? {
        Some(v) if v < Decimal::ZERO => Err(invalid(section, key, format!("{key} must be non-negative"))),
        other => Ok(other),
    }
}

fn input_kind(config: &dyn ConfigPort) -> Result<Option<InputKind>, TraderError> {
    match config.get_string("data", "input") {
        None => Ok(None),
        Some(s) => match s.to_lowercase().as_str() {
            "trades" => Ok(Some(InputKind::Trades)),
            "bars" => Ok(Some(InputKind::Bars)),
            _ => Err(invalid("data", "input", format!("expected 'trades' or 'bars', got '{s}'"))),
        },
    }
}

fn band_params(config: &dyn ConfigPort, defaults: BandParams) -> Result<BandParams, TraderError> {
    Ok(BandParams {
        sma_window: positive_uint(config, "indicators", "sma_window")?.unwrap_or(defaults.sma_window),
        stddev_window: positive_uint(config, "indicators", "stddev_window")?
            .unwrap_or(defaults.stddev_window),
        band_multiplier: decimal(config, "indicators", "band_multiplier")?
            .unwrap_or(defaults.band_multiplier),
    })
}

fn preset(config: &dyn ConfigPort) -> Result<StrategyPreset, TraderError> {
    config
        .get_string("strategy", "preset")
        .ok_or_else(|| missing("strategy", "preset"))?
        .parse()
        .map_err(|reason: String| invalid("strategy", "preset", reason))
}

fn execution(config: &dyn ConfigPort, defaults: &ExecutionConfig) -> Result<ExecutionConfig, TraderError> {
    let amount = match decimal(config, "strategy", "amount")? {
        Some(a) if a <= Decimal::ZERO => {
            return Err(invalid("strategy", "amount", "amount must be positive"));
        }
        Some(a) => a,
        None => defaults.amount,
    };

    let costs = match config.get_string("costs", "model").map(|m| m.to_lowercase()) {
        None => defaults.costs,
        Some(m) if m == "none" || m == "zero" => CostModel::Zero,
        Some(m) if m == "linear" => {
            let rate = decimal(config, "costs", "rate")?.ok_or_else(|| missing("costs", "rate"))?;
            if rate < Decimal::ZERO {
                return Err(invalid("costs", "rate", "rate must be non-negative"));
            }
            CostModel::Linear { rate }
        }
        Some(m) => {
            return Err(invalid(
                "costs",
                "model",
                format!("expected 'none' or 'linear', got '{m}'"),
            ));
        }
    };

    Ok(ExecutionConfig { amount, costs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use rust_decimal_macros::dec;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[data]
bar_duration_secs = 300
input = bars

[indicators]
sma_window = 10
stddev_window = 12
band_multiplier = -1.5

[strategy]
preset = nml-75-below
unstable_period = 27
amount = 2.5
stop_loss = 2
take_profit = 4.5

[costs]
model = linear
rate = 0.001
"#,
        );
        let run = load_run_config(&config).unwrap();
        assert_eq!(run.bar_duration, TimeDelta::seconds(300));
        assert_eq!(run.input, InputKind::Bars);
        assert_eq!(
            run.bands,
            BandParams {
                sma_window: 10,
                stddev_window: 12,
                band_multiplier: dec!(-1.5),
            }
        );
        assert_eq!(run.preset, StrategyPreset::Nml75Below);
        assert_eq!(run.unstable_period, 27);
        assert_eq!(run.execution.amount, dec!(2.5));
        assert_eq!(run.stop_loss_pct, dec!(2));
        assert_eq!(run.take_profit_pct, dec!(4.5));
        assert_eq!(run.execution.costs, CostModel::Linear { rate: dec!(0.001) });
    }

    #[test]
    fn minimal_config_takes_defaults() {
        let config = make_config("[strategy]\npreset = nml-cross\n");
        let run = load_run_config(&config).unwrap();
        assert_eq!(
            run,
            RunConfig {
                preset: StrategyPreset::NmlCross,
                ..RunConfig::default()
            }
        );
    }

    #[test]
    fn missing_preset_fails() {
        let err = load_run_config(&make_config("[data]\ninput = trades\n")).unwrap_err();
        assert!(matches!(err, TraderError::ConfigMissing { key, .. } if key == "preset"));
    }

    #[test]
    fn unknown_preset_fails() {
        let err = load_run_config(&make_config("[strategy]\npreset = moonshot\n")).unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "preset"));
    }

    #[test]
    fn zero_bar_duration_fails() {
        let err = load_run_config(&make_config(
            "[data]\nbar_duration_secs = 0\n[strategy]\npreset = nml-cross\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "bar_duration_secs"));
    }

    #[test]
    fn non_numeric_window_fails() {
        let err = load_run_config(&make_config(
            "[indicators]\nsma_window = twenty\n[strategy]\npreset = nml-cross\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "sma_window"));
    }

    #[test]
    fn zero_stddev_window_fails() {
        let err = load_run_config(&make_config(
            "[indicators]\nstddev_window = 0\n[strategy]\npreset = nml-cross\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "stddev_window"));
    }

    #[test]
    fn unknown_input_kind_fails() {
        let err = load_run_config(&make_config(
            "[data]\ninput = ticks\n[strategy]\npreset = nml-cross\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "input"));
    }

    #[test]
    fn non_positive_amount_fails() {
        let err = load_run_config(&make_config("[strategy]\npreset = nml-cross\namount = 0\n"))
            .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "amount"));
    }

    #[test]
    fn negative_stop_loss_fails() {
        let err = load_run_config(&make_config("[strategy]\npreset = nml-cross\nstop_loss = -1\n"))
            .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "stop_loss"));
    }

    #[test]
    fn zero_take_profit_leaves_stops_off() {
        let run = load_run_config(&make_config("[strategy]\npreset = nml-cross\ntake_profit = 0\n"))
            .unwrap();
        assert_eq!(run.take_profit_pct, Decimal::ZERO);
        assert_eq!(run.stop_loss_pct, Decimal::ZERO);
    }

    #[test]
    fn linear_model_requires_rate() {
        let err = load_run_config(&make_config(
            "[strategy]\npreset = nml-cross\n[costs]\nmodel = linear\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TraderError::ConfigMissing { key, .. } if key == "rate"));
    }

    #[test]
    fn negative_rate_fails() {
        let err = load_run_config(&make_config(
            "[strategy]\npreset = nml-cross\n[costs]\nmodel = linear\nrate = -0.1\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "rate"));
    }

    #[test]
    fn unknown_cost_model_fails() {
        let err = load_run_config(&make_config(
            "[strategy]\npreset = nml-cross\n[costs]\nmodel = tiered\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { key, .. } if key == "model"));
    }

    #[test]
    fn none_model_ignores_rate() {
        let run = load_run_config(&make_config(
            "[strategy]\npreset = nml-cross\n[costs]\nmodel = none\nrate = 0.5\n",
        ))
        .unwrap();
        assert_eq!(run.execution.costs, CostModel::Zero);
    }
}
