//! CLI definition and dispatch.

use chrono::TimeDelta;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregator::aggregate_trades;
use crate::domain::backtest::{InputKind, RunConfig, RunOutput, StrategyRun};
use crate::domain::bar::BarSeries;
use crate::domain::config_validation::load_run_config;
use crate::domain::error::TraderError;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "nmltrader", about = "No-Man's-Land Bollinger strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputArg {
    Trades,
    Bars,
}

impl From<InputArg> for InputKind {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Trades => InputKind::Trades,
            InputArg::Bars => InputKind::Bars,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate a trade or bar file into fixed-duration bars
    Aggregate {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = InputArg::Trades)]
        kind: InputArg,
        #[arg(long, default_value_t = 60)]
        bar_duration_secs: u32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a strategy preset over a data file
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a run configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Aggregate {
            input,
            kind,
            bar_duration_secs,
            output,
        } => run_aggregate(
            &input,
            kind.into(),
            TimeDelta::seconds(i64::from(bar_duration_secs)),
            output.as_deref(),
        ),
        Command::Backtest {
            config,
            input,
            output,
        } => run_backtest(&config, &input, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, TraderError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    load_run_config(&adapter)
}

/// Read every record from `data`, then build the series. Trade files are
/// aggregated into bars of `duration`; bar files load one bar per row.
pub fn load_series(
    data: &dyn DataPort,
    input: InputKind,
    duration: TimeDelta,
) -> Result<BarSeries, TraderError> {
    let name = data.series_name();
    match input {
        InputKind::Trades => aggregate_trades(&name, data.fetch_trades()?, duration),
        InputKind::Bars => BarSeries::from_rows(name, &data.fetch_ohlcv()?, duration),
    }
}

/// Load, execute and optionally export one run.
pub fn run_pipeline(
    data: &dyn DataPort,
    config: RunConfig,
    report: Option<&dyn ReportPort>,
) -> Result<RunOutput, TraderError> {
    let series = load_series(data, config.input, config.bar_duration)?;
    let run = StrategyRun::new(series, config);
    let output = run.execute();

    if let Some(report) = report {
        report.write_bars(run.series(), &output.indicators)?;
        report.write_trades(run.series(), &output.record)?;
    }
    Ok(output)
}

fn run_aggregate(
    input: &Path,
    kind: InputKind,
    duration: TimeDelta,
    output: Option<&Path>,
) -> Result<(), TraderError> {
    let data = CsvAdapter::new(input.to_path_buf());
    let series = match kind {
        InputKind::Trades => aggregate_trades(&data.series_name(), data.fetch_trades()?, duration)?,
        InputKind::Bars => aggregate_trades(&data.series_name(), data.fetch_ohlcv()?, duration)?,
    };

    println!("Series:  {}", series.name());
    println!("Bars:    {}", series.len());
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!("From:    {}", first.open_time().to_rfc3339());
        println!("To:      {}", last.end_time().to_rfc3339());
    }

    if let Some(dir) = output {
        CsvReportAdapter::new(dir.to_path_buf()).write_bars(&series, &[])?;
    }
    Ok(())
}

fn run_backtest(config_path: &Path, input: &Path, output: Option<&Path>) -> Result<(), TraderError> {
    info!(config = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let data = CsvAdapter::new(input.to_path_buf());
    let report = output.map(|dir| CsvReportAdapter::new(dir.to_path_buf()));

    let out = run_pipeline(&data, config, report.as_ref().map(|r| r as &dyn ReportPort))?;
    print_summary(&out);
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TraderError> {
    let config = load_config(config_path)?;
    println!("Config OK: {}", config_path.display());
    println!("  preset:          {}", config.preset);
    println!("  input:           {:?}", config.input);
    println!("  bar duration:    {}s", config.bar_duration.num_seconds());
    println!(
        "  bands:           SMA {} / STDDEV {} / k {}",
        config.bands.sma_window, config.bands.stddev_window, config.bands.band_multiplier
    );
    println!("  unstable period: {}", config.unstable_period);
    println!("  amount:          {}", config.execution.amount);
    println!("  costs:           {:?}", config.execution.costs);
    println!(
        "  stops:           loss {}% / profit {}%",
        config.stop_loss_pct, config.take_profit_pct
    );
    Ok(())
}

fn print_summary(out: &RunOutput) {
    let m = &out.metrics;
    println!("=== {} ===", out.strategy);
    println!(
        "Unstable period:   {} (indicators need {})",
        out.unstable_period, out.derived_unstable_period
    );
    println!("Trades:            {}", m.trade_count);
    if let Some(ratio) = m.profitable_ratio {
        println!("Profitable:        {} ({:.1}%)", m.profitable_trades, ratio * Decimal::ONE_HUNDRED);
    }
    println!("Total return:      {}", four_places(m.total_return));
    println!("Net profit:        {}", four_places(m.net_profit));
    println!("Costs:             {}", four_places(m.total_cost));
    println!("Bars held:         {}", m.bars_held);
    println!("Avg profit / bar:  {}", four_places(m.average_profit_per_bar));
    println!("Max drawdown:      {}", four_places(m.max_drawdown));
    println!("Reward-risk ratio: {}", four_places(m.reward_risk_ratio));
    println!("Buy and hold:      {}", four_places(m.buy_and_hold_return));
    println!("vs buy and hold:   {}", four_places(m.versus_buy_and_hold));
    if let Some(open) = out.record.open_entry() {
        println!("Open position:     entered at bar {} @ {}", open.index, open.price);
    }
}

fn four_places(value: Option<Decimal>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}
