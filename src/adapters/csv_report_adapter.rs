//! CSV export of bars, indicator values and trades.
//!
//! Writes `bars.csv` and `trades.csv` into an output directory. Undefined
//! indicator values are written as empty cells.

use crate::domain::backtest::IndicatorColumn;
use crate::domain::bar::BarSeries;
use crate::domain::error::TraderError;
use crate::domain::trade::TradingRecord;
use crate::ports::report_port::ReportPort;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const BARS_FILE: &str = "bars.csv";
pub const TRADES_FILE: &str = "trades.csv";

pub struct CsvReportAdapter {
    dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn writer(&self, name: &str) -> Result<(csv::Writer<fs::File>, PathBuf), TraderError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let file = fs::File::create(&path)?;
        Ok((csv::Writer::from_writer(file), path))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> TraderError {
    TraderError::Csv {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn cell(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Undefined values are written as empty cells.
fn optional_cell(value: Option<Decimal>) -> String {
    value.map(cell).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write_bars(&self, series: &BarSeries, indicators: &[IndicatorColumn]) -> Result<(), TraderError> {
        let (mut wtr, path) = self.writer(BARS_FILE)?;

        let mut header: Vec<String> = [
            "index", "open_time", "end_time", "open", "high", "low", "close", "volume", "trades",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(indicators.iter().map(|c| c.label.clone()));
        wtr.write_record(&header).map_err(|e| csv_error(&path, e))?;

        for (i, bar) in series.bars().iter().enumerate() {
            let mut row = vec![
                i.to_string(),
                bar.open_time().to_rfc3339(),
                bar.end_time().to_rfc3339(),
                cell(bar.open()),
                cell(bar.high()),
                cell(bar.low()),
                cell(bar.close()),
                cell(bar.volume()),
                bar.trade_count().to_string(),
            ];
            row.extend(
                indicators
                    .iter()
                    .map(|c| optional_cell(c.values.get(i).copied().flatten())),
            );
            wtr.write_record(&row).map_err(|e| csv_error(&path, e))?;
        }

        wtr.flush()?;
        info!(path = %path.display(), bars = series.len(), "wrote bars");
        Ok(())
    }

    fn write_trades(&self, series: &BarSeries, record: &TradingRecord) -> Result<(), TraderError> {
        let (mut wtr, path) = self.writer(TRADES_FILE)?;

        wtr.write_record([
            "entry_index",
            "entry_time",
            "entry_price",
            "exit_index",
            "exit_time",
            "exit_price",
            "amount",
            "cost",
            "net_profit",
        ])
        .map_err(|e| csv_error(&path, e))?;

        let time_at = |index: usize| {
            series
                .get(index)
                .map(|b| b.end_time().to_rfc3339())
                .unwrap_or_default()
        };

        for trade in record.trades() {
            let (entry, exit) = (trade.entry(), trade.exit());
            wtr.write_record([
                entry.index.to_string(),
                time_at(entry.index),
                cell(entry.price),
                exit.index.to_string(),
                time_at(exit.index),
                cell(exit.price),
                cell(entry.amount),
                optional_cell(trade.cost()),
                optional_cell(trade.net_profit()),
            ])
            .map_err(|e| csv_error(&path, e))?;
        }

        // an open entry is listed with empty exit cells
        if let Some(entry) = record.open_entry() {
            wtr.write_record([
                entry.index.to_string(),
                time_at(entry.index),
                cell(entry.price),
                String::new(),
                String::new(),
                String::new(),
                cell(entry.amount),
                String::new(),
                String::new(),
            ])
            .map_err(|e| csv_error(&path, e))?;
        }

        wtr.flush()?;
        info!(path = %path.display(), trades = record.trade_count(), "wrote trades");
        Ok(())
    }
}
