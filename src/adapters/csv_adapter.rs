//! CSV file data adapter.
//!
//! Trade files carry `timestamp,price,volume`; bar files carry
//! `timestamp,open,high,low,close,volume`. Both start with a header line.
//! Error line numbers count the header as line 1.

use crate::domain::error::TraderError;
use crate::domain::record::{OhlcvRecord, TradeRecord};
use crate::ports::data_port::DataPort;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_rows<T>(
        &self,
        parse: impl Fn(&[&str], usize) -> Result<T, TraderError>,
    ) -> Result<Vec<T>, TraderError> {
        let file = File::open(&self.path)?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| match e.position() {
                Some(pos) => TraderError::malformed(pos.line() as usize, e.to_string()),
                None => TraderError::Csv {
                    reason: format!("{}: {}", self.path.display(), e),
                },
            })?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            let fields: Vec<&str> = record.iter().collect();
            rows.push(parse(&fields, line)?);
        }

        info!(path = %self.path.display(), rows = rows.len(), "loaded csv");
        Ok(rows)
    }
}

impl DataPort for CsvAdapter {
    fn series_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn fetch_trades(&self) -> Result<Vec<TradeRecord>, TraderError> {
        self.read_rows(TradeRecord::parse)
    }

    fn fetch_ohlcv(&self) -> Result<Vec<OhlcvRecord>, TraderError> {
        self.read_rows(OhlcvRecord::parse)
    }
}
