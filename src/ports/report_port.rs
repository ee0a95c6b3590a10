//! Report output port trait.

use crate::domain::backtest::IndicatorColumn;
use crate::domain::bar::BarSeries;
use crate::domain::error::TraderError;
use crate::domain::trade::TradingRecord;

/// Port for writing run outputs.
pub trait ReportPort {
    /// One row per bar; one extra column per indicator.
    fn write_bars(&self, series: &BarSeries, indicators: &[IndicatorColumn]) -> Result<(), TraderError>;

    fn write_trades(&self, series: &BarSeries, record: &TradingRecord) -> Result<(), TraderError>;
}
