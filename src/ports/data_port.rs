//! Data access port trait.

use crate::domain::error::TraderError;
use crate::domain::record::{OhlcvRecord, TradeRecord};

/// A source of raw records. Every record is parsed before any is returned,
/// so one bad row fails the whole load.
pub trait DataPort {
    /// Name given to series built from this source.
    fn series_name(&self) -> String;

    fn fetch_trades(&self) -> Result<Vec<TradeRecord>, TraderError>;

    fn fetch_ohlcv(&self) -> Result<Vec<OhlcvRecord>, TraderError>;
}
