//! Price history port trait.

use crate::domain::error::SignalwatchError;
use crate::domain::ohlcv::PriceBar;

pub trait PriceHistoryPort: Send + Sync {
    /// Daily bars for `instrument_id`, ascending by date.
    fn get_price_series(&self, instrument_id: &str) -> Result<Vec<PriceBar>, SignalwatchError>;
}
