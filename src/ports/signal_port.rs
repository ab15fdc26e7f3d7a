//! Signal store port trait.

use crate::domain::error::SignalwatchError;
use crate::domain::signal::Signal;
use chrono::NaiveDate;

pub trait SignalStorePort: Send + Sync {
    /// Inserts or overwrites the signal keyed by `(instrument_id, date)`.
    fn upsert_signal(
        &self,
        instrument_id: &str,
        date: NaiveDate,
        signal: &Signal,
    ) -> Result<(), SignalwatchError>;
}
