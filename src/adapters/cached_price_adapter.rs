//! TTL cache in front of a price history provider.
//!
//! Successful series are cached per instrument until the TTL elapses.
//! Errors are passed through and never cached.

use crate::domain::error::SignalwatchError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::price_port::PriceHistoryPort;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::trace;

pub struct CachedPriceHistory {
    inner: Arc<dyn PriceHistoryPort>,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Vec<PriceBar>)>>,
}

impl CachedPriceHistory {
    pub fn new(inner: Arc<dyn PriceHistoryPort>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (Instant, Vec<PriceBar>)>> {
        // entries are replaced whole, so a poisoned map is still usable
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PriceHistoryPort for CachedPriceHistory {
    fn get_price_series(&self, instrument_id: &str) -> Result<Vec<PriceBar>, SignalwatchError> {
        if let Some((fetched_at, bars)) = self.entries().get(instrument_id) {
            if fetched_at.elapsed() < self.ttl {
                trace!(instrument = instrument_id, "price cache hit");
                return Ok(bars.clone());
            }
        }

        // The lock is not held across the fetch; concurrent misses may both fetch.
        let bars = self.inner.get_price_series(instrument_id)?;
        self.entries()
            .insert(instrument_id.to_string(), (Instant::now(), bars.clone()));
        Ok(bars)
    }
}
