//! Technical indicator implementations.
//!
//! Each calculator turns an ascending price series into an `IndicatorSeries`
//! with exactly one point per bar. Bars inside an indicator's warm-up window
//! carry `value: None`; a present value is never a stand-in for missing data.
//!
//! - `IndicatorPoint`: one dated point, `None` while warming up
//! - `IndicatorParams`: the parameter set used to build snapshots
//! - `IndicatorSnapshot`: every indicator value for one bar

pub mod bollinger;
pub mod ema;
pub mod kdj;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod snapshot;

pub use bollinger::{calculate_bollinger, BollingerValue};
pub use ema::ema_of;
pub use kdj::{calculate_kdj, KdjValue};
pub use ma::calculate_ma;
pub use macd::{calculate_macd, MacdValue};
pub use rsi::calculate_rsi;
pub use snapshot::{calculate_snapshots, IndicatorSnapshot};

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint<T> {
    pub date: NaiveDate,
    pub value: Option<T>,
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries<T> {
    pub values: Vec<IndicatorPoint<T>>,
}

impl<T: Copy> IndicatorSeries<T> {
    /// The value at `index`, `None` if warming up or out of range.
    pub fn value_at(&self, index: usize) -> Option<T> {
        self.values.get(index).and_then(|p| p.value)
    }
}

pub const DEFAULT_MA_PERIODS: [usize; 4] = [5, 10, 20, 60];

/// Parameters for every indicator carried in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub ma_periods: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub kdj_n: usize,
    pub kdj_m1: usize,
    pub kdj_m2: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_periods: DEFAULT_MA_PERIODS.to_vec(),
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            rsi_period: rsi::DEFAULT_PERIOD,
            kdj_n: kdj::DEFAULT_N,
            kdj_m1: kdj::DEFAULT_M1,
            kdj_m2: kdj::DEFAULT_M2,
            bollinger_period: bollinger::DEFAULT_PERIOD,
            bollinger_k: bollinger::DEFAULT_K,
        }
    }
}

impl IndicatorParams {
    pub fn has_ma_period(&self, period: usize) -> bool {
        self.ma_periods.contains(&period)
    }
}
