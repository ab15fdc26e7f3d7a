//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: moving average over n periods
//! - Upper: Middle + (k × StdDev)
//! - Lower: Middle - (k × StdDev)
//! - Width: Upper - Lower
//!
//! Where StdDev is sample standard deviation (divides by N-1).
//! A flat window has StdDev 0 and middle equal to the shared close, so all
//! three bands coincide exactly. A period of 1 also has StdDev 0.
//!
//! Default parameters: period=20, k=2.0
//! Warmup: first (period-1) bars have no value.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_K: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
}

pub fn calculate_bollinger(
    bars: &[PriceBar],
    period: usize,
    k: f64,
) -> IndicatorSeries<BollingerValue> {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            date: bar.date,
            value: if period > 0 && i + 1 >= period {
                Some(band(&bars[i + 1 - period..=i], k))
            } else {
                None
            },
        })
        .collect();

    IndicatorSeries { values }
}

fn band(window: &[PriceBar], k: f64) -> BollingerValue {
    let first = window[0].close;
    let (middle, stddev) = if window.iter().all(|b| b.close == first) {
        (first, 0.0)
    } else {
        let n = window.len() as f64;
        let middle = window.iter().map(|b| b.close).sum::<f64>() / n;
        let variance = window
            .iter()
            .map(|b| {
                let diff = b.close - middle;
                diff * diff
            })
            .sum::<f64>()
            / (n - 1.0);
        (middle, variance.sqrt())
    };
    let upper = middle + k * stddev;
    let lower = middle - k * stddev;

    BollingerValue {
        upper,
        middle,
        lower,
        width: upper - lower,
    }
}
