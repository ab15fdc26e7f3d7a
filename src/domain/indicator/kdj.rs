//! KDJ stochastic oscillator.
//!
//! RSV = (C - LLV(L, n)) / (HHV(H, n) - LLV(L, n)) * 100, 50 when the range is zero
//! K = ((m1 - 1) * K[prev] + RSV) / m1
//! D = ((m2 - 1) * D[prev] + K) / m2
//! J = 3K - 2D
//!
//! K and D are seeded with 50 before the first RSV.
//! Warmup: first (n-1) bars have no value.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_N: usize = 9;
pub const DEFAULT_M1: usize = 3;
pub const DEFAULT_M2: usize = 3;

const SEED: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KdjValue {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

pub fn calculate_kdj(
    bars: &[PriceBar],
    n: usize,
    m1: usize,
    m2: usize,
) -> IndicatorSeries<KdjValue> {
    let mut values = Vec::with_capacity(bars.len());
    let mut k_prev = SEED;
    let mut d_prev = SEED;
    let degenerate = n == 0 || m1 == 0 || m2 == 0;

    for (i, bar) in bars.iter().enumerate() {
        if degenerate || i + 1 < n {
            values.push(IndicatorPoint {
                date: bar.date,
                value: None,
            });
            continue;
        }

        let window = &bars[i + 1 - n..=i];
        let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let range = highest - lowest;
        let rsv = if range > 0.0 {
            (bar.close - lowest) / range * 100.0
        } else {
            50.0
        };

        let k = ((m1 - 1) as f64 * k_prev + rsv) / m1 as f64;
        let d = ((m2 - 1) as f64 * d_prev + k) / m2 as f64;
        let j = 3.0 * k - 2.0 * d;
        k_prev = k;
        d_prev = d;

        values.push(IndicatorPoint {
            date: bar.date,
            value: Some(KdjValue { k, d, j }),
        });
    }

    IndicatorSeries { values }
}
