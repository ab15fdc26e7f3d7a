//! Simple moving average of closing prices.
//!
//! MA(n)[i] = (C[i-n+1] + ... + C[i]) / n
//! Warmup: first (n-1) bars have no value.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_ma(bars: &[PriceBar], period: usize) -> IndicatorSeries<f64> {
    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if period > 0 && i >= period {
            sum -= bars[i - period].close;
        }

        let value = if period > 0 && i + 1 >= period {
            Some(sum / period as f64)
        } else {
            None
        };

        values.push(IndicatorPoint {
            date: bar.date,
            value,
        });
    }

    IndicatorSeries { values }
}
