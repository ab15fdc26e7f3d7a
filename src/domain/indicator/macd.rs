//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! DIF = EMA(fast) - EMA(slow)
//! DEA = EMA(signal) of DIF, seeded with the SMA of the first `signal` DIF values
//! hist = 2 * (DIF - DEA)
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: the triple has no value until DEA exists, i.e. for the first
//! max(fast, slow) - 1 + signal - 1 bars (33 with defaults, present from the 34th bar).

use crate::domain::indicator::{ema_of, IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdValue {
    pub dif: f64,
    pub dea: f64,
    pub hist: f64,
}

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries<MacdValue> {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            values: bars
                .iter()
                .map(|b| IndicatorPoint {
                    date: b.date,
                    value: None,
                })
                .collect(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_of(&closes, fast);
    let ema_slow = ema_of(&closes, slow);

    let dif: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let dif_start = fast.max(slow) - 1;
    let dif_values: Vec<f64> = dif.iter().skip(dif_start).flatten().copied().collect();
    let dea_tail = ema_of(&dif_values, signal_period);

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let value = match (dif[i], i.checked_sub(dif_start).and_then(|j| dea_tail.get(j))) {
            (Some(dif), Some(Some(dea))) => Some(MacdValue {
                dif,
                dea: *dea,
                hist: 2.0 * (dif - dea),
            }),
            _ => None,
        };
        values.push(IndicatorPoint {
            date: bar.date,
            value,
        });
    }

    IndicatorSeries { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{make_bars, ramp};
    use approx::assert_relative_eq;

    fn macd_default(bars: &[PriceBar]) -> IndicatorSeries<MacdValue> {
        calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
    }

    #[test]
    fn macd_warmup_default() {
        let bars = make_bars(&ramp(40, 100.0, 1.0));
        let series = macd_default(&bars);

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        assert_eq!(warmup, 33);
        for i in 0..warmup {
            assert!(series.value_at(i).is_none(), "index {} should be absent", i);
        }
        assert!(series.value_at(warmup).is_some());
    }

    #[test]
    fn macd_absent_with_33_bars_present_with_34() {
        let series = macd_default(&make_bars(&ramp(33, 10.0, 0.5)));
        assert!(series.values.iter().all(|p| p.value.is_none()));

        let series = macd_default(&make_bars(&ramp(34, 10.0, 0.5)));
        assert!(series.value_at(33).is_some());
    }

    #[test]
    fn macd_hist_is_twice_dif_minus_dea() {
        let bars = make_bars(&ramp(60, 100.0, 0.7));
        let series = macd_default(&bars);

        for point in &series.values {
            if let Some(v) = point.value {
                assert_relative_eq!(v.hist, 2.0 * (v.dif - v.dea), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn macd_dif_is_ema_fast_minus_ema_slow() {
        let closes = ramp(12, 10.0, 10.0);
        let bars = make_bars(&closes);
        let series = calculate_macd(&bars, 3, 5, 2);

        let ema_fast = ema_of(&closes, 3);
        let ema_slow = ema_of(&closes, 5);
        for (i, point) in series.values.iter().enumerate() {
            if let Some(v) = point.value {
                let expected = ema_fast[i].unwrap() - ema_slow[i].unwrap();
                assert_relative_eq!(v.dif, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn macd_dea_seed_is_mean_of_first_difs() {
        let closes = ramp(10, 10.0, 3.0);
        let bars = make_bars(&closes);
        let series = calculate_macd(&bars, 3, 5, 2);

        let ema_fast = ema_of(&closes, 3);
        let ema_slow = ema_of(&closes, 5);
        let dif4 = ema_fast[4].unwrap() - ema_slow[4].unwrap();
        let dif5 = ema_fast[5].unwrap() - ema_slow[5].unwrap();

        assert!(series.value_at(4).is_none());
        let first = series.value_at(5).unwrap();
        assert_relative_eq!(first.dea, (dif4 + dif5) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn macd_flat_prices_are_zero() {
        let series = macd_default(&make_bars(&[50.0; 40]));
        let last = series.value_at(39).unwrap();
        assert_relative_eq!(last.dif, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.dea, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.hist, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn macd_zero_period() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        for (f, s, sig) in [(0, 26, 9), (12, 0, 9), (12, 26, 0)] {
            let series = calculate_macd(&bars, f, s, sig);
            assert_eq!(series.values.len(), 3);
            assert!(series.values.iter().all(|p| p.value.is_none()));
        }
    }

    #[test]
    fn macd_empty_bars() {
        assert!(macd_default(&[]).values.is_empty());
    }

    #[test]
    fn macd_custom_parameters() {
        let series = calculate_macd(&make_bars(&ramp(20, 100.0, 1.0)), 5, 10, 3);
        let warmup = 10 - 1 + 3 - 1;
        assert!(series.value_at(warmup - 1).is_none());
        assert!(series.value_at(warmup).is_some());
    }
}
