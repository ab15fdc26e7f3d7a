//! Per-bar indicator snapshots.
//!
//! A snapshot gathers every configured indicator for one bar. Indicators still
//! warming up are simply absent: a missing MA period has no map entry and the
//! multi-field indicators are `None`.

use crate::domain::indicator::{
    calculate_bollinger, calculate_kdj, calculate_ma, calculate_macd, calculate_rsi,
    BollingerValue, IndicatorParams, KdjValue, MacdValue,
};
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub ma: BTreeMap<usize, f64>,
    pub macd: Option<MacdValue>,
    pub rsi: Option<f64>,
    pub kdj: Option<KdjValue>,
    pub bollinger: Option<BollingerValue>,
}

impl IndicatorSnapshot {
    pub fn ma(&self, period: usize) -> Option<f64> {
        self.ma.get(&period).copied()
    }

    /// JSON object keyed by indicator name, with only the fields that have values.
    ///
    /// `{"MA": {"MA5": ..}, "MACD": {"DIF", "DEA", "MACD"}, "RSI": {"RSI"},
    ///   "KDJ": {"K", "D", "J"}, "Bollinger": {"upper", "middle", "lower", "width"}}`
    pub fn to_json(&self) -> Value {
        let ma: Map<String, Value> = self
            .ma
            .iter()
            .map(|(period, value)| (format!("MA{}", period), json!(value)))
            .collect();

        let macd = self.macd.map_or_else(
            || json!({}),
            |m| json!({"DIF": m.dif, "DEA": m.dea, "MACD": m.hist}),
        );
        let rsi = self.rsi.map_or_else(|| json!({}), |r| json!({"RSI": r}));
        let kdj = self
            .kdj
            .map_or_else(|| json!({}), |v| json!({"K": v.k, "D": v.d, "J": v.j}));
        let bollinger = self.bollinger.map_or_else(
            || json!({}),
            |b| json!({"upper": b.upper, "middle": b.middle, "lower": b.lower, "width": b.width}),
        );

        json!({
            "MA": ma,
            "MACD": macd,
            "RSI": rsi,
            "KDJ": kdj,
            "Bollinger": bollinger,
        })
    }
}

impl Serialize for IndicatorSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_json() {
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in &fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            other => other.serialize(serializer),
        }
    }
}

/// One snapshot per bar, in the same order as `bars`.
pub fn calculate_snapshots(bars: &[PriceBar], params: &IndicatorParams) -> Vec<IndicatorSnapshot> {
    let ma_series: Vec<_> = params
        .ma_periods
        .iter()
        .map(|&period| (period, calculate_ma(bars, period)))
        .collect();
    let macd = calculate_macd(bars, params.macd_fast, params.macd_slow, params.macd_signal);
    let rsi = calculate_rsi(bars, params.rsi_period);
    let kdj = calculate_kdj(bars, params.kdj_n, params.kdj_m1, params.kdj_m2);
    let bollinger = calculate_bollinger(bars, params.bollinger_period, params.bollinger_k);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| IndicatorSnapshot {
            date: bar.date,
            close: bar.close,
            ma: ma_series
                .iter()
                .filter_map(|(period, series)| series.value_at(i).map(|v| (*period, v)))
                .collect(),
            macd: macd.value_at(i),
            rsi: rsi.value_at(i),
            kdj: kdj.value_at(i),
            bollinger: bollinger.value_at(i),
        })
        .collect()
}
