#![allow(dead_code)]

use chrono::{Duration as Days, NaiveDate};
use signalwatch::domain::error::SignalwatchError;
use signalwatch::domain::ohlcv::PriceBar;
use signalwatch::domain::rule::RuleType;
use signalwatch::domain::rule_definition::RuleDefinition;
use signalwatch::domain::signal::Signal;
use signalwatch::ports::price_port::PriceHistoryPort;
use signalwatch::ports::rule_port::RuleStorePort;
use signalwatch::ports::signal_port::SignalStorePort;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub struct MockPriceHistory {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub delays: HashMap<String, Duration>,
}

impl MockPriceHistory {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            delays: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, instrument: &str, delay: Duration) -> Self {
        self.delays.insert(instrument.to_string(), delay);
        self
    }
}

impl PriceHistoryPort for MockPriceHistory {
    fn get_price_series(&self, instrument_id: &str) -> Result<Vec<PriceBar>, SignalwatchError> {
        if let Some(delay) = self.delays.get(instrument_id) {
            std::thread::sleep(*delay);
        }
        if let Some(reason) = self.errors.get(instrument_id) {
            return Err(SignalwatchError::ProviderUnavailable {
                instrument: instrument_id.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(instrument_id).cloned().unwrap_or_default())
    }
}

pub struct MockRuleStore {
    pub rules: Vec<RuleDefinition>,
    pub error: Option<String>,
}

impl MockRuleStore {
    pub fn new(rules: Vec<RuleDefinition>) -> Self {
        Self { rules, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            rules: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl RuleStorePort for MockRuleStore {
    fn get_enabled_rules(
        &self,
        rule_type: Option<RuleType>,
    ) -> Result<Vec<RuleDefinition>, SignalwatchError> {
        if let Some(reason) = &self.error {
            return Err(SignalwatchError::Database {
                reason: reason.clone(),
            });
        }
        let mut rules: Vec<RuleDefinition> = self
            .rules
            .iter()
            .filter(|r| r.enabled)
            .filter(|r| rule_type.is_none_or(|t| r.rule_type == t))
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(rules)
    }
}

pub struct RecordingSignalStore {
    pub stored: Mutex<Vec<(String, NaiveDate, Signal)>>,
    pub fail_for: HashSet<String>,
    pub write_delay: Option<Duration>,
}

impl RecordingSignalStore {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            fail_for: HashSet::new(),
            write_delay: None,
        }
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn failing_for(mut self, instrument: &str) -> Self {
        self.fail_for.insert(instrument.to_string());
        self
    }

    pub fn instruments(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn signal_for(&self, instrument: &str) -> Option<Signal> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _, _)| id == instrument)
            .map(|(_, _, signal)| signal.clone())
    }
}

impl SignalStorePort for RecordingSignalStore {
    fn upsert_signal(
        &self,
        instrument_id: &str,
        date: NaiveDate,
        signal: &Signal,
    ) -> Result<(), SignalwatchError> {
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }
        if self.fail_for.contains(instrument_id) {
            return Err(SignalwatchError::DatabaseQuery {
                reason: "disk full".to_string(),
            });
        }
        self.stored
            .lock()
            .unwrap()
            .push((instrument_id.to_string(), date, signal.clone()));
        Ok(())
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// One bar per calendar day from 2024-01-01, high/low half a point around close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + Days::days(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 10_000,
        })
        .collect()
}

pub fn ramp(len: usize, start: f64, step: f64) -> Vec<f64> {
    (0..len).map(|i| start + step * i as f64).collect()
}

/// 24 falling closes then a jump to 40: MA5 crosses above MA20 on the last bar.
///
/// MA20 on the last bar is 15.68.
pub fn golden_cross_closes() -> Vec<f64> {
    let mut closes = ramp(24, 20.0, -0.4);
    closes.push(40.0);
    closes
}
