//! Trading signal output.

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::price::{round_price, ResolvedPrices};
use crate::domain::rule::{Rule, RuleType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const HOLD_MESSAGE: &str = "no clear buy or sell signal, hold and watch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "buy",
            SignalType::Sell => "sell",
            SignalType::Hold => "hold",
        }
    }
}

impl From<RuleType> for SignalType {
    fn from(rule_type: RuleType) -> Self {
        match rule_type {
            RuleType::Buy => SignalType::Buy,
            RuleType::Sell => SignalType::Sell,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(SignalType::Buy),
            "sell" => Ok(SignalType::Sell),
            "hold" => Ok(SignalType::Hold),
            other => Err(format!("unknown signal type '{}'", other)),
        }
    }
}

/// One signal per instrument per date. A hold carries no prices, strength,
/// triggers or source rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub signal_type: SignalType,
    pub current_price: f64,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub strength: Option<u8>,
    pub triggers: Vec<String>,
    pub indicators: serde_json::Value,
    pub source_rule_id: Option<i64>,
    pub rule_name: Option<String>,
    pub message: String,
}

impl Signal {
    pub fn hold(instrument_id: &str, snapshot: &IndicatorSnapshot, current_price: f64) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            date: snapshot.date,
            signal_type: SignalType::Hold,
            current_price: round_price(current_price),
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            strength: None,
            triggers: Vec::new(),
            indicators: snapshot.to_json(),
            source_rule_id: None,
            rule_name: None,
            message: HOLD_MESSAGE.to_string(),
        }
    }

    /// Builds the signal for a winning rule. Emitted prices are rounded to cents.
    pub fn from_rule(
        instrument_id: &str,
        snapshot: &IndicatorSnapshot,
        current_price: f64,
        rule: &Rule,
        prices: &ResolvedPrices,
        triggers: Vec<String>,
    ) -> Self {
        let entry_price = prices.entry.map(round_price);
        let message = match &rule.description_template {
            Some(template) => render_message(template, entry_price, current_price),
            None => rule.name.clone(),
        };

        Self {
            instrument_id: instrument_id.to_string(),
            date: snapshot.date,
            signal_type: rule.rule_type.into(),
            current_price: round_price(current_price),
            entry_price,
            stop_loss: prices.stop_loss.map(round_price),
            take_profit: prices.take_profit.map(round_price),
            strength: Some(rule.strength),
            triggers,
            indicators: snapshot.to_json(),
            source_rule_id: Some(rule.id),
            rule_name: Some(rule.name.clone()),
            message,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.signal_type == SignalType::Hold
    }
}

/// Fills `{entry_price}` and `{current_price}` placeholders, with or without a
/// `:.2f` format suffix. An absent entry renders as `-`.
pub fn render_message(template: &str, entry_price: Option<f64>, current_price: f64) -> String {
    let entry = entry_price.map_or_else(|| "-".to_string(), |p| format!("{:.2}", p));
    let current = format!("{:.2}", current_price);
    template
        .replace("{entry_price:.2f}", &entry)
        .replace("{entry_price}", &entry)
        .replace("{current_price:.2f}", &current)
        .replace("{current_price}", &current)
}
