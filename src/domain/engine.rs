//! Rule engine: snapshots, condition evaluation and winner selection.
//!
//! Rules are compiled once at construction and partitioned by type. Each
//! partition is kept in selection order (priority desc, strength desc, id asc),
//! so the first satisfied rule is the winner.

use crate::domain::error::SignalwatchError;
use crate::domain::indicator::{calculate_snapshots, IndicatorParams, IndicatorSnapshot};
use crate::domain::ohlcv::{is_ascending, PriceBar};
use crate::domain::price::resolve;
use crate::domain::rule::{Rule, RuleType};
use crate::domain::rule_definition::RuleDefinition;
use crate::domain::rule_eval::{describe, evaluate_conditions};
use crate::domain::rule_parser::compile_rule;
use crate::domain::signal::Signal;
use std::borrow::Cow;
use std::cmp::Reverse;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RuleEngine {
    params: IndicatorParams,
    buy_rules: Vec<Rule>,
    sell_rules: Vec<Rule>,
}

impl RuleEngine {
    /// Compiles `definitions`. Malformed rules are logged and skipped.
    pub fn new(definitions: &[RuleDefinition], params: IndicatorParams) -> Self {
        let rules = definitions
            .iter()
            .filter_map(|def| match compile_rule(def, &params) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(rule_id = e.rule_id, error = %e, "skipping malformed rule");
                    None
                }
            })
            .collect();
        Self::from_rules(rules, params)
    }

    pub fn from_rules(rules: Vec<Rule>, params: IndicatorParams) -> Self {
        let (mut buy_rules, mut sell_rules): (Vec<Rule>, Vec<Rule>) = rules
            .into_iter()
            .filter(|r| r.enabled)
            .partition(|r| r.rule_type == RuleType::Buy);
        sort_for_selection(&mut buy_rules);
        sort_for_selection(&mut sell_rules);
        Self {
            params,
            buy_rules,
            sell_rules,
        }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Active rules of one type, in selection order.
    pub fn rules(&self, rule_type: RuleType) -> &[Rule] {
        match rule_type {
            RuleType::Buy => &self.buy_rules,
            RuleType::Sell => &self.sell_rules,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.buy_rules.len() + self.sell_rules.len()
    }

    /// Evaluates one partition and returns its winner, or a hold.
    pub fn evaluate(
        &self,
        instrument_id: &str,
        bars: &[PriceBar],
        rule_type: RuleType,
        current_price: Option<f64>,
    ) -> Result<Signal, SignalwatchError> {
        let window = self.prepare(instrument_id, bars, current_price)?;
        Ok(window
            .winner(instrument_id, self.rules(rule_type))
            .unwrap_or_else(|| window.hold(instrument_id)))
    }

    /// Buy winner if any, otherwise sell winner, otherwise hold.
    pub fn evaluate_all(
        &self,
        instrument_id: &str,
        bars: &[PriceBar],
        current_price: Option<f64>,
    ) -> Result<Signal, SignalwatchError> {
        let window = self.prepare(instrument_id, bars, current_price)?;
        let signal = window
            .winner(instrument_id, &self.buy_rules)
            .or_else(|| window.winner(instrument_id, &self.sell_rules))
            .unwrap_or_else(|| window.hold(instrument_id));
        debug!(
            instrument = instrument_id,
            signal = %signal.signal_type,
            rule_id = ?signal.source_rule_id,
            "evaluated"
        );
        Ok(signal)
    }

    fn prepare(
        &self,
        instrument_id: &str,
        bars: &[PriceBar],
        current_price: Option<f64>,
    ) -> Result<Window, SignalwatchError> {
        let bars = ordered(instrument_id, bars)?;
        let mut snapshots = calculate_snapshots(&bars, &self.params);
        let latest = snapshots.pop().ok_or_else(|| no_data(instrument_id))?;
        let price = current_price.unwrap_or(latest.close);
        let tradable = price.is_finite() && price > 0.0;
        if !tradable {
            warn!(instrument = instrument_id, price, "non-positive current price, holding");
        }
        Ok(Window {
            latest,
            previous: snapshots.pop(),
            current_price: if price.is_finite() { price } else { 0.0 },
            tradable,
        })
    }
}

/// The latest two snapshots plus the price used for `t`.
struct Window {
    latest: IndicatorSnapshot,
    previous: Option<IndicatorSnapshot>,
    current_price: f64,
    tradable: bool,
}

impl Window {
    fn winner(&self, instrument_id: &str, rules: &[Rule]) -> Option<Signal> {
        if !self.tradable {
            return None;
        }
        let rule = rules.iter().find(|rule| {
            evaluate_conditions(
                &rule.conditions,
                &self.latest,
                self.previous.as_ref(),
                self.current_price,
            )
        })?;
        let prices = resolve(&rule.price_config, self.current_price, &self.latest);
        Some(Signal::from_rule(
            instrument_id,
            &self.latest,
            self.current_price,
            rule,
            &prices,
            describe(&rule.conditions),
        ))
    }

    fn hold(&self, instrument_id: &str) -> Signal {
        Signal::hold(instrument_id, &self.latest, self.current_price)
    }
}

fn sort_for_selection(rules: &mut [Rule]) {
    rules.sort_by_key(|r| (Reverse(r.priority), Reverse(r.strength), r.id));
}

fn ordered<'a>(
    instrument_id: &str,
    bars: &'a [PriceBar],
) -> Result<Cow<'a, [PriceBar]>, SignalwatchError> {
    if bars.is_empty() {
        return Err(no_data(instrument_id));
    }
    if is_ascending(bars) {
        return Ok(Cow::Borrowed(bars));
    }
    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|b| b.date);
    sorted.dedup_by_key(|b| b.date);
    Ok(Cow::Owned(sorted))
}

fn no_data(instrument_id: &str) -> SignalwatchError {
    SignalwatchError::NoData {
        instrument: instrument_id.to_string(),
    }
}
