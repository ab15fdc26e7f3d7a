//! Condition evaluation.
//!
//! Conditions are evaluated against the latest snapshot `t` and, for crosses,
//! the snapshot before it.
//!
//! # Evaluation Semantics
//!
//! - Absent left or right operand: `false`
//! - `eq`: absolute tolerance of `EPSILON`
//! - `below_threshold` / `above_threshold`: same as `lt` / `gt`
//! - `cross_above`: `A[t-1] < B[t-1]` and `A[t] > B[t]`, strict on both sides
//! - `cross_below`: `A[t-1] > B[t-1]` and `A[t] < B[t]`
//! - No snapshot at `t-1`: crosses are `false`
//! - Rule conditions: short-circuit AND, an empty list is satisfied
//!
//! `PRICE.close` reads `current_price` at `t` and the bar close at `t-1`.

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::rule::{Comparison, Condition, CrossDirection, Operand, Predicate};

const EPSILON: f64 = 1e-9;

pub fn evaluate_condition(
    condition: &Condition,
    snapshot: &IndicatorSnapshot,
    previous: Option<&IndicatorSnapshot>,
    current_price: f64,
) -> bool {
    let left = condition.left.value_in(snapshot, current_price);
    let right = resolve_operand(&condition.right, snapshot, current_price);
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => return false,
    };

    match condition.predicate {
        Predicate::Compare(cmp) => compare(cmp, left, right),
        Predicate::Cross(direction) => {
            let Some(prev) = previous else {
                return false;
            };
            let left_prev = condition.left.value_in(prev, prev.close);
            let right_prev = resolve_operand(&condition.right, prev, prev.close);
            match (left_prev, right_prev) {
                (Some(lp), Some(rp)) => match direction {
                    CrossDirection::Above => lp < rp && left > right,
                    CrossDirection::Below => lp > rp && left < right,
                },
                _ => false,
            }
        }
    }
}

/// True when every condition holds.
pub fn evaluate_conditions(
    conditions: &[Condition],
    snapshot: &IndicatorSnapshot,
    previous: Option<&IndicatorSnapshot>,
    current_price: f64,
) -> bool {
    conditions
        .iter()
        .all(|c| evaluate_condition(c, snapshot, previous, current_price))
}

/// Trigger labels for a satisfied rule, in condition order.
pub fn describe(conditions: &[Condition]) -> Vec<String> {
    conditions.iter().map(|c| c.to_string()).collect()
}

fn compare(cmp: Comparison, left: f64, right: f64) -> bool {
    match cmp {
        Comparison::Gt | Comparison::AboveThreshold => left > right,
        Comparison::Lt | Comparison::BelowThreshold => left < right,
        Comparison::Gte => left >= right,
        Comparison::Lte => left <= right,
        Comparison::Eq => (left - right).abs() < EPSILON,
    }
}

fn resolve_operand(operand: &Operand, snapshot: &IndicatorSnapshot, close: f64) -> Option<f64> {
    match operand {
        Operand::Constant(value) => Some(*value),
        Operand::Indicator(field) => field.value_in(snapshot, close),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::IndicatorField;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn snapshot(
        close: f64,
        ma5: Option<f64>,
        ma20: Option<f64>,
        rsi: Option<f64>,
    ) -> IndicatorSnapshot {
        let mut ma = BTreeMap::new();
        if let Some(v) = ma5 {
            ma.insert(5, v);
        }
        if let Some(v) = ma20 {
            ma.insert(20, v);
        }
        IndicatorSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            close,
            ma,
            macd: None,
            rsi,
            kdj: None,
            bollinger: None,
        }
    }

    fn ma_cross(direction: CrossDirection) -> Condition {
        Condition {
            left: IndicatorField::Ma(5),
            predicate: Predicate::Cross(direction),
            right: Operand::Indicator(IndicatorField::Ma(20)),
        }
    }

    fn rsi(cmp: Comparison, value: f64) -> Condition {
        Condition {
            left: IndicatorField::Rsi,
            predicate: Predicate::Compare(cmp),
            right: Operand::Constant(value),
        }
    }

    #[test]
    fn cross_above_detected() {
        // MA5 [10, 12] vs MA20 [11, 11.5]
        let prev = snapshot(10.0, Some(10.0), Some(11.0), None);
        let curr = snapshot(12.0, Some(12.0), Some(11.5), None);
        assert!(evaluate_condition(
            &ma_cross(CrossDirection::Above),
            &curr,
            Some(&prev),
            12.0
        ));
        assert!(!evaluate_condition(
            &ma_cross(CrossDirection::Below),
            &curr,
            Some(&prev),
            12.0
        ));
    }

    #[test]
    fn cross_requires_prior_side() {
        // MA5 [12, 12] vs MA20 [11, 11.5]: already above
        let prev = snapshot(12.0, Some(12.0), Some(11.0), None);
        let curr = snapshot(12.0, Some(12.0), Some(11.5), None);
        assert!(!evaluate_condition(
            &ma_cross(CrossDirection::Above),
            &curr,
            Some(&prev),
            12.0
        ));
    }

    #[test]
    fn cross_is_strict_on_touch() {
        let prev = snapshot(11.0, Some(11.0), Some(11.0), None);
        let curr = snapshot(12.0, Some(12.0), Some(11.5), None);
        assert!(!evaluate_condition(
            &ma_cross(CrossDirection::Above),
            &curr,
            Some(&prev),
            12.0
        ));

        let prev = snapshot(10.0, Some(10.0), Some(11.0), None);
        let curr = snapshot(11.5, Some(11.5), Some(11.5), None);
        assert!(!evaluate_condition(
            &ma_cross(CrossDirection::Above),
            &curr,
            Some(&prev),
            11.5
        ));
    }

    #[test]
    fn cross_below_detected() {
        let prev = snapshot(12.0, Some(12.0), Some(11.0), None);
        let curr = snapshot(10.0, Some(10.0), Some(11.5), None);
        assert!(evaluate_condition(
            &ma_cross(CrossDirection::Below),
            &curr,
            Some(&prev),
            10.0
        ));
    }

    #[test]
    fn cross_without_previous_is_false() {
        let curr = snapshot(12.0, Some(12.0), Some(11.5), None);
        assert!(!evaluate_condition(
            &ma_cross(CrossDirection::Above),
            &curr,
            None,
            12.0
        ));
    }

    #[test]
    fn cross_with_absent_previous_value_is_false() {
        let prev = snapshot(10.0, Some(10.0), None, None);
        let curr = snapshot(12.0, Some(12.0), Some(11.5), None);
        assert!(!evaluate_condition(
            &ma_cross(CrossDirection::Above),
            &curr,
            Some(&prev),
            12.0
        ));
    }

    #[test]
    fn rsi_thresholds() {
        let oversold = snapshot(10.0, None, None, Some(25.0));
        let overbought = snapshot(10.0, None, None, Some(75.0));
        let boundary = snapshot(10.0, None, None, Some(30.0));

        assert!(evaluate_condition(&rsi(Comparison::Lt, 30.0), &oversold, None, 10.0));
        assert!(evaluate_condition(&rsi(Comparison::Gt, 70.0), &overbought, None, 10.0));
        assert!(!evaluate_condition(&rsi(Comparison::Lt, 30.0), &boundary, None, 10.0));
        assert!(evaluate_condition(&rsi(Comparison::Lte, 30.0), &boundary, None, 10.0));
        assert!(evaluate_condition(&rsi(Comparison::Gte, 30.0), &boundary, None, 10.0));
        assert!(evaluate_condition(
            &rsi(Comparison::BelowThreshold, 30.0),
            &oversold,
            None,
            10.0
        ));
        assert!(evaluate_condition(
            &rsi(Comparison::AboveThreshold, 70.0),
            &overbought,
            None,
            10.0
        ));
    }

    #[test]
    fn eq_uses_tolerance() {
        let s = snapshot(10.0, None, None, Some(50.0 + 1e-12));
        assert!(evaluate_condition(&rsi(Comparison::Eq, 50.0), &s, None, 10.0));
        let s = snapshot(10.0, None, None, Some(50.001));
        assert!(!evaluate_condition(&rsi(Comparison::Eq, 50.0), &s, None, 10.0));
    }

    #[test]
    fn absent_operand_fails_closed() {
        let s = snapshot(10.0, None, None, None);
        assert!(!evaluate_condition(&rsi(Comparison::Lt, 30.0), &s, None, 10.0));
        assert!(!evaluate_condition(&rsi(Comparison::Gt, 30.0), &s, None, 10.0));

        let s = snapshot(10.0, Some(10.0), None, None);
        let c = Condition {
            left: IndicatorField::Ma(5),
            predicate: Predicate::Compare(Comparison::Gt),
            right: Operand::Indicator(IndicatorField::Ma(20)),
        };
        assert!(!evaluate_condition(&c, &s, None, 10.0));
    }

    #[test]
    fn price_close_uses_current_price_at_t() {
        let prev = snapshot(9.0, None, Some(10.0), None);
        let curr = snapshot(9.5, None, Some(10.0), None);
        let c = Condition {
            left: IndicatorField::Close,
            predicate: Predicate::Cross(CrossDirection::Above),
            right: Operand::Indicator(IndicatorField::Ma(20)),
        };
        // bar close 9.5 is below MA20, but the live quote is above
        assert!(evaluate_condition(&c, &curr, Some(&prev), 10.4));
        assert!(!evaluate_condition(&c, &curr, Some(&prev), 9.5));
    }

    #[test]
    fn conditions_are_and_combined() {
        let s = snapshot(10.0, Some(12.0), Some(11.0), Some(25.0));
        let above = Condition {
            left: IndicatorField::Ma(5),
            predicate: Predicate::Compare(Comparison::Gt),
            right: Operand::Indicator(IndicatorField::Ma(20)),
        };
        assert!(evaluate_conditions(
            &[above.clone(), rsi(Comparison::Lt, 30.0)],
            &s,
            None,
            10.0
        ));
        assert!(!evaluate_conditions(
            &[above, rsi(Comparison::Gt, 30.0)],
            &s,
            None,
            10.0
        ));
        assert!(evaluate_conditions(&[], &s, None, 10.0));
    }

    #[test]
    fn describe_lists_conditions_in_order() {
        let labels = describe(&[ma_cross(CrossDirection::Above), rsi(Comparison::Lt, 30.0)]);
        assert_eq!(labels, vec!["MA.MA5 cross_above MA.MA20", "RSI.RSI lt 30"]);
    }
}
