//! Stored rule definitions.
//!
//! These mirror the JSON persisted by rule stores. Strings are kept loose: a
//! definition that deserializes can still be rejected per rule by
//! `rule_parser::compile_rule`. Rule stores log and drop a single definition
//! that fails to deserialize.

use crate::domain::rule::RuleType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: i64,
    pub name: String,
    pub rule_type: RuleType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_strength")]
    pub strength: i64,
    pub conditions: ConditionList,
    pub price_config: PriceConfigSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_template: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_strength() -> i64 {
    3
}

/// Conditions are stored either as a bare array or wrapped as `{"conditions": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionList {
    Bare(Vec<ConditionSpec>),
    Wrapped { conditions: Vec<ConditionSpec> },
}

impl ConditionList {
    pub fn as_slice(&self) -> &[ConditionSpec] {
        match self {
            ConditionList::Bare(conditions) => conditions,
            ConditionList::Wrapped { conditions } => conditions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub indicator: String,
    pub field: String,
    pub operator: String,
    pub target_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_indicator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
}

impl ConditionSpec {
    pub fn against_value(indicator: &str, field: &str, operator: &str, value: f64) -> Self {
        Self {
            indicator: indicator.into(),
            field: field.into(),
            operator: operator.into(),
            target_type: "value".into(),
            target_value: Some(value),
            target_indicator: None,
            target_field: None,
        }
    }

    pub fn against_indicator(
        indicator: &str,
        field: &str,
        operator: &str,
        target_indicator: &str,
        target_field: &str,
    ) -> Self {
        Self {
            indicator: indicator.into(),
            field: field.into(),
            operator: operator.into(),
            target_type: "indicator".into(),
            target_value: None,
            target_indicator: Some(target_indicator.into()),
            target_field: Some(target_field.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceConfigSpec {
    pub entry: PriceTargetSpec,
    #[serde(default)]
    pub stop_loss: Option<PriceTargetSpec>,
    #[serde(default)]
    pub take_profit: Option<PriceTargetSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargetSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl PriceTargetSpec {
    pub fn current() -> Self {
        Self {
            kind: "current".into(),
            base: None,
            value: None,
            indicator: None,
            field: None,
        }
    }

    pub fn percentage(base: Option<&str>, value: f64) -> Self {
        Self {
            kind: "percentage".into(),
            base: base.map(str::to_string),
            value: Some(value),
            indicator: None,
            field: None,
        }
    }

    pub fn indicator(indicator: &str, field: &str) -> Self {
        Self {
            kind: "indicator".into(),
            base: None,
            value: None,
            indicator: Some(indicator.into()),
            field: Some(field.into()),
        }
    }
}
