//! Rule definition compiler.
//!
//! Turns a stored `RuleDefinition` into a typed `Rule`. Every semantic check
//! happens here, so an error names the offending rule and evaluation never has
//! to deal with unknown indicators, operators or target types.

use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::rule::{
    Condition, EntryTarget, ExitTarget, IndicatorField, Operand, PriceBase, PriceConfig, Rule,
};
use crate::domain::rule_definition::{ConditionSpec, PriceTargetSpec, RuleDefinition};

pub const MIN_STRENGTH: i64 = 1;
pub const MAX_STRENGTH: i64 = 5;

pub fn compile_rule(def: &RuleDefinition, params: &IndicatorParams) -> Result<Rule, ParseError> {
    let err = |message: String| ParseError::new(def.id, &def.name, message);

    if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&def.strength) {
        return Err(err(format!(
            "strength {} outside {}..={}",
            def.strength, MIN_STRENGTH, MAX_STRENGTH
        )));
    }

    let conditions = def
        .conditions
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            compile_condition(spec, params).map_err(|m| err(format!("condition {}: {}", i + 1, m)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let entry = compile_entry(&def.price_config.entry, params)
        .map_err(|m| err(format!("entry: {}", m)))?;
    let stop_loss = def
        .price_config
        .stop_loss
        .as_ref()
        .map(|spec| compile_exit(spec, params))
        .transpose()
        .map_err(|m| err(format!("stop_loss: {}", m)))?;
    let take_profit = def
        .price_config
        .take_profit
        .as_ref()
        .map(|spec| compile_exit(spec, params))
        .transpose()
        .map_err(|m| err(format!("take_profit: {}", m)))?;

    Ok(Rule {
        id: def.id,
        name: def.name.clone(),
        rule_type: def.rule_type,
        enabled: def.enabled,
        priority: def.priority,
        strength: def.strength as u8,
        conditions,
        price_config: PriceConfig {
            entry,
            stop_loss,
            take_profit,
        },
        description_template: def.description_template.clone(),
    })
}

fn compile_condition(spec: &ConditionSpec, params: &IndicatorParams) -> Result<Condition, String> {
    let left = compile_field(&spec.indicator, &spec.field, params)?;
    let predicate = spec.operator.parse()?;

    let right = match spec.target_type.as_str() {
        "value" => {
            let value = spec
                .target_value
                .ok_or_else(|| "target_type 'value' without target_value".to_string())?;
            Operand::Constant(finite(value, "target_value")?)
        }
        "indicator" => {
            let (indicator, field) = spec
                .target_indicator
                .as_deref()
                .zip(spec.target_field.as_deref())
                .ok_or_else(|| {
                    "target_type 'indicator' without target_indicator/target_field".to_string()
                })?;
            Operand::Indicator(compile_field(indicator, field, params)?)
        }
        other => return Err(format!("unknown target_type '{}'", other)),
    };

    Ok(Condition {
        left,
        predicate,
        right,
    })
}

fn compile_entry(spec: &PriceTargetSpec, params: &IndicatorParams) -> Result<EntryTarget, String> {
    match spec.kind.as_str() {
        "current" => Ok(EntryTarget::Current),
        "percentage" => {
            match spec.base.as_deref() {
                None | Some("current") => Ok(EntryTarget::Percentage(percentage_value(spec)?)),
                Some(base) => Err(format!("entry percentage cannot use base '{}'", base)),
            }
        }
        "indicator" => Ok(EntryTarget::Indicator(target_field(spec, params)?)),
        other => Err(format!("unknown price type '{}'", other)),
    }
}

fn compile_exit(spec: &PriceTargetSpec, params: &IndicatorParams) -> Result<ExitTarget, String> {
    match spec.kind.as_str() {
        "current" => Ok(ExitTarget::Current),
        "percentage" => {
            let base = match spec.base.as_deref().unwrap_or("entry") {
                "entry" => PriceBase::Entry,
                "current" => PriceBase::Current,
                other => return Err(format!("unknown price base '{}'", other)),
            };
            Ok(ExitTarget::Percentage {
                base,
                value: percentage_value(spec)?,
            })
        }
        "indicator" => Ok(ExitTarget::Indicator(target_field(spec, params)?)),
        other => Err(format!("unknown price type '{}'", other)),
    }
}

fn percentage_value(spec: &PriceTargetSpec) -> Result<f64, String> {
    let value = spec
        .value
        .ok_or_else(|| "percentage target without value".to_string())?;
    finite(value, "value")
}

fn target_field(
    spec: &PriceTargetSpec,
    params: &IndicatorParams,
) -> Result<IndicatorField, String> {
    let (indicator, field) = spec
        .indicator
        .as_deref()
        .zip(spec.field.as_deref())
        .ok_or_else(|| "indicator target without indicator/field".to_string())?;
    compile_field(indicator, field, params)
}

fn compile_field(
    indicator: &str,
    field: &str,
    params: &IndicatorParams,
) -> Result<IndicatorField, String> {
    let parsed = IndicatorField::parse(indicator, field)?;
    match parsed {
        IndicatorField::Ma(period) if !params.has_ma_period(period) => {
            Err(format!("MA{} is not a configured MA period", period))
        }
        _ => Ok(parsed),
    }
}

fn finite(value: f64, name: &str) -> Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{} must be finite", name))
    }
}
