//! Built-in rule set used to seed an empty rule store.

use crate::domain::rule::RuleType;
use crate::domain::rule_definition::{
    ConditionList, ConditionSpec, PriceConfigSpec, PriceTargetSpec, RuleDefinition,
};

pub fn default_rules() -> Vec<RuleDefinition> {
    vec![
        definition(
            1,
            "MA golden cross",
            RuleType::Buy,
            3,
            vec![ConditionSpec::against_indicator(
                "MA",
                "MA5",
                "cross_above",
                "MA",
                "MA20",
            )],
            PriceTargetSpec::indicator("MA", "MA20"),
            Some(PriceTargetSpec::percentage(Some("entry"), -0.05)),
            Some(PriceTargetSpec::percentage(Some("entry"), 0.08)),
            "MA5 crossed above MA20, suggest buying near MA20 {entry_price:.2f}",
        ),
        definition(
            2,
            "RSI oversold",
            RuleType::Buy,
            2,
            vec![ConditionSpec::against_value("RSI", "RSI", "lt", 30.0)],
            PriceTargetSpec::percentage(None, -0.02),
            Some(PriceTargetSpec::percentage(Some("entry"), -0.05)),
            Some(PriceTargetSpec::percentage(Some("entry"), 0.05)),
            "RSI below 30, oversold, buy on dips",
        ),
        definition(
            3,
            "Bollinger lower band",
            RuleType::Buy,
            3,
            vec![ConditionSpec::against_indicator(
                "PRICE",
                "close",
                "lt",
                "Bollinger",
                "lower",
            )],
            PriceTargetSpec::indicator("Bollinger", "lower"),
            Some(PriceTargetSpec::percentage(Some("entry"), -0.05)),
            Some(PriceTargetSpec::indicator("Bollinger", "middle")),
            "Price broke below the lower Bollinger band, may rebound",
        ),
        definition(
            4,
            "MACD golden cross",
            RuleType::Buy,
            2,
            vec![ConditionSpec::against_indicator(
                "MACD",
                "DIF",
                "cross_above",
                "MACD",
                "DEA",
            )],
            PriceTargetSpec::current(),
            Some(PriceTargetSpec::percentage(Some("entry"), -0.05)),
            Some(PriceTargetSpec::percentage(Some("entry"), 0.08)),
            "MACD golden cross formed, trend may strengthen",
        ),
        definition(
            5,
            "MA death cross",
            RuleType::Sell,
            3,
            vec![ConditionSpec::against_indicator(
                "MA",
                "MA5",
                "cross_below",
                "MA",
                "MA20",
            )],
            PriceTargetSpec::indicator("MA", "MA20"),
            None,
            Some(PriceTargetSpec::percentage(Some("entry"), -0.05)),
            "MA5 crossed below MA20, suggest reducing near MA20 {entry_price:.2f}",
        ),
        definition(
            6,
            "RSI overbought",
            RuleType::Sell,
            2,
            vec![ConditionSpec::against_value("RSI", "RSI", "gt", 70.0)],
            PriceTargetSpec::percentage(None, 0.02),
            None,
            Some(PriceTargetSpec::percentage(Some("entry"), -0.02)),
            "RSI above 70, overbought, reduce on rallies",
        ),
        definition(
            7,
            "Bollinger upper band",
            RuleType::Sell,
            3,
            vec![ConditionSpec::against_indicator(
                "PRICE",
                "close",
                "gt",
                "Bollinger",
                "upper",
            )],
            PriceTargetSpec::indicator("Bollinger", "upper"),
            None,
            Some(PriceTargetSpec::indicator("Bollinger", "middle")),
            "Price broke above the upper Bollinger band, may pull back",
        ),
        definition(
            8,
            "MACD death cross",
            RuleType::Sell,
            2,
            vec![ConditionSpec::against_indicator(
                "MACD",
                "DIF",
                "cross_below",
                "MACD",
                "DEA",
            )],
            PriceTargetSpec::current(),
            None,
            Some(PriceTargetSpec::percentage(Some("entry"), -0.05)),
            "MACD death cross formed, trend may weaken",
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn definition(
    id: i64,
    name: &str,
    rule_type: RuleType,
    priority: i64,
    conditions: Vec<ConditionSpec>,
    entry: PriceTargetSpec,
    stop_loss: Option<PriceTargetSpec>,
    take_profit: Option<PriceTargetSpec>,
    template: &str,
) -> RuleDefinition {
    RuleDefinition {
        id,
        name: name.to_string(),
        rule_type,
        enabled: true,
        priority,
        strength: priority,
        conditions: ConditionList::Bare(conditions),
        price_config: PriceConfigSpec {
            entry,
            stop_loss,
            take_profit,
        },
        description_template: Some(template.to_string()),
    }
}
