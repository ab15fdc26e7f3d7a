//! Compiled trading rule structures.
//!
//! Stored rule definitions (see `rule_definition`) are compiled into these
//! closed types by `rule_parser`, so evaluation is a total match:
//! - `IndicatorField`: a single value inside an indicator snapshot
//! - `Operand`: right-hand side of a condition
//! - `Predicate`: comparison or cross operator
//! - `EntryTarget` / `ExitTarget`: declarative price targets
//! - `Rule`: conditions (implicit AND) plus price configuration

use crate::domain::indicator::IndicatorSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Buy,
    Sell,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Buy => "buy",
            RuleType::Sell => "sell",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(RuleType::Buy),
            "sell" => Ok(RuleType::Sell),
            other => Err(format!("unknown rule type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Ma(usize),
    MacdDif,
    MacdDea,
    MacdHist,
    Rsi,
    KdjK,
    KdjD,
    KdjJ,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    BollingerWidth,
    Close,
}

impl IndicatorField {
    /// Parses a stored `(indicator, field)` pair such as `("MA", "MA20")`.
    pub fn parse(indicator: &str, field: &str) -> Result<Self, String> {
        let parsed = match (indicator, field) {
            ("MA", f) => f
                .strip_prefix("MA")
                .and_then(|p| p.parse::<usize>().ok())
                .filter(|&p| p > 0)
                .map(IndicatorField::Ma),
            ("MACD", "DIF") => Some(IndicatorField::MacdDif),
            ("MACD", "DEA") => Some(IndicatorField::MacdDea),
            ("MACD", "MACD" | "HIST") => Some(IndicatorField::MacdHist),
            ("RSI", "RSI") => Some(IndicatorField::Rsi),
            ("KDJ", "K") => Some(IndicatorField::KdjK),
            ("KDJ", "D") => Some(IndicatorField::KdjD),
            ("KDJ", "J") => Some(IndicatorField::KdjJ),
            ("Bollinger", "upper") => Some(IndicatorField::BollingerUpper),
            ("Bollinger", "middle" | "mid") => Some(IndicatorField::BollingerMiddle),
            ("Bollinger", "lower") => Some(IndicatorField::BollingerLower),
            ("Bollinger", "width") => Some(IndicatorField::BollingerWidth),
            ("PRICE", "close") => Some(IndicatorField::Close),
            ("MACD" | "RSI" | "KDJ" | "Bollinger" | "PRICE", _) => None,
            _ => return Err(format!("unknown indicator '{}'", indicator)),
        };
        parsed.ok_or_else(|| format!("unknown field '{}' for indicator {}", field, indicator))
    }

    pub fn indicator_name(&self) -> &'static str {
        match self {
            IndicatorField::Ma(_) => "MA",
            IndicatorField::MacdDif | IndicatorField::MacdDea | IndicatorField::MacdHist => "MACD",
            IndicatorField::Rsi => "RSI",
            IndicatorField::KdjK | IndicatorField::KdjD | IndicatorField::KdjJ => "KDJ",
            IndicatorField::BollingerUpper
            | IndicatorField::BollingerMiddle
            | IndicatorField::BollingerLower
            | IndicatorField::BollingerWidth => "Bollinger",
            IndicatorField::Close => "PRICE",
        }
    }

    pub fn field_name(&self) -> String {
        match self {
            IndicatorField::Ma(period) => format!("MA{}", period),
            IndicatorField::MacdDif => "DIF".into(),
            IndicatorField::MacdDea => "DEA".into(),
            IndicatorField::MacdHist => "MACD".into(),
            IndicatorField::Rsi => "RSI".into(),
            IndicatorField::KdjK => "K".into(),
            IndicatorField::KdjD => "D".into(),
            IndicatorField::KdjJ => "J".into(),
            IndicatorField::BollingerUpper => "upper".into(),
            IndicatorField::BollingerMiddle => "middle".into(),
            IndicatorField::BollingerLower => "lower".into(),
            IndicatorField::BollingerWidth => "width".into(),
            IndicatorField::Close => "close".into(),
        }
    }

    /// Looks the field up in `snapshot`. `close` stands in for the price field,
    /// so the caller can substitute a live quote for the latest bar.
    pub fn value_in(&self, snapshot: &IndicatorSnapshot, close: f64) -> Option<f64> {
        let value = match self {
            IndicatorField::Ma(period) => snapshot.ma(*period),
            IndicatorField::MacdDif => snapshot.macd.map(|m| m.dif),
            IndicatorField::MacdDea => snapshot.macd.map(|m| m.dea),
            IndicatorField::MacdHist => snapshot.macd.map(|m| m.hist),
            IndicatorField::Rsi => snapshot.rsi,
            IndicatorField::KdjK => snapshot.kdj.map(|v| v.k),
            IndicatorField::KdjD => snapshot.kdj.map(|v| v.d),
            IndicatorField::KdjJ => snapshot.kdj.map(|v| v.j),
            IndicatorField::BollingerUpper => snapshot.bollinger.map(|b| b.upper),
            IndicatorField::BollingerMiddle => snapshot.bollinger.map(|b| b.middle),
            IndicatorField::BollingerLower => snapshot.bollinger.map(|b| b.lower),
            IndicatorField::BollingerWidth => snapshot.bollinger.map(|b| b.width),
            IndicatorField::Close => Some(close),
        };
        value.filter(|v| v.is_finite())
    }
}

impl fmt::Display for IndicatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.indicator_name(), self.field_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Constant(f64),
    Indicator(IndicatorField),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Indicator(field) => write!(f, "{}", field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    BelowThreshold,
    AboveThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Compare(Comparison),
    Cross(CrossDirection),
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::Compare(Comparison::Gt) => "gt",
            Predicate::Compare(Comparison::Lt) => "lt",
            Predicate::Compare(Comparison::Gte) => "gte",
            Predicate::Compare(Comparison::Lte) => "lte",
            Predicate::Compare(Comparison::Eq) => "eq",
            Predicate::Compare(Comparison::BelowThreshold) => "below_threshold",
            Predicate::Compare(Comparison::AboveThreshold) => "above_threshold",
            Predicate::Cross(CrossDirection::Above) => "cross_above",
            Predicate::Cross(CrossDirection::Below) => "cross_below",
        }
    }
}

impl FromStr for Predicate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gt" => Predicate::Compare(Comparison::Gt),
            "lt" => Predicate::Compare(Comparison::Lt),
            "gte" => Predicate::Compare(Comparison::Gte),
            "lte" => Predicate::Compare(Comparison::Lte),
            "eq" => Predicate::Compare(Comparison::Eq),
            "below_threshold" => Predicate::Compare(Comparison::BelowThreshold),
            "above_threshold" => Predicate::Compare(Comparison::AboveThreshold),
            "cross_above" => Predicate::Cross(CrossDirection::Above),
            "cross_below" => Predicate::Cross(CrossDirection::Below),
            other => return Err(format!("unknown operator '{}'", other)),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: IndicatorField,
    pub predicate: Predicate,
    pub right: Operand,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.predicate, self.right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBase {
    Entry,
    Current,
}

/// Entry price target. A percentage entry is always relative to the current price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryTarget {
    Current,
    Percentage(f64),
    Indicator(IndicatorField),
}

/// Stop-loss or take-profit target, resolved after the entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitTarget {
    Current,
    Percentage { base: PriceBase, value: f64 },
    Indicator(IndicatorField),
}

impl ExitTarget {
    pub fn requires_entry(&self) -> bool {
        matches!(
            self,
            ExitTarget::Percentage {
                base: PriceBase::Entry,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceConfig {
    pub entry: EntryTarget,
    pub stop_loss: Option<ExitTarget>,
    pub take_profit: Option<ExitTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: i64,
    pub name: String,
    pub rule_type: RuleType,
    pub enabled: bool,
    pub priority: i64,
    pub strength: u8,
    pub conditions: Vec<Condition>,
    pub price_config: PriceConfig,
    pub description_template: Option<String>,
}
