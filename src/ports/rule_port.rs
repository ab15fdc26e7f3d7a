//! Rule store port trait.

use crate::domain::error::SignalwatchError;
use crate::domain::rule::RuleType;
use crate::domain::rule_definition::RuleDefinition;

pub trait RuleStorePort: Send + Sync {
    /// Enabled rule definitions, optionally of one type, sorted by priority descending.
    fn get_enabled_rules(
        &self,
        rule_type: Option<RuleType>,
    ) -> Result<Vec<RuleDefinition>, SignalwatchError>;
}
