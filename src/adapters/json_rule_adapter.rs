//! Rule store backed by a JSON file holding an array of rule definitions.

use crate::domain::error::SignalwatchError;
use crate::domain::rule::RuleType;
use crate::domain::rule_definition::RuleDefinition;
use crate::ports::rule_port::RuleStorePort;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

pub struct JsonRuleAdapter {
    path: PathBuf,
}

impl JsonRuleAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Every definition in the file, enabled or not, in file order.
    pub fn load_all(&self) -> Result<Vec<RuleDefinition>, SignalwatchError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write_all(&self, rules: &[RuleDefinition]) -> Result<(), SignalwatchError> {
        let content = serde_json::to_string_pretty(rules)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl RuleStorePort for JsonRuleAdapter {
    fn get_enabled_rules(
        &self,
        rule_type: Option<RuleType>,
    ) -> Result<Vec<RuleDefinition>, SignalwatchError> {
        let content = fs::read_to_string(&self.path)?;
        let entries: Vec<Value> = serde_json::from_str(&content)?;
        let mut rules: Vec<RuleDefinition> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<RuleDefinition>(entry) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed rule definition");
                    None
                }
            })
            .filter(|r| r.enabled)
            .filter(|r| rule_type.is_none_or(|t| r.rule_type == t))
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_rules::default_rules;
    use tempfile::TempDir;

    fn adapter_with(rules: &[RuleDefinition]) -> (TempDir, JsonRuleAdapter) {
        let dir = TempDir::new().unwrap();
        let adapter = JsonRuleAdapter::new(dir.path().join("rules.json"));
        adapter.write_all(rules).unwrap();
        (dir, adapter)
    }

    #[test]
    fn write_then_load_preserves_definitions() {
        let rules = default_rules();
        let (_dir, adapter) = adapter_with(&rules);
        assert_eq!(adapter.load_all().unwrap(), rules);
    }

    #[test]
    fn enabled_rules_sorted_by_priority_then_id() {
        let mut rules = default_rules();
        rules[0].enabled = false;
        let (_dir, adapter) = adapter_with(&rules);

        let loaded = adapter.get_enabled_rules(None).unwrap();
        assert_eq!(loaded.len(), 7);
        assert!(loaded.iter().all(|r| r.id != 1));
        for pair in loaded.windows(2) {
            assert!(
                pair[0].priority > pair[1].priority
                    || (pair[0].priority == pair[1].priority && pair[0].id < pair[1].id)
            );
        }
    }

    #[test]
    fn filters_by_rule_type() {
        let (_dir, adapter) = adapter_with(&default_rules());
        let buys = adapter.get_enabled_rules(Some(RuleType::Buy)).unwrap();
        assert_eq!(buys.len(), 4);
        assert!(buys.iter().all(|r| r.rule_type == RuleType::Buy));
    }

    #[test]
    fn accepts_minimal_definitions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(
            &path,
            r#"[{
                "id": 9,
                "name": "deep oversold",
                "rule_type": "buy",
                "conditions": {"conditions": [
                    {"indicator": "RSI", "field": "RSI", "operator": "lt",
                     "target_type": "value", "target_value": 20}
                ]},
                "price_config": {"entry": {"type": "current"}}
            }]"#,
        )
        .unwrap();

        let rules = JsonRuleAdapter::new(path).get_enabled_rules(None).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].enabled);
        assert_eq!(rules[0].priority, 0);
        assert_eq!(rules[0].strength, 3);
        assert_eq!(rules[0].conditions.as_slice().len(), 1);
    }

    #[test]
    fn malformed_entry_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        let mut entries = serde_json::to_value(default_rules()).unwrap();
        if let Value::Array(items) = &mut entries {
            items.push(serde_json::json!({
                "id": 99,
                "name": "no field",
                "rule_type": "buy",
                "conditions": [{"indicator": "RSI", "operator": "lt", "target_value": 20}],
                "price_config": {}
            }));
        }
        fs::write(&path, entries.to_string()).unwrap();

        let adapter = JsonRuleAdapter::new(path);
        let rules = adapter.get_enabled_rules(None).unwrap();
        assert_eq!(rules.len(), 8);
        assert!(rules.iter().all(|r| r.id != 99));
        assert!(matches!(adapter.load_all(), Err(SignalwatchError::Json(_))));
    }

    #[test]
    fn malformed_file_is_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, "[{\"id\": 1,").unwrap();
        assert!(matches!(
            JsonRuleAdapter::new(path).get_enabled_rules(None),
            Err(SignalwatchError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let adapter = JsonRuleAdapter::new(PathBuf::from("/nonexistent/rules.json"));
        assert!(matches!(
            adapter.get_enabled_rules(None),
            Err(SignalwatchError::Io(_))
        ));
    }
}
