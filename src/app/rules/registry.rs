//! Rule registry.
//!
//! Rules are registered once at startup and the registry is read-only from
//! then on. Iteration is ordered by rule id, which is also the order
//! findings are reported in.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::{LintRule, RuleInfo};

static RULE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[EWI]\d{4}$").expect("valid rule id regex"));

/// Errors raised while registering rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("rule {0} is already registered")]
    DuplicateId(String),
    #[error("'{0}' is not a valid rule id (expected E, W or I followed by four digits)")]
    MalformedId(String),
}

/// Rules keyed by id.
#[derive(Default)]
pub struct RuleRegistry {
    rules: BTreeMap<&'static str, Box<dyn LintRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, rejecting malformed and duplicate ids.
    pub fn register(&mut self, rule: Box<dyn LintRule>) -> Result<(), RegistryError> {
        let id = rule.id();
        if !RULE_ID.is_match(id) {
            return Err(RegistryError::MalformedId(id.to_string()));
        }
        if self.rules.contains_key(id) {
            return Err(RegistryError::DuplicateId(id.to_string()));
        }
        self.rules.insert(id, rule);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn LintRule> {
        self.rules.get(id).map(|rule| rule.as_ref())
    }

    /// Rules in ascending id order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn LintRule> {
        self.rules.values().map(|rule| rule.as_ref())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Metadata for every registered rule, in id order.
    pub fn metadata(&self) -> Vec<RuleInfo> {
        self.rules().map(|rule| rule.info()).collect()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rules::{Finding, RuleContext};

    struct Named(&'static str);

    impl LintRule for Named {
        fn info(&self) -> RuleInfo {
            RuleInfo {
                id: self.0,
                short_desc: "test",
                description: "test rule",
                source_url: "",
                tags: &[],
            }
        }

        fn check(&self, _cx: &RuleContext<'_>) -> Vec<Finding> {
            Vec::new()
        }
    }

    #[test]
    fn test_register_orders_by_id() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(Named("W2001"))).unwrap();
        registry.register(Box::new(Named("E3012"))).unwrap();
        registry.register(Box::new(Named("E1001"))).unwrap();
        assert_eq!(registry.ids(), vec!["E1001", "E3012", "W2001"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get("E3012").is_some());
        assert_eq!(registry.metadata()[1].id, "E3012");
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_ids() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(Named("E3012"))).unwrap();
        assert_eq!(
            registry.register(Box::new(Named("E3012"))),
            Err(RegistryError::DuplicateId("E3012".to_string()))
        );
        assert_eq!(
            registry.register(Box::new(Named("X1"))),
            Err(RegistryError::MalformedId("X1".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }
}
