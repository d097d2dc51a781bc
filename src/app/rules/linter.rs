//! Rule dispatch.
//!
//! [`Linter::lint`] runs every enabled rule over one template in ascending
//! id order and concatenates their findings. A rule that panics does not
//! stop the run: the panic is caught and reported as a single `E0002`
//! finding carrying the offending rule id.

use std::panic::{self, AssertUnwindSafe};

use crate::app::cfn_resources::{self, Schema};
use crate::app::cfn_template::{ignored_checks, Template};
use crate::app::cfn_yaml::ParseError;
use crate::app::config::LintConfig;

use super::{default_registry, Finding, LintRule, RuleContext, RuleRegistry};

/// Id of the synthetic finding emitted when a rule fails internally.
pub const INTERNAL_FAILURE_ID: &str = "E0002";

/// Runs a registry of rules under a configuration.
#[derive(Debug)]
pub struct Linter<'r> {
    registry: &'r RuleRegistry,
    schema: &'r Schema,
    config: LintConfig,
}

impl Linter<'static> {
    /// A linter over the built-in rules and the embedded schema.
    pub fn with_config(config: LintConfig) -> Self {
        Self::new(default_registry(), cfn_resources::schema(), config)
    }
}

impl Default for Linter<'static> {
    fn default() -> Self {
        Self::with_config(LintConfig::default())
    }
}

impl<'r> Linter<'r> {
    pub fn new(registry: &'r RuleRegistry, schema: &'r Schema, config: LintConfig) -> Self {
        Self {
            registry,
            schema,
            config,
        }
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Parse template text and lint it.
    pub fn lint_source(&self, source: &str) -> Result<Vec<Finding>, ParseError> {
        let template = Template::parse(source)?;
        Ok(self.lint(&template))
    }

    /// Run every enabled rule over `template`.
    pub fn lint(&self, template: &Template) -> Vec<Finding> {
        let cx = RuleContext::new(template, self.schema);
        let template_ignores = ignored_checks(&template.metadata);
        let mut findings = Vec::new();
        let mut rules_run = 0usize;

        for rule in self.registry.rules() {
            if !self.config.is_rule_enabled(rule.id(), rule.tags()) {
                lint_debug!("Rule {} disabled by configuration", rule.id());
                continue;
            }
            if !self.config.is_mandatory(rule.id())
                && template_ignores.iter().any(|id| rule.id().starts_with(id.as_str()))
            {
                lint_debug!("Rule {} disabled by template metadata", rule.id());
                continue;
            }
            rules_run += 1;
            let produced = self.run_rule(rule, &cx);
            lint_debug!("Rule {} produced {} findings", rule.id(), produced.len());

            findings.extend(
                produced
                    .into_iter()
                    .filter(|finding| self.keep(finding, template, &template_ignores)),
            );
        }

        lint_info!(
            "Ran {} rules over {} resources, {} findings",
            rules_run,
            template.resources.len(),
            findings.len()
        );
        findings
    }

    fn run_rule(&self, rule: &dyn LintRule, cx: &RuleContext<'_>) -> Vec<Finding> {
        match panic::catch_unwind(AssertUnwindSafe(|| rule.check(cx))) {
            Ok(findings) => findings,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown error".to_string());
                lint_warn!("Rule {} failed: {}", rule.id(), reason);
                vec![Finding::new(
                    INTERNAL_FAILURE_ID,
                    format!(
                        "Unknown exception while processing rule {}: {}",
                        rule.id(),
                        reason
                    ),
                    &cx.template.raw,
                    Vec::new(),
                )]
            }
        }
    }

    /// Apply template-level and resource-level `ignore_checks` metadata.
    fn keep(&self, finding: &Finding, template: &Template, template_ignores: &[String]) -> bool {
        if self.config.is_mandatory(&finding.rule_id) {
            return true;
        }
        if template_ignores
            .iter()
            .any(|id| finding.rule_id.starts_with(id.as_str()))
        {
            lint_debug!("{} suppressed by template metadata", finding.rule_id);
            return false;
        }
        if finding.path.first().map(String::as_str) == Some("Resources") {
            if let Some(resource) = finding
                .path
                .get(1)
                .and_then(|id| template.resources.get(id))
            {
                if resource.ignores_check(&finding.rule_id) {
                    lint_debug!(
                        "{} suppressed by metadata on {}",
                        finding.rule_id,
                        resource.logical_id
                    );
                    return false;
                }
            }
        }
        true
    }
}

/// Lint a template with the built-in rules and default configuration.
pub fn lint_template(template: &Template) -> Vec<Finding> {
    Linter::default().lint(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rules::RuleInfo;

    struct Panics;

    impl LintRule for Panics {
        fn info(&self) -> RuleInfo {
            RuleInfo {
                id: "E9999",
                short_desc: "panics",
                description: "always panics",
                source_url: "",
                tags: &[],
            }
        }

        fn check(&self, _cx: &RuleContext<'_>) -> Vec<Finding> {
            panic!("boom")
        }
    }

    struct EveryResource;

    impl LintRule for EveryResource {
        fn info(&self) -> RuleInfo {
            RuleInfo {
                id: "W9000",
                short_desc: "reports every resource",
                description: "reports every resource",
                source_url: "",
                tags: &["test"],
            }
        }

        fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
            cx.resources()
                .map(|r| Finding::on_resource(self.info().id, r, &["Type"], "seen"))
                .collect()
        }
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(Panics)).unwrap();
        registry.register(Box::new(EveryResource)).unwrap();
        registry
    }

    const TEMPLATE: &str = "Resources:
  A:
    Type: AWS::S3::Bucket
  B:
    Type: AWS::S3::Bucket
    Metadata:
      cfn-lint:
        config:
          ignore_checks: [W9]
";

    #[test]
    fn test_panicking_rule_becomes_internal_failure() {
        let registry = registry();
        let linter = Linter::new(&registry, cfn_resources::schema(), LintConfig::default());
        let findings = linter.lint_source(TEMPLATE).unwrap();
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["E0002", "W9000"]);
        assert!(findings[0].message.contains("E9999"));
        assert!(findings[0].message.contains("boom"));
        assert_eq!(findings[1].path, vec!["Resources", "A", "Type"]);
    }

    #[test]
    fn test_config_and_mandatory_checks() {
        let registry = registry();
        let config = LintConfig {
            ignore_checks: vec!["E9999".to_string()],
            mandatory_checks: vec!["W9000".to_string()],
            ..LintConfig::default()
        };
        let linter = Linter::new(&registry, cfn_resources::schema(), config);
        let findings = linter.lint_source(TEMPLATE).unwrap();
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["W9000", "W9000"]);
    }

    #[test]
    fn test_template_metadata_suppression() {
        let registry = registry();
        let linter = Linter::new(&registry, cfn_resources::schema(), LintConfig::default());
        let source = format!(
            "Metadata:\n  cfn-lint:\n    config:\n      ignore_checks: [E9999]\n{}",
            TEMPLATE
        );
        let findings = linter.lint_source(&source).unwrap();
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["W9000"]);
    }
}
