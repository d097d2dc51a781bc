//! # Lint Rules
//!
//! Every diagnostic the linter knows is a small, stateless type implementing
//! [`LintRule`]. Rules read the template and the shared schema through a
//! [`RuleContext`] and return findings; they never mutate anything and never
//! fail. A value a rule cannot interpret simply produces no finding.
//!
//! ## Families
//!
//! * [`templates`] - resource envelope and template sections (E1xxx, E30xx)
//! * [`references`] - `Ref`, `Fn::GetAtt`, `DependsOn`, conditions, cycles
//! * [`properties`] - schema-driven property checks
//! * [`cross_property`] - relations between properties of one resource
//! * [`cross_resource`] - relations between resources
//! * [`services`] - per-service value catalogs and structures
//! * [`iam`] - IAM policy documents and role ARNs
//!
//! ## Dispatch
//!
//! [`RuleRegistry`] holds rules keyed by id and [`Linter`] runs them in id
//! order, applies configuration and template-level suppression, and turns a
//! panicking rule into a synthetic `E0002` finding.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::app::cfn_resources::Schema;
use crate::app::cfn_template::{Resource, Template};

pub mod cross_property;
pub mod cross_resource;
pub mod finding;
pub mod iam;
pub mod linter;
pub mod properties;
pub mod references;
pub mod registry;
pub mod services;
pub mod templates;
pub mod walk;

pub use finding::{Finding, Severity};
pub use linter::{Linter, INTERNAL_FAILURE_ID};
pub use registry::{RegistryError, RuleRegistry};

/// Descriptive metadata of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleInfo {
    pub id: &'static str,
    pub short_desc: &'static str,
    pub description: &'static str,
    pub source_url: &'static str,
    pub tags: &'static [&'static str],
}

/// A check over a whole template, identified by a stable id.
pub trait LintRule: Send + Sync {
    fn info(&self) -> RuleInfo;

    /// Inspect the template and report findings in a deterministic order.
    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding>;

    fn id(&self) -> &'static str {
        self.info().id
    }

    fn short_desc(&self) -> &'static str {
        self.info().short_desc
    }

    fn description(&self) -> &'static str {
        self.info().description
    }

    fn source_url(&self) -> &'static str {
        self.info().source_url
    }

    fn tags(&self) -> &'static [&'static str] {
        self.info().tags
    }
}

/// What a rule gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub template: &'a Template,
    pub schema: &'a Schema,
}

impl<'a> RuleContext<'a> {
    pub fn new(template: &'a Template, schema: &'a Schema) -> Self {
        Self { template, schema }
    }

    /// All resources in logical-id order.
    pub fn resources(&self) -> impl Iterator<Item = &'a Resource> + 'a {
        self.template.resources.values()
    }

    /// Resources whose type the schema knows, in logical-id order.
    pub fn known_resources(&self) -> impl Iterator<Item = &'a Resource> + 'a {
        let schema = self.schema;
        self.template
            .resources
            .values()
            .filter(move |resource| schema.has_resource_type(&resource.resource_type))
    }

    pub fn resources_of_type(&self, resource_type: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.template.resources_of_type(resource_type)
    }
}

/// The process-wide registry holding every built-in rule.
pub static DEFAULT_REGISTRY: Lazy<RuleRegistry> = Lazy::new(|| {
    let mut registry = RuleRegistry::new();
    if let Err(e) = register_all(&mut registry) {
        log_error!("Failed to register built-in rules: {}", e);
    }
    registry
});

pub fn default_registry() -> &'static RuleRegistry {
    &DEFAULT_REGISTRY
}

/// Register every built-in rule.
pub fn register_all(registry: &mut RuleRegistry) -> Result<(), RegistryError> {
    let families = [
        templates::rules(),
        references::rules(),
        properties::rules(),
        cross_property::rules(),
        cross_resource::rules(),
        services::rules(),
        iam::rules(),
    ];
    for rule in families.into_iter().flatten() {
        registry.register(rule)?;
    }
    Ok(())
}
