//! Reference integrity rules.
//!
//! `Ref`, `Fn::GetAtt` and `Fn::Sub` targets, `DependsOn` entries and
//! resource conditions must all point at something the template declares,
//! and the resulting dependency graph must be acyclic.

use std::collections::BTreeSet;

use crate::app::cfn_dag::ResourceDag;
use crate::app::cfn_intrinsic_functions::{collect_references, Reference, ReferenceKind};
use crate::app::cfn_node::Node;
use crate::app::cfn_template::{is_pseudo_parameter, Template};

use super::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(GetAttTargets),
        Box::new(RefTargets),
        Box::new(DependencyCycles),
        Box::new(DependsOnTargets),
        Box::new(ResourceConditions),
        Box::new(UnusedParameters),
        Box::new(RedundantDependsOn),
    ]
}

/// A reference found somewhere in the template, with its full path and the
/// node it sits on.
struct LocatedReference<'a> {
    reference: Reference,
    path: Vec<String>,
    node: &'a Node,
}

/// References in resource properties, outputs and conditions.
fn template_references(template: &Template) -> Vec<LocatedReference<'_>> {
    let mut out = Vec::new();

    for resource in template.resources.values() {
        for (name, value) in &resource.properties {
            for reference in collect_references(value) {
                let mut rest = vec![name.clone()];
                rest.extend(reference.path.iter().cloned());
                let mut located = vec!["Properties".to_string()];
                located.extend(rest.iter().cloned());
                out.push(LocatedReference {
                    path: resource.property_path(&rest),
                    node: resource.locate(&located),
                    reference,
                });
            }
        }
    }

    let outputs = template
        .outputs
        .values()
        .map(|output| ("Outputs", output.name.as_str(), &output.node));
    let conditions = template
        .section("Conditions")
        .into_iter()
        .flat_map(Node::entries)
        .map(|(name, _, node)| ("Conditions", name, node));
    for (section, name, node) in outputs.chain(conditions) {
        for reference in collect_references(&node.to_value()) {
            let mut path = vec![section.to_string(), name.to_string()];
            path.extend(reference.path.iter().cloned());
            out.push(LocatedReference {
                node: node.locate(&reference.path),
                path,
                reference,
            });
        }
    }

    out
}

/// E1010: `Fn::GetAtt` targets.
pub struct GetAttTargets;

impl LintRule for GetAttTargets {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E1010",
            short_desc: "GetAtt validation of parameters",
            description: "Validates that GetAtt parameters are to valid resources and properties of those resources",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/intrinsic-function-reference-getatt.html",
            tags: &["functions", "getatt"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let template = cx.template;
        let mut findings = Vec::new();

        for located in template_references(template) {
            let reference = &located.reference;
            let attribute = match (reference.kind, &reference.attribute) {
                (ReferenceKind::GetAtt, attribute) => attribute.as_deref(),
                (ReferenceKind::Sub, Some(attribute)) => Some(attribute.as_str()),
                _ => continue,
            };
            if reference.kind == ReferenceKind::Sub && is_pseudo_parameter(&reference.target) {
                continue;
            }

            let Some(target) = template.resources.get(&reference.target) else {
                findings.push(Finding::new(
                    self.id(),
                    format!("GetAtt to resource {} is not a valid resource", reference.target),
                    located.node,
                    located.path,
                ));
                continue;
            };

            let Some(attribute) = attribute else {
                continue;
            };
            let Some(definition) = cx.schema.get_resource_type(&target.resource_type) else {
                continue;
            };
            if definition.attributes.is_empty() || definition.attributes.contains_key(attribute) {
                continue;
            }
            findings.push(Finding::new(
                self.id(),
                format!(
                    "Invalid GetAtt {}.{} for resource type {}",
                    reference.target, attribute, target.resource_type
                ),
                located.node,
                located.path,
            ));
        }
        findings
    }
}

/// E1020: `Ref` targets.
pub struct RefTargets;

impl LintRule for RefTargets {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E1020",
            short_desc: "Ref validation of value",
            description: "Making sure the Ref has a String value (no other functions are supported) and references a valid resource, parameter or pseudo parameter",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/intrinsic-function-reference-ref.html",
            tags: &["functions", "ref"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let template = cx.template;
        template_references(template)
            .into_iter()
            .filter(|located| {
                let reference = &located.reference;
                let plain = match reference.kind {
                    ReferenceKind::Ref => true,
                    ReferenceKind::Sub => reference.attribute.is_none(),
                    ReferenceKind::GetAtt => false,
                };
                plain
                    && !template.has_resource(&reference.target)
                    && !template.has_parameter(&reference.target)
                    && !is_pseudo_parameter(&reference.target)
            })
            .map(|located| {
                Finding::new(
                    self.id(),
                    format!(
                        "Ref {} is not a declared resource, parameter or pseudo parameter",
                        located.reference.target
                    ),
                    located.node,
                    located.path,
                )
            })
            .collect()
    }
}

/// E3004: dependency cycles, one per run.
pub struct DependencyCycles;

impl LintRule for DependencyCycles {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3004",
            short_desc: "Resource dependencies are not circular",
            description: "Check that Resources are not circularly dependent by DependsOn, Ref, Sub, or GetAtt",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/resources-section-structure.html",
            tags: &["resources", "circularly"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let dag = ResourceDag::from_template(cx.template);
        let Some(cycle) = dag.find_cycle() else {
            return Vec::new();
        };
        let Some(first) = cycle.first().and_then(|id| cx.template.resources.get(id)) else {
            return Vec::new();
        };
        let members: Vec<&str> = cycle
            .iter()
            .take(cycle.len().saturating_sub(1).max(1))
            .map(String::as_str)
            .collect();
        vec![Finding::on_resource(
            self.id(),
            first,
            &[] as &[&str],
            format!("Circular dependency between resources: {}", members.join(", ")),
        )]
    }
}

/// E3005: `DependsOn` entries.
pub struct DependsOnTargets;

impl LintRule for DependsOnTargets {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3005",
            short_desc: "Check DependsOn values for Resources",
            description: "Check that the DependsOn values are valid",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-attribute-dependson.html",
            tags: &["resources", "dependson"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let id = self.id();
        let mut findings = Vec::new();

        for resource in cx.resources() {
            let Some(node) = resource.attribute_node("DependsOn") else {
                continue;
            };
            let entries: Vec<(Vec<String>, &Node)> = match node.as_sequence() {
                Some(items) => items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| (vec!["DependsOn".to_string(), index.to_string()], item))
                    .collect(),
                None => vec![(vec!["DependsOn".to_string()], node)],
            };

            for (rest, item) in entries {
                let mut path = resource.path();
                path.extend(rest);
                let message = match item.as_str() {
                    None => format!("DependsOn entries must be strings, found {}", item.kind_name()),
                    Some(target) if target == resource.logical_id => {
                        format!("Resource {} cannot depend on itself", target)
                    }
                    Some(target) if !cx.template.has_resource(target) => {
                        format!("DependsOn {} is not a declared resource", target)
                    }
                    Some(_) => continue,
                };
                findings.push(Finding::new(id, message, item, path));
            }
        }
        findings
    }
}

/// E3015: resource conditions.
pub struct ResourceConditions;

impl LintRule for ResourceConditions {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3015",
            short_desc: "Check resource Condition is declared",
            description: "A resource Condition must name a condition declared in the Conditions section",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/conditions-section-structure.html",
            tags: &["resources", "conditions"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.resources() {
            let Some(node) = resource.attribute_node("Condition") else {
                continue;
            };
            let message = match &resource.condition {
                None => format!("Condition must be a string, found {}", node.kind_name()),
                Some(name) if !cx.template.has_condition(name) => {
                    format!("Condition {} is not declared in Conditions", name)
                }
                Some(_) => continue,
            };
            findings.push(Finding::on_resource(self.id(), resource, &["Condition"], message));
        }
        findings
    }
}

/// W2001: unused parameters.
pub struct UnusedParameters;

impl LintRule for UnusedParameters {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "W2001",
            short_desc: "Check if Parameters are Used",
            description: "Making sure the parameters defined are used",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/parameters-section-structure.html",
            tags: &["parameters"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let template = cx.template;
        if template.parameters.is_empty() {
            return Vec::new();
        }
        let mut used: BTreeSet<String> = BTreeSet::new();
        for (key, _, node) in template.raw.entries() {
            if key == "Parameters" {
                continue;
            }
            used.extend(
                collect_references(&node.to_value())
                    .into_iter()
                    .map(|reference| reference.target),
            );
        }

        template
            .parameters
            .values()
            .filter(|parameter| !used.contains(&parameter.name))
            .map(|parameter| {
                Finding::new(
                    self.id(),
                    format!("Parameter {} not used.", parameter.name),
                    &parameter.node,
                    vec!["Parameters".to_string(), parameter.name.clone()],
                )
            })
            .collect()
    }
}

/// W3005: `DependsOn` that an existing reference already implies.
pub struct RedundantDependsOn;

impl LintRule for RedundantDependsOn {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "W3005",
            short_desc: "Check obsolete DependsOn configuration for Resources",
            description: "Check if DependsOn is specified if not needed. A Ref or a Fn::GetAtt already is an implicit dependency.",
            source_url: "https://aws.amazon.com/blogs/devops/optimize-aws-cloudformation-templates/",
            tags: &["resources", "dependson", "ref", "getatt"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let dag = ResourceDag::from_template(cx.template);
        let mut findings = Vec::new();
        for resource in cx.resources() {
            let Some(implicit) = dag.implicit_dependencies(&resource.logical_id) else {
                continue;
            };
            let Some(node) = resource.attribute_node("DependsOn") else {
                continue;
            };
            // Indexes follow the raw list so non-string entries keep their slot.
            let entries: Vec<(Vec<String>, &Node)> = match node.as_sequence() {
                Some(items) => items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| (vec!["DependsOn".to_string(), index.to_string()], item))
                    .collect(),
                None => vec![(vec!["DependsOn".to_string()], node)],
            };
            for (rest, item) in entries {
                let Some(dependency) = item.as_str() else {
                    continue;
                };
                if !implicit.contains(dependency) {
                    continue;
                }
                let mut path = resource.path();
                path.extend(rest);
                findings.push(Finding::new(
                    self.id(),
                    format!(
                        "Obsolete DependsOn on resource ({}), dependency already enforced by a Ref or GetAtt",
                        dependency
                    ),
                    item,
                    path,
                ));
            }
        }
        findings
    }
}
