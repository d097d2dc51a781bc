//! Template and resource envelope rules.
//!
//! These rules check shapes rather than values: which sections a template
//! declares, how a resource entry is laid out, and the resource attributes
//! (`DeletionPolicy`, `UpdatePolicy`, ...) that sit next to `Properties`.
//! They apply to every resource, including types the schema does not know.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::app::cfn_intrinsic_functions::is_intrinsic;
use crate::app::cfn_node::Node;
use crate::app::cfn_resource_policies::{
    CreationPolicyType, ResourcePolicyManager, UpdatePolicyType, DELETION_POLICIES,
    UPDATE_REPLACE_POLICIES,
};
use crate::app::cfn_template::{Resource, RESOURCE_ATTRIBUTES, TEMPLATE_SECTIONS};

use super::{Finding, LintRule, RuleContext, RuleInfo};

/// Most resources a single template may declare.
pub const MAX_RESOURCES: usize = 500;

const FORMAT_VERSION: &str = "2010-09-09";

static RESOURCE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((AWS|Alexa)::[a-zA-Z0-9]+::[a-zA-Z0-9]+|Custom::[a-zA-Z0-9_@-]{1,60}|[a-zA-Z0-9]+::[a-zA-Z0-9]+::[a-zA-Z0-9]+::MODULE)$",
    )
    .expect("valid resource type regex")
});

static PROPERTY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9]*$").expect("valid property name regex"));

static LOGICAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("valid logical id regex"));

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(TemplateSections),
        Box::new(TransformShape),
        Box::new(ResourceEnvelope),
        Box::new(PropertiesShape),
        Box::new(ResourceTypeGrammar),
        Box::new(PropertyNames),
        Box::new(ResourceLimit),
        Box::new(LogicalIds),
        Box::new(UpdatePolicyKeys),
        Box::new(MetadataShape),
        Box::new(DeletionPolicyValues),
        Box::new(UpdateReplacePolicyValues),
        Box::new(CreationPolicyKeys),
    ]
}

// Key node of a mapping entry, for findings about the key itself.
fn key_node<'a>(parent: &'a Node, key: &str) -> &'a Node {
    parent
        .get_entry(key)
        .map(|(key, _)| key)
        .unwrap_or(parent)
}

/// E1001: top-level sections.
pub struct TemplateSections;

impl TemplateSections {
    const MAPPING_SECTIONS: [&'static str; 7] = [
        "Parameters",
        "Mappings",
        "Conditions",
        "Resources",
        "Outputs",
        "Metadata",
        "Rules",
    ];
}

impl LintRule for TemplateSections {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E1001",
            short_desc: "Basic CloudFormation Template Configuration",
            description: "Making sure the basic CloudFormation template components are properly configured",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/template-anatomy.html",
            tags: &["base"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let id = self.id();
        let root = &cx.template.raw;
        let mut findings = Vec::new();

        for (key, key_node, _) in root.entries() {
            if !TEMPLATE_SECTIONS.contains(&key) {
                findings.push(Finding::new(
                    id,
                    format!("Top level template section {} is not valid", key),
                    key_node,
                    vec![key.to_string()],
                ));
            }
        }

        if let Some(version) = root.get("AWSTemplateFormatVersion") {
            if version.scalar_text() != Some(FORMAT_VERSION) {
                findings.push(Finding::new(
                    id,
                    format!("AWSTemplateFormatVersion must be '{}'", FORMAT_VERSION),
                    version,
                    vec!["AWSTemplateFormatVersion".to_string()],
                ));
            }
        }

        if let Some(description) = root.get("Description") {
            if description.as_str().is_none() {
                findings.push(Finding::new(
                    id,
                    format!("Description must be a string, found {}", description.kind_name()),
                    description,
                    vec!["Description".to_string()],
                ));
            }
        }

        for section in Self::MAPPING_SECTIONS {
            if let Some(node) = root.get(section) {
                if !node.is_mapping() {
                    findings.push(Finding::new(
                        id,
                        format!("{} must be a mapping, found {}", section, node.kind_name()),
                        node,
                        vec![section.to_string()],
                    ));
                }
            }
        }

        match root.get("Resources") {
            None => findings.push(Finding::new(
                id,
                "Missing top level template section Resources",
                root,
                Vec::new(),
            )),
            Some(node) if node.is_mapping() && node.entries().next().is_none() => {
                findings.push(Finding::new(
                    id,
                    "Resources must declare at least one resource",
                    node,
                    vec!["Resources".to_string()],
                ))
            }
            Some(_) => {}
        }

        findings
    }
}

/// E1005: Transform shape.
pub struct TransformShape;

impl TransformShape {
    fn valid_entry(node: &Node) -> bool {
        node.as_str().is_some() || (node.is_mapping() && node.get("Name").is_some())
    }
}

impl LintRule for TransformShape {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E1005",
            short_desc: "Validate Transform configuration",
            description: "Validate that the transforms section of a template is properly configured",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/transform-section-structure.html",
            tags: &["transform"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(node) = cx.template.section("Transform") else {
            return Vec::new();
        };
        let path = vec!["Transform".to_string()];
        match node.as_sequence() {
            Some(items) => items
                .iter()
                .enumerate()
                .filter(|(_, item)| !Self::valid_entry(item))
                .map(|(index, item)| {
                    let mut item_path = path.clone();
                    item_path.push(index.to_string());
                    Finding::new(
                        self.id(),
                        format!("Transform entry must be a string, found {}", item.kind_name()),
                        item,
                        item_path,
                    )
                })
                .collect(),
            None if Self::valid_entry(node) => Vec::new(),
            None => vec![Finding::new(
                self.id(),
                format!(
                    "Transform must be a string or a list of strings, found {}",
                    node.kind_name()
                ),
                node,
                path,
            )],
        }
    }
}

/// E3001: resource entry shape and attributes.
pub struct ResourceEnvelope;

impl LintRule for ResourceEnvelope {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3001",
            short_desc: "Basic CloudFormation Resource Check",
            description: "Making sure the basic CloudFormation resources are properly configured",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/resources-section-structure.html",
            tags: &["resources"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let id = self.id();
        let mut findings = Vec::new();

        for resource in cx.resources() {
            if resource.logical_id.starts_with("Fn::ForEach") {
                continue;
            }
            if !resource.node.is_mapping() {
                findings.push(Finding::new(
                    id,
                    format!(
                        "Resource {} must be a mapping, found {}",
                        resource.logical_id,
                        resource.node.kind_name()
                    ),
                    &resource.node,
                    resource.path(),
                ));
                continue;
            }

            match resource.attribute_node("Type") {
                None => findings.push(Finding::on_resource(
                    id,
                    resource,
                    &[] as &[&str],
                    format!("Resource {} is missing the required Type attribute", resource.logical_id),
                )),
                Some(node) if node.as_str().is_none() => findings.push(Finding::on_resource(
                    id,
                    resource,
                    &["Type"],
                    format!("Type of resource {} must be a string", resource.logical_id),
                )),
                Some(_) => {}
            }

            for (key, key_node, _) in resource.node.entries() {
                if !RESOURCE_ATTRIBUTES.contains(&key) {
                    let mut path = resource.path();
                    path.push(key.to_string());
                    findings.push(Finding::new(
                        id,
                        format!(
                            "Invalid resource attribute {} for resource {}",
                            key, resource.logical_id
                        ),
                        key_node,
                        path,
                    ));
                }
            }
        }
        findings
    }
}

/// E3002: `Properties` is a mapping.
pub struct PropertiesShape;

impl LintRule for PropertiesShape {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3002",
            short_desc: "Resource properties are invalid",
            description: "Making sure that resources properties are properly configured",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/resources-section-structure.html",
            tags: &["resources"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        cx.resources()
            .filter_map(|resource| {
                let node = resource.attribute_node("Properties")?;
                if node.is_mapping() || is_intrinsic(&node.to_value()) {
                    return None;
                }
                Some(Finding::on_resource(
                    self.id(),
                    resource,
                    &["Properties"],
                    format!(
                        "Properties of resource {} must be a mapping, found {}",
                        resource.logical_id,
                        node.kind_name()
                    ),
                ))
            })
            .collect()
    }
}

/// E3006: resource type grammar.
pub struct ResourceTypeGrammar;

impl LintRule for ResourceTypeGrammar {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3006",
            short_desc: "Validate the CloudFormation resource type",
            description: "Resource types must be of the form Provider::Service::Resource, Custom::Name or a module",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-template-resource-type-ref.html",
            tags: &["resources"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        cx.resources()
            .filter(|resource| {
                !resource.resource_type.is_empty() && !RESOURCE_TYPE.is_match(&resource.resource_type)
            })
            .map(|resource| {
                Finding::on_resource(
                    self.id(),
                    resource,
                    &["Type"],
                    format!(
                        "Resource type {} of {} is not a valid resource type",
                        resource.resource_type, resource.logical_id
                    ),
                )
            })
            .collect()
    }
}

/// E3009: property names.
pub struct PropertyNames;

impl LintRule for PropertyNames {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3009",
            short_desc: "Property names are alphanumeric",
            description: "Property names must start with a letter and contain only letters and digits",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/resources-section-structure.html",
            tags: &["resources", "properties"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.resources() {
            // Custom resources and modules pass arbitrary keys through.
            if resource.resource_type.starts_with("Custom::")
                || resource.resource_type.ends_with("::MODULE")
                || resource.resource_type == "AWS::CloudFormation::CustomResource"
            {
                continue;
            }
            let Some(properties) = resource.attribute_node("Properties") else {
                continue;
            };
            for (key, key_node, _) in properties.entries() {
                if key.starts_with("Fn::") || PROPERTY_NAME.is_match(key) {
                    continue;
                }
                findings.push(Finding::new(
                    self.id(),
                    format!("Property name {} on {} is not alphanumeric", key, resource.logical_id),
                    key_node,
                    resource.property_path(&[key]),
                ));
            }
        }
        findings
    }
}

/// E3010: resource count limit.
pub struct ResourceLimit;

impl LintRule for ResourceLimit {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3010",
            short_desc: "Resource limit not exceeded",
            description: "Check the number of resources in the template is less than the upper limit",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/cloudformation-limits.html",
            tags: &["resources", "limits"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let count = cx.template.resources.len();
        if count <= MAX_RESOURCES {
            return Vec::new();
        }
        let node = cx.template.section("Resources").unwrap_or(&cx.template.raw);
        vec![Finding::new(
            self.id(),
            format!(
                "The template declares {} resources, more than the limit of {}",
                count, MAX_RESOURCES
            ),
            node,
            vec!["Resources".to_string()],
        )]
    }
}

/// E3011: logical ids.
pub struct LogicalIds;

impl LintRule for LogicalIds {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3011",
            short_desc: "Check logical IDs are alphanumeric",
            description: "Logical IDs of resources may only contain letters and digits",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/resources-section-structure.html",
            tags: &["resources"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(section) = cx.template.section("Resources") else {
            return Vec::new();
        };
        section
            .entries()
            .filter(|(name, _, _)| !name.starts_with("Fn::ForEach") && !LOGICAL_ID.is_match(name))
            .map(|(name, key_node, _)| {
                Finding::new(
                    self.id(),
                    format!("Resource logical id {} is not alphanumeric", name),
                    key_node,
                    vec!["Resources".to_string(), name.to_string()],
                )
            })
            .collect()
    }
}

/// E3016: UpdatePolicy keys and support.
pub struct UpdatePolicyKeys;

impl LintRule for UpdatePolicyKeys {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3016",
            short_desc: "Check the configuration of a resources UpdatePolicy",
            description: "Make sure a resources UpdatePolicy is properly configured",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-attribute-updatepolicy.html",
            tags: &["resources", "updatepolicy"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let id = self.id();
        let mut findings = Vec::new();
        for resource in cx.resources() {
            let Some(node) = resource.attribute_node("UpdatePolicy") else {
                continue;
            };
            if is_intrinsic(&node.to_value()) {
                continue;
            }
            if !node.is_mapping() {
                findings.push(Finding::on_resource(
                    id,
                    resource,
                    &["UpdatePolicy"],
                    format!("UpdatePolicy must be a mapping, found {}", node.kind_name()),
                ));
                continue;
            }
            if resource.resource_type.is_empty() {
                continue;
            }
            if !ResourcePolicyManager::supports_update_policy(&resource.resource_type) {
                findings.push(Finding::on_resource(
                    id,
                    resource,
                    &["UpdatePolicy"],
                    format!(
                        "UpdatePolicy is not supported for resource type {}",
                        resource.resource_type
                    ),
                ));
                continue;
            }
            let supported = ResourcePolicyManager::get_update_policy_types(&resource.resource_type);
            for (key, key_node, _) in node.entries() {
                let message = match UpdatePolicyType::from_key(key) {
                    None => format!("UpdatePolicy key {} is not valid", key),
                    Some(kind) if !supported.contains(&kind) => format!(
                        "UpdatePolicy {} is not supported for resource type {}",
                        key, resource.resource_type
                    ),
                    Some(_) => continue,
                };
                let mut path = resource.path();
                path.extend(["UpdatePolicy".to_string(), key.to_string()]);
                findings.push(Finding::new(id, message, key_node, path));
            }
        }
        findings
    }
}

/// E3028: resource Metadata shape.
pub struct MetadataShape;

impl LintRule for MetadataShape {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3028",
            short_desc: "Validate resource Metadata",
            description: "Resource Metadata must be a mapping",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-attribute-metadata.html",
            tags: &["resources", "metadata"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        cx.resources()
            .filter_map(|resource| {
                let node = resource.attribute_node("Metadata")?;
                if node.is_mapping() {
                    return None;
                }
                Some(Finding::on_resource(
                    self.id(),
                    resource,
                    &["Metadata"],
                    format!("Metadata must be a mapping, found {}", node.kind_name()),
                ))
            })
            .collect()
    }
}

// Shared body of the DeletionPolicy and UpdateReplacePolicy rules.
fn check_policy_value(
    rule_id: &str,
    resource: &Resource,
    attribute: &str,
    allowed: &[&str],
) -> Option<Finding> {
    let node = resource.attribute_node(attribute)?;
    let value = node.to_value();
    if is_intrinsic(&value) {
        return None;
    }
    let message = match value {
        Value::String(policy) if !allowed.contains(&policy.as_str()) => format!(
            "{} {} is not one of {}",
            attribute,
            policy,
            allowed.join(", ")
        ),
        Value::String(policy)
            if policy == "Snapshot"
                && !resource.resource_type.is_empty()
                && !ResourcePolicyManager::supports_snapshot_policy(&resource.resource_type) =>
        {
            format!(
                "{} Snapshot is not supported for resource type {}",
                attribute, resource.resource_type
            )
        }
        Value::String(_) => return None,
        _ => format!("{} must be a string, found {}", attribute, node.kind_name()),
    };
    Some(Finding::on_resource(rule_id, resource, &[attribute], message))
}

/// E3035: DeletionPolicy values.
pub struct DeletionPolicyValues;

impl LintRule for DeletionPolicyValues {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3035",
            short_desc: "Check DeletionPolicy values for Resources",
            description: "Check that the DeletionPolicy values are valid",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-attribute-deletionpolicy.html",
            tags: &["resources", "deletionpolicy"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        cx.resources()
            .filter_map(|r| check_policy_value(self.id(), r, "DeletionPolicy", DELETION_POLICIES))
            .collect()
    }
}

/// E3036: UpdateReplacePolicy values.
pub struct UpdateReplacePolicyValues;

impl LintRule for UpdateReplacePolicyValues {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3036",
            short_desc: "Check UpdateReplacePolicy values for Resources",
            description: "Check that the UpdateReplacePolicy values are valid",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-attribute-updatereplacepolicy.html",
            tags: &["resources", "updatereplacepolicy"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        cx.resources()
            .filter_map(|r| {
                check_policy_value(self.id(), r, "UpdateReplacePolicy", UPDATE_REPLACE_POLICIES)
            })
            .collect()
    }
}

/// E3055: CreationPolicy keys, support and values.
pub struct CreationPolicyKeys;

impl LintRule for CreationPolicyKeys {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3055",
            short_desc: "Check CreationPolicy values for Resources",
            description: "Check that the CreationPolicy is only used on supported resource types and is well formed",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-attribute-creationpolicy.html",
            tags: &["resources", "creationpolicy"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let id = self.id();
        let mut findings = Vec::new();
        for resource in cx.resources() {
            let Some(node) = resource.attribute_node("CreationPolicy") else {
                continue;
            };
            let value = node.to_value();
            if is_intrinsic(&value) || resource.resource_type.is_empty() {
                continue;
            }
            let Some(policies) = value.as_object() else {
                findings.push(Finding::on_resource(
                    id,
                    resource,
                    &["CreationPolicy"],
                    format!("CreationPolicy must be a mapping, found {}", node.kind_name()),
                ));
                continue;
            };
            if !ResourcePolicyManager::supports_creation_policy(&resource.resource_type) {
                findings.push(Finding::on_resource(
                    id,
                    resource,
                    &["CreationPolicy"],
                    format!(
                        "CreationPolicy is not supported for resource type {}",
                        resource.resource_type
                    ),
                ));
                continue;
            }
            let supported = ResourcePolicyManager::get_creation_policy_types(&resource.resource_type);
            for (key, config) in policies {
                let rest = ["CreationPolicy", key.as_str()];
                let message = match CreationPolicyType::from_key(key) {
                    None => format!("CreationPolicy key {} is not valid", key),
                    Some(kind) if !supported.contains(&kind) => format!(
                        "CreationPolicy {} is not supported for resource type {}",
                        key, resource.resource_type
                    ),
                    Some(_) if is_intrinsic(config) => continue,
                    Some(kind) => {
                        match ResourcePolicyManager::validate_creation_policy_config(kind, config) {
                            Ok(()) => continue,
                            Err(message) => message,
                        }
                    }
                };
                findings.push(Finding::on_resource(id, resource, &rest, message));
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cfn_resources::schema;
    use crate::app::cfn_template::Template;

    fn run(rule: &dyn LintRule, source: &str) -> Vec<Finding> {
        let template = Template::parse(source).unwrap();
        rule.check(&RuleContext::new(&template, schema()))
    }

    #[test]
    fn test_template_sections() {
        let findings = run(
            &TemplateSections,
            "AWSTemplateFormatVersion: '2010-09-10'\nResource: {}\nOutputs: []\n",
        );
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(findings.len(), 4, "{:?}", messages);
        assert!(messages[0].contains("Resource is not valid"));
        assert!(messages[1].contains("AWSTemplateFormatVersion"));
        assert!(messages[2].contains("Outputs must be a mapping"));
        assert!(messages[3].contains("Missing top level"));
    }

    #[test]
    fn test_transform_shape() {
        assert!(run(&TransformShape, "Transform: AWS::Serverless-2016-10-31\nResources: {}\n").is_empty());
        assert!(run(
            &TransformShape,
            "Transform: [AWS::Serverless-2016-10-31, {Name: AWS::Include}]\nResources: {}\n"
        )
        .is_empty());
        let findings = run(&TransformShape, "Transform: [1]\nResources: {}\n");
        assert_eq!(findings[0].path, vec!["Transform", "0"]);
    }

    #[test]
    fn test_resource_envelope() {
        let findings = run(
            &ResourceEnvelope,
            "Resources:\n  A:\n    Properties: {}\n  B: 3\n  C:\n    Type: AWS::S3::Bucket\n    Propertes: {}\n",
        );
        assert_eq!(findings.len(), 3);
        assert!(findings[0].message.contains("missing the required Type"));
        assert!(findings[1].message.contains("must be a mapping"));
        assert_eq!(findings[2].path, vec!["Resources", "C", "Propertes"]);
        assert_eq!(findings[2].line, 7);
    }

    #[test]
    fn test_resource_type_grammar() {
        let findings = run(
            &ResourceTypeGrammar,
            "Resources:
  A:
    Type: AWS::S3::Bucket
  B:
    Type: Custom::MyThing
  C:
    Type: My::Org::Thing::MODULE
  D:
    Type: AWS::S3
  E:
    Type: s3 bucket
",
        );
        let ids: Vec<&str> = findings.iter().map(|f| f.path[1].as_str()).collect();
        assert_eq!(ids, vec!["D", "E"]);
    }

    #[test]
    fn test_property_names_and_logical_ids() {
        let source = "Resources:
  Good:
    Type: AWS::S3::Bucket
    Properties:
      Bucket_Name: x
  Bad-Id:
    Type: Custom::Thing
    Properties:
      any_key: 1
";
        let names = run(&PropertyNames, source);
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].path, vec!["Resources", "Good", "Properties", "Bucket_Name"]);

        let ids = run(&LogicalIds, source);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].path, vec!["Resources", "Bad-Id"]);
    }

    #[test]
    fn test_policies() {
        let source = "Resources:
  Bucket:
    Type: AWS::S3::Bucket
    DeletionPolicy: Snapshot
    UpdateReplacePolicy: RetainExceptOnCreate
    UpdatePolicy:
      AutoScalingRollingUpdate: {}
  Db:
    Type: AWS::RDS::DBInstance
    DeletionPolicy: Snapshot
    UpdateReplacePolicy: !Ref Policy
";
        let deletion = run(&DeletionPolicyValues, source);
        assert_eq!(deletion.len(), 1);
        assert!(deletion[0].message.contains("not supported for resource type AWS::S3::Bucket"));

        let replace = run(&UpdateReplacePolicyValues, source);
        assert_eq!(replace.len(), 1);
        assert!(replace[0].message.contains("RetainExceptOnCreate is not one of"));

        let update = run(&UpdatePolicyKeys, source);
        assert_eq!(update.len(), 1);
        assert!(update[0].message.contains("not supported for resource type AWS::S3::Bucket"));
    }

    #[test]
    fn test_update_policy_keys_on_asg() {
        let findings = run(
            &UpdatePolicyKeys,
            "Resources:
  Asg:
    Type: AWS::AutoScaling::AutoScalingGroup
    UpdatePolicy:
      AutoScalingRollingUpdate: {}
      UseOnlineResharding: true
      Unknown: 1
",
        );
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.contains("UseOnlineResharding"));
        assert!(findings[1].message.contains("Unknown is not valid"));
    }

    #[test]
    fn test_creation_policy() {
        let findings = run(
            &CreationPolicyKeys,
            "Resources:
  Instance:
    Type: AWS::EC2::Instance
    CreationPolicy:
      ResourceSignal:
        Count: 0
  Bucket:
    Type: AWS::S3::Bucket
    CreationPolicy:
      ResourceSignal: {}
  Asg:
    Type: AWS::AutoScaling::AutoScalingGroup
    CreationPolicy:
      ResourceSignal:
        Count: 2
        Timeout: PT15M
",
        );
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].path[1], "Bucket");
        assert_eq!(findings[1].path, vec!["Resources", "Instance", "CreationPolicy", "ResourceSignal"]);
    }

    #[test]
    fn test_resource_limit_and_metadata() {
        let mut source = String::from("Resources:\n");
        for i in 0..=MAX_RESOURCES {
            source.push_str(&format!("  Topic{}:\n    Type: AWS::SNS::Topic\n", i));
        }
        assert_eq!(run(&ResourceLimit, &source).len(), 1);

        let metadata = run(
            &MetadataShape,
            "Resources:\n  T:\n    Type: AWS::SNS::Topic\n    Metadata: [1]\n",
        );
        assert_eq!(metadata.len(), 1);
    }
}
