//! CloudFormation template model.
//!
//! This module turns the located document tree produced by
//! [`crate::app::cfn_yaml`] into a typed, read-only view of a template that
//! rules can query. Sections are looked up by key, resources are collected in
//! ascending logical-id order, and every resource keeps its source node so a
//! finding can be anchored to the line and column it came from.
//!
//! # Core Components
//!
//! - [`Template`] - The parsed template with all standard sections
//! - [`Resource`] - A single resource: type, decoded properties, attributes
//! - [`Parameter`] - An input parameter declaration
//! - [`Output`] - An output declaration
//!
//! # Building
//!
//! Construction never fails on semantic problems. A missing `Type`, a
//! `Properties` value that is not a mapping or a `Resources` section of the
//! wrong shape all produce a template that the structural rules then
//! diagnose. Only malformed YAML/JSON is rejected, by the loader.
//!
//! # Examples
//!
//! ```rust
//! use cfnlint::app::cfn_template::Template;
//!
//! let template = Template::parse(
//!     "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n",
//! )?;
//! assert!(template.has_resource("Bucket"));
//! assert_eq!(template.resources["Bucket"].resource_type, "AWS::S3::Bucket");
//! # Ok::<(), cfnlint::app::cfn_yaml::ParseError>(())
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::app::cfn_intrinsic_functions::referenced_name;
use crate::app::cfn_node::Node;
use crate::app::cfn_yaml::{self, ParseError};

/// Top-level keys a template may declare.
pub const TEMPLATE_SECTIONS: &[&str] = &[
    "AWSTemplateFormatVersion",
    "Transform",
    "Description",
    "Parameters",
    "Mappings",
    "Conditions",
    "Resources",
    "Outputs",
    "Metadata",
    "Rules",
    "Hooks",
];

/// Attributes a resource entry may carry.
pub const RESOURCE_ATTRIBUTES: &[&str] = &[
    "Type",
    "Properties",
    "DependsOn",
    "Condition",
    "Metadata",
    "DeletionPolicy",
    "UpdatePolicy",
    "UpdateReplacePolicy",
    "CreationPolicy",
];

/// Pseudo parameters every template can `Ref` without declaring them.
pub const PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::AccountId",
    "AWS::NotificationARNs",
    "AWS::NoValue",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

/// Returns `true` if `name` is one of the built-in pseudo parameters.
pub fn is_pseudo_parameter(name: &str) -> bool {
    PSEUDO_PARAMETERS.contains(&name)
}

/// A parsed CloudFormation template.
///
/// All sections are keyed maps iterated in ascending key order, so any rule
/// that walks them produces findings in a stable order from run to run.
/// `raw` keeps the full document for rules that need to look at sections the
/// model does not type (for example `Rules` or the template `Metadata`).
#[derive(Debug, Clone)]
pub struct Template {
    pub raw: Node,
    pub format_version: Option<String>,
    pub description: Option<String>,
    pub transform: Vec<String>,
    pub parameters: BTreeMap<String, Parameter>,
    pub mappings: BTreeMap<String, Node>,
    pub conditions: BTreeMap<String, Node>,
    pub resources: BTreeMap<String, Resource>,
    pub outputs: BTreeMap<String, Output>,
    pub metadata: BTreeMap<String, Value>,
}

/// A template parameter declaration.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    /// The declared `Type`, empty when absent.
    pub parameter_type: String,
    pub default: Option<Value>,
    pub allowed_values: Vec<Value>,
    pub node: Node,
}

/// A template output declaration.
#[derive(Debug, Clone)]
pub struct Output {
    pub name: String,
    pub value: Option<Value>,
    pub condition: Option<String>,
    pub node: Node,
}

/// A resource declared under `Resources`.
///
/// Properties are decoded into plain JSON values with intrinsic functions
/// kept verbatim as single-key objects. Location information stays on
/// `node`; use [`Resource::attribute_node`] and [`Resource::locate`] to find
/// the most precise anchor for a finding.
///
/// # Resource Attributes
///
/// - **DependsOn**: accepted as a single string or a list of strings
/// - **Condition**: the name of a template condition
/// - **Metadata**: decoded into a map when it is a mapping
/// - **DeletionPolicy** / **UpdateReplacePolicy** / **UpdatePolicy** /
///   **CreationPolicy**: available as nodes for the rules that check them
#[derive(Debug, Clone)]
pub struct Resource {
    pub logical_id: String,
    /// The declared `Type`; empty when missing or not a string.
    pub resource_type: String,
    pub properties: BTreeMap<String, Value>,
    pub depends_on: Vec<String>,
    pub condition: Option<String>,
    pub metadata: BTreeMap<String, Value>,
    pub node: Node,
}

impl Template {
    /// Parse template text (YAML or JSON) into a template.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let root = cfn_yaml::load(source)?;
        Self::from_node(root)
    }

    /// Load and parse a template file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read template: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse template: {}", path.display()))
    }

    /// Build the model from the document root.
    ///
    /// The only shape requirement at this point is that the root is a
    /// mapping; everything below it is tolerated and left for rules.
    pub fn from_node(root: Node) -> Result<Self, ParseError> {
        if !root.is_mapping() {
            return Err(ParseError::NotAMapping {
                found: root.kind_name(),
            });
        }

        let format_version = root
            .get("AWSTemplateFormatVersion")
            .and_then(|node| node.scalar_text())
            .map(str::to_string);
        let description = root
            .get("Description")
            .and_then(|node| node.as_str())
            .map(str::to_string);

        let transform = match root.get("Transform") {
            Some(node) => match node.as_sequence() {
                Some(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                None => node.as_str().map(|s| vec![s.to_string()]).unwrap_or_default(),
            },
            None => Vec::new(),
        };

        let parameters = section_entries(&root, "Parameters")
            .map(|(name, node)| (name.to_string(), Parameter::from_node(name, node)))
            .collect();
        let mappings = section_entries(&root, "Mappings")
            .map(|(name, node)| (name.to_string(), node.clone()))
            .collect();
        let conditions = section_entries(&root, "Conditions")
            .map(|(name, node)| (name.to_string(), node.clone()))
            .collect();
        let resources = section_entries(&root, "Resources")
            .map(|(name, node)| (name.to_string(), Resource::from_node(name, node)))
            .collect();
        let outputs = section_entries(&root, "Outputs")
            .map(|(name, node)| (name.to_string(), Output::from_node(name, node)))
            .collect();
        let metadata = decode_map(root.get("Metadata"));

        Ok(Self {
            raw: root,
            format_version,
            description,
            transform,
            parameters,
            mappings,
            conditions,
            resources,
            outputs,
            metadata,
        })
    }

    /// Whether a logical id is declared under `Resources`.
    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    /// Iterate resources of one type, in logical-id order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .values()
            .filter(move |resource| resource.resource_type == resource_type)
    }

    /// Whether the `Transform` section names the given transform.
    pub fn has_transform(&self, needle: &str) -> bool {
        self.transform.iter().any(|t| t.contains(needle))
    }

    /// The resource of `resource_type` that a `Ref` or `Fn::GetAtt` value
    /// points at.
    pub fn referenced_resource(&self, value: &Value, resource_type: &str) -> Option<&Resource> {
        let name = referenced_name(value)?;
        self.resources
            .get(&name)
            .filter(|resource| resource.resource_type == resource_type)
    }

    /// The node of a top-level section, if declared.
    pub fn section(&self, name: &str) -> Option<&Node> {
        self.raw.get(name)
    }
}

impl Parameter {
    fn from_node(name: &str, node: &Node) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: node
                .get("Type")
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string(),
            default: node.get("Default").map(Node::to_value),
            allowed_values: node
                .get("AllowedValues")
                .and_then(|n| n.as_sequence())
                .map(|items| items.iter().map(Node::to_value).collect())
                .unwrap_or_default(),
            node: node.clone(),
        }
    }
}

impl Output {
    fn from_node(name: &str, node: &Node) -> Self {
        Self {
            name: name.to_string(),
            value: node.get("Value").map(Node::to_value),
            condition: node
                .get("Condition")
                .and_then(|n| n.as_str())
                .map(str::to_string),
            node: node.clone(),
        }
    }
}

impl Resource {
    fn from_node(logical_id: &str, node: &Node) -> Self {
        let resource_type = node
            .get("Type")
            .and_then(|n| n.as_str())
            .unwrap_or_default()
            .to_string();

        let properties = decode_map(node.get("Properties"));

        let depends_on = match node.get("DependsOn") {
            Some(dep) => match dep.as_sequence() {
                Some(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                None => dep.as_str().map(|s| vec![s.to_string()]).unwrap_or_default(),
            },
            None => Vec::new(),
        };

        let condition = node
            .get("Condition")
            .and_then(|n| n.as_str())
            .map(str::to_string);

        Self {
            logical_id: logical_id.to_string(),
            resource_type,
            properties,
            depends_on,
            condition,
            metadata: decode_map(node.get("Metadata")),
            node: node.clone(),
        }
    }

    /// The node of a resource attribute such as `UpdatePolicy` or `Properties`.
    pub fn attribute_node(&self, attribute: &str) -> Option<&Node> {
        self.node.get(attribute)
    }

    /// Whether `Properties` is present and is a mapping.
    pub fn has_properties_mapping(&self) -> bool {
        self.attribute_node("Properties")
            .map(Node::is_mapping)
            .unwrap_or(false)
    }

    /// Decoded property value by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// String property by name; intrinsics and other shapes yield `None`.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Find the most precise node for a path below the resource.
    ///
    /// `path` is relative to the resource entry, for example
    /// `["Properties", "Tags", "0", "Key"]`.
    pub fn locate<S: AsRef<str>>(&self, path: &[S]) -> &Node {
        self.node.locate(path)
    }

    /// The breadcrumb path of this resource inside the template.
    pub fn path(&self) -> Vec<String> {
        vec!["Resources".to_string(), self.logical_id.clone()]
    }

    /// The breadcrumb path of one of this resource's properties.
    pub fn property_path<S: AsRef<str>>(&self, rest: &[S]) -> Vec<String> {
        let mut path = self.path();
        path.push("Properties".to_string());
        path.extend(rest.iter().map(|s| s.as_ref().to_string()));
        path
    }

    /// Whether the resource's `cfn-lint` metadata asks to ignore a rule.
    pub fn ignores_check(&self, rule_id: &str) -> bool {
        ignored_checks(&self.metadata)
            .iter()
            .any(|id| rule_id.starts_with(id.as_str()))
    }
}

/// Rule ids listed under `Metadata.cfn-lint.config.ignore_checks`.
pub fn ignored_checks(metadata: &BTreeMap<String, Value>) -> Vec<String> {
    metadata
        .get("cfn-lint")
        .and_then(|v| v.get("config"))
        .and_then(|v| v.get("ignore_checks"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn section_entries<'a>(root: &'a Node, section: &str) -> impl Iterator<Item = (&'a str, &'a Node)> {
    root.get(section)
        .into_iter()
        .flat_map(|node| node.entries())
        .map(|(name, _, value)| (name, value))
}

fn decode_map(node: Option<&Node>) -> BTreeMap<String, Value> {
    match node.map(Node::to_value) {
        Some(Value::Object(map)) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}
