//! Schema constraint rules.
//!
//! Every rule here reads the embedded schema, so resources whose type the
//! schema does not know are skipped. Values that are intrinsic functions are
//! opaque and never diagnosed; the walker stops at them and each rule checks
//! list items again before inspecting them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use crate::app::cfn_intrinsic_functions::is_intrinsic;
use crate::app::cfn_resources::{service_of, PrimitiveType, PropertyDefinition, SchemaConstraints};
use crate::app::cfn_template::Resource;
use crate::app::predicates::to_f64;

use super::walk::{walk_objects, walk_properties, PropertyVisit};
use super::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(UnknownProperties),
        Box::new(RequiredProperties),
        Box::new(PrimitiveTypes),
        Box::new(AnyOfGroups),
        Box::new(OneOfGroups),
        Box::new(EnumeratedValues),
        Box::new(Patterns),
        Box::new(ArrayLengths),
        Box::new(StringLengths),
        Box::new(NumericRanges),
        Box::new(UniqueItems),
        Box::new(ReadOnlyProperties),
    ]
}

// Resources whose Properties entry exists but could not be read as a mapping
// are left to E3002.
fn walkable(resource: &Resource) -> bool {
    resource.attribute_node("Properties").is_none() || resource.has_properties_mapping()
}

/// Property values of known resources that carry schema constraints.
fn constrained<'a>(
    cx: &RuleContext<'a>,
) -> Vec<(&'a Resource, PropertyVisit<'a>, &'a SchemaConstraints)> {
    let schema = cx.schema;
    cx.known_resources()
        .flat_map(|resource| {
            walk_properties(schema, resource)
                .into_iter()
                .filter(|visit| !is_intrinsic(visit.value))
                .filter_map(move |visit| {
                    schema
                        .get_property_constraints(&visit.owner, visit.name)
                        .map(|constraints| (resource, visit, constraints))
                })
        })
        .collect()
}

fn with_index(path: &[String], index: usize) -> Vec<String> {
    let mut path = path.to_vec();
    path.push(index.to_string());
    path
}

// Number formatting for messages: `128` rather than `128.0`.
fn display_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// E1101: properties the schema does not declare.
pub struct UnknownProperties;

impl LintRule for UnknownProperties {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E1101",
            short_desc: "Validate an unknown property",
            description: "Making sure that resources properties are valid for the resource or property type",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-template-resource-type-ref.html",
            tags: &["resources", "properties"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources().filter(|r| walkable(r)) {
            for visit in walk_properties(cx.schema, resource) {
                if visit.definition.is_some() {
                    continue;
                }
                let mut breadcrumb = resource.property_path(&visit.path);
                breadcrumb.drain(..1);
                findings.push(Finding::on_property(
                    self.id(),
                    resource,
                    &visit.path,
                    format!("Invalid Property {}", breadcrumb.join("/")),
                ));
            }
        }
        findings
    }
}

/// E3003: required properties.
pub struct RequiredProperties;

impl LintRule for RequiredProperties {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3003",
            short_desc: "Required Resource properties are missing",
            description: "Making sure that Resources properties that are required exist",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-template-resource-type-ref.html",
            tags: &["resources", "properties", "required"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources().filter(|r| walkable(r)) {
            for object in walk_objects(cx.schema, resource) {
                let Some(properties) = cx.schema.properties_of(&object.owner) else {
                    continue;
                };
                for (name, definition) in properties {
                    if !definition.required || object.has(name) {
                        continue;
                    }
                    let location = if object.path.is_empty() {
                        String::new()
                    } else {
                        format!(" at {}", object.path.join("/"))
                    };
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &object.path,
                        format!(
                            "Property {} missing{} in resource {}",
                            name, location, resource.logical_id
                        ),
                    ));
                }
            }
        }
        findings
    }
}

/// E3012: primitive and structural type of each value.
pub struct PrimitiveTypes;

impl PrimitiveTypes {
    fn primitive_mismatch(expected: PrimitiveType, value: &Value) -> bool {
        if is_intrinsic(value) {
            return false;
        }
        !expected.accepts(value)
    }

    fn check_visit(&self, resource: &Resource, visit: &PropertyVisit<'_>, findings: &mut Vec<Finding>) {
        let Some(definition) = visit.definition else {
            return;
        };
        let value = visit.value;
        if is_intrinsic(value) {
            return;
        }
        let id = self.id();

        if let Some(expected) = definition.primitive_type {
            if Self::primitive_mismatch(expected, value) {
                findings.push(Finding::on_property(
                    id,
                    resource,
                    &visit.path,
                    format!("Property {} should be of type {}", visit.name, expected),
                ));
            }
            return;
        }

        if definition.is_list() {
            let Value::Array(items) = value else {
                findings.push(Finding::on_property(
                    id,
                    resource,
                    &visit.path,
                    format!("Property {} should be of type List", visit.name),
                ));
                return;
            };
            let items = items.iter().enumerate().map(|(i, v)| (i.to_string(), v));
            self.check_items(resource, visit, definition, items, findings);
            return;
        }

        if definition.is_map() {
            let Value::Object(map) = value else {
                findings.push(Finding::on_property(
                    id,
                    resource,
                    &visit.path,
                    format!("Property {} should be of type Map", visit.name),
                ));
                return;
            };
            let entries = map.iter().map(|(k, v)| (k.clone(), v));
            self.check_items(resource, visit, definition, entries, findings);
            return;
        }

        if definition.type_name.is_some() && !value.is_object() {
            findings.push(Finding::on_property(
                id,
                resource,
                &visit.path,
                format!("Property {} should be an object", visit.name),
            ));
        }
    }

    fn check_items<'v>(
        &self,
        resource: &Resource,
        visit: &PropertyVisit<'_>,
        definition: &PropertyDefinition,
        items: impl Iterator<Item = (String, &'v Value)>,
        findings: &mut Vec<Finding>,
    ) {
        for (key, item) in items {
            if is_intrinsic(item) {
                continue;
            }
            let mut path = visit.path.clone();
            path.push(key);
            let message = match definition.primitive_item_type {
                Some(expected) if Self::primitive_mismatch(expected, item) => format!(
                    "Property {} items should be of type {}",
                    visit.name, expected
                ),
                Some(_) => continue,
                None if definition.item_type.is_some() && !item.is_object() => {
                    format!("Property {} items should be objects", visit.name)
                }
                None => continue,
            };
            findings.push(Finding::on_property(self.id(), resource, &path, message));
        }
    }
}

impl LintRule for PrimitiveTypes {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3012",
            short_desc: "Check resource properties values",
            description: "Checks resource property values with Primitive Types for values that match those types",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#valueprimitivetype",
            tags: &["resources", "properties", "primitivetype"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources().filter(|r| walkable(r)) {
            for visit in walk_properties(cx.schema, resource) {
                self.check_visit(resource, &visit, &mut findings);
            }
        }
        findings
    }
}

/// E3017: at least one property of each `anyOf` group.
pub struct AnyOfGroups;

impl LintRule for AnyOfGroups {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3017",
            short_desc: "Check Properties that need at least one of a list of properties",
            description: "Making sure CloudFormation properties that require at least one property from a list have one",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#anyof",
            tags: &["resources", "properties", "anyof"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources().filter(|r| walkable(r)) {
            for object in walk_objects(cx.schema, resource) {
                let Some(constraints) = cx.schema.get_resource_constraints(&object.owner) else {
                    continue;
                };
                for group in &constraints.any_of {
                    if group.iter().any(|name| object.has(name)) {
                        continue;
                    }
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &object.path,
                        format!("At least one of [{}] should be specified", group.join(", ")),
                    ));
                }
            }
        }
        findings
    }
}

/// E3018: exactly one property of each group.
pub struct OneOfGroups;

impl OneOfGroups {
    /// Owner type key and the properties of which exactly one is set.
    const GROUPS: &'static [(&'static str, &'static [&'static str])] = &[
        (
            "AWS::EC2::SecurityGroup.Egress",
            &[
                "CidrIp",
                "CidrIpv6",
                "DestinationPrefixListId",
                "DestinationSecurityGroupId",
            ],
        ),
        (
            "AWS::EC2::SecurityGroup.Ingress",
            &[
                "CidrIp",
                "CidrIpv6",
                "SourcePrefixListId",
                "SourceSecurityGroupId",
                "SourceSecurityGroupName",
            ],
        ),
        (
            "AWS::EC2::SecurityGroupIngress",
            &[
                "CidrIp",
                "CidrIpv6",
                "SourcePrefixListId",
                "SourceSecurityGroupId",
                "SourceSecurityGroupName",
            ],
        ),
        ("AWS::Lambda::Function.Code", &["ImageUri", "S3Bucket", "ZipFile"]),
        ("AWS::Route53::RecordSet", &["HostedZoneId", "HostedZoneName"]),
    ];
}

impl LintRule for OneOfGroups {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3018",
            short_desc: "Check Properties that need only one of a list of properties",
            description: "Making sure CloudFormation properties that require exactly one property from a list have exactly one",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#oneof",
            tags: &["resources", "properties", "oneof"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources().filter(|r| walkable(r)) {
            for object in walk_objects(cx.schema, resource) {
                for (owner, group) in Self::GROUPS {
                    if object.owner != *owner {
                        continue;
                    }
                    let present = group.iter().filter(|name| object.has(name)).count();
                    if present == 1 {
                        continue;
                    }
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &object.path,
                        format!("Exactly one of [{}] should be specified", group.join(", ")),
                    ));
                }
            }
        }
        findings
    }
}

/// E3030: enumerated values.
pub struct EnumeratedValues;

impl EnumeratedValues {
    fn text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl LintRule for EnumeratedValues {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3030",
            short_desc: "Check if properties have a valid value",
            description: "Check if properties have a valid value in case of an enumerator",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#allowedvalue",
            tags: &["resources", "property", "allowed value"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources().filter(|r| walkable(r)) {
            let service = service_of(&resource.resource_type);
            for visit in walk_properties(cx.schema, resource) {
                if visit.definition.is_none() || is_intrinsic(visit.value) {
                    continue;
                }
                let Some(enum_name) = cx.schema.enum_for_property(&service, visit.name) else {
                    continue;
                };
                let allowed = cx.schema.allowed_values(&service, enum_name);
                if allowed.is_empty() {
                    continue;
                }

                let candidates: Vec<(Vec<String>, &Value)> = match visit.value {
                    Value::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| (with_index(&visit.path, index), item))
                        .collect(),
                    value => vec![(visit.path.clone(), value)],
                };
                for (path, value) in candidates {
                    let Some(text) = Self::text(value) else {
                        continue;
                    };
                    if allowed.iter().any(|a| *a == text) {
                        continue;
                    }
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &path,
                        format!(
                            "You must specify a valid value for {} ({}). Valid values are [{}]",
                            visit.name,
                            text,
                            allowed.join(", ")
                        ),
                    ));
                }
            }
        }
        findings
    }
}

static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Compiled form of a schema pattern, cached across runs. A pattern that
/// fails to compile is remembered as `None` and never matched against.
fn compiled(pattern: &str) -> Option<Regex> {
    let mut cache = PATTERN_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    cache
        .entry(pattern.to_string())
        .or_insert_with(|| match Regex::new(pattern) {
            Ok(regex) => {
                lint_trace!("Compiled schema pattern {}", pattern);
                Some(regex)
            }
            Err(e) => {
                lint_warn!("Skipping uncompilable schema pattern {}: {}", pattern, e);
                None
            }
        })
        .clone()
}

/// E3031: string patterns.
pub struct Patterns;

impl LintRule for Patterns {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3031",
            short_desc: "Check if property values adhere to a specific pattern",
            description: "Check if properties have a valid value in case of a pattern (Regular Expression)",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#allowedpattern",
            tags: &["resources", "property", "allowed pattern", "regex"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, visit, constraints) in constrained(cx) {
            let (Some(pattern), Value::String(text)) = (&constraints.pattern, visit.value) else {
                continue;
            };
            let Some(regex) = compiled(pattern) else {
                continue;
            };
            if !regex.is_match(text) {
                findings.push(Finding::on_property(
                    self.id(),
                    resource,
                    &visit.path,
                    format!(
                        "{} contains invalid characters (Pattern: {}) at {}",
                        text,
                        pattern,
                        visit.path.join("/")
                    ),
                ));
            }
        }
        findings
    }
}

/// E3032: number of list items.
pub struct ArrayLengths;

impl LintRule for ArrayLengths {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3032",
            short_desc: "Check if a list has between min and max number of values specified",
            description: "Check lists for the number of items in the list to validate they are between the minimum and maximum",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#allowedpattern",
            tags: &["resources", "property", "list", "size"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, visit, constraints) in constrained(cx) {
            let Value::Array(items) = visit.value else {
                continue;
            };
            let message = match (constraints.min_items, constraints.max_items) {
                (Some(min), _) if items.len() < min => format!(
                    "{} has {} items, fewer than the minimum of {}",
                    visit.name,
                    items.len(),
                    min
                ),
                (_, Some(max)) if items.len() > max => format!(
                    "{} has {} items, more than the maximum of {}",
                    visit.name,
                    items.len(),
                    max
                ),
                _ => continue,
            };
            findings.push(Finding::on_property(self.id(), resource, &visit.path, message));
        }
        findings
    }
}

/// E3033: string length.
pub struct StringLengths;

impl LintRule for StringLengths {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3033",
            short_desc: "Check if a string has between min and max number of values specified",
            description: "Check strings for its length between the minimum and maximum",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#allowedpattern",
            tags: &["resources", "property", "string", "size"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, visit, constraints) in constrained(cx) {
            let Value::String(text) = visit.value else {
                continue;
            };
            let length = text.chars().count();
            let message = match (constraints.min_length, constraints.max_length) {
                (Some(min), _) if length < min => format!(
                    "{} is shorter than {} at {}",
                    visit.name,
                    min,
                    visit.path.join("/")
                ),
                (_, Some(max)) if length > max => format!(
                    "{} is longer than {} at {}",
                    visit.name,
                    max,
                    visit.path.join("/")
                ),
                _ => continue,
            };
            findings.push(Finding::on_property(self.id(), resource, &visit.path, message));
        }
        findings
    }
}

/// E3034: numeric range.
pub struct NumericRanges;

impl LintRule for NumericRanges {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3034",
            short_desc: "Check if a number is between min and max",
            description: "Check numbers (integers and floats) for their value being between the minimum and maximum",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#allowedpattern",
            tags: &["resources", "property", "number", "size"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, visit, constraints) in constrained(cx) {
            if constraints.min_value.is_none() && constraints.max_value.is_none() {
                continue;
            }
            let Some(number) = to_f64(visit.value) else {
                continue;
            };
            let out_of_range = constraints.min_value.map_or(false, |min| number < min)
                || constraints.max_value.map_or(false, |max| number > max);
            if !out_of_range {
                continue;
            }
            let bound = |b: Option<f64>| b.map(display_number).unwrap_or_else(|| "-".to_string());
            findings.push(Finding::on_property(
                self.id(),
                resource,
                &visit.path,
                format!(
                    "{} has to be between {} and {}, found {}",
                    visit.name,
                    bound(constraints.min_value),
                    bound(constraints.max_value),
                    display_number(number)
                ),
            ));
        }
        findings
    }
}

/// E3037: duplicate list items.
pub struct UniqueItems;

impl LintRule for UniqueItems {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3037",
            short_desc: "Check if a list has duplicate values",
            description: "Certain lists don't support duplicate items. Check when duplicates are provided but not supported.",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#allowedvalue",
            tags: &["resources", "property", "list"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, visit, constraints) in constrained(cx) {
            if !constraints.unique_items {
                continue;
            }
            let Value::Array(items) = visit.value else {
                continue;
            };
            let mut seen = BTreeSet::new();
            for (index, item) in items.iter().enumerate() {
                if is_intrinsic(item) {
                    continue;
                }
                // Map keys are sorted, so the encoding is canonical.
                let Ok(key) = serde_json::to_string(item) else {
                    continue;
                };
                if !seen.insert(key.clone()) {
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &with_index(&visit.path, index),
                        format!("{} has duplicate item {}", visit.name, key),
                    ));
                }
            }
        }
        findings
    }
}

/// E3040: read-only properties.
pub struct ReadOnlyProperties;

impl LintRule for ReadOnlyProperties {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3040",
            short_desc: "Validate we aren't configuring read only properties",
            description: "Read only properties can be configured in a CloudFormation template but they aren't sent to the resource provider code and can cause drift.",
            source_url: "https://docs.aws.amazon.com/cloudformation-cli/latest/userguide/resource-type-schema.html#schema-properties-readonlyproperties",
            tags: &["resources", "properties", "readOnlyProperties"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources() {
            let Some(constraints) = cx.schema.get_resource_constraints(&resource.resource_type) else {
                continue;
            };
            for name in &constraints.read_only_properties {
                if resource.properties.contains_key(name) {
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &[name],
                        format!("{} is a read only property", name),
                    ));
                }
            }
        }
        findings
    }
}
