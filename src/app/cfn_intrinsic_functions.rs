//! CloudFormation intrinsic function detection and reference extraction.
//!
//! Decoded property values keep intrinsic functions as single-key objects
//! (`{"Ref": "X"}`, `{"Fn::GetAtt": ["A", "B"]}`). Static checks cannot know
//! what such values evaluate to, so every value-level rule asks
//! [`is_intrinsic`] first and skips anything deployment-time substitution
//! would change. Reference-integrity rules use [`collect_references`] to
//! find the logical names a value points at.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// The intrinsic functions a template may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicFunctionType {
    /// `{"Ref": "Name"}` or `!Ref Name`
    Ref,
    /// `{"Condition": "Name"}` inside condition functions
    Condition,
    /// `{"Fn::GetAtt": ["Resource", "Attribute"]}` or `!GetAtt Resource.Attribute`
    GetAtt,
    /// `{"Fn::Sub": "text ${var}"}`
    Sub,
    Join,
    Select,
    Split,
    Base64,
    FindInMap,
    ImportValue,
    GetAZs,
    Cidr,
    Length,
    ToJsonString,
    Transform,
    If,
    And,
    Or,
    Not,
    Equals,
    ForEach,
    /// Any other `Fn::` key; newer functions are still opaque to static checks.
    Other,
}

impl IntrinsicFunctionType {
    /// Classify an object key.
    pub fn from_key(key: &str) -> Option<Self> {
        let kind = match key {
            "Ref" => Self::Ref,
            "Condition" => Self::Condition,
            "Fn::GetAtt" => Self::GetAtt,
            "Fn::Sub" => Self::Sub,
            "Fn::Join" => Self::Join,
            "Fn::Select" => Self::Select,
            "Fn::Split" => Self::Split,
            "Fn::Base64" => Self::Base64,
            "Fn::FindInMap" => Self::FindInMap,
            "Fn::ImportValue" => Self::ImportValue,
            "Fn::GetAZs" => Self::GetAZs,
            "Fn::Cidr" => Self::Cidr,
            "Fn::Length" => Self::Length,
            "Fn::ToJsonString" => Self::ToJsonString,
            "Fn::Transform" => Self::Transform,
            "Fn::If" => Self::If,
            "Fn::And" => Self::And,
            "Fn::Or" => Self::Or,
            "Fn::Not" => Self::Not,
            "Fn::Equals" => Self::Equals,
            other if other.starts_with("Fn::ForEach") => Self::ForEach,
            other if other.starts_with("Fn::") => Self::Other,
            _ => return None,
        };
        Some(kind)
    }
}

/// Detect which intrinsic function a value is, if any.
///
/// A value is an intrinsic when it is an object whose first key is `Ref`,
/// `Condition` or starts with `Fn::`. Objects with several keys are still
/// classified by their first key.
pub fn detect_intrinsic_function(value: &Value) -> Option<IntrinsicFunctionType> {
    let map = value.as_object()?;
    let (key, _) = map.iter().next()?;
    if map.len() == 1 {
        return IntrinsicFunctionType::from_key(key);
    }
    // Multi-key objects only count when a function key leads. `Condition`
    // is a plain property name on several resource types.
    match IntrinsicFunctionType::from_key(key) {
        Some(IntrinsicFunctionType::Condition) | None => None,
        Some(kind) => Some(kind),
    }
}

/// Returns `true` if the value is an intrinsic function call.
pub fn is_intrinsic(value: &Value) -> bool {
    detect_intrinsic_function(value).is_some()
}

/// The target of a bare `{"Ref": name}`.
pub fn ref_target(value: &Value) -> Option<&str> {
    let map = value.as_object().filter(|map| map.len() == 1)?;
    map.get("Ref")?.as_str()
}

/// The logical id named by a `Ref` or `Fn::GetAtt` value.
pub fn referenced_name(value: &Value) -> Option<String> {
    if let Some(target) = ref_target(value) {
        return Some(target.to_string());
    }
    let map = value.as_object().filter(|map| map.len() == 1)?;
    getatt_parts(map.get("Fn::GetAtt")?).map(|(target, _)| target)
}

/// `!Ref AWS::NoValue`, which removes the property it is assigned to.
pub fn is_no_value(value: &Value) -> bool {
    ref_target(value) == Some("AWS::NoValue")
}

/// Returns `true` if an intrinsic appears anywhere inside the value.
pub fn contains_intrinsic(value: &Value) -> bool {
    if is_intrinsic(value) {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(contains_intrinsic),
        Value::Object(map) => map.values().any(contains_intrinsic),
        _ => false,
    }
}

/// How a value refers to another template entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Ref,
    GetAtt,
    Sub,
}

/// A logical name referenced by a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Logical id (or parameter / pseudo parameter name).
    pub target: String,
    /// Attribute name for `Fn::GetAtt` and dotted `${A.B}` substitutions.
    pub attribute: Option<String>,
    /// Breadcrumb from the value root to the intrinsic object.
    pub path: Vec<String>,
}

static SUB_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^!}][^}]*)\}").expect("valid substitution regex"));

/// Extract every `${...}` variable from a `Fn::Sub` template string.
///
/// `${!Literal}` escapes are skipped, and surrounding whitespace is trimmed.
pub fn sub_variables(text: &str) -> Vec<String> {
    SUB_VARIABLE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Collect `Ref`, `Fn::GetAtt` and `Fn::Sub` references in a value.
///
/// References are returned in document order. `Fn::Sub` variables that
/// are bound by the function's own variable map are not references.
pub fn collect_references(value: &Value) -> Vec<Reference> {
    let mut references = Vec::new();
    let mut path = Vec::new();
    walk_references(value, &mut path, &mut references);
    references
}

fn walk_references(value: &Value, path: &mut Vec<String>, out: &mut Vec<Reference>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some((key, arg)) = map.iter().next() {
                    match key.as_str() {
                        "Ref" => {
                            if let Some(target) = arg.as_str() {
                                out.push(Reference {
                                    kind: ReferenceKind::Ref,
                                    target: target.to_string(),
                                    attribute: None,
                                    path: path.clone(),
                                });
                            }
                            return;
                        }
                        "Fn::GetAtt" => {
                            if let Some((target, attribute)) = getatt_parts(arg) {
                                out.push(Reference {
                                    kind: ReferenceKind::GetAtt,
                                    target,
                                    attribute,
                                    path: path.clone(),
                                });
                            }
                            return;
                        }
                        "Fn::Sub" => {
                            sub_references(arg, path, out);
                            return;
                        }
                        _ => {}
                    }
                }
            }
            for (key, child) in map {
                path.push(key.clone());
                walk_references(child, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                walk_references(item, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Split a `Fn::GetAtt` argument into target and attribute.
///
/// Accepts the list form `[A, B]` and the dotted string form `A.B`. A
/// non-string attribute (for example a nested `Ref`) yields `None` for the
/// attribute.
pub fn getatt_parts(arg: &Value) -> Option<(String, Option<String>)> {
    match arg {
        Value::Array(items) => {
            let target = items.first()?.as_str()?.to_string();
            let attribute = items.get(1).and_then(Value::as_str).map(str::to_string);
            Some((target, attribute))
        }
        Value::String(text) => {
            let (target, attribute) = match text.split_once('.') {
                Some((t, a)) => (t, Some(a.to_string())),
                None => (text.as_str(), None),
            };
            Some((target.to_string(), attribute))
        }
        _ => None,
    }
}

fn sub_references(arg: &Value, path: &mut Vec<String>, out: &mut Vec<Reference>) {
    let (text, bindings) = match arg {
        Value::String(text) => (text.as_str(), None),
        Value::Array(items) => match items.first().and_then(Value::as_str) {
            Some(text) => (text, items.get(1).and_then(Value::as_object)),
            None => return,
        },
        _ => return,
    };

    path.push("Fn::Sub".to_string());
    for variable in sub_variables(text) {
        if bindings.map(|b| b.contains_key(&variable)).unwrap_or(false) {
            continue;
        }
        let (target, attribute) = match variable.split_once('.') {
            Some((target, attribute)) => (target.to_string(), Some(attribute.to_string())),
            None => (variable, None),
        };
        out.push(Reference {
            kind: ReferenceKind::Sub,
            target,
            attribute,
            path: path.clone(),
        });
    }
    if let Some(bindings) = bindings {
        path.push("1".to_string());
        for (name, bound) in bindings {
            path.push(name.clone());
            walk_references(bound, path, out);
            path.pop();
        }
        path.pop();
    }
    path.pop();
}
