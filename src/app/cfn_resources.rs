//! # CloudFormation Resource Specification Service
//!
//! Read-only query surface over the resource-type specification the linter
//! ships with. Three JSON documents are compiled into the binary and decoded
//! once, on first use, into the process-wide [`SCHEMA`]:
//!
//! * `CloudFormationResourceSpecification.json` - resource types, property
//!   types, primitive/complex type tags, required markers
//! * `constraints.json` - per-property value constraints (length, range,
//!   pattern, item counts, uniqueness) plus per-type read-only properties
//!   and `anyOf` groups
//! * `enums.json` - enumerated allowed values keyed by service
//!
//! ## Query model
//!
//! Unknown resource types and unknown properties are answered with `None`
//! or `false`, never with an error. Callers that depend on the schema skip
//! resources whose type is not known.
//!
//! ```text
//! ResourceTypes["AWS::S3::Bucket"].Properties["VersioningConfiguration"]
//!        └── Type: VersioningConfiguration
//!              └── PropertyTypes["AWS::S3::Bucket.VersioningConfiguration"]
//!                    └── Properties["Status"] (PrimitiveType: String)
//! ```
//!
//! ## Thread Safety
//!
//! [`Schema`] holds plain owned maps and is immutable after construction, so
//! it is `Send + Sync` and the shared instance can be read from any thread.

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, error};

const SPECIFICATION_JSON: &str = include_str!("../../data/CloudFormationResourceSpecification.json");
const CONSTRAINTS_JSON: &str = include_str!("../../data/constraints.json");
const ENUMS_JSON: &str = include_str!("../../data/enums.json");

/// Errors raised while decoding schema documents.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to decode {document}: {source}")]
    Decode {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The process-wide schema built from the embedded documents.
///
/// A decode failure is logged and leaves an empty schema, which makes every
/// schema-dependent rule skip its resources rather than abort the run.
pub static SCHEMA: Lazy<Schema> = Lazy::new(|| match Schema::embedded() {
    Ok(schema) => {
        debug!(
            "Loaded resource specification with {} resource types and {} property types",
            schema.resource_types.len(),
            schema.property_types.len()
        );
        schema
    }
    Err(e) => {
        error!("Failed to load embedded resource specification: {}", e);
        Schema::default()
    }
});

/// Shortcut for `&*SCHEMA`.
pub fn schema() -> &'static Schema {
    &SCHEMA
}

/// CloudFormation primitive type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PrimitiveType {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Timestamp,
    Json,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::String => "String",
            PrimitiveType::Integer => "Integer",
            PrimitiveType::Long => "Long",
            PrimitiveType::Double => "Double",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Timestamp => "Timestamp",
            PrimitiveType::Json => "Json",
        };
        f.write_str(name)
    }
}

impl PrimitiveType {
    /// Whether a decoded scalar is acceptable for this primitive type.
    ///
    /// Integers pass `Double`; `Integer` and `Long` take floats whose
    /// fractional part is zero. Numeric and boolean strings are accepted
    /// where CloudFormation converts them, and any scalar passes `String`.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            PrimitiveType::String | PrimitiveType::Timestamp => {
                matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
            }
            PrimitiveType::Integer | PrimitiveType::Long => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
                }
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            PrimitiveType::Double => match value {
                Value::Number(_) => true,
                Value::String(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            },
            PrimitiveType::Boolean => match value {
                Value::Bool(_) => true,
                Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "false"),
                _ => false,
            },
            PrimitiveType::Json => matches!(value, Value::Object(_) | Value::String(_)),
        }
    }
}

/// Definition of a CloudFormation resource property.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyDefinition {
    #[serde(default)]
    pub documentation: String,
    /// Whether this property must be specified
    #[serde(default)]
    pub required: bool,
    pub primitive_type: Option<PrimitiveType>,
    /// `List`, `Map` or the name of a property type
    #[serde(rename = "Type")]
    pub type_name: Option<String>,
    /// Named property type of list/map items
    pub item_type: Option<String>,
    pub primitive_item_type: Option<PrimitiveType>,
    #[serde(default = "default_update_type")]
    pub update_type: String,
}

fn default_update_type() -> String {
    "Mutable".to_string()
}

impl PropertyDefinition {
    pub fn is_list(&self) -> bool {
        self.type_name.as_deref() == Some("List")
    }

    pub fn is_map(&self) -> bool {
        self.type_name.as_deref() == Some("Map")
    }

    /// Named sub-type for an object property, or for list/map items.
    pub fn sub_type(&self) -> Option<&str> {
        match self.type_name.as_deref() {
            Some("List") | Some("Map") => self.item_type.as_deref(),
            other => other,
        }
    }
}

/// Definition of a CloudFormation resource attribute (`Fn::GetAtt` target).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub primitive_type: Option<PrimitiveType>,
    #[serde(rename = "Type")]
    pub type_name: Option<String>,
}

/// A resource type or a named property type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceDefinition {
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinition>,
}

/// Value constraints attached to one property.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConstraints {
    /// Regular expression pattern that must be matched
    pub pattern: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    #[serde(rename = "minimum")]
    pub min_value: Option<f64>,
    #[serde(rename = "maximum")]
    pub max_value: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    /// Whether array items must be unique
    #[serde(default)]
    pub unique_items: bool,
}

/// Constraints that apply to a resource or property type as a whole.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConstraints {
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaConstraints>,
    #[serde(default)]
    pub read_only_properties: Vec<String>,
    /// Each group needs at least one of its properties present
    #[serde(default)]
    pub any_of: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ServiceEnums {
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    enums: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SpecificationDocument {
    #[serde(default)]
    resource_types: HashMap<String, ResourceDefinition>,
    #[serde(default)]
    property_types: HashMap<String, ResourceDefinition>,
}

/// The decoded resource specification.
#[derive(Debug, Default)]
pub struct Schema {
    resource_types: HashMap<String, ResourceDefinition>,
    property_types: HashMap<String, ResourceDefinition>,
    constraints: HashMap<String, ResourceConstraints>,
    enums: HashMap<String, ServiceEnums>,
}

impl Schema {
    /// Decode the documents compiled into the crate.
    pub fn embedded() -> Result<Self, SchemaError> {
        Self::from_documents(SPECIFICATION_JSON, CONSTRAINTS_JSON, ENUMS_JSON)
    }

    /// Build a schema from the three JSON documents.
    pub fn from_documents(
        specification: &str,
        constraints: &str,
        enums: &str,
    ) -> Result<Self, SchemaError> {
        let spec: SpecificationDocument =
            serde_json::from_str(specification).map_err(|source| SchemaError::Decode {
                document: "resource specification",
                source,
            })?;
        let constraints: HashMap<String, ResourceConstraints> = serde_json::from_str(constraints)
            .map_err(|source| SchemaError::Decode {
                document: "constraints",
                source,
            })?;
        let enums: HashMap<String, ServiceEnums> =
            serde_json::from_str(enums).map_err(|source| SchemaError::Decode {
                document: "enums",
                source,
            })?;

        Ok(Self {
            resource_types: spec.resource_types,
            property_types: spec.property_types,
            constraints,
            enums,
        })
    }

    pub fn has_resource_type(&self, resource_type: &str) -> bool {
        self.resource_types.contains_key(resource_type)
    }

    pub fn get_resource_type(&self, resource_type: &str) -> Option<&ResourceDefinition> {
        self.resource_types.get(resource_type)
    }

    /// All known resource type names, sorted.
    pub fn resource_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resource_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_property(&self, resource_type: &str, name: &str) -> bool {
        self.get_property(resource_type, name).is_some()
    }

    pub fn get_property(&self, resource_type: &str, name: &str) -> Option<&PropertyDefinition> {
        self.resource_types.get(resource_type)?.properties.get(name)
    }

    /// Resolve a named sub-type used by a property of `resource_type`.
    ///
    /// Returns the fully-qualified key (`R.T` or the shared `T`) along with
    /// the definition so constraint lookups can use the same key.
    pub fn resolve_property_type(
        &self,
        resource_type: &str,
        type_name: &str,
    ) -> Option<(String, &ResourceDefinition)> {
        let owner = resource_type.split('.').next().unwrap_or(resource_type);
        let qualified = format!("{}.{}", owner, type_name);
        if let Some(definition) = self.property_types.get(&qualified) {
            return Some((qualified, definition));
        }
        self.property_types
            .get(type_name)
            .map(|definition| (type_name.to_string(), definition))
    }

    /// Properties of a resource type or of a resolved property type key.
    pub fn properties_of(&self, owner: &str) -> Option<&BTreeMap<String, PropertyDefinition>> {
        self.resource_types
            .get(owner)
            .or_else(|| self.property_types.get(owner))
            .map(|definition| &definition.properties)
    }

    pub fn has_attribute(&self, resource_type: &str, attribute: &str) -> bool {
        self.resource_types
            .get(resource_type)
            .map(|definition| definition.attributes.contains_key(attribute))
            .unwrap_or(false)
    }

    /// Constraints for a property of a resource type or property type key.
    pub fn get_property_constraints(&self, owner: &str, name: &str) -> Option<&SchemaConstraints> {
        self.constraints.get(owner)?.properties.get(name)
    }

    pub fn get_resource_constraints(&self, resource_type: &str) -> Option<&ResourceConstraints> {
        self.constraints.get(resource_type)
    }

    /// The enum name governing a property name within a service.
    pub fn enum_for_property(&self, service: &str, name: &str) -> Option<&str> {
        self.enums
            .get(service)?
            .properties
            .get(name)
            .map(String::as_str)
    }

    pub fn allowed_values(&self, service: &str, enum_name: &str) -> &[String] {
        self.enums
            .get(service)
            .and_then(|service| service.enums.get(enum_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_valid_value(&self, service: &str, enum_name: &str, value: &str) -> bool {
        self.allowed_values(service, enum_name)
            .iter()
            .any(|allowed| allowed == value)
    }
}

/// The lowercase service segment of a resource type.
///
/// `AWS::Lambda::Function` → `lambda`. Types without a service segment
/// yield an empty string.
pub fn service_of(resource_type: &str) -> String {
    resource_type
        .split("::")
        .nth(1)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPEC: &str = r#"{
        "ResourceTypes": {
            "AWS::Test::Thing": {
                "Attributes": {"Arn": {"PrimitiveType": "String"}},
                "Properties": {
                    "Name": {"PrimitiveType": "String", "Required": true},
                    "Config": {"Type": "Config"},
                    "Tags": {"Type": "List", "ItemType": "Tag"}
                }
            }
        },
        "PropertyTypes": {
            "AWS::Test::Thing.Config": {
                "Properties": {"Size": {"PrimitiveType": "Integer"}}
            },
            "Tag": {
                "Properties": {
                    "Key": {"PrimitiveType": "String", "Required": true},
                    "Value": {"PrimitiveType": "String", "Required": true}
                }
            }
        }
    }"#;

    const CONSTRAINTS: &str = r#"{
        "AWS::Test::Thing": {
            "properties": {"Name": {"minLength": 3, "pattern": "^[a-z]+$"}},
            "readOnlyProperties": ["Arn"],
            "anyOf": [["Name", "Config"]]
        }
    }"#;

    const ENUMS: &str = r#"{
        "test": {
            "properties": {"Mode": "ThingMode"},
            "enums": {"ThingMode": ["ON", "OFF"]}
        }
    }"#;

    fn test_schema() -> Schema {
        Schema::from_documents(SPEC, CONSTRAINTS, ENUMS).unwrap()
    }

    #[test]
    fn test_resource_and_property_lookup() {
        let schema = test_schema();
        assert!(schema.has_resource_type("AWS::Test::Thing"));
        assert!(!schema.has_resource_type("AWS::Test::Other"));
        assert!(schema.get_property("AWS::Test::Thing", "Name").unwrap().required);
        assert!(!schema.has_property("AWS::Test::Thing", "Bogus"));
        assert!(schema.has_attribute("AWS::Test::Thing", "Arn"));
    }

    #[test]
    fn test_sub_type_resolution_prefers_qualified_name() {
        let schema = test_schema();
        let (key, config) = schema
            .resolve_property_type("AWS::Test::Thing", "Config")
            .unwrap();
        assert_eq!(key, "AWS::Test::Thing.Config");
        assert!(config.properties.contains_key("Size"));

        let (key, _) = schema.resolve_property_type("AWS::Test::Thing", "Tag").unwrap();
        assert_eq!(key, "Tag");
    }

    #[test]
    fn test_constraints_and_enums() {
        let schema = test_schema();
        let constraints = schema
            .get_property_constraints("AWS::Test::Thing", "Name")
            .unwrap();
        assert_eq!(constraints.min_length, Some(3));
        assert_eq!(constraints.pattern.as_deref(), Some("^[a-z]+$"));

        let resource = schema.get_resource_constraints("AWS::Test::Thing").unwrap();
        assert_eq!(resource.read_only_properties, vec!["Arn"]);
        assert_eq!(resource.any_of, vec![vec!["Name", "Config"]]);

        assert_eq!(schema.enum_for_property("test", "Mode"), Some("ThingMode"));
        assert!(schema.is_valid_value("test", "ThingMode", "ON"));
        assert!(!schema.is_valid_value("test", "ThingMode", "MAYBE"));
        assert!(schema.allowed_values("nope", "ThingMode").is_empty());
    }

    #[test]
    fn test_primitive_type_acceptance() {
        assert!(PrimitiveType::Double.accepts(&json!(3)));
        assert!(PrimitiveType::Integer.accepts(&json!(3.0)));
        assert!(!PrimitiveType::Integer.accepts(&json!(3.5)));
        assert!(PrimitiveType::Long.accepts(&json!("42")));
        assert!(!PrimitiveType::Integer.accepts(&json!("forty")));
        assert!(PrimitiveType::Boolean.accepts(&json!("True")));
        assert!(!PrimitiveType::Boolean.accepts(&json!(1)));
        assert!(PrimitiveType::String.accepts(&json!(8080)));
        assert!(!PrimitiveType::String.accepts(&json!(["a"])));
        assert!(PrimitiveType::Json.accepts(&json!({"a": 1})));
    }

    #[test]
    fn test_service_of() {
        assert_eq!(service_of("AWS::Lambda::Function"), "lambda");
        assert_eq!(
            service_of("AWS::ElasticLoadBalancingV2::Listener"),
            "elasticloadbalancingv2"
        );
        assert_eq!(service_of("Bogus"), "");
    }

    #[test]
    fn test_embedded_schema_decodes() {
        let schema = Schema::embedded().unwrap();
        assert!(schema.has_resource_type("AWS::S3::Bucket"));
        assert!(schema.has_resource_type("AWS::Lambda::Function"));
        assert!(schema.get_property("AWS::Lambda::Function", "Code").unwrap().required);
        assert!(schema.enum_for_property("lambda", "Runtime").is_some());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(matches!(
            Schema::from_documents("{", "{}", "{}"),
            Err(SchemaError::Decode { document: "resource specification", .. })
        ));
    }
}
