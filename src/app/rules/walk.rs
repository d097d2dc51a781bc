//! Schema-guided traversal of resource properties.
//!
//! The walker starts at a resource's `Properties` and descends through named
//! property types, list items and map values, resolving each sub-type
//! through the schema. It stops at intrinsic functions and at values whose
//! sub-type the schema does not know.

use serde_json::Value;

use crate::app::cfn_intrinsic_functions::is_intrinsic;
use crate::app::cfn_resources::{PropertyDefinition, Schema};
use crate::app::cfn_template::Resource;

/// One object whose keys are properties of a known owner type.
#[derive(Debug, Clone)]
pub struct ObjectVisit<'a> {
    /// Resource type or property type key (`AWS::S3::Bucket.Rule`, `Tag`)
    pub owner: String,
    /// Path of the object relative to `Properties`
    pub path: Vec<String>,
    pub entries: Vec<(&'a str, &'a Value)>,
}

impl<'a> ObjectVisit<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Path of one property of this object.
    pub fn child_path(&self, name: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(name.to_string());
        path
    }
}

/// One property value together with its schema definition.
#[derive(Debug, Clone)]
pub struct PropertyVisit<'a> {
    pub owner: String,
    pub name: &'a str,
    /// `None` when the owner type does not declare this property
    pub definition: Option<&'a PropertyDefinition>,
    pub value: &'a Value,
    /// Path of the value relative to `Properties`
    pub path: Vec<String>,
}

/// Every object reachable from the resource's properties, outermost first.
///
/// Empty when the resource type is unknown to the schema.
pub fn walk_objects<'a>(schema: &'a Schema, resource: &'a Resource) -> Vec<ObjectVisit<'a>> {
    let mut out = Vec::new();
    if !schema.has_resource_type(&resource.resource_type) {
        return out;
    }
    let root = ObjectVisit {
        owner: resource.resource_type.clone(),
        path: Vec::new(),
        entries: resource
            .properties
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect(),
    };
    descend(schema, root, &mut out);
    out
}

/// Every property value reachable from the resource's properties.
pub fn walk_properties<'a>(schema: &'a Schema, resource: &'a Resource) -> Vec<PropertyVisit<'a>> {
    walk_objects(schema, resource)
        .into_iter()
        .flat_map(|object| {
            let properties = schema.properties_of(&object.owner);
            object
                .entries
                .iter()
                .map(|&(name, value)| PropertyVisit {
                    owner: object.owner.clone(),
                    name,
                    definition: properties.and_then(|p| p.get(name)),
                    value,
                    path: object.child_path(name),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn descend<'a>(schema: &'a Schema, object: ObjectVisit<'a>, out: &mut Vec<ObjectVisit<'a>>) {
    let Some(properties) = schema.properties_of(&object.owner) else {
        out.push(object);
        return;
    };

    let mut children = Vec::new();
    for &(name, value) in &object.entries {
        let Some(definition) = properties.get(name) else {
            continue;
        };
        if is_intrinsic(value) {
            continue;
        }
        let Some(sub_type) = definition.sub_type() else {
            continue;
        };
        let Some((key, _)) = schema.resolve_property_type(&object.owner, sub_type) else {
            continue;
        };
        let path = object.child_path(name);

        if definition.is_list() {
            if let Value::Array(items) = value {
                for (index, item) in items.iter().enumerate() {
                    let mut item_path = path.clone();
                    item_path.push(index.to_string());
                    if let Some(child) = object_visit(&key, item_path, item) {
                        children.push(child);
                    }
                }
            }
        } else if definition.is_map() {
            if let Value::Object(map) = value {
                for (entry, item) in map {
                    let mut item_path = path.clone();
                    item_path.push(entry.clone());
                    if let Some(child) = object_visit(&key, item_path, item) {
                        children.push(child);
                    }
                }
            }
        } else if let Some(child) = object_visit(&key, path, value) {
            children.push(child);
        }
    }

    out.push(object);
    for child in children {
        descend(schema, child, out);
    }
}

fn object_visit<'a>(owner: &str, path: Vec<String>, value: &'a Value) -> Option<ObjectVisit<'a>> {
    if is_intrinsic(value) {
        return None;
    }
    let map = value.as_object()?;
    Some(ObjectVisit {
        owner: owner.to_string(),
        path,
        entries: map.iter().map(|(key, value)| (key.as_str(), value)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cfn_template::Template;

    const SPEC: &str = r#"{
        "ResourceTypes": {
            "AWS::Test::Thing": {
                "Properties": {
                    "Name": {"PrimitiveType": "String"},
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
                    "Key": {"PrimitiveType": "String"},
                    "Value": {"PrimitiveType": "String"}
                }
            }
        }
    }"#;

    fn schema() -> Schema {
        Schema::from_documents(SPEC, "{}", "{}").unwrap()
    }

    #[test]
    fn test_walks_nested_types_and_lists() {
        let template = Template::parse(
            "Resources:
  T:
    Type: AWS::Test::Thing
    Properties:
      Name: n
      Config:
        Size: 3
        Extra: 1
      Tags:
        - Key: k
          Value: v
        - !Ref Tag
",
        )
        .unwrap();
        let schema = schema();
        let resource = &template.resources["T"];

        let objects = walk_objects(&schema, resource);
        let owners: Vec<&str> = objects.iter().map(|o| o.owner.as_str()).collect();
        assert_eq!(owners, vec!["AWS::Test::Thing", "AWS::Test::Thing.Config", "Tag"]);
        assert_eq!(objects[2].path, vec!["Tags", "0"]);

        let visits = walk_properties(&schema, resource);
        let paths: Vec<String> = visits.iter().map(|v| v.path.join(".")).collect();
        assert_eq!(
            paths,
            vec!["Config", "Name", "Tags", "Config.Extra", "Config.Size", "Tags.0.Key", "Tags.0.Value"]
        );
        let extra = visits.iter().find(|v| v.name == "Extra").unwrap();
        assert!(extra.definition.is_none());
    }

    #[test]
    fn test_unknown_type_yields_nothing() {
        let template =
            Template::parse("Resources:\n  X:\n    Type: Custom::Thing\n    Properties:\n      A: 1\n")
                .unwrap();
        assert!(walk_properties(&schema(), &template.resources["X"]).is_empty());
    }
}
