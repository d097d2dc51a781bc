//! Location-annotated template tree.
//!
//! Every node produced by the loader in [`crate::app::cfn_yaml`] carries the
//! 1-based line and column where it starts in the source document. The
//! template model keeps these nodes around so findings can point back at the
//! exact spot a problem was found, while rule predicates operate on decoded
//! [`serde_json::Value`] trees that carry no location at all.
//!
//! # Shape
//!
//! - [`NodeKind::Scalar`] - a raw string plus its decoded primitive
//! - [`NodeKind::Sequence`] - an ordered list of nodes
//! - [`NodeKind::Mapping`] - ordered key/value node pairs (keys are unique)
//! - [`NodeKind::Alias`] - a YAML alias, holding a copy of the anchored node

use serde_json::{Map, Number, Value};

/// The decoded primitive behind a scalar node.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// A scalar node: the text as written plus its decoded primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub raw: String,
    pub value: ScalarValue,
}

/// The tagged body of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Vec<(Node, Node)>),
    Alias(Box<Node>),
}

/// A node of the template document with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub line: usize,
    pub column: usize,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(line: usize, column: usize, kind: NodeKind) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
            kind,
        }
    }

    /// Build a string scalar at a position.
    pub fn string(line: usize, column: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(
            line,
            column,
            NodeKind::Scalar(Scalar {
                raw: text.clone(),
                value: ScalarValue::String(text),
            }),
        )
    }

    /// Follow aliases to the node that actually holds the content.
    pub fn resolved(&self) -> &Node {
        match &self.kind {
            NodeKind::Alias(target) => target.resolved(),
            _ => self,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.resolved().kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// The string value of a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self.as_scalar() {
            Some(Scalar {
                value: ScalarValue::String(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// The raw text of any scalar, whatever primitive it decoded to.
    pub fn scalar_text(&self) -> Option<&str> {
        self.as_scalar().map(|scalar| scalar.raw.as_str())
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.resolved().kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(Node, Node)]> {
        match &self.resolved().kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        self.as_mapping().is_some()
    }

    pub fn is_sequence(&self) -> bool {
        self.as_sequence().is_some()
    }

    pub fn is_scalar(&self) -> bool {
        self.as_scalar().is_some()
    }

    pub fn is_null(&self) -> bool {
        matches!(
            self.as_scalar(),
            Some(Scalar {
                value: ScalarValue::Null,
                ..
            })
        )
    }

    /// Look up a mapping entry by key, returning both the key and value nodes.
    pub fn get_entry(&self, key: &str) -> Option<(&Node, &Node)> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k.scalar_text() == Some(key))
            .map(|(k, v)| (k, v))
    }

    /// Look up a mapping value by key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.get_entry(key).map(|(_, value)| value)
    }

    /// Iterate a mapping as `(key text, key node, value node)`.
    ///
    /// Non-scalar keys are skipped; non-mappings yield nothing.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node, &Node)> {
        self.as_mapping()
            .unwrap_or(&[])
            .iter()
            .filter_map(|(k, v)| k.scalar_text().map(|text| (text, k, v)))
    }

    /// A short, human-readable name for the node's shape.
    pub fn kind_name(&self) -> &'static str {
        match &self.resolved().kind {
            NodeKind::Scalar(scalar) => match scalar.value {
                ScalarValue::String(_) => "string",
                ScalarValue::Int(_) => "integer",
                ScalarValue::Float(_) => "number",
                ScalarValue::Bool(_) => "boolean",
                ScalarValue::Null => "null",
            },
            NodeKind::Sequence(_) => "list",
            NodeKind::Mapping(_) => "mapping",
            NodeKind::Alias(_) => "alias",
        }
    }

    /// Walk a breadcrumb path through mappings (by key) and sequences (by index).
    ///
    /// Returns the deepest node reached; when the first step already fails,
    /// that is `self`.
    pub fn locate<S: AsRef<str>>(&self, path: &[S]) -> &Node {
        let mut current = self;
        for step in path {
            let step = step.as_ref();
            let next = match &current.resolved().kind {
                NodeKind::Mapping(_) => current.get(step),
                NodeKind::Sequence(items) => step.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(node) => current = node,
                None => break,
            }
        }
        current
    }

    /// Decode the node into a location-free JSON value.
    ///
    /// Mapping keys that are not scalars are dropped. Non-finite floats keep
    /// their raw text since JSON cannot represent them.
    pub fn to_value(&self) -> Value {
        match &self.kind {
            NodeKind::Scalar(scalar) => match &scalar.value {
                ScalarValue::String(s) => Value::String(s.clone()),
                ScalarValue::Int(i) => Value::Number((*i).into()),
                ScalarValue::Float(f) => Number::from_f64(*f)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(scalar.raw.clone())),
                ScalarValue::Bool(b) => Value::Bool(*b),
                ScalarValue::Null => Value::Null,
            },
            NodeKind::Sequence(items) => Value::Array(items.iter().map(Node::to_value).collect()),
            NodeKind::Mapping(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    if let Some(text) = key.scalar_text() {
                        map.insert(text.to_string(), value.to_value());
                    }
                }
                Value::Object(map)
            }
            NodeKind::Alias(target) => target.to_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn int(line: usize, column: usize, value: i64) -> Node {
        Node::new(
            line,
            column,
            NodeKind::Scalar(Scalar {
                raw: value.to_string(),
                value: ScalarValue::Int(value),
            }),
        )
    }

    fn sample() -> Node {
        Node::new(
            1,
            1,
            NodeKind::Mapping(vec![
                (
                    Node::string(1, 1, "Name"),
                    Node::string(1, 7, "bucket"),
                ),
                (
                    Node::string(2, 1, "Ports"),
                    Node::new(
                        3,
                        3,
                        NodeKind::Sequence(vec![int(3, 5, 80), int(4, 5, 443)]),
                    ),
                ),
            ]),
        )
    }

    #[test]
    fn test_to_value_decodes_primitives() {
        assert_eq!(sample().to_value(), json!({"Name": "bucket", "Ports": [80, 443]}));
    }

    #[test]
    fn test_locate_walks_mappings_and_sequences() {
        let root = sample();
        let node = root.locate(&["Ports", "1"]);
        assert_eq!((node.line, node.column), (4, 5));
    }

    #[test]
    fn test_locate_stops_at_deepest_known_node() {
        let root = sample();
        let node = root.locate(&["Ports", "7", "Deeper"]);
        assert_eq!((node.line, node.column), (3, 3));
    }

    #[test]
    fn test_positions_are_at_least_one() {
        let node = Node::string(0, 0, "x");
        assert_eq!((node.line, node.column), (1, 1));
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let alias = Node::new(5, 2, NodeKind::Alias(Box::new(Node::string(1, 1, "shared"))));
        assert_eq!(alias.as_str(), Some("shared"));
        assert_eq!(alias.to_value(), json!("shared"));
        assert_eq!(alias.line, 5);
    }
}
