//! Marked YAML/JSON loader for CloudFormation templates.
//!
//! JSON templates are valid YAML flow documents, so a single loader serves
//! both formats. The loader listens to the `yaml-rust2` event stream and
//! builds a [`Node`] tree with the start position of every node.
//!
//! CloudFormation short-form tags are desugared while loading, so the rest of
//! the engine only ever sees the long form:
//!
//! | Source | Loaded as |
//! |---|---|
//! | `!Ref Name` | `{Ref: Name}` |
//! | `!Condition Name` | `{Condition: Name}` |
//! | `!GetAtt Res.Attr` | `{Fn::GetAtt: [Res, Attr]}` |
//! | `!Sub ...`, `!If ...`, ... | `{Fn::Sub: ...}`, `{Fn::If: ...}`, ... |

use std::collections::HashMap;

use thiserror::Error;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::app::cfn_node::{Node, NodeKind, Scalar, ScalarValue};

/// Failures that stop a template from being loaded at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{message} (line {line}, column {column})")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("duplicate key '{key}' (line {line}, column {column})")]
    DuplicateKey {
        key: String,
        line: usize,
        column: usize,
    },
    #[error("unknown alias (line {line}, column {column})")]
    UnknownAlias { line: usize, column: usize },
    #[error("template is empty")]
    EmptyDocument,
    #[error("template root must be a mapping, found {found}")]
    NotAMapping { found: &'static str },
}

/// Load the first document of `source` into a located node tree.
pub fn load(source: &str) -> Result<Node, ParseError> {
    let mut builder = TreeBuilder::default();
    let mut parser = Parser::new(source.chars());
    parser
        .load(&mut builder, false)
        .map_err(|err| ParseError::Syntax {
            message: err.info().to_string(),
            line: err.marker().line().max(1),
            column: err.marker().col() + 1,
        })?;

    if let Some(err) = builder.error {
        return Err(err);
    }
    builder.documents.into_iter().next().ok_or(ParseError::EmptyDocument)
}

enum Frame {
    Sequence {
        line: usize,
        column: usize,
        tag: Option<Tag>,
        anchor: usize,
        items: Vec<Node>,
    },
    Mapping {
        line: usize,
        column: usize,
        tag: Option<Tag>,
        anchor: usize,
        entries: Vec<(Node, Node)>,
        pending_key: Option<Node>,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    anchors: HashMap<usize, Node>,
    documents: Vec<Node>,
    error: Option<ParseError>,
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        let line = mark.line().max(1);
        let column = mark.col() + 1;

        match event {
            Event::Scalar(text, style, anchor, tag) => {
                let node = scalar_node(line, column, text, style, tag);
                self.push(node, anchor);
            }
            Event::SequenceStart(anchor, tag) => self.stack.push(Frame::Sequence {
                line,
                column,
                tag,
                anchor,
                items: Vec::new(),
            }),
            Event::MappingStart(anchor, tag) => self.stack.push(Frame::Mapping {
                line,
                column,
                tag,
                anchor,
                entries: Vec::new(),
                pending_key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Sequence {
                    line,
                    column,
                    tag,
                    anchor,
                    items,
                }) => {
                    let node = apply_tag(Node::new(line, column, NodeKind::Sequence(items)), tag);
                    self.push(node, anchor);
                }
                Some(Frame::Mapping {
                    line,
                    column,
                    tag,
                    anchor,
                    entries,
                    ..
                }) => {
                    let node = apply_tag(Node::new(line, column, NodeKind::Mapping(entries)), tag);
                    self.push(node, anchor);
                }
                None => {}
            },
            Event::Alias(id) => match self.anchors.get(&id) {
                Some(target) => {
                    let node = Node::new(line, column, NodeKind::Alias(Box::new(target.clone())));
                    self.push(node, 0);
                }
                None => self.error = Some(ParseError::UnknownAlias { line, column }),
            },
            _ => {}
        }
    }
}

impl TreeBuilder {
    fn push(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }

        match self.stack.last_mut() {
            None => self.documents.push(node),
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                None => *pending_key = Some(node),
                Some(key) => {
                    let text = key.scalar_text().map(str::to_string);
                    if let Some(text) = text {
                        let duplicate = entries
                            .iter()
                            .any(|(existing, _)| existing.scalar_text() == Some(text.as_str()));
                        if duplicate {
                            self.error = Some(ParseError::DuplicateKey {
                                key: text,
                                line: key.line,
                                column: key.column,
                            });
                            return;
                        }
                    }
                    entries.push((key, node));
                }
            },
        }
    }
}

fn scalar_node(
    line: usize,
    column: usize,
    text: String,
    style: TScalarStyle,
    tag: Option<Tag>,
) -> Node {
    let cfn_function = tag.as_ref().and_then(intrinsic_name);
    let core_tag = tag.as_ref().and_then(core_tag_suffix);

    let value = if cfn_function.is_some() || core_tag == Some("str") {
        ScalarValue::String(text.clone())
    } else if !matches!(style, TScalarStyle::Plain) {
        ScalarValue::String(text.clone())
    } else {
        resolve_plain(&text)
    };

    let node = Node::new(line, column, NodeKind::Scalar(Scalar { raw: text, value }));
    match cfn_function {
        Some(function) => wrap_intrinsic(node, &function),
        None => node,
    }
}

fn apply_tag(node: Node, tag: Option<Tag>) -> Node {
    match tag.as_ref().and_then(intrinsic_name) {
        Some(function) => wrap_intrinsic(node, &function),
        None => node,
    }
}

/// The long-form intrinsic name for a local (`!Name`) tag.
fn intrinsic_name(tag: &Tag) -> Option<String> {
    if tag.handle != "!" || tag.suffix.is_empty() {
        return None;
    }
    Some(match tag.suffix.as_str() {
        "Ref" | "Condition" => tag.suffix.clone(),
        other => format!("Fn::{}", other),
    })
}

fn core_tag_suffix(tag: &Tag) -> Option<&str> {
    if tag.handle == "!!" || tag.handle.starts_with("tag:yaml.org,2002") {
        Some(tag.suffix.as_str())
    } else {
        None
    }
}

fn wrap_intrinsic(inner: Node, function: &str) -> Node {
    let (line, column) = (inner.line, inner.column);
    let inner = if function == "Fn::GetAtt" {
        split_getatt(inner)
    } else {
        inner
    };
    let key = Node::string(line, column, function);
    Node::new(line, column, NodeKind::Mapping(vec![(key, inner)]))
}

/// `!GetAtt Res.Attr.Sub` becomes `[Res, Attr.Sub]`; sequences pass through.
fn split_getatt(inner: Node) -> Node {
    let (line, column) = (inner.line, inner.column);
    match inner.as_str().and_then(|s| s.split_once('.')) {
        Some((resource, attribute)) => Node::new(
            line,
            column,
            NodeKind::Sequence(vec![
                Node::string(line, column, resource),
                Node::string(line, column, attribute),
            ]),
        ),
        None => inner,
    }
}

/// Resolve a plain scalar with the YAML 1.2 core schema.
fn resolve_plain(text: &str) -> ScalarValue {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarValue::Null,
        "true" | "True" | "TRUE" => return ScalarValue::Bool(true),
        "false" | "False" | "FALSE" => return ScalarValue::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return ScalarValue::Float(f64::INFINITY)
        }
        "-.inf" | "-.Inf" | "-.INF" => return ScalarValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return ScalarValue::Float(f64::NAN),
        _ => {}
    }

    if let Some(hex) = text.strip_prefix("0x") {
        if let Ok(value) = i64::from_str_radix(hex, 16) {
            return ScalarValue::Int(value);
        }
    }
    if let Some(octal) = text.strip_prefix("0o") {
        if let Ok(value) = i64::from_str_radix(octal, 8) {
            return ScalarValue::Int(value);
        }
    }

    let numeric_shape = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        && text.chars().any(|c| c.is_ascii_digit());
    if numeric_shape {
        if let Ok(value) = text.parse::<i64>() {
            return ScalarValue::Int(value);
        }
        if let Ok(value) = text.parse::<f64>() {
            return ScalarValue::Float(value);
        }
    }
    ScalarValue::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_yaml_with_positions() {
        let root = load("Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n").unwrap();
        let type_node = root.locate(&["Resources", "Bucket", "Type"]);
        assert_eq!(type_node.as_str(), Some("AWS::S3::Bucket"));
        assert_eq!((type_node.line, type_node.column), (3, 11));
    }

    #[test]
    fn test_load_json_document() {
        let root = load(r#"{"Resources": {"Q": {"Type": "AWS::SQS::Queue", "Properties": {"DelaySeconds": 5}}}}"#)
            .unwrap();
        assert_eq!(
            root.to_value(),
            json!({"Resources": {"Q": {"Type": "AWS::SQS::Queue", "Properties": {"DelaySeconds": 5}}}})
        );
    }

    #[test]
    fn test_short_form_tags_are_desugared() {
        let root = load(
            "A: !Ref Param\nB: !GetAtt Res.Arn\nC: !Sub '${AWS::Region}'\nD: !If [Cond, 1, 2]\nE: !Condition IsProd\n",
        )
        .unwrap();
        assert_eq!(
            root.to_value(),
            json!({
                "A": {"Ref": "Param"},
                "B": {"Fn::GetAtt": ["Res", "Arn"]},
                "C": {"Fn::Sub": "${AWS::Region}"},
                "D": {"Fn::If": ["Cond", 1, 2]},
                "E": {"Condition": "IsProd"}
            })
        );
    }

    #[test]
    fn test_plain_scalar_resolution() {
        let root = load("a: 10\nb: 1.5\nc: true\nd: ~\ne: '10'\nf: python3.12\ng: 0x1F\n").unwrap();
        assert_eq!(
            root.to_value(),
            json!({"a": 10, "b": 1.5, "c": true, "d": null, "e": "10", "f": "python3.12", "g": 31})
        );
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let err = load("Resources:\n  A: 1\n  A: 2\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::DuplicateKey {
                key: "A".to_string(),
                line: 3,
                column: 3
            }
        );
    }

    #[test]
    fn test_aliases_follow_anchor() {
        let root = load("a: &shared {x: 1}\nb: *shared\n").unwrap();
        assert_eq!(root.to_value(), json!({"a": {"x": 1}, "b": {"x": 1}}));
    }

    #[test]
    fn test_malformed_input_is_a_syntax_error() {
        assert!(matches!(load("a: [1, 2\n"), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(load(""), Err(ParseError::EmptyDocument));
    }
}
