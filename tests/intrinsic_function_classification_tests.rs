//! Tests for intrinsic function recognition and reference extraction
//!
//! Rules treat intrinsic values as opaque, so recognition has to agree with
//! CloudFormation on what counts as a function call, including the
//! multi-key objects that only look like one.

use cfnlint::app::cfn_intrinsic_functions::{
    collect_references, contains_intrinsic, detect_intrinsic_function, is_no_value,
    referenced_name, sub_variables, IntrinsicFunctionType, ReferenceKind,
};
use serde_json::json;

#[test]
fn test_comprehensive_intrinsic_function_detection() {
    let cases = [
        (json!({"Ref": "MyResource"}), IntrinsicFunctionType::Ref),
        (json!({"Fn::GetAtt": ["MyResource", "Arn"]}), IntrinsicFunctionType::GetAtt),
        (json!({"Fn::ImportValue": "SharedVPC"}), IntrinsicFunctionType::ImportValue),
        (json!({"Fn::Sub": ["Hello ${param}", {"param": {"Ref": "MyParam"}}]}), IntrinsicFunctionType::Sub),
        (json!({"Fn::Join": [",", ["a", "b"]]}), IntrinsicFunctionType::Join),
        (json!({"Fn::Select": [0, {"Fn::GetAZs": ""}]}), IntrinsicFunctionType::Select),
        (json!({"Fn::If": ["IsProduction", "t3.large", "t3.micro"]}), IntrinsicFunctionType::If),
        (json!({"Condition": "IsProduction"}), IntrinsicFunctionType::Condition),
        (json!({"Fn::SomethingNew": []}), IntrinsicFunctionType::Other),
    ];
    for (value, expected) in cases {
        assert_eq!(detect_intrinsic_function(&value), Some(expected), "{}", value);
    }
}

#[test]
fn test_plain_values_are_not_intrinsics() {
    assert_eq!(detect_intrinsic_function(&json!("Ref")), None);
    assert_eq!(detect_intrinsic_function(&json!({"Key": "Ref"})), None);
    // A Condition property next to others is plain data
    assert_eq!(
        detect_intrinsic_function(&json!({"Condition": "c", "Values": ["a"]})),
        None
    );
}

#[test]
fn test_nested_intrinsics_are_found() {
    assert!(contains_intrinsic(&json!({"Tags": [{"Key": "k", "Value": {"Ref": "P"}}]})));
    assert!(!contains_intrinsic(&json!({"Tags": [{"Key": "k", "Value": "v"}]})));
    assert!(is_no_value(&json!({"Ref": "AWS::NoValue"})));
    assert!(!is_no_value(&json!({"Ref": "AWS::Region"})));
}

#[test]
fn test_referenced_names() {
    assert_eq!(referenced_name(&json!({"Ref": "Bucket"})), Some("Bucket".to_string()));
    assert_eq!(referenced_name(&json!({"Fn::GetAtt": "Bucket.Arn"})), Some("Bucket".to_string()));
    assert_eq!(referenced_name(&json!({"Fn::Sub": "${Bucket}"})), None);
}

#[test]
fn test_sub_variables_skip_escapes() {
    assert_eq!(
        sub_variables("arn:${AWS::Partition}:s3:::${ Bucket }/${!Literal}/${Role.Arn}"),
        vec!["AWS::Partition", "Bucket", "Role.Arn"]
    );
}

#[test]
fn test_collect_references_in_document_order() {
    let value = json!({
        "A": {"Ref": "First"},
        "B": [{"Fn::GetAtt": ["Second", "Arn"]}],
        "C": {"Fn::Sub": ["${Third.Name}-${Bound}", {"Bound": {"Ref": "Fourth"}}]}
    });
    let found: Vec<(ReferenceKind, String, Option<String>, String)> = collect_references(&value)
        .into_iter()
        .map(|r| (r.kind, r.target, r.attribute, r.path.join("/")))
        .collect();
    assert_eq!(
        found,
        vec![
            (ReferenceKind::Ref, "First".to_string(), None, "A".to_string()),
            (ReferenceKind::GetAtt, "Second".to_string(), Some("Arn".to_string()), "B/0".to_string()),
            (ReferenceKind::Sub, "Third".to_string(), Some("Name".to_string()), "C/Fn::Sub".to_string()),
            (ReferenceKind::Ref, "Fourth".to_string(), None, "C/Fn::Sub/1/Bound".to_string()),
        ]
    );
}
