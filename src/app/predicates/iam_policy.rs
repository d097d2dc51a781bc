//! Structural checks for IAM policy documents.
//!
//! Documents embedded as JSON strings are decoded first. Anything built from
//! intrinsic functions is skipped since its shape is only known at deploy
//! time.

use serde_json::{Map, Value};

use super::arn::is_valid_arn;
use crate::app::cfn_intrinsic_functions::is_intrinsic;

const POLICY_VERSIONS: &[&str] = &["2012-10-17", "2008-10-17"];

const DOCUMENT_KEYS: &[&str] = &["Version", "Id", "Statement"];

const STATEMENT_KEYS: &[&str] = &[
    "Sid",
    "Effect",
    "Principal",
    "NotPrincipal",
    "Action",
    "NotAction",
    "Resource",
    "NotResource",
    "Condition",
];

/// Which family of policy a document belongs to. Each family has its own
/// rules for `Principal` and `Resource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Attached to a user, group or role.
    Identity,
    /// Attached to a bucket, queue, topic and similar.
    ResourceBased,
    EcrRepository,
    KmsKey,
}

/// One problem found in a policy document.
///
/// `path` is relative to the property holding the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyProblem {
    pub path: Vec<String>,
    pub message: String,
}

impl PolicyProblem {
    fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// Check a policy document and return every problem found.
pub fn check_policy_document(document: &Value, kind: PolicyKind) -> Vec<PolicyProblem> {
    let mut problems = Vec::new();

    let decoded;
    let document = match document {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                decoded = value;
                &decoded
            }
            Err(e) => {
                problems.push(PolicyProblem::new(
                    Vec::new(),
                    format!("Policy document is not valid JSON: {}", e),
                ));
                return problems;
            }
        },
        other => other,
    };

    if is_intrinsic(document) {
        return problems;
    }

    let Some(object) = document.as_object() else {
        problems.push(PolicyProblem::new(
            Vec::new(),
            "Policy document must be an object",
        ));
        return problems;
    };

    for key in object.keys() {
        if !DOCUMENT_KEYS.contains(&key.as_str()) {
            problems.push(PolicyProblem::new(
                vec![key.clone()],
                format!("Policy document has unknown key '{}'", key),
            ));
        }
    }

    match object.get("Version") {
        None => problems.push(PolicyProblem::new(
            Vec::new(),
            "Policy document is missing 'Version'",
        )),
        Some(Value::String(version)) if POLICY_VERSIONS.contains(&version.as_str()) => {}
        Some(version) if is_intrinsic(version) => {}
        Some(version) => problems.push(PolicyProblem::new(
            vec!["Version".to_string()],
            format!(
                "Policy version {} must be one of {}",
                version,
                POLICY_VERSIONS.join(", ")
            ),
        )),
    }

    match object.get("Statement") {
        None => problems.push(PolicyProblem::new(
            Vec::new(),
            "Policy document is missing 'Statement'",
        )),
        Some(Value::Array(statements)) => {
            for (index, statement) in statements.iter().enumerate() {
                let path = vec!["Statement".to_string(), index.to_string()];
                check_statement(statement, kind, path, &mut problems);
            }
        }
        // A single statement object is accepted by IAM.
        Some(statement @ Value::Object(_)) if !is_intrinsic(statement) => {
            check_statement(statement, kind, vec!["Statement".to_string()], &mut problems);
        }
        Some(statement) if is_intrinsic(statement) => {}
        Some(_) => problems.push(PolicyProblem::new(
            vec!["Statement".to_string()],
            "Policy 'Statement' must be a list of statements",
        )),
    }

    problems
}

fn check_statement(
    statement: &Value,
    kind: PolicyKind,
    path: Vec<String>,
    problems: &mut Vec<PolicyProblem>,
) {
    if is_intrinsic(statement) {
        return;
    }
    let Some(statement) = statement.as_object() else {
        problems.push(PolicyProblem::new(path, "Policy statement must be an object"));
        return;
    };

    let at = |key: &str| {
        let mut p = path.clone();
        p.push(key.to_string());
        p
    };

    for key in statement.keys() {
        if !STATEMENT_KEYS.contains(&key.as_str()) {
            problems.push(PolicyProblem::new(
                at(key),
                format!("Policy statement has unknown key '{}'", key),
            ));
        }
    }

    match statement.get("Effect") {
        Some(Value::String(effect)) if effect == "Allow" || effect == "Deny" => {}
        Some(effect) if is_intrinsic(effect) => {}
        Some(effect) => problems.push(PolicyProblem::new(
            at("Effect"),
            format!("Policy statement Effect {} must be 'Allow' or 'Deny'", effect),
        )),
        None => problems.push(PolicyProblem::new(
            path.clone(),
            "Policy statement is missing 'Effect'",
        )),
    }

    if !has_either(statement, "Action", "NotAction") {
        problems.push(PolicyProblem::new(
            path.clone(),
            "Policy statement must have 'Action' or 'NotAction'",
        ));
    }

    let has_principal = has_either(statement, "Principal", "NotPrincipal");
    let has_resource = has_either(statement, "Resource", "NotResource");

    match kind {
        PolicyKind::Identity => {
            if has_principal {
                problems.push(PolicyProblem::new(
                    path.clone(),
                    "Identity policy statement must not have 'Principal'",
                ));
            }
            if !has_resource {
                problems.push(PolicyProblem::new(
                    path.clone(),
                    "Identity policy statement must have 'Resource' or 'NotResource'",
                ));
            }
        }
        PolicyKind::ResourceBased => {
            if !has_principal {
                problems.push(PolicyProblem::new(
                    path.clone(),
                    "Resource policy statement must have 'Principal' or 'NotPrincipal'",
                ));
            }
        }
        PolicyKind::EcrRepository => {
            if !has_principal {
                problems.push(PolicyProblem::new(
                    path.clone(),
                    "Repository policy statement must have 'Principal'",
                ));
            }
            if has_resource {
                problems.push(PolicyProblem::new(
                    path.clone(),
                    "Repository policy statement must not have 'Resource'",
                ));
            }
        }
        PolicyKind::KmsKey => {
            if !has_principal {
                problems.push(PolicyProblem::new(
                    path.clone(),
                    "Key policy statement must have 'Principal'",
                ));
            }
            if let Some(resource) = statement.get("Resource") {
                let is_star = matches!(resource, Value::String(s) if s == "*")
                    || matches!(resource, Value::Array(items) if items.len() == 1 && items[0] == "*");
                if !is_star && !is_intrinsic(resource) {
                    problems.push(PolicyProblem::new(
                        at("Resource"),
                        "Key policy statement Resource must be '*'",
                    ));
                }
            }
        }
    }

    for key in ["Resource", "NotResource"] {
        if let Some(value) = statement.get(key) {
            check_resource_arns(value, at(key), problems);
        }
    }
}

fn has_either(statement: &Map<String, Value>, a: &str, b: &str) -> bool {
    statement.contains_key(a) || statement.contains_key(b)
}

fn check_resource_arns(value: &Value, path: Vec<String>, problems: &mut Vec<PolicyProblem>) {
    match value {
        Value::String(text) if text.starts_with("arn:") && !is_valid_arn(text) => {
            problems.push(PolicyProblem::new(
                path,
                format!("Policy resource '{}' is not a valid ARN", text),
            ));
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let mut p = path.clone();
                p.push(index.to_string());
                check_resource_arns(item, p, problems);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity_statement() -> Value {
        json!({"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"})
    }

    #[test]
    fn test_valid_identity_policy() {
        let doc = json!({"Version": "2012-10-17", "Statement": [identity_statement()]});
        assert!(check_policy_document(&doc, PolicyKind::Identity).is_empty());
    }

    #[test]
    fn test_string_document_is_decoded() {
        let doc = Value::String(
            json!({"Version": "2012-10-17", "Statement": [identity_statement()]}).to_string(),
        );
        assert!(check_policy_document(&doc, PolicyKind::Identity).is_empty());

        let broken = Value::String("{not json".to_string());
        let problems = check_policy_document(&broken, PolicyKind::Identity);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("not valid JSON"));
    }

    #[test]
    fn test_missing_version_and_bad_effect() {
        let doc = json!({"Statement": [{"Effect": "Permit", "Action": "*", "Resource": "*"}]});
        let problems = check_policy_document(&doc, PolicyKind::Identity);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].message.contains("Version"));
        assert_eq!(problems[1].path, vec!["Statement", "0", "Effect"]);
    }

    #[test]
    fn test_identity_policy_rejects_principal() {
        let doc = json!({"Version": "2012-10-17", "Statement": [{
            "Effect": "Allow", "Principal": "*", "Action": "*", "Resource": "*"
        }]});
        let problems = check_policy_document(&doc, PolicyKind::Identity);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("must not have 'Principal'"));
    }

    #[test]
    fn test_resource_policy_requires_principal() {
        let doc = json!({"Version": "2012-10-17", "Statement": [{
            "Effect": "Allow", "Action": "sqs:SendMessage", "Resource": "*"
        }]});
        let problems = check_policy_document(&doc, PolicyKind::ResourceBased);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("Principal"));
    }

    #[test]
    fn test_ecr_and_kms_rules() {
        let ecr = json!({"Version": "2012-10-17", "Statement": [{
            "Effect": "Allow", "Principal": "*", "Action": "ecr:*", "Resource": "*"
        }]});
        assert_eq!(check_policy_document(&ecr, PolicyKind::EcrRepository).len(), 1);

        let kms = json!({"Version": "2012-10-17", "Statement": [{
            "Effect": "Allow", "Principal": {"AWS": "*"}, "Action": "kms:*",
            "Resource": "arn:aws:kms:us-east-1:123456789012:key/abc"
        }]});
        let problems = check_policy_document(&kms, PolicyKind::KmsKey);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].path, vec!["Statement", "0", "Resource"]);
    }

    #[test]
    fn test_invalid_resource_arn_and_unknown_key() {
        let doc = json!({"Version": "2012-10-17", "Statement": [{
            "Effect": "Allow", "Action": "*", "Resource": ["arn:aws:s3"], "Actions": []
        }]});
        let problems = check_policy_document(&doc, PolicyKind::Identity);
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.path == vec!["Statement", "0", "Actions"]));
        assert!(problems.iter().any(|p| p.path == vec!["Statement", "0", "Resource", "0"]));
    }

    #[test]
    fn test_intrinsic_document_is_skipped() {
        let doc = json!({"Fn::If": ["Cond", {}, {}]});
        assert!(check_policy_document(&doc, PolicyKind::Identity).is_empty());
    }
}
