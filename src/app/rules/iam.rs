//! IAM policy documents and role ARN properties.
//!
//! Policy documents are found at fixed property paths per resource type and
//! checked with [`check_policy_document`]. A document given as a JSON string
//! has no template nodes of its own, so its findings point at the property.

use serde_json::Value;

use super::services::values_at;
use super::walk::walk_properties;
use super::{Finding, LintRule, RuleContext, RuleInfo};
use crate::app::predicates::{check_policy_document, is_role_arn, PolicyKind};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    let policies = [
        PolicyRule {
            info: RuleInfo {
                id: "E3510",
                short_desc: "Validate identity based IAM polices",
                description: "IAM identity polices are embedded JSON in CloudFormation. This rule validates those embedded policies.",
                source_url: "https://docs.aws.amazon.com/IAM/latest/UserGuide/access_policies.html",
                tags: &["resources", "iam"],
            },
            kind: PolicyKind::Identity,
            locations: &[
                ("AWS::IAM::Group", &["Policies", "*", "PolicyDocument"]),
                ("AWS::IAM::ManagedPolicy", &["PolicyDocument"]),
                ("AWS::IAM::Policy", &["PolicyDocument"]),
                ("AWS::IAM::Role", &["Policies", "*", "PolicyDocument"]),
                ("AWS::IAM::User", &["Policies", "*", "PolicyDocument"]),
            ],
        },
        PolicyRule {
            info: RuleInfo {
                id: "E3512",
                short_desc: "Validate resource based IAM polices",
                description: "IAM resources polices are embedded JSON in CloudFormation. This rule validates those embedded policies.",
                source_url: "https://docs.aws.amazon.com/IAM/latest/UserGuide/access_policies.html#policies_resource-based",
                tags: &["resources", "iam"],
            },
            kind: PolicyKind::ResourceBased,
            locations: &[
                ("AWS::Elasticsearch::Domain", &["AccessPolicies"]),
                ("AWS::IAM::Role", &["AssumeRolePolicyDocument"]),
                ("AWS::S3::BucketPolicy", &["PolicyDocument"]),
                ("AWS::SNS::TopicPolicy", &["PolicyDocument"]),
                ("AWS::SQS::QueuePolicy", &["PolicyDocument"]),
            ],
        },
        PolicyRule {
            info: RuleInfo {
                id: "E3513",
                short_desc: "Validate ECR repository policy",
                description: "Private ECR repositories have a policy. This rule validates those policies.",
                source_url: "https://docs.aws.amazon.com/AmazonECR/latest/userguide/repository-policy-examples.html",
                tags: &["resources", "ecr", "iam"],
            },
            kind: PolicyKind::EcrRepository,
            locations: &[("AWS::ECR::Repository", &["RepositoryPolicyText"])],
        },
        PolicyRule {
            info: RuleInfo {
                id: "E3514",
                short_desc: "Validate KMS key policy",
                description: "KMS keys have a key policy. This rule validates the key policy of a KMS key.",
                source_url: "https://docs.aws.amazon.com/kms/latest/developerguide/key-policies.html",
                tags: &["resources", "kms", "iam"],
            },
            kind: PolicyKind::KmsKey,
            locations: &[("AWS::KMS::Key", &["KeyPolicy"])],
        },
    ];

    let mut rules: Vec<Box<dyn LintRule>> = policies
        .into_iter()
        .map(|rule| Box::new(rule) as Box<dyn LintRule>)
        .collect();
    rules.push(Box::new(RoleArns));
    rules
}

/// Policy documents of one family at fixed locations.
pub struct PolicyRule {
    info: RuleInfo,
    kind: PolicyKind,
    locations: &'static [(&'static str, &'static [&'static str])],
}

impl LintRule for PolicyRule {
    fn info(&self) -> RuleInfo {
        self.info
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.resources() {
            for (resource_type, path) in self.locations {
                if resource.resource_type != *resource_type {
                    continue;
                }
                for located in values_at(resource, path) {
                    let embedded = matches!(located.value, Value::String(_));
                    for problem in check_policy_document(located.value, self.kind) {
                        let mut at = located.path.clone();
                        if !embedded {
                            at.extend(problem.path);
                        }
                        findings.push(Finding::on_property(self.info.id, resource, &at, problem.message));
                    }
                }
            }
        }
        findings
    }
}

/// E3511: role ARN properties hold IAM role ARNs.
pub struct RoleArns;

impl RoleArns {
    fn is_role_arn_property(owner: &str, name: &str) -> bool {
        name.to_ascii_lowercase().ends_with("rolearn")
            || (owner == "AWS::Lambda::Function" && name == "Role")
    }
}

impl LintRule for RoleArns {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3511",
            short_desc: "Validate IAM role ARNs",
            description: "Properties that take an IAM role ARN must be given a value matching the role ARN format",
            source_url: "https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_identifiers.html#identifiers-arns",
            tags: &["properties", "iam"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.known_resources() {
            for visit in walk_properties(cx.schema, resource) {
                if !Self::is_role_arn_property(&visit.owner, visit.name) {
                    continue;
                }
                let Some(text) = visit.value.as_str() else {
                    continue;
                };
                if !is_role_arn(text) {
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &visit.path,
                        format!("{} is not a valid IAM role ARN for {}", text, visit.name),
                    ));
                }
            }
        }
        findings
    }
}
