//! Rules relating properties of the same object to each other.
//!
//! The relationship tables are keyed by owner type (a resource type or a
//! qualified property type) and apply wherever the walker reaches an object
//! of that type. A property set to `!Ref AWS::NoValue` counts as absent.

use serde_json::Value;

use crate::app::cfn_intrinsic_functions::{is_intrinsic, is_no_value};
use crate::app::cfn_template::Resource;

use super::walk::{walk_objects, ObjectVisit};
use super::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(ExclusiveProperties),
        Box::new(TriggerExclusions),
        Box::new(DependentProperties),
        Box::new(DynamoDbBillingMode),
    ]
}

fn present(object: &ObjectVisit<'_>, name: &str) -> bool {
    object.get(name).map_or(false, |value| !is_no_value(value))
}

/// Objects of known resources whose owner appears in `table`.
fn matching_objects<'a, T>(
    cx: &RuleContext<'a>,
    table: &'static [(&'static str, T)],
) -> Vec<(&'a Resource, ObjectVisit<'a>, &'static T)> {
    let mut out = Vec::new();
    for resource in cx.known_resources() {
        for object in walk_objects(cx.schema, resource) {
            for (owner, entry) in table {
                if object.owner == *owner {
                    out.push((resource, object.clone(), entry));
                }
            }
        }
    }
    out
}

/// E2520: properties that cannot be set together.
pub struct ExclusiveProperties;

impl ExclusiveProperties {
    /// Owner type, then a property and the properties it excludes.
    const TABLE: &'static [(&'static str, (&'static str, &'static [&'static str]))] = &[
        ("AWS::AutoScaling::AutoScalingGroup", ("LaunchConfigurationName", &["LaunchTemplate"])),
        ("AWS::CloudWatch::Alarm", ("MetricName", &["Metrics"])),
        ("AWS::CloudWatch::Alarm", ("Statistic", &["ExtendedStatistic"])),
        ("AWS::EC2::Instance", ("NetworkInterfaces", &["SecurityGroupIds", "SecurityGroups", "SubnetId"])),
        ("AWS::EC2::Instance", ("SecurityGroupIds", &["SecurityGroups"])),
        ("AWS::ElasticLoadBalancingV2::LoadBalancer", ("SubnetMappings", &["Subnets"])),
        ("AWS::RDS::DBCluster", ("ManageMasterUserPassword", &["MasterUserPassword"])),
        ("AWS::RDS::DBInstance", ("ManageMasterUserPassword", &["MasterUserPassword"])),
        ("AWS::Redshift::Cluster", ("ManageMasterPassword", &["MasterUserPassword"])),
        ("AWS::Route53::RecordSet", ("AliasTarget", &["ResourceRecords", "TTL"])),
        ("AWS::SecretsManager::Secret", ("GenerateSecretString", &["SecretString"])),
        ("AWS::StepFunctions::StateMachine", ("Definition", &["DefinitionS3Location", "DefinitionString"])),
        ("AWS::StepFunctions::StateMachine", ("DefinitionString", &["DefinitionS3Location"])),
    ];
}

impl LintRule for ExclusiveProperties {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E2520",
            short_desc: "Check Properties that are mutually exclusive",
            description: "Making sure CloudFormation properties that are exclusive are not defined",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#exclusive",
            tags: &["resources", "properties", "exclusive"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, object, (property, excludes)) in matching_objects(cx, Self::TABLE) {
            if !present(&object, property) {
                continue;
            }
            for excluded in excludes.iter().filter(|name| present(&object, name)) {
                findings.push(Finding::on_property(
                    self.id(),
                    resource,
                    &object.child_path(property),
                    format!("Parameter {} shouldn't exist with {}", property, excluded),
                ));
            }
        }
        findings
    }
}

/// E3020: a trigger property that rules out others.
pub struct TriggerExclusions;

impl TriggerExclusions {
    const TABLE: &'static [(&'static str, (&'static str, &'static [&'static str]))] = &[
        ("AWS::DocDB::DBCluster", ("SnapshotIdentifier", &["MasterUserPassword", "MasterUsername"])),
        (
            "AWS::Neptune::DBCluster",
            ("SnapshotIdentifier", &["KmsKeyId", "StorageEncrypted"]),
        ),
        (
            "AWS::RDS::DBCluster",
            ("SnapshotIdentifier", &["DatabaseName", "MasterUserPassword", "MasterUsername"]),
        ),
        (
            "AWS::RDS::DBInstance",
            ("DBSnapshotIdentifier", &["DBName", "MasterUserPassword", "MasterUsername"]),
        ),
        (
            "AWS::RDS::DBInstance",
            (
                "SourceDBInstanceIdentifier",
                &["DBName", "MasterUserPassword", "MasterUsername", "StorageEncrypted"],
            ),
        ),
    ];
}

impl LintRule for TriggerExclusions {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3020",
            short_desc: "Check properties excluded by another property",
            description: "When certain properties are set, such as restoring from a snapshot, other create-time properties must not be specified",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-rds-dbinstance.html",
            tags: &["resources", "properties", "exclusive"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, object, (trigger, excludes)) in matching_objects(cx, Self::TABLE) {
            if !present(&object, trigger) {
                continue;
            }
            for excluded in excludes.iter().filter(|name| present(&object, name)) {
                findings.push(Finding::on_property(
                    self.id(),
                    resource,
                    &object.child_path(excluded),
                    format!("Property {} should not be specified when {} is set", excluded, trigger),
                ));
            }
        }
        findings
    }
}

/// E3021: a property that needs others alongside it.
pub struct DependentProperties;

impl DependentProperties {
    /// Owner type, then a property and its requirements. Each requirement
    /// is a list of alternatives; any one of them satisfies it.
    const TABLE: &'static [(&'static str, (&'static str, &'static [&'static [&'static str]]))] = &[
        ("AWS::EC2::SecurityGroup.Egress", ("FromPort", &[&["ToPort"]])),
        ("AWS::EC2::SecurityGroup.Egress", ("ToPort", &[&["FromPort"]])),
        ("AWS::EC2::SecurityGroup.Ingress", ("FromPort", &[&["ToPort"]])),
        ("AWS::EC2::SecurityGroup.Ingress", ("ToPort", &[&["FromPort"]])),
        ("AWS::EC2::SecurityGroupIngress", ("FromPort", &[&["ToPort"]])),
        ("AWS::EC2::SecurityGroupIngress", ("ToPort", &[&["FromPort"]])),
        ("AWS::Lambda::Function.Code", ("S3Bucket", &[&["S3Key"]])),
        ("AWS::Lambda::Function.Code", ("S3Key", &[&["S3Bucket"]])),
        (
            "AWS::RDS::DBCluster",
            ("MasterUsername", &[&["MasterUserPassword", "ManageMasterUserPassword"]]),
        ),
        (
            "AWS::RDS::DBInstance",
            ("MasterUsername", &[&["MasterUserPassword", "ManageMasterUserPassword"]]),
        ),
        ("AWS::Route53::RecordSet", ("ResourceRecords", &[&["TTL"]])),
        ("AWS::Route53::RecordSet", ("Weight", &[&["SetIdentifier"]])),
        ("AWS::Route53::RecordSet", ("Failover", &[&["SetIdentifier"]])),
        ("AWS::SNS::Topic", ("ContentBasedDeduplication", &[&["FifoTopic"]])),
        ("AWS::SQS::Queue", ("ContentBasedDeduplication", &[&["FifoQueue"]])),
        ("AWS::SQS::Queue", ("DeduplicationScope", &[&["FifoQueue"]])),
        ("AWS::SQS::Queue", ("FifoThroughputLimit", &[&["FifoQueue"]])),
    ];
}

impl LintRule for DependentProperties {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3021",
            short_desc: "Check Properties that are dependent",
            description: "Making sure CloudFormation properties that are dependent on other properties are present",
            source_url: "https://github.com/aws-cloudformation/cfn-lint/blob/main/docs/cfn-resource-specification.md#dependent",
            tags: &["resources", "properties", "dependent"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (resource, object, (property, requirements)) in matching_objects(cx, Self::TABLE) {
            if !present(&object, property) {
                continue;
            }
            for alternatives in requirements.iter() {
                if alternatives.iter().any(|name| present(&object, name)) {
                    continue;
                }
                findings.push(Finding::on_property(
                    self.id(),
                    resource,
                    &object.child_path(property),
                    format!(
                        "Property {} should be specified when {} is specified",
                        alternatives.join(" or "),
                        property
                    ),
                ));
            }
        }
        findings
    }
}

/// E3638: provisioned throughput must agree with the table's billing mode.
pub struct DynamoDbBillingMode;

impl DynamoDbBillingMode {
    fn check_throughput(
        &self,
        resource: &Resource,
        path: Vec<String>,
        has_throughput: bool,
        on_demand: bool,
        findings: &mut Vec<Finding>,
    ) {
        let message = match (on_demand, has_throughput) {
            (true, true) => "ProvisionedThroughput must not be specified when BillingMode is PAY_PER_REQUEST",
            (false, false) => "ProvisionedThroughput must be specified when BillingMode is PROVISIONED",
            _ => return,
        };
        findings.push(Finding::on_property(self.id(), resource, &path, message));
    }
}

impl LintRule for DynamoDbBillingMode {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3638",
            short_desc: "Validate DynamoDB BillingMode pay per request configuration",
            description: "When BillingMode is PAY_PER_REQUEST don't specify ProvisionedThroughput; when it is PROVISIONED or absent, ProvisionedThroughput is required",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-dynamodb-table.html#cfn-dynamodb-table-billingmode",
            tags: &["resources", "dynamodb", "provisioned throughput", "billing mode"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.resources_of_type("AWS::DynamoDB::Table") {
            let on_demand = match resource.property("BillingMode") {
                None => false,
                Some(value) if is_no_value(value) => false,
                Some(value) if is_intrinsic(value) => continue,
                Some(value) => value.as_str() == Some("PAY_PER_REQUEST"),
            };

            let has_throughput = resource
                .property("ProvisionedThroughput")
                .map_or(false, |value| !is_no_value(value));
            let path = if has_throughput {
                vec!["ProvisionedThroughput".to_string()]
            } else if resource.property("BillingMode").is_some() {
                vec!["BillingMode".to_string()]
            } else {
                Vec::new()
            };
            self.check_throughput(resource, path, has_throughput, on_demand, &mut findings);

            let Some(Value::Array(indexes)) = resource.property("GlobalSecondaryIndexes") else {
                continue;
            };
            for (index, item) in indexes.iter().enumerate() {
                if is_intrinsic(item) {
                    continue;
                }
                let Some(gsi) = item.as_object() else {
                    continue;
                };
                let has_throughput = gsi
                    .get("ProvisionedThroughput")
                    .map_or(false, |value| !is_no_value(value));
                let mut path = vec!["GlobalSecondaryIndexes".to_string(), index.to_string()];
                if has_throughput {
                    path.push("ProvisionedThroughput".to_string());
                }
                self.check_throughput(resource, path, has_throughput, on_demand, &mut findings);
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cfn_resources::schema;
    use crate::app::cfn_template::Template;
    use pretty_assertions::assert_eq;

    fn run(rule: &dyn LintRule, source: &str) -> Vec<Finding> {
        let template = Template::parse(source).unwrap();
        rule.check(&RuleContext::new(&template, schema()))
    }

    #[test]
    fn test_exclusive_properties() {
        let findings = run(
            &ExclusiveProperties,
            "Resources:
  Instance:
    Type: AWS::EC2::Instance
    Properties:
      SecurityGroups: [default]
      SecurityGroupIds: [sg-1]
  Secret:
    Type: AWS::SecretsManager::Secret
    Properties:
      SecretString: hunter2
      GenerateSecretString:
        PasswordLength: 32
  Quiet:
    Type: AWS::SecretsManager::Secret
    Properties:
      SecretString: hunter2
      GenerateSecretString: !Ref AWS::NoValue
",
        );
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Parameter SecurityGroupIds shouldn't exist with SecurityGroups",
                "Parameter GenerateSecretString shouldn't exist with SecretString",
            ]
        );
    }

    #[test]
    fn test_snapshot_excludes_create_properties() {
        let findings = run(
            &TriggerExclusions,
            "Resources:
  Db:
    Type: AWS::RDS::DBInstance
    Properties:
      DBSnapshotIdentifier: snap
      MasterUsername: admin
      AllocatedStorage: '20'
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, vec!["Resources", "Db", "Properties", "MasterUsername"]);
    }

    #[test]
    fn test_dependent_properties() {
        let findings = run(
            &DependentProperties,
            "Resources:
  Queue:
    Type: AWS::SQS::Queue
    Properties:
      ContentBasedDeduplication: true
  Db:
    Type: AWS::RDS::DBInstance
    Properties:
      MasterUsername: admin
      ManageMasterUserPassword: true
  Function:
    Type: AWS::Lambda::Function
    Properties:
      Role: r
      Code:
        S3Bucket: b
",
        );
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Property S3Key should be specified when S3Bucket is specified",
                "Property FifoQueue should be specified when ContentBasedDeduplication is specified",
            ]
        );
        assert_eq!(findings[0].path, vec!["Resources", "Function", "Properties", "Code", "S3Bucket"]);
    }

    #[test]
    fn test_billing_mode_boundaries() {
        let on_demand = run(
            &DynamoDbBillingMode,
            "Resources:
  Table:
    Type: AWS::DynamoDB::Table
    Properties:
      BillingMode: PAY_PER_REQUEST
      KeySchema: [{AttributeName: id, KeyType: HASH}]
      ProvisionedThroughput: {ReadCapacityUnits: 1, WriteCapacityUnits: 1}
",
        );
        assert_eq!(on_demand.len(), 1);

        let provisioned = run(
            &DynamoDbBillingMode,
            "Resources:
  Table:
    Type: AWS::DynamoDB::Table
    Properties:
      BillingMode: PROVISIONED
      KeySchema: [{AttributeName: id, KeyType: HASH}]
",
        );
        assert_eq!(provisioned.len(), 1);
        assert_eq!(provisioned[0].path, vec!["Resources", "Table", "Properties", "BillingMode"]);

        let fine = run(
            &DynamoDbBillingMode,
            "Resources:
  Table:
    Type: AWS::DynamoDB::Table
    Properties:
      BillingMode: PAY_PER_REQUEST
      KeySchema: [{AttributeName: id, KeyType: HASH}]
      GlobalSecondaryIndexes:
        - IndexName: g
          KeySchema: [{AttributeName: id, KeyType: HASH}]
          Projection: {ProjectionType: ALL}
",
        );
        assert!(fine.is_empty());
    }
}
