//! End-to-end linting of whole templates with the built-in rule set.

#[cfg(test)]
mod tests {
    use cfnlint::app::rules::{Finding, Linter, Severity};
    use pretty_assertions::assert_eq;

    fn lint(source: &str) -> Vec<Finding> {
        Linter::default()
            .lint_source(source)
            .expect("template should parse")
    }

    fn ids(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.rule_id.as_str()).collect()
    }

    fn count(findings: &[Finding], rule_id: &str) -> usize {
        findings.iter().filter(|f| f.rule_id == rule_id).count()
    }

    #[test]
    fn test_valid_lambda_has_no_findings() {
        let findings = lint(
            "AWSTemplateFormatVersion: '2010-09-09'
Resources:
  Function:
    Type: AWS::Lambda::Function
    Properties:
      Runtime: python3.12
      Handler: index.handler
      Role: arn:aws:iam::123456789012:role/R
      Code: {S3Bucket: b, S3Key: k}
",
        );
        assert_eq!(findings, Vec::<Finding>::new());
    }

    #[test]
    fn test_unknown_property() {
        let findings = lint(
            "Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      InvalidProperty: x
",
        );
        let about_property: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.path.iter().any(|segment| segment == "InvalidProperty"))
            .collect();
        assert_eq!(about_property.len(), 1);
        assert_eq!(about_property[0].rule_id, "E1101");
        assert_eq!(about_property[0].line, 5);
    }

    #[test]
    fn test_depends_on_cycle_is_reported_once() {
        let findings = lint(
            "Resources:
  A:
    Type: AWS::S3::Bucket
    DependsOn: B
  B:
    Type: AWS::S3::Bucket
    DependsOn: A
",
        );
        let cycles: Vec<&Finding> = findings.iter().filter(|f| f.rule_id == "E3004").collect();
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].message.contains('A'));
        assert!(cycles[0].message.contains('B'));
    }

    #[test]
    fn test_self_dependency_is_reported_once() {
        let findings = lint(
            "Resources:
  A:
    Type: AWS::S3::Bucket
    DependsOn: [A]
",
        );
        assert_eq!(count(&findings, "E3005"), 1);
        assert_eq!(count(&findings, "E3004"), 0);
    }

    #[test]
    fn test_ref_to_parameter_is_not_a_dependency() {
        let findings = lint(
            "Parameters:
  P:
    Type: String
Resources:
  R:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Ref P
",
        );
        assert_eq!(count(&findings, "E3004"), 0);
        assert_eq!(count(&findings, "W2001"), 0);
    }

    #[test]
    fn test_fargate_service_with_ec2_task() {
        let findings = lint(
            "Resources:
  Cluster:
    Type: AWS::ECS::Cluster
  Task:
    Type: AWS::ECS::TaskDefinition
    Properties:
      RequiresCompatibilities: [EC2]
      ContainerDefinitions:
        - Name: web
          Image: nginx
  Service:
    Type: AWS::ECS::Service
    Properties:
      Cluster: !Ref Cluster
      LaunchType: FARGATE
      TaskDefinition: !Ref Task
",
        );
        assert_eq!(count(&findings, "E3054"), 1);
    }

    #[test]
    fn test_fargate_memory_between_allowed_sizes() {
        let findings = lint(
            "Resources:
  Task:
    Type: AWS::ECS::TaskDefinition
    Properties:
      RequiresCompatibilities: [FARGATE]
      NetworkMode: awsvpc
      Cpu: '256'
      Memory: '1536'
      ContainerDefinitions:
        - Name: web
          Image: nginx
",
        );
        assert_eq!(count(&findings, "E3047"), 1);
    }

    #[test]
    fn test_snapstart_on_python() {
        let findings = lint(
            "Resources:
  Function:
    Type: AWS::Lambda::Function
    Properties:
      Runtime: python3.12
      Handler: index.handler
      Role: arn:aws:iam::123456789012:role/R
      Code: {S3Bucket: b, S3Key: k}
      SnapStart: {ApplyOn: PublishedVersions}
",
        );
        assert_eq!(ids(&findings), vec!["E2530"]);
    }

    fn buckets(n: usize) -> String {
        let mut source = String::from("Resources:\n");
        for i in 0..n {
            source.push_str(&format!("  Bucket{}:\n    Type: AWS::S3::Bucket\n", i));
        }
        source
    }

    #[test]
    fn test_resource_limit_boundary() {
        assert_eq!(count(&lint(&buckets(500)), "E3010"), 0);
        assert_eq!(count(&lint(&buckets(501)), "E3010"), 1);
    }

    #[test]
    fn test_dynamodb_billing_mode_boundaries() {
        let table = |billing: &str, throughput: &str| {
            format!(
                "Resources:
  Table:
    Type: AWS::DynamoDB::Table
    Properties:
      BillingMode: {}
      AttributeDefinitions: [{{AttributeName: id, AttributeType: S}}]
      KeySchema: [{{AttributeName: id, KeyType: HASH}}]
{}",
                billing, throughput
            )
        };
        let throughput = "      ProvisionedThroughput: {ReadCapacityUnits: 5, WriteCapacityUnits: 5}\n";

        assert_eq!(count(&lint(&table("PAY_PER_REQUEST", throughput)), "E3638"), 1);
        assert_eq!(count(&lint(&table("PROVISIONED", "")), "E3638"), 1);
        assert_eq!(count(&lint(&table("PAY_PER_REQUEST", "")), "E3638"), 0);
        assert_eq!(count(&lint(&table("PROVISIONED", throughput)), "E3638"), 0);
    }

    #[test]
    fn test_application_load_balancer_subnets() {
        let alb = |subnets: &str| {
            format!(
                "Resources:
  LoadBalancer:
    Type: AWS::ElasticLoadBalancingV2::LoadBalancer
    Properties:
      Type: application
      Subnets: {}
",
                subnets
            )
        };
        assert_eq!(count(&lint(&alb("[subnet-1]")), "E3072"), 1);
        assert_eq!(count(&lint(&alb("[subnet-1, subnet-2]")), "E3072"), 0);
    }

    #[test]
    fn test_findings_are_ordered_by_rule_id() {
        let findings = lint(
            "Parameters:
  Unused:
    Type: String
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      InvalidProperty: x
      AccessControl: Everyone
",
        );
        let rule_ids = ids(&findings);
        let mut sorted = rule_ids.clone();
        sorted.sort();
        assert_eq!(rule_ids, sorted);
        assert!(rule_ids.contains(&"W2001"));
    }

    #[test]
    fn test_resource_metadata_suppresses_finding() {
        let findings = lint(
            "Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Metadata:
      cfn-lint:
        config:
          ignore_checks: [E1101]
    Properties:
      InvalidProperty: x
",
        );
        assert_eq!(count(&findings, "E1101"), 0);
    }

    #[test]
    fn test_severity_and_exit_bits() {
        let findings = lint(
            "Parameters:
  Unused:
    Type: String
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      InvalidProperty: x
",
        );
        let exit = findings
            .iter()
            .fold(0, |code, finding| code | finding.severity.exit_bit());
        assert_eq!(exit, 2 | 4);
        assert!(findings
            .iter()
            .any(|f| f.rule_id == "W2001" && f.severity == Severity::Warning));
    }

    #[test]
    fn test_json_template() {
        let findings = lint(
            r#"{
  "Resources": {
    "Bucket": {
      "Type": "AWS::S3::Bucket",
      "Properties": {"InvalidProperty": "x"}
    }
  }
}"#,
        );
        let unknown: Vec<&Finding> = findings.iter().filter(|f| f.rule_id == "E1101").collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].line, 5);
    }
}
