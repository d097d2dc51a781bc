//! Rules that relate several resources of a template.
//!
//! Resources are linked through `Ref` and `Fn::GetAtt` values; a link whose
//! target is missing or of another type is not followed, and a value that
//! is an intrinsic other than those two is treated as unknown.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::app::cfn_intrinsic_functions::{
    collect_references, is_intrinsic, is_no_value, ref_target, ReferenceKind,
};
use crate::app::cfn_template::{Resource, Template};
use crate::app::predicates::{to_f64, to_i64, Cidr};

use super::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(UniqueIdentifiers),
        Box::new(RouteTableAssociations),
        Box::new(ServerlessTransform),
        Box::new(DynamoDbAttributes),
        Box::new(EcsDynamicHostPort),
        Box::new(RoleRefWithPath),
        Box::new(EcsAwsVpcNetworking),
        Box::new(EcsFargateCompatibility),
        Box::new(SubnetCidrs),
        Box::new(SqsVisibilityTimeout),
        Box::new(SqsDeadLetterFifo),
    ]
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

// `Ref X` for references, the literal text otherwise.
fn describe(value: &Value) -> String {
    match (ref_target(value), value) {
        (Some(target), _) => format!("Ref {}", target),
        (None, Value::String(text)) => text.clone(),
        (None, other) => other.to_string(),
    }
}

/// The task definition an ECS service runs.
fn task_definition<'a>(template: &'a Template, service: &Resource) -> Option<&'a Resource> {
    template.referenced_resource(service.property("TaskDefinition")?, "AWS::ECS::TaskDefinition")
}

/// E3019: primary identifiers unique per resource type.
pub struct UniqueIdentifiers;

impl UniqueIdentifiers {
    /// Resource type and its name-like identifier property.
    const IDENTIFIERS: &'static [(&'static str, &'static str)] = &[
        ("AWS::DynamoDB::Table", "TableName"),
        ("AWS::ECR::Repository", "RepositoryName"),
        ("AWS::ECS::Cluster", "ClusterName"),
        ("AWS::ElasticLoadBalancingV2::LoadBalancer", "Name"),
        ("AWS::ElasticLoadBalancingV2::TargetGroup", "Name"),
        ("AWS::Events::Rule", "Name"),
        ("AWS::IAM::ManagedPolicy", "ManagedPolicyName"),
        ("AWS::IAM::Role", "RoleName"),
        ("AWS::IAM::User", "UserName"),
        ("AWS::KMS::Alias", "AliasName"),
        ("AWS::Lambda::Function", "FunctionName"),
        ("AWS::Logs::LogGroup", "LogGroupName"),
        ("AWS::RDS::DBCluster", "DBClusterIdentifier"),
        ("AWS::RDS::DBInstance", "DBInstanceIdentifier"),
        ("AWS::S3::Bucket", "BucketName"),
        ("AWS::SNS::Topic", "TopicName"),
        ("AWS::SQS::Queue", "QueueName"),
        ("AWS::SSM::Parameter", "Name"),
        ("AWS::SecretsManager::Secret", "Name"),
        ("AWS::StepFunctions::StateMachine", "StateMachineName"),
    ];
}

impl LintRule for UniqueIdentifiers {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3019",
            short_desc: "Validate that all resources have unique primary identifiers",
            description: "Use the primary identifiers of a resource type to determine if resources are configured with identical names",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-template-resource-type-ref.html",
            tags: &["resources", "unique", "identifier"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut seen: BTreeMap<(&str, &str), &str> = BTreeMap::new();
        let mut findings = Vec::new();
        for resource in cx.resources() {
            // Conditioned resources may never coexist.
            if resource.condition.is_some() {
                continue;
            }
            let Some((_, property)) = Self::IDENTIFIERS
                .iter()
                .find(|(resource_type, _)| *resource_type == resource.resource_type)
            else {
                continue;
            };
            let Some(name) = resource.property_str(property) else {
                continue;
            };
            match seen.get(&(resource.resource_type.as_str(), name)) {
                Some(first) => findings.push(Finding::on_property(
                    self.id(),
                    resource,
                    &[property],
                    format!(
                        "Primary identifier {} '{}' is already used by resource {}",
                        property, name, first
                    ),
                )),
                None => {
                    seen.insert((resource.resource_type.as_str(), name), &resource.logical_id);
                }
            }
        }
        findings
    }
}

/// E3022: one route table association per subnet.
pub struct RouteTableAssociations;

impl LintRule for RouteTableAssociations {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3022",
            short_desc: "Resource SubnetRouteTableAssociation Properties",
            description: "Validate there is only one SubnetRouteTableAssociation per subnet",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-ec2-subnet-route-table-assoc.html",
            tags: &["resources", "ec2", "subnet", "route table"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        let mut findings = Vec::new();
        for association in cx.resources_of_type("AWS::EC2::SubnetRouteTableAssociation") {
            if association.condition.is_some() {
                continue;
            }
            let Some(subnet) = association.property("SubnetId") else {
                continue;
            };
            let Ok(key) = serde_json::to_string(subnet) else {
                continue;
            };
            match seen.get(&key) {
                Some(first) => findings.push(Finding::on_property(
                    self.id(),
                    association,
                    &["SubnetId"],
                    format!(
                        "SubnetId {} has already been associated with a route table by {}",
                        describe(subnet),
                        first
                    ),
                )),
                None => {
                    seen.insert(key, &association.logical_id);
                }
            }
        }
        findings
    }
}

/// E3038: Serverless resource types need the Serverless transform.
pub struct ServerlessTransform;

impl LintRule for ServerlessTransform {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3038",
            short_desc: "Check if Serverless Resource has Serverless Transform",
            description: "Check that a template with Serverless Resources also includes the Serverless Transform",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/transform-aws-serverless.html",
            tags: &["resources", "transform"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        if cx.template.has_transform("AWS::Serverless") {
            return Vec::new();
        }
        cx.resources()
            .find(|resource| resource.resource_type.starts_with("AWS::Serverless::"))
            .map(|resource| {
                Finding::on_resource(
                    self.id(),
                    resource,
                    &["Type"],
                    format!(
                        "Serverless Transform required for Type {} for resource {}",
                        resource.resource_type, resource.logical_id
                    ),
                )
            })
            .into_iter()
            .collect()
    }
}

/// E3039: DynamoDB attribute definitions agree with key schemas.
pub struct DynamoDbAttributes;

impl DynamoDbAttributes {
    /// Attribute names of one key schema list. `None` when any part of it
    /// is an intrinsic, in which case the table cannot be judged.
    fn key_attributes(key_schema: &Value, out: &mut BTreeSet<String>) -> Option<()> {
        let Value::Array(elements) = key_schema else {
            return if is_intrinsic(key_schema) { None } else { Some(()) };
        };
        for element in elements {
            if is_intrinsic(element) {
                return None;
            }
            match element.get("AttributeName") {
                Some(Value::String(name)) => {
                    out.insert(name.clone());
                }
                Some(_) => return None,
                None => {}
            }
        }
        Some(())
    }

    fn used_attributes(table: &Resource) -> Option<BTreeSet<String>> {
        let mut used = BTreeSet::new();
        if let Some(key_schema) = table.property("KeySchema") {
            Self::key_attributes(key_schema, &mut used)?;
        }
        for section in ["GlobalSecondaryIndexes", "LocalSecondaryIndexes"] {
            match table.property(section) {
                None => {}
                Some(Value::Array(indexes)) => {
                    for index in indexes {
                        if is_intrinsic(index) {
                            return None;
                        }
                        if let Some(key_schema) = index.get("KeySchema") {
                            Self::key_attributes(key_schema, &mut used)?;
                        }
                    }
                }
                Some(_) => return None,
            }
        }
        Some(used)
    }

    fn defined_attributes(table: &Resource) -> Option<Vec<(usize, String)>> {
        let Some(definitions) = table.property("AttributeDefinitions") else {
            return Some(Vec::new());
        };
        let Value::Array(items) = definitions else {
            return None;
        };
        let mut defined = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if is_intrinsic(item) {
                return None;
            }
            match item.get("AttributeName") {
                Some(Value::String(name)) => defined.push((index, name.clone())),
                _ => return None,
            }
        }
        Some(defined)
    }
}

impl LintRule for DynamoDbAttributes {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3039",
            short_desc: "AttributeDefinitions / KeySchemas mismatch",
            description: "Verify the set of Attributes in AttributeDefinitions and KeySchemas match",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-dynamodb-table.html",
            tags: &["resources", "dynamodb"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for table in cx.resources_of_type("AWS::DynamoDB::Table") {
            let (Some(used), Some(defined)) =
                (Self::used_attributes(table), Self::defined_attributes(table))
            else {
                continue;
            };
            let defined_names: BTreeSet<&str> = defined.iter().map(|(_, name)| name.as_str()).collect();
            let anchor = if table.property("AttributeDefinitions").is_some() {
                "AttributeDefinitions"
            } else {
                "KeySchema"
            };

            for name in used.iter().filter(|name| !defined_names.contains(name.as_str())) {
                findings.push(Finding::on_property(
                    self.id(),
                    table,
                    &[anchor],
                    format!(
                        "The attribute {} is used in a key schema but not defined in AttributeDefinitions",
                        name
                    ),
                ));
            }
            for (index, name) in defined.iter().filter(|(_, name)| !used.contains(name)) {
                findings.push(Finding::on_property(
                    self.id(),
                    table,
                    &["AttributeDefinitions".to_string(), index.to_string()],
                    format!(
                        "The attribute {} is defined in AttributeDefinitions but not used in any key schema",
                        name
                    ),
                ));
            }
        }
        findings
    }
}

/// E3049: dynamic host ports behind a load balancer need a traffic-port
/// health check.
pub struct EcsDynamicHostPort;

impl EcsDynamicHostPort {
    fn has_dynamic_port(task: &Resource, container: &str, container_port: Option<i64>) -> bool {
        let network_mode = task.property_str("NetworkMode").unwrap_or("bridge");
        if network_mode != "bridge" {
            return false;
        }
        let Some(Value::Array(containers)) = task.property("ContainerDefinitions") else {
            return false;
        };
        containers
            .iter()
            .filter(|definition| definition.get("Name").and_then(Value::as_str) == Some(container))
            .filter_map(|definition| definition.get("PortMappings").and_then(Value::as_array))
            .flatten()
            .any(|mapping| {
                let port_matches = match container_port {
                    Some(port) => mapping.get("ContainerPort").and_then(to_i64) == Some(port),
                    None => true,
                };
                let host_port = mapping.get("HostPort");
                port_matches && host_port.map_or(true, |port| to_i64(port) == Some(0))
            })
    }
}

impl LintRule for EcsDynamicHostPort {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3049",
            short_desc: "Validate ECS tasks with dynamic host port have traffic-port ELB target groups",
            description: "When using an ECS task definition of host port 0 and associating that container to an ELB the target group has to have a HealthCheckPort of 'traffic-port'",
            source_url: "https://docs.aws.amazon.com/AmazonECS/latest/APIReference/API_PortMapping.html",
            tags: &["resources", "ecs", "elbv2"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let template = cx.template;
        let mut findings = Vec::new();
        let mut reported = BTreeSet::new();

        for service in cx.resources_of_type("AWS::ECS::Service") {
            let Some(task) = task_definition(template, service) else {
                continue;
            };
            let Some(Value::Array(load_balancers)) = service.property("LoadBalancers") else {
                continue;
            };
            for load_balancer in load_balancers {
                let Some(container) = load_balancer.get("ContainerName").and_then(Value::as_str) else {
                    continue;
                };
                let Some(target_group) = load_balancer.get("TargetGroupArn").and_then(|arn| {
                    template.referenced_resource(arn, "AWS::ElasticLoadBalancingV2::TargetGroup")
                }) else {
                    continue;
                };
                let container_port = load_balancer.get("ContainerPort").and_then(to_i64);
                if !Self::has_dynamic_port(task, container, container_port) {
                    continue;
                }
                let Some(health_check_port) = target_group.property("HealthCheckPort") else {
                    continue;
                };
                if is_intrinsic(health_check_port)
                    || health_check_port.as_str() == Some("traffic-port")
                    || !reported.insert(target_group.logical_id.as_str())
                {
                    continue;
                }
                findings.push(Finding::on_property(
                    self.id(),
                    target_group,
                    &["HealthCheckPort"],
                    format!(
                        "Target group {} is used by service {} with a dynamic host port and must use a HealthCheckPort of 'traffic-port'",
                        target_group.logical_id, service.logical_id
                    ),
                ));
            }
        }
        findings
    }
}

/// E3050: `Ref` to an IAM role that has a non-default path.
pub struct RoleRefWithPath;

impl LintRule for RoleRefWithPath {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3050",
            short_desc: "Check Ref to IAM Role with a Path",
            description: "Ref of an IAM role returns only its name; when the role has a Path other than '/' the name alone does not identify it",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-iam-role.html",
            tags: &["properties", "iam", "ref"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let roles_with_path: BTreeMap<&str, &str> = cx
            .resources_of_type("AWS::IAM::Role")
            .filter_map(|role| {
                role.property_str("Path")
                    .filter(|path| *path != "/")
                    .map(|path| (role.logical_id.as_str(), path))
            })
            .collect();
        if roles_with_path.is_empty() {
            return Vec::new();
        }

        let mut findings = Vec::new();
        for resource in cx.resources() {
            for (name, value) in &resource.properties {
                // Role-name lists take the bare name.
                if name == "Roles" {
                    continue;
                }
                for reference in collect_references(value) {
                    if reference.kind != ReferenceKind::Ref {
                        continue;
                    }
                    let Some(path) = roles_with_path.get(reference.target.as_str()) else {
                        continue;
                    };
                    let mut rest = vec![name.clone()];
                    rest.extend(reference.path);
                    findings.push(Finding::on_property(
                        self.id(),
                        resource,
                        &rest,
                        format!(
                            "Ref to IAM role {} which has a Path of {}; use Fn::GetAtt {}.Arn",
                            reference.target, path, reference.target
                        ),
                    ));
                }
            }
        }
        findings
    }
}

/// E3052: awsvpc tasks need a service NetworkConfiguration.
pub struct EcsAwsVpcNetworking;

impl LintRule for EcsAwsVpcNetworking {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3052",
            short_desc: "Validate ECS service using awsvpc network mode has NetworkConfiguration",
            description: "When a task definition uses the awsvpc network mode the ECS service must specify a NetworkConfiguration",
            source_url: "https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-networking-awsvpc.html",
            tags: &["resources", "ecs"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for service in cx.resources_of_type("AWS::ECS::Service") {
            let Some(task) = task_definition(cx.template, service) else {
                continue;
            };
            if task.property_str("NetworkMode") != Some("awsvpc") {
                continue;
            }
            let configured = service
                .property("NetworkConfiguration")
                .map_or(false, |value| !is_no_value(value));
            if !configured {
                findings.push(Finding::on_property(
                    self.id(),
                    service,
                    &["TaskDefinition"],
                    format!(
                        "Service {} must specify NetworkConfiguration because task definition {} uses the awsvpc network mode",
                        service.logical_id, task.logical_id
                    ),
                ));
            }
        }
        findings
    }
}

/// E3054: Fargate services need Fargate-compatible tasks.
pub struct EcsFargateCompatibility;

impl LintRule for EcsFargateCompatibility {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3054",
            short_desc: "Validate ECS service using Fargate uses a Fargate compatible task definition",
            description: "When an ECS service uses the FARGATE launch type its task definition must list FARGATE in RequiresCompatibilities",
            source_url: "https://docs.aws.amazon.com/AmazonECS/latest/developerguide/AWS_Fargate.html",
            tags: &["resources", "ecs", "fargate"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for service in cx.resources_of_type("AWS::ECS::Service") {
            if service.property_str("LaunchType") != Some("FARGATE") {
                continue;
            }
            let Some(task) = task_definition(cx.template, service) else {
                continue;
            };
            let compatible = match task.property("RequiresCompatibilities") {
                None => false,
                Some(Value::Array(items)) => {
                    if items.iter().any(is_intrinsic) {
                        continue;
                    }
                    items.iter().any(|item| item.as_str() == Some("FARGATE"))
                }
                Some(_) => continue,
            };
            if !compatible {
                findings.push(Finding::on_property(
                    self.id(),
                    service,
                    &["LaunchType"],
                    format!(
                        "Service {} uses the FARGATE launch type but task definition {} does not list FARGATE in RequiresCompatibilities",
                        service.logical_id, task.logical_id
                    ),
                ));
            }
        }
        findings
    }
}

/// E3059: subnet CIDR blocks inside their VPC and not overlapping.
pub struct SubnetCidrs;

impl LintRule for SubnetCidrs {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3059",
            short_desc: "Subnet CIDRs are within the range of the VPC",
            description: "Check the CIDR of a subnet is within the CIDR of its VPC and does not overlap another subnet of the same VPC",
            source_url: "https://docs.aws.amazon.com/vpc/latest/userguide/subnet-sizing.html",
            tags: &["resources", "ec2", "subnet", "vpc"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let template = cx.template;
        // VPCs with secondary blocks cannot be judged from CidrBlock alone.
        let extended: BTreeSet<String> = cx
            .resources_of_type("AWS::EC2::VPCCidrBlock")
            .filter_map(|block| block.property("VpcId").and_then(ref_target))
            .map(str::to_string)
            .collect();

        let mut findings = Vec::new();
        let mut placed: Vec<(String, &str, Cidr, &str)> = Vec::new();

        for subnet in cx.resources_of_type("AWS::EC2::Subnet") {
            let Some(vpc_value) = subnet.property("VpcId") else {
                continue;
            };
            let vpc_key = serde_json::to_string(vpc_value).unwrap_or_default();

            for property in ["CidrBlock", "Ipv6CidrBlock"] {
                let Some(text) = subnet.property_str(property) else {
                    continue;
                };
                let Ok(block) = text.parse::<Cidr>() else {
                    continue;
                };

                if property == "CidrBlock" {
                    if let Some(vpc) = template.referenced_resource(vpc_value, "AWS::EC2::VPC") {
                        let vpc_block = vpc
                            .property_str("CidrBlock")
                            .and_then(|text| text.parse::<Cidr>().ok());
                        if let Some(vpc_block) = vpc_block {
                            if !extended.contains(&vpc.logical_id) && !vpc_block.contains(&block) {
                                findings.push(Finding::on_property(
                                    self.id(),
                                    subnet,
                                    &[property],
                                    format!(
                                        "CidrBlock {} is not within the CidrBlock {} of VPC {}",
                                        text, vpc_block, vpc.logical_id
                                    ),
                                ));
                            }
                        }
                    }
                }

                if subnet.condition.is_some() {
                    continue;
                }
                let overlap = placed.iter().find(|(key, kind, other, _)| {
                    *key == vpc_key && *kind == property && other.overlaps(&block)
                });
                if let Some((_, _, other, owner)) = overlap {
                    findings.push(Finding::on_property(
                        self.id(),
                        subnet,
                        &[property],
                        format!("{} {} overlaps with {} of subnet {}", property, text, other, owner),
                    ));
                }
                placed.push((vpc_key.clone(), property, block, &subnet.logical_id));
            }
        }
        findings
    }
}

/// E3505: queue visibility timeout covers the consuming function's timeout.
pub struct SqsVisibilityTimeout;

impl SqsVisibilityTimeout {
    const DEFAULT_VISIBILITY_TIMEOUT: f64 = 30.0;
    const DEFAULT_FUNCTION_TIMEOUT: f64 = 3.0;

    // Absent is the default, present but unreadable is unknown.
    fn seconds(resource: &Resource, name: &str, default: f64) -> Option<f64> {
        match resource.property(name) {
            None => Some(default),
            Some(value) => to_f64(value),
        }
    }
}

impl LintRule for SqsVisibilityTimeout {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3505",
            short_desc: "Validate SQS VisibilityTimeout is greater than a function's timeout",
            description: "When an SQS queue is the event source of a Lambda function, the queue VisibilityTimeout must be at least the function Timeout",
            source_url: "https://docs.aws.amazon.com/lambda/latest/dg/with-sqs.html#events-sqs-queueconfig",
            tags: &["resources", "lambda", "sqs"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let template = cx.template;
        let mut findings = Vec::new();
        for mapping in cx.resources_of_type("AWS::Lambda::EventSourceMapping") {
            let Some(queue) = mapping
                .property("EventSourceArn")
                .and_then(|arn| template.referenced_resource(arn, "AWS::SQS::Queue"))
            else {
                continue;
            };
            let Some(function) = mapping
                .property("FunctionName")
                .and_then(|name| template.referenced_resource(name, "AWS::Lambda::Function"))
            else {
                continue;
            };
            let (Some(visibility), Some(timeout)) = (
                Self::seconds(queue, "VisibilityTimeout", Self::DEFAULT_VISIBILITY_TIMEOUT),
                Self::seconds(function, "Timeout", Self::DEFAULT_FUNCTION_TIMEOUT),
            ) else {
                continue;
            };
            if visibility < timeout {
                findings.push(Finding::on_property(
                    self.id(),
                    mapping,
                    &["EventSourceArn"],
                    format!(
                        "Queue {} visibility timeout ({}s) is less than function {} timeout ({}s)",
                        queue.logical_id, visibility, function.logical_id, timeout
                    ),
                ));
            }
        }
        findings
    }
}

/// E3506: a queue and its dead-letter queue are the same kind.
pub struct SqsDeadLetterFifo;

impl SqsDeadLetterFifo {
    fn is_fifo(queue: &Resource) -> Option<bool> {
        match queue.property("FifoQueue") {
            None => Some(false),
            Some(value) if is_intrinsic(value) => None,
            Some(value) => Some(is_truthy(value)),
        }
    }

    fn dead_letter_target(policy: &Value) -> Option<Value> {
        match policy {
            Value::String(text) => serde_json::from_str::<Value>(text)
                .ok()?
                .get("deadLetterTargetArn")
                .cloned(),
            Value::Object(_) if !is_intrinsic(policy) => policy.get("deadLetterTargetArn").cloned(),
            _ => None,
        }
    }
}

impl LintRule for SqsDeadLetterFifo {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3506",
            short_desc: "Validate SQS queue and dead-letter queue types match",
            description: "A FIFO queue must use a FIFO dead-letter queue and a standard queue must use a standard dead-letter queue",
            source_url: "https://docs.aws.amazon.com/AWSSimpleQueueService/latest/SQSDeveloperGuide/sqs-dead-letter-queues.html",
            tags: &["resources", "sqs"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let template = cx.template;
        let mut findings = Vec::new();
        for queue in cx.resources_of_type("AWS::SQS::Queue") {
            let Some(target) = queue
                .property("RedrivePolicy")
                .and_then(Self::dead_letter_target)
            else {
                continue;
            };
            let Some(dead_letter) = template.referenced_resource(&target, "AWS::SQS::Queue") else {
                continue;
            };
            let (Some(source_fifo), Some(target_fifo)) = (Self::is_fifo(queue), Self::is_fifo(dead_letter))
            else {
                continue;
            };
            if source_fifo != target_fifo {
                let kind = |fifo: bool| if fifo { "FIFO" } else { "standard" };
                findings.push(Finding::on_property(
                    self.id(),
                    queue,
                    &["RedrivePolicy"],
                    format!(
                        "Queue {} is {} but its dead-letter queue {} is {}",
                        queue.logical_id,
                        kind(source_fifo),
                        dead_letter.logical_id,
                        kind(target_fifo)
                    ),
                ));
            }
        }
        findings
    }
}
