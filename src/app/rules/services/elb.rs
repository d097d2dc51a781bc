//! Elastic Load Balancing rules.

use serde_json::Value;

use super::values_at;
use crate::app::cfn_intrinsic_functions::is_no_value;
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(ListenerCertificates),
        Box::new(ApplicationSubnets),
        Box::new(LambdaTargetGroup),
    ]
}

/// E2503: secure listeners need a certificate.
pub struct ListenerCertificates;

impl LintRule for ListenerCertificates {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E2503",
            short_desc: "Validate ELB listener certificates",
            description: "HTTPS and TLS listeners of a load balancer must specify a certificate",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-elasticloadbalancingv2-listener.html",
            tags: &["resources", "elbv2", "elb", "certificates"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();

        for listener in cx.resources_of_type("AWS::ElasticLoadBalancingV2::Listener") {
            let Some(protocol) = listener.property_str("Protocol") else {
                continue;
            };
            if protocol != "HTTPS" && protocol != "TLS" {
                continue;
            }
            let certificates = listener.property("Certificates");
            let missing = match certificates {
                None => true,
                Some(Value::Array(items)) => items.is_empty(),
                Some(value) => is_no_value(value),
            };
            if missing {
                findings.push(Finding::on_property(
                    self.id(),
                    listener,
                    &["Protocol"],
                    format!("Certificates should be specified when using Protocol {}", protocol),
                ));
            }
        }

        for load_balancer in cx.resources_of_type("AWS::ElasticLoadBalancing::LoadBalancer") {
            for located in values_at(load_balancer, &["Listeners", "*"]) {
                let Some(protocol) = located.value.get("Protocol").and_then(Value::as_str) else {
                    continue;
                };
                let protocol = protocol.to_ascii_uppercase();
                if protocol != "HTTPS" && protocol != "SSL" {
                    continue;
                }
                if located.value.get("SSLCertificateId").is_none() {
                    findings.push(Finding::on_property(
                        self.id(),
                        load_balancer,
                        &located.path,
                        format!("SSLCertificateId should be specified when using Protocol {}", protocol),
                    ));
                }
            }
        }
        findings
    }
}

/// E3072: application load balancers span at least two subnets.
pub struct ApplicationSubnets;

impl LintRule for ApplicationSubnets {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3072",
            short_desc: "Application load balancers have at least two subnets",
            description: "An application load balancer must be placed in subnets from at least two Availability Zones",
            source_url: "https://docs.aws.amazon.com/elasticloadbalancing/latest/application/application-load-balancers.html#subnets-load-balancer",
            tags: &["resources", "elbv2"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for load_balancer in cx.resources_of_type("AWS::ElasticLoadBalancingV2::LoadBalancer") {
            match load_balancer.property("Type") {
                None => {}
                Some(Value::String(kind)) if kind == "application" => {}
                _ => continue,
            }
            for property in ["Subnets", "SubnetMappings"] {
                let Some(Value::Array(items)) = load_balancer.property(property) else {
                    continue;
                };
                if items.len() < 2 {
                    findings.push(Finding::on_property(
                        self.id(),
                        load_balancer,
                        &[property],
                        format!(
                            "You must specify at least two {} for an application load balancer, found {}",
                            property,
                            items.len()
                        ),
                    ));
                }
            }
        }
        findings
    }
}

/// E3073: properties a lambda target group does not accept.
pub struct LambdaTargetGroup;

impl LambdaTargetGroup {
    const EXCLUDED: &'static [&'static str] = &[
        "HealthCheckPort",
        "HealthCheckProtocol",
        "Port",
        "Protocol",
        "ProtocolVersion",
        "VpcId",
    ];
}

impl LintRule for LambdaTargetGroup {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3073",
            short_desc: "Validate lambda target group properties",
            description: "A target group with TargetType lambda does not take ports, protocols or a VPC",
            source_url: "https://docs.aws.amazon.com/elasticloadbalancing/latest/application/lambda-functions.html",
            tags: &["resources", "elbv2", "lambda"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for target_group in cx.resources_of_type("AWS::ElasticLoadBalancingV2::TargetGroup") {
            if target_group.property_str("TargetType") != Some("lambda") {
                continue;
            }
            for property in Self::EXCLUDED {
                let present = target_group
                    .property(property)
                    .map_or(false, |value| !is_no_value(value));
                if present {
                    findings.push(Finding::on_property(
                        self.id(),
                        target_group,
                        &[property],
                        format!("{} must not be specified when TargetType is lambda", property),
                    ));
                }
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
    fn test_https_listener_without_certificates() {
        let findings = run(
            &ListenerCertificates,
            "Resources:
  Https:
    Type: AWS::ElasticLoadBalancingV2::Listener
    Properties:
      LoadBalancerArn: !Ref Alb
      Port: 443
      Protocol: HTTPS
      DefaultActions: [{Type: forward, TargetGroupArn: !Ref Tg}]
  Classic:
    Type: AWS::ElasticLoadBalancing::LoadBalancer
    Properties:
      Listeners:
        - {InstancePort: '80', LoadBalancerPort: '443', Protocol: https}
        - {InstancePort: '80', LoadBalancerPort: '80', Protocol: HTTP}
",
        );
        let paths: Vec<String> = findings.iter().map(|f| f.path.join("/")).collect();
        assert_eq!(
            paths,
            vec![
                "Resources/Https/Properties/Protocol",
                "Resources/Classic/Properties/Listeners/0",
            ]
        );
    }

    #[test]
    fn test_alb_subnet_boundary() {
        let alb = |subnets: &str| {
            format!(
                "Resources:
  Alb:
    Type: AWS::ElasticLoadBalancingV2::LoadBalancer
    Properties:
      Subnets: {}
",
                subnets
            )
        };
        assert_eq!(run(&ApplicationSubnets, &alb("[subnet-1]")).len(), 1);
        assert!(run(&ApplicationSubnets, &alb("[subnet-1, subnet-2]")).is_empty());
        assert!(run(&ApplicationSubnets, &alb("!Ref Subnets")).is_empty());

        let network = alb("[subnet-1]").replace("    Properties:\n", "    Properties:\n      Type: network\n");
        assert!(run(&ApplicationSubnets, &network).is_empty());
    }

    #[test]
    fn test_lambda_target_group() {
        let findings = run(
            &LambdaTargetGroup,
            "Resources:
  Tg:
    Type: AWS::ElasticLoadBalancingV2::TargetGroup
    Properties:
      TargetType: lambda
      Port: 80
      VpcId: !Ref AWS::NoValue
",
        );
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["Port must not be specified when TargetType is lambda"]);
    }
}
