//! CloudFront distribution rules.

use serde_json::Value;
use std::collections::BTreeSet;

use super::{strings_at, values_at};
use crate::app::cfn_intrinsic_functions::is_intrinsic;
use crate::app::predicates::is_valid_domain;
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![Box::new(Aliases), Box::new(TargetOrigins)]
}

const DISTRIBUTION: &str = "AWS::CloudFront::Distribution";

/// E3013: aliases are domain names.
pub struct Aliases;

impl LintRule for Aliases {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3013",
            short_desc: "CloudFront Aliases",
            description: "CloudFront aliases should contain valid domain names",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-cloudfront-distribution-distributionconfig.html#cfn-cloudfront-distribution-distributionconfig-aliases",
            tags: &["properties", "cloudfront"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for distribution in cx.resources_of_type(DISTRIBUTION) {
            for (path, alias) in strings_at(distribution, &["DistributionConfig", "Aliases", "*"]) {
                if !is_valid_domain(alias) {
                    findings.push(Finding::on_property(
                        self.id(),
                        distribution,
                        &path,
                        format!("Invalid domain name found in Aliases ({})", alias),
                    ));
                }
            }
        }
        findings
    }
}

/// E3057: cache behaviors target a declared origin.
pub struct TargetOrigins;

impl TargetOrigins {
    /// Ids of origins and origin groups; `None` when any is not literal.
    fn declared_ids(config: &Value) -> Option<BTreeSet<&str>> {
        let mut ids = BTreeSet::new();
        let origins = match config.get("Origins") {
            None => Vec::new(),
            Some(Value::Array(origins)) => origins.iter().collect(),
            Some(_) => return None,
        };
        let groups = match config.get("OriginGroups").and_then(|groups| groups.get("Items")) {
            None => Vec::new(),
            Some(Value::Array(groups)) => groups.iter().collect(),
            Some(_) => return None,
        };
        for entry in origins.into_iter().chain(groups) {
            if is_intrinsic(entry) {
                return None;
            }
            match entry.get("Id") {
                Some(Value::String(id)) => {
                    ids.insert(id.as_str());
                }
                Some(_) => return None,
                None => {}
            }
        }
        Some(ids)
    }
}

impl LintRule for TargetOrigins {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3057",
            short_desc: "Validate that CloudFront TargetOriginId is a specified Origin",
            description: "CloudFront TargetOriginId has to map to an Origin Id that is in the same DistributionConfig",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-cloudfront-distribution-defaultcachebehavior.html#cfn-cloudfront-distribution-defaultcachebehavior-targetoriginid",
            tags: &["properties", "cloudfront"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for distribution in cx.resources_of_type(DISTRIBUTION) {
            let Some(config) = values_at(distribution, &["DistributionConfig"]).pop() else {
                continue;
            };
            let Some(declared) = Self::declared_ids(config.value) else {
                continue;
            };
            let targets = [
                &["DistributionConfig", "DefaultCacheBehavior", "TargetOriginId"][..],
                &["DistributionConfig", "CacheBehaviors", "*", "TargetOriginId"][..],
            ];
            for path in targets {
                for (at, target) in strings_at(distribution, path) {
                    if !declared.contains(target) {
                        findings.push(Finding::on_property(
                            self.id(),
                            distribution,
                            &at,
                            format!("TargetOriginId {} is not declared in Origins", target),
                        ));
                    }
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

    const DISTRIBUTION_SOURCE: &str = "Resources:
  Cdn:
    Type: AWS::CloudFront::Distribution
    Properties:
      DistributionConfig:
        Enabled: true
        Aliases: [www.example.com, '*.example.com', not_a_domain]
        Origins:
          - {Id: site, DomainName: site.s3.amazonaws.com}
        DefaultCacheBehavior: {TargetOriginId: site, ViewerProtocolPolicy: allow-all}
        CacheBehaviors:
          - {PathPattern: /api/*, TargetOriginId: api, ViewerProtocolPolicy: https-only}
";

    fn run(rule: &dyn LintRule, source: &str) -> Vec<Finding> {
        let template = Template::parse(source).unwrap();
        rule.check(&RuleContext::new(&template, schema()))
    }

    #[test]
    fn test_aliases() {
        let findings = run(&Aliases, DISTRIBUTION_SOURCE);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Invalid domain name found in Aliases (not_a_domain)");
        assert_eq!(
            findings[0].path.join("/"),
            "Resources/Cdn/Properties/DistributionConfig/Aliases/2"
        );
    }

    #[test]
    fn test_target_origins() {
        let findings = run(&TargetOrigins, DISTRIBUTION_SOURCE);
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["TargetOriginId api is not declared in Origins"]);

        let with_intrinsic_origin = DISTRIBUTION_SOURCE.replace(
            "          - {Id: site, DomainName: site.s3.amazonaws.com}\n",
            "          - {Id: site, DomainName: site.s3.amazonaws.com}\n          - !If [HasApi, {Id: api, DomainName: api.example.com}, !Ref AWS::NoValue]\n",
        );
        assert!(run(&TargetOrigins, &with_intrinsic_origin).is_empty());
    }
}
