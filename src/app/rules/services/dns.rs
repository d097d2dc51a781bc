//! Route 53 record sets and ACM domain validation.

use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{strings_at, values_at};
use crate::app::cfn_intrinsic_functions::is_no_value;
use crate::app::cfn_template::Resource;
use crate::app::predicates::{is_subdomain_of, is_valid_domain};
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(RecordSets),
        Box::new(HostedZoneName),
        Box::new(ValidationDomain),
    ]
}

const RECORD_SET: &str = "AWS::Route53::RecordSet";

fn present(resource: &Resource, name: &str) -> bool {
    resource.property(name).map_or(false, |value| !is_no_value(value))
}

/// E3023: record set structure and record values by type.
pub struct RecordSets;

impl RecordSets {
    /// Problem with one record value of the given type, if any.
    fn check_record(record_type: &str, record: &str) -> Option<String> {
        match record_type {
            "A" => record
                .parse::<Ipv4Addr>()
                .is_err()
                .then(|| format!("A record ({}) is not a valid IPv4 address", record)),
            "AAAA" => record
                .parse::<Ipv6Addr>()
                .is_err()
                .then(|| format!("AAAA record ({}) is not a valid IPv6 address", record)),
            "CNAME" => (!is_valid_domain(record))
                .then(|| format!("CNAME record ({}) does not contain a valid domain name", record)),
            "MX" => {
                let valid = match record.split_once(' ') {
                    Some((priority, host)) => {
                        priority.parse::<u16>().is_ok() && is_valid_domain(host.trim())
                    }
                    None => false,
                };
                (!valid).then(|| format!("MX record ({}) must be a priority and a domain name", record))
            }
            "TXT" => {
                let quoted = record.len() >= 2 && record.starts_with('"') && record.ends_with('"');
                (!quoted).then(|| format!("TXT record ({}) must be enclosed in double quotes", record))
            }
            _ => None,
        }
    }
}

impl LintRule for RecordSets {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3023",
            short_desc: "Validate that when specifying a Route53 RecordSet its records are valid",
            description: "Check record values against their record type and alias records against TTL and ResourceRecords",
            source_url: "https://docs.aws.amazon.com/Route53/latest/DeveloperGuide/ResourceRecordTypes.html",
            tags: &["resources", "route53", "record_set"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for record_set in cx.resources_of_type(RECORD_SET) {
            if present(record_set, "AliasTarget") {
                for property in ["ResourceRecords", "TTL"] {
                    if present(record_set, property) {
                        findings.push(Finding::on_property(
                            self.id(),
                            record_set,
                            &[property],
                            format!("{} must not be specified when AliasTarget is set", property),
                        ));
                    }
                }
                continue;
            }
            if !present(record_set, "ResourceRecords") {
                findings.push(Finding::on_resource(
                    self.id(),
                    record_set,
                    &["Properties"],
                    "ResourceRecords must be specified when AliasTarget is not set",
                ));
                continue;
            }

            let Some(record_type) = record_set.property_str("Type") else {
                continue;
            };
            let records = values_at(record_set, &["ResourceRecords", "*"]);
            if record_type == "CNAME" && records.len() > 1 {
                findings.push(Finding::on_property(
                    self.id(),
                    record_set,
                    &["ResourceRecords"],
                    "A CNAME record set can only contain one record",
                ));
            }
            for located in records {
                let Some(record) = located.value.as_str() else {
                    continue;
                };
                if let Some(message) = Self::check_record(record_type, record) {
                    findings.push(Finding::on_property(self.id(), record_set, &located.path, message));
                }
            }
        }
        findings
    }
}

/// E3041: record names live under the hosted zone name.
pub struct HostedZoneName;

impl LintRule for HostedZoneName {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3041",
            short_desc: "RecordSet HostedZoneName is a superdomain of Name",
            description: "In a RecordSet, the HostedZoneName must end with a dot and be a superdomain of the Name being validated",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-route53-recordset.html#cfn-route53-recordset-name",
            tags: &["resources", "route53", "record_set"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for record_set in cx.resources_of_type(RECORD_SET) {
            let Some(zone) = record_set.property_str("HostedZoneName") else {
                continue;
            };
            if !zone.ends_with('.') {
                findings.push(Finding::on_property(
                    self.id(),
                    record_set,
                    &["HostedZoneName"],
                    format!("HostedZoneName must end in a dot, found {}", zone),
                ));
                continue;
            }
            let Some(name) = record_set.property_str("Name") else {
                continue;
            };
            if !is_subdomain_of(name, zone) {
                findings.push(Finding::on_property(
                    self.id(),
                    record_set,
                    &["Name"],
                    format!("Name {} is not a subdomain of HostedZoneName {}", name, zone),
                ));
            }
        }
        findings
    }
}

/// E3503: ACM validation domains are superdomains of the validated name.
pub struct ValidationDomain;

impl LintRule for ValidationDomain {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3503",
            short_desc: "ValidationDomain is superdomain of DomainName",
            description: "In ValidationDomainOptions, the ValidationDomain must be a superdomain of the DomainName being validated",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-certificatemanager-certificate-domainvalidationoption.html#cfn-certificatemanager-certificate-domainvalidationoption-validationdomain",
            tags: &["resources", "certificatemanager", "certificate"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for certificate in cx.resources_of_type("AWS::CertificateManager::Certificate") {
            for located in values_at(certificate, &["DomainValidationOptions", "*"]) {
                let (Some(Value::String(domain)), Some(Value::String(validation))) = (
                    located.value.get("DomainName"),
                    located.value.get("ValidationDomain"),
                ) else {
                    continue;
                };
                let domain = domain.strip_prefix("*.").unwrap_or(domain);
                if !is_subdomain_of(domain, validation) {
                    let mut path = located.path.clone();
                    path.push("ValidationDomain".to_string());
                    findings.push(Finding::on_property(
                        self.id(),
                        certificate,
                        &path,
                        format!(
                            "ValidationDomain {} is not a superdomain of DomainName {}",
                            validation, domain
                        ),
                    ));
                }
            }
            // Alternative names also have to be valid domains.
            for (path, name) in strings_at(certificate, &["SubjectAlternativeNames", "*"]) {
                if !is_valid_domain(name) {
                    findings.push(Finding::on_property(
                        self.id(),
                        certificate,
                        &path,
                        format!("{} is not a valid domain name", name),
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

    fn messages(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.message.as_str()).collect()
    }

    #[test]
    fn test_record_values() {
        assert_eq!(RecordSets::check_record("A", "10.0.0.1"), None);
        assert!(RecordSets::check_record("A", "10.0.0.256").is_some());
        assert_eq!(RecordSets::check_record("AAAA", "2001:db8::1"), None);
        assert_eq!(RecordSets::check_record("MX", "10 mail.example.com"), None);
        assert!(RecordSets::check_record("MX", "mail.example.com").is_some());
        assert_eq!(RecordSets::check_record("TXT", "\"v=spf1 -all\""), None);
        assert!(RecordSets::check_record("TXT", "v=spf1 -all").is_some());
        assert_eq!(RecordSets::check_record("NS", "anything"), None);
    }

    #[test]
    fn test_record_set_structure() {
        let findings = run(
            &RecordSets,
            "Resources:
  Alias:
    Type: AWS::Route53::RecordSet
    Properties:
      HostedZoneName: example.com.
      Name: www.example.com
      Type: A
      TTL: '300'
      AliasTarget: {DNSName: d.cloudfront.net, HostedZoneId: Z2FDTNDATAQYW2}
  Cname:
    Type: AWS::Route53::RecordSet
    Properties:
      HostedZoneName: example.com.
      Name: api.example.com
      Type: CNAME
      TTL: '300'
      ResourceRecords: [a.example.com, b.example.com]
  Empty:
    Type: AWS::Route53::RecordSet
    Properties:
      HostedZoneName: example.com.
      Name: x.example.com
      Type: A
",
        );
        assert_eq!(
            messages(&findings),
            vec![
                "TTL must not be specified when AliasTarget is set",
                "A CNAME record set can only contain one record",
                "ResourceRecords must be specified when AliasTarget is not set",
            ]
        );
    }

    #[test]
    fn test_hosted_zone_name() {
        let findings = run(
            &HostedZoneName,
            "Resources:
  NoDot:
    Type: AWS::Route53::RecordSet
    Properties: {HostedZoneName: example.com, Name: www.example.com, Type: A, ResourceRecords: [10.0.0.1]}
  Outside:
    Type: AWS::Route53::RecordSet
    Properties: {HostedZoneName: example.com., Name: www.example.org, Type: A, ResourceRecords: [10.0.0.1]}
  Inside:
    Type: AWS::Route53::RecordSet
    Properties: {HostedZoneName: example.com., Name: www.example.com., Type: A, ResourceRecords: [10.0.0.1]}
",
        );
        assert_eq!(
            messages(&findings),
            vec![
                "HostedZoneName must end in a dot, found example.com",
                "Name www.example.org is not a subdomain of HostedZoneName example.com.",
            ]
        );
    }

    #[test]
    fn test_validation_domain() {
        let findings = run(
            &ValidationDomain,
            "Resources:
  Cert:
    Type: AWS::CertificateManager::Certificate
    Properties:
      DomainName: '*.example.com'
      SubjectAlternativeNames: [example.com, 'bad name']
      DomainValidationOptions:
        - {DomainName: '*.example.com', ValidationDomain: example.com}
        - {DomainName: example.com, ValidationDomain: other.com}
",
        );
        assert_eq!(
            messages(&findings),
            vec![
                "ValidationDomain other.com is not a superdomain of DomainName example.com",
                "bad name is not a valid domain name",
            ]
        );
    }
}
