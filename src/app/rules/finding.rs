//! Findings produced by lint rules.

use serde::Serialize;
use std::fmt;

use crate::app::cfn_node::Node;
use crate::app::cfn_template::Resource;

/// Severity levels, derived from the first letter of a rule id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Informational,
}

impl Severity {
    /// `E` → Error, `W` → Warning, `I` → Informational. Anything else is an
    /// error so unknown prefixes are never silently downgraded.
    pub fn from_rule_id(rule_id: &str) -> Self {
        match rule_id.chars().next() {
            Some('W') => Severity::Warning,
            Some('I') => Severity::Informational,
            _ => Severity::Error,
        }
    }

    /// Exit-code bit contributed by findings of this severity.
    pub fn exit_bit(&self) -> i32 {
        match self {
            Severity::Error => 2,
            Severity::Warning => 4,
            Severity::Informational => 8,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Informational => "informational",
        };
        f.write_str(name)
    }
}

/// A single diagnostic anchored to a location in the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Id of the rule that produced the finding
    pub rule_id: String,
    /// One-line, human-readable description of the problem
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Breadcrumb from the template root, e.g. `["Resources", "Bucket", "Properties"]`
    pub path: Vec<String>,
    pub severity: Severity,
}

impl Finding {
    /// A finding anchored at `node`.
    pub fn new(rule_id: &str, message: impl Into<String>, node: &Node, path: Vec<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            message: message.into(),
            line: node.line.max(1),
            column: node.column.max(1),
            path,
            severity: Severity::from_rule_id(rule_id),
        }
    }

    /// A finding about a resource attribute. `rest` is relative to the
    /// resource entry, e.g. `["DeletionPolicy"]`.
    pub fn on_resource<S: AsRef<str>>(
        rule_id: &str,
        resource: &Resource,
        rest: &[S],
        message: impl Into<String>,
    ) -> Self {
        let mut path = resource.path();
        path.extend(rest.iter().map(|s| s.as_ref().to_string()));
        Self::new(rule_id, message, resource.locate(rest), path)
    }

    /// A finding about a property. `rest` is relative to `Properties`.
    pub fn on_property<S: AsRef<str>>(
        rule_id: &str,
        resource: &Resource,
        rest: &[S],
        message: impl Into<String>,
    ) -> Self {
        let mut located = vec!["Properties".to_string()];
        located.extend(rest.iter().map(|s| s.as_ref().to_string()));
        Self::new(
            rule_id,
            message,
            resource.locate(&located),
            resource.property_path(rest),
        )
    }

    /// Whether the finding is about something under `Resources.<logical_id>`.
    pub fn is_under_resource(&self, logical_id: &str) -> bool {
        self.path.len() >= 2 && self.path[0] == "Resources" && self.path[1] == logical_id
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{} {}",
            self.rule_id, self.severity, self.line, self.column, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cfn_template::Template;

    #[test]
    fn test_severity_from_prefix() {
        assert_eq!(Severity::from_rule_id("E3012"), Severity::Error);
        assert_eq!(Severity::from_rule_id("W2001"), Severity::Warning);
        assert_eq!(Severity::from_rule_id("I3042"), Severity::Informational);
        assert_eq!(Severity::from_rule_id(""), Severity::Error);
    }

    #[test]
    fn test_property_finding_location() {
        let template = Template::parse(
            "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n    Properties:\n      BucketName: x\n",
        )
        .unwrap();
        let bucket = &template.resources["Bucket"];
        let finding = Finding::on_property("E3033", bucket, &["BucketName"], "too short");
        assert_eq!(finding.line, 5);
        assert_eq!(finding.column, 19);
        assert_eq!(
            finding.path,
            vec!["Resources", "Bucket", "Properties", "BucketName"]
        );
        assert!(finding.is_under_resource("Bucket"));
        assert!(!finding.is_under_resource("Other"));
    }
}
