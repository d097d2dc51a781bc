//! S3 and AWS Backup lifecycle rules.

use serde_json::Value;

use super::values_at;
use crate::app::predicates::{to_f64, to_i64};
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![Box::new(IntelligentTieringDays), Box::new(BackupColdStorage)]
}

/// E3074: Intelligent-Tiering archive days per access tier.
pub struct IntelligentTieringDays;

impl IntelligentTieringDays {
    /// Access tier with the inclusive day range it accepts.
    const RANGES: &'static [(&'static str, i64, i64)] =
        &[("ARCHIVE_ACCESS", 90, 730), ("DEEP_ARCHIVE_ACCESS", 180, 730)];
}

impl LintRule for IntelligentTieringDays {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3074",
            short_desc: "Validate S3 Intelligent-Tiering days for each access tier",
            description: "Days for the ARCHIVE_ACCESS tier must be between 90 and 730, for DEEP_ARCHIVE_ACCESS between 180 and 730",
            source_url: "https://docs.aws.amazon.com/AmazonS3/latest/userguide/intelligent-tiering-overview.html",
            tags: &["resources", "s3"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for bucket in cx.resources_of_type("AWS::S3::Bucket") {
            let tierings = values_at(bucket, &["IntelligentTieringConfigurations", "*", "Tierings", "*"]);
            for located in tierings {
                let Some(tier) = located.value.get("AccessTier").and_then(Value::as_str) else {
                    continue;
                };
                let Some(days) = located.value.get("Days").and_then(to_i64) else {
                    continue;
                };
                let Some((_, low, high)) = Self::RANGES.iter().find(|(name, ..)| *name == tier) else {
                    continue;
                };
                if days < *low || days > *high {
                    let mut path = located.path.clone();
                    path.push("Days".to_string());
                    findings.push(Finding::on_property(
                        self.id(),
                        bucket,
                        &path,
                        format!(
                            "Days for {} must be between {} and {}, found {}",
                            tier, low, high, days
                        ),
                    ));
                }
            }
        }
        findings
    }
}

/// E3504: backups stay in cold storage for at least 90 days.
pub struct BackupColdStorage;

impl BackupColdStorage {
    const MINIMUM_COLD_DAYS: f64 = 90.0;
}

impl LintRule for BackupColdStorage {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3504",
            short_desc: "Check minimum 90 period is met between BackupPlan cold and delete",
            description: "Check that Backup plans with lifecycle rules have >= 90 days between cold and delete",
            source_url: "https://docs.aws.amazon.com/aws-backup/latest/devguide/API_Lifecycle.html",
            tags: &["properties", "backup", "plan", "lifecycle"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for plan in cx.resources_of_type("AWS::Backup::BackupPlan") {
            for located in values_at(plan, &["BackupPlan", "BackupPlanRule", "*", "Lifecycle"]) {
                let cold = located.value.get("MoveToColdStorageAfterDays").and_then(to_f64);
                let delete = located.value.get("DeleteAfterDays").and_then(to_f64);
                let (Some(cold), Some(delete)) = (cold, delete) else {
                    continue;
                };
                if delete - cold < Self::MINIMUM_COLD_DAYS {
                    findings.push(Finding::on_property(
                        self.id(),
                        plan,
                        &located.path,
                        "DeleteAfterDays in Lifecycle must be at least 90 days after MoveToColdStorageAfterDays",
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
    fn test_intelligent_tiering_days() {
        let findings = run(
            &IntelligentTieringDays,
            "Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      IntelligentTieringConfigurations:
        - Id: archive
          Status: Enabled
          Tierings:
            - {AccessTier: ARCHIVE_ACCESS, Days: 30}
            - {AccessTier: DEEP_ARCHIVE_ACCESS, Days: 180}
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Days for ARCHIVE_ACCESS must be between 90 and 730, found 30");
        assert_eq!(
            findings[0].path.join("/"),
            "Resources/Bucket/Properties/IntelligentTieringConfigurations/0/Tierings/0/Days"
        );
    }

    #[test]
    fn test_backup_cold_storage_gap() {
        let plan = |cold: u32, delete: u32| {
            format!(
                "Resources:
  Plan:
    Type: AWS::Backup::BackupPlan
    Properties:
      BackupPlan:
        BackupPlanName: daily
        BackupPlanRule:
          - RuleName: daily
            TargetBackupVault: vault
            Lifecycle: {{MoveToColdStorageAfterDays: {}, DeleteAfterDays: {}}}
",
                cold, delete
            )
        };
        assert_eq!(run(&BackupColdStorage, &plan(30, 60)).len(), 1);
        assert!(run(&BackupColdStorage, &plan(30, 120)).is_empty());
    }
}
