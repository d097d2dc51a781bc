//! RDS engine rules.

use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![Box::new(Engines), Box::new(EngineInstanceFamilies)]
}

const ENGINES: &[&str] = &[
    "aurora",
    "aurora-mysql",
    "aurora-postgresql",
    "custom-oracle-ee",
    "custom-oracle-ee-cdb",
    "custom-oracle-se2",
    "custom-oracle-se2-cdb",
    "custom-sqlserver-ee",
    "custom-sqlserver-se",
    "custom-sqlserver-web",
    "db2-ae",
    "db2-se",
    "mariadb",
    "mysql",
    "oracle-ee",
    "oracle-ee-cdb",
    "oracle-se2",
    "oracle-se2-cdb",
    "postgres",
    "sqlserver-ee",
    "sqlserver-ex",
    "sqlserver-se",
    "sqlserver-web",
];

/// E3690: engine names.
pub struct Engines;

impl LintRule for Engines {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3690",
            short_desc: "Validate DB Cluster Engine is valid",
            description: "Check the RDS engine of a DB instance or DB cluster is a known engine",
            source_url: "https://docs.aws.amazon.com/AmazonRDS/latest/APIReference/API_CreateDBInstance.html",
            tags: &["resources", "rds"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in cx.resources() {
            if resource.resource_type != "AWS::RDS::DBInstance"
                && resource.resource_type != "AWS::RDS::DBCluster"
            {
                continue;
            }
            let Some(engine) = resource.property_str("Engine") else {
                continue;
            };
            if !ENGINES.contains(&engine.to_ascii_lowercase().as_str()) {
                findings.push(Finding::on_property(
                    self.id(),
                    resource,
                    &["Engine"],
                    format!("{} is not a valid RDS engine", engine),
                ));
            }
        }
        findings
    }
}

/// E3691: instance families an engine runs on.
pub struct EngineInstanceFamilies;

impl EngineInstanceFamilies {
    /// Engine prefix and the instance families it supports. Engines not
    /// listed run on every family.
    const SUPPORTED: &'static [(&'static str, &'static [&'static str])] = &[
        (
            "aurora",
            &["db.r4", "db.r5", "db.r6g", "db.r6i", "db.r7g", "db.r7i", "db.r8g", "db.t2", "db.t3", "db.t4g", "db.x2g"],
        ),
        ("custom-", &["db.m5", "db.m6i", "db.r5", "db.r5b", "db.r6i", "db.x2iedn"]),
        ("db2-", &["db.m6i", "db.m6in", "db.r6i", "db.r6in", "db.x2iedn"]),
        ("sqlserver-ex", &["db.t2", "db.t3"]),
    ];

    fn family(instance_class: &str) -> Option<&str> {
        let mut parts = instance_class.splitn(3, '.');
        let prefix = parts.next()?;
        let family = parts.next()?;
        parts.next()?;
        Some(&instance_class[..prefix.len() + 1 + family.len()])
    }
}

impl LintRule for EngineInstanceFamilies {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3691",
            short_desc: "Validate DB instance class is supported by the engine",
            description: "Check the instance family of an RDS DB instance is supported by its engine",
            source_url: "https://docs.aws.amazon.com/AmazonRDS/latest/UserGuide/Concepts.DBInstanceClass.Support.html",
            tags: &["resources", "rds"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for instance in cx.resources_of_type("AWS::RDS::DBInstance") {
            let (Some(engine), Some(instance_class)) =
                (instance.property_str("Engine"), instance.property_str("DBInstanceClass"))
            else {
                continue;
            };
            if instance_class == "db.serverless" {
                continue;
            }
            let engine_lower = engine.to_ascii_lowercase();
            let Some((_, families)) = Self::SUPPORTED
                .iter()
                .find(|(prefix, _)| engine_lower.starts_with(prefix))
            else {
                continue;
            };
            let Some(family) = Self::family(instance_class) else {
                continue;
            };
            if !families.contains(&family) {
                findings.push(Finding::on_property(
                    self.id(),
                    instance,
                    &["DBInstanceClass"],
                    format!(
                        "DBInstanceClass {} is not supported for engine {}",
                        instance_class, engine
                    ),
                ));
            }
        }
        findings
    }
}
