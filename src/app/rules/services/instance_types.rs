//! Instance class and node type catalogs.
//!
//! A catalog names the families a service offers; the size after the family
//! is not checked, so new sizes of a known family are accepted.

use super::strings_at;
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

/// How an instance type string is validated.
#[derive(Debug, Clone, Copy)]
pub enum Catalog {
    /// `<prefix><family>.<size>` with a known family, or one of `exact`.
    Families {
        prefix: &'static str,
        families: &'static [&'static str],
        exact: &'static [&'static str],
    },
    /// Any value ending in the suffix, with something before it.
    Suffix(&'static str),
}

impl Catalog {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Catalog::Families {
                prefix,
                families,
                exact,
            } => {
                if exact.contains(&value) {
                    return true;
                }
                let Some(rest) = value.strip_prefix(prefix) else {
                    return false;
                };
                match rest.split_once('.') {
                    Some((family, size)) => !size.is_empty() && families.contains(&family),
                    None => false,
                }
            }
            Catalog::Suffix(suffix) => value.len() > suffix.len() && value.ends_with(suffix),
        }
    }
}

/// A rule validating instance types at fixed property paths.
pub struct InstanceTypeRule {
    info: RuleInfo,
    /// Resource type and property path (`*` steps into lists).
    locations: &'static [(&'static str, &'static [&'static str])],
    noun: &'static str,
    catalog: Catalog,
}

impl LintRule for InstanceTypeRule {
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
                for (at, value) in strings_at(resource, path) {
                    if !self.catalog.accepts(value) {
                        findings.push(Finding::on_property(
                            self.info.id,
                            resource,
                            &at,
                            format!("{} is not a valid {}", value, self.noun),
                        ));
                    }
                }
            }
        }
        findings
    }
}

const EC2_FAMILIES: &[&str] = &[
    "a1", "c1", "c3", "c4", "c5", "c5a", "c5ad", "c5d", "c5n", "c6a", "c6g", "c6gd", "c6gn", "c6i",
    "c6id", "c6in", "c7a", "c7g", "c7gd", "c7gn", "c7i", "c7i-flex", "c8g", "d2", "d3", "d3en", "dl1",
    "f1", "f2", "g3", "g3s", "g4ad", "g4dn", "g5", "g5g", "g6", "g6e", "gr6", "h1", "hpc6a", "hpc6id",
    "hpc7a", "hpc7g", "i2", "i3", "i3en", "i4g", "i4i", "i7ie", "im4gn", "inf1", "inf2", "is4gen",
    "m1", "m2", "m3", "m4", "m5", "m5a", "m5ad", "m5d", "m5dn", "m5n", "m5zn", "m6a", "m6g", "m6gd",
    "m6i", "m6id", "m6idn", "m6in", "m7a", "m7g", "m7gd", "m7i", "m7i-flex", "m8g", "mac1", "mac2",
    "p2", "p3", "p3dn", "p4d", "p4de", "p5", "r3", "r4", "r5", "r5a", "r5ad", "r5b", "r5d", "r5dn",
    "r5n", "r6a", "r6g", "r6gd", "r6i", "r6id", "r6idn", "r6in", "r7a", "r7g", "r7gd", "r7i", "r7iz",
    "r8g", "t1", "t2", "t3", "t3a", "t4g", "trn1", "trn1n", "u-3tb1", "u-6tb1", "u-9tb1", "u-12tb1",
    "u-18tb1", "u-24tb1", "vt1", "x1", "x1e", "x2gd", "x2idn", "x2iedn", "x2iezn", "x8g", "z1d",
];

const RDS_FAMILIES: &[&str] = &[
    "c6gd", "m1", "m2", "m3", "m4", "m5", "m5d", "m6g", "m6gd", "m6i", "m6id", "m6idn", "m6in", "m7g",
    "m7i", "r3", "r4", "r5", "r5b", "r5d", "r6g", "r6gd", "r6i", "r6id", "r6idn", "r6in", "r7g", "r7i",
    "r8g", "t2", "t3", "t4g", "x1", "x1e", "x2g", "x2idn", "x2iedn", "x2iezn", "z1d",
];

pub fn rules() -> Vec<Box<dyn LintRule>> {
    let rules = [
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3025",
                short_desc: "RDS DB Instance Class is valid",
                description: "Check the RDS DB instance class belongs to a known instance family",
                source_url: "https://docs.aws.amazon.com/AmazonRDS/latest/UserGuide/Concepts.DBInstanceClass.html",
                tags: &["resources", "rds"],
            },
            locations: &[
                ("AWS::RDS::DBInstance", &["DBInstanceClass"]),
                ("AWS::RDS::DBCluster", &["DBClusterInstanceClass"]),
            ],
            noun: "RDS instance class",
            catalog: Catalog::Families {
                prefix: "db.",
                families: RDS_FAMILIES,
                exact: &["db.serverless"],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3026",
                short_desc: "Check ElastiCache node types",
                description: "Check the ElastiCache node type belongs to a known node family",
                source_url: "https://docs.aws.amazon.com/AmazonElastiCache/latest/red-ug/CacheNodes.SupportedTypes.html",
                tags: &["resources", "elasticache"],
            },
            locations: &[
                ("AWS::ElastiCache::CacheCluster", &["CacheNodeType"]),
                ("AWS::ElastiCache::ReplicationGroup", &["CacheNodeType"]),
            ],
            noun: "ElastiCache node type",
            catalog: Catalog::Families {
                prefix: "cache.",
                families: &[
                    "c1", "c7gn", "m1", "m2", "m3", "m4", "m5", "m6g", "m7g", "r3", "r4", "r5", "r6g",
                    "r6gd", "r7g", "t1", "t2", "t3", "t4g",
                ],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3029",
                short_desc: "Validate EC2 instance types",
                description: "Check the EC2 instance type belongs to a known instance family",
                source_url: "https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instance-types.html",
                tags: &["resources", "ec2"],
            },
            locations: &[
                ("AWS::EC2::Instance", &["InstanceType"]),
                ("AWS::AutoScaling::LaunchConfiguration", &["InstanceType"]),
            ],
            noun: "EC2 instance type",
            catalog: Catalog::Families {
                prefix: "",
                families: EC2_FAMILIES,
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3062",
                short_desc: "Validate DocumentDB instance class",
                description: "Check the DocumentDB instance class belongs to a supported family",
                source_url: "https://docs.aws.amazon.com/documentdb/latest/developerguide/db-instance-classes.html",
                tags: &["resources", "docdb"],
            },
            locations: &[("AWS::DocDB::DBInstance", &["DBInstanceClass"])],
            noun: "DocumentDB instance class",
            catalog: Catalog::Families {
                prefix: "db.",
                families: &["r4", "r5", "r6g", "r6gd", "t3", "t4g"],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3063",
                short_desc: "Validate Neptune instance class",
                description: "Check the Neptune instance class belongs to a supported family",
                source_url: "https://docs.aws.amazon.com/neptune/latest/userguide/instance-types.html",
                tags: &["resources", "neptune"],
            },
            locations: &[("AWS::Neptune::DBInstance", &["DBInstanceClass"])],
            noun: "Neptune instance class",
            catalog: Catalog::Families {
                prefix: "db.",
                families: &["r4", "r5", "r5d", "r6g", "r6i", "t3", "t4g", "x2g", "x2iedn"],
                exact: &["db.serverless"],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3064",
                short_desc: "Validate Redshift node type",
                description: "Check the Redshift cluster node type belongs to a supported family",
                source_url: "https://docs.aws.amazon.com/redshift/latest/mgmt/working-with-clusters.html#working-with-clusters-overview",
                tags: &["resources", "redshift"],
            },
            locations: &[("AWS::Redshift::Cluster", &["NodeType"])],
            noun: "Redshift node type",
            catalog: Catalog::Families {
                prefix: "",
                families: &["dc1", "dc2", "ds2", "ra3"],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3065",
                short_desc: "Validate DAX node type",
                description: "Check the DAX cluster node type belongs to a supported family",
                source_url: "https://docs.aws.amazon.com/amazondynamodb/latest/developerguide/DAX.concepts.cluster.html#DAX.concepts.node-types",
                tags: &["resources", "dax"],
            },
            locations: &[("AWS::DAX::Cluster", &["NodeType"])],
            noun: "DAX node type",
            catalog: Catalog::Families {
                prefix: "dax.",
                families: &["r4", "r5", "t2", "t3"],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3066",
                short_desc: "Validate AppStream fleet instance type",
                description: "Check the AppStream fleet instance type belongs to a supported family",
                source_url: "https://aws.amazon.com/appstream2/pricing/",
                tags: &["resources", "appstream"],
            },
            locations: &[("AWS::AppStream::Fleet", &["InstanceType"])],
            noun: "AppStream instance type",
            catalog: Catalog::Families {
                prefix: "stream.",
                families: &[
                    "compute",
                    "graphics",
                    "graphics-design",
                    "graphics-desktop",
                    "graphics-pro",
                    "memory",
                    "standard",
                ],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3067",
                short_desc: "Validate Managed Blockchain instance type",
                description: "Check the Managed Blockchain node instance type belongs to a supported family",
                source_url: "https://aws.amazon.com/managed-blockchain/pricing/hyperledger/",
                tags: &["resources", "managedblockchain"],
            },
            locations: &[("AWS::ManagedBlockchain::Node", &["NodeConfiguration", "InstanceType"])],
            noun: "Managed Blockchain instance type",
            catalog: Catalog::Families {
                prefix: "bc.",
                families: &["c5", "m5", "t3"],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3068",
                short_desc: "Validate GameLift fleet EC2 instance type",
                description: "Check the GameLift fleet EC2 instance type belongs to a supported family",
                source_url: "https://docs.aws.amazon.com/gamelift/latest/developerguide/gamelift-compute.html",
                tags: &["resources", "gamelift"],
            },
            locations: &[("AWS::GameLift::Fleet", &["EC2InstanceType"])],
            noun: "GameLift instance type",
            catalog: Catalog::Families {
                prefix: "",
                families: &[
                    "c3", "c4", "c5", "c5a", "c5d", "c6a", "c6g", "c6gn", "c6i", "c7g", "m3", "m4", "m5",
                    "m5a", "m5d", "m6g", "m6i", "m7g", "r3", "r4", "r5", "r5a", "r5d", "r6g", "r6i",
                    "r7g", "t2",
                ],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3069",
                short_desc: "Validate Amazon MQ broker host instance type",
                description: "Check the Amazon MQ broker host instance type belongs to a supported family",
                source_url: "https://docs.aws.amazon.com/amazon-mq/latest/developer-guide/broker-instance-types.html",
                tags: &["resources", "amazonmq"],
            },
            locations: &[("AWS::AmazonMQ::Broker", &["HostInstanceType"])],
            noun: "Amazon MQ host instance type",
            catalog: Catalog::Families {
                prefix: "mq.",
                families: &["m4", "m5", "m7g", "t2", "t3"],
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3070",
                short_desc: "Validate EMR instance types",
                description: "Check the instance types of EMR instance groups belong to a known EC2 family",
                source_url: "https://docs.aws.amazon.com/emr/latest/ManagementGuide/emr-supported-instance-types.html",
                tags: &["resources", "emr"],
            },
            locations: &[
                ("AWS::EMR::Cluster", &["Instances", "MasterInstanceGroup", "InstanceType"]),
                ("AWS::EMR::Cluster", &["Instances", "CoreInstanceGroup", "InstanceType"]),
                ("AWS::EMR::Cluster", &["Instances", "TaskInstanceGroups", "*", "InstanceType"]),
                ("AWS::EMR::InstanceGroupConfig", &["InstanceType"]),
            ],
            noun: "EMR instance type",
            catalog: Catalog::Families {
                prefix: "",
                families: EC2_FAMILIES,
                exact: &[],
            },
        },
        InstanceTypeRule {
            info: RuleInfo {
                id: "E3071",
                short_desc: "Validate Elasticsearch instance types",
                description: "Elasticsearch domain instance types end with .elasticsearch",
                source_url: "https://docs.aws.amazon.com/opensearch-service/latest/developerguide/supported-instance-types.html",
                tags: &["resources", "elasticsearch"],
            },
            locations: &[
                ("AWS::Elasticsearch::Domain", &["ElasticsearchClusterConfig", "InstanceType"]),
                ("AWS::Elasticsearch::Domain", &["ElasticsearchClusterConfig", "DedicatedMasterType"]),
                ("AWS::Elasticsearch::Domain", &["ElasticsearchClusterConfig", "WarmType"]),
            ],
            noun: "Elasticsearch instance type",
            catalog: Catalog::Suffix(".elasticsearch"),
        },
    ];
    rules
        .into_iter()
        .map(|rule| Box::new(rule) as Box<dyn LintRule>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cfn_resources::schema;
    use crate::app::cfn_template::Template;
    use pretty_assertions::assert_eq;

    fn run(id: &str, source: &str) -> Vec<Finding> {
        let template = Template::parse(source).unwrap();
        let rule = rules().into_iter().find(|rule| rule.id() == id).unwrap();
        rule.check(&RuleContext::new(&template, schema()))
    }

    #[test]
    fn test_family_catalog() {
        let catalog = Catalog::Families {
            prefix: "db.",
            families: &["r5", "t3"],
            exact: &["db.serverless"],
        };
        assert!(catalog.accepts("db.r5.large"));
        assert!(catalog.accepts("db.serverless"));
        assert!(!catalog.accepts("db.r5"));
        assert!(!catalog.accepts("db.r5."));
        assert!(!catalog.accepts("db.r99.large"));
        assert!(!catalog.accepts("r5.large"));
    }

    #[test]
    fn test_suffix_catalog() {
        let catalog = Catalog::Suffix(".elasticsearch");
        assert!(catalog.accepts("m5.large.elasticsearch"));
        assert!(!catalog.accepts("m5.large.search"));
        assert!(!catalog.accepts(".elasticsearch"));
    }

    #[test]
    fn test_ec2_instance_type() {
        let findings = run(
            "E3029",
            "Resources:
  Good:
    Type: AWS::EC2::Instance
    Properties: {ImageId: ami-1, InstanceType: t3.micro}
  Bad:
    Type: AWS::EC2::Instance
    Properties: {ImageId: ami-1, InstanceType: t9.micro}
  Param:
    Type: AWS::EC2::Instance
    Properties: {ImageId: ami-1, InstanceType: !Ref Type}
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "t9.micro is not a valid EC2 instance type");
        assert_eq!(findings[0].path, vec!["Resources", "Bad", "Properties", "InstanceType"]);
    }

    #[test]
    fn test_rds_instance_class_on_cluster() {
        let findings = run(
            "E3025",
            "Resources:
  Cluster:
    Type: AWS::RDS::DBCluster
    Properties: {Engine: aurora-mysql, DBClusterInstanceClass: db.q1.large}
  Serverless:
    Type: AWS::RDS::DBInstance
    Properties: {Engine: aurora-mysql, DBInstanceClass: db.serverless}
",
        );
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["db.q1.large is not a valid RDS instance class"]);
    }

    #[test]
    fn test_emr_task_groups() {
        let findings = run(
            "E3070",
            "Resources:
  Cluster:
    Type: AWS::EMR::Cluster
    Properties:
      Name: c
      JobFlowRole: r
      ServiceRole: s
      Instances:
        MasterInstanceGroup: {InstanceType: m5.xlarge, InstanceCount: 1}
        TaskInstanceGroups:
          - {InstanceType: m5.xlarge, InstanceCount: 1}
          - {InstanceType: bogus, InstanceCount: 1}
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].path.join("/"),
            "Resources/Cluster/Properties/Instances/TaskInstanceGroups/1/InstanceType"
        );
    }

    #[test]
    fn test_elasticsearch_suffix() {
        let findings = run(
            "E3071",
            "Resources:
  Domain:
    Type: AWS::Elasticsearch::Domain
    Properties:
      ElasticsearchClusterConfig:
        InstanceType: m5.large.search
        DedicatedMasterType: m5.large.elasticsearch
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "m5.large.search is not a valid Elasticsearch instance type");
    }
}
