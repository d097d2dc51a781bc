use serde_json::Value;

/// Specific CreationPolicy configurations and the resource types that take them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPolicyType {
    ResourceSignal,
    AutoScalingCreationPolicy,
    StartFleet,
}

impl CreationPolicyType {
    pub const ALL: [CreationPolicyType; 3] = [
        CreationPolicyType::ResourceSignal,
        CreationPolicyType::AutoScalingCreationPolicy,
        CreationPolicyType::StartFleet,
    ];

    /// The key used under `CreationPolicy`.
    pub fn key(&self) -> &'static str {
        match self {
            CreationPolicyType::ResourceSignal => "ResourceSignal",
            CreationPolicyType::AutoScalingCreationPolicy => "AutoScalingCreationPolicy",
            CreationPolicyType::StartFleet => "StartFleet",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|policy| policy.key() == key)
    }
}

/// Specific UpdatePolicy configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicyType {
    AutoScalingRollingUpdate,
    AutoScalingReplacingUpdate,
    AutoScalingScheduledAction,
    CodeDeployLambdaAliasUpdate,
    UseOnlineResharding,
    EnableVersionUpgrade,
}

impl UpdatePolicyType {
    pub const ALL: [UpdatePolicyType; 6] = [
        UpdatePolicyType::AutoScalingRollingUpdate,
        UpdatePolicyType::AutoScalingReplacingUpdate,
        UpdatePolicyType::AutoScalingScheduledAction,
        UpdatePolicyType::CodeDeployLambdaAliasUpdate,
        UpdatePolicyType::UseOnlineResharding,
        UpdatePolicyType::EnableVersionUpgrade,
    ];

    /// The key used under `UpdatePolicy`.
    pub fn key(&self) -> &'static str {
        match self {
            UpdatePolicyType::AutoScalingRollingUpdate => "AutoScalingRollingUpdate",
            UpdatePolicyType::AutoScalingReplacingUpdate => "AutoScalingReplacingUpdate",
            UpdatePolicyType::AutoScalingScheduledAction => "AutoScalingScheduledAction",
            UpdatePolicyType::CodeDeployLambdaAliasUpdate => "CodeDeployLambdaAliasUpdate",
            UpdatePolicyType::UseOnlineResharding => "UseOnlineResharding",
            UpdatePolicyType::EnableVersionUpgrade => "EnableVersionUpgrade",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|policy| policy.key() == key)
    }
}

/// Values accepted by `DeletionPolicy`.
pub const DELETION_POLICIES: &[&str] = &["Delete", "Retain", "Snapshot", "RetainExceptOnCreate"];

/// Values accepted by `UpdateReplacePolicy`.
pub const UPDATE_REPLACE_POLICIES: &[&str] = &["Delete", "Retain", "Snapshot"];

/// Resource type awareness utility for CloudFormation policies
pub struct ResourcePolicyManager;

impl ResourcePolicyManager {
    /// Returns true if the given resource type supports CreationPolicy
    pub fn supports_creation_policy(resource_type: &str) -> bool {
        !Self::get_creation_policy_types(resource_type).is_empty()
    }

    /// Returns true if the given resource type supports UpdatePolicy
    pub fn supports_update_policy(resource_type: &str) -> bool {
        !Self::get_update_policy_types(resource_type).is_empty()
    }

    /// Returns the available CreationPolicy configurations for a resource type
    pub fn get_creation_policy_types(resource_type: &str) -> Vec<CreationPolicyType> {
        match resource_type {
            "AWS::AutoScaling::AutoScalingGroup" => vec![
                CreationPolicyType::ResourceSignal,
                CreationPolicyType::AutoScalingCreationPolicy,
            ],
            "AWS::EC2::Instance" | "AWS::CloudFormation::WaitCondition" => {
                vec![CreationPolicyType::ResourceSignal]
            }
            "AWS::AppStream::Fleet" => vec![CreationPolicyType::StartFleet],
            _ => vec![],
        }
    }

    /// Returns the available UpdatePolicy configurations for a resource type
    pub fn get_update_policy_types(resource_type: &str) -> Vec<UpdatePolicyType> {
        match resource_type {
            "AWS::AutoScaling::AutoScalingGroup" => vec![
                UpdatePolicyType::AutoScalingRollingUpdate,
                UpdatePolicyType::AutoScalingReplacingUpdate,
                UpdatePolicyType::AutoScalingScheduledAction,
            ],
            "AWS::Lambda::Alias" => vec![UpdatePolicyType::CodeDeployLambdaAliasUpdate],
            "AWS::ElastiCache::ReplicationGroup" => vec![UpdatePolicyType::UseOnlineResharding],
            "AWS::OpenSearchService::Domain" | "AWS::Elasticsearch::Domain" => {
                vec![UpdatePolicyType::EnableVersionUpgrade]
            }
            _ => vec![],
        }
    }

    /// Validate the body of one CreationPolicy entry.
    ///
    /// Values that are intrinsics or of a shape the check does not know are
    /// accepted; the caller only reports the returned message.
    pub fn validate_creation_policy_config(
        policy_type: CreationPolicyType,
        config: &Value,
    ) -> Result<(), String> {
        match policy_type {
            CreationPolicyType::AutoScalingCreationPolicy => {
                let Some(config) = config.as_object() else {
                    return Err("AutoScalingCreationPolicy must be a mapping".to_string());
                };
                if let Some(val) = config
                    .get("MinSuccessfulInstancesPercent")
                    .and_then(Value::as_i64)
                {
                    if !(0..=100).contains(&val) {
                        return Err(
                            "MinSuccessfulInstancesPercent must be between 0 and 100".to_string()
                        );
                    }
                }
                Ok(())
            }
            CreationPolicyType::ResourceSignal => {
                let Some(config) = config.as_object() else {
                    return Err("ResourceSignal must be a mapping".to_string());
                };
                for key in config.keys() {
                    if key != "Count" && key != "Timeout" {
                        return Err(format!("ResourceSignal does not support key {}", key));
                    }
                }
                if let Some(val) = config.get("Count").and_then(Value::as_i64) {
                    if val < 1 {
                        return Err("ResourceSignal Count must be greater than 0".to_string());
                    }
                }
                if let Some(timeout) = config.get("Timeout").and_then(Value::as_str) {
                    if !is_iso8601_duration(timeout) {
                        return Err(format!(
                            "ResourceSignal Timeout {} is not an ISO 8601 duration",
                            timeout
                        ));
                    }
                }
                Ok(())
            }
            CreationPolicyType::StartFleet => match config {
                Value::Bool(_) | Value::Object(_) => Ok(()),
                _ => Err("StartFleet must be a boolean".to_string()),
            },
        }
    }

    /// Returns resources that support the Snapshot deletion policy
    pub fn supports_snapshot_policy(resource_type: &str) -> bool {
        matches!(
            resource_type,
            "AWS::EC2::Volume"
                | "AWS::ElastiCache::CacheCluster"
                | "AWS::ElastiCache::ReplicationGroup"
                | "AWS::DocDB::DBCluster"
                | "AWS::Neptune::DBCluster"
                | "AWS::RDS::DBCluster"
                | "AWS::RDS::DBInstance"
                | "AWS::Redshift::Cluster"
        )
    }
}

/// `PT#H#M#S` style durations used by ResourceSignal timeouts.
fn is_iso8601_duration(text: &str) -> bool {
    let Some(rest) = text.strip_prefix("PT") else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    let mut digits = 0;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits += 1,
            'H' | 'M' | 'S' if digits > 0 => digits = 0,
            _ => return false,
        }
    }
    digits == 0
}
