//! ECS task definition rules.

use serde_json::Value;

use super::values_at;
use crate::app::cfn_intrinsic_functions::is_intrinsic;
use crate::app::predicates::to_i64;
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![Box::new(AwsLogsOptions), Box::new(FargateCpuMemory)]
}

const TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";

/// E3046: the awslogs driver needs a group and a region.
pub struct AwsLogsOptions;

impl AwsLogsOptions {
    const REQUIRED: &'static [&'static str] = &["awslogs-group", "awslogs-region"];
}

impl LintRule for AwsLogsOptions {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3046",
            short_desc: "Validate ECS task logging configuration for awslogs",
            description: "When using the awslogs log driver, awslogs-group and awslogs-region are required options",
            source_url: "https://docs.aws.amazon.com/AmazonECS/latest/developerguide/using_awslogs.html",
            tags: &["resources", "ecs", "logging"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for task in cx.resources_of_type(TASK_DEFINITION) {
            for located in values_at(task, &["ContainerDefinitions", "*", "LogConfiguration"]) {
                let Some(config) = located.value.as_object() else {
                    continue;
                };
                if config.get("LogDriver").and_then(Value::as_str) != Some("awslogs") {
                    continue;
                }
                let options = match config.get("Options") {
                    None => None,
                    Some(options) if is_intrinsic(options) => continue,
                    Some(options) => options.as_object(),
                };
                for option in Self::REQUIRED {
                    if options.map_or(false, |options| options.contains_key(*option)) {
                        continue;
                    }
                    findings.push(Finding::on_property(
                        self.id(),
                        task,
                        &located.path,
                        format!("{} must be specified in Options when LogDriver is awslogs", option),
                    ));
                }
            }
        }
        findings
    }
}

/// E3047: Fargate CPU and memory combinations.
pub struct FargateCpuMemory;

impl FargateCpuMemory {
    /// CPU units and every memory size (MiB) Fargate accepts with them.
    const COMBINATIONS: &'static [(i64, &'static [i64])] = &[
        (256, &[512, 1024, 2048]),
        (512, &[1024, 2048, 3072, 4096]),
        (1024, &[2048, 3072, 4096, 5120, 6144, 7168, 8192]),
        (
            2048,
            &[
                4096, 5120, 6144, 7168, 8192, 9216, 10240, 11264, 12288, 13312, 14336, 15360,
                16384,
            ],
        ),
        (
            4096,
            &[
                8192, 9216, 10240, 11264, 12288, 13312, 14336, 15360, 16384, 17408, 18432, 19456,
                20480, 21504, 22528, 23552, 24576, 25600, 26624, 27648, 28672, 29696, 30720,
            ],
        ),
        (
            8192,
            &[
                16384, 20480, 24576, 28672, 32768, 36864, 40960, 45056, 49152, 53248, 57344, 61440,
            ],
        ),
        (
            16384,
            &[
                32768, 40960, 49152, 57344, 65536, 73728, 81920, 90112, 98304, 106496, 114688,
                122880,
            ],
        ),
    ];

    /// CPU units from `256`, `"256"` or `"0.25 vCPU"`.
    fn cpu_units(value: &Value) -> Option<i64> {
        Self::with_unit(value, "vcpu")
    }

    /// Memory in MiB from `512`, `"512"` or `"0.5 GB"`.
    fn memory_mib(value: &Value) -> Option<i64> {
        Self::with_unit(value, "gb")
    }

    fn with_unit(value: &Value, unit: &str) -> Option<i64> {
        if let Some(number) = to_i64(value) {
            return Some(number);
        }
        let text = value.as_str()?.trim().to_ascii_lowercase();
        let amount = text.strip_suffix(unit)?.trim().parse::<f64>().ok()?;
        let scaled = amount * 1024.0;
        (scaled.fract() == 0.0).then_some(scaled as i64)
    }

    fn is_valid(cpu: i64, memory: i64) -> Option<bool> {
        let (_, sizes) = Self::COMBINATIONS.iter().find(|(units, _)| *units == cpu)?;
        Some(sizes.contains(&memory))
    }
}

impl LintRule for FargateCpuMemory {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3047",
            short_desc: "Validate ECS Fargate tasks have the right combination of CPU and memory",
            description: "When using an ECS Fargate task, the combination of CPU and memory must be a supported Fargate configuration",
            source_url: "https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-cpu-memory-error.html",
            tags: &["resources", "ecs", "fargate"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for task in cx.resources_of_type(TASK_DEFINITION) {
            let fargate = match task.property("RequiresCompatibilities") {
                Some(Value::Array(items)) => items.iter().any(|item| item.as_str() == Some("FARGATE")),
                _ => false,
            };
            if !fargate {
                continue;
            }
            let (Some(cpu_value), Some(memory_value)) = (task.property("Cpu"), task.property("Memory"))
            else {
                continue;
            };
            let (Some(cpu), Some(memory)) = (Self::cpu_units(cpu_value), Self::memory_mib(memory_value))
            else {
                continue;
            };
            let message = match Self::is_valid(cpu, memory) {
                Some(true) => continue,
                Some(false) => format!(
                    "Cpu {} and Memory {} is not a valid combination for Fargate tasks",
                    cpu, memory
                ),
                None => format!("Cpu {} is not a valid CPU value for Fargate tasks", cpu),
            };
            findings.push(Finding::on_property(self.id(), task, &["Cpu"], message));
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
    use serde_json::json;

    fn run(rule: &dyn LintRule, source: &str) -> Vec<Finding> {
        let template = Template::parse(source).unwrap();
        rule.check(&RuleContext::new(&template, schema()))
    }

    #[test]
    fn test_awslogs_missing_region() {
        let findings = run(
            &AwsLogsOptions,
            "Resources:
  Task:
    Type: AWS::ECS::TaskDefinition
    Properties:
      ContainerDefinitions:
        - Name: web
          Image: nginx
          LogConfiguration:
            LogDriver: awslogs
            Options:
              awslogs-group: /ecs/web
        - Name: sidecar
          Image: busybox
          LogConfiguration:
            LogDriver: json-file
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "awslogs-region must be specified in Options when LogDriver is awslogs"
        );
        assert_eq!(
            findings[0].path.join("/"),
            "Resources/Task/Properties/ContainerDefinitions/0/LogConfiguration"
        );
    }

    #[test]
    fn test_fargate_unit_parsing() {
        assert_eq!(FargateCpuMemory::cpu_units(&json!(256)), Some(256));
        assert_eq!(FargateCpuMemory::cpu_units(&json!("1024")), Some(1024));
        assert_eq!(FargateCpuMemory::cpu_units(&json!("0.25 vCPU")), Some(256));
        assert_eq!(FargateCpuMemory::memory_mib(&json!("2 GB")), Some(2048));
        assert_eq!(FargateCpuMemory::memory_mib(&json!("lots")), None);
    }

    #[test]
    fn test_fargate_combinations() {
        assert_eq!(FargateCpuMemory::is_valid(256, 512), Some(true));
        assert_eq!(FargateCpuMemory::is_valid(256, 1024), Some(true));
        assert_eq!(FargateCpuMemory::is_valid(256, 1536), Some(false));
        assert_eq!(FargateCpuMemory::is_valid(4096, 9216), Some(true));
        assert_eq!(FargateCpuMemory::is_valid(16384, 40960), Some(true));
        assert_eq!(FargateCpuMemory::is_valid(16384, 36864), Some(false));
        assert_eq!(FargateCpuMemory::is_valid(256, 4096), Some(false));
        assert_eq!(FargateCpuMemory::is_valid(8192, 20480), Some(true));
        assert_eq!(FargateCpuMemory::is_valid(8192, 17408), Some(false));
        assert_eq!(FargateCpuMemory::is_valid(300, 512), None);
    }

    #[test]
    fn test_fargate_task_integer_and_string_forms_agree() {
        let source = "Resources:
  Task:
    Type: AWS::ECS::TaskDefinition
    Properties:
      RequiresCompatibilities: [FARGATE]
      Cpu: CPU
      Memory: '4096'
      ContainerDefinitions: [{Name: web, Image: nginx}]
";
        let as_string = run(&FargateCpuMemory, &source.replace("CPU", "'256'"));
        let as_integer = run(&FargateCpuMemory, &source.replace("CPU", "256"));
        assert_eq!(as_string.len(), 1);
        assert_eq!(as_string, as_integer);
        assert_eq!(
            as_string[0].message,
            "Cpu 256 and Memory 4096 is not a valid combination for Fargate tasks"
        );
        assert!(run(&FargateCpuMemory, &source.replace("CPU", "'2 vCPU'").replace("'4096'", "'8 GB'")).is_empty());
    }

    #[test]
    fn test_fargate_quarter_vcpu_rejects_in_between_memory() {
        let source = "Resources:
  Task:
    Type: AWS::ECS::TaskDefinition
    Properties:
      RequiresCompatibilities: [FARGATE]
      Cpu: '256'
      Memory: 'MEMORY'
      ContainerDefinitions: [{Name: web, Image: nginx}]
";
        let findings = run(&FargateCpuMemory, &source.replace("MEMORY", "1536"));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "E3047");
        for memory in ["512", "1024", "2048"] {
            assert!(run(&FargateCpuMemory, &source.replace("MEMORY", memory)).is_empty());
        }
    }
}
