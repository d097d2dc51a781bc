//! Lambda runtime rules.

use chrono::NaiveDate;
use serde_json::Value;

use crate::app::cfn_template::Resource;
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(SnapStartRuntime),
        Box::new(DeprecatedRuntime),
        Box::new(ZipFileRuntime),
    ]
}

const FUNCTION: &str = "AWS::Lambda::Function";

// Runtime as a literal string; intrinsics and other shapes are unknown.
fn runtime(function: &Resource) -> Option<&str> {
    function.property_str("Runtime")
}

/// E2530: SnapStart only runs on Java runtimes.
pub struct SnapStartRuntime;

impl SnapStartRuntime {
    const SUPPORTED: &'static [&'static str] = &["java11", "java17", "java21"];
}

impl LintRule for SnapStartRuntime {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E2530",
            short_desc: "SnapStart supports the configured runtime",
            description: "Validate that SnapStart is only enabled for runtimes that support it",
            source_url: "https://docs.aws.amazon.com/lambda/latest/dg/snapstart.html",
            tags: &["resources", "lambda", "snapstart"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for function in cx.resources_of_type(FUNCTION) {
            let apply_on = function
                .property("SnapStart")
                .and_then(|snap_start| snap_start.get("ApplyOn"))
                .and_then(Value::as_str);
            if apply_on != Some("PublishedVersions") {
                continue;
            }
            let Some(runtime) = runtime(function) else {
                continue;
            };
            if !Self::SUPPORTED.contains(&runtime) {
                findings.push(Finding::on_property(
                    self.id(),
                    function,
                    &["SnapStart", "ApplyOn"],
                    format!("{} is not supported for SnapStart enabled functions", runtime),
                ));
            }
        }
        findings
    }
}

/// E2531: runtimes that have reached end of support.
pub struct DeprecatedRuntime;

impl DeprecatedRuntime {
    /// Runtime, the day it was deprecated and the runtime to move to.
    const DEPRECATED: &'static [(&'static str, &'static str, &'static str)] = &[
        ("dotnet6", "2024-12-20", "dotnet8"),
        ("dotnetcore1.0", "2019-07-30", "dotnet8"),
        ("dotnetcore2.0", "2019-05-30", "dotnet8"),
        ("dotnetcore2.1", "2022-01-05", "dotnet8"),
        ("dotnetcore3.1", "2023-04-03", "dotnet8"),
        ("go1.x", "2024-01-08", "provided.al2023"),
        ("java8", "2024-01-08", "java21"),
        ("nodejs", "2016-10-31", "nodejs22.x"),
        ("nodejs4.3", "2020-03-05", "nodejs22.x"),
        ("nodejs4.3-edge", "2019-04-30", "nodejs22.x"),
        ("nodejs6.10", "2019-08-12", "nodejs22.x"),
        ("nodejs8.10", "2020-03-06", "nodejs22.x"),
        ("nodejs10.x", "2021-07-30", "nodejs22.x"),
        ("nodejs12.x", "2023-03-31", "nodejs22.x"),
        ("nodejs14.x", "2023-12-04", "nodejs22.x"),
        ("nodejs16.x", "2024-06-12", "nodejs22.x"),
        ("provided", "2024-01-08", "provided.al2023"),
        ("python2.7", "2021-07-15", "python3.13"),
        ("python3.6", "2022-07-18", "python3.13"),
        ("python3.7", "2023-12-04", "python3.13"),
        ("python3.8", "2024-10-14", "python3.13"),
        ("ruby2.5", "2021-07-30", "ruby3.3"),
        ("ruby2.7", "2023-12-07", "ruby3.3"),
    ];

    /// The day `runtime` was deprecated and the runtime to move to.
    pub fn deprecation(runtime: &str) -> Option<(NaiveDate, &'static str)> {
        let (_, deprecated_on, successor) =
            Self::DEPRECATED.iter().find(|(name, ..)| *name == runtime)?;
        let day = NaiveDate::parse_from_str(deprecated_on, "%Y-%m-%d").ok()?;
        Some((day, *successor))
    }
}

impl LintRule for DeprecatedRuntime {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E2531",
            short_desc: "Validate if lambda runtime is deprecated",
            description: "Check the lambda runtime has not reached the end of life",
            source_url: "https://docs.aws.amazon.com/lambda/latest/dg/lambda-runtimes.html",
            tags: &["resources", "lambda", "runtime"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        cx.resources_of_type(FUNCTION)
            .filter_map(|function| {
                let runtime = runtime(function)?;
                let (deprecated_on, successor) = Self::deprecation(runtime)?;
                Some(Finding::on_property(
                    self.id(),
                    function,
                    &["Runtime"],
                    format!(
                        "Deprecated runtime ({}) specified. Deprecated since {}, update to {}",
                        runtime,
                        deprecated_on.format("%Y-%m-%d"),
                        successor
                    ),
                ))
            })
            .collect()
    }
}

/// E2533: inline ZipFile code needs an interpreted runtime.
pub struct ZipFileRuntime;

impl ZipFileRuntime {
    const FAMILIES: &'static [&'static str] = &["nodejs", "python"];
}

impl LintRule for ZipFileRuntime {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E2533",
            short_desc: "Check if ZipFile is used with a supported runtime",
            description: "Inline code through Code.ZipFile is only supported for Node.js and Python runtimes",
            source_url: "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-lambda-function-code.html",
            tags: &["resources", "lambda", "runtime"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for function in cx.resources_of_type(FUNCTION) {
            let has_zip_file = function
                .property("Code")
                .and_then(|code| code.get("ZipFile"))
                .is_some();
            if !has_zip_file {
                continue;
            }
            let Some(runtime) = runtime(function) else {
                continue;
            };
            if !Self::FAMILIES.iter().any(|family| runtime.starts_with(family)) {
                findings.push(Finding::on_property(
                    self.id(),
                    function,
                    &["Runtime"],
                    format!(
                        "ZipFile is only supported for runtimes of the families [{}], found {}",
                        Self::FAMILIES.join(", "),
                        runtime
                    ),
                ));
            }
        }
        findings
    }
}
