//! cfnlint - static analysis for AWS CloudFormation templates
//!
//! cfnlint reads a CloudFormation template (YAML or JSON), checks it against
//! an embedded resource specification and a catalog of rules, and reports
//! findings with the line and column of the offending node.
//!
//! # Core Features
//!
//! - **Located parsing**: every node keeps its source position, short-form
//!   tags such as `!Ref` and `!GetAtt` are desugared while loading
//! - **Schema checks**: property names, types, required properties,
//!   enumerations, patterns and numeric/length bounds
//! - **Reference checks**: `Ref`, `Fn::GetAtt` and `Fn::Sub` targets,
//!   dependency cycles, unused parameters
//! - **Service rules**: Lambda runtimes, ECS on Fargate, load balancers,
//!   Route 53 records, IAM policy documents and more
//! - **Configuration**: rule selection through `.cfnlintrc.yaml` and
//!   `Metadata` in the template itself
//!
//! # Architecture Overview
//!
//! - **Template model** ([`app::cfn_template`]): typed view over the located tree
//! - **Schema** ([`app::cfn_resources`]): read-only resource knowledge
//! - **Rules** ([`app::rules`]): independent predicates dispatched by [`app::rules::Linter`]
//!
//! Rules are pure: they read the template and schema and return findings.
//! The registry is built once and never mutated afterwards.
//!
//! # Getting Started
//!
//! ```no_run
//! use cfnlint::app::rules::Linter;
//!
//! let findings = Linter::default()
//!     .lint_source("Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n")
//!     .expect("template parses");
//! for finding in &findings {
//!     println!("{}", finding);
//! }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

// Include logging macros first
#[macro_use]
pub mod logging_macros;

pub mod app;

pub use app::config::LintConfig;
pub use app::rules::{Finding, Linter, Severity};
