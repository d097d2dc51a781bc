//! CloudFormation template analysis.
//!
//! # Module Organization
//!
//! ## Template model
//! - [`cfn_yaml`] - Marked YAML/JSON loader with short-form tag desugaring
//! - [`cfn_node`] - Location-annotated document tree
//! - [`cfn_template`] - Template, resource, parameter and output model
//! - [`cfn_intrinsic_functions`] - Intrinsic recognition and reference extraction
//! - [`cfn_dag`] - Resource dependency graph and cycle detection
//!
//! ## Resource knowledge
//! - [`cfn_resources`] - Embedded resource specification, constraints and enums
//! - [`cfn_resource_policies`] - CreationPolicy and UpdatePolicy support per type
//! - [`predicates`] - ARN, CIDR, domain, schedule and policy document helpers
//!
//! ## Linting
//! - [`rules`] - Rule trait, registry, dispatch and the built-in catalog
//! - [`config`] - Rule selection loaded from `.cfnlintrc.yaml`
//!
//! # Flow
//!
//! Text is loaded by [`cfn_yaml`] into a [`cfn_node::Node`] tree, which
//! [`cfn_template::Template`] wraps with typed accessors. A
//! [`rules::Linter`] then runs every enabled rule over the template against
//! the schema from [`cfn_resources`] and collects [`rules::Finding`]s.

pub mod cfn_dag;
pub mod cfn_intrinsic_functions;
pub mod cfn_node;
pub mod cfn_resource_policies;
pub mod cfn_resources;
pub mod cfn_template;
pub mod cfn_yaml;
pub mod config;
pub mod predicates;
pub mod rules;
