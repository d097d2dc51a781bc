//! Value predicates shared by the rule catalog.
//!
//! Each helper works on plain strings or decoded JSON values and knows
//! nothing about templates or findings. Rules decide what to report.

pub mod arn;
pub mod cidr;
pub mod domain;
pub mod iam_policy;
pub mod numeric;
pub mod schedule;

pub use arn::{is_role_arn, is_valid_arn, parse_arn, Arn};
pub use cidr::{Cidr, CidrError};
pub use domain::{is_subdomain_of, is_valid_domain, normalize_domain};
pub use iam_policy::{check_policy_document, PolicyKind, PolicyProblem};
pub use numeric::{to_f64, to_i64};
pub use schedule::validate_schedule_expression;
