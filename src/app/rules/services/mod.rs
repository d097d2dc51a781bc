//! Service-specific rules.
//!
//! Each submodule covers one service area. Most rules are small tables of
//! known values (instance families, runtimes, engines) or structural checks
//! on a single resource type; none of them need the property walker.

use serde_json::Value;

use crate::app::cfn_intrinsic_functions::is_intrinsic;
use crate::app::cfn_template::Resource;

use super::LintRule;

pub mod cloudfront;
pub mod dns;
pub mod ecs;
pub mod elb;
pub mod instance_types;
pub mod lambda;
pub mod monitoring;
pub mod rds;
pub mod storage;
pub mod stepfunctions;

pub fn rules() -> Vec<Box<dyn LintRule>> {
    [
        cloudfront::rules(),
        dns::rules(),
        ecs::rules(),
        elb::rules(),
        instance_types::rules(),
        lambda::rules(),
        monitoring::rules(),
        rds::rules(),
        storage::rules(),
        stepfunctions::rules(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// A concrete value found under a resource's properties, with its path
/// relative to `Properties`.
pub struct Located<'r> {
    pub path: Vec<String>,
    pub value: &'r Value,
}

/// Every concrete value at `path` under a resource's properties.
///
/// A `*` segment steps into each item of a list. Intrinsics end the walk
/// and are never returned.
pub fn values_at<'r>(resource: &'r Resource, path: &[&str]) -> Vec<Located<'r>> {
    let mut out = Vec::new();
    let Some((first, rest)) = path.split_first() else {
        return out;
    };
    if let Some(value) = resource.property(first) {
        descend(value, rest, vec![first.to_string()], &mut out);
    }
    out
}

fn descend<'r>(value: &'r Value, rest: &[&str], trail: Vec<String>, out: &mut Vec<Located<'r>>) {
    if is_intrinsic(value) {
        return;
    }
    let Some((segment, rest)) = rest.split_first() else {
        out.push(Located { path: trail, value });
        return;
    };
    match (*segment, value) {
        ("*", Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                let mut trail = trail.clone();
                trail.push(index.to_string());
                descend(item, rest, trail, out);
            }
        }
        (key, Value::Object(map)) => {
            if let Some(child) = map.get(key) {
                let mut trail = trail;
                trail.push(key.to_string());
                descend(child, rest, trail, out);
            }
        }
        _ => {}
    }
}

/// Strings at `path`, skipping values of other shapes.
pub fn strings_at<'r>(resource: &'r Resource, path: &[&str]) -> Vec<(Vec<String>, &'r str)> {
    values_at(resource, path)
        .into_iter()
        .filter_map(|located| located.value.as_str().map(|text| (located.path, text)))
        .collect()
}
