//! Amazon Resource Name matching.

use once_cell::sync::Lazy;
use regex::Regex;

static ARN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:(aws|aws-cn|aws-us-gov):([a-z0-9-]+|\*):([a-z0-9-]*|\*):(\d{12}|aws|\*)?:(.+)$")
        .expect("valid ARN regex")
});

static ROLE_ARN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:(aws|aws-cn|aws-us-gov):iam::\d{12}:role/[\w+=,.@/-]{1,512}$")
        .expect("valid role ARN regex")
});

/// The components of a parsed ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account: &'a str,
    pub resource: &'a str,
}

/// Split an ARN into its components, or `None` if it is not one.
pub fn parse_arn(text: &str) -> Option<Arn<'_>> {
    let caps = ARN.captures(text)?;
    let part = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
    Some(Arn {
        partition: part(1),
        service: part(2),
        region: part(3),
        account: part(4),
        resource: part(5),
    })
}

pub fn is_valid_arn(text: &str) -> bool {
    ARN.is_match(text)
}

/// Whether `text` is an IAM role ARN (path allowed).
pub fn is_role_arn(text: &str) -> bool {
    ROLE_ARN.is_match(text)
}
