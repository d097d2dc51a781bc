//! DNS name helpers.

use once_cell::sync::Lazy;
use regex::Regex;

static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*\.)?([a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z][a-zA-Z0-9-]{0,61}[a-zA-Z0-9]\.?$")
        .expect("valid domain regex")
});

/// Whether `name` is a syntactically valid domain name.
///
/// Only the leftmost label may be a `*` wildcard and at least two labels
/// are required. A single trailing dot is accepted.
pub fn is_valid_domain(name: &str) -> bool {
    name.len() <= 253 && DOMAIN.is_match(name)
}

/// Lowercase and drop a trailing dot.
pub fn normalize_domain(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether `name` is `zone` itself or a name under it.
pub fn is_subdomain_of(name: &str, zone: &str) -> bool {
    let name = normalize_domain(name);
    let zone = normalize_domain(zone);
    if zone.is_empty() {
        return false;
    }
    name == zone || name.ends_with(&format!(".{}", zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_domains() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("*.example.com"));
        assert!(is_valid_domain("www.example.co.uk."));
        assert!(is_valid_domain("_dmarc.example.com"));
    }

    #[test]
    fn test_invalid_domains() {
        assert!(!is_valid_domain("example"));
        assert!(!is_valid_domain("www.*.example.com"));
        assert!(!is_valid_domain("-bad.example.com"));
        assert!(!is_valid_domain("exa mple.com"));
        assert!(!is_valid_domain("example..com"));
    }

    #[test]
    fn test_subdomain_relationship() {
        assert!(is_subdomain_of("api.example.com", "example.com."));
        assert!(is_subdomain_of("Example.com.", "example.com"));
        assert!(!is_subdomain_of("badexample.com", "example.com"));
        assert!(!is_subdomain_of("example.com", "api.example.com"));
    }
}
