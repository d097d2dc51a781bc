//! Linter configuration.
//!
//! A `.cfnlintrc.yaml` file selects which rules run:
//!
//! ```yaml
//! ignore_checks: [W2001, E30]   # rule id or id prefix
//! include_checks: [I]           # opt in to informational rules
//! mandatory_checks: [E3012]     # reported even when suppressed
//! ignore_tags: [iam]            # skip rules carrying any of these tags
//! ```
//!
//! Lookup order when no explicit path is given: `.cfnlintrc.yaml` then
//! `.cfnlintrc` in the working directory, then `cfnlintrc.yaml` in the
//! user's config directory. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

const LOCAL_CONFIG_FILES: &[&str] = &[".cfnlintrc.yaml", ".cfnlintrc"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Rule selection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub ignore_checks: Vec<String>,
    pub include_checks: Vec<String>,
    pub mandatory_checks: Vec<String>,
    pub ignore_tags: Vec<String>,
}

impl LintConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `explicit` if given, otherwise discover a config file
    /// starting in `dir`. Nothing found yields the defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::discover(dir) {
            Some(path) => {
                debug!("Using config file {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Find the config file that applies to `dir`, if any.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        LOCAL_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .or_else(|| {
                directories::ProjectDirs::from("com", "", "cfnlint")
                    .map(|dirs| dirs.config_dir().join("cfnlintrc.yaml"))
                    .filter(|path| path.is_file())
            })
    }

    /// Fold command-line selections into the file configuration.
    pub fn merge_cli(&mut self, ignore_checks: &[String], include_checks: &[String]) {
        self.ignore_checks.extend(ignore_checks.iter().cloned());
        self.include_checks.extend(include_checks.iter().cloned());
    }

    /// Whether a rule runs at all under this configuration.
    ///
    /// Informational rules are opt-in through `include_checks`. Mandatory
    /// rules always run.
    pub fn is_rule_enabled(&self, rule_id: &str, tags: &[&str]) -> bool {
        if self.is_mandatory(rule_id) {
            return true;
        }
        if rule_id.starts_with('I') && !matches_any(rule_id, &self.include_checks) {
            return false;
        }
        if matches_any(rule_id, &self.ignore_checks) && !is_included_explicitly(rule_id, &self.include_checks) {
            return false;
        }
        !tags
            .iter()
            .any(|tag| self.ignore_tags.iter().any(|ignored| ignored == tag))
    }

    pub fn is_mandatory(&self, rule_id: &str) -> bool {
        matches_any(rule_id, &self.mandatory_checks)
    }
}

fn matches_any(rule_id: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && rule_id.starts_with(prefix.as_str()))
}

// Only an exact id in include_checks overrides an ignore.
fn is_included_explicitly(rule_id: &str, include_checks: &[String]) -> bool {
    include_checks.iter().any(|id| id == rule_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_str() {
        let config = LintConfig::from_yaml_str("ignore_checks: [W2001, E30]\nignore_tags: [iam]\n").unwrap();
        assert_eq!(config.ignore_checks, vec!["W2001", "E30"]);
        assert_eq!(config.ignore_tags, vec!["iam"]);
        assert!(config.include_checks.is_empty());
        assert_eq!(LintConfig::from_yaml_str("").unwrap(), LintConfig::default());
    }

    #[test]
    fn test_rule_selection() {
        let config = LintConfig {
            ignore_checks: vec!["E30".to_string()],
            include_checks: vec!["E3012".to_string()],
            mandatory_checks: vec!["E3004".to_string()],
            ignore_tags: vec!["iam".to_string()],
        };
        assert!(!config.is_rule_enabled("E3001", &[]));
        assert!(config.is_rule_enabled("E3012", &[]));
        assert!(config.is_rule_enabled("E3004", &["iam"]));
        assert!(!config.is_rule_enabled("E3510", &["iam"]));
        assert!(config.is_rule_enabled("E1001", &["resources"]));
    }

    #[test]
    fn test_informational_rules_are_opt_in() {
        let mut config = LintConfig::default();
        assert!(!config.is_rule_enabled("I3042", &[]));
        config.merge_cli(&[], &["I".to_string()]);
        assert!(config.is_rule_enabled("I3042", &[]));
    }
}
