//! Configuration files and how they shape a lint run.

#[cfg(test)]
mod tests {
    use cfnlint::app::config::{ConfigError, LintConfig};
    use cfnlint::app::rules::{Finding, Linter};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = "Parameters:
  Unused:
    Type: String
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      InvalidProperty: x
";

    fn ids(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.rule_id.as_str()).collect()
    }

    fn lint_with(config: LintConfig) -> Vec<Finding> {
        Linter::with_config(config).lint_source(TEMPLATE).unwrap()
    }

    #[test]
    fn test_discover_local_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".cfnlintrc.yaml"), "ignore_checks: [W2001]\n").unwrap();

        let config = LintConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.ignore_checks, vec!["W2001"]);
        assert_eq!(ids(&lint_with(config)), vec!["E1101"]);
    }

    #[test]
    fn test_explicit_path_wins_over_discovery() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".cfnlintrc.yaml"), "ignore_checks: [W2001]\n").unwrap();
        let explicit = dir.path().join("strict.yaml");
        fs::write(&explicit, "ignore_checks: [E1101]\n").unwrap();

        let config = LintConfig::load(Some(&explicit), dir.path()).unwrap();
        assert_eq!(ids(&lint_with(config)), vec!["W2001"]);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = LintConfig::load(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".cfnlintrc.yaml");
        fs::write(&path, "ignore_checks: {not: [a list}\n").unwrap();
        let err = LintConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
        assert!(err.to_string().contains(".cfnlintrc.yaml"));
    }

    #[test]
    fn test_mandatory_overrides_template_metadata() {
        let source = "Metadata:
  cfn-lint:
    config:
      ignore_checks: [E1101]
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      InvalidProperty: x
";
        let findings = Linter::default().lint_source(source).unwrap();
        assert!(findings.is_empty());

        let config = LintConfig {
            mandatory_checks: vec!["E1101".to_string()],
            ..LintConfig::default()
        };
        let findings = Linter::with_config(config).lint_source(source).unwrap();
        assert_eq!(ids(&findings), vec!["E1101"]);
    }

    #[test]
    fn test_ignore_tags() {
        let config = LintConfig {
            ignore_tags: vec!["properties".to_string()],
            ..LintConfig::default()
        };
        assert_eq!(ids(&lint_with(config)), vec!["W2001"]);
    }

    #[test]
    fn test_cli_selections_merge_into_file_config() {
        let mut config = LintConfig::from_yaml_str("ignore_checks: [W]\n").unwrap();
        config.merge_cli(&["E1101".to_string()], &[]);
        assert!(lint_with(config).is_empty());
    }
}
