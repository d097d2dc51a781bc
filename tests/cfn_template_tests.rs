//! Loading templates into the located model.

#[cfg(test)]
mod tests {
    use cfnlint::app::cfn_dag::ResourceDag;
    use cfnlint::app::cfn_template::Template;
    use cfnlint::app::cfn_yaml::ParseError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = "AWSTemplateFormatVersion: '2010-09-09'
Transform: AWS::Serverless-2016-10-31
Parameters:
  Env:
    Type: String
    AllowedValues: [dev, prod]
Resources:
  Queue:
    Type: AWS::SQS::Queue
  Function:
    Type: AWS::Lambda::Function
    DependsOn: Queue
    Properties:
      Role: !GetAtt Role.Arn
      Environment:
        Variables:
          QUEUE: !Sub '${Queue.Arn}-${Env}'
  Role:
    Type: AWS::IAM::Role
Outputs:
  Name:
    Value: !Ref Function
";

    #[test]
    fn test_sections_are_typed() {
        let template = Template::parse(TEMPLATE).unwrap();
        assert_eq!(template.format_version.as_deref(), Some("2010-09-09"));
        assert_eq!(template.transform, vec!["AWS::Serverless-2016-10-31"]);
        assert_eq!(template.parameters["Env"].parameter_type, "String");
        assert_eq!(template.parameters["Env"].allowed_values, vec![json!("dev"), json!("prod")]);
        let ids: Vec<&str> = template.resources.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["Function", "Queue", "Role"]);
        assert_eq!(template.outputs["Name"].value, Some(json!({"Ref": "Function"})));
    }

    #[test]
    fn test_short_form_tags_are_desugared() {
        let template = Template::parse(TEMPLATE).unwrap();
        let function = &template.resources["Function"];
        assert_eq!(function.property("Role"), Some(&json!({"Fn::GetAtt": ["Role", "Arn"]})));
        assert_eq!(
            function.property("Environment"),
            Some(&json!({"Variables": {"QUEUE": {"Fn::Sub": "${Queue.Arn}-${Env}"}}}))
        );
        assert_eq!(function.depends_on, vec!["Queue"]);
    }

    #[test]
    fn test_nodes_keep_positions() {
        let template = Template::parse(TEMPLATE).unwrap();
        let function = &template.resources["Function"];
        let role = function.locate(&["Properties", "Role"]);
        assert_eq!(role.line, 14);
        assert_eq!(
            function.property_path(&["Environment", "Variables"]),
            vec!["Resources", "Function", "Properties", "Environment", "Variables"]
        );
    }

    #[test]
    fn test_dependency_graph() {
        let template = Template::parse(TEMPLATE).unwrap();
        let dag = ResourceDag::from_template(&template);
        let dependencies: Vec<&str> = dag.get_dependencies("Function").into_iter().collect();
        assert_eq!(dependencies, vec!["Queue", "Role"]);
        assert!(!dag.has_cycle());
        assert!(dag.get_dependencies("Queue").is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Template::parse("").unwrap_err(), ParseError::EmptyDocument);
        assert!(matches!(
            Template::parse("- a\n- b\n").unwrap_err(),
            ParseError::NotAMapping { .. }
        ));
        match Template::parse("Resources:\n  A: {Type: X}\n  A: {Type: Y}\n").unwrap_err() {
            ParseError::DuplicateKey { key, line, .. } => {
                assert_eq!(key, "A");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(matches!(
            Template::parse("Resources: [unclosed\n").unwrap_err(),
            ParseError::Syntax { .. }
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.json");
        fs::write(&path, r#"{"Resources": {"Topic": {"Type": "AWS::SNS::Topic"}}}"#).unwrap();
        let template = Template::from_file(&path).unwrap();
        assert_eq!(template.resources["Topic"].resource_type, "AWS::SNS::Topic");

        let err = Template::from_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read template"));
    }
}
