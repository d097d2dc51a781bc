//! Step Functions state machine definitions.

use serde_json::{Map, Value};

use crate::app::cfn_intrinsic_functions::contains_intrinsic;
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![Box::new(StateMachineDefinition)]
}

/// E2532: the top-level structure of a state machine definition.
pub struct StateMachineDefinition;

/// A problem in a definition, with its path relative to the definition root.
#[derive(Debug, PartialEq)]
struct DefinitionProblem {
    path: Vec<String>,
    message: String,
}

impl DefinitionProblem {
    fn new(path: &[&str], message: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            message: message.into(),
        }
    }
}

impl StateMachineDefinition {
    const STATE_TYPES: &'static [&'static str] =
        &["Choice", "Fail", "Map", "Parallel", "Pass", "Succeed", "Task", "Wait"];

    // States that end an execution branch without Next or End.
    const TERMINAL_TYPES: &'static [&'static str] = &["Choice", "Fail", "Succeed"];

    fn check_definition(definition: &Map<String, Value>) -> Vec<DefinitionProblem> {
        let mut problems = Vec::new();
        let start_at = definition.get("StartAt").and_then(Value::as_str);
        if start_at.is_none() {
            problems.push(DefinitionProblem::new(&[], "Definition is missing required key StartAt"));
        }
        let Some(states) = definition.get("States").and_then(Value::as_object) else {
            problems.push(DefinitionProblem::new(&[], "Definition is missing required key States"));
            return problems;
        };
        if let Some(start_at) = start_at {
            if !states.contains_key(start_at) {
                problems.push(DefinitionProblem::new(
                    &["StartAt"],
                    format!("StartAt {} is not a declared state", start_at),
                ));
            }
        }

        for (name, state) in states {
            let Some(state) = state.as_object() else {
                problems.push(DefinitionProblem::new(
                    &["States", name.as_str()],
                    format!("State {} must be an object", name),
                ));
                continue;
            };
            let Some(state_type) = state.get("Type").and_then(Value::as_str) else {
                problems.push(DefinitionProblem::new(
                    &["States", name.as_str()],
                    format!("State {} is missing required key Type", name),
                ));
                continue;
            };
            if !Self::STATE_TYPES.contains(&state_type) {
                problems.push(DefinitionProblem::new(
                    &["States", name.as_str(), "Type"],
                    format!(
                        "State {} has invalid Type {}. Valid types are [{}]",
                        name,
                        state_type,
                        Self::STATE_TYPES.join(", ")
                    ),
                ));
                continue;
            }
            if Self::TERMINAL_TYPES.contains(&state_type) {
                continue;
            }
            let ends = state.get("End").and_then(Value::as_bool) == Some(true);
            match state.get("Next").and_then(Value::as_str) {
                Some(_) if ends => problems.push(DefinitionProblem::new(
                    &["States", name.as_str()],
                    format!("State {} cannot specify both Next and End", name),
                )),
                Some(next) if !states.contains_key(next) => problems.push(DefinitionProblem::new(
                    &["States", name.as_str(), "Next"],
                    format!("State {} transitions to undeclared state {}", name, next),
                )),
                Some(_) => {}
                None if !ends => problems.push(DefinitionProblem::new(
                    &["States", name.as_str()],
                    format!("State {} must specify Next or End", name),
                )),
                None => {}
            }
        }
        problems
    }
}

impl LintRule for StateMachineDefinition {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E2532",
            short_desc: "Check State Machine Definition for proper syntax",
            description: "Check the State Machine String Definition to make sure its JSON. Validate basic syntax of the file to determine validity.",
            source_url: "https://docs.aws.amazon.com/step-functions/latest/dg/concepts-amazon-states-language.html",
            tags: &["resources", "stepfunctions"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for machine in cx.resources_of_type("AWS::StepFunctions::StateMachine") {
            let (property, parsed) = match (machine.property("Definition"), machine.property("DefinitionString")) {
                (Some(definition), _) => {
                    if contains_intrinsic(definition) {
                        continue;
                    }
                    ("Definition", definition.clone())
                }
                (None, Some(Value::String(text))) => match serde_json::from_str::<Value>(text) {
                    Ok(parsed) => ("DefinitionString", parsed),
                    Err(e) => {
                        findings.push(Finding::on_property(
                            self.id(),
                            machine,
                            &["DefinitionString"],
                            format!("State Machine Definition needs to be formatted as JSON. Error {}", e),
                        ));
                        continue;
                    }
                },
                _ => continue,
            };
            let Some(definition) = parsed.as_object() else {
                findings.push(Finding::on_property(
                    self.id(),
                    machine,
                    &[property],
                    "State Machine Definition must be a JSON object",
                ));
                continue;
            };
            for problem in Self::check_definition(definition) {
                // A parsed string has no nodes of its own to point into.
                let path = if property == "Definition" {
                    let mut path = vec![property.to_string()];
                    path.extend(problem.path);
                    path
                } else {
                    vec![property.to_string()]
                };
                findings.push(Finding::on_property(self.id(), machine, &path, problem.message));
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cfn_resources::schema;
    use crate::app::cfn_template::Template;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn problems(definition: Value) -> Vec<String> {
        let map = definition.as_object().cloned().unwrap();
        StateMachineDefinition::check_definition(&map)
            .into_iter()
            .map(|problem| problem.message)
            .collect()
    }

    fn run(source: &str) -> Vec<Finding> {
        let template = Template::parse(source).unwrap();
        StateMachineDefinition.check(&RuleContext::new(&template, schema()))
    }

    #[test]
    fn test_valid_definition() {
        let definition = json!({
            "StartAt": "Work",
            "States": {
                "Work": {"Type": "Task", "Resource": "arn:aws:lambda:us-east-1:123456789012:function:f", "Next": "Done"},
                "Done": {"Type": "Succeed"}
            }
        });
        assert!(problems(definition).is_empty());
    }

    #[test]
    fn test_structure_problems() {
        let definition = json!({
            "States": {
                "A": {"Type": "Task", "Resource": "r"},
                "B": {"Type": "Sleep"},
                "C": {"Type": "Pass", "Next": "Missing"},
                "D": {"Type": "Pass", "Next": "A", "End": true}
            }
        });
        assert_eq!(
            problems(definition),
            vec![
                "Definition is missing required key StartAt",
                "State A must specify Next or End",
                "State B has invalid Type Sleep. Valid types are [Choice, Fail, Map, Parallel, Pass, Succeed, Task, Wait]",
                "State C transitions to undeclared state Missing",
                "State D cannot specify both Next and End",
            ]
        );
    }

    #[test]
    fn test_definition_string_must_be_json() {
        let findings = run(
            "Resources:
  Machine:
    Type: AWS::StepFunctions::StateMachine
    Properties:
      RoleArn: arn:aws:iam::123456789012:role/R
      DefinitionString: '{\"StartAt\": '
",
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0]
            .message
            .starts_with("State Machine Definition needs to be formatted as JSON"));
    }

    #[test]
    fn test_definition_object_paths() {
        let findings = run(
            "Resources:
  Machine:
    Type: AWS::StepFunctions::StateMachine
    Properties:
      RoleArn: arn:aws:iam::123456789012:role/R
      Definition:
        StartAt: First
        States:
          First: {Type: Pass, Next: Nowhere}
",
        );
        assert_eq!(
            findings[0].path.join("/"),
            "Resources/Machine/Properties/Definition/States/First/Next"
        );
    }

    #[test]
    fn test_substituted_definition_is_skipped() {
        let findings = run(
            "Resources:
  Machine:
    Type: AWS::StepFunctions::StateMachine
    Properties:
      RoleArn: arn:aws:iam::123456789012:role/R
      DefinitionString: !Sub '{\"StartAt\": \"${Start}\"}'
",
        );
        assert!(findings.is_empty());
    }
}
