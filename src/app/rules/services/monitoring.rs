//! CloudWatch alarm and EventBridge schedule rules.

use super::{strings_at, values_at};
use crate::app::predicates::{to_f64, validate_schedule_expression};
use crate::app::rules::{Finding, LintRule, RuleContext, RuleInfo};

pub fn rules() -> Vec<Box<dyn LintRule>> {
    vec![Box::new(AlarmPeriod), Box::new(ScheduleExpressions)]
}

/// E3615: alarm periods are 10, 30 or a multiple of 60 seconds.
pub struct AlarmPeriod;

impl AlarmPeriod {
    pub fn is_valid_period(seconds: f64) -> bool {
        seconds == 10.0 || seconds == 30.0 || (seconds > 0.0 && seconds % 60.0 == 0.0)
    }
}

impl LintRule for AlarmPeriod {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3615",
            short_desc: "Validate CloudWatch Alarm using Metrics has a valid period",
            description: "Valid values are 10, 30, 60, and any multiple of 60",
            source_url: "https://docs.aws.amazon.com/AmazonCloudWatch/latest/APIReference/API_MetricStat.html",
            tags: &["resources", "cloudwatch"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let locations: [&[&str]; 3] = [
            &["Period"],
            &["Metrics", "*", "Period"],
            &["Metrics", "*", "MetricStat", "Period"],
        ];
        let mut findings = Vec::new();
        for alarm in cx.resources_of_type("AWS::CloudWatch::Alarm") {
            for path in locations {
                for located in values_at(alarm, path) {
                    let Some(seconds) = to_f64(located.value) else {
                        continue;
                    };
                    if !Self::is_valid_period(seconds) {
                        findings.push(Finding::on_property(
                            self.id(),
                            alarm,
                            &located.path,
                            format!(
                                "Period must be 10, 30 or a multiple of 60, found {}",
                                located.value.as_str().map_or_else(|| located.value.to_string(), str::to_string)
                            ),
                        ));
                    }
                }
            }
        }
        findings
    }
}

/// E3027: EventBridge schedule expressions.
pub struct ScheduleExpressions;

impl LintRule for ScheduleExpressions {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: "E3027",
            short_desc: "Validate AWS Event ScheduleExpression format",
            description: "Validate the formation of the AWS::Event ScheduleExpression",
            source_url: "https://docs.aws.amazon.com/AmazonCloudWatch/latest/events/ScheduledEvents.html",
            tags: &["resources", "events"],
        }
    }

    fn check(&self, cx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in cx.resources_of_type("AWS::Events::Rule") {
            for (path, expression) in strings_at(rule, &["ScheduleExpression"]) {
                if let Err(reason) = validate_schedule_expression(expression) {
                    findings.push(Finding::on_property(self.id(), rule, &path, reason));
                }
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

    fn run(rule: &dyn LintRule, source: &str) -> Vec<Finding> {
        let template = Template::parse(source).unwrap();
        rule.check(&RuleContext::new(&template, schema()))
    }

    fn alarm(period: &str) -> String {
        format!(
            "Resources:
  Alarm:
    Type: AWS::CloudWatch::Alarm
    Properties:
      ComparisonOperator: GreaterThanThreshold
      EvaluationPeriods: 1
      MetricName: Errors
      Namespace: AWS/Lambda
      Statistic: Sum
      Threshold: 1
      Period: {}
",
            period
        )
    }

    #[test]
    fn test_alarm_period_boundaries() {
        for accepted in ["60", "30", "10", "120", "3600"] {
            assert!(run(&AlarmPeriod, &alarm(accepted)).is_empty(), "{}", accepted);
        }
        for rejected in ["45", "90"] {
            let findings = run(&AlarmPeriod, &alarm(rejected));
            assert_eq!(findings.len(), 1, "{}", rejected);
            assert_eq!(
                findings[0].message,
                format!("Period must be 10, 30 or a multiple of 60, found {}", rejected)
            );
        }
        assert!(run(&AlarmPeriod, &alarm("!Ref Period")).is_empty());
    }

    #[test]
    fn test_metric_stat_period() {
        let findings = run(
            &AlarmPeriod,
            "Resources:
  Alarm:
    Type: AWS::CloudWatch::Alarm
    Properties:
      ComparisonOperator: GreaterThanThreshold
      EvaluationPeriods: 1
      Threshold: 1
      Metrics:
        - Id: m1
          MetricStat: {Metric: {MetricName: Errors, Namespace: AWS/Lambda}, Period: 75, Stat: Sum}
",
        );
        assert_eq!(
            findings[0].path.join("/"),
            "Resources/Alarm/Properties/Metrics/0/MetricStat/Period"
        );
    }

    #[test]
    fn test_schedule_expressions() {
        let findings = run(
            &ScheduleExpressions,
            "Resources:
  Good:
    Type: AWS::Events::Rule
    Properties: {ScheduleExpression: rate(5 minutes)}
  Bad:
    Type: AWS::Events::Rule
    Properties: {ScheduleExpression: every 5 minutes}
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path.join("/"), "Resources/Bad/Properties/ScheduleExpression");
    }
}
