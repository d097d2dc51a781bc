//! EventBridge schedule expressions.

/// Validate a `rate(...)` or `cron(...)` expression.
///
/// The error carries a one-line reason suitable for a finding message.
pub fn validate_schedule_expression(expression: &str) -> Result<(), String> {
    if let Some(body) = expression
        .strip_prefix("rate(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return validate_rate(body);
    }
    if let Some(body) = expression
        .strip_prefix("cron(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return validate_cron(body);
    }
    Err(format!(
        "'{}' must be a rate(...) or cron(...) expression",
        expression
    ))
}

fn validate_rate(body: &str) -> Result<(), String> {
    let parts: Vec<&str> = body.split_whitespace().collect();
    let [value, unit] = parts.as_slice() else {
        return Err(format!("rate({}) must have a value and a unit", body));
    };
    let value: u64 = value
        .parse()
        .map_err(|_| format!("rate value '{}' must be a positive integer", value))?;
    if value == 0 {
        return Err("rate value must be greater than 0".to_string());
    }
    match (*unit, value) {
        ("minute" | "hour" | "day", 1) => Ok(()),
        ("minutes" | "hours" | "days", v) if v != 1 => Ok(()),
        ("minutes" | "hours" | "days", _) => {
            Err(format!("rate(1 {}) must use a singular unit", unit))
        }
        ("minute" | "hour" | "day", _) => {
            Err(format!("rate({} {}) must use a plural unit", value, unit))
        }
        _ => Err(format!(
            "rate unit '{}' must be one of minute, minutes, hour, hours, day, days",
            unit
        )),
    }
}

fn validate_cron(body: &str) -> Result<(), String> {
    let fields: Vec<&str> = body.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(format!(
            "cron({}) must have 6 fields, found {}",
            body,
            fields.len()
        ));
    }
    // Day-of-month and day-of-week cannot both be specified.
    if fields[2] != "?" && fields[4] != "?" {
        return Err(format!(
            "cron({}) must use '?' for either day-of-month or day-of-week",
            body
        ));
    }
    Ok(())
}
