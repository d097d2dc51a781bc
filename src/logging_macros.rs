#![warn(clippy::all, rust_2018_idioms)]

/// Logging macros that prefix every message with `[file:module:line]`.
///
/// The `lint_*` macros write to `tracing` only. The engine emits through
/// them so a `--debug` run shows where each rule event came from.
#[macro_export]
macro_rules! lint_trace {
    ($($arg:tt)*) => {
        tracing::trace!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! lint_debug {
    ($($arg:tt)*) => {
        tracing::debug!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! lint_info {
    ($($arg:tt)*) => {
        tracing::info!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! lint_warn {
    ($($arg:tt)*) => {
        tracing::warn!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

/// Writes to both `log` and `tracing`, for messages that must also reach
/// plain `log` consumers embedding the library.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
        tracing::error!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

/*
Logging levels used by the linter:

TRACE: per-resource and per-property detail inside a rule
- Regex cache misses, skipped intrinsic values

DEBUG: per-rule dispatch and filtering decisions
- Rule started / finished with finding count
- Findings dropped by configuration or template metadata

INFO: one summary line per template
- Number of rules run and findings produced

WARN: recoverable problems
- A rule panicked and was converted into an E0002 finding
- A schema pattern failed to compile

ERROR: failures that stop a template from being linted
- Unreadable or unparsable input files

Example output:
  [src/app/rules/linter.rs:cfnlint::app::rules::linter:88] Rule E3012 produced 2 findings

Keep trace/debug out of tight per-value loops unless guarded by a
level check; large templates run every rule over every property.
*/
