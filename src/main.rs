#![warn(clippy::all, rust_2018_idioms)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::prelude::*;
use walkdir::WalkDir;

use cfnlint::app::rules::{default_registry, Finding, Linter};
use cfnlint::LintConfig;

/// Extensions picked up when a directory is given on the command line.
const TEMPLATE_EXTENSIONS: &[&str] = &["json", "template", "yaml", "yml"];

/// Exit code for unreadable or unparsable input.
const EXIT_INPUT_FAILURE: i32 = 1;

#[derive(Debug, Parser)]
#[command(
    name = "cfnlint",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT"), ")"),
    about = "Static analysis for AWS CloudFormation templates"
)]
struct Cli {
    /// Template files or directories to lint
    #[arg(required_unless_present = "list_rules")]
    templates: Vec<PathBuf>,

    /// Config file to use instead of the discovered .cfnlintrc.yaml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rule ids or id prefixes to skip, comma separated
    #[arg(long, value_delimiter = ',')]
    ignore_checks: Vec<String>,

    /// Rule ids or id prefixes to enable, comma separated
    #[arg(long, value_delimiter = ',')]
    include_checks: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print the rule catalog and exit
    #[arg(long)]
    list_rules: bool,

    /// Log rule dispatch to stderr
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct FileFinding<'a> {
    filename: String,
    #[serde(flatten)]
    finding: &'a Finding,
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "cfnlint=debug" } else { "cfnlint=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // stdout carries findings, logs go to stderr
    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
    );
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    // Schema loading logs through the log crate
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize log-to-tracing bridge: {}", e);
    }
}

/// Expand directories into the template files under them, sorted by path.
fn collect_templates(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut templates = Vec::new();
    for path in paths {
        if !path.is_dir() {
            templates.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && has_template_extension(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        templates.extend(found);
    }
    templates
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| TEMPLATE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn lint_file(linter: &Linter<'_>, path: &Path) -> Result<Vec<Finding>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read template: {}", path.display()))?;
    let findings = linter
        .lint_source(&source)
        .with_context(|| format!("Failed to parse template: {}", path.display()))?;
    Ok(findings)
}

fn print_rules(format: OutputFormat) -> Result<()> {
    let metadata = default_registry().metadata();
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&metadata).context("Failed to encode rule list")?;
            println!("{}", text);
        }
        OutputFormat::Text => {
            for info in metadata {
                println!("{}: {}", info.id, info.short_desc);
                println!("    {}", info.description);
            }
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<i32> {
    if cli.list_rules {
        print_rules(cli.format)?;
        return Ok(0);
    }

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let mut config = LintConfig::load(cli.config.as_deref(), &cwd).context("Failed to load configuration")?;
    config.merge_cli(&cli.ignore_checks, &cli.include_checks);
    tracing::debug!("Configuration: {:?}", config);

    let linter = Linter::with_config(config);
    let mut exit_code = 0;
    let mut input_failed = false;
    let mut reported = Vec::new();

    for path in collect_templates(&cli.templates) {
        tracing::info!("Linting {}", path.display());
        match lint_file(&linter, &path) {
            Ok(findings) => {
                for finding in &findings {
                    exit_code |= finding.severity.exit_bit();
                }
                reported.push((path, findings));
            }
            Err(e) => {
                eprintln!("{:#}", e);
                input_failed = true;
            }
        }
    }

    match cli.format {
        OutputFormat::Text => {
            for (path, findings) in &reported {
                for finding in findings {
                    println!("{} {}", finding.rule_id, finding.message);
                    println!("{}:{}:{}", path.display(), finding.line, finding.column);
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            let flattened: Vec<FileFinding<'_>> = reported
                .iter()
                .flat_map(|(path, findings)| {
                    findings.iter().map(move |finding| FileFinding {
                        filename: path.display().to_string(),
                        finding,
                    })
                })
                .collect();
            let text = serde_json::to_string_pretty(&flattened).context("Failed to encode findings")?;
            println!("{}", text);
        }
    }

    Ok(if input_failed { EXIT_INPUT_FAILURE } else { exit_code })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);
    tracing::debug!("cfnlint {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_BRANCH"));

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_INPUT_FAILURE
        }
    };
    process::exit(code);
}
