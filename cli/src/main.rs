//! tally command line interface
//!
//! Produces the test report and records end-to-end scenario outcomes.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use log::*;
use serde_json::Value;

use tally_core::catalog::Catalog;
use tally_core::report::Report;
use tally_core::settings::Settings;
use tally_core::store::{self, ResultDocument, ResultRecord, Source, Status};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Reconciles catalogued tests with automated and end-to-end results", long_about = None)]
#[command(after_help = r#"EXAMPLES:
    tally report                                  Report using tally.json or defaults
    tally report --catalog suite.yaml --json      Machine-readable report
    tally record -n 16 -s passed --name "TC016 - CRUD 10 tasks"
    tally record -n 17 -s failed -e "Task2 still present" -d task1_id=4
    tally show e2e                                Print the end-to-end document
"#)]
struct Cli {
    /// Settings file (defaults to tally.json if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DocKind {
    /// Automated run results
    Auto,
    /// End-to-end scenario results
    E2e,
}

impl From<DocKind> for Source {
    fn from(value: DocKind) -> Self {
        match value {
            DocKind::Auto => Self::Automated,
            DocKind::E2e => Self::EndToEnd,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every catalogued test and print statistics
    Report {
        /// Test catalog (YAML)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Automated result document
        #[arg(long)]
        auto: Option<PathBuf>,

        /// End-to-end result document
        #[arg(long)]
        e2e: Option<PathBuf>,
    },

    /// Record the outcome of one end-to-end scenario
    Record {
        /// Scenario number, matched against catalog ids
        #[arg(short, long)]
        number: String,

        /// Outcome: passed, failed, error or skipped
        #[arg(short, long)]
        status: Status,

        /// Human-readable scenario name
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "SeleniumE2E")]
        class: String,

        #[arg(long)]
        method: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Error message, may be repeated
        #[arg(short, long)]
        error: Vec<String>,

        /// Extra detail as key=value, may be repeated
        #[arg(short, long)]
        detail: Vec<String>,

        /// End-to-end result document
        #[arg(long)]
        results: Option<PathBuf>,
    },

    /// Print a result document
    Show {
        #[arg(value_enum)]
        kind: DocKind,

        /// Document path (defaults to the configured one)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

/// Parses `key=value`. Values that are valid JSON keep their type.
fn parse_detail(s: &str) -> Result<(String, Value)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid detail '{}', expected key=value", s))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn print_source_status(out: &mut impl Write, label: &str, path: &Path, found: bool) -> Result<()> {
    writeln!(out, "Reading {} results from {}…", label, path.display())?;
    if found {
        writeln!(out, "OK")?;
    } else {
        writeln!(
            out,
            "⚠️  File not found or invalid - every {} test will be reported as 'Not found'",
            label
        )?;
    }
    Ok(())
}

fn report(catalog: &Path, auto: &Path, e2e: &Path, json: bool) -> Result<()> {
    let catalog = Catalog::from_file(catalog)?;
    let auto_doc = store::try_load(auto, Source::Automated);
    let e2e_doc = store::try_load(e2e, Source::EndToEnd);
    let report = Report::build(&catalog, auto_doc.as_ref(), e2e_doc.as_ref());

    let mut out = io::stdout().lock();
    if json {
        report.write_json(&mut out)?;
        return Ok(());
    }

    Report::write_rule(&mut out)?;
    writeln!(out, "TEST REPORT")?;
    Report::write_rule(&mut out)?;
    writeln!(out)?;
    print_source_status(&mut out, "auto", auto, auto_doc.is_some())?;
    print_source_status(&mut out, "auto-selenium", e2e, e2e_doc.is_some())?;
    writeln!(out)?;
    report.write_rows(&mut out)?;
    report.write_statistics(&mut out)?;
    writeln!(out)?;
    Report::write_rule(&mut out)?;
    Ok(())
}

fn print_document(doc: &ResultDocument, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(doc)?);
        return Ok(());
    }

    if let Some(ts) = doc.timestamp {
        println!("Timestamp: {}", ts);
    }
    if let Some(duration) = doc.duration {
        println!("Duration: {:.3}s", duration);
    }
    let s = doc.summary();
    println!(
        "Total: {}, Passed: {}, Failed: {}, Errors: {}, Skipped: {}",
        doc.len(),
        s.passed,
        s.failed,
        s.errors,
        s.skipped
    );
    for r in doc.tests() {
        println!(
            "{} | {:7} | {}",
            r.test_id.as_deref().unwrap_or("-"),
            r.status.to_string(),
            r.meta_str("test_name").unwrap_or_default()
        );
    }
    Ok(())
}

fn log_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = env_logger::Env::default().default_filter_or(log_level(cli.verbose));
    env_logger::Builder::from_env(env).init();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Report { catalog, auto, e2e } => report(
            &catalog.unwrap_or(settings.catalog),
            &auto.unwrap_or(settings.automated_results),
            &e2e.unwrap_or(settings.e2e_results),
            cli.json,
        )?,
        Commands::Record {
            number,
            status,
            name,
            class,
            method,
            description,
            error,
            detail,
            results,
        } => {
            let path = results.unwrap_or(settings.e2e_results);
            let details = detail
                .iter()
                .map(|d| parse_detail(d))
                .collect::<Result<BTreeMap<_, _>>>()?;

            let mut record = ResultRecord::new(Some(number), status)
                .with_error_message((!error.is_empty()).then(|| error.join("\n")))
                .with_description(description)
                .with_meta("test_class", class)
                .with_meta("details", Value::Object(details.into_iter().collect()));
            if let Some(name) = name {
                record = record.with_meta("test_name", name);
            }
            if let Some(method) = method {
                record = record.with_meta("test_method", method);
            }

            let doc = store::merge(&path, Source::EndToEnd, record)
                .with_context(|| format!("Scenario outcome was not recorded in {}", path.display()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(doc.summary())?);
            } else {
                let s = doc.summary();
                println!(
                    "✓ Results exported to {} (total: {}, passed: {}, failed: {}, errors: {})",
                    path.display(),
                    doc.len(),
                    s.passed,
                    s.failed,
                    s.errors
                );
            }
        }
        Commands::Show { kind, path } => {
            let source = Source::from(kind);
            let path = path.unwrap_or(match source {
                Source::Automated => settings.automated_results,
                Source::EndToEnd => settings.e2e_results,
            });
            match store::try_load(&path, source) {
                Some(doc) => print_document(&doc, cli.json)?,
                None => warn!("No usable {} document at {}", source, path.display()),
            }
        }
    }

    Ok(())
}
