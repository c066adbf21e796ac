use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::*;

use tally_core::settings::Settings;
use tally_core::store;
use tally_testrunner::libtest::LibtestObserver;
use tally_testrunner::tags::Tagger;

#[derive(Parser)]
#[command(name = "tally-collect")]
#[command(about = "Collects one automated test run into the automated result document")]
#[command(after_help = r#"EXAMPLES:
    tally-collect -- cargo test -- -Z unstable-options --format json
    cargo test -- -Z unstable-options --format json | tally-collect -i -
    tally-collect -i run.jsonl -o out/result_test_auto.json
"#)]
struct Args {
    /// Read libtest JSON events from a file ("-" for stdin) instead of
    /// running a command
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Result document to write (defaults to the configured path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (defaults to tally.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Test command emitting libtest JSON on stdout
    #[arg(last = true)]
    command: Vec<String>,
}

fn open_input(input: &Path) -> Result<Box<dyn BufRead>> {
    if input.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file =
        File::open(input).with_context(|| format!("Cannot open {}", input.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Runs the test command, feeding its stdout to the observer as it arrives.
/// A failing test command is expected when tests fail and is not an error.
fn run_command(command: &[String], observer: &mut LibtestObserver) -> Result<()> {
    let (program, args) = command.split_first().context("Empty test command")?;
    info!("Running {}", command.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to execute {}", program))?;
    let stdout = child.stdout.take().context("Test command has no stdout")?;
    if let Err(e) = observer.observe_reader(BufReader::new(stdout)) {
        // Reap the child before giving up on its output
        if let Err(kill) = child.kill() {
            debug!("Failed to kill {}: {}", program, kill);
        }
        child.wait()?;
        return Err(e);
    }

    let status = child.wait()?;
    if !status.success() {
        info!("Test command exited with {}", status);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if args.verbose { "debug" } else { "info" },
    ))
    .init();

    let settings = Settings::load(args.config.as_deref())?;
    let output = args.output.unwrap_or(settings.automated_results);
    let tagger = Tagger::new(settings.tags);
    let mut observer = LibtestObserver::new(&tagger);

    match (&args.input, args.command.is_empty()) {
        (Some(input), true) => observer.observe_reader(open_input(input)?)?,
        (None, false) => run_command(&args.command, &mut observer)?,
        (Some(_), false) => bail!("Pass either --input or a test command, not both"),
        (None, true) => bail!("Nothing to collect: pass --input or a test command after --"),
    }

    if observer.is_empty() {
        warn!("No test results observed; is the command emitting libtest JSON?");
    }
    let doc = observer.finish();
    store::replace(&output, &doc)?;
    info!(
        "Collected {} tests in {:.3}s",
        doc.len(),
        doc.duration.unwrap_or_default()
    );

    Ok(())
}
