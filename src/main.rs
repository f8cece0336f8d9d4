//! bscf CLI entry point
//!
//! Usage:
//!   bscf                       Build every target in the current directory
//!   bscf <project> [command]   Apply commands in order to a project
//!   bscf demo clean echo app   Clean, then build `app` echoing commands

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use bscf::build::{BuildReport, Outcome, ShellRunner};
use bscf::cli::{Cli, OutputFormat};
use bscf::config::load_config;
use bscf::project::GitFetcher;
use bscf::session::{Session, SessionReport};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

/// Returns whether every requested operation succeeded
fn run(cli: Cli) -> Result<bool> {
    let config = load_config(Path::new(&cli.project), cli.config.as_deref())?;
    let tokens = cli.tokens();

    let fetcher = GitFetcher::default();
    let mut runner = ShellRunner::from_config(&config.execution)?;
    let mut session = Session::new(&config, &cli.project, &fetcher, &mut runner);

    let report = session
        .run(&tokens)
        .with_context(|| format!("Failed to build project '{}'", cli.project))?;

    print_report(&report, cli.format)?;
    Ok(report.success)
}

fn print_report(report: &SessionReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Plain => {
            for build in &report.builds {
                for target in &build.targets {
                    println!("{} {}", target.name, target.outcome);
                }
            }
            for error in &report.errors {
                eprintln!("{}", error.message);
            }
        }
        OutputFormat::Table => {
            for build in &report.builds {
                print_build_table(build);
            }
            for error in &report.errors {
                eprintln!("{}: {}", "error".red().bold(), error.message);
                if let Some(ref suggestion) = error.suggestion {
                    eprintln!("  {}: {}", "hint".cyan(), suggestion);
                }
            }
        }
    }
    Ok(())
}

fn print_build_table(build: &BuildReport) {
    if build.targets.is_empty() {
        println!("No targets.");
        return;
    }

    println!();
    let width = build.targets.iter().map(|t| t.name.len()).max().unwrap_or(10);
    for target in &build.targets {
        let outcome = match target.outcome {
            Outcome::Built => target.outcome.to_string().green(),
            Outcome::Skipped => target.outcome.to_string().yellow(),
            Outcome::Failed => target.outcome.to_string().red(),
        };
        let detail = target
            .detail
            .as_ref()
            .map(|d| format!("- {}", d))
            .unwrap_or_default();
        println!(
            "  {:width$}  {:7}  {:>3} cmds  {:>6}ms  {}",
            target.name.cyan(),
            outcome,
            target.commands_run,
            target.duration_ms,
            detail,
            width = width
        );
        if let Some(ref error) = target.error {
            println!("      {}", error.message.red());
            if let Some(ref suggestion) = error.suggestion {
                println!("      {}: {}", "hint".cyan(), suggestion);
            }
        }
    }

    println!(
        "{}: {} built, {} skipped, {} failed",
        "Summary".cyan(),
        build.count(Outcome::Built),
        build.count(Outcome::Skipped),
        build.count(Outcome::Failed)
    );
}
