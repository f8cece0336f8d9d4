//! Command runners used by the build engine

use colored::Colorize;
use tokio::runtime::Runtime;

use crate::config::ExecutionConfig;
use crate::error::BuildError;
use crate::executor::{command_error, run_shell, ExecOptions};

/// Executes rendered plan commands
pub trait CommandRunner {
    /// Called once before the commands of `target` run
    fn begin_target(&mut self, _target: &str) {}

    /// Called instead of [`begin_target`](Self::begin_target) when nothing runs
    fn skip_target(&mut self, _target: &str, _reason: &str) {}

    /// Toggle printing of each command before it runs
    fn set_echo(&mut self, _echo: bool) {}

    /// Run one command line to completion
    ///
    /// # Errors
    /// Any failure, including a non-zero exit, aborts the target.
    fn run(&mut self, command: &str) -> Result<(), BuildError>;
}

/// Runs commands through the system shell on a current-thread runtime
/// owned by the runner
#[derive(Debug)]
pub struct ShellRunner {
    shell: String,
    options: ExecOptions,
    echo: bool,
    runtime: Runtime,
}

impl ShellRunner {
    /// # Errors
    /// `BuildError::Io` if the runtime cannot be created.
    pub fn new(shell: impl Into<String>, options: ExecOptions) -> Result<Self, BuildError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            shell: shell.into(),
            options,
            echo: false,
            runtime,
        })
    }

    pub fn from_config(config: &ExecutionConfig) -> Result<Self, BuildError> {
        let options = ExecOptions::default()
            .with_timeout_secs(config.timeout_secs)
            .with_max_output(config.max_output);
        Self::new(config.shell.clone(), options)
    }
}

impl CommandRunner for ShellRunner {
    fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    fn begin_target(&mut self, target: &str) {
        println!("{}", format!("# Building {}", target).bold());
    }

    fn skip_target(&mut self, target: &str, reason: &str) {
        println!("{}", format!("# Skipping {} ({})", target, reason).dimmed());
    }

    fn run(&mut self, command: &str) -> Result<(), BuildError> {
        if self.echo {
            println!("{}", command.dimmed());
        }

        let output = self.runtime.block_on(run_shell(&self.shell, command, &self.options))?;

        if !output.stdout.is_empty() {
            print!("{}", output.stdout);
        }
        if !output.stderr.is_empty() {
            eprint!("{}", output.stderr);
        }

        if output.success() {
            Ok(())
        } else {
            Err(command_error(command, output.exit_code, &output.stderr))
        }
    }
}
