//! Common test utilities for bscf tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use bscf::build::CommandRunner;
use bscf::config::{Config, LayoutConfig};
use bscf::error::BuildError;
use bscf::project::{Fetcher, HostEnv, HostOs, Parser, ProjectGraph, Source};
use bscf::session::{Session, SessionReport, Token};
use bscf::toolchain::ToolchainId;

/// Write `content` to `root/rel`, creating parent directories
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&path, content).expect("Failed to write file");
}

/// Creates a temporary directory holding a proj.bscf and the given files
pub fn create_project(config: &str, files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().to_path_buf();
    write_file(&path, "proj.bscf", config);
    for (rel, content) in files {
        write_file(&path, rel, content);
    }
    (dir, path)
}

/// Creates a temporary directory with no project file
pub fn create_empty_project() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().to_path_buf();
    (dir, path)
}

/// Config pinned to the gnu toolchain so no detection happens
pub fn gnu_config() -> Config {
    let mut config = Config::default();
    config.defaults.toolchain = "gnu".to_string();
    config
}

/// Copies local directories in place of remote repositories
#[derive(Default)]
pub struct LocalFetcher {
    repos: HashMap<String, PathBuf>,
}

impl LocalFetcher {
    pub fn with_repo(mut self, url: &str, dir: &Path) -> Self {
        self.repos.insert(url.to_string(), dir.to_path_buf());
        self
    }
}

impl Fetcher for LocalFetcher {
    fn fetch(&self, source: &Source, dest: &Path) -> bool {
        let Some(from) = self.repos.get(&source.url) else {
            return false;
        };
        for entry in WalkDir::new(from).min_depth(1) {
            let entry = entry.expect("Failed to walk repo");
            let rel = entry.path().strip_prefix(from).expect("Entry outside repo");
            let to = dest.join(rel);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&to).expect("Failed to create dir");
            } else {
                fs::create_dir_all(to.parent().expect("No parent")).expect("Failed to create dir");
                fs::copy(entry.path(), &to).expect("Failed to copy file");
            }
        }
        true
    }
}

/// Parse `root` for a Linux host with the gnu toolchain
pub fn parse_project(root: &Path, fetcher: &dyn Fetcher) -> ProjectGraph {
    Parser::new(
        HostEnv::new(HostOs::Linux, ToolchainId::Gnu),
        LayoutConfig::default(),
        fetcher,
    )
    .parse(root)
    .expect("Failed to parse project")
}

/// Records commands instead of running them
///
/// Each command's output file (`-o <file>`, or the archive of `ar rcs`) is
/// created so artifacts and objects exist afterwards.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    pub commands: Vec<String>,
    pub begun: Vec<String>,
    pub skipped: Vec<String>,
    pub echo: bool,
    /// Fail any command containing this text
    pub fail_on: Option<String>,
}

impl RecordingRunner {
    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Default::default()
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.begun.clear();
        self.skipped.clear();
    }
}

impl CommandRunner for RecordingRunner {
    fn begin_target(&mut self, target: &str) {
        self.begun.push(target.to_string());
    }

    fn skip_target(&mut self, target: &str, _reason: &str) {
        self.skipped.push(target.to_string());
    }

    fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    fn run(&mut self, command: &str) -> Result<(), BuildError> {
        self.commands.push(command.to_string());
        if let Some(pattern) = &self.fail_on {
            if command.contains(pattern.as_str()) {
                return Err(BuildError::CommandFailed {
                    command: command.to_string(),
                    exit_code: Some(1),
                    stderr: "error".to_string(),
                    suggestion: None,
                });
            }
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        let output = if words.first() == Some(&"ar") {
            words.get(2)
        } else {
            words.iter().position(|w| *w == "-o").and_then(|i| words.get(i + 1))
        };
        if let Some(output) = output {
            let path = Path::new(output);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create output dir");
            }
            fs::write(path, "").expect("Failed to write output");
        }
        Ok(())
    }
}

/// Run `tokens` against `root` on a Linux host with gnu commands
pub fn run_session(root: &Path, tokens: &[&str], runner: &mut RecordingRunner) -> SessionReport {
    let config = gnu_config();
    let fetcher = LocalFetcher::default();
    let tokens: Vec<Token> = bscf::session::parse_tokens(tokens);
    Session::new(&config, root, &fetcher, runner)
        .with_os(HostOs::Linux)
        .run(&tokens)
        .expect("Session failed")
}
