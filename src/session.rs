//! Command-line session
//!
//! Applies command tokens left to right against one project root. Each
//! token is fully applied before the next; toggles (`echo`, `force`, a
//! toolchain name) affect every later token.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::build::{BuildReport, Builder, CommandRunner};
use crate::cache::BuildCache;
use crate::config::Config;
use crate::error::{BuildError, ErrorInfo};
use crate::plan::{OutputDirs, Planner};
use crate::project::{Fetcher, HostEnv, HostOs, Parser, ProjectGraph};
use crate::resolver::{Resolution, Resolver};
use crate::toolchain::{detect_toolchain, Toolchain, ToolchainId};

/// One command-line token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Remove every target's build directory
    Clean,
    /// Remove objects and cache, keep artifacts
    SoftClean,
    Build,
    /// Write plans without building
    BuildCache,
    Toolchain(ToolchainId),
    Echo(bool),
    Force(bool),
    /// Build one target, forced
    Target(String),
}

impl Token {
    pub fn parse(token: &str) -> Self {
        match token {
            "clean" | "c" => Token::Clean,
            "softclean" | "sc" => Token::SoftClean,
            "build" | "b" => Token::Build,
            "buildcache" | "bc" => Token::BuildCache,
            "echo" | "e" => Token::Echo(true),
            "noecho" | "ne" => Token::Echo(false),
            "force" | "f" => Token::Force(true),
            "noforce" | "nf" => Token::Force(false),
            other => match ToolchainId::from_token(other) {
                Some(id) => Token::Toolchain(id),
                None => Token::Target(other.to_string()),
            },
        }
    }
}

/// Parse command tokens; no tokens means `build`
pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> Vec<Token> {
    if tokens.is_empty() {
        return vec![Token::Build];
    }
    tokens.iter().map(|t| Token::parse(t.as_ref())).collect()
}

/// Everything a session did, for printing
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionReport {
    pub success: bool,
    pub builds: Vec<BuildReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorInfo>,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    fn add_build(&mut self, report: BuildReport) {
        self.success &= report.success;
        self.builds.push(report);
    }

    fn add_error(&mut self, error: &BuildError) {
        self.success = false;
        self.errors.push(ErrorInfo::from(error));
    }
}

/// Remove a directory tree, ignoring failures
fn remove_tree(dir: &Path) {
    if !dir.exists() {
        return;
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!("Removed {}", dir.display()),
        Err(e) => tracing::debug!("Could not remove {}: {}", dir.display(), e),
    }
}

/// Applies command tokens to one project
pub struct Session<'a> {
    config: &'a Config,
    root: PathBuf,
    os: HostOs,
    fetcher: &'a dyn Fetcher,
    runner: &'a mut dyn CommandRunner,
    toolchain: Option<ToolchainId>,
    force: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a Config,
        root: impl Into<PathBuf>,
        fetcher: &'a dyn Fetcher,
        runner: &'a mut dyn CommandRunner,
    ) -> Self {
        runner.set_echo(config.defaults.echo);
        Self {
            config,
            root: root.into(),
            os: HostOs::current(),
            fetcher,
            runner,
            toolchain: None,
            force: config.defaults.force,
        }
    }

    /// Override the host OS used for artifact names and conditions
    pub fn with_os(mut self, os: HostOs) -> Self {
        self.os = os;
        self
    }

    /// Apply every token in order
    ///
    /// # Errors
    /// Fatal errors (missing project file, include or dependency cycle,
    /// no toolchain) stop the session. Build failures and unknown target
    /// names are recorded in the report instead.
    pub fn run(&mut self, tokens: &[Token]) -> Result<SessionReport, BuildError> {
        let mut report = SessionReport::new();
        for token in tokens {
            self.apply(token, &mut report)?;
        }
        Ok(report)
    }

    fn apply(&mut self, token: &Token, report: &mut SessionReport) -> Result<(), BuildError> {
        tracing::debug!("Applying {:?}", token);
        match token {
            Token::Echo(echo) => self.runner.set_echo(*echo),
            Token::Force(force) => self.force = *force,
            Token::Toolchain(id) => self.toolchain = Some(*id),
            Token::Clean => {
                let (graph, _) = self.load(&self.clean_toolchain()?, report)?;
                for root in Self::roots(&graph) {
                    remove_tree(&root.join(&self.config.layout.build_dir));
                }
            }
            Token::SoftClean => {
                let (graph, _) = self.load(&self.clean_toolchain()?, report)?;
                for root in Self::roots(&graph) {
                    let dirs = OutputDirs::for_root(&root, &self.config.layout);
                    remove_tree(&dirs.obj);
                    remove_tree(&dirs.cache);
                }
            }
            Token::BuildCache => {
                let toolchain = self.toolchain()?;
                let (graph, resolution) = self.load(&toolchain, report)?;
                self.write_plans(&toolchain, &graph, &resolution)?;
            }
            Token::Build => {
                let toolchain = self.toolchain()?;
                let (graph, resolution) = self.load(&toolchain, report)?;
                let force = self.force;
                let build = Builder::new(
                    &graph.targets,
                    &resolution,
                    &toolchain,
                    &self.config.layout,
                    self.os,
                    &mut *self.runner,
                )
                .with_force(force)
                .build_all();
                report.add_build(build);
            }
            Token::Target(name) => {
                let toolchain = self.toolchain()?;
                let (graph, resolution) = self.load(&toolchain, report)?;
                let force = self.force;
                let result = Builder::new(
                    &graph.targets,
                    &resolution,
                    &toolchain,
                    &self.config.layout,
                    self.os,
                    &mut *self.runner,
                )
                .with_force(force)
                .build_target(name, true);

                match result {
                    Ok(build) => report.add_build(build),
                    Err(e) => {
                        tracing::error!("Target {} not found", name);
                        report.add_error(&e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Toolchain from the last toolchain token, the config, or detection
    fn toolchain(&self) -> Result<Toolchain, BuildError> {
        let requested = match self.toolchain {
            Some(id) => Some(id),
            None => self.config.preferred_toolchain().map_err(BuildError::Config)?,
        };

        match requested {
            Some(id) => {
                let toolchain = self.config.toolchain(id);
                if !toolchain.is_available() {
                    tracing::warn!("{} toolchain requested but '{}' was not found", id, toolchain.cc);
                }
                Ok(toolchain)
            }
            None => detect_toolchain(|id| self.config.toolchain(id)),
        }
    }

    /// Cleaning only needs the toolchain for `IF COMPILER` blocks
    fn clean_toolchain(&self) -> Result<Toolchain, BuildError> {
        match self.toolchain() {
            Err(BuildError::NoToolchain { .. }) => {
                tracing::debug!("No toolchain found, cleaning with gnu conditions");
                Ok(self.config.toolchain(ToolchainId::Gnu))
            }
            other => other,
        }
    }

    fn load(
        &self,
        toolchain: &Toolchain,
        report: &mut SessionReport,
    ) -> Result<(ProjectGraph, Resolution), BuildError> {
        let host = HostEnv::new(self.os, toolchain.id);
        let parser = Parser::new(host, self.config.layout.clone(), self.fetcher);
        let graph = parser.parse(&self.root)?;

        for diagnostic in &graph.diagnostics {
            let warning = diagnostic.to_string();
            if !report.warnings.contains(&warning) {
                report.warnings.push(warning);
            }
        }

        let resolver = Resolver::new(&graph.targets);
        let mut problems = resolver.validate().into_iter();
        if let Some(first) = problems.next() {
            for problem in problems {
                tracing::error!("{}", problem);
            }
            return Err(first.into());
        }
        let resolution = resolver.resolve()?;
        tracing::info!(
            "Loaded {} targets from {}",
            graph.targets.len(),
            self.root.display()
        );
        Ok((graph, resolution))
    }

    fn write_plans(
        &self,
        toolchain: &Toolchain,
        graph: &ProjectGraph,
        resolution: &Resolution,
    ) -> Result<(), BuildError> {
        print!("Generating build files... ");
        let planner = Planner::new(toolchain, &self.config.layout, self.os);
        let cache = BuildCache::new(self.config.layout.clone());
        for target in &graph.targets {
            let plan = planner.plan(target, &graph.targets, resolution);
            cache.write_plan(target, &plan)?;
        }
        println!("Done");
        Ok(())
    }

    /// Distinct target roots, sorted
    fn roots(graph: &ProjectGraph) -> BTreeSet<PathBuf> {
        graph.targets.iter().map(|t| t.root.clone()).collect()
    }
}
