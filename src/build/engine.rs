//! Depth-first build engine
//!
//! Each target moves through `Building` to a terminal [`Outcome`] that
//! stays fixed for the rest of the run. Dependencies are built first; a
//! failed dependency fails every dependent without running its commands.
//!
//! A full build runs the commands of the persisted `<name>.target` file;
//! only a partial recompile runs from the in-memory plan.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::cache::{BuildCache, CacheDecision};
use crate::config::LayoutConfig;
use crate::error::{BuildError, ErrorInfo};
use crate::plan::{artifact_path, CommandPlan, Planner};
use crate::project::{HostOs, Target};
use crate::resolver::Resolution;
use crate::toolchain::Toolchain;

use super::report::{BuildReport, Outcome, TargetReport};
use super::runner::CommandRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Building,
    Done(Outcome),
}

fn find<'t>(targets: &'t [Target], name: &str) -> Option<&'t Target> {
    targets.iter().rev().find(|t| t.name == name)
}

/// Builds targets of one resolved project through a [`CommandRunner`]
pub struct Builder<'a> {
    targets: &'a [Target],
    resolution: &'a Resolution,
    layout: &'a LayoutConfig,
    os: HostOs,
    toolchain: &'a Toolchain,
    planner: Planner<'a>,
    cache: BuildCache,
    runner: &'a mut dyn CommandRunner,
    force: bool,
    states: HashMap<String, Visit>,
    /// Targets whose commands actually ran this run
    rebuilt: HashSet<String>,
    report: BuildReport,
}

impl<'a> Builder<'a> {
    pub fn new(
        targets: &'a [Target],
        resolution: &'a Resolution,
        toolchain: &'a Toolchain,
        layout: &'a LayoutConfig,
        os: HostOs,
        runner: &'a mut dyn CommandRunner,
    ) -> Self {
        Self {
            targets,
            resolution,
            layout,
            os,
            toolchain,
            planner: Planner::new(toolchain, layout, os),
            cache: BuildCache::new(layout.clone()),
            runner,
            force: false,
            states: HashMap::new(),
            rebuilt: HashSet::new(),
            report: BuildReport::new(),
        }
    }

    /// Ignore the cache for every target
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Build every target in declaration order
    pub fn build_all(mut self) -> BuildReport {
        tracing::info!("Building {} targets", self.targets.len());
        let targets = self.targets;
        for target in targets {
            self.visit(&target.name, false);
        }
        self.report
    }

    /// Build one target and its dependencies
    ///
    /// `force` applies to `name` only; dependencies follow the normal
    /// cache policy.
    ///
    /// # Errors
    /// `BuildError::TargetNotFound` if no target is called `name`.
    pub fn build_target(mut self, name: &str, force: bool) -> Result<BuildReport, BuildError> {
        if find(self.targets, name).is_none() {
            let mut available: Vec<String> = Vec::new();
            for target in self.targets {
                if !available.contains(&target.name) {
                    available.push(target.name.clone());
                }
            }
            return Err(BuildError::TargetNotFound {
                name: name.to_string(),
                available,
            });
        }

        self.visit(name, force);
        Ok(self.report)
    }

    fn visit(&mut self, name: &str, forced: bool) -> Outcome {
        match self.states.get(name) {
            Some(Visit::Done(outcome)) => return *outcome,
            Some(Visit::Building) => {
                tracing::warn!("Dependency cycle through '{}'", name);
                return Outcome::Failed;
            }
            None => {}
        }

        let targets = self.targets;
        let Some(target) = find(targets, name) else {
            tracing::debug!("No target named '{}'", name);
            return Outcome::Failed;
        };

        self.states.insert(name.to_string(), Visit::Building);
        let start = Instant::now();

        let mut dependency_rebuilt = false;
        for dep in &target.dependencies {
            if find(targets, dep).is_none() {
                tracing::debug!("Ignoring unknown dependency '{}' of '{}'", dep, name);
                continue;
            }
            if self.visit(dep, false) == Outcome::Failed {
                let report =
                    TargetReport::new(name, Outcome::Failed).with_detail(format!("dependency '{}' failed", dep));
                return self.finish(target, report, start);
            }
            dependency_rebuilt |= self.rebuilt.contains(dep.as_str());
        }

        let forced = forced || self.force;

        if target.is_external && !forced {
            if let Some(artifact) = artifact_path(target, self.layout, self.os) {
                if artifact.exists() {
                    self.runner.skip_target(name, "external, already built");
                    let report = TargetReport::new(name, Outcome::Skipped).with_detail("external, already built");
                    return self.finish(target, report, start);
                }
            }
        }

        let plan = self.planner.plan(target, targets, self.resolution);
        if plan.is_empty() {
            let report = TargetReport::new(name, Outcome::Built).with_detail("nothing to run");
            return self.finish(target, report, start);
        }

        if let Err(e) = self.persist(target, &plan) {
            return self.fail(target, BuildError::Io(e), 0, start);
        }

        // None runs the persisted plan
        let (partial, detail) = if forced {
            (None, "forced".to_string())
        } else if dependency_rebuilt {
            (None, "dependency rebuilt".to_string())
        } else {
            match self.cache.decide(target) {
                Ok(CacheDecision::UpToDate) if plan.artifact.as_ref().map_or(true, |a| a.exists()) => {
                    self.runner.skip_target(name, "up to date");
                    let report = TargetReport::new(name, Outcome::Skipped).with_detail("up to date");
                    return self.finish(target, report, start);
                }
                Ok(CacheDecision::UpToDate) => (None, "artifact missing".to_string()),
                Ok(CacheDecision::Recompile(changed)) => {
                    let detail = format!("{} source(s) changed", changed.len());
                    (Some(plan.partial(&changed)), detail)
                }
                Ok(CacheDecision::Rebuild(reason)) => (None, reason.to_string()),
                Err(e) => return self.fail(target, BuildError::Io(e), 0, start),
            }
        };

        tracing::debug!("Building {} ({})", name, detail);
        self.runner.begin_target(name);

        let commands = match partial {
            Some(partial) => partial.commands(),
            None => match self.cache.read_plan(target) {
                Ok(commands) => commands,
                Err(e) => return self.fail(target, BuildError::Io(e), 0, start),
            },
        };

        let mut commands_run = 0;
        for command in commands {
            commands_run += 1;
            if let Err(e) = self.runner.run(&command) {
                return self.fail(target, e, commands_run, start);
            }
        }

        self.rebuilt.insert(name.to_string());
        let mut report = TargetReport::new(name, Outcome::Built).with_detail(detail);
        report.commands_run = commands_run;
        self.finish(target, report, start)
    }

    fn persist(&self, target: &Target, plan: &CommandPlan) -> std::io::Result<()> {
        self.cache.write_plan(target, plan)?;
        self.cache.record_fingerprints(target, self.toolchain)?;
        Ok(())
    }

    fn fail(&mut self, target: &Target, error: BuildError, commands_run: usize, start: Instant) -> Outcome {
        tracing::debug!("{} failed: {}", target.name, error);
        let mut report = TargetReport::new(&target.name, Outcome::Failed);
        report.commands_run = commands_run;
        report.error = Some(ErrorInfo::from(&error));
        self.finish(target, report, start)
    }

    fn finish(&mut self, target: &Target, mut report: TargetReport, start: Instant) -> Outcome {
        let outcome = report.outcome;
        if outcome == Outcome::Failed {
            self.cache.invalidate(target);
        }
        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.states.insert(target.name.clone(), Visit::Done(outcome));
        self.report.push(report);
        outcome
    }
}
