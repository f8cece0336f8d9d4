//! Command plan generation
//!
//! Turns a resolved target into the ordered steps that build its artifact,
//! assuming its dependencies are already built. Planning is pure: nothing
//! is written and no directory is created here.

pub mod naming;
pub mod step;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::project::sources::{self, Language};
use crate::project::{HostOs, Target, TargetKind};
use crate::resolver::Resolution;
use crate::toolchain::Toolchain;

pub use naming::{artifact_file_name, artifact_path, object_name, OutputDirs};
pub use step::PlanStep;

/// Ordered steps for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPlan {
    pub target: String,
    pub steps: Vec<PlanStep>,
    /// Directories that must exist before the steps run
    pub directories: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(skip)]
    os: HostOs,
}

impl CommandPlan {
    /// Shell command line for every step, in order
    pub fn commands(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.render(self.os)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Same plan with compile steps limited to `changed` sources and
    /// sources whose object file is missing
    pub fn partial(&self, changed: &[PathBuf]) -> CommandPlan {
        let steps = self
            .steps
            .iter()
            .filter(|step| match step {
                PlanStep::Compile { source, object, .. } => {
                    changed.iter().any(|c| c == source) || !object.exists()
                }
                _ => true,
            })
            .cloned()
            .collect();

        CommandPlan {
            steps,
            ..self.clone()
        }
    }
}

fn find<'t>(targets: &'t [Target], name: &str) -> Option<&'t Target> {
    targets.iter().rev().find(|t| t.name == name)
}

/// Generates [`CommandPlan`]s for one toolchain and host
pub struct Planner<'a> {
    toolchain: &'a Toolchain,
    layout: &'a LayoutConfig,
    os: HostOs,
}

impl<'a> Planner<'a> {
    pub fn new(toolchain: &'a Toolchain, layout: &'a LayoutConfig, os: HostOs) -> Self {
        Self {
            toolchain,
            layout,
            os,
        }
    }

    /// Plan `target`
    ///
    /// `targets` is the full set dependencies are looked up in; unknown
    /// dependency names contribute nothing.
    pub fn plan(&self, target: &Target, targets: &[Target], resolution: &Resolution) -> CommandPlan {
        let dirs = OutputDirs::for_root(&target.root, self.layout);
        let artifact = artifact_path(target, self.layout, self.os);

        let mut steps: Vec<PlanStep> = target
            .prebuild
            .iter()
            .map(|command| PlanStep::Hook {
                command: command.clone(),
            })
            .collect();

        let mut link_flags: Vec<String> = target.libraries.iter().map(|l| format!("-l{}", l)).collect();
        let mut copies = Vec::new();
        for dep in target.dependencies.iter().filter_map(|d| find(targets, d)) {
            self.dependency_flags(target, dep, &mut link_flags, &mut copies);
        }

        let mut directories = vec![dirs.cache.clone()];

        if let Some(artifact) = &artifact {
            let compile_flags = self.compile_flags(target, resolution);
            let mut objects = Vec::new();

            for source in &target.sources {
                let Some(language) = sources::language_of(source) else {
                    tracing::debug!("Skipping {} (not compilable)", source.display());
                    continue;
                };
                let compiler = match language {
                    Language::C => &self.toolchain.cc,
                    Language::Cxx => &self.toolchain.cxx,
                };
                let object = dirs.obj.join(object_name(&target.root, source));
                objects.push(object.clone());
                steps.push(PlanStep::Compile {
                    compiler: compiler.clone(),
                    source: source.clone(),
                    object,
                    flags: compile_flags.clone(),
                });
            }

            steps.push(match target.kind {
                TargetKind::StaticLibrary => PlanStep::Archive {
                    archiver: self.toolchain.ar.clone(),
                    artifact: artifact.clone(),
                    objects,
                },
                kind => PlanStep::Link {
                    linker: self.toolchain.link.clone(),
                    shared: kind == TargetKind::DynamicLibrary,
                    objects,
                    artifact: artifact.clone(),
                    flags: link_flags,
                },
            });

            directories.push(dirs.obj.clone());
            if let Some(parent) = artifact.parent() {
                directories.push(parent.to_path_buf());
            }
        }

        if !copies.is_empty() && !directories.contains(&dirs.bin) {
            directories.push(dirs.bin.clone());
        }
        steps.extend(copies);
        steps.extend(target.postbuild.iter().map(|command| PlanStep::Hook {
            command: command.clone(),
        }));

        tracing::debug!("Planned {} steps for {}", steps.len(), target.name);

        CommandPlan {
            target: target.name.clone(),
            steps,
            directories,
            artifact,
            os: self.os,
        }
    }

    fn compile_flags(&self, target: &Target, resolution: &Resolution) -> Vec<String> {
        let mut flags: Vec<String> = target.defines.iter().map(|d| format!("-D{}", d)).collect();
        flags.extend(
            resolution
                .include_dirs(&target.name)
                .iter()
                .map(|dir| format!("-I{}", dir.display())),
        );
        if target.kind == TargetKind::DynamicLibrary {
            flags.push("-fPIC".to_string());
        }
        flags
    }

    /// Link flags and copy steps one dependency contributes
    fn dependency_flags(
        &self,
        target: &Target,
        dep: &Target,
        flags: &mut Vec<String>,
        copies: &mut Vec<PlanStep>,
    ) {
        let dep_dirs = OutputDirs::for_root(&dep.root, self.layout);
        let own_libs = dep.libraries.iter().map(|l| format!("-l{}", l));

        match dep.kind {
            TargetKind::Executable => {}
            TargetKind::Interface => flags.extend(own_libs),
            TargetKind::StaticLibrary => {
                flags.push(format!("-L{}", dep_dirs.lib.display()));
                flags.push(format!("-l{}", dep.name));
                flags.extend(own_libs);
            }
            TargetKind::DynamicLibrary => {
                flags.push(format!("-L{}", dep_dirs.bin.display()));
                flags.push(format!("-l{}", dep.name));
                flags.extend(own_libs);

                if let Some(file) = artifact_file_name(dep.kind, &dep.name, self.os) {
                    let to = OutputDirs::for_root(&target.root, self.layout).bin.join(&file);
                    copies.push(PlanStep::Copy {
                        from: dep_dirs.bin.join(&file),
                        to,
                    });
                }
            }
        }
    }
}

/// Fingerprinted files of `target`: its sources, then the project file
pub fn tracked_files(target: &Target, layout: &LayoutConfig) -> Vec<PathBuf> {
    let mut files = target.sources.clone();
    files.push(target.root.join(&layout.config_file));
    files
}

/// Whether `path` is compiled (as opposed to only fingerprinted)
pub fn is_compilable(path: &Path) -> bool {
    sources::language_of(path).is_some()
}
