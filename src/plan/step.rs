//! Structured plan steps
//!
//! Steps stay structured until they are persisted or executed; only then are
//! they rendered to shell command strings.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::project::HostOs;

/// One unit of work in a command plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
    /// User-supplied PREBUILD/POSTBUILD command, run verbatim
    Hook { command: String },

    Compile {
        compiler: String,
        source: PathBuf,
        object: PathBuf,
        flags: Vec<String>,
    },

    Archive {
        archiver: String,
        artifact: PathBuf,
        objects: Vec<PathBuf>,
    },

    Link {
        linker: String,
        shared: bool,
        objects: Vec<PathBuf>,
        artifact: PathBuf,
        flags: Vec<String>,
    },

    /// Copy a dependency's shared object next to the dependent's binaries
    Copy { from: PathBuf, to: PathBuf },
}

fn push_path(out: &mut Vec<String>, path: &Path) {
    out.push(path.display().to_string());
}

impl PlanStep {
    /// Render to a single shell command line
    pub fn render(&self, os: HostOs) -> String {
        let mut words: Vec<String> = Vec::new();
        match self {
            PlanStep::Hook { command } => return command.clone(),
            PlanStep::Compile {
                compiler,
                source,
                object,
                flags,
            } => {
                words.push(compiler.clone());
                words.push("-c".to_string());
                push_path(&mut words, source);
                words.push("-o".to_string());
                push_path(&mut words, object);
                words.extend(flags.iter().cloned());
            }
            PlanStep::Archive {
                archiver,
                artifact,
                objects,
            } => {
                words.push(archiver.clone());
                words.push("rcs".to_string());
                push_path(&mut words, artifact);
                for object in objects {
                    push_path(&mut words, object);
                }
            }
            PlanStep::Link {
                linker,
                shared,
                objects,
                artifact,
                flags,
            } => {
                words.push(linker.clone());
                if *shared {
                    words.push("-shared".to_string());
                }
                for object in objects {
                    push_path(&mut words, object);
                }
                words.push("-o".to_string());
                push_path(&mut words, artifact);
                words.extend(flags.iter().cloned());
            }
            PlanStep::Copy { from, to } => {
                let program = if os == HostOs::Windows { "copy" } else { "cp" };
                words.push(program.to_string());
                push_path(&mut words, from);
                push_path(&mut words, to);
            }
        }
        words.join(" ")
    }

    /// Source compiled by this step, if it is a compile step
    pub fn compiled_source(&self) -> Option<&Path> {
        match self {
            PlanStep::Compile { source, .. } => Some(source),
            _ => None,
        }
    }
}
