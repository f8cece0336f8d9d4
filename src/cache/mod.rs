//! Incremental build cache
//!
//! Per target, `<root>/build/cache/` holds the rendered plan
//! (`<name>.target`), the fingerprints of the current planning pass
//! (`<name>.fingerprint`) and those of the pass before it
//! (`<name>.fingerprint.prev`). A target may be skipped when the two
//! fingerprint files are identical. The last line of a fingerprint file
//! stands for the toolchain, so switching compilers rebuilds everything.

pub mod fingerprint;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::LayoutConfig;
use crate::plan::{self, CommandPlan, OutputDirs};
use crate::project::Target;
use crate::toolchain::Toolchain;

pub use fingerprint::{hash_file, hash_str, Fingerprint, FingerprintSet, MISSING_HASH};

/// Why a target has to run its whole plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// No previous fingerprints (first build, or last build failed)
    NoHistory,
    /// Files were added, removed or reordered
    FileSetChanged,
    /// A header or the project file changed
    Changed(Vec<PathBuf>),
    /// Built last time with a different compiler
    ToolchainChanged,
}

impl std::fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebuildReason::NoHistory => f.write_str("no previous build"),
            RebuildReason::FileSetChanged => f.write_str("file set changed"),
            RebuildReason::Changed(files) => {
                let names: Vec<_> = files.iter().map(|p| p.display().to_string()).collect();
                write!(f, "changed: {}", names.join(", "))
            }
            RebuildReason::ToolchainChanged => f.write_str("toolchain changed"),
        }
    }
}

/// Outcome of comparing the current and previous fingerprints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    UpToDate,
    /// Only these compilable sources changed
    Recompile(Vec<PathBuf>),
    Rebuild(RebuildReason),
}

impl CacheDecision {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, CacheDecision::UpToDate)
    }
}

/// Paths of the persisted state for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFiles {
    pub plan: PathBuf,
    pub current: PathBuf,
    pub previous: PathBuf,
}

fn read_lines(path: &Path) -> io::Result<Option<Vec<String>>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.lines().map(str::to_string).collect())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Reads and writes the persisted plan and fingerprint files
#[derive(Debug, Clone)]
pub struct BuildCache {
    layout: LayoutConfig,
}

impl BuildCache {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    pub fn files(&self, target: &Target) -> CacheFiles {
        let dir = OutputDirs::for_root(&target.root, &self.layout).cache;
        CacheFiles {
            plan: dir.join(format!("{}.target", target.name)),
            current: dir.join(format!("{}.fingerprint", target.name)),
            previous: dir.join(format!("{}.fingerprint.prev", target.name)),
        }
    }

    /// Create the plan's directories and write its commands to the plan file
    pub fn write_plan(&self, target: &Target, plan: &CommandPlan) -> io::Result<PathBuf> {
        for dir in &plan.directories {
            fs::create_dir_all(dir)?;
        }

        let path = self.files(target).plan;
        let mut content = String::new();
        for command in plan.commands() {
            content.push_str(&command);
            content.push('\n');
        }
        fs::write(&path, content)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Commands of the persisted plan, one per line
    pub fn read_plan(&self, target: &Target) -> io::Result<Vec<String>> {
        Ok(read_lines(&self.files(target).plan)?.unwrap_or_default())
    }

    /// Rotate the fingerprint files and record the current fingerprints
    pub fn record_fingerprints(&self, target: &Target, toolchain: &Toolchain) -> io::Result<FingerprintSet> {
        let files = self.files(target);
        if let Some(dir) = files.current.parent() {
            fs::create_dir_all(dir)?;
        }

        if files.current.exists() {
            remove_if_exists(&files.previous)?;
            fs::rename(&files.current, &files.previous)?;
        } else {
            // a stale snapshot must not be compared against a fresh set
            remove_if_exists(&files.previous)?;
        }

        let set = FingerprintSet::compute(&plan::tracked_files(target, &self.layout), toolchain);
        fs::write(&files.current, set.render())?;
        Ok(set)
    }

    /// Compare the current fingerprints with the previous pass
    pub fn decide(&self, target: &Target) -> io::Result<CacheDecision> {
        let files = self.files(target);
        let (Some(current), Some(previous)) = (read_lines(&files.current)?, read_lines(&files.previous)?) else {
            return Ok(CacheDecision::Rebuild(RebuildReason::NoHistory));
        };

        if current == previous {
            return Ok(CacheDecision::UpToDate);
        }

        let name_hash = |line: &String| line.split_whitespace().next().map(str::to_string);
        let same_files = current.len() == previous.len()
            && current.iter().zip(&previous).all(|(a, b)| name_hash(a) == name_hash(b));
        if !same_files {
            return Ok(CacheDecision::Rebuild(RebuildReason::FileSetChanged));
        }

        let tracked = plan::tracked_files(target, &self.layout);
        let differing: Vec<usize> = current
            .iter()
            .zip(&previous)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        if differing.iter().any(|&i| i >= tracked.len()) {
            return Ok(CacheDecision::Rebuild(RebuildReason::ToolchainChanged));
        }
        let changed: Vec<PathBuf> = differing.iter().map(|&i| tracked[i].clone()).collect();

        if !changed.is_empty() && changed.iter().all(|p| plan::is_compilable(p)) {
            Ok(CacheDecision::Recompile(changed))
        } else {
            Ok(CacheDecision::Rebuild(RebuildReason::Changed(changed)))
        }
    }

    /// Drop the current fingerprints so the next run cannot skip `target`
    pub fn invalidate(&self, target: &Target) {
        let current = self.files(target).current;
        if let Err(e) = remove_if_exists(&current) {
            tracing::debug!("Could not remove {}: {}", current.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{HostOs, TargetKind};
    use crate::resolver::Resolver;
    use crate::toolchain::Toolchain;
    use tempfile::TempDir;

    fn project(dir: &Path) -> Target {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("proj.bscf"), "TARGET EXEC app ALL\n").unwrap();
        fs::write(dir.join("src/main.c"), "int main() { return 0; }").unwrap();
        fs::write(dir.join("src/util.c"), "int util = 1;").unwrap();
        fs::write(dir.join("src/util.h"), "extern int util;").unwrap();
        Target::new(TargetKind::Executable, "app", dir).with_sources(["src/main.c", "src/util.c", "src/util.h"])
    }

    fn cache() -> BuildCache {
        BuildCache::new(LayoutConfig::default())
    }

    fn gnu() -> Toolchain {
        Toolchain::gnu()
    }

    #[test]
    fn test_first_pass_has_no_history() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();

        cache.record_fingerprints(&target, &gnu()).unwrap();
        assert_eq!(
            cache.decide(&target).unwrap(),
            CacheDecision::Rebuild(RebuildReason::NoHistory)
        );
        assert!(cache.files(&target).current.exists());
        assert!(!cache.files(&target).previous.exists());
    }

    #[test]
    fn test_unchanged_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();

        cache.record_fingerprints(&target, &gnu()).unwrap();
        cache.record_fingerprints(&target, &gnu()).unwrap();
        assert!(cache.decide(&target).unwrap().is_up_to_date());
    }

    #[test]
    fn test_source_edit_recompiles_only_that_source() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();

        cache.record_fingerprints(&target, &gnu()).unwrap();
        fs::write(dir.path().join("src/util.c"), "int util = 2;").unwrap();
        cache.record_fingerprints(&target, &gnu()).unwrap();

        assert_eq!(
            cache.decide(&target).unwrap(),
            CacheDecision::Recompile(vec![dir.path().join("src/util.c")])
        );
    }

    #[test]
    fn test_header_or_config_edit_rebuilds() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();

        cache.record_fingerprints(&target, &gnu()).unwrap();
        fs::write(dir.path().join("src/util.h"), "extern long util;").unwrap();
        cache.record_fingerprints(&target, &gnu()).unwrap();
        assert_eq!(
            cache.decide(&target).unwrap(),
            CacheDecision::Rebuild(RebuildReason::Changed(vec![dir.path().join("src/util.h")]))
        );

        fs::write(dir.path().join("proj.bscf"), "TARGET EXEC app ALL\nLIB app m\n").unwrap();
        cache.record_fingerprints(&target, &gnu()).unwrap();
        assert!(matches!(
            cache.decide(&target).unwrap(),
            CacheDecision::Rebuild(RebuildReason::Changed(files)) if files == vec![dir.path().join("proj.bscf")]
        ));
    }

    #[test]
    fn test_new_file_changes_file_set() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();

        cache.record_fingerprints(&target, &gnu()).unwrap();
        fs::write(dir.path().join("src/extra.c"), "").unwrap();
        let grown = target.clone().with_sources(["src/extra.c"]);
        cache.record_fingerprints(&grown, &gnu()).unwrap();

        assert_eq!(
            cache.decide(&grown).unwrap(),
            CacheDecision::Rebuild(RebuildReason::FileSetChanged)
        );
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();

        cache.record_fingerprints(&target, &gnu()).unwrap();
        cache.record_fingerprints(&target, &gnu()).unwrap();
        cache.invalidate(&target);
        // stale .prev is discarded on the next pass
        cache.record_fingerprints(&target, &gnu()).unwrap();

        assert!(!cache.files(&target).previous.exists());
        assert_eq!(
            cache.decide(&target).unwrap(),
            CacheDecision::Rebuild(RebuildReason::NoHistory)
        );
    }

    #[test]
    fn test_toolchain_switch_rebuilds() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();

        cache.record_fingerprints(&target, &gnu()).unwrap();
        cache.record_fingerprints(&target, &Toolchain::clang()).unwrap();
        assert_eq!(
            cache.decide(&target).unwrap(),
            CacheDecision::Rebuild(RebuildReason::ToolchainChanged)
        );

        cache.record_fingerprints(&target, &Toolchain::clang()).unwrap();
        assert!(cache.decide(&target).unwrap().is_up_to_date());
    }

    #[test]
    fn test_write_and_read_plan() {
        let dir = TempDir::new().unwrap();
        let target = project(dir.path());
        let cache = cache();
        let toolchain = gnu();
        let layout = LayoutConfig::default();
        let targets = vec![target.clone()];
        let resolution = Resolver::new(&targets).resolve().unwrap();
        let plan = crate::plan::Planner::new(&toolchain, &layout, HostOs::Linux).plan(&target, &targets, &resolution);

        let path = cache.write_plan(&target, &plan).unwrap();
        assert_eq!(path, dir.path().join("build/cache/app.target"));
        assert!(dir.path().join("build/obj").is_dir());
        assert!(dir.path().join("build/bin").is_dir());

        let commands = cache.read_plan(&target).unwrap();
        assert_eq!(commands, plan.commands());
        assert_eq!(commands.len(), 3);
    }

    #[test]
    fn test_rebuild_reason_display() {
        assert_eq!(RebuildReason::NoHistory.to_string(), "no previous build");
        assert_eq!(
            RebuildReason::Changed(vec![PathBuf::from("a.h")]).to_string(),
            "changed: a.h"
        );
        assert_eq!(RebuildReason::ToolchainChanged.to_string(), "toolchain changed");
    }
}
