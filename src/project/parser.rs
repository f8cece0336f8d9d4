//! `proj.bscf` parser and target expander
//!
//! Reads a project description line by line, expanding sub-project
//! inclusions in place. The result is a flat [`ProjectGraph`] of targets in
//! declaration order plus every non-fatal finding as a [`Diagnostic`].
//!
//! Grammar, one directive per line, `#` starts a comment:
//!
//! ```text
//! TARGET <EXEC|SLIB|DLIB|INTERFACE> <name> [file...] [GLOB dir] [RECURSE dir] [ALL]
//! INCLUDE <subdir>
//! GITINCLUDE <url> <name> [branch]
//! BUILTIN <name>
//! DEPEND <target> <dep>...
//! PREBUILD <target> <command...>
//! POSTBUILD <target> <command...>
//! DEFINE <target> <macro...>
//! LIB <target> <lib>...
//! INCDIR <target> <dir>...
//! IF [NOT] <PLATFORM|COMPILER> <id> ... ENDIF
//! ALLOWSKIP <target>...
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::condition::{self, HostEnv};
use super::directive::{Directive, DirectiveTable};
use super::fetch::{self, Fetcher, Source};
use super::sources;
use super::target::{Target, TargetKind};
use crate::config::LayoutConfig;
use crate::error::ProjectError;

/// A non-fatal finding reported while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.line, self.message)
    }
}

/// Every target reachable from a root project
#[derive(Debug, Clone, Default)]
pub struct ProjectGraph {
    pub root: PathBuf,
    /// Targets in declaration order; included projects are spliced in at
    /// their `INCLUDE` line
    pub targets: Vec<Target>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProjectGraph {
    /// Most recently declared target called `name`
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().rev().find(|t| t.name == name)
    }

    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name.clone()).collect()
    }
}

/// Mutable state shared across the whole expansion
#[derive(Default)]
struct Expansion {
    targets: Vec<Target>,
    diagnostics: Vec<Diagnostic>,
    /// Projects currently being parsed, outermost first
    stack: Vec<PathBuf>,
    /// Finished projects and the target positions they contributed
    done: HashMap<PathBuf, Vec<usize>>,
}

impl Expansion {
    fn warn(&mut self, file: &Path, line: usize, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            file: file.to_path_buf(),
            line,
            message: message.into(),
        };
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

/// Targets visible to the file being parsed: its own declarations and
/// everything spliced in by its inclusions
#[derive(Default)]
struct Scope {
    positions: Vec<usize>,
    index: HashMap<String, usize>,
}

impl Scope {
    fn declare(&mut self, name: &str, position: usize) {
        self.positions.push(position);
        self.index.insert(name.to_string(), position);
    }

    fn splice(&mut self, positions: &[usize], targets: &[Target]) {
        for &position in positions {
            if !self.positions.contains(&position) {
                self.positions.push(position);
            }
            self.index.insert(targets[position].name.clone(), position);
        }
    }
}

/// Location of the line being processed
#[derive(Clone, Copy)]
struct Site<'a> {
    dir: &'a Path,
    file: &'a Path,
    line: usize,
    external: bool,
}

/// Split off the first whitespace-delimited word
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Canonical key for cycle and repeat detection
fn project_key(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Expands a root `proj.bscf` into a [`ProjectGraph`]
pub struct Parser<'a> {
    table: DirectiveTable,
    host: HostEnv,
    layout: LayoutConfig,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Parser<'a> {
    pub fn new(host: HostEnv, layout: LayoutConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            table: DirectiveTable::standard(),
            host,
            layout,
            fetcher,
        }
    }

    /// Parse the project rooted at `root`
    ///
    /// # Errors
    /// * `ProjectError::MissingConfig` - `root` has no project description
    /// * `ProjectError::CyclicInclude` - a project includes itself
    /// * `ProjectError::Io` - a description exists but cannot be read
    pub fn parse(&self, root: &Path) -> Result<ProjectGraph, ProjectError> {
        if !self.has_config(root) {
            return Err(ProjectError::MissingConfig {
                dir: root.to_path_buf(),
                file: self.layout.config_file.clone(),
            });
        }

        let mut state = Expansion::default();
        self.parse_project(root, false, &mut state)?;

        tracing::debug!(
            "Parsed {} targets with {} diagnostics",
            state.targets.len(),
            state.diagnostics.len()
        );

        Ok(ProjectGraph {
            root: root.to_path_buf(),
            targets: state.targets,
            diagnostics: state.diagnostics,
        })
    }

    fn has_config(&self, dir: &Path) -> bool {
        dir.join(&self.layout.config_file).is_file()
    }

    fn parse_project(
        &self,
        dir: &Path,
        external: bool,
        state: &mut Expansion,
    ) -> Result<Vec<usize>, ProjectError> {
        let key = project_key(dir);

        if let Some(start) = state.stack.iter().position(|p| *p == key) {
            let mut chain = state.stack[start..].to_vec();
            chain.push(key);
            return Err(ProjectError::CyclicInclude { chain });
        }
        if let Some(positions) = state.done.get(&key) {
            tracing::debug!("{} already parsed, reusing its targets", dir.display());
            return Ok(positions.clone());
        }

        let file = dir.join(&self.layout.config_file);
        let content = fs::read_to_string(&file)?;
        tracing::debug!("Parsing {}", file.display());

        state.stack.push(key.clone());
        let positions = self.parse_content(dir, &file, &content, external, state)?;
        state.stack.pop();

        state.done.insert(key, positions.clone());
        Ok(positions)
    }

    fn parse_content(
        &self,
        dir: &Path,
        file: &Path,
        content: &str,
        external: bool,
        state: &mut Expansion,
    ) -> Result<Vec<usize>, ProjectError> {
        let mut scope = Scope::default();
        let mut lines = content.lines().enumerate();

        while let Some((idx, raw)) = lines.next() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            let site = Site {
                dir,
                file,
                line: idx + 1,
                external,
            };
            let (keyword, rest) = split_word(line);

            let Some(directive) = self.table.lookup(keyword) else {
                state.warn(file, site.line, format!("Unknown command: {}", keyword));
                continue;
            };

            match directive {
                Directive::Target => self.declare_target(site, rest, &mut scope, state),
                Directive::Include => {
                    let (name, _) = split_word(rest);
                    if name.is_empty() {
                        state.warn(file, site.line, "INCLUDE requires a directory");
                        continue;
                    }
                    let sub = dir.join(&self.layout.lib_dir).join(name);
                    self.include(site, &sub, external, &mut scope, state)?;
                }
                Directive::GitInclude => self.git_include(site, rest, &mut scope, state)?,
                Directive::Builtin => self.builtin(site, rest, &mut scope, state)?,
                Directive::Depend => {
                    let mut words = rest.split_whitespace();
                    let Some(position) = self.local_target(site, words.next(), &scope, state) else {
                        continue;
                    };
                    for dep in words {
                        if !scope.index.contains_key(dep) {
                            state.warn(
                                file,
                                site.line,
                                format!("Unknown dependency '{}' (targets must be declared before use)", dep),
                            );
                            continue;
                        }
                        let target = &mut state.targets[position];
                        if !target.dependencies.iter().any(|d| d == dep) {
                            target.dependencies.push(dep.to_string());
                        }
                    }
                }
                Directive::Prebuild | Directive::Postbuild | Directive::Define => {
                    let (name, text) = split_word(rest);
                    let Some(position) = self.local_target(site, Some(name), &scope, state) else {
                        continue;
                    };
                    if text.is_empty() {
                        state.warn(file, site.line, format!("{} requires a value", keyword));
                        continue;
                    }
                    let target = &mut state.targets[position];
                    let list = match directive {
                        Directive::Prebuild => &mut target.prebuild,
                        Directive::Postbuild => &mut target.postbuild,
                        _ => &mut target.defines,
                    };
                    list.push(text.to_string());
                }
                Directive::Lib => {
                    let mut words = rest.split_whitespace();
                    let Some(position) = self.local_target(site, words.next(), &scope, state) else {
                        continue;
                    };
                    state.targets[position]
                        .libraries
                        .extend(words.map(str::to_string));
                }
                Directive::IncDir => {
                    let mut words = rest.split_whitespace();
                    let Some(position) = self.local_target(site, words.next(), &scope, state) else {
                        continue;
                    };
                    let target = &mut state.targets[position];
                    for inc in words {
                        target.add_include_dir(dir.join(inc));
                    }
                }
                Directive::If => {
                    let tokens: Vec<&str> = rest.split_whitespace().collect();
                    let taken = match condition::evaluate(&tokens, &self.host) {
                        Ok(taken) => taken,
                        Err(message) => {
                            state.warn(file, site.line, message);
                            false
                        }
                    };
                    if !taken && !self.skip_block(&mut lines) {
                        state.warn(file, site.line, "IF without matching ENDIF");
                    }
                }
                Directive::EndIf => {}
                Directive::AllowSkip => {
                    for name in rest.split_whitespace() {
                        if let Some(position) = self.local_target(site, Some(name), &scope, state) {
                            state.targets[position].is_external = true;
                        }
                    }
                }
            }
        }

        Ok(scope.positions)
    }

    /// Consume lines up to the `ENDIF` closing the current block
    ///
    /// Returns false if the input ends first.
    fn skip_block<'c>(&self, lines: &mut impl Iterator<Item = (usize, &'c str)>) -> bool {
        let mut depth = 1usize;
        for (_, raw) in lines {
            let (keyword, _) = split_word(strip_comment(raw));
            match self.table.lookup(keyword) {
                Some(Directive::If) => depth += 1,
                Some(Directive::EndIf) => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn local_target(
        &self,
        site: Site<'_>,
        name: Option<&str>,
        scope: &Scope,
        state: &mut Expansion,
    ) -> Option<usize> {
        let name = name.filter(|n| !n.is_empty());
        let Some(name) = name else {
            state.warn(site.file, site.line, "Missing target name");
            return None;
        };
        let position = scope.index.get(name).copied();
        if position.is_none() {
            state.warn(
                site.file,
                site.line,
                format!("Unknown target '{}' (targets must be declared before use)", name),
            );
        }
        position
    }

    fn declare_target(&self, site: Site<'_>, rest: &str, scope: &mut Scope, state: &mut Expansion) {
        let mut words = rest.split_whitespace();

        let (Some(kind_word), Some(name)) = (words.next(), words.next()) else {
            state.warn(site.file, site.line, "TARGET requires a type and a name");
            return;
        };
        let Some(kind) = TargetKind::from_keyword(kind_word) else {
            state.warn(site.file, site.line, format!("Invalid target type: {}", kind_word));
            return;
        };

        let mut target = Target::new(kind, name, site.dir);
        target.is_external = site.external;

        // Some(recursive) while a GLOB/RECURSE waits for its directory
        let mut pending_scan: Option<bool> = None;
        for word in words {
            if let Some(recursive) = pending_scan.take() {
                self.scan_into(site, &mut target, &site.dir.join(word), recursive, state);
                continue;
            }
            match word {
                "ALL" => {
                    let src = site.dir.join(&self.layout.src_dir);
                    self.scan_into(site, &mut target, &src, true, state);
                    break;
                }
                "GLOB" => pending_scan = Some(false),
                "RECURSE" => pending_scan = Some(true),
                file => target.sources.push(site.dir.join(file)),
            }
        }
        if pending_scan.is_some() {
            state.warn(site.file, site.line, "GLOB/RECURSE requires a directory");
        }

        let position = state.targets.len();
        scope.declare(&target.name, position);
        state.targets.push(target);
    }

    fn scan_into(
        &self,
        site: Site<'_>,
        target: &mut Target,
        dir: &Path,
        recursive: bool,
        state: &mut Expansion,
    ) {
        match sources::scan_dir(dir, recursive) {
            Ok(files) => {
                target.sources.extend(files);
                target.add_include_dir(dir.to_path_buf());
            }
            Err(e) => state.warn(site.file, site.line, format!("Cannot scan {}: {}", dir.display(), e)),
        }
    }

    fn include(
        &self,
        site: Site<'_>,
        sub: &Path,
        external: bool,
        scope: &mut Scope,
        state: &mut Expansion,
    ) -> Result<(), ProjectError> {
        if !self.has_config(sub) {
            state.warn(
                site.file,
                site.line,
                format!("{} does not exist in {}", self.layout.config_file, sub.display()),
            );
            return Ok(());
        }
        let positions = self.parse_project(sub, external, state)?;
        scope.splice(&positions, &state.targets);
        Ok(())
    }

    fn git_include(
        &self,
        site: Site<'_>,
        rest: &str,
        scope: &mut Scope,
        state: &mut Expansion,
    ) -> Result<(), ProjectError> {
        let mut words = rest.split_whitespace();
        let (Some(url), Some(name)) = (words.next(), words.next()) else {
            state.warn(site.file, site.line, "GITINCLUDE requires a url and a name");
            return Ok(());
        };
        let mut source = Source::new(url);
        if let Some(branch) = words.next() {
            source = source.with_branch(branch);
        }

        let dest = site.dir.join(&self.layout.lib_dir).join(name);
        if !self.fetcher.fetch(&source, &dest) {
            if !self.has_config(&dest) {
                let err = ProjectError::FetchFailed {
                    name: name.to_string(),
                    url: url.to_string(),
                };
                state.warn(site.file, site.line, err.to_string());
                return Ok(());
            }
            state.warn(
                site.file,
                site.line,
                format!("Failed to update '{}', using existing checkout", name),
            );
        }
        self.include(site, &dest, true, scope, state)
    }

    fn builtin(
        &self,
        site: Site<'_>,
        rest: &str,
        scope: &mut Scope,
        state: &mut Expansion,
    ) -> Result<(), ProjectError> {
        let (name, _) = split_word(rest);
        if name.is_empty() {
            state.warn(site.file, site.line, "BUILTIN requires a name");
            return Ok(());
        }

        let lib_dir = site.dir.join(&self.layout.lib_dir);
        let dest = match fetch::fetch_builtin(self.fetcher, name, &lib_dir, &self.layout.config_file) {
            Ok(dest) => dest,
            Err(e @ ProjectError::UnknownBuiltin(_)) => {
                state.warn(site.file, site.line, e.to_string());
                return Ok(());
            }
            Err(e) => {
                let existing = lib_dir.join(name);
                if !self.has_config(&existing) {
                    state.warn(site.file, site.line, e.to_string());
                    return Ok(());
                }
                state.warn(
                    site.file,
                    site.line,
                    format!("{}, using existing checkout", e),
                );
                existing
            }
        };
        self.include(site, &dest, true, scope, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::condition::HostOs;
    use crate::project::fetch::MockFetcher;
    use crate::toolchain::ToolchainId;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn offline() -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|_, _| false);
        fetcher
    }

    fn parse_with(root: &Path, host: HostEnv, fetcher: &dyn Fetcher) -> ProjectGraph {
        Parser::new(host, LayoutConfig::default(), fetcher)
            .parse(root)
            .unwrap()
    }

    fn parse(root: &Path) -> ProjectGraph {
        parse_with(root, HostEnv::new(HostOs::Linux, ToolchainId::Gnu), &offline())
    }

    #[test]
    fn test_split_word() {
        assert_eq!(split_word("app echo hi  there"), ("app", "echo hi  there"));
        assert_eq!(split_word("  app  "), ("app", ""));
        assert_eq!(split_word(""), ("", ""));
    }

    #[test]
    fn test_missing_root_config() {
        let dir = TempDir::new().unwrap();
        let fetcher = offline();
        let err = Parser::new(
            HostEnv::new(HostOs::Linux, ToolchainId::Gnu),
            LayoutConfig::default(),
            &fetcher,
        )
        .parse(dir.path())
        .unwrap_err();
        assert!(matches!(err, ProjectError::MissingConfig { .. }));
    }

    #[test]
    fn test_target_with_all() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.c", "");
        write(dir.path(), "src/util.c", "");
        write(dir.path(), "proj.bscf", "TARGET EXEC app ALL\n");

        let graph = parse(dir.path());
        let app = graph.target("app").unwrap();

        assert_eq!(app.kind, TargetKind::Executable);
        assert_eq!(
            app.sources,
            vec![dir.path().join("src/main.c"), dir.path().join("src/util.c")]
        );
        assert_eq!(app.include_dirs, vec![dir.path().join("src")]);
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn test_all_ends_token_list() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.c", "");
        write(dir.path(), "proj.bscf", "TARGET EXEC app ALL extra.c\n");

        let graph = parse(dir.path());
        assert_eq!(graph.target("app").unwrap().sources.len(), 1);
    }

    #[test]
    fn test_glob_and_explicit_sources() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "gen/a.c", "");
        write(dir.path(), "gen/deep/b.c", "");
        write(dir.path(), "extra.cpp", "");
        write(
            dir.path(),
            "proj.bscf",
            "TARGET SLIB core extra.cpp GLOB gen\n",
        );

        let graph = parse(dir.path());
        let core = graph.target("core").unwrap();
        assert_eq!(
            core.sources,
            vec![dir.path().join("extra.cpp"), dir.path().join("gen/a.c")]
        );
        assert_eq!(core.include_dirs, vec![dir.path().join("gen")]);
    }

    #[test]
    fn test_recurse_and_missing_scan_dir() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "gen/deep/b.c", "");
        write(dir.path(), "proj.bscf", "TARGET SLIB core RECURSE gen GLOB nope\n");

        let graph = parse(dir.path());
        assert_eq!(
            graph.target("core").unwrap().sources,
            vec![dir.path().join("gen/deep/b.c")]
        );
        assert_eq!(graph.diagnostics.len(), 1);
        assert!(graph.diagnostics[0].message.contains("nope"));
    }

    #[test]
    fn test_directives_apply_to_target() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            r#"
# comment line
TARGET SLIB core core.c
TARGET EXEC app main.c   # trailing comment
DEPEND app core
DEPEND app core
LIB app m pthread
INCDIR app include third_party
DEFINE app VERSION=2
PREBUILD app echo before build
POSTBUILD app echo after
"#,
        );

        let graph = parse(dir.path());
        let app = graph.target("app").unwrap();

        assert_eq!(app.dependencies, vec!["core"]);
        assert_eq!(app.libraries, vec!["m", "pthread"]);
        assert_eq!(
            app.include_dirs,
            vec![dir.path().join("include"), dir.path().join("third_party")]
        );
        assert_eq!(app.defines, vec!["VERSION=2"]);
        assert_eq!(app.prebuild, vec!["echo before build"]);
        assert_eq!(app.postbuild, vec!["echo after"]);
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn test_forward_reference_is_diagnostic() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            "DEPEND app core\nTARGET EXEC app main.c\nTARGET SLIB core core.c\n",
        );

        let graph = parse(dir.path());
        assert!(graph.target("app").unwrap().dependencies.is_empty());
        assert_eq!(graph.diagnostics.len(), 1);
        assert_eq!(graph.diagnostics[0].line, 1);
        assert!(graph.diagnostics[0].message.contains("'app'"));
    }

    #[test]
    fn test_undeclared_dependency_adds_no_edge() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            "TARGET EXEC app main.c\nDEPEND app ghost\nTARGET SLIB ghost g.c\n",
        );

        let graph = parse(dir.path());
        assert!(graph.target("app").unwrap().dependencies.is_empty());
        assert_eq!(graph.diagnostics.len(), 1);
        assert!(graph.diagnostics[0].message.contains("'ghost'"));
    }

    #[test]
    fn test_unknown_command_and_kind() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            "FROBNICATE x\nTARGET BLOB thing\nTARGET EXEC\n",
        );

        let graph = parse(dir.path());
        assert!(graph.targets.is_empty());
        let messages: Vec<_> = graph.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("FROBNICATE"));
        assert!(messages[1].contains("BLOB"));
    }

    #[test]
    fn test_include_splices_subproject() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/core/proj.bscf", "TARGET SLIB core core.c\n");
        write(
            dir.path(),
            "proj.bscf",
            "TARGET EXEC app main.c\nINCLUDE core\nDEPEND app core\nLIB core m\n",
        );

        let graph = parse(dir.path());
        assert_eq!(graph.target_names(), vec!["app", "core"]);

        let core = graph.target("core").unwrap();
        assert_eq!(core.root, dir.path().join("lib/core"));
        assert_eq!(core.sources, vec![dir.path().join("lib/core/core.c")]);
        assert_eq!(core.libraries, vec!["m"]);
        assert!(!core.is_external);
        assert_eq!(graph.target("app").unwrap().dependencies, vec!["core"]);
    }

    #[test]
    fn test_include_missing_config_is_diagnostic() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lib/ghost")).unwrap();
        write(dir.path(), "proj.bscf", "INCLUDE ghost\nTARGET EXEC app main.c\n");

        let graph = parse(dir.path());
        assert_eq!(graph.target_names(), vec!["app"]);
        assert_eq!(graph.diagnostics.len(), 1);
    }

    #[test]
    fn test_diamond_include_parsed_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/base/proj.bscf", "TARGET SLIB base base.c\n");
        write(dir.path(), "lib/a/proj.bscf", "INCLUDE ../../base\nTARGET SLIB a a.c\nDEPEND a base\n");
        write(dir.path(), "lib/b/proj.bscf", "INCLUDE ../../base\nTARGET SLIB b b.c\nDEPEND b base\n");
        write(dir.path(), "proj.bscf", "INCLUDE a\nINCLUDE b\n");
        fs::create_dir_all(dir.path().join("lib/a/lib")).unwrap();
        fs::create_dir_all(dir.path().join("lib/b/lib")).unwrap();

        let graph = parse(dir.path());
        assert_eq!(graph.target_names(), vec!["base", "a", "b"]);
        assert_eq!(graph.target("b").unwrap().dependencies, vec!["base"]);
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn test_cyclic_include() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/a/proj.bscf", "INCLUDE ../../..\n");
        write(dir.path(), "proj.bscf", "INCLUDE a\n");
        fs::create_dir_all(dir.path().join("lib/a/lib")).unwrap();

        let fetcher = offline();
        let err = Parser::new(
            HostEnv::new(HostOs::Linux, ToolchainId::Gnu),
            LayoutConfig::default(),
            &fetcher,
        )
        .parse(dir.path())
        .unwrap_err();

        match err {
            ProjectError::CyclicInclude { chain } => assert_eq!(chain.len(), 3),
            other => panic!("Expected CyclicInclude, got {:?}", other),
        }
    }

    #[test]
    fn test_if_platform_blocks() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            r#"
TARGET EXEC app main.c
IF PLATFORM windows
LIB app ws2_32
IF COMPILER msvc
DEFINE app MSVC
ENDIF
LIB app winmm
ENDIF
IF NOT PLATFORM windows
LIB app pthread
ENDIF
"#,
        );

        let linux = parse(dir.path());
        assert_eq!(linux.target("app").unwrap().libraries, vec!["pthread"]);
        assert!(linux.target("app").unwrap().defines.is_empty());

        let windows = parse_with(
            dir.path(),
            HostEnv::new(HostOs::Windows, ToolchainId::Msvc),
            &offline(),
        );
        let app = windows.target("app").unwrap();
        assert_eq!(app.libraries, vec!["ws2_32", "winmm"]);
        assert_eq!(app.defines, vec!["MSVC"]);
    }

    #[test]
    fn test_if_unknown_token_not_taken() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            "TARGET EXEC app main.c\nIF NOT PLATFORM amiga\nLIB app x\nENDIF\nLIB app y\n",
        );

        let graph = parse(dir.path());
        assert_eq!(graph.target("app").unwrap().libraries, vec!["y"]);
        assert_eq!(graph.diagnostics.len(), 1);
        assert!(graph.diagnostics[0].message.contains("amiga"));
    }

    #[test]
    fn test_unterminated_if() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            "TARGET EXEC app main.c\nIF PLATFORM windows\nLIB app x\n",
        );

        let graph = parse(dir.path());
        assert!(graph.target("app").unwrap().libraries.is_empty());
        assert_eq!(graph.diagnostics.len(), 1);
        assert_eq!(graph.diagnostics[0].line, 2);
    }

    #[test]
    fn test_stray_endif_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "proj.bscf", "ENDIF\nTARGET EXEC app main.c\n");

        let graph = parse(dir.path());
        assert!(graph.diagnostics.is_empty());
        assert_eq!(graph.targets.len(), 1);
    }

    #[test]
    fn test_allowskip_marks_external() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "proj.bscf", "TARGET SLIB vendored v.c\nALLOWSKIP vendored\n");

        let graph = parse(dir.path());
        assert!(graph.target("vendored").unwrap().is_external);
    }

    #[test]
    fn test_redeclaration_latest_wins() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            "TARGET SLIB core a.c\nTARGET SLIB core b.c\nLIB core m\n",
        );

        let graph = parse(dir.path());
        assert_eq!(graph.targets.len(), 2);
        assert!(graph.targets[0].libraries.is_empty());
        assert_eq!(graph.target("core").unwrap().libraries, vec!["m"]);
    }

    #[test]
    fn test_gitinclude_fetches_and_marks_external() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proj.bscf",
            "GITINCLUDE https://example.com/net.git net dev\nTARGET EXEC app main.c\nDEPEND app net\n",
        );

        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|source, dest| {
                source.url == "https://example.com/net.git"
                    && source.branch.as_deref() == Some("dev")
                    && dest.ends_with("lib/net")
            })
            .times(1)
            .returning(|_, dest| {
                fs::create_dir_all(dest).unwrap();
                fs::write(dest.join("proj.bscf"), "TARGET SLIB net net.c\n").unwrap();
                true
            });

        let graph = parse_with(dir.path(), HostEnv::new(HostOs::Linux, ToolchainId::Gnu), &fetcher);
        assert!(graph.target("net").unwrap().is_external);
        assert_eq!(graph.target("app").unwrap().dependencies, vec!["net"]);
    }

    #[test]
    fn test_gitinclude_failure_uses_existing_checkout() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/net/proj.bscf", "TARGET SLIB net net.c\n");
        write(dir.path(), "proj.bscf", "GITINCLUDE https://example.com/net.git net\n");

        let graph = parse(dir.path());
        assert!(graph.target("net").is_some());
        assert_eq!(graph.diagnostics.len(), 1);
    }

    #[test]
    fn test_gitinclude_failure_without_checkout() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "proj.bscf", "GITINCLUDE https://example.com/net.git net\n");

        let graph = parse(dir.path());
        assert!(graph.targets.is_empty());
        assert!(graph.diagnostics[0].message.contains("Failed to fetch 'net'"));
    }

    #[test]
    fn test_unknown_builtin() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "proj.bscf", "BUILTIN sdl\n");

        let graph = parse(dir.path());
        assert!(graph.diagnostics[0].message.contains("Unknown builtin: sdl"));
    }
}
