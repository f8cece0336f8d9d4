//! Dependency resolution
//!
//! Computes each target's effective include set (its own include
//! directories plus those of every transitive dependency) and checks the
//! graph for duplicate names, unknown dependencies and cycles.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ResolveError;
use crate::project::Target;

/// Effective include sets for every target
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    include_sets: HashMap<String, Vec<PathBuf>>,
}

impl Resolution {
    /// Effective include directories for `name`, dependencies first
    pub fn include_dirs(&self, name: &str) -> &[PathBuf] {
        self.include_sets
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Resolves dependencies over a flat target list
pub struct Resolver<'g> {
    targets: &'g [Target],
    index: HashMap<&'g str, usize>,
}

/// DFS state for cycle search
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    OnStack,
    Finished,
}

impl<'g> Resolver<'g> {
    pub fn new(targets: &'g [Target]) -> Self {
        // later declarations shadow earlier ones
        let index = targets
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();
        Self { targets, index }
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Every problem in the graph, in declaration order
    pub fn validate(&self) -> Vec<ResolveError> {
        let mut errors = self.duplicates();

        for target in self.targets {
            for dep in &target.dependencies {
                if self.lookup(dep).is_none() {
                    errors.push(ResolveError::MissingDependency {
                        target: target.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut marks = vec![Mark::Unseen; self.targets.len()];
        let mut stack = Vec::new();
        for start in 0..self.targets.len() {
            self.find_cycles(start, &mut marks, &mut stack, &mut errors);
        }

        errors
    }

    fn duplicates(&self) -> Vec<ResolveError> {
        let mut seen: HashMap<&str, &Target> = HashMap::new();
        let mut errors = Vec::new();
        for target in self.targets {
            if let Some(first) = seen.get(target.name.as_str()) {
                errors.push(ResolveError::DuplicateTarget {
                    name: target.name.clone(),
                    first: first.root.display().to_string(),
                    second: target.root.display().to_string(),
                });
            } else {
                seen.insert(&target.name, target);
            }
        }
        errors
    }

    fn find_cycles(
        &self,
        node: usize,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        errors: &mut Vec<ResolveError>,
    ) {
        match marks[node] {
            Mark::Finished => return,
            Mark::OnStack => {
                errors.push(self.cycle_error(stack, node));
                return;
            }
            Mark::Unseen => {}
        }

        marks[node] = Mark::OnStack;
        stack.push(node);
        for dep in &self.targets[node].dependencies {
            if let Some(next) = self.lookup(dep) {
                self.find_cycles(next, marks, stack, errors);
            }
        }
        stack.pop();
        marks[node] = Mark::Finished;
    }

    fn cycle_error(&self, stack: &[usize], repeated: usize) -> ResolveError {
        let start = stack.iter().position(|&i| i == repeated).unwrap_or(0);
        let mut cycle: Vec<String> = stack[start..]
            .iter()
            .map(|&i| self.targets[i].name.clone())
            .collect();
        cycle.push(self.targets[repeated].name.clone());
        ResolveError::CyclicDependency { cycle }
    }

    /// Resolve include sets for every target
    ///
    /// # Errors
    /// The first duplicate name, unknown dependency or cycle encountered.
    pub fn resolve(&self) -> Result<Resolution, ResolveError> {
        if let Some(err) = self.duplicates().into_iter().next() {
            return Err(err);
        }

        let mut memo: HashMap<usize, Vec<PathBuf>> = HashMap::new();
        let mut stack = Vec::new();
        for i in 0..self.targets.len() {
            self.visit(i, &mut memo, &mut stack)?;
        }

        let include_sets = memo
            .into_iter()
            .map(|(i, set)| (self.targets[i].name.clone(), set))
            .collect();
        Ok(Resolution { include_sets })
    }

    fn visit(
        &self,
        node: usize,
        memo: &mut HashMap<usize, Vec<PathBuf>>,
        stack: &mut Vec<usize>,
    ) -> Result<Vec<PathBuf>, ResolveError> {
        if let Some(set) = memo.get(&node) {
            return Ok(set.clone());
        }
        if stack.contains(&node) {
            return Err(self.cycle_error(stack, node));
        }

        let target = &self.targets[node];
        stack.push(node);

        let mut set: Vec<PathBuf> = Vec::new();
        for dep in &target.dependencies {
            let next = self
                .lookup(dep)
                .ok_or_else(|| ResolveError::MissingDependency {
                    target: target.name.clone(),
                    dependency: dep.clone(),
                })?;
            for dir in self.visit(next, memo, stack)? {
                if !set.contains(&dir) {
                    set.push(dir);
                }
            }
        }
        for dir in &target.include_dirs {
            if !set.contains(dir) {
                set.push(dir.clone());
            }
        }

        stack.pop();
        memo.insert(node, set.clone());
        Ok(set)
    }
}
