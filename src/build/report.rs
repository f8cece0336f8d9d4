//! Build report
//!
//! Per-target outcome of one build invocation, printed by the CLI as a
//! table or JSON.

use serde::Serialize;

use crate::error::ErrorInfo;

/// Final state of a target in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Commands ran and succeeded
    Built,
    /// Up to date; nothing ran
    Skipped,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Built => "built",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub name: String,
    pub outcome: Outcome,
    pub commands_run: usize,
    pub duration_ms: u64,
    /// Why the target was rebuilt, skipped or failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl TargetReport {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            commands_run: 0,
            duration_ms: 0,
            detail: None,
            error: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcomes in the order targets finished
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub success: bool,
    pub targets: Vec<TargetReport>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self {
            success: true,
            targets: Vec::new(),
        }
    }

    pub fn push(&mut self, report: TargetReport) {
        if report.outcome == Outcome::Failed {
            self.success = false;
        }
        self.targets.push(report);
    }

    pub fn get(&self, name: &str) -> Option<&TargetReport> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn outcome(&self, name: &str) -> Option<Outcome> {
        self.get(name).map(|t| t.outcome)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.targets.iter().filter(|t| t.outcome == outcome).count()
    }

    /// Total commands executed across all targets
    pub fn commands_run(&self) -> usize {
        self.targets.iter().map(|t| t.commands_run).sum()
    }
}
