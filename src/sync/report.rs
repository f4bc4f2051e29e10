//! Structured results of a mirror run.
//!
//! Every root (group or project id) produces one [`NodeReport`]; the
//! [`RunReport`] collects them and derives the summary counters.

use std::fmt;
use std::path::PathBuf;

use crate::git::SyncStatus;

/// A root or nested entity the walker looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Group(u64),
    Project(u64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Group(id) => write!(f, "group {}", id),
            Target::Project(id) => write!(f, "project {}", id),
        }
    }
}

/// Why an entity was not visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Listed in the exclusion set.
    Excluded,
    /// Already visited earlier in this run (dedupe enabled).
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub target: Target,
    pub reason: SkipReason,
}

/// Which step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    GroupFetch,
    ProjectList,
    SubgroupList,
    ProjectFetch,
    Sync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub target: Target,
    /// Destination path, when one was computed before the failure.
    pub path: Option<PathBuf>,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self.kind {
            FailureKind::GroupFetch => "get group",
            FailureKind::ProjectList => "list projects",
            FailureKind::SubgroupList => "list subgroups",
            FailureKind::ProjectFetch => "get project",
            FailureKind::Sync => "sync",
        };
        write!(f, "{} {}", step, self.target)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        write!(f, ": {}", self.message)
    }
}

/// One repository that was synced successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    pub project_id: u64,
    pub path: PathBuf,
    pub status: SyncStatus,
}

/// Aggregate outcome of one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    PartialFailure(Vec<Failure>),
    Skipped(SkipReason),
}

/// Everything that happened below one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub root: Target,
    pub synced: Vec<RepoOutcome>,
    /// Entities below the root that were skipped. A skipped root shows up in
    /// `outcome` instead.
    pub skipped: Vec<Skip>,
    pub outcome: NodeOutcome,
}

impl NodeReport {
    pub(crate) fn new(root: Target) -> Self {
        Self {
            root,
            synced: Vec::new(),
            skipped: Vec::new(),
            outcome: NodeOutcome::Success,
        }
    }

    pub(crate) fn skip(&mut self, target: Target, reason: SkipReason) {
        if target == self.root {
            self.outcome = NodeOutcome::Skipped(reason);
        } else {
            self.skipped.push(Skip { target, reason });
        }
    }

    pub(crate) fn fail(&mut self, failure: Failure) {
        match &mut self.outcome {
            NodeOutcome::PartialFailure(failures) => failures.push(failure),
            outcome => *outcome = NodeOutcome::PartialFailure(vec![failure]),
        }
    }

    pub fn failures(&self) -> &[Failure] {
        match &self.outcome {
            NodeOutcome::PartialFailure(failures) => failures,
            _ => &[],
        }
    }
}

/// Counters over a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub cloned: usize,
    pub updated: usize,
    pub up_to_date: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn synced(&self) -> usize {
        self.cloned + self.updated + self.up_to_date + self.planned
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub nodes: Vec<NodeReport>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.nodes.iter().flat_map(|n| n.failures().iter())
    }

    pub fn repos(&self) -> impl Iterator<Item = &RepoOutcome> {
        self.nodes.iter().flat_map(|n| n.synced.iter())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for node in &self.nodes {
            for repo in &node.synced {
                match repo.status {
                    SyncStatus::Cloned => s.cloned += 1,
                    SyncStatus::Updated => s.updated += 1,
                    SyncStatus::UpToDate => s.up_to_date += 1,
                    SyncStatus::Planned => s.planned += 1,
                }
            }
            s.skipped += node.skipped.len();
            if matches!(node.outcome, NodeOutcome::Skipped(_)) {
                s.skipped += 1;
            }
            s.failed += node.failures().len();
        }
        s
    }
}
