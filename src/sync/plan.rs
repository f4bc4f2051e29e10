use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::git::{SyncError, SyncStatus, Syncer, is_repository};

/// What `plan` would do to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRepo {
    pub url: String,
    pub path: PathBuf,
    /// Whether a working copy already exists there.
    pub exists: bool,
}

/// [`Syncer`] for dry runs: records every destination instead of touching
/// git.
#[derive(Debug, Default)]
pub struct PlanSyncer {
    planned: RefCell<Vec<PlannedRepo>>,
}

impl PlanSyncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_planned(self) -> Vec<PlannedRepo> {
        self.planned.into_inner()
    }
}

impl Syncer for PlanSyncer {
    fn sync(&self, url: &str, dest: &Path) -> Result<SyncStatus, SyncError> {
        self.planned.borrow_mut().push(PlannedRepo {
            url: url.to_string(),
            path: dest.to_path_buf(),
            exists: is_repository(dest),
        });
        Ok(SyncStatus::Planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Repository;
    use tempfile::tempdir;

    #[test]
    fn records_without_touching_disk() {
        let td = tempdir().unwrap();
        let existing = td.path().join("have");
        Repository::init(&existing).unwrap();
        let missing = td.path().join("group").join("want");

        let plan = PlanSyncer::new();
        assert_eq!(
            plan.sync("git@x:have.git", &existing).unwrap(),
            SyncStatus::Planned
        );
        plan.sync("git@x:want.git", &missing).unwrap();

        assert!(!missing.exists());
        let got = plan.into_planned();
        assert_eq!(got.len(), 2);
        assert!(got[0].exists);
        assert!(!got[1].exists);
        assert_eq!(got[1].url, "git@x:want.git");
    }
}
