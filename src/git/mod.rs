//! Git integration layer.
//!
//! The rest of the crate depends on the [`Syncer`] trait only. The concrete
//! implementation ([`Git2Syncer`]) is built on the `git2` crate and lives in
//! `git2_backend`, so the walker can be exercised without touching git.

mod credentials;
mod git2_backend;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use credentials::{CloneProtocol, CredentialError, Credentials};
pub use git2_backend::{Git2Syncer, is_repository};

/// Result of a successful sync of one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No local copy existed; a fresh clone was made.
    Cloned,
    /// The local copy was moved to the remote tip.
    Updated,
    /// The local copy already matched the remote tip.
    UpToDate,
    /// Dry run: nothing was touched.
    Planned,
}

/// Result of the update step on an existing working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Updated,
    UpToDate,
}

impl From<UpdateStatus> for SyncStatus {
    fn from(s: UpdateStatus) -> Self {
        match s {
            UpdateStatus::Updated => SyncStatus::Updated,
            UpdateStatus::UpToDate => SyncStatus::UpToDate,
        }
    }
}

/// Failures of the clone-or-update primitive.
///
/// "Already exists" and "already up to date" are not errors; they surface as
/// [`SyncStatus`] values instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("clone {url} into {}: {source}", .path.display())]
    Clone {
        url: String,
        path: PathBuf,
        source: git2::Error,
    },

    #[error("open repository {}: {source}", .path.display())]
    Open { path: PathBuf, source: git2::Error },

    #[error("fetch origin in {}: {source}", .path.display())]
    Fetch { path: PathBuf, source: git2::Error },

    #[error("update worktree in {}: {source}", .path.display())]
    Checkout { path: PathBuf, source: git2::Error },

    #[error("cannot determine default branch of origin in {}: {reference}", .path.display())]
    NoDefaultBranch { path: PathBuf, reference: String },

    #[error("create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Clone-or-update a single repository at a destination path.
pub trait Syncer {
    /// Ensure `dest` holds a working copy of `url` at the remote's default
    /// branch tip. Safe to call repeatedly.
    fn sync(&self, url: &str, dest: &Path) -> Result<SyncStatus, SyncError>;
}
