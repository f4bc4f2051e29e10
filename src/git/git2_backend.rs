use git2::{
    BranchType, ErrorCode, FetchOptions, FetchPrune, Remote, RemoteCallbacks, Repository,
    ResetType, StatusOptions,
    build::{CheckoutBuilder, RepoBuilder},
};
use indicatif::ProgressBar;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{Credentials, SyncError, SyncStatus, Syncer, UpdateStatus};
use crate::progress::{finish, repo_bar};

const ORIGIN_PREFIX: &str = "refs/remotes/origin/";
const ORIGIN_HEAD: &str = "refs/remotes/origin/HEAD";

/// [`Syncer`] backed by libgit2.
///
/// The update policy is that of a mirror: the local default branch is hard
/// reset to the remote tip, discarding any local divergence.
#[derive(Debug, Clone)]
pub struct Git2Syncer {
    credentials: Credentials,
    progress: bool,
}

impl Git2Syncer {
    pub fn new(credentials: Credentials, progress: bool) -> Self {
        Self {
            credentials,
            progress,
        }
    }

    /// Build `FetchOptions` carrying the run's credentials and reporting
    /// transfer progress on `pb`.
    fn fetch_opts<'a>(&'a self, pb: &'a ProgressBar) -> FetchOptions<'a> {
        let mut cb = RemoteCallbacks::new();
        self.credentials.install(&mut cb);
        cb.transfer_progress(move |stats| {
            if stats.total_objects() > 0 {
                pb.set_message(format!(
                    "receiving objects {}/{} ({} KiB)",
                    stats.received_objects(),
                    stats.total_objects(),
                    stats.received_bytes() / 1024
                ));
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(cb);
        fo
    }

    /// Run the update step on an existing working copy at `dest`.
    ///
    /// # Errors
    /// Returns an error if the repository cannot be opened, fetched, or reset.
    pub fn update(&self, dest: &Path) -> Result<UpdateStatus, SyncError> {
        let repo = Repository::open(dest).map_err(|source| SyncError::Open {
            path: dest.to_path_buf(),
            source,
        })?;
        self.update_repo(&repo, dest, &ProgressBar::hidden())
    }

    fn sync_with(&self, url: &str, dest: &Path, pb: &ProgressBar) -> Result<SyncStatus, SyncError> {
        if let Ok(repo) = Repository::open(dest) {
            debug!(path = %dest.display(), "repository already exists, updating");
            return self.update_repo(&repo, dest, pb).map(Into::into);
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| SyncError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        pb.set_message(format!("cloning {}", dest.display()));
        let mut builder = RepoBuilder::new();
        builder.fetch_options(self.fetch_opts(pb));
        let repo = builder.clone(url, dest).map_err(|source| SyncError::Clone {
            url: url.to_string(),
            path: dest.to_path_buf(),
            source,
        })?;

        // A fresh clone sits at the remote tip; the update is a no-op but
        // still runs so both paths end in the same state.
        self.update_repo(&repo, dest, pb)?;
        Ok(SyncStatus::Cloned)
    }

    fn update_repo(
        &self,
        repo: &Repository,
        dest: &Path,
        pb: &ProgressBar,
    ) -> Result<UpdateStatus, SyncError> {
        pb.set_message(format!("fetching {}", dest.display()));
        let mut fo = self.fetch_opts(pb);
        fetch_origin(repo, &mut fo).map_err(|source| SyncError::Fetch {
            path: dest.to_path_buf(),
            source,
        })?;

        let checkout_err = |source| SyncError::Checkout {
            path: dest.to_path_buf(),
            source,
        };

        let Some(remote_ref) = default_remote_branch(repo).map_err(checkout_err)? else {
            debug!(path = %dest.display(), "origin has no branches");
            return Ok(UpdateStatus::UpToDate);
        };
        let branch = remote_ref
            .strip_prefix(ORIGIN_PREFIX)
            .ok_or_else(|| SyncError::NoDefaultBranch {
                path: dest.to_path_buf(),
                reference: remote_ref.clone(),
            })?;

        let remote_tip = repo
            .find_reference(&remote_ref)
            .and_then(|r| r.peel_to_commit())
            .map_err(checkout_err)?;

        if head_is_at(repo, branch, remote_tip.id())
            && !has_local_changes(repo).map_err(checkout_err)?
        {
            return Ok(UpdateStatus::UpToDate);
        }

        attach_and_reset(repo, branch, &remote_tip).map_err(checkout_err)?;
        Ok(UpdateStatus::Updated)
    }
}

impl Syncer for Git2Syncer {
    fn sync(&self, url: &str, dest: &Path) -> Result<SyncStatus, SyncError> {
        let label = dest.display().to_string();
        let pb = repo_bar(self.progress, format!("syncing {}", label));
        let res = self.sync_with(url, dest, &pb);
        match &res {
            Ok(status) => finish(&pb, true, format!("{} ({:?})", label, status)),
            Err(e) => finish(&pb, false, format!("{} (error: {})", label, e)),
        }
        res
    }
}

/// Whether `path` already holds a git working copy.
pub fn is_repository(path: &Path) -> bool {
    Repository::open(path).is_ok()
}

/// Perform `git fetch --prune origin`, updating remote-tracking branches and
/// tags, then point `origin/HEAD` at the branch origin currently serves as
/// HEAD.
fn fetch_origin(repo: &Repository, fo: &mut FetchOptions<'_>) -> Result<(), git2::Error> {
    let mut remote = repo.find_remote("origin")?;
    fo.prune(FetchPrune::On);
    remote.fetch(
        &[
            "+refs/heads/*:refs/remotes/origin/*",
            "+refs/tags/*:refs/tags/*",
        ],
        Some(fo),
        None,
    )?;
    refresh_origin_head(repo, &remote)
}

/// Re-point `origin/HEAD` after a fetch. libgit2 only writes it at clone
/// time, so a renamed default branch upstream would otherwise go unnoticed.
///
/// The advertised refs stay readable on `remote` after the fetch has
/// disconnected. An empty remote advertises no HEAD; that is not an error.
fn refresh_origin_head(repo: &Repository, remote: &Remote<'_>) -> Result<(), git2::Error> {
    let Ok(advertised) = remote.default_branch() else {
        return Ok(());
    };
    let Some(branch) = advertised
        .as_str()
        .and_then(|r| r.strip_prefix("refs/heads/"))
    else {
        return Ok(());
    };

    let target = format!("{}{}", ORIGIN_PREFIX, branch);
    if repo.find_reference(&target).is_err() {
        return Ok(());
    }
    let current = repo
        .find_reference(ORIGIN_HEAD)
        .ok()
        .and_then(|r| r.symbolic_target().map(str::to_string));
    if current.as_deref() != Some(target.as_str()) {
        debug!(branch, "origin/HEAD moved");
        repo.reference_symbolic(ORIGIN_HEAD, &target, true, "glmirror: refresh origin/HEAD")?;
    }
    Ok(())
}

/// Whether tracked files differ from HEAD, in the index or the worktree.
/// Untracked and ignored files do not count; a hard reset leaves them alone.
fn has_local_changes(repo: &Repository) -> Result<bool, git2::Error> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    Ok(!repo.statuses(Some(&mut opts))?.is_empty())
}

/// Resolve the remote-tracking ref of origin's default branch.
///
/// Tried in order: `origin/HEAD`, `origin/main`, `origin/master`, then the
/// first remote branch by name. `None` means origin has no branches at all,
/// which is what an empty GitLab project looks like.
fn default_remote_branch(repo: &Repository) -> Result<Option<String>, git2::Error> {
    if let Ok(origin_head) = repo.find_reference(ORIGIN_HEAD)
        && let Some(target) = origin_head.symbolic_target()
        && repo.find_reference(target).is_ok()
    {
        return Ok(Some(target.to_string()));
    }

    for name in ["main", "master"] {
        let full = format!("{}{}", ORIGIN_PREFIX, name);
        if repo.find_reference(&full).is_ok() {
            return Ok(Some(full));
        }
    }

    let mut names = Vec::new();
    for branch in repo.branches(Some(BranchType::Remote))? {
        let (branch, _) = branch?;
        if let Some(name) = branch.get().name()
            && name.starts_with(ORIGIN_PREFIX)
            && !name.ends_with("/HEAD")
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names.into_iter().next())
}

/// Whether HEAD is attached to local `branch` and points at `tip`.
fn head_is_at(repo: &Repository, branch: &str, tip: git2::Oid) -> bool {
    let Ok(head) = repo.head() else {
        return false;
    };
    head.is_branch() && head.shorthand() == Some(branch) && head.target() == Some(tip)
}

/// Attach HEAD to local `branch` (creating a tracking branch if needed) and
/// hard-reset it to `remote_tip`.
fn attach_and_reset(
    repo: &Repository,
    branch: &str,
    remote_tip: &git2::Commit<'_>,
) -> Result<(), git2::Error> {
    let local_ref = match repo.find_branch(branch, BranchType::Local) {
        Ok(b) => b.into_reference(),
        Err(e) if e.code() == ErrorCode::NotFound => {
            let mut b = repo.branch(branch, remote_tip, true)?;
            b.set_upstream(Some(&format!("origin/{}", branch)))?;
            b.into_reference()
        }
        Err(e) => return Err(e),
    };

    let name = local_ref
        .name()
        .ok_or_else(|| git2::Error::from_str("invalid reference name"))?;
    repo.set_head(name)?;
    repo.reset(
        remote_tip.as_object(),
        ResetType::Hard,
        Some(CheckoutBuilder::new().force()),
    )?;
    Ok(())
}
