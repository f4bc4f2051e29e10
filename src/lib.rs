//! Crate entry point for **glmirror**.
//!
//! This library provides the implementation behind the `glmirror` CLI, which
//! mirrors GitLab groups and projects to local disk.
//! Each submodule encapsulates one responsibility (config, GitLab API, git
//! operations, the group walker, etc.).
//! The `pub use` re-exports make the commands and the building blocks
//! accessible directly from the crate root.

mod config;
mod git;
mod gitlab;
mod logging;
mod paths;
mod progress;
mod sync;

pub use config::{FileConfig, MirrorArgs, Settings, load_file_config};
pub use git::{
    CloneProtocol, CredentialError, Credentials, Git2Syncer, SyncError, SyncStatus, Syncer,
    UpdateStatus, is_repository,
};
pub use gitlab::{Directory, GitLabClient, GitLabError, Group, PER_PAGE, Project, User, api_base};
pub use logging::init as init_logging;
pub use paths::{config_home, default_config_file, destination_for};
pub use sync::{
    Failure, FailureKind, Mirror, MirrorOptions, NodeOutcome, NodeReport, PlanSyncer,
    PlannedRepo, RepoOutcome, RunReport, Skip, SkipReason, Summary, Target, cmd_plan, cmd_sync,
    render, render_plan,
};
