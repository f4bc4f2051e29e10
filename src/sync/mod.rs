mod plan;
mod report;
mod summary;
mod walker;

use anyhow::{Context, Result};
use std::env;
use std::fs;
use tracing::info;

use crate::config::{MirrorArgs, Settings, load_file_config};
use crate::git::{Credentials, Git2Syncer};
use crate::gitlab::{Directory, GitLabClient};

pub use plan::{PlanSyncer, PlannedRepo};
pub use report::{
    Failure, FailureKind, NodeOutcome, NodeReport, RepoOutcome, RunReport, Skip, SkipReason,
    Summary, Target,
};
pub use summary::{render, render_plan};
pub use walker::{Mirror, MirrorOptions};

fn settings(args: &MirrorArgs) -> Result<Settings> {
    let file = load_file_config(args.config.as_deref())?;
    Settings::resolve(args, file, |key| env::var(key).ok())
}

/// Mirror the configured groups and projects.
///
/// High-level flow:
/// 1. Resolve settings from flags, environment and config file.
/// 2. Check the token against `GET /user` and the transport credentials, so
///    bad credentials fail the run before anything is cloned.
/// 3. Walk every root group and project and clone-or-update each repository
///    (see [`Mirror`]).
/// 4. Print a summary. Failures of individual groups or repositories are
///    reported there and in the log but do not fail the command.
///
/// # Errors
/// Returns an error only for startup problems: invalid settings, an
/// unreachable API, a rejected token, or missing transport credentials.
pub fn cmd_sync(args: &MirrorArgs) -> Result<RunReport> {
    let settings = settings(args)?;
    if settings.token.is_empty() {
        anyhow::bail!("missing GitLab token: pass --gitlab-token or set GITLAB_TOKEN");
    }

    let client = GitLabClient::new(&settings.host, &settings.token, settings.http_timeout)
        .context("failed to build GitLab client")?;
    let user = client
        .current_user()
        .with_context(|| format!("cannot authenticate against {}", client.api_url()))?;
    info!(user = %user.username, host = %settings.host, "authenticated");

    let credentials = Credentials::for_protocol(settings.protocol, &settings.token);
    credentials.check()?;

    fs::create_dir_all(&settings.dest_dir).with_context(|| {
        format!(
            "cannot create destination {}",
            settings.dest_dir.display()
        )
    })?;

    let syncer = Git2Syncer::new(credentials, settings.progress);
    let mirror = Mirror::new(&client, &syncer, settings.mirror_options());
    let report = mirror.run(&settings.group_ids, &settings.project_ids);

    print!("{}", render(&report));
    Ok(report)
}

/// Dry run: walk the API like `sync` and print every destination, without
/// running git or writing to disk.
///
/// # Errors
/// Returns an error for invalid settings or if the GitLab client cannot be
/// built. API failures during the walk are reported like in `sync`.
pub fn cmd_plan(args: &MirrorArgs) -> Result<RunReport> {
    let settings = settings(args)?;
    let client = GitLabClient::new(&settings.host, &settings.token, settings.http_timeout)
        .context("failed to build GitLab client")?;

    let plan = PlanSyncer::new();
    let report = Mirror::new(&client, &plan, settings.mirror_options())
        .run(&settings.group_ids, &settings.project_ids);

    print!("{}", render_plan(&plan.into_planned()));
    if report.has_failures() {
        print!("{}", render(&report));
    }
    Ok(report)
}
