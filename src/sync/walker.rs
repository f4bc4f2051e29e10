use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{error, info, info_span, warn};

use super::report::{
    Failure, FailureKind, NodeReport, RepoOutcome, RunReport, SkipReason, Target,
};
use crate::git::{CloneProtocol, Syncer};
use crate::gitlab::{Directory, Project};
use crate::paths::destination_for;

/// Immutable settings of one mirror run.
#[derive(Debug, Clone, Default)]
pub struct MirrorOptions {
    /// Root directory every repository is placed under.
    pub dest_root: PathBuf,
    pub exclude_groups: HashSet<u64>,
    pub exclude_projects: HashSet<u64>,
    /// Which clone URL of each project to use.
    pub protocol: CloneProtocol,
    /// Skip groups and projects already visited earlier in the run.
    pub dedupe: bool,
}

/// Ids visited so far in a run. A disabled set reports everything as new.
#[derive(Debug, Default)]
struct Seen {
    enabled: bool,
    groups: HashSet<u64>,
    projects: HashSet<u64>,
}

impl Seen {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    fn first_group(&mut self, id: u64) -> bool {
        !self.enabled || self.groups.insert(id)
    }

    fn first_project(&mut self, id: u64) -> bool {
        !self.enabled || self.projects.insert(id)
    }
}

/// Walks GitLab groups and projects and syncs every repository found.
///
/// Groups are walked depth-first with an explicit stack: a group's own
/// projects are synced before any of its subgroups are entered, and siblings
/// are visited in the order the directory lists them. A failure is recorded
/// in the root's [`NodeReport`] and only abandons the entity it happened on.
pub struct Mirror<'a, D: ?Sized, S: ?Sized> {
    directory: &'a D,
    syncer: &'a S,
    options: MirrorOptions,
}

impl<'a, D, S> Mirror<'a, D, S>
where
    D: Directory + ?Sized,
    S: Syncer + ?Sized,
{
    pub fn new(directory: &'a D, syncer: &'a S, options: MirrorOptions) -> Self {
        Self {
            directory,
            syncer,
            options,
        }
    }

    /// Visit every root group, then every root project, in the given order.
    pub fn run(&self, group_ids: &[u64], project_ids: &[u64]) -> RunReport {
        let mut seen = Seen::new(self.options.dedupe);
        let mut report = RunReport::default();
        for &id in group_ids {
            report.nodes.push(self.walk_group(id, &mut seen));
        }
        for &id in project_ids {
            report.nodes.push(self.walk_project(id, &mut seen));
        }
        report
    }

    /// Mirror a group and everything below it.
    pub fn visit_group(&self, group_id: u64) -> NodeReport {
        self.walk_group(group_id, &mut Seen::new(self.options.dedupe))
    }

    /// Mirror a single project at the top level of the destination.
    pub fn visit_project(&self, project_id: u64) -> NodeReport {
        self.walk_project(project_id, &mut Seen::new(self.options.dedupe))
    }

    fn walk_group(&self, root: u64, seen: &mut Seen) -> NodeReport {
        let mut report = NodeReport::new(Target::Group(root));
        let mut stack = vec![root];

        while let Some(group_id) = stack.pop() {
            let target = Target::Group(group_id);

            if self.options.exclude_groups.contains(&group_id) {
                warn!(group_id, "ignore group");
                report.skip(target, SkipReason::Excluded);
                continue;
            }
            if !seen.first_group(group_id) {
                info!(group_id, "group already visited");
                report.skip(target, SkipReason::Duplicate);
                continue;
            }

            let group = match self.directory.group(group_id) {
                Ok(g) => g,
                Err(e) => {
                    error!(group_id, error = %e, "get group error");
                    report.fail(Failure {
                        kind: FailureKind::GroupFetch,
                        target,
                        path: None,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let _span = info_span!("group", group_id, group = %group.full_path).entered();
            info!("get group repos");

            // Project and subgroup listing are independent: a failure of
            // one never stops the other.
            match self.directory.group_projects(group_id) {
                Ok(projects) => {
                    for project in &projects {
                        self.sync_listed(project, &group.full_path, seen, &mut report);
                    }
                }
                Err(e) => {
                    error!(error = %e, "list projects error");
                    report.fail(Failure {
                        kind: FailureKind::ProjectList,
                        target,
                        path: None,
                        message: e.to_string(),
                    });
                }
            }

            match self.directory.subgroups(group_id) {
                Ok(subgroups) => stack.extend(subgroups.iter().rev().map(|g| g.id)),
                Err(e) => {
                    error!(error = %e, "list subgroups error");
                    report.fail(Failure {
                        kind: FailureKind::SubgroupList,
                        target,
                        path: None,
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn walk_project(&self, project_id: u64, seen: &mut Seen) -> NodeReport {
        let target = Target::Project(project_id);
        let mut report = NodeReport::new(target);

        if self.options.exclude_projects.contains(&project_id) {
            warn!(project_id, "ignore project");
            report.skip(target, SkipReason::Excluded);
            return report;
        }
        if !seen.first_project(project_id) {
            info!(project_id, "project already visited");
            report.skip(target, SkipReason::Duplicate);
            return report;
        }

        match self.directory.project(project_id) {
            Ok(project) => self.sync_project(&project, "", &mut report),
            Err(e) => {
                error!(project_id, error = %e, "get project error");
                report.fail(Failure {
                    kind: FailureKind::ProjectFetch,
                    target,
                    path: None,
                    message: e.to_string(),
                });
            }
        }
        report
    }

    /// A project that came out of a group listing. Its metadata is already
    /// known, so only the exclusion and dedupe checks apply.
    fn sync_listed(
        &self,
        project: &Project,
        namespace: &str,
        seen: &mut Seen,
        report: &mut NodeReport,
    ) {
        let target = Target::Project(project.id);
        if self.options.exclude_projects.contains(&project.id) {
            warn!(project_id = project.id, "ignore project");
            report.skip(target, SkipReason::Excluded);
            return;
        }
        if !seen.first_project(project.id) {
            info!(project_id = project.id, "project already visited");
            report.skip(target, SkipReason::Duplicate);
            return;
        }
        self.sync_project(project, namespace, report);
    }

    fn sync_project(&self, project: &Project, namespace: &str, report: &mut NodeReport) {
        let dest = destination_for(&self.options.dest_root, namespace, &project.path);
        let target = Target::Project(project.id);
        info!(
            project_id = project.id,
            project = %project.path_with_namespace,
            path = %dest.display(),
            "get repo"
        );

        let url = project.clone_url(self.options.protocol);
        if url.is_empty() {
            error!(project_id = project.id, path = %dest.display(), "project has no clone URL");
            report.fail(Failure {
                kind: FailureKind::Sync,
                target,
                path: Some(dest),
                message: format!("no {} clone URL", self.options.protocol),
            });
            return;
        }

        match self.syncer.sync(url, &dest) {
            Ok(status) => {
                info!(project_id = project.id, path = %dest.display(), ?status, "repo synced");
                report.synced.push(RepoOutcome {
                    project_id: project.id,
                    path: dest,
                    status,
                });
            }
            Err(e) => {
                error!(project_id = project.id, path = %dest.display(), error = %e, "sync repo error");
                report.fail(Failure {
                    kind: FailureKind::Sync,
                    target,
                    path: Some(dest),
                    message: e.to_string(),
                });
            }
        }
    }
}
