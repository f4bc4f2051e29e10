use colored::Colorize;
use std::fmt::Write;

use super::plan::PlannedRepo;
use super::report::RunReport;

/// Human readable end-of-run summary.
pub fn render(report: &RunReport) -> String {
    let s = report.summary();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} {} ({} cloned, {} updated, {} up to date), {} skipped, {}",
        "mirrored".bold(),
        s.synced(),
        if s.synced() == 1 {
            "repository"
        } else {
            "repositories"
        },
        s.cloned,
        s.updated,
        s.up_to_date,
        s.skipped,
        if s.failed == 0 {
            "0 failed".green().to_string()
        } else {
            format!("{} failed", s.failed).red().to_string()
        }
    );

    for failure in report.failures() {
        let _ = writeln!(out, "  {} {}", "✘".red(), failure);
    }
    out
}

/// One line per planned destination, marking the ones that already exist.
pub fn render_plan(planned: &[PlannedRepo]) -> String {
    let mut out = String::new();
    for p in planned {
        let mark = if p.exists {
            "update".yellow()
        } else {
            "clone ".green()
        };
        let _ = writeln!(out, "{} {} <- {}", mark, p.path.display(), p.url);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::SyncStatus;
    use crate::sync::report::{Failure, FailureKind, NodeReport, RepoOutcome, Target};
    use std::path::PathBuf;

    #[test]
    fn render_lists_counts_and_failures() {
        colored::control::set_override(false);

        let mut node = NodeReport::new(Target::Group(10));
        node.synced.push(RepoOutcome {
            project_id: 1,
            path: PathBuf::from("repos/acme/alpha"),
            status: SyncStatus::Updated,
        });
        node.fail(Failure {
            kind: FailureKind::ProjectList,
            target: Target::Group(10),
            path: None,
            message: "502 Bad Gateway".into(),
        });
        let report = RunReport { nodes: vec![node] };

        let text = render(&report);
        assert!(text.contains("mirrored 1 repository ("));
        assert!(text.contains("1 updated"));
        assert!(text.contains("1 failed"));
        assert!(text.contains("list projects group 10: 502 Bad Gateway"));
    }

    #[test]
    fn render_plan_marks_existing() {
        colored::control::set_override(false);

        let planned = vec![
            PlannedRepo {
                url: "git@x:a.git".into(),
                path: PathBuf::from("repos/a"),
                exists: true,
            },
            PlannedRepo {
                url: "git@x:b.git".into(),
                path: PathBuf::from("repos/b"),
                exists: false,
            },
        ];
        let text = render_plan(&planned);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "update repos/a <- git@x:a.git");
        assert_eq!(lines[1], "clone  repos/b <- git@x:b.git");
    }
}
