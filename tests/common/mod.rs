#![allow(dead_code)]

use git2::{BranchType, Commit, Oid, Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};

/// A non-bare repository standing in for a GitLab remote.
pub struct Upstream {
    pub repo: Repository,
}

impl Upstream {
    pub fn init(path: &Path) -> Self {
        Self {
            repo: Repository::init(path).unwrap(),
        }
    }

    pub fn url(&self) -> String {
        self.path().to_str().unwrap().to_string()
    }

    pub fn path(&self) -> PathBuf {
        self.repo.workdir().unwrap().to_path_buf()
    }

    /// Write `name` and commit it on the current branch.
    pub fn commit(&self, name: &str, content: &str) -> Oid {
        fs::write(self.path().join(name), content).unwrap();
        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("upstream", "upstream@example.com").unwrap();
        let parents: Vec<Commit<'_>> = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, name, &tree, &parent_refs)
            .unwrap()
    }

    /// Make `name` the default branch, starting at the current tip. The old
    /// default branch is deleted unless `keep_old` is set.
    pub fn switch_default_branch(&self, name: &str, keep_old: bool) {
        let head = self.repo.head().unwrap();
        let old = head.shorthand().unwrap().to_string();
        let tip = head.peel_to_commit().unwrap();
        self.repo.branch(name, &tip, false).unwrap();
        self.repo.set_head(&format!("refs/heads/{}", name)).unwrap();
        if !keep_old {
            self.repo
                .find_branch(&old, BranchType::Local)
                .unwrap()
                .delete()
                .unwrap();
        }
    }

    /// Rewrite history: move the current branch back to `oid`.
    pub fn reset_to(&self, oid: Oid) {
        let obj = self.repo.find_object(oid, None).unwrap();
        self.repo
            .reset(&obj, git2::ResetType::Hard, None)
            .unwrap();
    }
}

pub fn head_branch(path: &Path) -> String {
    Repository::open(path)
        .unwrap()
        .head()
        .unwrap()
        .shorthand()
        .unwrap()
        .to_string()
}

pub fn head_oid(path: &Path) -> Oid {
    Repository::open(path)
        .unwrap()
        .head()
        .unwrap()
        .target()
        .unwrap()
}

/// Commit a local change in a mirror, creating divergence from upstream.
pub fn commit_locally(path: &Path, name: &str, content: &str) -> Oid {
    let repo = Repository::open(path).unwrap();
    fs::write(path.join(name), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("local", "local@example.com").unwrap();
    let parent = repo.head().unwrap().peel_to_commit().unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "local", &tree, &[&parent])
        .unwrap()
}
