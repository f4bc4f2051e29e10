use serde::Deserialize;

use crate::git::CloneProtocol;

/// A GitLab group (namespace node).
///
/// Only the fields the walker needs are decoded; GitLab returns many more.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Group {
    pub id: u64,
    /// Slash separated path, e.g. `parent/child`.
    #[serde(default)]
    pub full_path: String,
}

/// A GitLab project (repository descriptor).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: u64,
    /// Leaf path segment, used as the directory name.
    pub path: String,
    /// Full path, e.g. `acme/tools/beta`. Only used in log output.
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub ssh_url_to_repo: String,
    #[serde(default)]
    pub http_url_to_repo: String,
}

impl Project {
    /// Remote URL to clone from for the given protocol.
    pub fn clone_url(&self, protocol: CloneProtocol) -> &str {
        match protocol {
            CloneProtocol::Ssh => &self.ssh_url_to_repo,
            CloneProtocol::Https => &self.http_url_to_repo,
        }
    }
}

/// The authenticated user, as returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_decodes_with_extra_fields() {
        let json = r#"{
            "id": 42,
            "name": "Alpha",
            "path": "alpha",
            "path_with_namespace": "acme/alpha",
            "ssh_url_to_repo": "git@gitlab.com:acme/alpha.git",
            "http_url_to_repo": "https://gitlab.com/acme/alpha.git",
            "default_branch": "main",
            "star_count": 3
        }"#;
        let p: Project = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, 42);
        assert_eq!(p.path, "alpha");
        assert_eq!(p.path_with_namespace, "acme/alpha");
        assert_eq!(
            p.clone_url(CloneProtocol::Ssh),
            "git@gitlab.com:acme/alpha.git"
        );
        assert_eq!(
            p.clone_url(CloneProtocol::Https),
            "https://gitlab.com/acme/alpha.git"
        );
    }

    #[test]
    fn empty_project_decodes_without_urls() {
        let json = r#"{"id": 1, "path": "empty", "default_branch": null}"#;
        let p: Project = serde_json::from_str(json).unwrap();
        assert!(p.ssh_url_to_repo.is_empty());
        assert!(p.clone_url(CloneProtocol::Https).is_empty());
    }
}
