//! GitLab directory service.
//!
//! The walker only talks to the [`Directory`] trait; [`GitLabClient`] is the
//! HTTP implementation over the v4 REST API. Tests substitute an in-memory
//! directory.

mod client;
mod error;
mod types;

pub use client::{GitLabClient, PER_PAGE, api_base};
pub use error::GitLabError;
pub use types::{Group, Project, User};

/// Read-only view of a GitLab group/project hierarchy.
pub trait Directory {
    /// Fetch a single group by id.
    fn group(&self, id: u64) -> Result<Group, GitLabError>;

    /// List the projects directly owned by a group, ordered by name.
    fn group_projects(&self, id: u64) -> Result<Vec<Project>, GitLabError>;

    /// List the direct subgroups of a group, ordered by name.
    fn subgroups(&self, id: u64) -> Result<Vec<Group>, GitLabError>;

    /// Fetch a single project by id.
    fn project(&self, id: u64) -> Result<Project, GitLabError>;

    /// Identity check used once at startup to fail fast on bad tokens.
    fn current_user(&self) -> Result<User, GitLabError>;
}
