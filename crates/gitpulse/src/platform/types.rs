use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use super::errors::Result;

/// The authenticated session's user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
}

/// A project as returned by the (simple) project listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub id: u64,
    /// Namespaced path, e.g. `group/app`.
    pub path: String,
}

/// A fully resolved project handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub path: String,
    pub default_branch: Option<String>,
    pub archived: bool,
}

/// A commit as returned by a commit listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub id: String,
    /// Parent identifiers, when the listing includes them.
    pub parent_ids: Option<Vec<String>>,
    pub committed_date: Option<String>,
}

impl CommitSummary {
    /// A summary that already declares two or more parents.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parent_ids.as_ref().is_some_and(|p| p.len() > 1)
    }
}

/// Full commit detail including diff stats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDetail {
    pub id: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub committer_email: Option<String>,
    /// Raw timestamp as sent by the server (RFC 3339 with offset).
    pub committed_date: Option<String>,
    pub message: Option<String>,
    pub parent_ids: Vec<String>,
    /// Lines added; zero when the server omitted stats.
    pub additions: u64,
    /// Lines deleted; zero when the server omitted stats.
    pub deletions: u64,
}

/// The remote operations a harvesting run needs, and nothing more.
///
/// Every method performs exactly one remote call and never retries on its
/// own. Listings are exposed one page at a time so that the harvesting
/// engine applies retries, timeouts and the in-flight ceiling per page.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Verify the credential. Failure aborts the whole run.
    async fn authenticate(&self) -> Result<UserInfo>;

    /// Fetch one page of non-archived projects (1-based `page`).
    async fn list_projects_page(&self, page: u32, per_page: u32) -> Result<Vec<ProjectSummary>>;

    /// Resolve the full project handle.
    async fn get_project(&self, project_id: u64) -> Result<Project>;

    /// Fetch one page of a project's branch names (1-based `page`).
    async fn list_branches_page(
        &self,
        project_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<String>>;

    /// Fetch one page of the commits of `branch` committed between `since`
    /// and `until` (1-based `page`).
    async fn list_commits_page(
        &self,
        project_id: u64,
        branch: &str,
        since: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<CommitSummary>>;

    /// Fetch one commit with its stats.
    async fn get_commit(&self, project_id: u64, sha: &str) -> Result<CommitDetail>;
}
