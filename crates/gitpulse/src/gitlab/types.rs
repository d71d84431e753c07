//! GitLab API v4 response shapes, limited to the fields the harvester reads.

use serde::Deserialize;

/// Response of `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
}

/// A project from `GET /projects` (simple view) or `GET /projects/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub path_with_namespace: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Absent from the simple listing.
    #[serde(default)]
    pub archived: bool,
}

/// An entry of `GET /projects/:id/repository/branches`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabBranch {
    pub name: String,
}

/// Line statistics attached to a commit when `stats=true`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct GitLabCommitStats {
    pub additions: i64,
    pub deletions: i64,
    pub total: i64,
}

/// A commit from the commit listing or the single-commit endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommit {
    pub id: String,
    #[serde(default)]
    pub parent_ids: Option<Vec<String>>,
    #[serde(default)]
    pub committed_date: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub committer_email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stats: Option<GitLabCommitStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_commit_detail() {
        let json = r#"{
            "id": "6104942438c14ec7bd21c6cd5bd995272b3faff6",
            "short_id": "6104942438c",
            "title": "Sanitize for network graph",
            "author_name": "randx",
            "author_email": "user@example.com",
            "committer_name": "Dmitriy",
            "committer_email": "user@example.com",
            "committed_date": "2021-09-20T09:06:12.300+03:00",
            "message": "Sanitize for network graph\n",
            "parent_ids": ["ae1d9fb46aa2b07ee9836d49862ec4e2c46fbbba"],
            "stats": {"additions": 15, "deletions": 10, "total": 25},
            "status": "running"
        }"#;

        let commit: GitLabCommit = serde_json::from_str(json).expect("valid commit");
        assert_eq!(commit.author_name.as_deref(), Some("randx"));
        assert_eq!(commit.parent_ids.as_ref().map(Vec::len), Some(1));
        let stats = commit.stats.expect("stats present");
        assert_eq!(stats.additions, 15);
        assert_eq!(stats.deletions, 10);
    }

    #[test]
    fn test_tolerates_missing_optional_fields() {
        let commit: GitLabCommit =
            serde_json::from_str(r#"{"id": "abc"}"#).expect("minimal commit");
        assert!(commit.parent_ids.is_none());
        assert!(commit.stats.is_none());
        assert!(commit.message.is_none());

        let stats: GitLabCommitStats =
            serde_json::from_str(r#"{"additions": 3}"#).expect("partial stats");
        assert_eq!(stats.additions, 3);
        assert_eq!(stats.deletions, 0);
    }

    #[test]
    fn test_simple_project_listing_has_no_archived_flag() {
        let project: GitLabProject = serde_json::from_str(
            r#"{"id": 4, "name": "app", "path_with_namespace": "group/app", "default_branch": "main"}"#,
        )
        .expect("valid project");
        assert_eq!(project.path_with_namespace, "group/app");
        assert!(!project.archived);
    }
}
