//! Conversion from GitLab API shapes to platform-agnostic types.

use super::types::{GitLabCommit, GitLabProject};
use crate::platform::{CommitDetail, CommitSummary, Project, ProjectSummary};

pub fn to_project_summary(project: &GitLabProject) -> ProjectSummary {
    ProjectSummary {
        id: project.id,
        path: project.path_with_namespace.clone(),
    }
}

pub fn to_project(project: GitLabProject) -> Project {
    Project {
        id: project.id,
        path: project.path_with_namespace,
        default_branch: project.default_branch,
        archived: project.archived,
    }
}

pub fn to_commit_summary(commit: GitLabCommit) -> CommitSummary {
    CommitSummary {
        id: commit.id,
        parent_ids: commit.parent_ids,
        committed_date: commit.committed_date,
    }
}

/// Convert a single-commit response.
///
/// Missing stats count as zero. Negative counts never come from a sane
/// server and are clamped.
pub fn to_commit_detail(commit: GitLabCommit) -> CommitDetail {
    let stats = commit.stats.unwrap_or_default();
    CommitDetail {
        id: commit.id,
        author_name: commit.author_name,
        author_email: commit.author_email,
        committer_email: commit.committer_email,
        committed_date: commit.committed_date,
        message: commit.message,
        parent_ids: commit.parent_ids.unwrap_or_default(),
        additions: u64::try_from(stats.additions).unwrap_or(0),
        deletions: u64::try_from(stats.deletions).unwrap_or(0),
    }
}
