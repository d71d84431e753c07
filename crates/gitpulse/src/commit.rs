//! Commit records flowing through a harvesting run.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;

use crate::platform::CommitDetail;

/// Author name used when the server sends none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Errors turning a commit detail into a [`RawCommit`].
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("commit {id} has no commit timestamp")]
    MissingTimestamp { id: String },

    #[error("commit {id} has an unparseable timestamp {value:?}: {source}")]
    InvalidTimestamp {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// A commit observed inside the harvest window, before classification.
///
/// `message` is only carried for classification and never leaves the
/// engine; see [`HarvestedCommit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub id: String,
    pub project_id: u64,
    pub branch: String,
    pub author_name: String,
    /// Lower-cased.
    pub author_email: String,
    /// Lower-cased.
    pub committer_email: String,
    pub committed_at: DateTime<FixedOffset>,
    pub additions: u64,
    pub deletions: u64,
    pub parent_ids: Vec<String>,
    pub message: String,
}

impl RawCommit {
    /// Build a raw commit from a fetched detail.
    ///
    /// Missing author names become [`UNKNOWN_AUTHOR`], emails are trimmed and
    /// lower-cased and the message is trimmed. The timestamp must be
    /// RFC 3339 with an explicit offset.
    pub fn from_detail(
        project_id: u64,
        branch: &str,
        detail: CommitDetail,
    ) -> Result<Self, CommitError> {
        let raw_date = detail
            .committed_date
            .ok_or_else(|| CommitError::MissingTimestamp {
                id: detail.id.clone(),
            })?;
        let committed_at = DateTime::parse_from_rfc3339(raw_date.trim()).map_err(|source| {
            CommitError::InvalidTimestamp {
                id: detail.id.clone(),
                value: raw_date.clone(),
                source,
            }
        })?;

        let author_name = detail
            .author_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        Ok(Self {
            id: detail.id,
            project_id,
            branch: branch.to_string(),
            author_name,
            author_email: normalize_email(detail.author_email),
            committer_email: normalize_email(detail.committer_email),
            committed_at,
            additions: detail.additions,
            deletions: detail.deletions,
            parent_ids: detail.parent_ids,
            message: detail.message.unwrap_or_default().trim().to_string(),
        })
    }

    /// Two or more parents.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }
}

fn normalize_email(email: Option<String>) -> String {
    email.unwrap_or_default().trim().to_lowercase()
}

/// A classified, de-duplicated commit as handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestedCommit {
    pub id: String,
    pub project_id: u64,
    pub branch: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_email: String,
    pub committed_at: DateTime<FixedOffset>,
    pub additions: u64,
    pub deletions: u64,
    pub parent_ids: Vec<String>,
}

impl From<RawCommit> for HarvestedCommit {
    fn from(commit: RawCommit) -> Self {
        Self {
            id: commit.id,
            project_id: commit.project_id,
            branch: commit.branch,
            author_name: commit.author_name,
            author_email: commit.author_email,
            committer_email: commit.committer_email,
            committed_at: commit.committed_at,
            additions: commit.additions,
            deletions: commit.deletions,
            parent_ids: commit.parent_ids,
        }
    }
}
