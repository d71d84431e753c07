//! Commit classification: which commits count as human-authored work.

use super::types::{DEFAULT_CI_KEYWORDS, DEFAULT_MAX_ADDITIONS};
use crate::commit::RawCommit;

/// Committer email fragments that always mark automation.
const AUTOMATION_EMAIL_MARKERS: &[&str] = &["noreply", "bot@"];

/// Classifier settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Case-insensitive substrings marking CI/bot activity.
    pub keywords: Vec<String>,
    /// Largest accepted `additions` count.
    pub max_additions: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_CI_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            max_additions: DEFAULT_MAX_ADDITIONS,
        }
    }
}

/// Why a commit was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// CI, bot or other automated authorship.
    Automation,
    /// More additions than the configured ceiling.
    Oversized,
    /// More than one parent.
    Merge,
}

/// Outcome of classifying one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

/// Pure, stateless commit filter.
#[derive(Debug, Clone)]
pub struct CommitClassifier {
    keywords: Vec<String>,
    max_additions: u64,
}

impl CommitClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let keywords = config
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            keywords,
            max_additions: config.max_additions,
        }
    }

    /// Classify a commit. Rules run in order and the first match wins:
    /// automation, then oversized diff, then merge.
    #[must_use]
    pub fn classify(&self, commit: &RawCommit) -> Verdict {
        if self.is_automation(commit) {
            Verdict::Reject(Rejection::Automation)
        } else if commit.additions > self.max_additions {
            Verdict::Reject(Rejection::Oversized)
        } else if commit.is_merge() {
            Verdict::Reject(Rejection::Merge)
        } else {
            Verdict::Accept
        }
    }

    #[must_use]
    pub fn is_valid(&self, commit: &RawCommit) -> bool {
        self.classify(commit) == Verdict::Accept
    }

    fn is_automation(&self, commit: &RawCommit) -> bool {
        let committer_email = commit.committer_email.to_lowercase();
        if AUTOMATION_EMAIL_MARKERS
            .iter()
            .any(|marker| committer_email.contains(marker))
        {
            return true;
        }

        let fields = [
            commit.author_name.to_lowercase(),
            commit.author_email.to_lowercase(),
            committer_email,
            commit.message.to_lowercase(),
        ];

        self.keywords
            .iter()
            .any(|keyword| fields.iter().any(|field| field.contains(keyword.as_str())))
    }
}

impl Default for CommitClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
