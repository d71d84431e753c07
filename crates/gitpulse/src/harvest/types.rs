//! Harvest options, results and constants.

use std::time::Duration;

use thiserror::Error;

use super::classify::ClassifierConfig;
use super::window::HarvestWindow;
use crate::commit::HarvestedCommit;
use crate::platform::PlatformError;
use crate::retry::RetryConfig;

/// Default number of projects harvested at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default number of project pages requested per enumeration round.
pub const DEFAULT_PAGE_CONCURRENCY: usize = 5;

/// Projects per listing page.
pub const PROJECTS_PAGE_SIZE: u32 = 100;

/// Attempts per remote call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed pause between attempts.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3;

/// Upper bound on a single remote call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Commits adding more lines than this are treated as imports or generated code.
pub const DEFAULT_MAX_ADDITIONS: u64 = 2000;

/// Substrings marking automation in author, email or message.
pub const DEFAULT_CI_KEYWORDS: &[&str] = &["ci", "cd", "jenkins", "gitlab-ci", "bot", "auto", "runner"];

/// Options for one harvesting run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Projects harvested concurrently.
    pub concurrency: usize,
    /// Project pages requested per enumeration round.
    pub page_concurrency: usize,
    /// Items per listing page, for projects, branches and commits alike.
    pub page_size: u32,
    /// Ceiling on remote calls in flight across the whole run.
    pub max_in_flight: usize,
    pub retry: RetryConfig,
    /// Upper bound on each attempt of a remote call.
    pub request_timeout: Duration,
    pub classifier: ClassifierConfig,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            page_concurrency: DEFAULT_PAGE_CONCURRENCY,
            page_size: PROJECTS_PAGE_SIZE,
            max_in_flight: DEFAULT_CONCURRENCY,
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Run-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Distinct projects returned by enumeration.
    pub projects_seen: usize,
    /// Projects whose handle or branch list could not be fetched.
    pub projects_failed: usize,
    pub branches_seen: usize,
    /// Branches whose commit listing failed.
    pub branches_failed: usize,
    /// Commit summaries returned by all listings.
    pub commits_observed: usize,
    /// Commits in the final de-duplicated output.
    pub commits_accepted: usize,
    pub rejected_ci: usize,
    pub rejected_oversized: usize,
    pub rejected_merge: usize,
    /// Repeated sightings of an identifier, across branches or projects.
    pub duplicates: usize,
    /// Detail-fetch and timestamp-parse failures.
    pub dropped: usize,
    pub outside_window: usize,
    /// Non-fatal errors, one line each.
    pub errors: Vec<String>,
}

impl HarvestStats {
    /// Add another set of counters into this one.
    pub fn absorb(&mut self, other: HarvestStats) {
        self.projects_seen += other.projects_seen;
        self.projects_failed += other.projects_failed;
        self.branches_seen += other.branches_seen;
        self.branches_failed += other.branches_failed;
        self.commits_observed += other.commits_observed;
        self.commits_accepted += other.commits_accepted;
        self.rejected_ci += other.rejected_ci;
        self.rejected_oversized += other.rejected_oversized;
        self.rejected_merge += other.rejected_merge;
        self.duplicates += other.duplicates;
        self.dropped += other.dropped;
        self.outside_window += other.outside_window;
        self.errors.extend(other.errors);
    }

    /// Total commits excluded by policy.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected_ci + self.rejected_oversized + self.rejected_merge
    }
}

/// Result of one completed harvesting run.
#[derive(Debug, Clone)]
pub struct HarvestOutput {
    pub window: HarvestWindow,
    pub commits: Vec<HarvestedCommit>,
    pub stats: HarvestStats,
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("authentication failed: {0}")]
    Authentication(#[source] PlatformError),
}
