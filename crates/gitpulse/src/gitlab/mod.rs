//! GitLab API v4 client.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitLab API operations
//! - [`types`] - Response shapes
//! - [`client`] - The HTTP client and its [`PlatformClient`](crate::platform::PlatformClient) impl
//! - [`convert`] - Conversion into platform-agnostic types
//!
//! ```ignore
//! use gitpulse::gitlab::GitLabClient;
//! use gitpulse::harvest::{HarvestOptions, HarvestWindow, run_harvest};
//!
//! let client = GitLabClient::new("git.example.com", &token, timeout, None)?;
//! let output = run_harvest(&client, window, &HarvestOptions::default(), None).await?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{API_PAGE_SIZE, GitLabClient};
pub use error::{GitLabError, short_error_message};
pub use types::{GitLabBranch, GitLabCommit, GitLabCommitStats, GitLabProject, GitLabUser};
