//! The commit-harvesting pipeline.
//!
//! # Module Structure
//!
//! - [`types`] - Options, stats, output and constants
//! - [`progress`] - Progress reporting: `HarvestProgress`, `ProgressCallback`, `emit()`
//! - [`window`] - The calendar day a run covers
//! - [`classify`] - Which commits count as human work
//! - [`aggregate`] - Merging per-project results
//! - [`engine`] - The concurrent run: `run_harvest()`
//!
//! # Example
//!
//! ```ignore
//! use gitpulse::harvest::{HarvestOptions, HarvestWindow, offset_from_hours, run_harvest};
//!
//! async fn harvest<C: PlatformClient + Clone + 'static>(client: &C) {
//!     let offset = offset_from_hours(8).unwrap();
//!     let window = HarvestWindow::yesterday(chrono::Utc::now(), offset);
//!     let output = run_harvest(client, window, &HarvestOptions::default(), None).await?;
//!     println!("Harvested {} commits", output.commits.len());
//! }
//! ```

pub mod aggregate;
pub mod classify;
pub mod engine;
mod progress;
mod types;
pub mod window;

// Re-export types
pub use types::{HarvestError, HarvestOptions, HarvestOutput, HarvestStats};

// Re-export constants
pub use types::{
    DEFAULT_CI_KEYWORDS, DEFAULT_CONCURRENCY, DEFAULT_MAX_ADDITIONS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_PAGE_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS,
    PROJECTS_PAGE_SIZE,
};

// Re-export progress types
pub use progress::{HarvestProgress, ProgressCallback, emit};

pub use aggregate::{ProjectHarvest, aggregate};
pub use classify::{ClassifierConfig, CommitClassifier, Rejection, Verdict};
pub use engine::run_harvest;
pub use window::{HarvestWindow, offset_from_hours};
