//! Progress reporting for harvesting runs.

/// Progress events emitted by the run coordinator.
///
/// Work inside spawned project tasks logs through `tracing` instead.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum HarvestProgress {
    /// The credential was accepted.
    Authenticated { username: String },

    /// Starting project enumeration.
    FetchingProjects {
        /// Pages requested per round.
        page_concurrency: usize,
    },

    /// Fetched a page of projects.
    FetchedProjectPage {
        /// Page number (1-indexed).
        page: u32,
        count: usize,
        /// Running total of distinct projects.
        total_so_far: usize,
    },

    /// A page failed after all retries and counts as empty.
    ProjectPageFailed { page: u32, error: String },

    /// Enumeration finished.
    ProjectsComplete { total: usize },

    /// Starting the per-project fan-out.
    HarvestingProjects { count: usize, concurrency: usize },

    /// One project finished.
    ProjectComplete {
        project: String,
        accepted: usize,
        observed: usize,
    },

    /// One project could not be harvested.
    ProjectFailed { project: String, error: String },

    /// The run finished.
    HarvestComplete {
        accepted: usize,
        rejected: usize,
        failed_projects: usize,
    },

    /// Something non-fatal worth surfacing.
    Warning { message: String },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(HarvestProgress) + Send + Sync>;

/// Helper to emit progress events.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: HarvestProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
