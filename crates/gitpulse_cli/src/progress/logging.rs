use gitpulse::harvest::HarvestProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: HarvestProgress) {
        match event {
            HarvestProgress::Authenticated { username } => {
                tracing::info!(username = %username, "Authenticated");
            }

            HarvestProgress::FetchingProjects { page_concurrency } => {
                tracing::info!(page_concurrency, "Fetching projects");
            }

            HarvestProgress::FetchedProjectPage {
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(page, count, total_so_far, "Fetched project page");
            }

            HarvestProgress::ProjectPageFailed { page, error } => {
                tracing::warn!(page, error = %error, "Project page failed, treating as empty");
            }

            HarvestProgress::ProjectsComplete { total } => {
                tracing::info!(total, "Project enumeration complete");
            }

            HarvestProgress::HarvestingProjects { count, concurrency } => {
                tracing::info!(count, concurrency, "Harvesting projects");
            }

            HarvestProgress::ProjectComplete {
                project,
                accepted,
                observed,
            } => {
                tracing::debug!(project = %project, accepted, observed, "Project harvested");
            }

            HarvestProgress::ProjectFailed { project, error } => {
                tracing::warn!(project = %project, error = %error, "Project failed");
            }

            HarvestProgress::HarvestComplete {
                accepted,
                rejected,
                failed_projects,
            } => {
                tracing::info!(accepted, rejected, failed_projects, "Harvest complete");
            }

            HarvestProgress::Warning { message } => {
                tracing::warn!("{}", message);
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
