use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gitpulse::harvest::HarvestProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Spinner for project enumeration.
    fetch_bar: Option<ProgressBar>,
    /// Pages that failed and were counted as empty.
    failed_pages: usize,
    /// Bar for the per-project fan-out.
    harvest_bar: Option<ProgressBar>,
    /// Commits accepted so far.
    accepted: usize,
}

/// Interactive progress reporter using indicatif.
///
/// All mutable state is consolidated into a single `Mutex<ProgressState>`
/// so events from the coordinator update it consistently.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    /// Create a new interactive reporter.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// A reporter that draws nowhere.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a progress event.
    pub fn handle(&self, event: HarvestProgress) {
        let mut state = self.state();

        match event {
            HarvestProgress::Authenticated { username } => {
                self.multi
                    .println(format!("Authenticated as {}", username))
                    .ok();
            }

            HarvestProgress::FetchingProjects { page_concurrency } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_prefix(format!("{:10}", "projects"));
                bar.set_message(format!(
                    "Fetching projects ({} pages at a time)...",
                    page_concurrency
                ));
                state.fetch_bar = Some(bar);
            }

            HarvestProgress::FetchedProjectPage {
                page, total_so_far, ..
            } => {
                if let Some(ref bar) = state.fetch_bar {
                    bar.set_message(format!("page {} ({} projects)", page, total_so_far));
                }
            }

            HarvestProgress::ProjectPageFailed { page, error } => {
                state.failed_pages += 1;
                self.multi
                    .println(format!("  warning: project page {} failed: {}", page, error))
                    .ok();
            }

            HarvestProgress::ProjectsComplete { total } => {
                if let Some(ref bar) = state.fetch_bar {
                    let suffix = if state.failed_pages > 0 {
                        format!(", {} pages failed", state.failed_pages)
                    } else {
                        String::new()
                    };
                    bar.set_style(Self::done_style());
                    bar.finish_with_message(format!("{} projects{}", total, suffix));
                }
            }

            HarvestProgress::HarvestingProjects { count, concurrency } => {
                let bar = self.multi.add(ProgressBar::new(count as u64));
                bar.set_style(Self::bar_style());
                bar.set_prefix(format!("{:10}", "harvest"));
                bar.set_message(format!("{} at a time", concurrency));
                state.harvest_bar = Some(bar);
            }

            HarvestProgress::ProjectComplete {
                project, accepted, ..
            } => {
                state.accepted += accepted;
                if let Some(ref bar) = state.harvest_bar {
                    bar.inc(1);
                    bar.set_message(format!("{} commits, last: {}", state.accepted, project));
                }
            }

            HarvestProgress::ProjectFailed { project, error } => {
                if let Some(ref bar) = state.harvest_bar {
                    bar.inc(1);
                }
                self.multi
                    .println(format!("  warning: {} failed: {}", project, error))
                    .ok();
            }

            HarvestProgress::HarvestComplete {
                accepted,
                rejected,
                failed_projects,
            } => {
                if let Some(ref bar) = state.harvest_bar {
                    bar.set_style(Self::done_style());
                    bar.finish_with_message(format!(
                        "{} commits accepted, {} rejected, {} projects failed",
                        accepted, rejected, failed_projects
                    ));
                }
            }

            HarvestProgress::Warning { message } => {
                self.multi.println(format!("  warning: {}", message)).ok();
            }

            _ => {}
        }
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let state = self.state();
        for bar in [&state.fetch_bar, &state.harvest_bar].into_iter().flatten() {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn done_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {msg:.green}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
            .map(|style| style.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
