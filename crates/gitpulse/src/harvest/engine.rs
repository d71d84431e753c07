//! The harvesting engine.
//!
//! One run authenticates, enumerates every non-archived project, fans out
//! one task per project (bounded by `concurrency`), and merges the accepted
//! commits. Every remote call goes through [`HarvestContext::call`], which
//! applies the retry policy, the per-attempt timeout and the global
//! in-flight ceiling. Branch and commit listings are read one page per call.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::aggregate::{ProjectHarvest, aggregate};
use super::classify::{CommitClassifier, Rejection, Verdict};
use super::progress::{HarvestProgress, ProgressCallback, emit};
use super::types::{HarvestError, HarvestOptions, HarvestOutput, HarvestStats};
use super::window::HarvestWindow;
use crate::commit::RawCommit;
use crate::platform::{
    self, CommitDetail, CommitSummary, PlatformClient, PlatformError, ProjectSummary,
    short_error_message,
};
use crate::retry::{RetryConfig, with_retry};

/// Upper bound on pages read from one branch or commit listing.
///
/// A server that keeps returning full pages would otherwise never let a
/// listing finish.
const MAX_LIST_PAGES: u32 = 1000;

/// State shared by every task of one run. Read-only apart from the
/// in-flight semaphore.
struct HarvestContext {
    window: HarvestWindow,
    retry: RetryConfig,
    request_timeout: Duration,
    page_size: u32,
    in_flight: Arc<Semaphore>,
    classifier: CommitClassifier,
}

impl HarvestContext {
    fn new(window: HarvestWindow, options: &HarvestOptions) -> Self {
        Self {
            window,
            retry: options.retry,
            request_timeout: options.request_timeout,
            page_size: options.page_size.max(1),
            in_flight: Arc::new(Semaphore::new(options.max_in_flight.max(1))),
            classifier: CommitClassifier::new(&options.classifier),
        }
    }

    /// Run one remote call with retry, timeout and the in-flight ceiling.
    ///
    /// Each attempt holds one in-flight permit for at most
    /// `request_timeout`; waiting for the permit is not counted.
    async fn call<T, F, Fut>(&self, label: &str, mut operation: F) -> platform::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = platform::Result<T>>,
    {
        let timeout = self.request_timeout;

        with_retry(
            || {
                let attempt = operation();
                let in_flight = Arc::clone(&self.in_flight);
                async move {
                    let _permit = in_flight
                        .acquire_owned()
                        .await
                        .map_err(|_| PlatformError::internal("request limiter closed"))?;
                    match tokio::time::timeout(timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => Err(PlatformError::timeout(format!(
                            "no response within {}s",
                            timeout.as_secs()
                        ))),
                    }
                }
            },
            PlatformError::is_transient,
            |e: &PlatformError| short_error_message(e),
            label,
            self.retry,
        )
        .await
    }

    /// Read a listing page by page until a short page.
    ///
    /// Every page is its own [`call`](Self::call), so a long listing is
    /// never bounded by a single request timeout. A failed page fails the
    /// whole listing.
    async fn collect_pages<T, F, Fut>(
        &self,
        label: &str,
        mut fetch_page: F,
    ) -> platform::Result<Vec<T>>
    where
        F: FnMut(u32, u32) -> Fut,
        Fut: Future<Output = platform::Result<Vec<T>>>,
    {
        let per_page = self.page_size;
        let mut items = Vec::new();

        for page in 1..=MAX_LIST_PAGES {
            let batch = self
                .call(&format!("{label} page {page}"), || fetch_page(page, per_page))
                .await?;
            let short = batch.len() < per_page as usize;
            items.extend(batch);
            if short {
                return Ok(items);
            }
        }

        tracing::warn!(listing = %label, pages = MAX_LIST_PAGES, "Listing truncated at page limit");
        Ok(items)
    }
}

/// Run one harvesting pass over every project for `window`.
///
/// Only an authentication failure aborts the run. Every other failure is
/// contained to its project, branch or commit, counted in
/// [`HarvestStats`], and logged.
///
/// # Example
///
/// ```ignore
/// use gitpulse::harvest::{HarvestOptions, HarvestWindow, run_harvest};
///
/// let window = HarvestWindow::yesterday(chrono::Utc::now(), offset);
/// let output = run_harvest(&client, window, &HarvestOptions::default(), None).await?;
/// println!("{} commits", output.commits.len());
/// ```
pub async fn run_harvest<C>(
    client: &C,
    window: HarvestWindow,
    options: &HarvestOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<HarvestOutput, HarvestError>
where
    C: PlatformClient + Clone + 'static,
{
    let ctx = Arc::new(HarvestContext::new(window, options));

    let user = match tokio::time::timeout(options.request_timeout, client.authenticate()).await {
        Ok(Ok(user)) => user,
        Ok(Err(e)) => return Err(HarvestError::Authentication(e)),
        Err(_) => {
            return Err(HarvestError::Authentication(PlatformError::timeout(
                "authentication did not complete",
            )));
        }
    };

    tracing::info!(user = %user.username, window = %window, "Authenticated, starting harvest");
    emit(
        on_progress,
        HarvestProgress::Authenticated {
            username: user.username,
        },
    );

    let (projects, enumeration_stats) =
        enumerate_projects(client, &ctx, options, on_progress).await;
    let results = harvest_projects(client, &ctx, projects, options.concurrency, on_progress).await;

    let (commits, mut stats) = aggregate(results);
    stats.absorb(enumeration_stats);

    tracing::info!(
        accepted = stats.commits_accepted,
        observed = stats.commits_observed,
        rejected = stats.rejected(),
        duplicates = stats.duplicates,
        dropped = stats.dropped,
        failed_projects = stats.projects_failed,
        "Harvest complete"
    );
    emit(
        on_progress,
        HarvestProgress::HarvestComplete {
            accepted: stats.commits_accepted,
            rejected: stats.rejected(),
            failed_projects: stats.projects_failed,
        },
    );

    Ok(HarvestOutput {
        window,
        commits,
        stats,
    })
}

/// List every project, `page_concurrency` pages per round, until a round
/// yields nothing. Failed pages count as empty.
async fn enumerate_projects<C>(
    client: &C,
    ctx: &Arc<HarvestContext>,
    options: &HarvestOptions,
    on_progress: Option<&ProgressCallback>,
) -> (Vec<ProjectSummary>, HarvestStats)
where
    C: PlatformClient + Clone + 'static,
{
    let page_concurrency = u32::try_from(options.page_concurrency.max(1)).unwrap_or(u32::MAX);
    let per_page = options.page_size.max(1);

    let mut projects: BTreeMap<u64, ProjectSummary> = BTreeMap::new();
    let mut stats = HarvestStats::default();
    let mut first_page = 1u32;

    emit(
        on_progress,
        HarvestProgress::FetchingProjects {
            page_concurrency: page_concurrency as usize,
        },
    );

    loop {
        let last_page = first_page.saturating_add(page_concurrency - 1);
        let mut join_set: JoinSet<(u32, platform::Result<Vec<ProjectSummary>>)> = JoinSet::new();

        for page in first_page..=last_page {
            let client = client.clone();
            let ctx = Arc::clone(ctx);
            join_set.spawn(async move {
                let label = format!("project page {page}");
                let result = ctx
                    .call(&label, || client.list_projects_page(page, per_page))
                    .await;
                (page, result)
            });
        }

        let mut round = Vec::with_capacity(page_concurrency as usize);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => round.push(outcome),
                Err(e) => {
                    let message = format!("project page task failed: {e}");
                    tracing::error!("{message}");
                    stats.errors.push(message);
                }
            }
        }
        round.sort_by_key(|(page, _)| *page);

        let mut round_total = 0usize;
        for (page, result) in round {
            match result {
                Ok(page_projects) => {
                    let count = page_projects.len();
                    round_total += count;
                    for project in page_projects {
                        projects.entry(project.id).or_insert(project);
                    }
                    emit(
                        on_progress,
                        HarvestProgress::FetchedProjectPage {
                            page,
                            count,
                            total_so_far: projects.len(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(page, "Project page failed, treating as empty: {e}");
                    stats.errors.push(format!("project page {page}: {e}"));
                    emit(
                        on_progress,
                        HarvestProgress::ProjectPageFailed {
                            page,
                            error: short_error_message(&e),
                        },
                    );
                }
            }
        }

        if round_total == 0 || last_page == u32::MAX {
            break;
        }
        first_page = last_page + 1;
    }

    stats.projects_seen = projects.len();
    emit(
        on_progress,
        HarvestProgress::ProjectsComplete {
            total: projects.len(),
        },
    );

    (projects.into_values().collect(), stats)
}

/// Harvest every project with at most `concurrency` projects at once.
async fn harvest_projects<C>(
    client: &C,
    ctx: &Arc<HarvestContext>,
    projects: Vec<ProjectSummary>,
    concurrency: usize,
    on_progress: Option<&ProgressCallback>,
) -> Vec<ProjectHarvest>
where
    C: PlatformClient + Clone + 'static,
{
    if projects.is_empty() {
        return Vec::new();
    }

    let concurrency = concurrency.clamp(1, projects.len());
    let semaphore = Arc::new(Semaphore::new(concurrency));

    emit(
        on_progress,
        HarvestProgress::HarvestingProjects {
            count: projects.len(),
            concurrency,
        },
    );

    let mut join_set: JoinSet<ProjectHarvest> = JoinSet::new();
    for project in projects {
        let client = client.clone();
        let ctx = Arc::clone(ctx);
        let semaphore = Arc::clone(&semaphore);

        join_set.spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return ProjectHarvest::started(&project)
                        .failed("Semaphore closed unexpectedly".to_string());
                }
            };
            harvest_project(&client, &ctx, project).await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => {
                if result.stats.projects_failed > 0 {
                    emit(
                        on_progress,
                        HarvestProgress::ProjectFailed {
                            project: result.project_path.clone(),
                            error: result.stats.errors.last().cloned().unwrap_or_default(),
                        },
                    );
                } else {
                    emit(
                        on_progress,
                        HarvestProgress::ProjectComplete {
                            project: result.project_path.clone(),
                            accepted: result.commits.len(),
                            observed: result.stats.commits_observed,
                        },
                    );
                }
                results.push(result);
            }
            Err(e) => {
                let message = format!("project task failed: {e}");
                tracing::error!("{message}");
                emit(
                    on_progress,
                    HarvestProgress::Warning {
                        message: message.clone(),
                    },
                );
                results.push(ProjectHarvest {
                    stats: HarvestStats {
                        projects_failed: 1,
                        errors: vec![message],
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
        }
    }

    results
}

impl ProjectHarvest {
    fn started(project: &ProjectSummary) -> Self {
        Self {
            project_id: project.id,
            project_path: project.path.clone(),
            ..Default::default()
        }
    }

    fn failed(mut self, message: String) -> Self {
        tracing::warn!(project = %self.project_path, "{message}");
        self.stats.projects_failed += 1;
        self.stats.errors.push(message);
        self
    }
}

/// Harvest one project: resolve it, list branches, list each branch's
/// commits in the window, fetch details, classify.
async fn harvest_project<C>(
    client: &C,
    ctx: &Arc<HarvestContext>,
    project: ProjectSummary,
) -> ProjectHarvest
where
    C: PlatformClient + Clone + 'static,
{
    let mut out = ProjectHarvest::started(&project);

    let handle = match ctx
        .call(&format!("project {}", project.path), || {
            client.get_project(project.id)
        })
        .await
    {
        Ok(handle) => handle,
        Err(e) => return out.failed(format!("{}: resolving project: {e}", project.path)),
    };

    let branches = match ctx
        .collect_pages(&format!("branches of {}", handle.path), |page, per_page| {
            client.list_branches_page(handle.id, page, per_page)
        })
        .await
    {
        Ok(branches) => branches,
        Err(e) => return out.failed(format!("{}: listing branches: {e}", handle.path)),
    };

    out.stats.branches_seen = branches.len();
    if branches.is_empty() {
        tracing::debug!(project = %handle.path, "No branches");
        return out;
    }

    let listings = list_branch_commits(client, ctx, handle.id, &handle.path, &branches).await;

    // Walk listings in branch order so the first branch to show a commit
    // keeps it; later sightings are not fetched again.
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending: Vec<(String, CommitSummary)> = Vec::new();

    for (branch, listing) in branches.iter().zip(listings) {
        let summaries = match listing {
            Ok(summaries) => summaries,
            Err(e) => {
                let message = format!("{}@{branch}: listing commits: {e}", handle.path);
                tracing::warn!(project = %handle.path, branch = %branch, "{message}");
                out.stats.branches_failed += 1;
                out.stats.errors.push(message);
                continue;
            }
        };

        for summary in summaries {
            out.stats.commits_observed += 1;

            if !seen.insert(summary.id.clone()) {
                out.stats.duplicates += 1;
                continue;
            }
            if summary.is_merge() {
                out.stats.rejected_merge += 1;
                continue;
            }
            if let Some(date) = summary.committed_date.as_deref()
                && let Ok(ts) = DateTime::parse_from_rfc3339(date)
                && !ctx.window.contains(&ts)
            {
                out.stats.outside_window += 1;
                continue;
            }
            pending.push((branch.clone(), summary));
        }
    }

    let details = fetch_commit_details(client, ctx, handle.id, &pending).await;

    for ((branch, summary), detail) in pending.into_iter().zip(details) {
        let detail = match detail {
            Ok(detail) => detail,
            Err(e) => {
                let message = format!("{}@{branch}: commit {}: {e}", handle.path, summary.id);
                tracing::warn!(project = %handle.path, commit = %summary.id, "Dropping commit: {e}");
                out.stats.dropped += 1;
                out.stats.errors.push(message);
                continue;
            }
        };

        let commit = match RawCommit::from_detail(handle.id, &branch, detail) {
            Ok(commit) => commit,
            Err(e) => {
                tracing::warn!(project = %handle.path, "Dropping commit: {e}");
                out.stats.dropped += 1;
                out.stats.errors.push(format!("{}@{branch}: {e}", handle.path));
                continue;
            }
        };

        if !ctx.window.contains(&commit.committed_at) {
            out.stats.outside_window += 1;
            continue;
        }

        match ctx.classifier.classify(&commit) {
            Verdict::Accept => out.commits.push(commit),
            Verdict::Reject(Rejection::Automation) => out.stats.rejected_ci += 1,
            Verdict::Reject(Rejection::Oversized) => out.stats.rejected_oversized += 1,
            Verdict::Reject(Rejection::Merge) => out.stats.rejected_merge += 1,
        }
    }

    tracing::debug!(
        project = %handle.path,
        branches = out.stats.branches_seen,
        observed = out.stats.commits_observed,
        accepted = out.commits.len(),
        "Project harvested"
    );

    out
}

/// List the window's commits of every branch concurrently.
///
/// The result is in branch order.
async fn list_branch_commits<C>(
    client: &C,
    ctx: &Arc<HarvestContext>,
    project_id: u64,
    project_path: &str,
    branches: &[String],
) -> Vec<platform::Result<Vec<CommitSummary>>>
where
    C: PlatformClient + Clone + 'static,
{
    let (since, until) = (ctx.window.start, ctx.window.end);
    let mut join_set: JoinSet<(usize, platform::Result<Vec<CommitSummary>>)> = JoinSet::new();

    for (index, branch) in branches.iter().enumerate() {
        let client = client.clone();
        let ctx = Arc::clone(ctx);
        let branch = branch.clone();
        let label = format!("commits of {project_path}@{branch}");

        join_set.spawn(async move {
            let result = ctx
                .collect_pages(&label, |page, per_page| {
                    client.list_commits_page(project_id, &branch, since, until, page, per_page)
                })
                .await;
            (index, result)
        });
    }

    collect_indexed(join_set, branches.len()).await
}

/// Fetch details for every pending commit concurrently, in input order.
async fn fetch_commit_details<C>(
    client: &C,
    ctx: &Arc<HarvestContext>,
    project_id: u64,
    pending: &[(String, CommitSummary)],
) -> Vec<platform::Result<CommitDetail>>
where
    C: PlatformClient + Clone + 'static,
{
    let mut join_set: JoinSet<(usize, platform::Result<CommitDetail>)> = JoinSet::new();

    for (index, (_, summary)) in pending.iter().enumerate() {
        let client = client.clone();
        let ctx = Arc::clone(ctx);
        let sha = summary.id.clone();

        join_set.spawn(async move {
            let label = format!("commit {sha}");
            let result = ctx.call(&label, || client.get_commit(project_id, &sha)).await;
            (index, result)
        });
    }

    collect_indexed(join_set, pending.len()).await
}

/// Drain a join set of `(index, result)` pairs back into index order.
///
/// A task that panicked leaves an internal error in its slot.
async fn collect_indexed<T: 'static>(
    mut join_set: JoinSet<(usize, platform::Result<T>)>,
    len: usize,
) -> Vec<platform::Result<T>> {
    let mut slots: Vec<Option<platform::Result<T>>> = (0..len).map(|_| None).collect();

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(result);
                }
            }
            Err(e) => tracing::error!("harvest task failed: {e}"),
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(PlatformError::internal("harvest task failed"))))
        .collect()
}
