use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use console::Term;
use gitpulse::ApiRateLimiter;
use gitpulse::AuthorMap;
use gitpulse::gitlab::GitLabClient;
use gitpulse::harvest::{HarvestStats, HarvestWindow, run_harvest};
use gitpulse::store::{self, PersistStats};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Flags of the `harvest` subcommand.
#[derive(Debug, Clone)]
pub(crate) struct HarvestRequest {
    pub date: Option<NaiveDate>,
    pub dry_run: bool,
    pub concurrency: Option<usize>,
    pub host: Option<String>,
}

pub(crate) async fn handle_harvest(
    request: HarvestRequest,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = request
        .host
        .clone()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| config.gitlab_host())
        .ok_or("No GitLab host configured. Set GITPULSE_GITLAB_HOST or pass --host.")?;
    let token = config
        .gitlab_token()
        .ok_or("No GitLab token configured. Set GITPULSE_GITLAB_TOKEN or gitlab.token.")?;
    let offset = config.utc_offset()?;

    let window = match request.date {
        Some(date) => HarvestWindow::for_day(date, offset),
        None => HarvestWindow::yesterday(Utc::now(), offset),
    };

    let mut options = config.harvest_options();
    if let Some(concurrency) = request.concurrency {
        options.concurrency = concurrency.max(1);
        options.max_in_flight = options.concurrency;
    }

    // Connect before harvesting so a broken database fails fast.
    let db = if request.dry_run {
        None
    } else {
        Some(gitpulse::connect_and_migrate(database_url).await?)
    };

    let authors = match config.mapping.path {
        Some(ref path) => AuthorMap::load_or_empty(path),
        None => AuthorMap::default(),
    };

    let client = GitLabClient::new(
        &host,
        &token,
        config.request_timeout(),
        ApiRateLimiter::optional(config.gitlab.requests_per_second),
    )?;

    let is_tty = Term::stdout().is_term();
    if is_tty {
        println!("Harvesting {} on {}", window, client.host());
    } else {
        tracing::info!(window = %window, host = %client.host(), "Starting harvest");
    }

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let result = run_harvest(&client, window, &options, Some(&callback)).await;
    reporter.finish();
    let output = result?;

    let persisted = match db {
        Some(ref db) => Some(store::persist_commits(db, &output.commits, &authors).await?),
        None => None,
    };

    if is_tty {
        for line in summary_lines(&output.stats, persisted.as_ref()) {
            println!("{}", line);
        }
        if !output.stats.errors.is_empty() {
            println!("\nErrors:");
            for error in &output.stats.errors {
                println!("  - {}", error);
            }
        }
    } else {
        let stats = &output.stats;
        tracing::info!(
            projects = stats.projects_seen,
            projects_failed = stats.projects_failed,
            accepted = stats.commits_accepted,
            rejected = stats.rejected(),
            duplicates = stats.duplicates,
            dropped = stats.dropped,
            outside_window = stats.outside_window,
            inserted = persisted.map(|p| p.inserted),
            dry_run = request.dry_run,
            "Harvest finished"
        );
        for error in &stats.errors {
            tracing::warn!("{}", error);
        }
    }

    Ok(())
}

/// Human-readable run summary.
fn summary_lines(stats: &HarvestStats, persisted: Option<&PersistStats>) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "Harvest summary:".to_string(),
        format!(
            "  Projects:        {} ({} failed)",
            stats.projects_seen, stats.projects_failed
        ),
        format!(
            "  Branches:        {} ({} failed)",
            stats.branches_seen, stats.branches_failed
        ),
        format!("  Commits seen:    {}", stats.commits_observed),
        format!("  Accepted:        {}", stats.commits_accepted),
        format!(
            "  Rejected:        {} (automation {}, oversized {}, merge {})",
            stats.rejected(),
            stats.rejected_ci,
            stats.rejected_oversized,
            stats.rejected_merge
        ),
        format!("  Duplicates:      {}", stats.duplicates),
    ];
    if stats.dropped > 0 || stats.outside_window > 0 {
        lines.push(format!(
            "  Dropped:         {} (outside window {})",
            stats.dropped, stats.outside_window
        ));
    }
    match persisted {
        Some(p) => lines.push(format!(
            "  Saved:           {} new ({} already stored)",
            p.inserted, p.already_stored
        )),
        None => lines.push("  Saved:           nothing (dry run)".to_string()),
    }
    lines
}
