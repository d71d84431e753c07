//! gitpulse CLI - harvests daily commit activity from a GitLab server.

mod commands;
mod config;
mod progress;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::report::OutputFormat;

#[derive(Parser)]
#[command(name = "gitpulse")]
#[command(version)]
#[command(about = "Harvest and report daily commit activity from GitLab")]
#[command(
    long_about = "gitpulse walks every project and branch on a GitLab server, collects the \
commits made on one calendar day, filters out automation and oversized commits, and \
stores the result for per-author reporting."
)]
#[command(after_long_help = r#"EXAMPLES
    Harvest yesterday's commits:
        $ gitpulse harvest

    Backfill a specific day without writing to the database:
        $ gitpulse harvest --date 2024-03-01 --dry-run

    Per-author totals for the last 30 days:
        $ gitpulse report --days 30

    Daily series for one author as JSON:
        $ gitpulse report --daily --author "Alice Wong" --output json

    Generate shell completions:
        $ gitpulse completions bash > ~/.local/share/bash-completion/completions/gitpulse

CONFIGURATION
    gitpulse reads configuration from:
      1. ~/.config/gitpulse/config.toml (or $XDG_CONFIG_HOME/gitpulse/config.toml)
      2. ./gitpulse.toml
      3. Environment variables (GITPULSE_* prefix, e.g., GITPULSE_GITLAB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITPULSE_DATABASE_URL      Database connection string (default: ~/.local/state/gitpulse/gitpulse.db)
    GITPULSE_GITLAB_HOST       GitLab host
    GITPULSE_GITLAB_TOKEN      GitLab personal access token
    GITPULSE_MAPPING_PATH      Author-name mapping file
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest one day of commits
    Harvest {
        /// Day to harvest (YYYY-MM-DD); defaults to yesterday in the reference zone
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Dry run - harvest and summarize without writing to the database
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Projects harvested concurrently (default from config or 10)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// GitLab host (overrides config)
        #[arg(long)]
        host: Option<String>,
    },
    /// Show per-author totals or a daily series
    Report {
        /// Number of days ending yesterday
        #[arg(short = 'D', long, default_value_t = 7, value_parser = clap::value_parser!(u64).range(1..))]
        days: u64,

        /// First day of the report (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Last day of the report (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Restrict to one author
        #[arg(short, long)]
        author: Option<String>,

        /// Show a zero-filled per-day series instead of per-author totals
        #[arg(long)]
        daily: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a terminal
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("gitpulse=info,gitpulse_cli=info"),
        };
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL. Set GITPULSE_DATABASE_URL.")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Harvest {
            date,
            dry_run,
            concurrency,
            host,
        } => {
            let request = commands::harvest::HarvestRequest {
                date,
                dry_run,
                concurrency,
                host,
            };
            commands::harvest::handle_harvest(request, &config, &database_url).await?;
        }
        Commands::Report {
            days,
            since,
            until,
            author,
            daily,
            output,
        } => {
            let offset = config.utc_offset()?;
            let db = gitpulse::connect_and_migrate(&database_url).await?;
            let request = commands::report::ReportRequest {
                days,
                since,
                until,
                author,
                daily,
                output,
            };
            commands::report::handle_report(request, offset, &db).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
