//! Configuration file support for gitpulse.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GITPULSE_`, e.g., `GITPULSE_DATABASE_URL`)
//! 3. Config file (./gitpulse.toml, then ~/.config/gitpulse/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/gitpulse/gitpulse.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite:///var/lib/gitpulse/gitpulse.db?mode=rwc"
//!
//! [gitlab]
//! host = "git.example.com"
//! token = "glpat-..."  # or use GITPULSE_GITLAB_TOKEN env var
//! timeout_secs = 30
//! requests_per_second = 10  # 0 disables pacing
//!
//! [harvest]
//! concurrency = 10
//! page_concurrency = 5
//! max_attempts = 3
//! retry_delay_secs = 3
//! max_additions = 2000
//! ci_keywords = ["ci", "cd", "jenkins", "gitlab-ci", "bot", "auto", "runner"]
//! utc_offset_hours = 8
//!
//! [mapping]
//! path = "/etc/gitpulse/authors.toml"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use gitpulse::harvest::{
    ClassifierConfig, DEFAULT_CI_KEYWORDS, DEFAULT_CONCURRENCY, DEFAULT_MAX_ADDITIONS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_PAGE_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_DELAY_SECS, HarvestOptions, offset_from_hours,
};
use gitpulse::platform::GITLAB_DEFAULT_RPS;
use gitpulse::retry::RetryConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// GitLab server configuration.
    pub gitlab: GitLabConfig,
    /// Harvesting run options.
    pub harvest: HarvestConfig,
    /// Author-name mapping.
    pub mapping: MappingConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitLab server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// GitLab host (e.g., "git.example.com" or "https://git.example.com").
    /// Can also be set via GITPULSE_GITLAB_HOST environment variable.
    pub host: Option<String>,
    /// Personal access token.
    /// Can also be set via GITPULSE_GITLAB_TOKEN environment variable.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Proactive request pacing; 0 disables it.
    pub requests_per_second: u32,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            requests_per_second: GITLAB_DEFAULT_RPS,
        }
    }
}

/// Harvesting run options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Projects harvested concurrently.
    pub concurrency: usize,
    /// Project pages requested per enumeration round.
    pub page_concurrency: usize,
    /// Attempts per remote call.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay_secs: u64,
    /// Commits adding more lines than this are skipped.
    pub max_additions: u64,
    /// Substrings marking automation.
    pub ci_keywords: Vec<String>,
    /// Reference zone for the harvest day, in whole hours east of UTC.
    pub utc_offset_hours: i32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            page_concurrency: DEFAULT_PAGE_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            max_additions: DEFAULT_MAX_ADDITIONS,
            ci_keywords: DEFAULT_CI_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            utc_offset_hours: 0,
        }
    }
}

/// Author-name mapping configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// TOML file with an `[authors]` table.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/gitpulse/config.toml)
    /// 3. Local config file (./gitpulse.toml)
    /// 4. Environment variables with GITPULSE_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("gitpulse.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./gitpulse.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., GITPULSE_GITLAB_TOKEN -> gitlab.token,
        // GITPULSE_HARVEST__MAX_ADDITIONS -> harvest.max_additions
        builder = builder.add_source(
            Environment::with_prefix("GITPULSE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("harvest.ci_keywords")
                .try_parsing(true),
        );
        builder = builder.add_source(
            Environment::with_prefix("GITPULSE")
                .prefix_separator("_")
                .separator("_")
                .try_parsing(true)
                .source(Some(Self::single_word_env_vars())),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// `GITPULSE_<SECTION>_<KEY>` variables whose key is a single word
    /// (`GITPULSE_DATABASE_URL`, `GITPULSE_GITLAB_TOKEN`, ...).
    fn single_word_env_vars() -> config::Map<String, String> {
        const KEYS: &[&str] = &[
            "GITPULSE_DATABASE_URL",
            "GITPULSE_GITLAB_HOST",
            "GITPULSE_GITLAB_TOKEN",
            "GITPULSE_HARVEST_CONCURRENCY",
            "GITPULSE_MAPPING_PATH",
        ];
        KEYS.iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect()
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("gitpulse.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Get the GitLab host.
    pub fn gitlab_host(&self) -> Option<String> {
        self.gitlab.host.clone().filter(|h| !h.trim().is_empty())
    }

    /// Get the GitLab token.
    pub fn gitlab_token(&self) -> Option<String> {
        self.gitlab.token.clone().filter(|t| !t.trim().is_empty())
    }

    /// The harvest reference zone.
    pub fn utc_offset(&self) -> Result<FixedOffset, String> {
        offset_from_hours(self.harvest.utc_offset_hours).ok_or_else(|| {
            format!(
                "harvest.utc_offset_hours must be between -23 and 23, got {}",
                self.harvest.utc_offset_hours
            )
        })
    }

    /// Engine options from the `[harvest]` and `[gitlab]` sections.
    pub fn harvest_options(&self) -> HarvestOptions {
        let concurrency = self.harvest.concurrency.max(1);
        HarvestOptions {
            concurrency,
            page_concurrency: self.harvest.page_concurrency.max(1),
            max_in_flight: concurrency,
            retry: RetryConfig::new(
                Duration::from_secs(self.harvest.retry_delay_secs),
                self.harvest.max_attempts.max(1),
            ),
            request_timeout: self.request_timeout(),
            classifier: ClassifierConfig {
                keywords: self.harvest.ci_keywords.clone(),
                max_additions: self.harvest.max_additions,
            },
            ..HarvestOptions::default()
        }
    }

    /// Per-request timeout for the GitLab client.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gitlab.timeout_secs.max(1))
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitpulse").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/gitpulse` or `~/.local/state/gitpulse`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitpulse").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.gitlab.host.is_none());
        assert!(config.gitlab.token.is_none());
        assert_eq!(config.gitlab.timeout_secs, 30);
        assert_eq!(config.gitlab.requests_per_second, 10);
        assert_eq!(config.harvest.concurrency, 10);
        assert_eq!(config.harvest.page_concurrency, 5);
        assert_eq!(config.harvest.max_attempts, 3);
        assert_eq!(config.harvest.retry_delay_secs, 3);
        assert_eq!(config.harvest.max_additions, 2000);
        assert_eq!(config.harvest.ci_keywords.len(), 7);
        assert_eq!(config.harvest.utc_offset_hours, 0);
        assert!(config.mapping.path.is_none());
    }

    #[test]
    fn test_full_config_parsing() {
        let config = parse(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [gitlab]
            host = "git.example.com"
            token = "glpat-test"
            timeout_secs = 10
            requests_per_second = 0

            [harvest]
            concurrency = 4
            page_concurrency = 2
            max_attempts = 5
            retry_delay_secs = 1
            max_additions = 500
            ci_keywords = ["bot"]
            utc_offset_hours = 8

            [mapping]
            path = "/etc/gitpulse/authors.toml"
            "#,
        );

        assert_eq!(
            config.database.url,
            Some("sqlite:///tmp/test.db".to_string())
        );
        assert_eq!(config.gitlab_host(), Some("git.example.com".to_string()));
        assert_eq!(config.gitlab_token(), Some("glpat-test".to_string()));
        assert_eq!(config.gitlab.requests_per_second, 0);
        assert_eq!(
            config.mapping.path,
            Some(PathBuf::from("/etc/gitpulse/authors.toml"))
        );

        let options = config.harvest_options();
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.page_concurrency, 2);
        assert_eq!(options.max_in_flight, 4);
        assert_eq!(options.retry.max_attempts, 5);
        assert_eq!(options.retry.delay, Duration::from_secs(1));
        assert_eq!(options.request_timeout, Duration::from_secs(10));
        assert_eq!(options.classifier.keywords, vec!["bot".to_string()]);
        assert_eq!(options.classifier.max_additions, 500);
        assert_eq!(
            config.utc_offset().unwrap(),
            FixedOffset::east_opt(8 * 3600).unwrap()
        );
    }

    #[test]
    fn test_config_partial_override() {
        let config = parse(
            r#"
            [harvest]
            max_additions = 100
            "#,
        );
        assert_eq!(config.harvest.max_additions, 100);
        assert_eq!(config.harvest.concurrency, 10);
        assert_eq!(config.gitlab.timeout_secs, 30);
    }

    #[test]
    fn test_blank_credentials_are_missing() {
        let config = parse(
            r#"
            [gitlab]
            host = ""
            token = "  "
            "#,
        );
        assert!(config.gitlab_host().is_none());
        assert!(config.gitlab_token().is_none());
    }

    #[test]
    fn test_invalid_offset_is_reported() {
        let config = parse(
            r#"
            [harvest]
            utc_offset_hours = 30
            "#,
        );
        let err = config.utc_offset().unwrap_err();
        assert!(err.contains("utc_offset_hours"));
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = parse(
            r#"
            [gitlab]
            timeout_secs = 0

            [harvest]
            concurrency = 0
            page_concurrency = 0
            max_attempts = 0
            "#,
        );
        let options = config.harvest_options();
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.page_concurrency, 1);
        assert_eq!(options.retry.max_attempts, 1);
        assert_eq!(options.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let config = Config::default();
        if let Some(url) = config.database_url() {
            assert!(url.starts_with("sqlite://"));
            assert!(url.contains("gitpulse.db"));
            assert!(url.ends_with("?mode=rwc"));
        }
    }

    #[test]
    fn test_database_url_respects_configured_value() {
        let config = parse(
            r#"
            [database]
            url = "postgres:///gitpulse"
            "#,
        );
        assert_eq!(
            config.database_url(),
            Some("postgres:///gitpulse".to_string())
        );
    }
}
