//! gitpulse - daily commit activity from a self-hosted GitLab.
//!
//! This library enumerates every project and branch on a GitLab server,
//! harvests the commits of one calendar day with bounded concurrency and
//! retry, filters out automation, merges and oversized imports, and stores
//! the result for per-author reporting.
//!
//! # Features
//!
//! - `sqlite` (default) / `postgres` - database backend.
//! - `migrate` (default) - Enables database migration support. When enabled,
//!   you can use [`connect_and_migrate`] to run migrations on connection.
//!
//! # Example
//!
//! ```ignore
//! use gitpulse::{AuthorMap, connect_and_migrate, store};
//! use gitpulse::gitlab::GitLabClient;
//! use gitpulse::harvest::{HarvestOptions, HarvestWindow, run_harvest};
//!
//! let db = connect_and_migrate("sqlite://gitpulse.db?mode=rwc").await?;
//! let client = GitLabClient::new("git.example.com", token, timeout, None)?;
//! let window = HarvestWindow::yesterday(chrono::Utc::now(), offset);
//!
//! let output = run_harvest(&client, window, &HarvestOptions::default(), None).await?;
//! let authors = AuthorMap::load_or_empty("authors.toml");
//! let stats = store::persist_commits(&db, &output.commits, &authors).await?;
//! ```

pub mod commit;
pub mod db;
pub mod entity;
pub mod gitlab;
pub mod harvest;
pub mod http;
pub mod mapping;
pub mod platform;
pub mod retry;
pub mod store;

#[cfg(feature = "migrate")]
pub mod migration;

pub use commit::{HarvestedCommit, RawCommit};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use mapping::{AuthorMap, MappingError};
pub use platform::{ApiRateLimiter, PlatformClient, PlatformError};
pub use store::StoreError;
