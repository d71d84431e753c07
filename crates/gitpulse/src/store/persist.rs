use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait, sea_query::OnConflict,
};
use serde::Serialize;

use crate::commit::HarvestedCommit;
use crate::entity::commit_record::{ActiveModel, Column, Entity as CommitRecord};
use crate::mapping::AuthorMap;

use super::errors::{Result, StoreError};

/// Rows per INSERT statement. Keeps bound parameters well under SQLite's
/// variable limit.
pub const INSERT_CHUNK_SIZE: usize = 50;

/// Identifiers per `IN (...)` lookup.
const LOOKUP_CHUNK_SIZE: usize = 500;

/// Outcome of persisting one harvest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    /// Commits handed to the store.
    pub received: usize,
    /// Commits skipped because their identifier was already stored.
    pub already_stored: usize,
    /// Rows written.
    pub inserted: u64,
}

/// The subset of `ids` already present in the store.
pub async fn stored_ids(db: &DatabaseConnection, ids: &[&str]) -> Result<HashSet<String>> {
    let mut found = HashSet::new();

    for chunk in ids.chunks(LOOKUP_CHUNK_SIZE) {
        let rows: Vec<String> = CommitRecord::find()
            .select_only()
            .column(Column::CommitId)
            .filter(Column::CommitId.is_in(chunk.iter().copied()))
            .into_tuple()
            .all(db)
            .await?;
        found.extend(rows);
    }

    Ok(found)
}

/// Write a harvest to the store.
///
/// Commits whose identifier is already stored (from an earlier run, or
/// earlier in `commits`) are skipped. Author names pass through `authors`
/// before writing. All inserts run in one transaction.
pub async fn persist_commits(
    db: &DatabaseConnection,
    commits: &[HarvestedCommit],
    authors: &AuthorMap,
) -> Result<PersistStats> {
    let mut stats = PersistStats {
        received: commits.len(),
        ..Default::default()
    };
    if commits.is_empty() {
        return Ok(stats);
    }

    let ids: Vec<&str> = commits.iter().map(|c| c.id.as_str()).collect();
    let mut seen = stored_ids(db, &ids).await?;

    let harvested_at = Utc::now().fixed_offset();
    let mut models = Vec::with_capacity(commits.len());
    for commit in commits {
        if !seen.insert(commit.id.clone()) {
            stats.already_stored += 1;
            continue;
        }
        models.push(to_active_model(commit, authors, harvested_at)?);
    }

    if models.is_empty() {
        tracing::info!(received = stats.received, "All commits already stored");
        return Ok(stats);
    }

    let txn = db.begin().await?;
    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        stats.inserted += CommitRecord::insert_many(chunk.to_vec())
            .on_conflict(
                OnConflict::column(Column::CommitId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    tracing::info!(
        received = stats.received,
        already_stored = stats.already_stored,
        inserted = stats.inserted,
        "Persisted commits"
    );

    Ok(stats)
}

fn to_active_model(
    commit: &HarvestedCommit,
    authors: &AuthorMap,
    harvested_at: chrono::DateTime<chrono::FixedOffset>,
) -> Result<ActiveModel> {
    Ok(ActiveModel {
        commit_id: Set(commit.id.clone()),
        project_id: Set(to_i64(commit.project_id, "project_id", &commit.id)?),
        branch: Set(commit.branch.clone()),
        author_name: Set(authors.map(&commit.author_name).to_string()),
        author_email: Set(commit.author_email.clone()),
        committer_email: Set(commit.committer_email.clone()),
        committed_at: Set(commit.committed_at.with_timezone(&Utc).fixed_offset()),
        additions: Set(to_i64(commit.additions, "additions", &commit.id)?),
        deletions: Set(to_i64(commit.deletions, "deletions", &commit.id)?),
        parent_ids: Set(serde_json::json!(commit.parent_ids)),
        harvested_at: Set(harvested_at),
    })
}

fn to_i64(value: u64, field: &str, commit_id: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        StoreError::invalid_input(format!(
            "commit {commit_id}: {field} {value} is out of range"
        ))
    })
}
