//! CommitRecord entity - one accepted commit, keyed by its content hash.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// CommitRecord model - a harvested commit with its canonical author.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commit_records")]
pub struct Model {
    /// Commit SHA. Unique across the whole server.
    #[sea_orm(primary_key, auto_increment = false)]
    pub commit_id: String,

    // ─── Origin ──────────────────────────────────────────────────────────────
    /// GitLab project ID.
    pub project_id: i64,
    /// First branch the commit was seen on.
    pub branch: String,

    // ─── Authorship ──────────────────────────────────────────────────────────
    /// Canonical author name, after mapping.
    pub author_name: String,
    pub author_email: String,
    pub committer_email: String,
    /// Commit timestamp, normalized to UTC.
    pub committed_at: DateTimeWithTimeZone,

    // ─── Size ────────────────────────────────────────────────────────────────
    pub additions: i64,
    pub deletions: i64,
    /// Parent SHAs (stored as JSON array for cross-database compatibility).
    #[sea_orm(column_type = "Json")]
    pub parent_ids: serde_json::Value,

    /// When this record was written.
    pub harvested_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parent SHAs as strings; malformed entries are skipped.
    pub fn parents(&self) -> Vec<String> {
        self.parent_ids
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn model(parent_ids: serde_json::Value) -> Model {
        let now = Utc::now().fixed_offset();
        Model {
            commit_id: "a1".to_string(),
            project_id: 1,
            branch: "main".to_string(),
            author_name: "Alice".to_string(),
            author_email: "alice@example.com".to_string(),
            committer_email: "alice@example.com".to_string(),
            committed_at: now,
            additions: 1,
            deletions: 0,
            parent_ids,
            harvested_at: now,
        }
    }

    #[test]
    fn test_parents_reads_json_array() {
        assert_eq!(model(json!(["p0", "p1"])).parents(), vec!["p0", "p1"]);
        assert!(model(json!([])).parents().is_empty());
        assert!(model(json!(null)).parents().is_empty());
        assert_eq!(model(json!(["p0", 7])).parents(), vec!["p0"]);
    }
}
