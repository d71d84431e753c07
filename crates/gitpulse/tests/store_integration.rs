//! Integration tests for the commit store.
//!
//! These tests require the `sqlite` and `migrate` features to be enabled
//! and use an in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use chrono::{DateTime, FixedOffset, NaiveDate};
use gitpulse::entity::commit_record::Entity as CommitRecord;
use gitpulse::migration::{Migrator, MigratorTrait};
use gitpulse::store::{self, MAX_TREND_DAYS, StoreError};
use gitpulse::{AuthorMap, HarvestedCommit, connect_and_migrate};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

/// Create an in-memory SQLite database with migrations applied.
async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).expect("valid timestamp")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset")
}

fn commit(id: &str, author: &str, committed_at: &str, additions: u64) -> HarvestedCommit {
    HarvestedCommit {
        id: id.to_string(),
        project_id: 1,
        branch: "main".to_string(),
        author_name: author.to_string(),
        author_email: format!("{}@example.com", author.to_lowercase()),
        committer_email: format!("{}@example.com", author.to_lowercase()),
        committed_at: ts(committed_at),
        additions,
        deletions: 1,
        parent_ids: vec!["p0".to_string()],
    }
}

#[tokio::test]
async fn test_persist_inserts_and_maps_authors() {
    let db = setup_test_db().await;
    let authors = AuthorMap::from_pairs([("alice.w", "Alice Wong")]);

    let commits = vec![
        commit("a1", "alice.w", "2024-01-01T10:00:00+00:00", 10),
        commit("b1", "Bob", "2024-01-01T11:00:00+00:00", 5),
    ];
    let stats = store::persist_commits(&db, &commits, &authors)
        .await
        .expect("persist succeeds");

    assert_eq!(stats.received, 2);
    assert_eq!(stats.already_stored, 0);
    assert_eq!(stats.inserted, 2);

    let stored = CommitRecord::find_by_id("a1".to_string())
        .one(&db)
        .await
        .expect("query succeeds")
        .expect("row exists");
    assert_eq!(stored.author_name, "Alice Wong");
    assert_eq!(stored.author_email, "alice.w@example.com");
    assert_eq!(stored.parents(), vec!["p0"]);
}

#[tokio::test]
async fn test_persist_skips_previously_stored_ids() {
    let db = setup_test_db().await;
    let authors = AuthorMap::default();

    let first = vec![commit("a1", "Alice", "2024-01-01T10:00:00+00:00", 10)];
    store::persist_commits(&db, &first, &authors)
        .await
        .expect("first persist");

    let second = vec![
        commit("a1", "Alice", "2024-01-01T10:00:00+00:00", 10),
        commit("a2", "Alice", "2024-01-02T10:00:00+00:00", 3),
        commit("a2", "Alice", "2024-01-02T10:00:00+00:00", 3),
    ];
    let stats = store::persist_commits(&db, &second, &authors)
        .await
        .expect("second persist");

    assert_eq!(stats.received, 3);
    assert_eq!(stats.already_stored, 2);
    assert_eq!(stats.inserted, 1);
    assert_eq!(CommitRecord::find().count(&db).await.expect("count"), 2);
}

#[tokio::test]
async fn test_persist_empty_batch_is_noop() {
    let db = setup_test_db().await;
    let stats = store::persist_commits(&db, &[], &AuthorMap::default())
        .await
        .expect("persist succeeds");
    assert_eq!(stats, store::PersistStats::default());
}

#[tokio::test]
async fn test_persist_large_batch_spans_chunks() {
    let db = setup_test_db().await;
    let commits: Vec<HarvestedCommit> = (0..store::INSERT_CHUNK_SIZE * 2 + 7)
        .map(|i| commit(&format!("c{i}"), "Alice", "2024-01-01T10:00:00+00:00", 1))
        .collect();

    let stats = store::persist_commits(&db, &commits, &AuthorMap::default())
        .await
        .expect("persist succeeds");

    assert_eq!(stats.inserted as usize, commits.len());
    assert_eq!(
        CommitRecord::find().count(&db).await.expect("count") as usize,
        commits.len()
    );
}

#[tokio::test]
async fn test_author_totals_sorted_by_additions() {
    let db = setup_test_db().await;
    let commits = vec![
        commit("a1", "Alice", "2024-01-01T10:00:00+00:00", 10),
        commit("a2", "Alice", "2024-01-01T12:00:00+00:00", 15),
        commit("b1", "Bob", "2024-01-01T11:00:00+00:00", 40),
        commit("b2", "Bob", "2024-01-03T11:00:00+00:00", 500),
    ];
    store::persist_commits(&db, &commits, &AuthorMap::default())
        .await
        .expect("persist succeeds");

    let (since, until) = store::day_bounds(date(2024, 1, 1), date(2024, 1, 1), utc());
    let totals = store::author_totals(&db, since, until)
        .await
        .expect("query succeeds");

    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].author, "Bob");
    assert_eq!(totals[0].additions, 40);
    assert_eq!(totals[0].commits, 1);
    assert_eq!(totals[1].author, "Alice");
    assert_eq!(totals[1].additions, 25);
    assert_eq!(totals[1].commits, 2);
    assert_eq!(totals[1].deletions, 2);
}

#[tokio::test]
async fn test_author_totals_respects_source_zone() {
    let db = setup_test_db().await;
    // 07:30 on Jan 2 in UTC+8 is Jan 1 in UTC.
    let commits = vec![commit("a1", "Alice", "2024-01-02T07:30:00+08:00", 10)];
    store::persist_commits(&db, &commits, &AuthorMap::default())
        .await
        .expect("persist succeeds");

    let (since, until) = store::day_bounds(date(2024, 1, 1), date(2024, 1, 1), utc());
    let totals = store::author_totals(&db, since, until)
        .await
        .expect("query succeeds");
    assert_eq!(totals.len(), 1);

    let (since, until) = store::day_bounds(date(2024, 1, 2), date(2024, 1, 2), utc());
    assert!(
        store::author_totals(&db, since, until)
            .await
            .expect("query succeeds")
            .is_empty()
    );
}

#[tokio::test]
async fn test_daily_totals_zero_fills_gaps() {
    let db = setup_test_db().await;
    let commits = vec![
        commit("a1", "Alice", "2024-01-01T10:00:00+00:00", 10),
        commit("a2", "Alice", "2024-01-03T10:00:00+00:00", 20),
        commit("b1", "Bob", "2024-01-03T11:00:00+00:00", 99),
    ];
    store::persist_commits(&db, &commits, &AuthorMap::default())
        .await
        .expect("persist succeeds");

    let series = store::daily_totals(&db, Some("Alice"), date(2024, 1, 1), date(2024, 1, 4), utc())
        .await
        .expect("query succeeds");

    let additions: Vec<i64> = series.iter().map(|d| d.additions).collect();
    assert_eq!(additions, vec![10, 0, 20, 0]);
    assert_eq!(series[0].date, date(2024, 1, 1));
    assert_eq!(series[3].date, date(2024, 1, 4));

    let everyone = store::daily_totals(&db, None, date(2024, 1, 3), date(2024, 1, 3), utc())
        .await
        .expect("query succeeds");
    assert_eq!(everyone.len(), 1);
    assert_eq!(everyone[0].commits, 2);
    assert_eq!(everyone[0].additions, 119);
}

#[tokio::test]
async fn test_daily_totals_buckets_in_reference_zone() {
    let db = setup_test_db().await;
    // 20:00 UTC on Jan 1 is Jan 2 in UTC+8.
    let commits = vec![commit("a1", "Alice", "2024-01-01T20:00:00+00:00", 10)];
    store::persist_commits(&db, &commits, &AuthorMap::default())
        .await
        .expect("persist succeeds");

    let shanghai = FixedOffset::east_opt(8 * 3600).expect("offset");
    let series = store::daily_totals(&db, None, date(2024, 1, 1), date(2024, 1, 2), shanghai)
        .await
        .expect("query succeeds");

    assert_eq!(series[0].commits, 0);
    assert_eq!(series[1].commits, 1);
}

#[tokio::test]
async fn test_daily_totals_caps_range() {
    let db = setup_test_db().await;
    let series = store::daily_totals(&db, None, date(2023, 1, 1), date(2024, 1, 1), utc())
        .await
        .expect("query succeeds");

    assert_eq!(series.len() as u64, MAX_TREND_DAYS);
    assert_eq!(series.last().map(|d| d.date), Some(date(2024, 1, 1)));
}

#[tokio::test]
async fn test_daily_totals_rejects_inverted_range() {
    let db = setup_test_db().await;
    let err = store::daily_totals(&db, None, date(2024, 1, 2), date(2024, 1, 1), utc())
        .await
        .expect_err("inverted range");
    assert!(matches!(err, StoreError::InvalidRange { .. }));
}

#[tokio::test]
async fn test_migrations_round_trip() {
    let db = setup_test_db().await;

    Migrator::down(&db, None).await.expect("down succeeds");
    assert!(CommitRecord::find().count(&db).await.is_err());

    Migrator::up(&db, None).await.expect("up succeeds");
    assert_eq!(CommitRecord::find().count(&db).await.expect("count"), 0);
}
