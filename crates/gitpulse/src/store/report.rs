use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::entity::commit_record::{Column, Entity as CommitRecord, Model};
use crate::harvest::HarvestWindow;

use super::errors::{Result, StoreError};

/// Longest daily series [`daily_totals`] returns.
pub const MAX_TREND_DAYS: u64 = 180;

/// Per-author totals over a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorTotals {
    pub author: String,
    pub commits: u64,
    pub additions: i64,
    pub deletions: i64,
}

/// Totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub commits: u64,
    pub additions: i64,
    pub deletions: i64,
}

/// UTC bounds `[start, end)` covering the days `from..=to` in `offset`.
#[must_use]
pub fn day_bounds(
    from: NaiveDate,
    to: NaiveDate,
    offset: FixedOffset,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start = HarvestWindow::for_day(from, offset).start;
    let end = HarvestWindow::for_day(to, offset).start + chrono::Duration::days(1);
    (
        start.with_timezone(&Utc).fixed_offset(),
        end.with_timezone(&Utc).fixed_offset(),
    )
}

async fn records_between(
    db: &DatabaseConnection,
    since: DateTime<FixedOffset>,
    until: DateTime<FixedOffset>,
    author: Option<&str>,
) -> Result<Vec<Model>> {
    let mut query = CommitRecord::find()
        .filter(Column::CommittedAt.gte(since.with_timezone(&Utc).fixed_offset()))
        .filter(Column::CommittedAt.lt(until.with_timezone(&Utc).fixed_offset()));

    if let Some(author) = author {
        query = query.filter(Column::AuthorName.eq(author));
    }

    Ok(query.order_by_asc(Column::CommittedAt).all(db).await?)
}

/// Totals per author for commits in `[since, until)`, largest
/// additions first.
pub async fn author_totals(
    db: &DatabaseConnection,
    since: DateTime<FixedOffset>,
    until: DateTime<FixedOffset>,
) -> Result<Vec<AuthorTotals>> {
    let records = records_between(db, since, until, None).await?;

    let mut by_author: HashMap<String, AuthorTotals> = HashMap::new();
    for record in records {
        let totals = by_author
            .entry(record.author_name.clone())
            .or_insert_with(|| AuthorTotals {
                author: record.author_name.clone(),
                ..Default::default()
            });
        totals.commits += 1;
        totals.additions += record.additions;
        totals.deletions += record.deletions;
    }

    let mut totals: Vec<AuthorTotals> = by_author.into_values().collect();
    totals.sort_by(|a, b| {
        b.additions
            .cmp(&a.additions)
            .then_with(|| a.author.cmp(&b.author))
    });
    Ok(totals)
}

/// A zero-filled daily series for `from..=to`, bucketed by calendar day
/// in `offset`, optionally for one author.
///
/// Ranges longer than [`MAX_TREND_DAYS`] keep their most recent days.
pub async fn daily_totals(
    db: &DatabaseConnection,
    author: Option<&str>,
    from: NaiveDate,
    to: NaiveDate,
    offset: FixedOffset,
) -> Result<Vec<DailyTotal>> {
    if to < from {
        return Err(StoreError::InvalidRange { from, to });
    }

    let earliest = to
        .checked_sub_days(Days::new(MAX_TREND_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);
    let from = if from < earliest {
        tracing::debug!(%from, %earliest, "Trend range capped at {MAX_TREND_DAYS} days");
        earliest
    } else {
        from
    };

    let mut days: BTreeMap<NaiveDate, DailyTotal> = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|date| {
            (
                date,
                DailyTotal {
                    date,
                    commits: 0,
                    additions: 0,
                    deletions: 0,
                },
            )
        })
        .collect();

    let (since, until) = day_bounds(from, to, offset);
    for record in records_between(db, since, until, author).await? {
        let day = record.committed_at.with_timezone(&offset).date_naive();
        if let Some(total) = days.get_mut(&day) {
            total.commits += 1;
            total.additions += record.additions;
            total.deletions += record.deletions;
        }
    }

    Ok(days.into_values().collect())
}
