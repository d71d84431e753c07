use chrono::{Days, FixedOffset, NaiveDate, Utc};
use clap::ValueEnum;
use gitpulse::store::{self, AuthorTotals, DailyTotal};
use sea_orm::DatabaseConnection;
use tabled::{Table, Tabled, settings::Style};

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// What the report covers.
#[derive(Debug, Clone)]
pub(crate) struct ReportRequest {
    pub days: u64,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub author: Option<String>,
    pub daily: bool,
    pub output: OutputFormat,
}

#[derive(Debug, Tabled)]
struct AuthorRow {
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Commits")]
    commits: u64,
    #[tabled(rename = "Additions")]
    additions: i64,
    #[tabled(rename = "Deletions")]
    deletions: i64,
}

impl From<&AuthorTotals> for AuthorRow {
    fn from(t: &AuthorTotals) -> Self {
        Self {
            author: t.author.clone(),
            commits: t.commits,
            additions: t.additions,
            deletions: t.deletions,
        }
    }
}

#[derive(Debug, Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Commits")]
    commits: u64,
    #[tabled(rename = "Additions")]
    additions: i64,
    #[tabled(rename = "Deletions")]
    deletions: i64,
}

impl From<&DailyTotal> for DayRow {
    fn from(d: &DailyTotal) -> Self {
        Self {
            date: d.date,
            commits: d.commits,
            additions: d.additions,
            deletions: d.deletions,
        }
    }
}

/// Resolve the inclusive day range a report covers.
///
/// Explicit bounds win. Otherwise the range is the `days` days ending
/// yesterday, the most recent fully harvested day.
fn resolve_range(
    days: u64,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), String> {
    let until = match until {
        Some(until) => until,
        None => today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| "date out of range".to_string())?,
    };
    let since = match since {
        Some(since) => since,
        None => until
            .checked_sub_days(Days::new(days.max(1) - 1))
            .ok_or_else(|| "date out of range".to_string())?,
    };
    if since > until {
        return Err(format!("--since {} is after --until {}", since, until));
    }
    Ok((since, until))
}

pub(crate) async fn handle_report(
    request: ReportRequest,
    offset: FixedOffset,
    db: &DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = Utc::now().with_timezone(&offset).date_naive();
    let (from, to) = resolve_range(request.days, request.since, request.until, today)?;
    tracing::debug!(%from, %to, author = ?request.author, "Building report");

    if request.daily {
        let series = store::daily_totals(db, request.author.as_deref(), from, to, offset).await?;
        match request.output {
            OutputFormat::Table => {
                let rows: Vec<DayRow> = series.iter().map(DayRow::from).collect();
                let mut table = Table::new(rows);
                table.with(Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&series)?);
            }
        }
        return Ok(());
    }

    let (since, until) = store::day_bounds(from, to, offset);
    let mut totals = store::author_totals(db, since, until).await?;
    if let Some(ref author) = request.author {
        totals.retain(|t| &t.author == author);
    }

    match request.output {
        OutputFormat::Table => {
            if totals.is_empty() {
                println!("No commits between {} and {}.", from, to);
                return Ok(());
            }
            println!("Commits from {} to {}:", from, to);
            let rows: Vec<AuthorRow> = totals.iter().map(AuthorRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_default_range_ends_yesterday() {
        let (from, to) = resolve_range(7, None, None, date(2024, 3, 10)).unwrap();
        assert_eq!(to, date(2024, 3, 9));
        assert_eq!(from, date(2024, 3, 3));
    }

    #[test]
    fn test_single_day_range() {
        let (from, to) = resolve_range(1, None, None, date(2024, 3, 10)).unwrap();
        assert_eq!(from, to);
        assert_eq!(to, date(2024, 3, 9));
    }

    #[test]
    fn test_explicit_bounds_win() {
        let (from, to) = resolve_range(
            7,
            Some(date(2024, 1, 1)),
            Some(date(2024, 1, 31)),
            date(2024, 3, 10),
        )
        .unwrap();
        assert_eq!(from, date(2024, 1, 1));
        assert_eq!(to, date(2024, 1, 31));
    }

    #[test]
    fn test_until_alone_counts_back_days() {
        let (from, to) = resolve_range(3, None, Some(date(2024, 1, 31)), date(2024, 3, 10)).unwrap();
        assert_eq!(from, date(2024, 1, 29));
        assert_eq!(to, date(2024, 1, 31));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = resolve_range(
            7,
            Some(date(2024, 2, 1)),
            Some(date(2024, 1, 1)),
            date(2024, 3, 10),
        )
        .unwrap_err();
        assert!(err.contains("--since"));
    }

    #[test]
    fn test_author_row_from_totals() {
        let row = AuthorRow::from(&AuthorTotals {
            author: "Alice".to_string(),
            commits: 2,
            additions: 30,
            deletions: 4,
        });
        assert_eq!(row.author, "Alice");
        assert_eq!(row.additions, 30);
    }
}
