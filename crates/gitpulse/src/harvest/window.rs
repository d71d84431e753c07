//! The calendar day a harvesting run covers.

use std::fmt;

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// One calendar day in a reference time zone.
///
/// `start` is local midnight and `end` is `23:59:59` of the same day. Both
/// ends are inclusive at second precision; [`contains`](Self::contains)
/// also accepts sub-second timestamps within the last second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl HarvestWindow {
    /// The window covering `date` in `offset`.
    #[must_use]
    pub fn for_day(date: NaiveDate, offset: FixedOffset) -> Self {
        let naive_midnight = date.and_time(NaiveTime::MIN);
        let start = DateTime::from_naive_utc_and_offset(
            naive_midnight - Duration::seconds(i64::from(offset.local_minus_utc())),
            offset,
        );
        let end = start + Duration::days(1) - Duration::seconds(1);
        Self { start, end }
    }

    /// The full calendar day before `now`, in `offset`.
    #[must_use]
    pub fn yesterday<Tz: TimeZone>(now: DateTime<Tz>, offset: FixedOffset) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        let date = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        Self::for_day(date, offset)
    }

    /// The calendar day this window covers.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// The reference zone.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        *self.start.offset()
    }

    /// Whether `ts` falls on this day, whatever zone it was recorded in.
    #[must_use]
    pub fn contains<Tz: TimeZone>(&self, ts: &DateTime<Tz>) -> bool {
        let ts = ts.with_timezone(&Utc);
        ts >= self.start && ts < self.start + Duration::days(1)
    }
}

impl fmt::Display for HarvestWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d %H:%M:%S %:z"),
            self.end.format("%Y-%m-%d %H:%M:%S %:z")
        )
    }
}

/// Build a fixed offset from whole hours east of UTC.
///
/// Returns `None` outside `-23..=23`.
#[must_use]
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
}
