//! Commit storage: the persistence sink for harvesting runs and the
//! reporting queries over stored commits.

mod errors;
mod persist;
mod report;

pub use errors::{Result, StoreError};
pub use persist::{INSERT_CHUNK_SIZE, PersistStats, persist_commits, stored_ids};
pub use report::{
    AuthorTotals, DailyTotal, MAX_TREND_DAYS, author_totals, daily_totals, day_bounds,
};
