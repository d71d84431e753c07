//! SeaORM entity definitions for the gitpulse database schema.

pub mod commit_record;
pub mod prelude;
