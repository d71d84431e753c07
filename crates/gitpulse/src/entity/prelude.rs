//! Common re-exports for convenient entity usage.

pub use super::commit_record::{
    ActiveModel as CommitRecordActiveModel, Column as CommitRecordColumn, Entity as CommitRecord,
    Model as CommitRecordModel,
};
