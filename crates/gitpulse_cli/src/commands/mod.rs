pub(crate) mod harvest;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod report;
