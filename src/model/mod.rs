pub mod query;
pub mod task;
