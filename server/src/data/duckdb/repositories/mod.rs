pub mod query;
pub mod span;
