//! Shared helpers

pub mod file;
pub mod json;
pub mod time;
