//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;
pub mod storage;

pub use crate::app::CoreApp;
pub use cli::CliConfig;
pub use config::AppConfig;
pub use shutdown::ShutdownService;
pub use storage::{AppStorage, DataSubdir};
