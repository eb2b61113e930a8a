//! HTTP/JSON adapter over the span store

pub mod extractors;
pub mod middleware;
pub mod routes;
mod server;
pub mod types;

pub use routes::AppState;
pub use server::{ApiServer, build_router};
