//! termcache API - HTTP Surface
//!
//! Serves the cached term snapshot over HTTP (axum) and fetches upstream
//! pages over HTTP (reqwest).

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upstream;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_router;
pub use state::AppState;
pub use upstream::HttpTermSource;
