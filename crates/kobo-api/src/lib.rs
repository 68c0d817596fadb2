//! Axum HTTP server for the Kobo e-ink Twitch viewer.
//!
//! This crate provides:
//! - Server-rendered directory and viewer pages
//! - The frame endpoint the viewer page polls every second
//! - Stream run control (status/stop) over the process coordinator
//! - Prometheus metrics and health probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::StreamSession;
pub use state::AppState;
