//! Frame serving.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::metrics;
use crate::state::AppState;

/// Serve the current frame.
///
/// Each request doubles as a liveness nudge: if the session still has a
/// target but its run died, a revival is scheduled in the background
/// (rate limited by the coordinator's restart throttle). The viewer page
/// keeps polling either way.
pub async fn frame(State(state): State<AppState>) -> Response {
    let session = Arc::clone(&state.session);
    tokio::spawn(async move {
        session.ensure_alive().await;
    });

    match tokio::fs::read(state.session.frame_path()).await {
        Ok(bytes) => {
            metrics::record_frame_request(true);
            (
                [
                    (header::CONTENT_TYPE, "image/jpeg"),
                    // The Kobo browser caches aggressively; force fresh fetches.
                    (
                        header::CACHE_CONTROL,
                        "no-store, no-cache, must-revalidate, max-age=0",
                    ),
                    (header::PRAGMA, "no-cache"),
                    (header::EXPIRES, "0"),
                ],
                bytes,
            )
                .into_response()
        }
        Err(_) => {
            metrics::record_frame_request(false);
            // 404 triggers the viewer page's onerror retry path.
            (StatusCode::NOT_FOUND, "Loading...").into_response()
        }
    }
}
