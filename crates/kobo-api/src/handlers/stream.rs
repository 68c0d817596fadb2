//! Stream run control endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use kobo_models::StatusSnapshot;

use crate::error::ApiResult;
use crate::state::AppState;

/// Status response: coordinator snapshot plus the session target.
#[derive(Serialize)]
pub struct StreamStatusResponse {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub streamer: Option<String>,
}

/// Current coordinator status. Never blocks on a running transition.
pub async fn stream_status(State(state): State<AppState>) -> Json<StreamStatusResponse> {
    let snapshot = state.coordinator.status().await;
    let streamer = state.session.current_target().await;

    Json(StreamStatusResponse { snapshot, streamer })
}

#[derive(Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Stop the current stream run. 409 when nothing is running.
pub async fn stop_stream(State(state): State<AppState>) -> ApiResult<Json<StopResponse>> {
    state.session.stop().await?;
    Ok(Json(StopResponse { stopped: true }))
}
