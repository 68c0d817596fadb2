//! Application state.

use std::sync::Arc;

use tracing::warn;

use kobo_media::StreamCoordinator;
use kobo_twitch::TwitchClient;

use crate::config::ApiConfig;
use crate::services::StreamSession;

/// Shared application state.
///
/// The coordinator is the single owner of the external ffmpeg process;
/// handlers reach it only through this state (no ambient globals).
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub coordinator: Arc<StreamCoordinator>,
    pub twitch: Option<Arc<TwitchClient>>,
    pub session: Arc<StreamSession>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Self {
        let coordinator = Arc::new(StreamCoordinator::new(config.coordinator.clone()));

        let twitch = match TwitchClient::new(
            config.twitch_client_id.clone(),
            config.twitch_secret.clone(),
        ) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Twitch directory disabled: {e}");
                None
            }
        };

        let session = Arc::new(StreamSession::new(Arc::clone(&coordinator), &config));

        Self {
            config,
            coordinator,
            twitch,
            session,
        }
    }
}
