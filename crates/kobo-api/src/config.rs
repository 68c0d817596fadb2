//! API configuration.

use std::time::Duration;

use kobo_media::{CoordinatorConfig, DEFAULT_FRAME_WIDTH, DEFAULT_JPEG_QSCALE};

/// Default frame file, rewritten in place by ffmpeg.
pub const DEFAULT_FRAME_PATH: &str = "current.jpg";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Twitch app client id (absent: directory page is unavailable)
    pub twitch_client_id: Option<String>,
    /// Twitch app client secret
    pub twitch_secret: Option<String>,
    /// Category shown on the directory page
    pub twitch_category: String,
    /// Preferred streamlink quality
    pub stream_quality: String,
    /// Frame width passed to ffmpeg; 0 disables scaling
    pub frame_width: u32,
    /// mjpeg qscale passed to ffmpeg
    pub frame_jpeg_qscale: u32,
    /// Path of the continuously rewritten frame file
    pub frame_path: String,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Process coordinator timing knobs
    pub coordinator: CoordinatorConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            twitch_client_id: None,
            twitch_secret: None,
            twitch_category: "Just Chatting".to_string(),
            stream_quality: "best".to_string(),
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_jpeg_qscale: DEFAULT_JPEG_QSCALE,
            frame_path: DEFAULT_FRAME_PATH.to_string(),
            max_body_size: 64 * 1024,
            environment: "development".to_string(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut coordinator = CoordinatorConfig::default();
        if let Some(secs) = env_parse::<u64>("READINESS_TIMEOUT_SECS") {
            coordinator.readiness_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("STOP_GRACE_SECS") {
            coordinator.stop_grace = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("MIN_RESTART_INTERVAL_SECS") {
            coordinator.min_restart_interval = Duration::from_secs(secs);
        }

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            twitch_client_id: env_nonempty("TWITCH_CLIENT_ID"),
            twitch_secret: env_nonempty("TWITCH_SECRET"),
            twitch_category: std::env::var("TWITCH_CATEGORY").unwrap_or(defaults.twitch_category),
            stream_quality: std::env::var("TWITCH_STREAM_QUALITY")
                .unwrap_or(defaults.stream_quality),
            frame_width: env_parse("FRAME_WIDTH").unwrap_or(defaults.frame_width),
            frame_jpeg_qscale: env_parse("FRAME_JPEG_QSCALE")
                .unwrap_or(defaults.frame_jpeg_qscale),
            frame_path: std::env::var("FRAME_PATH").unwrap_or(defaults.frame_path),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            coordinator,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Whether Twitch credentials are configured.
    pub fn has_twitch_credentials(&self) -> bool {
        self.twitch_client_id.is_some() && self.twitch_secret.is_some()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}
