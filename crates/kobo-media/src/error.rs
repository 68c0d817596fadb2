//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while coordinating the external media process.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("streamlink not found in PATH")]
    StreamlinkNotFound,

    #[error("a stream run is already active")]
    AlreadyRunning,

    #[error("no stream run is active")]
    NotRunning,

    #[error("restart throttled, retry in {wait_secs} seconds")]
    RestartThrottled { wait_secs: u64 },

    #[error("failed to spawn external process: {message}")]
    SpawnFailure { message: String },

    #[error("process produced no frame within {0} seconds")]
    ReadinessTimeout(u64),

    #[error("process exited unexpectedly ({detail})")]
    UnexpectedExit {
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("process did not terminate within the shutdown bound")]
    ShutdownTimeout,

    #[error("start interrupted by a concurrent stop")]
    Cancelled,

    #[error("no playable stream found for {streamer}")]
    NoPlayableStream { streamer: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a spawn failure error.
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self::SpawnFailure {
            message: message.into(),
        }
    }

    /// Create an unexpected exit error from a process exit status.
    pub fn unexpected_exit(status: std::process::ExitStatus) -> Self {
        Self::UnexpectedExit {
            exit_code: status.code(),
            detail: status.to_string(),
        }
    }

    /// Create a no-playable-stream error.
    pub fn no_playable_stream(streamer: impl Into<String>) -> Self {
        Self::NoPlayableStream {
            streamer: streamer.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error describes a caller mistake rather than a
    /// process failure (start on a busy coordinator, stop on an idle one).
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning | Self::NotRunning | Self::RestartThrottled { .. }
        )
    }
}
