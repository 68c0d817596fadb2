//! External-process plumbing for the Kobo Twitch server.
//!
//! This crate provides:
//! - [`StreamCoordinator`]: the single-instance owner of the ffmpeg
//!   frame-grab process (start/stop/status, crash detection)
//! - [`FrameGrabCommand`]: builder for the e-ink frame-grab invocation
//! - [`resolve_stream_url`]: streamlink-backed Twitch URL resolution
//!
//! The coordinator is deliberately process-local: the service runs as
//! exactly one instance, so no cross-process coordination exists here.

pub mod command;
pub mod coordinator;
pub mod error;
pub mod resolve;

pub use command::{
    check_ffmpeg, check_streamlink, FrameGrabCommand, DEFAULT_FRAME_WIDTH, DEFAULT_JPEG_QSCALE,
};
pub use coordinator::{CoordinatorConfig, StreamCoordinator};
pub use error::{MediaError, MediaResult};
pub use resolve::{quality_priority, resolve_stream_url};
