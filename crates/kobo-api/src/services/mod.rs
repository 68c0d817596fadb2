//! Business logic services.

pub mod stream_session;

pub use stream_session::StreamSession;
