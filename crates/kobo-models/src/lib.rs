//! Shared data models for the Kobo Twitch server.
//!
//! This crate provides Serde-serializable types for:
//! - Stream run identifiers
//! - Process coordinator status snapshots
//! - Twitch Helix API payloads

pub mod run;
pub mod status;
pub mod twitch;

// Re-export common types
pub use run::RunId;
pub use status::{CoordinatorState, StatusSnapshot};
pub use twitch::{TwitchGame, TwitchStream};
