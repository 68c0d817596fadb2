//! Twitch Helix API client for the Kobo Twitch server.
//!
//! Covers the two read-only calls the directory page needs (category
//! lookup, live stream listing) behind an app access token cached with
//! single-flight refresh.

pub mod client;
pub mod error;
pub mod token;

pub use client::TwitchClient;
pub use error::{TwitchError, TwitchResult};
pub use token::AppTokenCache;
