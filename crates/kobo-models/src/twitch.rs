//! Twitch Helix API payloads.
//!
//! Only the fields the directory page renders are modeled; Helix returns
//! more, and serde ignores the rest.

use serde::{Deserialize, Serialize};

/// A game/category as returned by `helix/games`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchGame {
    pub id: String,
    pub name: String,
}

/// A live stream as returned by `helix/streams`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchStream {
    /// Display name, shown in the directory and used for `/view/:streamer`
    pub user_name: String,
    /// Login name, the stable handle for `twitch.tv/<login>` URLs
    #[serde(default)]
    pub user_login: String,
    pub title: String,
    pub viewer_count: u64,
}

impl TwitchStream {
    /// Handle to pass to streamlink: login when present, display name
    /// otherwise (they differ only in case for ASCII names).
    pub fn handle(&self) -> &str {
        if self.user_login.is_empty() {
            &self.user_name
        } else {
            &self.user_login
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_helix_stream() {
        let json = r#"{
            "id": "41375541868",
            "user_id": "459331509",
            "user_login": "auronplay",
            "user_name": "auronplay",
            "game_id": "494131",
            "title": "hablamos y le damos a Little Nightmares 1",
            "viewer_count": 78365,
            "started_at": "2021-03-10T15:04:21Z"
        }"#;
        let stream: TwitchStream = serde_json::from_str(json).unwrap();
        assert_eq!(stream.user_name, "auronplay");
        assert_eq!(stream.viewer_count, 78365);
        assert_eq!(stream.handle(), "auronplay");
    }

    #[test]
    fn handle_falls_back_to_display_name() {
        let stream = TwitchStream {
            user_name: "SomeStreamer".to_string(),
            user_login: String::new(),
            title: String::new(),
            viewer_count: 0,
        };
        assert_eq!(stream.handle(), "SomeStreamer");
    }
}
