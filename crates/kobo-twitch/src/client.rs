//! Helix API client.

use serde::Deserialize;
use tracing::{debug, warn};

use kobo_models::{TwitchGame, TwitchStream};

use crate::error::{TwitchError, TwitchResult};
use crate::token::AppTokenCache;

const HELIX_GAMES_URL: &str = "https://api.twitch.tv/helix/games";
const HELIX_STREAMS_URL: &str = "https://api.twitch.tv/helix/streams";

/// How many streams the directory page asks for.
const STREAMS_PAGE_SIZE: u32 = 20;

/// Helix response envelope: every endpoint wraps its payload in `data`.
#[derive(Deserialize)]
struct HelixEnvelope<T> {
    data: Vec<T>,
}

/// Twitch Helix API client with cached app credentials.
pub struct TwitchClient {
    http: reqwest::Client,
    client_id: String,
    token: AppTokenCache,
}

impl TwitchClient {
    /// Create a client from app credentials. Returns `MissingCredentials`
    /// when either value is absent, so callers can decide how loudly to
    /// complain (startup warns, request handlers error).
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> TwitchResult<Self> {
        let (client_id, client_secret) = match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => return Err(TwitchError::MissingCredentials),
        };

        let http = reqwest::Client::new();
        let token = AppTokenCache::new(http.clone(), client_id.clone(), client_secret);

        Ok(Self {
            http,
            client_id,
            token,
        })
    }

    /// Look up the Helix game id for a category name.
    pub async fn get_game_id(&self, game_name: &str) -> TwitchResult<Option<String>> {
        let token = self.token.get_token().await?;

        let response = self
            .http
            .get(HELIX_GAMES_URL)
            .header("Client-ID", &self.client_id)
            .bearer_auth(&token)
            .query(&[("name", game_name)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked server-side; next call starts fresh.
            self.token.invalidate().await;
        }
        if !response.status().is_success() {
            return Err(TwitchError::Api {
                status: response.status().as_u16(),
            });
        }

        let envelope: HelixEnvelope<TwitchGame> = response.json().await?;
        Ok(envelope.data.into_iter().next().map(|game| game.id))
    }

    /// List live streams for a category, most-viewed first.
    ///
    /// An unknown category resolves to an empty list rather than an error;
    /// the directory page renders that as "no streams found".
    pub async fn get_streams(&self, game_name: &str) -> TwitchResult<Vec<TwitchStream>> {
        let game_id = match self.get_game_id(game_name).await? {
            Some(id) => id,
            None => {
                warn!(category = game_name, "Twitch category not found");
                return Ok(Vec::new());
            }
        };

        let token = self.token.get_token().await?;
        debug!(category = game_name, game_id, "Fetching live streams");

        let response = self
            .http
            .get(HELIX_STREAMS_URL)
            .header("Client-ID", &self.client_id)
            .bearer_auth(&token)
            .query(&[
                ("game_id", game_id.as_str()),
                ("first", &STREAMS_PAGE_SIZE.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TwitchError::Api {
                status: response.status().as_u16(),
            });
        }

        let envelope: HelixEnvelope<TwitchStream> = response.json().await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_rejected() {
        assert!(matches!(
            TwitchClient::new(None, Some("secret".to_string())),
            Err(TwitchError::MissingCredentials)
        ));
        assert!(matches!(
            TwitchClient::new(Some(String::new()), Some("secret".to_string())),
            Err(TwitchError::MissingCredentials)
        ));
    }

    #[test]
    fn helix_envelope_deserializes_games() {
        let json = r#"{"data":[{"id":"509658","name":"Just Chatting","box_art_url":""}]}"#;
        let envelope: HelixEnvelope<TwitchGame> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data[0].id, "509658");
        assert_eq!(envelope.data[0].name, "Just Chatting");
    }

    #[test]
    fn helix_envelope_deserializes_empty() {
        let json = r#"{"data":[]}"#;
        let envelope: HelixEnvelope<TwitchStream> = serde_json::from_str(json).unwrap();
        assert!(envelope.data.is_empty());
    }
}
