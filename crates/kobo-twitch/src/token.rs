//! App access token caching for the Helix API.
//!
//! Thread-safe, async-aware token cache with:
//! - Refresh margin to avoid token expiry mid-request
//! - Single-flight pattern so concurrent callers trigger one refresh

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{TwitchError, TwitchResult};

/// OAuth client-credentials endpoint.
const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Refresh margin: refresh the token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Cached token with expiration tracking.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Check if the token is still valid with the refresh margin applied.
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Thread-safe app-token cache with single-flight refresh.
pub struct AppTokenCache {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    cache: RwLock<Option<CachedToken>>,
}

impl AppTokenCache {
    /// Create a new token cache for the given app credentials.
    pub fn new(http: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token, forcing a refresh on the next call.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// Fast path: return the cached token under the read lock. Slow path:
    /// acquire the write lock, double-check (another task may have
    /// refreshed while we waited), then fetch a fresh token.
    pub async fn get_token(&self) -> TwitchResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        debug!("Refreshing Twitch app access token");
        let response = self
            .http
            .post(TOKEN_URL)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TwitchError::token(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token.access_token.clone();
        *cache = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_valid() {
        let token = CachedToken {
            access_token: "abc".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(token.is_valid());
    }

    #[test]
    fn token_inside_refresh_margin_is_invalid() {
        let token = CachedToken {
            access_token: "abc".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!token.is_valid());
    }

    #[test]
    fn token_response_deserializes() {
        let json = r#"{"access_token":"abcdef","expires_in":5011271,"token_type":"bearer"}"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "abcdef");
        assert_eq!(parsed.expires_in, 5011271);
    }
}
