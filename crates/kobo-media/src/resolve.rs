//! Stream URL resolution using the streamlink CLI.
//!
//! Twitch does not expose raw HLS URLs; streamlink does the playlist
//! negotiation for us. We only ever ask it for the URL (`--stream-url`)
//! and hand the result to ffmpeg.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Quality names tried after the preferred one, best-first. Readability on
/// e-ink degrades fast below 480p.
const QUALITY_FALLBACKS: &[&str] = &["best", "720p", "480p", "worst"];

/// Build the comma-separated quality priority list streamlink accepts,
/// preferred quality first, without duplicates.
pub fn quality_priority(preferred: &str) -> String {
    let mut chain: Vec<&str> = Vec::with_capacity(QUALITY_FALLBACKS.len() + 1);
    let preferred = preferred.trim();
    if !preferred.is_empty() {
        chain.push(preferred);
    }
    for &q in QUALITY_FALLBACKS {
        if !chain.contains(&q) {
            chain.push(q);
        }
    }
    chain.join(",")
}

/// Resolve the playable stream URL for a Twitch streamer.
///
/// Shells out to `streamlink --stream-url twitch.tv/<name> <qualities>`.
/// Returns `NoPlayableStream` when the streamer is offline or no listed
/// quality is available.
pub async fn resolve_stream_url(streamer: &str, preferred_quality: &str) -> MediaResult<String> {
    which::which("streamlink").map_err(|_| MediaError::StreamlinkNotFound)?;

    let target = format!("twitch.tv/{streamer}");
    let qualities = quality_priority(preferred_quality);
    debug!(streamer, %qualities, "Resolving stream URL via streamlink");

    let output = Command::new("streamlink")
        .arg("--stream-url")
        .arg(&target)
        .arg(&qualities)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            streamer,
            status = %output.status,
            stderr = %stderr.trim(),
            "streamlink failed"
        );
        return Err(MediaError::no_playable_stream(streamer));
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        return Err(MediaError::no_playable_stream(streamer));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_priority_default() {
        assert_eq!(quality_priority("best"), "best,720p,480p,worst");
    }

    #[test]
    fn test_quality_priority_custom_first() {
        assert_eq!(quality_priority("1080p"), "1080p,best,720p,480p,worst");
    }

    #[test]
    fn test_quality_priority_dedups_fallback() {
        assert_eq!(quality_priority("720p"), "720p,best,480p,worst");
    }

    #[test]
    fn test_quality_priority_empty_preferred() {
        assert_eq!(quality_priority("  "), "best,720p,480p,worst");
    }
}
