//! Server-rendered pages for the Kobo browser.
//!
//! The Kobo's browser is a stripped-down WebKit on an e-ink panel: no
//! heavy CSS, no external assets, black-on-white only. Both pages are
//! rendered as plain strings; every interpolated value goes through
//! [`escape_html`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Html;
use tracing::warn;

use kobo_models::TwitchStream;
use kobo_twitch::TwitchError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Directory page: live streams in the configured category.
///
/// Missing credentials were warned about at startup; the directory is
/// the one surface that genuinely needs them, so here their absence is
/// a request error rather than a silent empty page.
pub async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let category = state.config.twitch_category.clone();

    let client = state
        .twitch
        .as_ref()
        .ok_or(ApiError::Twitch(TwitchError::MissingCredentials))?;

    let streams = match client.get_streams(&category).await {
        Ok(streams) => streams,
        Err(e) => {
            // Degrade to an empty directory, exactly like the page the
            // viewer would get for a dead category.
            warn!(error = %e, "Failed to fetch streams");
            Vec::new()
        }
    };

    Ok(Html(render_index(&category, &streams)))
}

/// Viewer page. Retargets the stream session in the background so the
/// page itself renders immediately; the frame endpoint picks up frames
/// once ffmpeg is ready.
pub async fn view(
    State(state): State<AppState>,
    Path(streamer): Path<String>,
) -> ApiResult<Html<String>> {
    if !is_valid_streamer_name(&streamer) {
        return Err(ApiError::bad_request("invalid streamer name"));
    }

    let session = Arc::clone(&state.session);
    let target = streamer.clone();
    tokio::spawn(async move {
        if let Err(e) = session.watch(&target).await {
            warn!(streamer = %target, error = %e, "Failed to start watching");
        }
    });

    Ok(Html(render_view(&streamer)))
}

/// Twitch login names: 1-25 chars, alphanumeric or underscore.
pub fn is_valid_streamer_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 25
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Minimal HTML escaping for interpolated text.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_index(category: &str, streams: &[TwitchStream]) -> String {
    let mut items = String::new();
    if streams.is_empty() {
        items.push_str("<li class=\"stream-item\">No streams found or API error.</li>\n");
    } else {
        for stream in streams {
            items.push_str(&format!(
                concat!(
                    "<li class=\"stream-item\"><a href=\"/view/{handle}\">",
                    "<div class=\"stream-title\">{name}</div>",
                    "<div class=\"stream-meta\">{viewers} viewers - {title}</div>",
                    "</a></li>\n"
                ),
                handle = escape_html(stream.handle()),
                name = escape_html(&stream.user_name),
                viewers = stream.viewer_count,
                title = escape_html(&stream.title),
            ));
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Kobo Twitch</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: sans-serif; background: #fff; color: #000; padding: 10px; }}
        h1 {{ font-size: 1.5em; text-align: center; }}
        .stream-list {{ list-style: none; padding: 0; }}
        .stream-item {{ border-bottom: 1px solid #ccc; padding: 10px 0; }}
        .stream-item a {{ text-decoration: none; color: #000; display: block; }}
        .stream-title {{ font-weight: bold; font-size: 1.1em; }}
        .stream-meta {{ font-size: 0.9em; color: #555; }}
        .refresh-btn {{ display: block; width: 100%; padding: 10px; background: #eee; border: 1px solid #000; text-align: center; text-decoration: none; color: #000; margin-bottom: 20px; }}
    </style>
</head>
<body>
    <h1>Twitch: {category}</h1>
    <a href="/" class="refresh-btn">Refresh List</a>
    <ul class="stream-list">
{items}    </ul>
</body>
</html>
"#,
        category = escape_html(category),
        items = items,
    )
}

fn render_view(streamer: &str) -> String {
    let streamer = escape_html(streamer);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{streamer}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ margin: 0; padding: 0; background: #fff; text-align: center; height: 100vh; display: flex; flex-direction: column; }}
        #stream-container {{ flex: 1; display: flex; align-items: center; justify-content: center; overflow: hidden; }}
        img {{ max-width: 100%; max-height: 100%; object-fit: contain; filter: grayscale(100%); }}
        .controls {{ padding: 10px; border-top: 1px solid #000; }}
        a {{ text-decoration: none; color: #000; border: 1px solid #000; padding: 5px 15px; }}
    </style>
    <script>
        function refreshImage() {{
            var img = document.getElementById('stream-frame');
            img.src = '/frame.jpg?t=' + new Date().getTime();
        }}
        setInterval(refreshImage, 1000);

        function handleError() {{
            setTimeout(refreshImage, 2000);
        }}
    </script>
</head>
<body>
    <div id="stream-container">
        <img id="stream-frame" src="/frame.jpg" onerror="handleError()" alt="Stream Loading...">
    </div>
    <div class="controls">
        <a href="/">Back to List</a>
        <span>{streamer}</span>
    </div>
</body>
</html>
"#,
        streamer = streamer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streamer_name_validation() {
        assert!(is_valid_streamer_name("auronplay"));
        assert!(is_valid_streamer_name("some_streamer_123"));
        assert!(!is_valid_streamer_name(""));
        assert!(!is_valid_streamer_name("has space"));
        assert!(!is_valid_streamer_name("../../etc/passwd"));
        assert!(!is_valid_streamer_name(&"a".repeat(26)));
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html(r#"<script>"x"&'y'</script>"#),
            "&lt;script&gt;&quot;x&quot;&amp;&#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn index_renders_streams() {
        let streams = vec![TwitchStream {
            user_name: "Streamer<1>".to_string(),
            user_login: "streamer1".to_string(),
            title: "Playing & chatting".to_string(),
            viewer_count: 42,
        }];
        let html = render_index("Just Chatting", &streams);
        assert!(html.contains("/view/streamer1"));
        assert!(html.contains("Streamer&lt;1&gt;"));
        assert!(html.contains("Playing &amp; chatting"));
        assert!(html.contains("42 viewers"));
    }

    #[test]
    fn index_renders_empty_state() {
        let html = render_index("Just Chatting", &[]);
        assert!(html.contains("No streams found"));
    }

    #[test]
    fn view_embeds_frame_poller() {
        let html = render_view("auronplay");
        assert!(html.contains("/frame.jpg"));
        assert!(html.contains("auronplay"));
    }
}
