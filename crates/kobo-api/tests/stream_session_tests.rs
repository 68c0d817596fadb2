//! Stream session lifecycle tests.
//!
//! The session shells out to `streamlink` by name, so these tests prepend
//! a directory with a controllable stand-in to PATH. They live in their
//! own test binary to keep that PATH mutation away from the router tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use kobo_api::{ApiConfig, AppState};
use kobo_media::MediaError;
use kobo_models::CoordinatorState;

/// ffmpeg stand-in: writes the frame (last argument) and keeps running.
const FFMPEG_SCRIPT: &str = r#"#!/bin/sh
for last in "$@"; do :; done
printf 'frame' > "$last"
exec sleep 60
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// streamlink stand-in that succeeds only once the marker file exists,
/// so a test can flip a streamer from offline to live.
fn install_streamlink(dir: &Path, marker: &Path) {
    let body = format!(
        "#!/bin/sh\n\
         if [ -e \"{}\" ]; then echo 'http://127.0.0.1:9/live.m3u8'; exit 0; fi\n\
         exit 1\n",
        marker.display()
    );
    write_script(dir, "streamlink", &body);
    let path = std::env::var("PATH").unwrap_or_default();
    std::env::set_var("PATH", format!("{}:{}", dir.display(), path));
}

fn test_state(dir: &TempDir) -> AppState {
    let mut config = ApiConfig::default();
    config.frame_path = dir
        .path()
        .join("current.jpg")
        .to_string_lossy()
        .to_string();
    config.coordinator.ffmpeg_program = write_script(dir.path(), "ffmpeg.sh", FFMPEG_SCRIPT);
    config.coordinator.poll_interval = Duration::from_millis(50);
    config.coordinator.readiness_timeout = Duration::from_secs(5);
    config.coordinator.min_restart_interval = Duration::ZERO;
    AppState::new(config)
}

#[tokio::test]
async fn frame_poll_revives_after_failed_start() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("online");
    install_streamlink(dir.path(), &marker);
    let state = test_state(&dir);

    // Streamer offline: watch fails but the target must survive.
    let err = state.session.watch("somestreamer").await.unwrap_err();
    assert!(matches!(err, MediaError::NoPlayableStream { .. }));
    assert_eq!(
        state.session.current_target().await.as_deref(),
        Some("somestreamer")
    );
    assert_eq!(
        state.coordinator.status().await.state,
        CoordinatorState::Idle
    );

    // Streamer comes online; the next frame poll brings the run up.
    std::fs::write(&marker, b"").unwrap();
    state.session.ensure_alive().await;

    assert_eq!(
        state.coordinator.status().await.state,
        CoordinatorState::Running
    );

    state.session.stop().await.unwrap();
}

#[tokio::test]
async fn ensure_alive_is_a_noop_without_target() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir);

    state.session.ensure_alive().await;

    assert_eq!(
        state.coordinator.status().await.state,
        CoordinatorState::Idle
    );
    assert!(state.session.current_target().await.is_none());
}
