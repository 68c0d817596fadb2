//! Coordinator lifecycle tests.
//!
//! These drive the real coordinator against small `/bin/sh` stand-ins for
//! ffmpeg. Each script receives the full ffmpeg argument list; the frame
//! path is always the last argument, which is all the scripts need.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use kobo_media::{CoordinatorConfig, FrameGrabCommand, MediaError, StreamCoordinator};
use kobo_models::CoordinatorState;

/// Stand-in that writes the frame and then behaves like a healthy ffmpeg.
const READY_SCRIPT: &str = r#"#!/bin/sh
for last in "$@"; do :; done
printf 'frame' > "$last"
exec sleep 60
"#;

/// Stand-in that becomes ready and then dies.
const CRASH_SCRIPT: &str = r#"#!/bin/sh
for last in "$@"; do :; done
printf 'frame' > "$last"
sleep 1
exit 3
"#;

/// Stand-in that becomes ready but only survives for a moment.
const QUICK_EXIT_SCRIPT: &str = r#"#!/bin/sh
for last in "$@"; do :; done
printf 'frame' > "$last"
sleep 0.3
exit 3
"#;

/// Stand-in that never produces a frame.
const NEVER_READY_SCRIPT: &str = r#"#!/bin/sh
exec sleep 60
"#;

/// Stand-in that ignores SIGTERM, forcing SIGKILL escalation.
const STUBBORN_SCRIPT: &str = r#"#!/bin/sh
trap '' TERM
for last in "$@"; do :; done
printf 'frame' > "$last"
while :; do sleep 1; done
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn test_config(program: PathBuf) -> CoordinatorConfig {
    CoordinatorConfig {
        ffmpeg_program: program,
        readiness_timeout: Duration::from_secs(5),
        stop_grace: Duration::from_millis(500),
        kill_wait: Duration::from_secs(2),
        poll_interval: Duration::from_millis(50),
        min_restart_interval: Duration::ZERO,
    }
}

fn frame_cmd(dir: &Path) -> FrameGrabCommand {
    FrameGrabCommand::new("https://example.invalid/live.m3u8", dir.join("current.jpg"))
}

/// Poll status until the predicate holds or the deadline passes.
async fn wait_for_state(
    coordinator: &StreamCoordinator,
    wanted: CoordinatorState,
    deadline: Duration,
) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if coordinator.status().await.state == wanted {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[tokio::test]
async fn start_runs_and_stop_returns_to_idle() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "ready.sh", READY_SCRIPT);
    let coordinator = StreamCoordinator::new(test_config(script));

    let run_id = coordinator.start(frame_cmd(dir.path())).await.unwrap();

    let status = coordinator.status().await;
    assert_eq!(status.state, CoordinatorState::Running);
    assert_eq!(status.run_id, Some(run_id));
    assert!(status.started_at.is_some());
    assert!(status.last_error.is_none());

    coordinator.stop().await.unwrap();
    let status = coordinator.status().await;
    assert_eq!(status.state, CoordinatorState::Idle);
    assert!(status.started_at.is_none());
}

#[tokio::test]
async fn second_start_fails_with_already_running() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "ready.sh", READY_SCRIPT);
    let coordinator = StreamCoordinator::new(test_config(script));

    coordinator.start(frame_cmd(dir.path())).await.unwrap();

    let err = coordinator.start(frame_cmd(dir.path())).await.unwrap_err();
    assert!(matches!(err, MediaError::AlreadyRunning));

    coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_starts_admit_exactly_one() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "ready.sh", READY_SCRIPT);
    let coordinator = Arc::new(StreamCoordinator::new(test_config(script)));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let coordinator = Arc::clone(&coordinator);
        let cmd = frame_cmd(dir.path());
        handles.push(tokio::spawn(async move { coordinator.start(cmd).await }));
    }

    let mut oks = 0;
    let mut already_running = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => oks += 1,
            Err(MediaError::AlreadyRunning) => already_running += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(oks, 1);
    assert_eq!(already_running, 3);

    coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn stop_on_idle_fails_and_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "ready.sh", READY_SCRIPT);
    let coordinator = StreamCoordinator::new(test_config(script));

    let err = coordinator.stop().await.unwrap_err();
    assert!(matches!(err, MediaError::NotRunning));

    let status = coordinator.status().await;
    assert_eq!(status.state, CoordinatorState::Idle);
    assert!(status.run_id.is_none());
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn crash_is_detected_and_reported() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "crash.sh", CRASH_SCRIPT);
    let coordinator = StreamCoordinator::new(test_config(script));

    coordinator.start(frame_cmd(dir.path())).await.unwrap();

    assert!(wait_for_state(&coordinator, CoordinatorState::Failed, Duration::from_secs(5)).await);

    let status = coordinator.status().await;
    let last_error = status.last_error.expect("crash must populate last_error");
    assert!(!last_error.is_empty());

    // A dead run cannot be stopped.
    let err = coordinator.stop().await.unwrap_err();
    assert!(matches!(err, MediaError::NotRunning));
    assert_eq!(coordinator.status().await.state, CoordinatorState::Failed);
}

#[tokio::test]
async fn readiness_timeout_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "never.sh", NEVER_READY_SCRIPT);
    let mut config = test_config(script);
    config.readiness_timeout = Duration::from_millis(400);
    let coordinator = StreamCoordinator::new(config);

    let err = coordinator.start(frame_cmd(dir.path())).await.unwrap_err();
    assert!(matches!(err, MediaError::ReadinessTimeout(_)));

    let status = coordinator.status().await;
    assert_eq!(status.state, CoordinatorState::Failed);
    assert!(status.last_error.is_some());
}

#[tokio::test]
async fn stop_during_startup_interrupts_the_wait() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "never.sh", NEVER_READY_SCRIPT);
    let mut config = test_config(script);
    config.readiness_timeout = Duration::from_secs(30);
    let coordinator = Arc::new(StreamCoordinator::new(config));

    let starter = {
        let coordinator = Arc::clone(&coordinator);
        let cmd = frame_cmd(dir.path());
        tokio::spawn(async move { coordinator.start(cmd).await })
    };

    assert!(wait_for_state(&coordinator, CoordinatorState::Starting, Duration::from_secs(2)).await);
    coordinator.stop().await.unwrap();

    let start_result = starter.await.unwrap();
    assert!(matches!(start_result, Err(MediaError::Cancelled)));
    assert_eq!(coordinator.status().await.state, CoordinatorState::Idle);
}

#[tokio::test]
async fn sigterm_resistant_process_is_killed() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "stubborn.sh", STUBBORN_SCRIPT);
    let coordinator = StreamCoordinator::new(test_config(script));

    coordinator.start(frame_cmd(dir.path())).await.unwrap();
    coordinator.stop().await.unwrap();

    assert_eq!(coordinator.status().await.state, CoordinatorState::Idle);
}

#[tokio::test]
async fn restart_produces_a_distinct_run_id() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "ready.sh", READY_SCRIPT);
    let coordinator = StreamCoordinator::new(test_config(script));

    let first = coordinator.start(frame_cmd(dir.path())).await.unwrap();
    coordinator.stop().await.unwrap();

    let second = coordinator.start(frame_cmd(dir.path())).await.unwrap();
    assert_ne!(first, second);

    coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn rapid_restart_is_throttled() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "ready.sh", READY_SCRIPT);
    let mut config = test_config(script);
    config.min_restart_interval = Duration::from_secs(10);
    let coordinator = StreamCoordinator::new(config);

    coordinator.start(frame_cmd(dir.path())).await.unwrap();
    coordinator.stop().await.unwrap();

    let err = coordinator.start(frame_cmd(dir.path())).await.unwrap_err();
    assert!(matches!(err, MediaError::RestartThrottled { .. }));
}

#[tokio::test]
async fn stop_result_agrees_with_final_state() {
    // The child may die in the same poll tick the stop lands. Whichever
    // branch the supervisor takes, a stop that returns Ok must leave the
    // coordinator Idle, never a stale Failed snapshot.
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "quick.sh", QUICK_EXIT_SCRIPT);
    let coordinator = StreamCoordinator::new(test_config(script));

    coordinator.start(frame_cmd(dir.path())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    match coordinator.stop().await {
        Ok(()) => assert_eq!(coordinator.status().await.state, CoordinatorState::Idle),
        Err(MediaError::NotRunning) => {
            // Crash observed before the stop: Failed is the right answer.
            assert_eq!(coordinator.status().await.state, CoordinatorState::Failed);
        }
        Err(other) => panic!("unexpected stop error: {other}"),
    }
}

#[tokio::test]
async fn missing_executable_fails_synchronously() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path().join("no-such-ffmpeg"));
    let coordinator = StreamCoordinator::new(config);

    let err = coordinator.start(frame_cmd(dir.path())).await.unwrap_err();
    assert!(matches!(err, MediaError::FfmpegNotFound));
    assert_eq!(coordinator.status().await.state, CoordinatorState::Idle);
}
