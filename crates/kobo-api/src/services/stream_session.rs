//! Stream session service.
//!
//! Tracks which streamer the viewer is currently watching and drives the
//! coordinator accordingly: resolve the stream URL, build the frame-grab
//! command, start/stop runs, and revive a run that died while the viewer
//! is still on the page. Session operations are serialized so a revive
//! and a target switch cannot interleave.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use kobo_media::{
    resolve_stream_url, FrameGrabCommand, MediaError, MediaResult, StreamCoordinator,
};
use kobo_models::RunId;

use crate::config::ApiConfig;
use crate::metrics;

/// Session state for the single viewer target.
pub struct StreamSession {
    coordinator: Arc<StreamCoordinator>,
    quality: String,
    frame_width: u32,
    frame_jpeg_qscale: u32,
    frame_path: PathBuf,
    /// Streamer the viewer last asked for; survives run failures so the
    /// frame endpoint can revive the stream.
    target: RwLock<Option<String>>,
    /// Serializes watch/revive/stop against each other
    op_lock: Mutex<()>,
}

impl StreamSession {
    /// Create a session bound to the coordinator.
    pub fn new(coordinator: Arc<StreamCoordinator>, config: &ApiConfig) -> Self {
        Self {
            coordinator,
            quality: config.stream_quality.clone(),
            frame_width: config.frame_width,
            frame_jpeg_qscale: config.frame_jpeg_qscale,
            frame_path: PathBuf::from(&config.frame_path),
            target: RwLock::new(None),
            op_lock: Mutex::new(()),
        }
    }

    /// The streamer currently targeted, if any.
    pub async fn current_target(&self) -> Option<String> {
        self.target.read().await.clone()
    }

    /// Path of the frame file the viewer page polls.
    pub fn frame_path(&self) -> &PathBuf {
        &self.frame_path
    }

    /// Point the session at a streamer, (re)starting the frame grab.
    ///
    /// A no-op when that streamer's run is already starting or running.
    /// Switching targets stops the previous run first.
    pub async fn watch(&self, streamer: &str) -> MediaResult<Option<RunId>> {
        let _guard = self.op_lock.lock().await;

        let state = self.coordinator.status().await.state;
        {
            let target = self.target.read().await;
            if target.as_deref() == Some(streamer) && state.is_active() {
                debug!(streamer, "already watching");
                return Ok(None);
            }
        }

        if state.is_active() {
            match self.coordinator.stop().await {
                Ok(()) | Err(MediaError::NotRunning) => {}
                Err(e) => return Err(e),
            }
        }

        // Remember the target before resolving: a failed resolve still
        // leaves the session pointed here, so the frame endpoint retries.
        *self.target.write().await = Some(streamer.to_string());

        let run_id = self.start_run(streamer).await.inspect_err(|_| {
            metrics::record_stream_failure("start");
        })?;
        metrics::record_stream_start();
        info!(streamer, %run_id, "watching stream");
        Ok(Some(run_id))
    }

    /// Revive the current run if no live process backs it.
    ///
    /// Called from the frame endpoint whenever the viewer is still
    /// polling. Covers both a crashed run (Failed) and a start that never
    /// got off the ground: a failed resolve leaves the coordinator Idle
    /// with the target retained. Throttling is the coordinator's job; a
    /// throttled revive is quietly skipped.
    pub async fn ensure_alive(&self) {
        let _guard = self.op_lock.lock().await;

        let streamer = match self.target.read().await.clone() {
            Some(s) => s,
            None => return,
        };
        if self.coordinator.status().await.state.is_active() {
            return;
        }

        match self.start_run(&streamer).await {
            Ok(run_id) => {
                metrics::record_stream_start();
                info!(streamer, %run_id, "revived stream run");
            }
            Err(MediaError::RestartThrottled { wait_secs }) => {
                debug!(streamer, wait_secs, "revive throttled");
            }
            Err(e) => {
                metrics::record_stream_failure("revive");
                warn!(streamer, error = %e, "failed to revive stream run");
            }
        }
    }

    /// Stop the current run and clear the target.
    pub async fn stop(&self) -> MediaResult<()> {
        let _guard = self.op_lock.lock().await;

        *self.target.write().await = None;
        self.coordinator.stop().await?;
        metrics::record_stream_stop();
        Ok(())
    }

    async fn start_run(&self, streamer: &str) -> MediaResult<RunId> {
        let url = resolve_stream_url(streamer, &self.quality).await?;

        let cmd = FrameGrabCommand::new(url, &self.frame_path)
            .width(self.frame_width)
            .jpeg_qscale(self.frame_jpeg_qscale);

        self.coordinator.start(cmd).await
    }
}
