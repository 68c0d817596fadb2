//! Single-instance coordinator for the ffmpeg frame-grab process.
//!
//! Owns at most one live external process per service instance. All
//! start/stop transitions are serialized through one async mutex; the
//! child handle itself is exclusively owned by a per-run supervisor task
//! which publishes state changes to a shared snapshot. Status reads go
//! through the snapshot only and never contend with a transition.
//!
//! Readiness signal: ffmpeg (`-update 1`) rewrites a single JPEG in
//! place. The run counts as ready once that file exists with non-zero
//! size. The frame file is removed before each spawn so a stale frame
//! from an earlier run can never satisfy the check.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use kobo_models::{CoordinatorState, RunId, StatusSnapshot};

use crate::command::FrameGrabCommand;
use crate::error::{MediaError, MediaResult};

/// Coordinator timing and tooling knobs.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// ffmpeg executable; a bare name is resolved via PATH
    pub ffmpeg_program: PathBuf,
    /// How long a spawned process gets to produce its first frame
    pub readiness_timeout: Duration,
    /// SIGTERM grace period before escalating to SIGKILL
    pub stop_grace: Duration,
    /// Bounded wait for the process to die after SIGKILL
    pub kill_wait: Duration,
    /// Supervisor poll interval (crash detection, readiness checks)
    pub poll_interval: Duration,
    /// Minimum spacing between spawns; restarts inside it are refused
    pub min_restart_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_program: PathBuf::from("ffmpeg"),
            // Live-stream handshakes regularly take several seconds
            readiness_timeout: Duration::from_secs(20),
            stop_grace: Duration::from_secs(2),
            kill_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
            min_restart_interval: Duration::from_secs(10),
        }
    }
}

/// Shared state between the coordinator and the per-run supervisor task.
struct Shared {
    snapshot: RwLock<StatusSnapshot>,
}

impl Shared {
    async fn publish<F>(&self, update: F)
    where
        F: FnOnce(&mut StatusSnapshot),
    {
        let mut snapshot = self.snapshot.write().await;
        update(&mut snapshot);
    }

    async fn state(&self) -> CoordinatorState {
        self.snapshot.read().await.state
    }

    async fn fail(&self, error: &MediaError) {
        let message = error.to_string();
        self.publish(|s| {
            s.state = CoordinatorState::Failed;
            s.last_error = Some(message);
        })
        .await;
    }

    async fn idle(&self) {
        self.publish(|s| {
            s.state = CoordinatorState::Idle;
            s.started_at = None;
        })
        .await;
    }
}

/// Handle to the supervisor of the current run.
struct ActiveRun {
    run_id: RunId,
    cancel: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
}

/// Transition-serialized slot: the single place a live run may exist.
struct ActiveSlot {
    run: Option<ActiveRun>,
    last_spawn: Option<Instant>,
}

/// Coordinator for the single external media process.
pub struct StreamCoordinator {
    config: CoordinatorConfig,
    shared: Arc<Shared>,
    active: Mutex<ActiveSlot>,
}

impl StreamCoordinator {
    /// Create a coordinator with the given configuration.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                snapshot: RwLock::new(StatusSnapshot::idle()),
            }),
            active: Mutex::new(ActiveSlot {
                run: None,
                last_spawn: None,
            }),
        }
    }

    /// Current status snapshot. Never blocks on a held transition.
    pub async fn status(&self) -> StatusSnapshot {
        self.shared.snapshot.read().await.clone()
    }

    /// Start a new frame-grab run.
    ///
    /// Fails with `AlreadyRunning` while a run is starting or running,
    /// `RestartThrottled` inside the minimum restart spacing, and
    /// `SpawnFailure` synchronously when the executable cannot be
    /// launched. Blocks until the run is ready (first frame written) or
    /// the readiness timeout elapses; a concurrent `stop` interrupts the
    /// wait and surfaces as `Cancelled`.
    pub async fn start(&self, cmd: FrameGrabCommand) -> MediaResult<RunId> {
        let (run_id, ready_rx) = {
            let mut active = self.active.lock().await;

            if self.shared.state().await.is_active() {
                return Err(MediaError::AlreadyRunning);
            }
            // Any previous supervisor has already finished; drop its handle.
            active.run = None;

            if let Some(last_spawn) = active.last_spawn {
                let since = last_spawn.elapsed();
                if since < self.config.min_restart_interval {
                    let wait = self.config.min_restart_interval - since;
                    return Err(MediaError::RestartThrottled {
                        wait_secs: wait.as_secs().max(1),
                    });
                }
            }

            which::which(&self.config.ffmpeg_program)
                .map_err(|_| MediaError::FfmpegNotFound)?;

            remove_stale_frame(cmd.frame_path()).await?;

            let child = Command::new(&self.config.ffmpeg_program)
                .args(cmd.build_args())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| MediaError::spawn_failure(e.to_string()))?;

            let run_id = RunId::new();
            active.last_spawn = Some(Instant::now());

            self.shared
                .publish(|s| {
                    s.state = CoordinatorState::Starting;
                    s.run_id = Some(run_id);
                    s.started_at = None;
                })
                .await;

            let (cancel_tx, cancel_rx) = watch::channel(false);
            let (ready_tx, ready_rx) = oneshot::channel();

            let supervisor = tokio::spawn(supervise(
                child,
                run_id,
                cmd.frame_path().to_path_buf(),
                self.config.clone(),
                Arc::clone(&self.shared),
                cancel_rx,
                ready_tx,
            ));

            active.run = Some(ActiveRun {
                run_id,
                cancel: cancel_tx,
                supervisor,
            });

            (run_id, ready_rx)
            // Transition lock released here: the readiness wait below must
            // stay interruptible by a concurrent stop().
        };

        match ready_rx.await {
            Ok(Ok(())) => {
                info!(%run_id, "stream run ready");
                Ok(run_id)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MediaError::internal("supervisor dropped readiness channel")),
        }
    }

    /// Stop the current run.
    ///
    /// Fails with `NotRunning` when the coordinator is idle or failed
    /// (a failed run's `last_error` stays visible until the next
    /// successful start). Otherwise requests graceful termination and
    /// waits, bounded by grace + kill-wait, for the supervisor to finish.
    pub async fn stop(&self) -> MediaResult<()> {
        let mut active = self.active.lock().await;

        if !self.shared.state().await.is_active() {
            return Err(MediaError::NotRunning);
        }
        let run = active.run.take().ok_or(MediaError::NotRunning)?;

        debug!(run_id = %run.run_id, "requesting stream run stop");
        let _ = run.cancel.send(true);

        let bound = self.config.stop_grace + self.config.kill_wait + Duration::from_secs(1);
        match timeout(bound, run.supervisor).await {
            Ok(_) => {
                // The supervisor may have taken the crash branch in the
                // same tick the cancel landed, leaving Failed published.
                // A stop that joined the supervisor ends Idle either way.
                self.shared.idle().await;
                Ok(())
            }
            Err(_) => Err(MediaError::ShutdownTimeout),
        }
    }
}

/// Remove a leftover frame file so it cannot satisfy the readiness check.
async fn remove_stale_frame(path: &Path) -> MediaResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// First frame on disk with non-zero size: the readiness signal.
async fn frame_ready(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len() > 0,
        Err(_) => false,
    }
}

fn send_ready(tx: &mut Option<oneshot::Sender<MediaResult<()>>>, result: MediaResult<()>) {
    if let Some(tx) = tx.take() {
        // The start caller may have gone away; state is already published.
        let _ = tx.send(result);
    }
}

/// Per-run supervisor. Sole owner of the child handle.
async fn supervise(
    mut child: Child,
    run_id: RunId,
    frame_path: PathBuf,
    config: CoordinatorConfig,
    shared: Arc<Shared>,
    mut cancel_rx: watch::Receiver<bool>,
    ready_tx: oneshot::Sender<MediaResult<()>>,
) {
    let spawn_time = Instant::now();
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ready_tx = Some(ready_tx);

    // Phase 1: wait for readiness.
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        warn!(%run_id, %status, "process exited before readiness");
                        let err = MediaError::unexpected_exit(status);
                        shared.fail(&err).await;
                        send_ready(&mut ready_tx, Err(err));
                        return;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let err = MediaError::Io(e);
                        shared.fail(&err).await;
                        send_ready(&mut ready_tx, Err(err));
                        let _ = shutdown_child(&mut child, Duration::ZERO, config.kill_wait).await;
                        return;
                    }
                }

                if frame_ready(&frame_path).await {
                    info!(%run_id, "first frame written, run is ready");
                    shared.publish(|s| {
                        s.state = CoordinatorState::Running;
                        s.started_at = Some(Utc::now());
                        s.last_error = None;
                    }).await;
                    send_ready(&mut ready_tx, Ok(()));
                    break;
                }

                if spawn_time.elapsed() >= config.readiness_timeout {
                    warn!(%run_id, timeout_secs = config.readiness_timeout.as_secs(),
                        "no frame within readiness timeout, killing process");
                    let _ = shutdown_child(&mut child, Duration::ZERO, config.kill_wait).await;
                    let err = MediaError::ReadinessTimeout(config.readiness_timeout.as_secs());
                    shared.fail(&err).await;
                    send_ready(&mut ready_tx, Err(err));
                    return;
                }
            }
            _ = cancel_rx.changed() => {
                debug!(%run_id, "stop requested during startup");
                shared.publish(|s| s.state = CoordinatorState::Stopping).await;
                let _ = shutdown_child(&mut child, config.stop_grace, config.kill_wait).await;
                shared.idle().await;
                send_ready(&mut ready_tx, Err(MediaError::Cancelled));
                return;
            }
        }
    }

    // Phase 2: supervise the running process.
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        warn!(%run_id, %status, "process exited unexpectedly");
                        shared.fail(&MediaError::unexpected_exit(status)).await;
                        return;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(%run_id, error = %e, "failed to poll process");
                        shared.fail(&MediaError::Io(e)).await;
                        return;
                    }
                }
            }
            _ = cancel_rx.changed() => {
                info!(%run_id, "stopping stream run");
                shared.publish(|s| s.state = CoordinatorState::Stopping).await;
                if shutdown_child(&mut child, config.stop_grace, config.kill_wait).await.is_err() {
                    warn!(%run_id, "process survived the SIGKILL wait");
                }
                shared.idle().await;
                return;
            }
        }
    }
}

/// Graceful shutdown: SIGTERM, bounded grace wait, SIGKILL escalation,
/// bounded reap wait. A zero grace skips straight to SIGKILL.
async fn shutdown_child(
    child: &mut Child,
    grace: Duration,
    kill_wait: Duration,
) -> MediaResult<()> {
    if !grace.is_zero() {
        if let Some(pid) = child.id() {
            let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            match timeout(grace, child.wait()).await {
                Ok(_) => return Ok(()),
                Err(_) => {
                    warn!(grace_secs = grace.as_secs(), "process ignored SIGTERM, escalating");
                }
            }
        }
    }

    let _ = child.start_kill();
    match timeout(kill_wait, child.wait()).await {
        Ok(_) => Ok(()),
        Err(_) => Err(MediaError::ShutdownTimeout),
    }
}
