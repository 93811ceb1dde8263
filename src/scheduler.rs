//! Replay controller and the paced send loop.
//!
//! [`ReplayController`] owns one frame source, one transport and one observer.
//! A run is a sequence of cycles; each cycle traverses the source once and
//! sends every frame after its pacing wait (see [`PacingClock`]).
//!
//! ## Synchronization
//!
//! - `running`/`paused` live in a `watch` channel. Pausing is observed at frame
//!   boundaries and the loop waits on the channel, not on a timer.
//! - A [`CancellationToken`] per run interrupts pacing sleeps and pause waits
//!   as soon as [`ReplayController::stop`] is called.
//! - Counters and timestamps sit behind a `std::sync::Mutex` that is never
//!   held across an `.await`, so transport and observer calls run unlocked.
//!
//! ## Example
//!
//! ```rust,no_run
//! use framepace::{NoopObserver, ReplayController, SimulatedTransport, SerialConfig, SourceMode, Transport};
//! use std::sync::Arc;
//!
//! # async fn run() -> framepace::Result<()> {
//! let transport = Arc::new(SimulatedTransport::new(SerialConfig::default()));
//! transport.connect().await?;
//!
//! let controller =
//!     ReplayController::load("capture.txt", SourceMode::Materialized, transport, Arc::new(NoopObserver))
//!         .await?;
//! controller.start(false).await?;
//! assert_eq!(controller.status().cycle_count, 1);
//! # Ok(())
//! # }
//! ```

use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::observer::Observer;
use crate::pacing::PacingClock;
use crate::source::{FrameSource, FrameSourceExt};
use crate::sources::open_source;
use crate::transport::Transport;
use crate::types::{Frame, SchedulerStatus, SourceMode};
use crate::{ReplayError, Result};

/// Retry backoff stops doubling at 50ms << 5
const MAX_BACKOFF_SHIFT: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Control {
    running: bool,
    paused: bool,
}

#[derive(Debug, Default)]
struct Progress {
    current_index: usize,
    cycle_count: u64,
    total_sent: u64,
    max_drift: Duration,
    pacing: PacingClock,
    current_frame: Option<Frame>,
}

/// How a cycle ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleEnd {
    Completed,
    Stopped,
}

/// State shared between the controller handle and the background loop
struct Shared {
    source: tokio::sync::Mutex<Box<dyn FrameSource>>,
    transport: Arc<dyn Transport>,
    observer: Arc<dyn Observer>,
    control: watch::Sender<Control>,
    progress: Mutex<Progress>,
    cancel: Mutex<CancellationToken>,
    total_frames: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Paced replay of a frame source over a transport.
///
/// Dropping the controller cancels any background loop.
pub struct ReplayController {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayController {
    /// Create a controller over an already loaded source
    pub fn new(
        source: Box<dyn FrameSource>,
        transport: Arc<dyn Transport>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let total_frames = source.frame_count();
        let (control, _) = watch::channel(Control::default());

        let shared = Shared {
            source: tokio::sync::Mutex::new(source),
            transport,
            observer,
            control,
            progress: Mutex::new(Progress::default()),
            cancel: Mutex::new(CancellationToken::new()),
            total_frames: AtomicUsize::new(total_frames),
        };

        Self { shared: Arc::new(shared), task: Mutex::new(None) }
    }

    /// Load a capture file and create a controller for it.
    ///
    /// Fails when the file cannot be read or contains no valid frame.
    pub async fn load<P: AsRef<Path>>(
        path: P,
        mode: SourceMode,
        transport: Arc<dyn Transport>,
        observer: Arc<dyn Observer>,
    ) -> Result<Self> {
        let source = open_source(path, mode).await?;
        Ok(Self::new(source, transport, observer))
    }

    /// Start replaying.
    ///
    /// With `continuous == false` exactly one cycle runs before this returns.
    /// With `continuous == true` the cycles run on a background task until
    /// [`stop`](Self::stop) is called, and this returns immediately.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::NotLoaded`] when the source holds no frames
    /// - [`ReplayError::NotConnected`] when the transport is down
    /// - [`ReplayError::AlreadyRunning`] when a replay is still active
    /// - any error raised by the source during a single-cycle run
    pub async fn start(&self, continuous: bool) -> Result<()> {
        if self.shared.total_frames.load(Ordering::SeqCst) == 0 {
            return Err(ReplayError::NotLoaded);
        }
        if !self.shared.transport.is_connected() {
            return Err(ReplayError::not_connected(self.shared.transport.port_info().port));
        }

        let cancel = CancellationToken::new();
        {
            let mut task = lock(&self.task);
            let loop_active = task.as_ref().is_some_and(|handle| !handle.is_finished());
            if loop_active || self.shared.control.borrow().running {
                return Err(ReplayError::AlreadyRunning);
            }

            *lock(&self.shared.cancel) = cancel.clone();
            self.shared.control.send_modify(|control| {
                control.running = true;
                control.paused = false;
            });

            if continuous {
                info!("Starting continuous replay");
                let shared = Arc::clone(&self.shared);
                *task = Some(tokio::spawn(async move { shared.run_loop(cancel).await }));
                return Ok(());
            }
        }

        info!("Starting single-cycle replay");
        let _run = SingleRun { control: &self.shared.control, cancel: cancel.clone() };
        self.shared.run_cycle(&cancel).await.map(|_| ())
    }

    /// Request termination at the next frame boundary.
    ///
    /// A pacing sleep or pause in progress is cut short; a send in flight
    /// finishes first. No further cycle starts.
    pub fn stop(&self) {
        self.shared.control.send_modify(|control| {
            control.running = false;
            control.paused = false;
        });
        lock(&self.shared.cancel).cancel();
        debug!("Stop requested");
    }

    /// Suspend sending after the frame in progress
    pub fn pause(&self) {
        self.shared.control.send_modify(|control| control.paused = true);
        debug!("Pause requested");
    }

    /// Continue with the next unsent frame
    pub fn resume(&self) {
        self.shared.control.send_modify(|control| control.paused = false);
        debug!("Resume requested");
    }

    /// Wait for the background loop to finish after [`stop`](Self::stop)
    pub async fn wait(&self) {
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Replay loop terminated abnormally: {}", e);
            }
        }
    }

    /// Point-in-time snapshot of the scheduler state
    pub fn status(&self) -> SchedulerStatus {
        let control = *self.shared.control.borrow();
        let progress = lock(&self.shared.progress);
        SchedulerStatus {
            running: control.running,
            paused: control.paused,
            current_index: progress.current_index,
            total_frames: self.shared.total_frames.load(Ordering::SeqCst),
            cycle_count: progress.cycle_count,
            total_sent: progress.total_sent,
            max_drift: progress.max_drift,
        }
    }

    /// Readable form of the frame at the current index, empty between cycles
    pub fn current_frame(&self) -> String {
        lock(&self.shared.progress).current_frame.as_ref().map(Frame::readable).unwrap_or_default()
    }
}

impl Drop for ReplayController {
    fn drop(&mut self) {
        debug!("Dropping replay controller");
        lock(&self.shared.cancel).cancel();
    }
}

impl Shared {
    /// Background loop: cycles until stopped
    async fn run_loop(self: Arc<Self>, cancel: CancellationToken) {
        info!("Replay loop started");
        let mut control = self.control.subscribe();
        let mut failures = 0u32;

        loop {
            if !wait_until_active(&mut control, &cancel).await {
                break;
            }

            match self.run_cycle(&cancel).await {
                Ok(CycleEnd::Completed) => failures = 0,
                Ok(CycleEnd::Stopped) => break,
                Err(e) => {
                    // The cycle is lost but the run goes on
                    failures += 1;
                    error!("Cycle aborted ({} in a row): {}", failures, e);

                    let backoff = Duration::from_millis(50 * (1 << failures.min(MAX_BACKOFF_SHIFT)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        let cycles = lock(&self.progress).cycle_count;
        info!("Replay loop ended after {} cycles", cycles);
    }

    /// One pass over the source
    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleEnd> {
        let cycle = {
            let mut progress = lock(&self.progress);
            progress.cycle_count += 1;
            progress.current_index = 0;
            progress.cycle_count
        };
        debug!("Cycle {} started", cycle);

        let mut control = self.control.subscribe();
        let mut cycle_guard = CycleGuard { source: self.source.lock().await, progress: &self.progress };
        let outcome = self.send_frames(&mut **cycle_guard.source, cycle, &mut control, cancel).await;
        self.total_frames.store(cycle_guard.source.frame_count(), Ordering::SeqCst);
        drop(cycle_guard);

        match outcome {
            Ok(CycleEnd::Completed) => {
                debug!("Cycle {} complete", cycle);
                self.observer.on_cycle_complete(cycle);
            }
            Ok(CycleEnd::Stopped) => info!("Cycle {} stopped", cycle),
            Err(_) => {}
        }
        outcome
    }

    async fn send_frames(
        &self,
        source: &mut dyn FrameSource,
        cycle: u64,
        control: &mut watch::Receiver<Control>,
        cancel: &CancellationToken,
    ) -> Result<CycleEnd> {
        let mut frames = source.traverse();
        let mut index = 0;

        loop {
            if !wait_until_active(control, cancel).await {
                return Ok(CycleEnd::Stopped);
            }

            let Some(frame) = frames.next().await.transpose()? else {
                return Ok(CycleEnd::Completed);
            };
            index += 1;

            if !self.send_frame(index, cycle, &frame, cancel).await {
                return Ok(CycleEnd::Stopped);
            }
        }
    }

    /// Pace and send one frame. Returns `false` if stopped while waiting.
    async fn send_frame(
        &self,
        index: usize,
        cycle: u64,
        frame: &Frame,
        cancel: &CancellationToken,
    ) -> bool {
        let class = frame.class();
        let total = self.total_frames.load(Ordering::SeqCst).max(index);
        let wait = {
            let mut progress = lock(&self.progress);
            progress.current_index = index;
            progress.current_frame = Some(frame.clone());
            progress.pacing.required_wait(class, Instant::now())
        };

        let readable = frame.readable();
        self.observer.on_progress(index, total, cycle, &readable);

        let mut drift = Duration::ZERO;
        if !wait.is_zero() {
            let deadline = Instant::now() + wait;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep_until(deadline) => {}
            }
            drift = Instant::now().saturating_duration_since(deadline);
        }
        trace!("Frame {}/{} ({:?}): waited {:?}, drift {:?}", index, total, class, wait, drift);

        let success = self.transport.send(frame.payload()).await;
        let sent_at = Instant::now();

        {
            let mut progress = lock(&self.progress);
            if class.is_tracked() {
                progress.pacing.record(class, sent_at);
            }
            if success {
                progress.total_sent += 1;
            }
            progress.max_drift = progress.max_drift.max(drift);
        }

        if !success {
            warn!("Send failed for frame {}/{} of cycle {}", index, total, cycle);
        }
        self.observer.on_frame_sent(&readable, success);
        true
    }
}

/// Holds the source for one cycle. Dropping it releases the source and
/// resets the cycle position on every exit path, a dropped future included.
struct CycleGuard<'a> {
    source: tokio::sync::MutexGuard<'a, Box<dyn FrameSource>>,
    progress: &'a Mutex<Progress>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.source.release();
        let mut progress = lock(self.progress);
        progress.current_index = 0;
        progress.current_frame = None;
    }
}

/// Clears `running` when a single-cycle run ends or its future is dropped.
///
/// A run already stopped is left alone: its token is cancelled and a newer
/// run may own the flag by now.
struct SingleRun<'a> {
    control: &'a watch::Sender<Control>,
    cancel: CancellationToken,
}

impl Drop for SingleRun<'_> {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            self.control.send_modify(|control| control.running = false);
        }
    }
}

/// Block while paused. Returns `false` once the run is stopped.
async fn wait_until_active(
    control: &mut watch::Receiver<Control>,
    cancel: &CancellationToken,
) -> bool {
    let mut announced = false;
    loop {
        let state = *control.borrow_and_update();
        if !state.running || cancel.is_cancelled() {
            return false;
        }
        if !state.paused {
            if announced {
                debug!("Resumed");
            }
            return true;
        }
        if !announced {
            debug!("Paused");
            announced = true;
        }

        tokio::select! {
            _ = cancel.cancelled() => return false,
            changed = control.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
}
