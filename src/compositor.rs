//! Fixed-rate render loop
//!
//! The [`Compositor`] owns a dedicated render thread that, once per tick,
//! composites the layout, encodes the frame and hands it to the sink. The
//! loop keeps a fixed schedule: when a tick overruns, the schedule is
//! resynchronized to `now + interval` instead of rendering back-to-back
//! frames to catch up.
//!
//! Failures inside a tick never end the loop. They are counted and logged
//! (sink failures at most once per `sink_log_interval`), and after more
//! than `error_backoff_threshold` consecutive failures the loop waits an
//! extra `error_backoff` before each tick. Only [`Compositor::stop`] ends
//! it.

use crate::async_api::{Command, DisplayHandle};
use crate::rendering::LayoutManager;
use crate::sink::{FrameEncoder, FrameSink};
use crate::{CompositorConfig, Error, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Messages delivered to the render thread
pub(crate) enum Signal {
    Stop,
    Command(Command),
}

/// Read-only counters exposed by the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompositorStats {
    pub frame_count: u64,
    pub error_count: u64,
    pub running: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames: AtomicU64,
    errors: AtomicU64,
    /// Id of the live run, 0 when stopped
    active_run: AtomicU64,
    last_run: AtomicU64,
}

impl Counters {
    fn is_running(&self) -> bool {
        self.active_run.load(Ordering::Acquire) != 0
    }
}

/// Clears the running flag when the render thread exits, unless a newer run
/// has taken over in the meantime.
struct RunGuard {
    counters: Arc<Counters>,
    run_id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let cleared = self.counters.active_run.compare_exchange(
            self.run_id,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if cleared.is_ok() && thread::panicking() {
            error!("Render thread died unexpectedly");
        }
    }
}

struct Worker {
    signal_tx: Sender<Signal>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Drives the render loop. Restartable: `start` / `stop` may be called any
/// number of times, from any thread.
pub struct Compositor {
    layout: Arc<Mutex<LayoutManager>>,
    encoder: Arc<dyn FrameEncoder>,
    sink: Arc<dyn FrameSink>,
    config: CompositorConfig,
    counters: Arc<Counters>,
    worker: Mutex<Option<Worker>>,
}

impl Compositor {
    pub fn new(
        layout: Arc<Mutex<LayoutManager>>,
        encoder: Arc<dyn FrameEncoder>,
        sink: Arc<dyn FrameSink>,
        config: CompositorConfig,
    ) -> Self {
        info!(
            "Compositor initialized: refresh rate {}ms",
            config.refresh_rate_ms
        );
        Self {
            layout,
            encoder,
            sink,
            config,
            counters: Arc::new(Counters::default()),
            worker: Mutex::new(None),
        }
    }

    /// Shared layout. Edits made through it are serialized with the render
    /// thread by the mutex.
    pub fn layout(&self) -> Arc<Mutex<LayoutManager>> {
        Arc::clone(&self.layout)
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Spawn the render thread.
    ///
    /// Returns [`Error::AlreadyRunning`] if the loop is already running.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.lock_worker();
        if worker.is_some() && self.counters.is_running() {
            return Err(Error::AlreadyRunning);
        }
        // A loop that died on its own leaves a stale worker behind.
        if let Some(stale) = worker.take() {
            let _ = stale.handle.join();
        }

        let (signal_tx, signal_rx) = mpsc::channel::<Signal>();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let mut render_loop = RenderLoop {
            layout: Arc::clone(&self.layout),
            encoder: Arc::clone(&self.encoder),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
            counters: Arc::clone(&self.counters),
            limiter: ErrorLogLimiter::new(self.config.sink_log_interval),
            consecutive_errors: 0,
        };

        let run_id = self.counters.last_run.fetch_add(1, Ordering::Relaxed) + 1;
        self.counters.active_run.store(run_id, Ordering::Release);
        let guard = RunGuard {
            counters: Arc::clone(&self.counters),
            run_id,
        };
        let spawned = thread::Builder::new()
            .name("compositor".to_string())
            .spawn(move || {
                let _guard = guard;
                render_loop.run(&signal_rx);
                let _ = done_tx.send(());
            });
        let handle = match spawned {
            Ok(h) => h,
            Err(e) => {
                self.counters.active_run.store(0, Ordering::Release);
                return Err(Error::Io(e));
            }
        };

        *worker = Some(Worker {
            signal_tx,
            done_rx,
            handle,
        });
        info!("Compositor started");
        Ok(())
    }

    /// Signal the loop to exit and wait up to `timeout` for it. A tick in
    /// progress always completes first. If the thread does not finish in
    /// time it is left to exit on its own; this never blocks longer than
    /// `timeout`.
    pub fn stop(&self, timeout: Duration) {
        let worker = {
            let mut slot = self.lock_worker();
            let Some(worker) = slot.take() else {
                return;
            };
            self.counters.active_run.store(0, Ordering::Release);
            worker
        };
        let _ = worker.signal_tx.send(Signal::Stop);

        match worker.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    error!("Render thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Render thread did not stop within {:?}; detaching it",
                    timeout
                );
            }
        }

        info!(
            "Compositor stopped. Frames rendered: {}, errors: {}",
            self.counters.frames.load(Ordering::Relaxed),
            self.counters.errors.load(Ordering::Relaxed)
        );
    }

    pub fn is_running(&self) -> bool {
        self.counters.is_running()
    }

    pub fn stats(&self) -> CompositorStats {
        snapshot_stats(&self.counters, &self.config)
    }

    /// Async control handle bound to the current run of the render loop.
    pub fn handle(&self) -> Result<DisplayHandle> {
        match self.lock_worker().as_ref() {
            Some(worker) => Ok(DisplayHandle::new(worker.signal_tx.clone())),
            None => Err(Error::NotRunning),
        }
    }

    /// Composite, encode and send one frame on the calling thread.
    ///
    /// Unlike the loop, errors (including usage errors such as a wrong
    /// encoded length) are returned to the caller. Errors are not counted.
    pub fn render_frame(&self) -> Result<()> {
        deliver_frame(
            &self.layout,
            self.encoder.as_ref(),
            self.sink.as_ref(),
            &self.config.event_name,
        )?;
        self.counters.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.stop(self.config.stop_timeout);
    }
}

fn snapshot_stats(counters: &Counters, config: &CompositorConfig) -> CompositorStats {
    CompositorStats {
        frame_count: counters.frames.load(Ordering::Relaxed),
        error_count: counters.errors.load(Ordering::Relaxed),
        running: counters.is_running(),
        interval_ms: config.interval().as_millis() as u64,
    }
}

fn deliver_frame(
    layout: &Mutex<LayoutManager>,
    encoder: &dyn FrameEncoder,
    sink: &dyn FrameSink,
    event: &str,
) -> Result<()> {
    let frame = {
        let layout = layout.lock().unwrap_or_else(|p| p.into_inner());
        layout.composite(true)
    };
    let data = encoder.encode(&frame)?;
    let expected = encoder.encoded_len();
    if data.len() != expected {
        return Err(Error::EncodedLength {
            expected,
            actual: data.len(),
        });
    }
    sink.send(event, &data)
}

#[derive(Debug, PartialEq, Eq)]
enum Wake {
    Deadline,
    Stop,
}

struct RenderLoop {
    layout: Arc<Mutex<LayoutManager>>,
    encoder: Arc<dyn FrameEncoder>,
    sink: Arc<dyn FrameSink>,
    config: CompositorConfig,
    counters: Arc<Counters>,
    limiter: ErrorLogLimiter,
    consecutive_errors: u32,
}

impl RenderLoop {
    fn run(&mut self, signals: &Receiver<Signal>) {
        let interval = self.config.interval();
        let mut next_tick = Instant::now();
        debug!("Render loop started");

        loop {
            if self.wait_until(signals, next_tick) == Wake::Stop {
                break;
            }

            let ticked = panic::catch_unwind(AssertUnwindSafe(|| self.tick()))
                .unwrap_or_else(|_| Err(Error::Other("tick panicked".to_string())));
            match ticked {
                Ok(()) => self.consecutive_errors = 0,
                Err(e) => self.report(e),
            }

            next_tick += interval;
            let now = Instant::now();
            if next_tick < now {
                // Fell behind: drop the missed ticks.
                next_tick = now + interval;
            }

            if self.consecutive_errors > self.config.error_backoff_threshold {
                debug!(
                    "{} consecutive frame errors, backing off for {:?}",
                    self.consecutive_errors, self.config.error_backoff
                );
                let resume = Instant::now() + self.config.error_backoff;
                if self.wait_until(signals, resume) == Wake::Stop {
                    break;
                }
                next_tick = next_tick.max(resume);
            }
        }

        debug!("Render loop stopped");
    }

    /// Block until `deadline` or a stop signal. Control commands arriving
    /// meanwhile are executed here, on the render thread.
    fn wait_until(&self, signals: &Receiver<Signal>, deadline: Instant) -> Wake {
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match signals.recv_timeout(timeout) {
                Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => return Wake::Stop,
                Ok(Signal::Command(cmd)) => {
                    cmd.execute(&self.layout, || snapshot_stats(&self.counters, &self.config))
                }
                Err(RecvTimeoutError::Timeout) => return Wake::Deadline,
            }
        }
    }

    fn tick(&self) -> Result<()> {
        deliver_frame(
            &self.layout,
            self.encoder.as_ref(),
            self.sink.as_ref(),
            &self.config.event_name,
        )?;
        let frames = self.counters.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if frames % 100 == 0 {
            debug!("Frames rendered: {}", frames);
        }
        Ok(())
    }

    fn report(&mut self, e: Error) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);

        if e.is_sink_error() {
            if self.limiter.should_log(Instant::now()) {
                match e {
                    Error::Connection(_) => error!("Frame sink unreachable: {}", e),
                    _ => warn!("Frame sink error: {}", e),
                }
            }
        } else if e.is_usage_error() {
            error!("Frame rejected: {}", e);
        } else {
            error!("Frame rendering error: {}", e);
        }
    }
}

/// Lets one log line through per `interval` of wall time.
#[derive(Debug)]
pub struct ErrorLogLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl ErrorLogLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn should_log(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
