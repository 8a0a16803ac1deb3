//! Per-widget update threads
//!
//! Each widget gets its own thread calling [`Widget::update`] right away and
//! then every [`Widget::update_interval`]. Update failures are logged and
//! never end the thread; only [`UpdateScheduler::stop`] does.

use crate::widget::Widget;
use crate::Result;
use log::{debug, error, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct UpdateThread {
    name: String,
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct UpdateScheduler {
    threads: Vec<UpdateThread>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start updating `widget` on its own thread.
    pub fn spawn(&mut self, widget: Arc<dyn Widget>) -> Result<()> {
        let name = widget.name().to_string();
        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("widget-{}", name))
            .spawn(move || {
                run_updates(widget.as_ref(), &stop_rx);
                let _ = done_tx.send(());
            })?;
        self.threads.push(UpdateThread {
            name,
            stop_tx,
            done_rx,
            handle,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Signal every thread, then join each one, giving up after `timeout`
    /// overall. Threads that are still inside `update()` are left to finish
    /// on their own.
    pub fn stop(&mut self, timeout: Duration) {
        for t in &self.threads {
            let _ = t.stop_tx.send(());
        }
        let deadline = Instant::now() + timeout;
        for t in self.threads.drain(..) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match t.done_rx.recv_timeout(remaining) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if t.handle.join().is_err() {
                        error!("Update thread for widget {} panicked", t.name);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Update thread for widget {} did not stop in time", t.name);
                }
            }
        }
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        self.stop(Duration::from_secs(1));
    }
}

fn run_updates(widget: &dyn Widget, stop_rx: &Receiver<()>) {
    let interval = widget.update_interval().max(MIN_INTERVAL);
    debug!(
        "Widget update thread started: {} (interval={:?})",
        widget.name(),
        interval
    );
    loop {
        if let Err(e) = widget.update() {
            error!("Error updating widget {}: {}", widget.name(), e);
        }
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Widget update thread stopped: {}", widget.name());
}
