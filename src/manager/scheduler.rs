//! Fixed-delay background task.
//!
//! The task runs once immediately, then again `period` after each run
//! finishes. Errors and panics are logged and the loop keeps going.
//! Cancelling never waits for a run in progress; the task sees the
//! cancel flag between units of work and the thread exits on its own.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};

use crate::{debug, log};

/// Handle to a running periodic task. Dropping it cancels the task.
#[derive(Debug)]
pub struct Scheduler {
    name: &'static str,
    cancelled: Arc<AtomicBool>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn `task` on a dedicated thread.
    ///
    /// Returns `None` for a zero period, which means "never run".
    pub fn spawn<F, E>(name: &'static str, period: Duration, mut task: F) -> Option<Self>
    where
        F: FnMut(&AtomicBool) -> Result<(), E> + Send + 'static,
        E: Display,
    {
        if period.is_zero() {
            return None;
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let (stop, wake) = channel::bounded::<()>(1);
        let flag = Arc::clone(&cancelled);

        let spawned = thread::Builder::new()
            .name(format!("wrought-{name}"))
            .spawn(move || {
                debug!("scheduler"; "{} started, period {:?}", name, period);
                loop {
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    match panic::catch_unwind(AssertUnwindSafe(|| task(&flag))) {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => log!("error"; "{} run failed: {}", name, err),
                        Err(_) => log!("error"; "{} run panicked", name),
                    }
                    match wake.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                debug!("scheduler"; "{} stopped", name);
            });

        match spawned {
            Ok(handle) => Some(Self {
                name,
                cancelled,
                stop: Some(stop),
                handle: Some(handle),
            }),
            Err(err) => {
                log!("error"; "failed to start {} thread: {}", name, err);
                None
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Stop the task without waiting for the current run.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        // Disconnecting wakes the thread out of its delay.
        self.stop.take();
        self.handle.take();
    }

    /// Stop the task and wait for its thread to exit.
    pub fn join(mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
