//! Cooperative cancellation and progress reporting.
//!
//! Long-running stages (sorting, full filter scans) run on the caller's
//! thread and poll an [`ExecutionMonitor`] at bounded intervals. Nothing is
//! ever interrupted; a stage that sees the cancel flag returns
//! [`Error::Cancelled`] from its next checkpoint.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sink for cancellation checks and progress reports.
pub trait ExecutionMonitor {
    /// Fails with `Cancelled` once an abort has been requested.
    fn check_cancelled(&self) -> Result<()>;

    /// Human-readable description of the current phase.
    fn set_message(&self, message: &str);

    /// Progress of the current phase, in `[0, 1]`.
    fn set_progress(&self, fraction: f64);
}

/// Shared cancel flag. Clones refer to the same flag, so a handle can be
/// moved to another thread (a UI thread, a signal handler) and used to abort
/// work running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A progress report delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub message: Option<String>,
    pub progress: f64,
}

/// Receives every progress change of a [`ProgressMonitor`].
pub trait ProgressListener {
    fn progress_changed(&self, event: &ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(&ProgressEvent),
{
    fn progress_changed(&self, event: &ProgressEvent) {
        self(event)
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    message: Option<String>,
    progress: f64,
}

/// Default monitor: a cancel flag plus the latest message and progress,
/// forwarded to any registered listeners.
#[derive(Default)]
pub struct ProgressMonitor {
    cancel: CancelHandle,
    state: RefCell<ProgressState>,
    listeners: Vec<Box<dyn ProgressListener>>,
}

impl std::fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("cancel", &self.cancel)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor driven by an existing cancel handle.
    pub fn with_cancel_handle(cancel: CancelHandle) -> Self {
        ProgressMonitor {
            cancel,
            ..Self::default()
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn add_listener(&mut self, listener: impl ProgressListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn message(&self) -> Option<String> {
        self.state.borrow().message.clone()
    }

    pub fn progress(&self) -> f64 {
        self.state.borrow().progress
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let event = {
            let state = self.state.borrow();
            ProgressEvent {
                message: state.message.clone(),
                progress: state.progress,
            }
        };
        for listener in &self.listeners {
            listener.progress_changed(&event);
        }
    }
}

impl ExecutionMonitor for ProgressMonitor {
    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_message(&self, message: &str) {
        log::debug!("{}", message);
        self.state.borrow_mut().message = Some(message.to_string());
        self.notify();
    }

    fn set_progress(&self, fraction: f64) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.state.borrow_mut().progress = fraction;
        self.notify();
    }
}

/// Monitor that is never cancelled and discards reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl ExecutionMonitor for NoopMonitor {
    fn check_cancelled(&self) -> Result<()> {
        Ok(())
    }

    fn set_message(&self, _message: &str) {}

    fn set_progress(&self, _fraction: f64) {}
}
