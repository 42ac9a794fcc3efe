//! Cooperative cancellation and best-effort progress reporting.
//!
//! Neither may influence simulation results: progress sinks never block
//! and a cancelled run publishes nothing.

use crate::message::{HostMessage, ProgressUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// A shared cancellation flag. Engines check it between simulated weeks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can guard the next run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Receiver of coarse progress notifications.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

impl ProgressSink for Sender<HostMessage> {
    fn report(&self, update: ProgressUpdate) {
        // A hung-up receiver only means nobody is watching.
        let _ = self.send(HostMessage::Progress(update));
    }
}

/// Everything an engine run needs from its host besides the input itself.
#[derive(Clone, Copy)]
pub struct RunControl<'a> {
    pub cancellation: &'a CancellationToken,
    pub progress: &'a dyn ProgressSink,
}

impl<'a> RunControl<'a> {
    pub fn new(cancellation: &'a CancellationToken, progress: &'a dyn ProgressSink) -> Self {
        Self { cancellation, progress }
    }
}
