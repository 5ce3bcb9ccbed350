//! Background flush for `standard` durability
//!
//! On the append path a `standard` stream only syncs when a batch crosses the
//! count or time threshold. A stream that goes quiet after an append would
//! otherwise keep its tail unsynced until the next append or close. The
//! flusher wakes once per interval and syncs every overdue stream.

use super::registry::StreamRegistry;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use strand_core::StrandResult;
use tracing::{debug, warn, Span};

/// Running flush thread.
#[derive(Debug)]
pub(crate) struct Flusher {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

impl Flusher {
    /// Start a thread that calls [`StreamRegistry::sync_overdue`] every
    /// `interval`.
    pub(crate) fn spawn(
        registry: Arc<StreamRegistry>,
        interval: Duration,
        span: Span,
    ) -> StrandResult<Flusher> {
        let (shutdown, signal) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("strand-flush".to_string())
            .spawn(move || loop {
                match signal.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        registry.sync_overdue();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        debug!(parent: &span, interval_ms = interval.as_millis() as u64, "Started flush thread");
        Ok(Flusher { shutdown, handle })
    }

    /// Signal the thread and wait for it to exit.
    pub(crate) fn stop(self, span: &Span) {
        let _ = self.shutdown.send(());
        if self.handle.join().is_err() {
            warn!(parent: span, "Flush thread panicked");
        }
    }
}
