//! Durability mode configuration
//!
//! Controls when stream files are fsynced (Always, Standard).

use std::time::Duration;

/// Durability mode for stream appends
///
/// A write is always issued before an append returns; the mode only decides
/// when that write is followed by an fsync.
///
/// # Modes
///
/// | Mode | fsync | Data Loss Window |
/// |------|-------|-----------------|
/// | Always | Every append | Zero |
/// | Standard | Periodic | Up to interval/batch |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// fsync after every append (slow, maximum durability)
    ///
    /// A failed fsync fails the append.
    Always,

    /// fsync every N appends OR every T milliseconds (the default)
    ///
    /// May lose up to `batch_size` appends or `interval_ms` of data on a
    /// machine crash. A process crash loses nothing.
    Standard {
        /// Maximum time between fsyncs in milliseconds
        interval_ms: u64,
        /// Maximum appends between fsyncs
        batch_size: usize,
    },
}

impl DurabilityMode {
    /// How often unsynced appends must be flushed when no new appends
    /// arrive.
    ///
    /// `None` for `Always`, which never leaves an append unsynced.
    pub fn flush_interval(&self) -> Option<Duration> {
        match *self {
            DurabilityMode::Always => None,
            DurabilityMode::Standard { interval_ms, .. } => Some(Duration::from_millis(interval_ms)),
        }
    }

    /// Decide whether an fsync is due.
    ///
    /// `appends_since_sync` includes the append that was just written.
    pub fn sync_due(&self, appends_since_sync: usize, since_last_sync: Duration) -> bool {
        match *self {
            DurabilityMode::Always => true,
            DurabilityMode::Standard {
                interval_ms,
                batch_size,
            } => {
                appends_since_sync >= batch_size
                    || since_last_sync >= Duration::from_millis(interval_ms)
            }
        }
    }

    /// Human-readable description of the mode
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::Always => "Always sync (safest, slowest)",
            DurabilityMode::Standard { .. } => "Standard (balanced speed/safety)",
        }
    }

    /// Create a standard mode with recommended defaults
    ///
    /// Returns `Standard { interval_ms: 100, batch_size: 1000 }`.
    pub fn standard_default() -> Self {
        DurabilityMode::Standard {
            interval_ms: 100,
            batch_size: 1000,
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        Self::standard_default()
    }
}
