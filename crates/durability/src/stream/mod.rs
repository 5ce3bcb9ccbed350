//! Append-only message streams.
//!
//! A [`Stream`] owns one backing [`LogFile`] and the pair of cursors that
//! describe it: the tail offset (next offset to assign) and the byte write
//! position. Both live in one struct behind one mutex, and both advance only
//! after the batch they describe has been durably written.
//!
//! # Append Protocol
//!
//! Under the stream's lock:
//!
//! 1. Parse the submitted buffer into frames
//! 2. Align the frames against the current tail
//! 3. Write the aligned buffer at the current byte position
//! 4. Sync, if the durability mode calls for it
//! 5. Advance position and tail together
//!
//! A failure in 3 or 4 rolls the file back to the unchanged position and
//! leaves the cursors untouched, so resubmitting the same buffer is safe.

mod file;
pub mod recovery;

pub use file::LogFile;
pub use recovery::{recover, Recovery, RecoveryError};

use crate::format::UnalignedSet;
use crate::mode::DurabilityMode;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use strand_core::{Offset, StrandError, StrandResult, StreamName};
use tracing::{debug, trace, warn};

/// Tail offset and write position of a stream, observed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamCursors {
    /// Next offset to assign
    pub tail: Offset,
    /// Byte position the next batch is written at
    pub position: u64,
}

impl StreamCursors {
    /// Cursors of a stream that has never been written to.
    pub const EMPTY: StreamCursors = StreamCursors {
        tail: Offset::EMPTY,
        position: 0,
    };
}

/// Result of one successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Offset assigned to the first message
    pub first_offset: Offset,
    /// New tail: one past the last assigned offset
    pub next_offset: Offset,
    /// Messages appended
    pub count: usize,
    /// Byte position the batch was written at
    pub position: u64,
    /// Bytes written
    pub bytes: u64,
}

/// Cumulative stream counters.
///
/// These accumulate over the lifetime of the Stream and are never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamCounters {
    /// Successful appends that wrote at least one message
    pub appends: u64,
    /// Messages appended
    pub messages: u64,
    /// Bytes written by successful appends
    pub bytes_written: u64,
    /// Total fsync calls
    pub sync_calls: u64,
    /// Appends that failed after parsing
    pub failed_appends: u64,
}

struct StreamState {
    file: Box<dyn LogFile>,
    cursors: StreamCursors,
    appends_since_sync: usize,
    last_sync: Instant,
    counters: StreamCounters,
    needs_truncate: bool,
}

impl StreamState {
    fn sync(&mut self) -> std::io::Result<()> {
        self.counters.sync_calls += 1;
        self.file.sync()?;
        self.appends_since_sync = 0;
        self.last_sync = Instant::now();
        Ok(())
    }

    /// Drop anything a failed write left past the durable end.
    ///
    /// If the truncate fails, the stream stays marked and no further write
    /// is issued until [`repair`](Self::repair) succeeds.
    fn roll_back(&mut self, name: &StreamName) {
        self.counters.failed_appends += 1;
        let position = self.cursors.position;
        match self.file.truncate(position) {
            Ok(()) => self.needs_truncate = false,
            Err(e) => {
                self.needs_truncate = true;
                warn!(stream = %name, position, error = %e, "Failed to roll back partial write");
            }
        }
    }

    /// Finish a rollback that failed earlier.
    fn repair(&mut self) -> std::io::Result<()> {
        if self.needs_truncate {
            self.file.truncate(self.cursors.position)?;
            self.needs_truncate = false;
        }
        Ok(())
    }
}

/// One named, append-only sequence of messages.
///
/// Appends to the same stream run one at a time; appends to different
/// streams share nothing.
pub struct Stream {
    name: StreamName,
    path: Option<PathBuf>,
    durability: DurabilityMode,
    state: Mutex<StreamState>,
}

impl Stream {
    /// Create a stream over `file` with the given starting cursors.
    ///
    /// `cursors` must describe the file's current contents: an empty file
    /// takes [`StreamCursors::EMPTY`], an existing one the result of
    /// [`recover`].
    pub fn new(
        name: StreamName,
        file: impl LogFile + 'static,
        cursors: StreamCursors,
        durability: DurabilityMode,
    ) -> Self {
        Stream {
            name,
            path: None,
            durability,
            state: Mutex::new(StreamState {
                file: Box::new(file),
                cursors,
                appends_since_sync: 0,
                last_sync: Instant::now(),
                counters: StreamCounters::default(),
                needs_truncate: false,
            }),
        }
    }

    /// Record where the backing file lives.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Stream name.
    pub fn name(&self) -> &StreamName {
        &self.name
    }

    /// Backing file location, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Durability mode.
    pub fn durability(&self) -> DurabilityMode {
        self.durability
    }

    /// Append a batch and return the new tail offset.
    ///
    /// # Errors
    ///
    /// - [`StrandError::Framing`] if `buffer` is not a valid batch
    /// - [`StrandError::Write`] or [`StrandError::ShortWrite`] if the write
    ///   or its sync failed; the stream is unchanged
    /// - [`StrandError::Write`] if leftovers of an earlier failed append
    ///   still cannot be truncated away
    pub fn append(&self, buffer: Vec<u8>) -> StrandResult<Offset> {
        self.append_batch(buffer).map(|receipt| receipt.next_offset)
    }

    /// Append a batch and describe where it landed.
    ///
    /// Same contract as [`append`](Self::append). An empty batch succeeds
    /// without touching the file.
    pub fn append_batch(&self, buffer: Vec<u8>) -> StrandResult<AppendReceipt> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let unaligned = UnalignedSet::parse(buffer)?;
        let StreamCursors { tail, position } = state.cursors;

        if unaligned.is_empty() {
            return Ok(AppendReceipt {
                first_offset: tail,
                next_offset: tail,
                count: 0,
                position,
                bytes: 0,
            });
        }

        if let Err(source) = state.repair() {
            state.counters.failed_appends += 1;
            warn!(stream = %self.name, position, error = %source, "Stream still needs rollback");
            return Err(StrandError::Write {
                name: self.name.to_string(),
                position,
                source,
            });
        }

        let aligned = unaligned.align(tail);
        let bytes = aligned.as_bytes();

        let written = match state.file.write_at(bytes, position) {
            Ok(written) => written,
            Err(source) => {
                state.roll_back(&self.name);
                warn!(stream = %self.name, position, error = %source, "Stream write failed");
                return Err(StrandError::Write {
                    name: self.name.to_string(),
                    position,
                    source,
                });
            }
        };

        if written != bytes.len() {
            state.roll_back(&self.name);
            warn!(
                stream = %self.name,
                position,
                written,
                expected = bytes.len(),
                "Short stream write"
            );
            return Err(StrandError::ShortWrite {
                name: self.name.to_string(),
                position,
                written,
                expected: bytes.len(),
            });
        }

        let pending = state.appends_since_sync + 1;
        if self.durability.sync_due(pending, state.last_sync.elapsed()) {
            if let Err(source) = state.sync() {
                state.roll_back(&self.name);
                warn!(stream = %self.name, position, error = %source, "Stream sync failed");
                return Err(StrandError::Write {
                    name: self.name.to_string(),
                    position,
                    source,
                });
            }
            trace!(stream = %self.name, "Stream synced");
        } else {
            state.appends_since_sync = pending;
        }

        let receipt = AppendReceipt {
            first_offset: aligned.first_offset(),
            next_offset: aligned.next_offset(),
            count: aligned.count(),
            position,
            bytes: written as u64,
        };

        state.cursors = StreamCursors {
            tail: receipt.next_offset,
            position: position + receipt.bytes,
        };
        state.counters.appends += 1;
        state.counters.messages += receipt.count as u64;
        state.counters.bytes_written += receipt.bytes;

        debug!(
            stream = %self.name,
            first_offset = %receipt.first_offset,
            tail = %receipt.next_offset,
            bytes = receipt.bytes,
            "Appended batch"
        );

        Ok(receipt)
    }

    /// Next offset this stream will assign.
    pub fn tail(&self) -> Offset {
        self.state.lock().cursors.tail
    }

    /// Byte position the next batch will be written at.
    pub fn position(&self) -> u64 {
        self.state.lock().cursors.position
    }

    /// Tail and position from a single lock acquisition.
    pub fn cursors(&self) -> StreamCursors {
        self.state.lock().cursors
    }

    /// Snapshot of the cumulative counters.
    pub fn counters(&self) -> StreamCounters {
        self.state.lock().counters.clone()
    }

    /// Fsync if acknowledged appends have waited longer than the flush
    /// interval.
    ///
    /// Lets `Standard` mode keep its interval while the stream is idle.
    /// Returns `true` if a sync was performed. Always `false` in `Always`
    /// mode, where nothing is ever left unsynced.
    pub fn sync_if_overdue(&self) -> StrandResult<bool> {
        let interval = match self.durability.flush_interval() {
            Some(interval) => interval,
            None => return Ok(false),
        };

        let mut state = self.state.lock();
        if state.appends_since_sync == 0 || state.last_sync.elapsed() < interval {
            return Ok(false);
        }

        let position = state.cursors.position;
        let pending = state.appends_since_sync;
        state.sync().map_err(|source| StrandError::Write {
            name: self.name.to_string(),
            position,
            source,
        })?;
        trace!(stream = %self.name, appends = pending, "Synced idle stream");
        Ok(true)
    }

    /// Force an fsync regardless of durability mode.
    pub fn sync(&self) -> StrandResult<()> {
        let mut state = self.state.lock();
        let position = state.cursors.position;
        state.sync().map_err(|source| StrandError::Write {
            name: self.name.to_string(),
            position,
            source,
        })
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cursors = self.cursors();
        f.debug_struct("Stream")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("durability", &self.durability)
            .field("tail", &cursors.tail)
            .field("position", &cursors.position)
            .finish()
    }
}
