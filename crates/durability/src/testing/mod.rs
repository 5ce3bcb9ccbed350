//! Testing utilities for stream storage
//!
//! - **FaultyFile**: in-memory [`LogFile`] with injectable write, sync and
//!   truncate failures, for exercising the append rollback path
//!
//! # Example
//!
//! ```ignore
//! use strand_durability::testing::{FaultyFile, Faults};
//!
//! let faults = Faults::new();
//! let stream = Stream::new(name, FaultyFile::in_memory(faults.clone()), cursors, mode);
//! faults.fail_next_write();
//! assert!(stream.append(batch).is_err());
//! ```

use crate::stream::LogFile;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct FaultState {
    contents: Vec<u8>,
    fail_next_write: bool,
    short_next_write: Option<usize>,
    fail_next_sync: bool,
    failing_truncates: usize,
    syncs: u64,
}

/// Shared control handle for a [`FaultyFile`].
///
/// Each armed fault fires on the next matching call. Truncate failures can be
/// armed for several calls in a row.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    state: Arc<Mutex<FaultState>>,
}

impl Faults {
    /// New handle with no faults armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next write stores half the buffer, then fails.
    pub fn fail_next_write(&self) {
        self.state.lock().fail_next_write = true;
    }

    /// Next write stores at most `len` bytes and reports that count.
    pub fn short_next_write(&self, len: usize) {
        self.state.lock().short_next_write = Some(len);
    }

    /// Next sync fails.
    pub fn fail_next_sync(&self) {
        self.state.lock().fail_next_sync = true;
    }

    /// The next `count` truncates fail and leave the contents as they are.
    pub fn fail_next_truncates(&self, count: usize) {
        self.state.lock().failing_truncates = count;
    }

    /// Copy of the file contents.
    pub fn contents(&self) -> Vec<u8> {
        self.state.lock().contents.clone()
    }

    /// Number of successful syncs.
    pub fn syncs(&self) -> u64 {
        self.state.lock().syncs
    }
}

/// In-memory log file driven by a [`Faults`] handle.
#[derive(Debug, Clone)]
pub struct FaultyFile {
    faults: Faults,
}

impl FaultyFile {
    /// Empty in-memory file.
    pub fn in_memory(faults: Faults) -> Self {
        FaultyFile { faults }
    }
}

fn store(contents: &mut Vec<u8>, buf: &[u8], position: u64) {
    let start = position as usize;
    let end = start + buf.len();
    if contents.len() < end {
        contents.resize(end, 0);
    }
    contents[start..end].copy_from_slice(buf);
}

impl LogFile for FaultyFile {
    fn write_at(&mut self, buf: &[u8], position: u64) -> io::Result<usize> {
        let mut state = self.faults.state.lock();

        if state.fail_next_write {
            state.fail_next_write = false;
            store(&mut state.contents, &buf[..buf.len() / 2], position);
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }

        let len = match state.short_next_write.take() {
            Some(limit) => limit.min(buf.len()),
            None => buf.len(),
        };
        store(&mut state.contents, &buf[..len], position);
        Ok(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut state = self.faults.state.lock();
        if state.fail_next_sync {
            state.fail_next_sync = false;
            return Err(io::Error::new(io::ErrorKind::Other, "injected sync failure"));
        }
        state.syncs += 1;
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let mut state = self.faults.state.lock();
        if state.failing_truncates > 0 {
            state.failing_truncates -= 1;
            return Err(io::Error::new(io::ErrorKind::Other, "injected truncate failure"));
        }
        state.contents.truncate(len as usize);
        Ok(())
    }
}
