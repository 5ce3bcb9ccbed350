//! Backing file abstraction for streams.
//!
//! A stream only needs three things from its storage: a positional write, an
//! fsync, and a truncate to roll back a failed write. [`LogFile`] captures
//! exactly that so the append path can be exercised against injected
//! failures.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

/// Positional, append-only storage for one stream.
pub trait LogFile: Send {
    /// Write `buf` starting at byte `position`.
    ///
    /// Returns the number of bytes stored, which may be less than
    /// `buf.len()` if the device stops accepting data.
    fn write_at(&mut self, buf: &[u8], position: u64) -> io::Result<usize>;

    /// Flush written data to stable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Cut the file back to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn write_at(&mut self, buf: &[u8], position: u64) -> io::Result<usize> {
        self.seek(SeekFrom::Start(position))?;

        let mut written = 0;
        while written < buf.len() {
            match self.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl<T: LogFile + ?Sized> LogFile for Box<T> {
    fn write_at(&mut self, buf: &[u8], position: u64) -> io::Result<usize> {
        (**self).write_at(buf, position)
    }

    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate(len)
    }
}
