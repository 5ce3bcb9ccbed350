//! Store struct and open/close logic
//!
//! The Store is what a network front end talks to. It owns:
//! - The validated configuration
//! - The stream registry, backed by a [`Directory`] under `data_dir`
//! - In `standard` mode, a flush thread that syncs idle streams
//! - The tracing span every store event is emitted under
//!
//! Appends go straight through to the stream's own lock. The Store adds name
//! validation and nothing else: no queueing, no retries.

pub mod config;
mod flusher;
mod registry;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use registry::{StreamCreator, StreamRegistry};

use flusher::Flusher;
use parking_lot::Mutex;
use std::sync::Arc;
use strand_core::{Offset, StrandError, StrandResult, StreamName};
use strand_durability::{AppendReceipt, Directory, Stream};
use tracing::{debug, info, info_span, warn, Span};

/// Handle to a directory of streams.
///
/// `Store` is `Send + Sync`; share it behind an `Arc` across request
/// handlers. Dropping it stops the flush thread and fsyncs every open
/// stream.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    directory: Directory,
    registry: Arc<StreamRegistry>,
    flusher: Mutex<Option<Flusher>>,
    span: Span,
}

impl Store {
    /// Open a store with its own `store` span.
    pub fn open(config: StoreConfig) -> StrandResult<Store> {
        let span = info_span!("store", data_dir = %config.data_dir.display());
        Self::with_span(config, span)
    }

    /// Open a store whose events are all emitted under `span`.
    ///
    /// Creates `data_dir` if needed. Streams already on disk are opened
    /// lazily, on first use.
    ///
    /// # Errors
    ///
    /// - [`StrandError::Config`] if the configuration is invalid
    /// - [`StrandError::Io`] if the data directory cannot be created or the
    ///   flush thread cannot be started
    pub fn with_span(config: StoreConfig, span: Span) -> StrandResult<Store> {
        let _enter = span.enter();

        config.validate()?;
        let durability = config.durability_mode()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let directory =
            Directory::new(&config.data_dir, durability).with_extension(config.extension.clone());
        let registry = Arc::new(StreamRegistry::for_directory(directory.clone(), span.clone()));

        let flusher = match durability.flush_interval() {
            Some(interval) => Some(Flusher::spawn(Arc::clone(&registry), interval, span.clone())?),
            None => None,
        };

        info!(
            data_dir = %config.data_dir.display(),
            durability = durability.description(),
            "Opened store"
        );

        drop(_enter);
        Ok(Store {
            config,
            directory,
            registry,
            flusher: Mutex::new(flusher),
            span,
        })
    }

    /// Append a raw wire batch to `name` and return the new tail.
    ///
    /// The stream is created on first use.
    pub fn append(&self, name: &str, buffer: Vec<u8>) -> StrandResult<Offset> {
        self.append_batch(name, buffer).map(|receipt| receipt.next_offset)
    }

    /// Append a raw wire batch to `name` and describe where it landed.
    pub fn append_batch(&self, name: &str, buffer: Vec<u8>) -> StrandResult<AppendReceipt> {
        let _enter = self.span.enter();
        let stream = self.stream(name)?;
        stream.append_batch(buffer)
    }

    /// Liveness check. Touches no state.
    pub fn ping(&self) -> StrandResult<()> {
        debug!(parent: &self.span, "ping");
        Ok(())
    }

    /// The stream called `name`, created on first use.
    pub fn stream(&self, name: &str) -> StrandResult<Arc<Stream>> {
        let name = StreamName::new(name).map_err(|e| StrandError::invalid_stream_name(name, e))?;
        self.registry.get(&name)
    }

    /// Next offset `name` will assign.
    ///
    /// Opens the stream if it is not already open, so a stream that exists
    /// only on disk reports its recovered tail.
    pub fn tail(&self, name: &str) -> StrandResult<Offset> {
        let _enter = self.span.enter();
        Ok(self.stream(name)?.tail())
    }

    /// Names of the currently open streams, sorted.
    pub fn streams(&self) -> Vec<StreamName> {
        self.registry.names()
    }

    /// Names of every stream file under `data_dir`, sorted.
    pub fn stored_streams(&self) -> StrandResult<Vec<StreamName>> {
        self.directory.list()
    }

    /// Fsync every open stream.
    pub fn sync_all(&self) -> StrandResult<()> {
        let _enter = self.span.enter();
        self.registry.sync_all()
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The registry of open streams.
    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop(&self.span);
        }
        if let Err(e) = self.registry.sync_all() {
            warn!(parent: &self.span, error = %e, "Failed to sync streams on close");
        }
    }
}
