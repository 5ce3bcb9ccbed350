//! Stream registry
//!
//! Maps stream names to open [`Stream`]s, creating each one lazily the first
//! time it is asked for. At most one Stream is ever successfully created per
//! name; every caller that sees it gets the same `Arc`.
//!
//! Lookups of existing streams take only the read lock. Creation takes the
//! write lock and checks again before calling the creator, so concurrent
//! first requests for one name produce a single creation. A failed creation
//! is returned to its caller and nothing is cached, so the next request
//! tries again.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use strand_core::{StrandResult, StreamName};
use strand_durability::{Directory, Stream};
use tracing::{debug, info, warn, Span};

/// Constructs the Stream for a name not yet in the registry.
pub type StreamCreator = Box<dyn Fn(&StreamName) -> StrandResult<Stream> + Send + Sync>;

/// Name to Stream mapping with lazy, exactly-once creation.
pub struct StreamRegistry {
    streams: RwLock<HashMap<StreamName, Arc<Stream>>>,
    create: StreamCreator,
    span: Span,
}

impl StreamRegistry {
    /// Registry that builds streams with `create`.
    ///
    /// Every event the registry emits is parented to `span`.
    pub fn new<F>(create: F, span: Span) -> Self
    where
        F: Fn(&StreamName) -> StrandResult<Stream> + Send + Sync + 'static,
    {
        StreamRegistry {
            streams: RwLock::new(HashMap::new()),
            create: Box::new(create),
            span,
        }
    }

    /// Registry backed by stream files under `directory`.
    pub fn for_directory(directory: Directory, span: Span) -> Self {
        Self::new(move |name| directory.open_or_create(name), span)
    }

    /// Get the stream called `name`, creating it if needed.
    pub fn get(&self, name: &StreamName) -> StrandResult<Arc<Stream>> {
        if let Some(stream) = self.streams.read().get(name) {
            return Ok(Arc::clone(stream));
        }

        let mut streams = self.streams.write();
        if let Some(stream) = streams.get(name) {
            return Ok(Arc::clone(stream));
        }

        let stream = match (self.create)(name) {
            Ok(stream) => Arc::new(stream),
            Err(e) => {
                warn!(parent: &self.span, stream = %name, error = %e, "Stream creation failed");
                return Err(e);
            }
        };
        streams.insert(name.clone(), Arc::clone(&stream));

        debug!(
            parent: &self.span,
            stream = %name,
            open_streams = streams.len(),
            "Registered stream"
        );
        Ok(stream)
    }

    /// Number of open streams.
    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    /// True if no stream has been opened.
    pub fn is_empty(&self) -> bool {
        self.streams.read().is_empty()
    }

    /// True if `name` is open.
    pub fn contains(&self, name: &StreamName) -> bool {
        self.streams.read().contains_key(name)
    }

    /// Names of the open streams, sorted.
    pub fn names(&self) -> Vec<StreamName> {
        let mut names: Vec<StreamName> = self.streams.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Fsync every open stream.
    ///
    /// Attempts all streams and returns the first error.
    pub fn sync_all(&self) -> StrandResult<()> {
        let streams: Vec<Arc<Stream>> = self.streams.read().values().cloned().collect();

        let mut first_error = None;
        for stream in &streams {
            if let Err(e) = stream.sync() {
                warn!(
                    parent: &self.span,
                    stream = %stream.name(),
                    error = %e,
                    "Stream sync failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(parent: &self.span, streams = streams.len(), "Synced all streams");
                Ok(())
            }
        }
    }

    /// Fsync every open stream whose unsynced appends have waited longer
    /// than its flush interval, and return how many were synced.
    ///
    /// A failed sync is logged and left for the next call.
    pub fn sync_overdue(&self) -> usize {
        let streams: Vec<Arc<Stream>> = self.streams.read().values().cloned().collect();

        let mut synced = 0;
        for stream in &streams {
            match stream.sync_if_overdue() {
                Ok(true) => synced += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        parent: &self.span,
                        stream = %stream.name(),
                        error = %e,
                        "Overdue stream sync failed"
                    );
                }
            }
        }

        if synced > 0 {
            debug!(parent: &self.span, streams = synced, "Synced overdue streams");
        }
        synced
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("streams", &self.names())
            .finish()
    }
}
