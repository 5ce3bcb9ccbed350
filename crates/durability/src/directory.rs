//! Stream file resolution
//!
//! Maps a stream name to `<root>/<name>.<extension>` and opens the file as a
//! [`Stream`], creating it if absent and recovering its cursors if present.

use crate::mode::DurabilityMode;
use crate::stream::{recover, RecoveryError, Stream, StreamCursors};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use strand_core::{StrandError, StrandResult, StreamName};
use tracing::info;

/// Default stream file extension
pub const DEFAULT_EXTENSION: &str = "str";

/// Resolves stream names to files under one root directory.
#[derive(Debug, Clone)]
pub struct Directory {
    root: PathBuf,
    extension: String,
    durability: DurabilityMode,
}

impl Directory {
    /// Resolver rooted at `root` with the default extension.
    pub fn new(root: impl Into<PathBuf>, durability: DurabilityMode) -> Self {
        Directory {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            durability,
        }
    }

    /// Use `extension` (without the dot) for stream files.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// File backing `name`.
    pub fn path_for(&self, name: &StreamName) -> PathBuf {
        self.root.join(format!("{}.{}", name.as_str(), self.extension))
    }

    /// Open the stream called `name`, creating its file if needed.
    ///
    /// # Errors
    ///
    /// - [`StrandError::StreamCreation`] on any I/O failure
    /// - [`StrandError::Corruption`] if an existing file fails recovery
    pub fn open_or_create(&self, name: &StreamName) -> StrandResult<Stream> {
        let path = self.path_for(name);
        let creation_error = |source: io::Error| StrandError::StreamCreation {
            name: name.to_string(),
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(&creation_error)?;

        let created = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path);

        match created {
            Ok(file) => {
                info!(stream = %name, path = %path.display(), "Created stream");
                Ok(
                    Stream::new(name.clone(), file, StreamCursors::EMPTY, self.durability)
                        .with_path(path),
                )
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => self.reopen(name, path),
            Err(e) => Err(creation_error(e)),
        }
    }

    fn reopen(&self, name: &StreamName, path: PathBuf) -> StrandResult<Stream> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| StrandError::StreamCreation {
                name: name.to_string(),
                path: path.clone(),
                source,
            })?;

        let recovery = recover(&mut file, &path).map_err(|e| match e {
            RecoveryError::Io(source) => StrandError::StreamCreation {
                name: name.to_string(),
                path: path.clone(),
                source,
            },
            RecoveryError::Corrupt { position, reason } => StrandError::Corruption {
                name: name.to_string(),
                position,
                reason,
            },
        })?;

        info!(
            stream = %name,
            path = %path.display(),
            tail = %recovery.cursors.tail,
            position = recovery.cursors.position,
            truncated_bytes = recovery.truncated_bytes,
            "Reopened stream"
        );

        Ok(Stream::new(name.clone(), file, recovery.cursors, self.durability).with_path(path))
    }

    /// Names of the stream files currently under the root, sorted.
    ///
    /// Files whose stem is not a valid stream name are skipped. A missing
    /// root yields an empty list.
    pub fn list(&self) -> StrandResult<Vec<StreamName>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| StreamName::new(s).ok())
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
