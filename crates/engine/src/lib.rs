//! Store engine for strand
//!
//! This crate ties the lower layers into a service:
//! - Store: open/close, name validation, append entry points, idle flush
//! - Registry: lazy, exactly-once stream creation
//! - Configuration: `strand.toml`
//!
//! The engine is the only component that knows about:
//! - Which streams are open
//! - Where the data directory is

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod store;

pub use store::{Store, StoreConfig, StreamCreator, StreamRegistry, CONFIG_FILE_NAME};
