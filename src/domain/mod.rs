//! Domain layer for loges-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `RawMessage` / `SourceMetadata`: what the producer hands us
//! - `OutputDocument`: the Logstash-shaped document sent to the backend
//! - `AdapterError`: top-level construction error

pub mod document;
pub mod error;
pub mod message;

pub use document::{FieldMap, IndexRequest, OutputDocument};
pub use error::AdapterError;
pub use message::{RawMessage, SourceMetadata, UNKNOWN_HOST};
