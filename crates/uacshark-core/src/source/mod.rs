mod trace;

pub use trace::TraceFileSource;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Class-specific descriptors read from a configuration descriptor.
    Descriptor,
    /// Payload of one bulk transfer.
    Bulk,
}

/// One demuxed byte range with its interface classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    /// Position in the trace, starting at 0.
    pub index: u64,
    pub session: String,
    pub kind: RecordKind,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub ts: Option<f64>,
    pub data: Vec<u8>,
}

pub trait RecordSource {
    fn next_record(&mut self) -> Result<Option<TraceRecord>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record {record}: invalid hex data: {message}")]
    Hex { record: u64, message: String },
    #[error("record {record}: {message}")]
    InvalidRecord { record: u64, message: String },
}
