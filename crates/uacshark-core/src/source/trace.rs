//! JSON trace file source.
//!
//! A trace is a list of records already demuxed by a capture tool:
//!
//! ```json
//! { "records": [
//!   { "session": "dev3:if1", "kind": "descriptor", "interface_subclass": 1,
//!     "ts": 12.5, "data": "0924010001090001 01" }
//! ] }
//! ```
//!
//! `interface_class` defaults to audio. Whitespace inside `data` is ignored.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::protocols::descriptor::layout::IF_CLASS_AUDIO;
use crate::source::{RecordKind, RecordSource, SourceError, TraceRecord};

#[derive(Debug, Deserialize)]
struct TraceFile {
    records: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    session: String,
    kind: RecordKind,
    #[serde(default = "default_interface_class")]
    interface_class: u8,
    interface_subclass: u8,
    #[serde(default)]
    ts: Option<f64>,
    data: String,
}

fn default_interface_class() -> u8 {
    IF_CLASS_AUDIO
}

pub struct TraceFileSource {
    records: std::vec::IntoIter<RawRecord>,
    next_index: u64,
}

impl TraceFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        let trace: TraceFile = serde_json::from_str(text)?;
        Ok(Self {
            records: trace.records.into_iter(),
            next_index: 0,
        })
    }
}

impl RecordSource for TraceFileSource {
    fn next_record(&mut self) -> Result<Option<TraceRecord>, SourceError> {
        let Some(raw) = self.records.next() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;

        if raw.session.is_empty() {
            return Err(SourceError::InvalidRecord {
                record: index,
                message: "empty session key".to_string(),
            });
        }
        if let Some(ts) = raw.ts {
            if !ts.is_finite() || ts < 0.0 {
                return Err(SourceError::InvalidRecord {
                    record: index,
                    message: format!("invalid timestamp {ts}"),
                });
            }
        }
        let compact: String = raw
            .data
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let data = hex::decode(&compact).map_err(|err| SourceError::Hex {
            record: index,
            message: err.to_string(),
        })?;

        Ok(Some(TraceRecord {
            index,
            session: raw.session,
            kind: raw.kind,
            interface_class: raw.interface_class,
            interface_subclass: raw.interface_subclass,
            ts: raw.ts,
            data,
        }))
    }
}
