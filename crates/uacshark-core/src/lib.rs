//! uacshark core library: USB Audio class descriptors and USB-MIDI SysEx.
//!
//! Two decode paths share one per-interface [`Session`]:
//! - class-specific audio descriptors (audio class 1.0 and 2.0) are decoded
//!   field by field, the layout chosen from the version the audio control
//!   header declared on that session;
//! - USB-MIDI bulk buffers are split into four-byte event packets and
//!   System Exclusive messages are reassembled across packets and buffers.
//!
//! Protocol modules follow the layout/reader/parser/error split and do no
//! I/O. The `source` layer reads demuxed records from a JSON trace and the
//! analysis layer aggregates them into a deterministic [`Report`].
//!
//! Invariants:
//! - A session's version context is created once and never changes.
//! - Callers always advance by a descriptor's declared length.
//! - Report ordering is stable across runs.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use uacshark_core::analyze_trace_file;
//!
//! let report = analyze_trace_file(Path::new("trace.json"))?;
//! println!("report version: {}", report.report_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod analysis;
pub mod protocols;
pub mod session;
mod source;

pub use analysis::{AnalysisError, analyze_source, analyze_trace_file};
pub use protocols::common::{Diagnostic, DiagnosticKind, Severity};
pub use protocols::descriptor::reader::{Field, FieldValue};
pub use protocols::descriptor::{
    AdcVersion, AudioSubclass, DecodedDescriptor, DescriptorError, DescriptorKind,
    DescriptorWalk, InterfaceInfo, Layout, VersionContext, bcd44_to_dec, decode_descriptor,
    decode_descriptors,
};
pub use protocols::midi::{
    BufferOutcome, CodeIndex, EventPacket, ReassembledMessage, SysExReassembler, split_events,
};
pub use session::{ProtocolFamily, Session, SessionError};
pub use source::{RecordKind, RecordSource, SourceError, TraceFileSource, TraceRecord};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no record carries a time.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Aggregated analysis report with deterministic ordering.
///
/// # Examples
/// ```
/// use uacshark_core::make_stub_report;
///
/// let report = make_stub_report("trace.json", 123);
/// assert_eq!(report.report_version, uacshark_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp of the last record, or the epoch default.
    pub generated_at: String,

    pub input: InputInfo,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_summary: Option<TraceSummary>,
    /// Decoded descriptors in arrival order.
    pub descriptors: Vec<DescriptorSummary>,
    /// Event counts by session then cable.
    pub midi: Vec<MidiSummary>,
    /// Delivered SysEx messages in delivery order.
    pub sysex: Vec<SysExSummary>,
    /// Diagnostics aggregated per id, warnings first.
    pub diagnostics: Vec<DiagnosticSummary>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Input trace metadata embedded in reports.
///
/// # Examples
/// ```
/// use uacshark_core::InputInfo;
///
/// let input = InputInfo {
///     path: "trace.json".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the analyzer.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Record counts and time bounds of a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    pub records_total: u64,
    pub descriptor_records: u64,
    pub bulk_records: u64,
    /// Distinct session keys seen.
    pub sessions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// One decoded class-specific descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorSummary {
    pub session: String,
    /// Index of the trace record holding the descriptor.
    pub record: u64,
    /// Offset of the descriptor within the record.
    pub offset: u64,
    /// Descriptor kind name (e.g., "Feature Unit").
    pub kind: String,
    /// `interface` or `endpoint`.
    pub class: String,
    pub subtype: u8,
    /// Declared `bLength`.
    pub length: u8,
    pub consumed: u64,
    /// Every field read, offsets relative to the descriptor.
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undecoded: Option<ByteRange>,
}

/// Half-open byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Event counts for one cable of one session.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
///
/// use uacshark_core::MidiSummary;
///
/// let summary = MidiSummary {
///     session: "dev3:if2".to_string(),
///     cable: 0,
///     events: 2,
///     sysex_events: 0,
///     code_index: BTreeMap::from([("0x9 Note-on".to_string(), 2)]),
/// };
/// assert_eq!(summary.events, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiSummary {
    pub session: String,
    pub cable: u8,
    pub events: u64,
    pub sysex_events: u64,
    /// Events per code index, keyed `"0x<cin> <name>"`.
    pub code_index: BTreeMap<String, u64>,
}

/// One delivered SysEx message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SysExSummary {
    pub session: String,
    pub cable: u8,
    pub length: u64,
    /// Message bytes in lowercase hex, `F0` and `F7` included.
    pub bytes: String,
    /// Record holding the first fragment.
    pub first_record: u64,
    /// Record in which the message was delivered.
    pub completed_record: u64,
    pub fragments: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Diagnostics of one id aggregated over the trace.
///
/// # Examples
/// ```
/// use uacshark_core::DiagnosticSummary;
///
/// let summary = DiagnosticSummary {
///     id: "UA-DESC-UNDECODED-TAIL".to_string(),
///     severity: "warning".to_string(),
///     message: "Descriptor bytes left undecoded".to_string(),
///     count: 1,
///     examples: vec!["session dev3:if1 record 0 @ 9: 2 trailing bytes not decoded".to_string()],
/// };
/// assert_eq!(summary.count, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    /// Stable identifier (e.g., `UA-DESC-SHORT-BODY`).
    pub id: String,
    /// Severity label (`warning` or `info`).
    pub severity: String,
    pub message: String,
    pub count: u64,
    /// At most three examples, formatted as `session <key> record <n> @ <offset>: <detail>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use uacshark_core::make_stub_report;
///
/// let report = make_stub_report("trace.json", 123);
/// assert_eq!(report.tool.name, "uacshark");
/// assert!(report.descriptors.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "uacshark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        trace_summary: None,
        descriptors: vec![],
        midi: vec![],
        sysex: vec![],
        diagnostics: vec![],
    }
}
