use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Severity attached to a diagnostic. Nothing in the decode paths is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }

    /// Sort rank: warnings first.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Severity::Warning => 0,
            Severity::Info => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnsupportedVersion,
    MissingVersion,
    InvalidVersion,
    VersionMismatch,
    SessionConflict,
    UnrecognizedSubtype,
    InvalidLength,
    ShortBody,
    LengthOverrun,
    UndecodedTail,
    MidiUndecodedTail,
    UnhandledBulk,
    SysExIncomplete,
}

impl DiagnosticKind {
    /// Stable identifier used in reports.
    pub fn id(self) -> &'static str {
        match self {
            DiagnosticKind::UnsupportedVersion => "UA-DESC-UNSUPPORTED-VERSION",
            DiagnosticKind::MissingVersion => "UA-DESC-MISSING-VERSION",
            DiagnosticKind::InvalidVersion => "UA-DESC-INVALID-BCD",
            DiagnosticKind::VersionMismatch => "UA-DESC-VERSION-MISMATCH",
            DiagnosticKind::SessionConflict => "UA-DESC-SESSION-CONFLICT",
            DiagnosticKind::UnrecognizedSubtype => "UA-DESC-UNRECOGNIZED-SUBTYPE",
            DiagnosticKind::InvalidLength => "UA-DESC-INVALID-LENGTH",
            DiagnosticKind::ShortBody => "UA-DESC-SHORT-BODY",
            DiagnosticKind::LengthOverrun => "UA-DESC-LENGTH-OVERRUN",
            DiagnosticKind::UndecodedTail => "UA-DESC-UNDECODED-TAIL",
            DiagnosticKind::MidiUndecodedTail => "UA-MIDI-UNDECODED-TAIL",
            DiagnosticKind::UnhandledBulk => "UA-BULK-UNHANDLED",
            DiagnosticKind::SysExIncomplete => "UA-MIDI-SYSEX-INCOMPLETE",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::UnrecognizedSubtype
            | DiagnosticKind::UnhandledBulk
            | DiagnosticKind::SysExIncomplete => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Summary line used when diagnostics are aggregated per id.
    pub fn summary(self) -> &'static str {
        match self {
            DiagnosticKind::UnsupportedVersion => "Audio class version is neither 1 nor 2",
            DiagnosticKind::MissingVersion => "Descriptor decoded before any audio control header",
            DiagnosticKind::InvalidVersion => "bcdADC contains a nibble above 9",
            DiagnosticKind::VersionMismatch => "Header version differs from the session version",
            DiagnosticKind::SessionConflict => "Session is bound to another class driver",
            DiagnosticKind::UnrecognizedSubtype => "Descriptor subtype not decoded",
            DiagnosticKind::InvalidLength => "Descriptor length below the common prefix",
            DiagnosticKind::ShortBody => "Descriptor body shorter than its fixed fields",
            DiagnosticKind::LengthOverrun => "Descriptor length exceeds the supplied bytes",
            DiagnosticKind::UndecodedTail => "Trailing descriptor bytes left undecoded",
            DiagnosticKind::MidiUndecodedTail => "Bulk length is not a multiple of 4",
            DiagnosticKind::UnhandledBulk => "Bulk data on a non-MIDI interface",
            DiagnosticKind::SysExIncomplete => "SysEx message never completed",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A recoverable decode condition attached to the output it concerns.
///
/// `offset` and `length` locate the affected bytes relative to the start of
/// the descriptor or bulk buffer that produced the diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub offset: usize,
    pub length: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, range: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            offset: range.start,
            length: range.end.saturating_sub(range.start),
            message: message.into(),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }
}
