use thiserror::Error;

use crate::protocols::common::DiagnosticKind;
use crate::session::ProtocolFamily;

/// Errors returned by descriptor reading and parsing.
///
/// Only `TooShort` on the common prefix and `InvalidLength` escape
/// `decode_descriptor`; the others are turned into diagnostics.
///
/// # Examples
/// ```
/// use uacshark_core::DescriptorError;
///
/// let err = DescriptorError::UnsupportedVersion { major: 3 };
/// assert!(err.to_string().contains("unsupported audio class version"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("payload too short: need {needed} bytes for {field}, got {actual}")]
    TooShort {
        field: &'static str,
        needed: usize,
        actual: usize,
    },
    #[error("invalid descriptor length: {length}")]
    InvalidLength { length: u8 },
    #[error("invalid BCD digit in {value:#04x}")]
    BcdOutOfRange { value: u8 },
    #[error("unsupported audio class version: {major}")]
    UnsupportedVersion { major: u8 },
    #[error("no audio control header decoded for this session")]
    MissingVersion,
    #[error("session already bound to {bound}")]
    SessionConflict { bound: ProtocolFamily },
}

impl DescriptorError {
    pub(crate) fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            DescriptorError::TooShort { .. } => DiagnosticKind::ShortBody,
            DescriptorError::InvalidLength { .. } => DiagnosticKind::InvalidLength,
            DescriptorError::BcdOutOfRange { .. } => DiagnosticKind::InvalidVersion,
            DescriptorError::UnsupportedVersion { .. } => DiagnosticKind::UnsupportedVersion,
            DescriptorError::MissingVersion => DiagnosticKind::MissingVersion,
            DescriptorError::SessionConflict { .. } => DiagnosticKind::SessionConflict,
        }
    }

    /// Refusals consume zero body bytes; short reads keep what was decoded.
    pub(crate) fn is_refusal(&self) -> bool {
        !matches!(self, DescriptorError::TooShort { .. })
    }
}
