//! Helpers shared by the descriptor and MIDI decode paths.

pub mod diagnostic;
pub(crate) mod reader;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
