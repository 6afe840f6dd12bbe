//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets, codes and sizes (source of truth)
//! - `reader`: bounded byte access and protocol conventions
//! - `parser`: domain-level decoding (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O. Recoverable problems are reported
//! as [`common::Diagnostic`] values next to the decoded output.

pub mod common;
pub mod descriptor;
pub mod midi;
