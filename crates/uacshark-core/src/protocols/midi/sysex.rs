//! SysEx reassembly across event packets and bulk buffers.
//!
//! Each cable has at most one open accumulation. A start/continue fragment
//! (CIN 0x4) appends three bytes; an end fragment (CIN 0x5..0x7) appends its
//! one to three bytes and seals the accumulation into a completed message.
//!
//! Delivery is gated per buffer: nothing is handed out until the last
//! SysEx-bearing event of the buffer has been processed, whatever its code
//! index. At that point every sealed message (all cables, completion order)
//! is delivered, and the gate records whether that last event ended a
//! message or left one open. Open accumulations carry over to the next
//! buffer. There is no timeout; an unterminated message waits until the
//! session is dropped.

use std::collections::BTreeMap;
use std::ops::Range;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::parser::{EventPacket, MidiEventSplitter};
use crate::protocols::common::{Diagnostic, DiagnosticKind};

/// Payload slice of one SysEx-bearing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysExFragment<'a> {
    pub cable: u8,
    /// One to three bytes.
    pub payload: &'a [u8],
    pub terminal: bool,
}

/// Where a delivered message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOrigin {
    /// Caller-supplied id of the buffer holding the first fragment.
    pub first_buffer: u64,
    /// Caller-supplied id of the buffer in which delivery happened.
    pub completed_buffer: u64,
    /// Index of the terminating event within that buffer.
    pub completed_event: usize,
    pub fragments: usize,
}

/// A complete SysEx message, owned by the receiver once delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassembledMessage {
    pub cable: u8,
    pub bytes: Vec<u8>,
    pub origin: MessageOrigin,
}

/// Why the buffer gate fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateNote {
    /// The last SysEx event of the buffer ended a message.
    Reassembled,
    /// The last SysEx event of the buffer left its message open.
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysExGate {
    pub cable: u8,
    pub event_index: usize,
    pub note: GateNote,
}

/// Everything produced by one bulk buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferOutcome {
    pub buffer_id: u64,
    pub events: Vec<EventPacket>,
    /// Every message here was sealed by an end fragment on its own cable.
    /// `gate.note` only describes the buffer's last SysEx event, which may
    /// sit on another cable.
    pub messages: Vec<ReassembledMessage>,
    /// Present when the buffer held at least one SysEx-bearing event.
    pub gate: Option<SysExGate>,
    pub undecoded: Option<Range<usize>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// An accumulation never terminated, as seen at teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSysEx {
    pub cable: u8,
    pub bytes: Vec<u8>,
    pub fragments: usize,
    pub first_buffer: u64,
}

#[derive(Debug, Clone)]
struct Accumulation {
    bytes: Vec<u8>,
    fragments: usize,
    first_buffer: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SysExReassembler {
    open: BTreeMap<u8, Accumulation>,
    sealed: Vec<ReassembledMessage>,
}

impl SysExReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `data` into events and run them through the reassembler.
    ///
    /// `buffer_id` is an opaque caller id (a record index, a URB tag) copied
    /// into the origin of delivered messages.
    pub fn process_buffer(&mut self, buffer_id: u64, data: &[u8]) -> BufferOutcome {
        let splitter = MidiEventSplitter::new(data);
        let undecoded = splitter.undecoded_tail();
        let events: Vec<EventPacket> = splitter.collect();

        let mut diagnostics = Vec::new();
        if let Some(tail) = undecoded.clone() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::MidiUndecodedTail,
                tail.clone(),
                format!("{} trailing bytes after the last event packet", tail.len()),
            ));
        }

        let mut gate = None;
        let mut messages = Vec::new();
        for (index, event) in events.iter().enumerate() {
            let Some(fragment) = event.sysex_fragment() else {
                continue;
            };
            self.push_fragment(&fragment, buffer_id, index);
            if !sysex_follows(&events, index) {
                let note = if fragment.terminal {
                    GateNote::Reassembled
                } else {
                    GateNote::Fragment
                };
                gate = Some(SysExGate {
                    cable: fragment.cable,
                    event_index: index,
                    note,
                });
                messages = std::mem::take(&mut self.sealed);
                for message in &messages {
                    info!(
                        "sysex delivered on cable {}: {} bytes in {} fragments",
                        message.cable,
                        message.bytes.len(),
                        message.origin.fragments
                    );
                }
            }
        }

        BufferOutcome {
            buffer_id,
            events,
            messages,
            gate,
            undecoded,
            diagnostics,
        }
    }

    fn push_fragment(&mut self, fragment: &SysExFragment<'_>, buffer_id: u64, index: usize) {
        let accumulation = self.open.entry(fragment.cable).or_insert_with(|| {
            debug!("sysex accumulation opened on cable {}", fragment.cable);
            Accumulation {
                bytes: Vec::new(),
                fragments: 0,
                first_buffer: buffer_id,
            }
        });
        accumulation.bytes.extend_from_slice(fragment.payload);
        accumulation.fragments += 1;

        if fragment.terminal {
            if let Some(done) = self.open.remove(&fragment.cable) {
                self.sealed.push(ReassembledMessage {
                    cable: fragment.cable,
                    bytes: done.bytes,
                    origin: MessageOrigin {
                        first_buffer: done.first_buffer,
                        completed_buffer: buffer_id,
                        completed_event: index,
                        fragments: done.fragments,
                    },
                });
            }
        }
    }

    /// Cables with an open accumulation, in cable order.
    pub fn pending(&self) -> Vec<PendingSysEx> {
        self.open
            .iter()
            .map(|(cable, accumulation)| PendingSysEx {
                cable: *cable,
                bytes: accumulation.bytes.clone(),
                fragments: accumulation.fragments,
                first_buffer: accumulation.first_buffer,
            })
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        self.open.is_empty()
    }

    /// Drop all open accumulations.
    pub fn into_pending(self) -> Vec<PendingSysEx> {
        self.open
            .into_iter()
            .map(|(cable, accumulation)| PendingSysEx {
                cable,
                bytes: accumulation.bytes,
                fragments: accumulation.fragments,
                first_buffer: accumulation.first_buffer,
            })
            .collect()
    }
}

/// True when a SysEx-bearing event appears after `index` in this buffer.
fn sysex_follows(events: &[EventPacket], index: usize) -> bool {
    events[index + 1..]
        .iter()
        .any(|event| event.code_index.is_sysex())
}
