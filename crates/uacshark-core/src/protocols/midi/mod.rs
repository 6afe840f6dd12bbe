//! USB-MIDI 1.0 event packets on a bulk endpoint.
//!
//! `parser` splits a bulk buffer into fixed four-byte event packets (cable
//! number in the high nibble of byte 0, code index number in the low
//! nibble). `sysex` reassembles System Exclusive messages that span several
//! packets and buffers, delivering them at a buffer-local gate.

pub mod layout;
pub mod parser;
pub mod sysex;

pub use parser::{CodeIndex, EventPacket, MidiEventSplitter, split_events};
pub use sysex::{
    BufferOutcome, GateNote, MessageOrigin, PendingSysEx, ReassembledMessage, SysExFragment,
    SysExGate, SysExReassembler,
};
