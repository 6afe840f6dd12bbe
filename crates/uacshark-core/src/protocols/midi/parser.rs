use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;
use std::slice::ChunksExact;

use log::trace;
use serde::{Deserialize, Serialize};

use super::layout;
use super::sysex::SysExFragment;

/// Code Index Number: the low nibble of an event packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeIndex {
    Misc,
    CableEvent,
    SystemCommon2,
    SystemCommon3,
    SysExStart,
    SysExEnd1,
    SysExEnd2,
    SysExEnd3,
    NoteOff,
    NoteOn,
    PolyKeyPress,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    SingleByte,
}

impl CodeIndex {
    pub fn from_nibble(value: u8) -> Self {
        match value & layout::CIN_MASK {
            0x0 => CodeIndex::Misc,
            0x1 => CodeIndex::CableEvent,
            0x2 => CodeIndex::SystemCommon2,
            0x3 => CodeIndex::SystemCommon3,
            layout::CIN_SYSEX_START => CodeIndex::SysExStart,
            layout::CIN_SYSEX_END_1 => CodeIndex::SysExEnd1,
            layout::CIN_SYSEX_END_2 => CodeIndex::SysExEnd2,
            layout::CIN_SYSEX_END_3 => CodeIndex::SysExEnd3,
            0x8 => CodeIndex::NoteOff,
            0x9 => CodeIndex::NoteOn,
            0xa => CodeIndex::PolyKeyPress,
            0xb => CodeIndex::ControlChange,
            0xc => CodeIndex::ProgramChange,
            0xd => CodeIndex::ChannelPressure,
            0xe => CodeIndex::PitchBend,
            _ => CodeIndex::SingleByte,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Meaningful payload bytes. Misc and cable events are reserved and
    /// carry none.
    pub fn payload_len(self) -> usize {
        match self {
            CodeIndex::Misc | CodeIndex::CableEvent => 0,
            CodeIndex::SysExEnd1 | CodeIndex::SingleByte => 1,
            CodeIndex::SystemCommon2
            | CodeIndex::SysExEnd2
            | CodeIndex::ProgramChange
            | CodeIndex::ChannelPressure => 2,
            _ => 3,
        }
    }

    /// SysEx-bearing: start/continue or one of the three end codes.
    pub fn is_sysex(self) -> bool {
        matches!(
            self,
            CodeIndex::SysExStart | CodeIndex::SysExEnd1 | CodeIndex::SysExEnd2 | CodeIndex::SysExEnd3
        )
    }

    pub fn is_sysex_end(self) -> bool {
        matches!(
            self,
            CodeIndex::SysExEnd1 | CodeIndex::SysExEnd2 | CodeIndex::SysExEnd3
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            CodeIndex::Misc => "Miscellaneous function codes",
            CodeIndex::CableEvent => "Cable events",
            CodeIndex::SystemCommon2 => "Two-byte System Common message",
            CodeIndex::SystemCommon3 => "Three-byte System Common message",
            CodeIndex::SysExStart => "SysEx starts or continues",
            CodeIndex::SysExEnd1 => "SysEx ends with one byte or single-byte System Common",
            CodeIndex::SysExEnd2 => "SysEx ends with two bytes",
            CodeIndex::SysExEnd3 => "SysEx ends with three bytes",
            CodeIndex::NoteOff => "Note-off",
            CodeIndex::NoteOn => "Note-on",
            CodeIndex::PolyKeyPress => "Poly-KeyPress",
            CodeIndex::ControlChange => "Control Change",
            CodeIndex::ProgramChange => "Program Change",
            CodeIndex::ChannelPressure => "Channel Pressure",
            CodeIndex::PitchBend => "PitchBend Change",
            CodeIndex::SingleByte => "Single Byte",
        }
    }
}

impl fmt::Display for CodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One four-byte USB-MIDI event packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPacket {
    /// Offset of the packet in its buffer.
    pub offset: usize,
    pub cable: u8,
    pub code_index: CodeIndex,
    /// All three payload bytes as carried, meaningful or not.
    pub raw: [u8; layout::PAYLOAD_MAX_LEN],
}

impl EventPacket {
    pub fn parse(offset: usize, bytes: [u8; layout::EVENT_PACKET_LEN]) -> Self {
        let header = bytes[layout::HEADER_OFFSET];
        Self {
            offset,
            cable: header >> layout::CABLE_SHIFT,
            code_index: CodeIndex::from_nibble(header),
            raw: [bytes[1], bytes[2], bytes[3]],
        }
    }

    pub fn header(&self) -> u8 {
        (self.cable << layout::CABLE_SHIFT) | self.code_index.value()
    }

    /// Payload bytes implied by the code index.
    pub fn payload(&self) -> &[u8] {
        &self.raw[..self.code_index.payload_len()]
    }

    pub fn sysex_fragment(&self) -> Option<SysExFragment<'_>> {
        if !self.code_index.is_sysex() {
            return None;
        }
        Some(SysExFragment {
            cable: self.cable,
            payload: self.payload(),
            terminal: self.code_index.is_sysex_end(),
        })
    }
}

/// Lazy splitter over a bulk buffer.
///
/// Yields `len / 4` packets in order; the trailing `len % 4` bytes are never
/// interpreted and are exposed through [`MidiEventSplitter::undecoded_tail`].
pub struct MidiEventSplitter<'a> {
    chunks: ChunksExact<'a, u8>,
    next_offset: usize,
    tail: Option<Range<usize>>,
}

impl<'a> MidiEventSplitter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let chunks = data.chunks_exact(layout::EVENT_PACKET_LEN);
        let split = data.len() - chunks.remainder().len();
        let tail = (split < data.len()).then_some(split..data.len());
        Self {
            chunks,
            next_offset: 0,
            tail,
        }
    }

    pub fn undecoded_tail(&self) -> Option<Range<usize>> {
        self.tail.clone()
    }
}

impl Iterator for MidiEventSplitter<'_> {
    type Item = EventPacket;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        let offset = self.next_offset;
        self.next_offset += layout::EVENT_PACKET_LEN;
        let packet = EventPacket::parse(offset, [chunk[0], chunk[1], chunk[2], chunk[3]]);
        trace!(
            "midi event @{offset}: cable {} {:?} {:02x?}",
            packet.cable, packet.code_index, packet.raw
        );
        Some(packet)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for MidiEventSplitter<'_> {}

impl FusedIterator for MidiEventSplitter<'_> {}

pub fn split_events(data: &[u8]) -> MidiEventSplitter<'_> {
    MidiEventSplitter::new(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_bytes_yield_two_events_and_a_tail() {
        let data = [0x09, 0x90, 0x3c, 0x7f, 0x08, 0x80, 0x3c, 0x00, 0xaa, 0xbb];
        let mut splitter = split_events(&data);
        assert_eq!(splitter.len(), 2);
        assert_eq!(splitter.undecoded_tail(), Some(8..10));

        let first = splitter.next().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.code_index, CodeIndex::NoteOn);
        assert_eq!(first.payload(), &[0x90, 0x3c, 0x7f]);
        let second = splitter.next().unwrap();
        assert_eq!(second.offset, 4);
        assert_eq!(second.code_index, CodeIndex::NoteOff);
        assert!(splitter.next().is_none());
        assert!(splitter.next().is_none());
    }

    #[test]
    fn aligned_buffer_has_no_tail() {
        let data = [0x2f, 0xf8, 0x00, 0x00];
        let splitter = split_events(&data);
        assert_eq!(splitter.undecoded_tail(), None);
        let events: Vec<_> = splitter.collect();
        assert_eq!(events[0].cable, 2);
        assert_eq!(events[0].code_index, CodeIndex::SingleByte);
        assert_eq!(events[0].payload(), &[0xf8]);
        assert_eq!(events[0].header(), 0x2f);
    }

    #[test]
    fn short_buffer_is_all_tail() {
        let splitter = split_events(&[0x04, 0xf0, 0x00]);
        assert_eq!(splitter.len(), 0);
        assert_eq!(splitter.undecoded_tail(), Some(0..3));
        assert_eq!(split_events(&[]).undecoded_tail(), None);
    }

    #[test]
    fn payload_lengths_follow_code_index() {
        let lengths: Vec<_> = (0u8..16)
            .map(|cin| CodeIndex::from_nibble(cin).payload_len())
            .collect();
        assert_eq!(lengths, vec![0, 0, 2, 3, 3, 1, 2, 3, 3, 3, 3, 3, 2, 2, 3, 1]);
        for cin in 0u8..16 {
            assert_eq!(CodeIndex::from_nibble(cin).value(), cin);
        }
    }

    #[test]
    fn sysex_fragments_only_for_sysex_codes() {
        let start = EventPacket::parse(0, [0x24, 0xf0, 0x43, 0x12]);
        let fragment = start.sysex_fragment().unwrap();
        assert_eq!(fragment.cable, 2);
        assert_eq!(fragment.payload, &[0xf0, 0x43, 0x12]);
        assert!(!fragment.terminal);

        let end = EventPacket::parse(4, [0x26, 0x03, 0xf7, 0x00]);
        let fragment = end.sysex_fragment().unwrap();
        assert_eq!(fragment.payload, &[0x03, 0xf7]);
        assert!(fragment.terminal);

        let note = EventPacket::parse(8, [0x29, 0x90, 0x40, 0x40]);
        assert!(note.sysex_fragment().is_none());
    }
}
