pub const EVENT_PACKET_LEN: usize = 4;
pub const HEADER_OFFSET: usize = 0;
pub const PAYLOAD_RANGE: std::ops::Range<usize> = 1..4;
pub const PAYLOAD_MAX_LEN: usize = 3;

pub const CABLE_SHIFT: u8 = 4;
pub const CIN_MASK: u8 = 0x0f;

pub const CIN_SYSEX_START: u8 = 0x4;
pub const CIN_SYSEX_END_1: u8 = 0x5;
pub const CIN_SYSEX_END_2: u8 = 0x6;
pub const CIN_SYSEX_END_3: u8 = 0x7;
