//! Declarative bitmask tables.
//!
//! Each table lists `(name, bit offset, bit width)` entries for one bitmask
//! field. A single interpreter turns a raw value into named [`BitField`]s, so
//! no descriptor parser declares individual flags.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSpec {
    pub name: &'static str,
    pub offset: u8,
    pub width: u8,
}

const fn flag(name: &'static str, offset: u8) -> BitSpec {
    BitSpec {
        name,
        offset,
        width: 1,
    }
}

const fn span(name: &'static str, offset: u8, width: u8) -> BitSpec {
    BitSpec {
        name,
        offset,
        width,
    }
}

/// Named bit layout of one bitmask field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapTable {
    /// Total width of the field in bits.
    pub bits: u8,
    pub entries: &'static [BitSpec],
}

/// One interpreted entry of a bitmask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField {
    pub name: String,
    pub offset: u8,
    pub width: u8,
    pub value: u32,
}

impl BitmapTable {
    pub fn decode(&self, value: u32) -> Vec<BitField> {
        self.decode_within(value, self.bits)
    }

    /// Decode only entries lying entirely inside the low `available` bits.
    pub fn decode_within(&self, value: u32, available: u8) -> Vec<BitField> {
        let limit = available.min(self.bits);
        self.entries
            .iter()
            .filter(|spec| spec.offset + spec.width <= limit)
            .map(|spec| BitField {
                name: spec.name.to_string(),
                offset: spec.offset,
                width: spec.width,
                value: extract(value, spec.offset, spec.width),
            })
            .collect()
    }

    /// Decode a little-endian byte run, naming only bits its leading bytes carry.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Vec<BitField> {
        let named = bytes.len().min(usize::from(self.bits / 8));
        let value = bytes[..named]
            .iter()
            .rev()
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
        self.decode_within(value, (named * 8) as u8)
    }

    pub fn get(&self, value: u32, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| extract(value, spec.offset, spec.width))
    }
}

fn extract(value: u32, offset: u8, width: u8) -> u32 {
    let mask = if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    };
    (value >> offset) & mask
}

pub const HEADER_CONTROLS: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[span("Latency control", 0, 2), span("Reserved", 2, 6)],
};

pub const CHANNEL_CONFIG_V1: BitmapTable = BitmapTable {
    bits: 16,
    entries: &[
        flag("Left Front (L)", 0),
        flag("Right Front (R)", 1),
        flag("Center Front (C)", 2),
        flag("Low Frequency Enhancement (LFE)", 3),
        flag("Left Surround (LS)", 4),
        flag("Right Surround (RS)", 5),
        flag("Left of Center (LC)", 6),
        flag("Right of Center (RC)", 7),
        flag("Surround (S)", 8),
        flag("Side Left (SL)", 9),
        flag("Side Right (SR)", 10),
        flag("Top (T)", 11),
        span("Reserved", 12, 4),
    ],
};

pub const CHANNEL_CONFIG_V2: BitmapTable = BitmapTable {
    bits: 32,
    entries: &[
        flag("Front Left (FL)", 0),
        flag("Front Right (FR)", 1),
        flag("Front Center (FC)", 2),
        flag("Low Frequency Effects (LFE)", 3),
        flag("Back Left (BL)", 4),
        flag("Back Right (BR)", 5),
        flag("Front Left of Center (FLC)", 6),
        flag("Front Right of Center (FRC)", 7),
        flag("Back Center (BC)", 8),
        flag("Side Left (SL)", 9),
        flag("Side Right (SR)", 10),
        flag("Top Center (TC)", 11),
        flag("Top Front Left (TFL)", 12),
        flag("Top Front Center (TFC)", 13),
        flag("Top Front Right (TFR)", 14),
        flag("Top Back Left (TBL)", 15),
        flag("Top Back Center (TBC)", 16),
        flag("Top Back Right (TBR)", 17),
        flag("Top Front Left of Center (TFLC)", 18),
        flag("Top Front Right of Center (TFRC)", 19),
        flag("Left Low Frequency Effects (LLFE)", 20),
        flag("Right Low Frequency Effects (RLFE)", 21),
        flag("Top Side Left (TSL)", 22),
        flag("Top Side Right (TSR)", 23),
        flag("Bottom Center (BC)", 24),
        flag("Back Left of Center (BLC)", 25),
        flag("Back Right of Center (BRC)", 26),
        span("Reserved", 27, 4),
        flag("Raw Data (RD)", 31),
    ],
};

pub const INPUT_TERMINAL_CONTROLS: BitmapTable = BitmapTable {
    bits: 16,
    entries: &[
        span("Copy Protect Control", 0, 2),
        span("Connector Control", 2, 2),
        span("Overload Control", 4, 2),
        span("Cluster Control", 6, 2),
        span("Underflow Control", 8, 2),
        span("Overflow Control", 10, 2),
        span("Reserved", 12, 4),
    ],
};

pub const OUTPUT_TERMINAL_CONTROLS: BitmapTable = BitmapTable {
    bits: 16,
    entries: &[
        span("Copy Protect Control", 0, 2),
        span("Connector Control", 2, 2),
        span("Overload Control", 4, 2),
        span("Underflow Control", 6, 2),
        span("Overflow Control", 8, 2),
        span("Reserved", 10, 6),
    ],
};

/// Named bits of the first two bytes of a feature unit control entry.
pub const FEATURE_UNIT_CONTROLS: BitmapTable = BitmapTable {
    bits: 16,
    entries: &[
        flag("Mute", 0),
        flag("Volume", 1),
        flag("Bass", 2),
        flag("Mid", 3),
        flag("Treble", 4),
        flag("Graphic Equalizer", 5),
        flag("Automatic Gain", 6),
        flag("Delay", 7),
        flag("Bass Boost", 8),
        flag("Loudness", 9),
        span("Reserved", 10, 6),
    ],
};

pub const CLOCK_SOURCE_ATTRIBUTES: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[
        span("Clock Type", 0, 2),
        flag("Synchronized to SOF", 2),
        span("Reserved", 3, 5),
    ],
};

pub const CLOCK_SOURCE_CONTROLS: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[
        span("Clock Frequency Control", 0, 2),
        span("Clock Validity Control", 2, 2),
        span("Reserved", 4, 4),
    ],
};

pub const CLOCK_SELECTOR_CONTROLS: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[span("Clock Selector Control", 0, 2), span("Reserved", 2, 6)],
};

pub const STREAMING_V2_CONTROLS: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[
        span("Active Alternate Setting Control", 0, 2),
        span("Valid Alternate Settings Control", 2, 2),
        span("Reserved", 4, 4),
    ],
};

pub const ENDPOINT_V1_ATTRIBUTES: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[
        flag("Sampling Frequency", 0),
        flag("Pitch", 1),
        span("Reserved", 2, 5),
        flag("MaxPacketsOnly", 7),
    ],
};

pub const ENDPOINT_V2_ATTRIBUTES: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[span("Reserved", 0, 7), flag("MaxPacketsOnly", 7)],
};

pub const ENDPOINT_V2_CONTROLS: BitmapTable = BitmapTable {
    bits: 8,
    entries: &[
        span("Pitch Control", 0, 2),
        span("Data Overrun Control", 2, 2),
        span("Data Underrun Control", 4, 2),
        span("Reserved", 6, 2),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TABLES: &[BitmapTable] = &[
        HEADER_CONTROLS,
        CHANNEL_CONFIG_V1,
        CHANNEL_CONFIG_V2,
        INPUT_TERMINAL_CONTROLS,
        OUTPUT_TERMINAL_CONTROLS,
        FEATURE_UNIT_CONTROLS,
        CLOCK_SOURCE_ATTRIBUTES,
        CLOCK_SOURCE_CONTROLS,
        CLOCK_SELECTOR_CONTROLS,
        STREAMING_V2_CONTROLS,
        ENDPOINT_V1_ATTRIBUTES,
        ENDPOINT_V2_ATTRIBUTES,
        ENDPOINT_V2_CONTROLS,
    ];

    #[test]
    fn byte_runs_decode_little_endian_up_to_table_width() {
        let bits = FEATURE_UNIT_CONTROLS.decode_bytes(&[0x01, 0x02, 0xff]);
        assert_eq!(bits.len(), FEATURE_UNIT_CONTROLS.entries.len());
        assert_eq!(bits[0].name, "Mute");
        assert_eq!(bits[0].value, 1);
        assert_eq!(bits[9].name, "Loudness");
        assert_eq!(bits[9].value, 1);
        assert!(bits.iter().all(|bit| bit.offset + bit.width <= 16));

        let short = FEATURE_UNIT_CONTROLS.decode_bytes(&[0x01]);
        assert!(short.iter().all(|bit| bit.offset + bit.width <= 8));
        assert!(short.len() < bits.len());
        assert!(FEATURE_UNIT_CONTROLS.decode_bytes(&[]).is_empty());
    }

    #[test]
    fn tables_cover_their_width_without_overlap() {
        for table in ALL_TABLES {
            let mut covered = 0u64;
            for spec in table.entries {
                let mask = ((1u64 << spec.width) - 1) << spec.offset;
                assert_eq!(covered & mask, 0, "overlap at {}", spec.name);
                covered |= mask;
            }
            assert_eq!(covered, (1u64 << table.bits) - 1);
        }
    }

    #[test]
    fn v2_channel_config_names_27_positions() {
        let named = CHANNEL_CONFIG_V2
            .entries
            .iter()
            .filter(|spec| spec.width == 1 && spec.name != "Raw Data (RD)")
            .count();
        assert_eq!(named, 27);
        assert_eq!(CHANNEL_CONFIG_V2.get(0x8000_0000, "Raw Data (RD)"), Some(1));
        assert_eq!(CHANNEL_CONFIG_V2.get(0x7800_0000, "Reserved"), Some(0xf));
    }

    #[test]
    fn decode_extracts_multi_bit_entries() {
        let fields = INPUT_TERMINAL_CONTROLS.decode(0x0c03);
        assert_eq!(fields[0].name, "Copy Protect Control");
        assert_eq!(fields[0].value, 3);
        assert_eq!(fields[5].name, "Overflow Control");
        assert_eq!(fields[5].value, 3);
        assert!(fields[1..5].iter().all(|field| field.value == 0));
    }

    #[test]
    fn decode_within_skips_bits_not_present() {
        let fields = FEATURE_UNIT_CONTROLS.decode_within(0x0003, 8);
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[0].value, 1);
        assert_eq!(fields[1].value, 1);
        assert!(fields.iter().all(|field| field.name != "Loudness"));
    }
}
