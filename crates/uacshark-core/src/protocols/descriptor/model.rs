//! Typed descriptor bodies.
//!
//! Layouts that differ between revisions are separate variants rather than
//! optional fields. String descriptor indexes of zero ("no string") are
//! mapped to `None`.

use serde::{Deserialize, Serialize};

use super::bitmap::{BitField, CHANNEL_CONFIG_V1, CHANNEL_CONFIG_V2, FEATURE_UNIT_CONTROLS};
use super::version::AdcVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "descriptor", rename_all = "snake_case")]
pub enum DescriptorBody {
    Header(HeaderDescriptor),
    InputTerminal(InputTerminal),
    OutputTerminal(OutputTerminal),
    MixerUnit(MixerUnit),
    FeatureUnit(FeatureUnit),
    ClockSource(ClockSource),
    ClockSelector(ClockSelector),
    StreamingGeneral(StreamingGeneral),
    FormatType(FormatTypeDescriptor),
    StreamingEndpoint(StreamingEndpoint),
}

/// Audio control interface header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout")]
pub enum HeaderDescriptor {
    V1 {
        version: AdcVersion,
        total_length: u16,
        /// `baInterfaceNr`, exactly `bInCollection` entries.
        interfaces: Vec<u8>,
    },
    V2 {
        version: AdcVersion,
        category: u8,
        total_length: u16,
        controls: u8,
    },
}

impl HeaderDescriptor {
    pub fn version(&self) -> AdcVersion {
        match self {
            HeaderDescriptor::V1 { version, .. } | HeaderDescriptor::V2 { version, .. } => *version,
        }
    }

    pub fn total_length(&self) -> u16 {
        match self {
            HeaderDescriptor::V1 { total_length, .. }
            | HeaderDescriptor::V2 { total_length, .. } => *total_length,
        }
    }
}

/// Spatial channel positions, 16-bit in v1 and 32-bit in v2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelConfig {
    V1(u16),
    V2(u32),
}

impl ChannelConfig {
    pub fn raw(self) -> u32 {
        match self {
            ChannelConfig::V1(value) => u32::from(value),
            ChannelConfig::V2(value) => value,
        }
    }

    /// Names of the positions set in this configuration.
    pub fn positions(self) -> Vec<String> {
        let (table, value) = match self {
            ChannelConfig::V1(value) => (&CHANNEL_CONFIG_V1, u32::from(value)),
            ChannelConfig::V2(value) => (&CHANNEL_CONFIG_V2, value),
        };
        table
            .decode(value)
            .into_iter()
            .filter(|bit| bit.width == 1 && bit.value != 0)
            .map(|bit| bit.name)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTerminal {
    pub terminal_id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    /// v2 only.
    pub clock_source_id: Option<u8>,
    pub channel_count: u8,
    pub channel_config: ChannelConfig,
    pub channel_names: Option<u8>,
    /// v2 only.
    pub controls: Option<u16>,
    pub terminal_name: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTerminal {
    pub terminal_id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    pub source_id: u8,
    /// v2 only.
    pub clock_source_id: Option<u8>,
    /// v2 only.
    pub controls: Option<u16>,
    pub terminal_name: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerUnit {
    pub unit_id: u8,
    pub source_ids: Vec<u8>,
    pub channel_count: u8,
    pub channel_config: ChannelConfig,
    pub channel_names: Option<u8>,
    /// Programmable mixer controls bitmap, sized from the declared length.
    pub mixer_controls: Vec<u8>,
    /// v2 only.
    pub controls: Option<u8>,
    pub mixer_name: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureUnit {
    pub unit_id: u8,
    pub source_id: u8,
    /// Wire value of `bControlSize`; the control block is one byte longer.
    pub control_size: u8,
    pub controls: Vec<u8>,
    /// `iFeature`, present only when bytes remain before the declared end.
    pub feature_name: Option<u8>,
}

impl FeatureUnit {
    /// Named bits from the first two control bytes.
    pub fn control_flags(&self) -> Vec<BitField> {
        FEATURE_UNIT_CONTROLS.decode_bytes(&self.controls)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSource {
    pub clock_id: u8,
    pub attributes: u8,
    pub controls: u8,
    pub assoc_terminal: u8,
    pub clock_name: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSelector {
    pub clock_id: u8,
    pub source_ids: Vec<u8>,
    pub controls: u8,
    pub selector_name: Option<u8>,
}

/// Audio streaming interface general descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout")]
pub enum StreamingGeneral {
    V1 {
        terminal_link: u8,
        delay: u8,
        format_tag: u16,
    },
    V2 {
        terminal_link: u8,
        controls: u8,
        format_type: u8,
        formats: u32,
        channel_count: u8,
        channel_config: u32,
        channel_names: Option<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format")]
pub enum FormatTypeDescriptor {
    TypeI {
        channel_count: u8,
        subframe_size: u8,
        bit_resolution: u8,
        sample_rates: SampleRates,
    },
    TypeII {
        max_bit_rate: u16,
        samples_per_frame: u16,
        sample_rates: SampleRates,
    },
    /// Format types without a modelled body; only the discriminant is read.
    Other { format_type: u8 },
}

impl FormatTypeDescriptor {
    pub fn format_type(&self) -> u8 {
        match self {
            FormatTypeDescriptor::TypeI { .. } => 1,
            FormatTypeDescriptor::TypeII { .. } => 2,
            FormatTypeDescriptor::Other { format_type } => *format_type,
        }
    }

    pub fn sample_rates(&self) -> Option<&SampleRates> {
        match self {
            FormatTypeDescriptor::TypeI { sample_rates, .. }
            | FormatTypeDescriptor::TypeII { sample_rates, .. } => Some(sample_rates),
            FormatTypeDescriptor::Other { .. } => None,
        }
    }
}

/// Sample-rate table closing format type I and II bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRates {
    Continuous { lower: u32, upper: u32 },
    Discrete(Vec<u32>),
}

/// Class-specific isochronous audio data endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout")]
pub enum StreamingEndpoint {
    V1 {
        attributes: u8,
        lock_delay_units: u8,
        lock_delay: u16,
    },
    V2 {
        attributes: u8,
        controls: u8,
        lock_delay_units: u8,
        lock_delay: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_positions_follow_layout() {
        assert_eq!(
            ChannelConfig::V1(0x0003).positions(),
            vec!["Left Front (L)".to_string(), "Right Front (R)".to_string()]
        );
        assert_eq!(
            ChannelConfig::V2(0x0000_0008).positions(),
            vec!["Low Frequency Effects (LFE)".to_string()]
        );
        assert_eq!(ChannelConfig::V2(0x8000_0000).positions(), vec![
            "Raw Data (RD)".to_string()
        ]);
    }

    #[test]
    fn feature_flags_use_two_bytes_at_most() {
        let unit = FeatureUnit {
            unit_id: 2,
            source_id: 1,
            control_size: 2,
            controls: vec![0x01, 0x01, 0xff],
            feature_name: None,
        };
        let flags = unit.control_flags();
        assert_eq!(flags.len(), 11);
        let set: Vec<_> = flags
            .iter()
            .filter(|flag| flag.value != 0)
            .map(|flag| flag.name.as_str())
            .collect();
        assert_eq!(set, vec!["Mute", "Bass Boost"]);
    }

    #[test]
    fn feature_flags_single_byte() {
        let unit = FeatureUnit {
            unit_id: 2,
            source_id: 1,
            control_size: 0,
            controls: vec![0x02],
            feature_name: Some(0),
        };
        let flags = unit.control_flags();
        assert_eq!(flags.len(), 8);
        assert_eq!(flags[1].name, "Volume");
        assert_eq!(flags[1].value, 1);
    }

    #[test]
    fn format_type_accessors() {
        let format = FormatTypeDescriptor::TypeII {
            max_bit_rate: 384,
            samples_per_frame: 1152,
            sample_rates: SampleRates::Discrete(vec![48_000]),
        };
        assert_eq!(format.format_type(), 2);
        assert_eq!(
            format.sample_rates(),
            Some(&SampleRates::Discrete(vec![48_000]))
        );
        assert_eq!(
            FormatTypeDescriptor::Other { format_type: 3 }.sample_rates(),
            None
        );
    }
}
