use log::{debug, warn};

use super::bitmap::{
    CHANNEL_CONFIG_V1, CHANNEL_CONFIG_V2, CLOCK_SELECTOR_CONTROLS, CLOCK_SOURCE_ATTRIBUTES,
    CLOCK_SOURCE_CONTROLS, ENDPOINT_V1_ATTRIBUTES, ENDPOINT_V2_ATTRIBUTES, ENDPOINT_V2_CONTROLS,
    FEATURE_UNIT_CONTROLS, HEADER_CONTROLS, INPUT_TERMINAL_CONTROLS, OUTPUT_TERMINAL_CONTROLS,
    STREAMING_V2_CONTROLS,
};
use super::error::DescriptorError;
use super::layout;
use super::model::{
    ChannelConfig, ClockSelector, ClockSource, FeatureUnit, FormatTypeDescriptor,
    HeaderDescriptor, InputTerminal, MixerUnit, OutputTerminal, SampleRates, StreamingEndpoint,
    StreamingGeneral,
};
use super::reader::DescriptorReader;
use super::version::Layout;
use crate::protocols::common::reader::optional_nonzero_u8;
use crate::protocols::common::{Diagnostic, DiagnosticKind};
use crate::session::Session;

/// Audio control header. Creates the session's version context on first use.
///
/// A header whose version differs from an existing context is decoded with
/// its own layout and flagged; the context is left as it was. A session whose
/// context holds an unsupported version refuses every header after it.
pub fn parse_ac_header(
    reader: &mut DescriptorReader<'_>,
    session: &mut Session,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<HeaderDescriptor, DescriptorError> {
    let version_offset = reader.offset();
    let version = reader.bcd_version("bcdADC")?;
    let context = *session.get_or_create_version_context(version)?;
    context.layout()?;
    if context.version() != version {
        warn!(
            "header declares audio class {version}, session already at {}",
            context.version()
        );
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::VersionMismatch,
            version_offset..version_offset + 2,
            format!(
                "header declares {version}, session context holds {}",
                context.version()
            ),
        ));
    }

    match version.layout()? {
        Layout::V1 => {
            let total_length = reader.u16_le("wTotalLength")?;
            let count = reader.u8("bInCollection")?;
            let mut interfaces = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                interfaces.push(reader.u8("baInterfaceNr")?);
            }
            Ok(HeaderDescriptor::V1 {
                version,
                total_length,
                interfaces,
            })
        }
        Layout::V2 => {
            let category = reader.u8("bCategory")?;
            let total_length = reader.u16_le("wTotalLength")?;
            let controls = reader.bitmap("bmControls", 1, &HEADER_CONTROLS)? as u8;
            Ok(HeaderDescriptor::V2 {
                version,
                category,
                total_length,
                controls,
            })
        }
    }
}

fn read_channel_config(
    reader: &mut DescriptorReader<'_>,
    layout: Layout,
) -> Result<ChannelConfig, DescriptorError> {
    match layout {
        Layout::V1 => {
            let value = reader.bitmap("wChannelConfig", 2, &CHANNEL_CONFIG_V1)?;
            Ok(ChannelConfig::V1(value as u16))
        }
        Layout::V2 => {
            let value = reader.bitmap("bmChannelConfig", 4, &CHANNEL_CONFIG_V2)?;
            Ok(ChannelConfig::V2(value))
        }
    }
}

fn string_index(reader: &mut DescriptorReader<'_>, name: &'static str) -> Result<Option<u8>, DescriptorError> {
    reader.u8(name).map(optional_nonzero_u8)
}

pub fn parse_input_terminal(
    reader: &mut DescriptorReader<'_>,
    layout: Layout,
) -> Result<InputTerminal, DescriptorError> {
    let terminal_id = reader.u8("bTerminalID")?;
    let terminal_type = reader.u16_le("wTerminalType")?;
    let assoc_terminal = reader.u8("bAssocTerminal")?;
    let clock_source_id = match layout {
        Layout::V1 => None,
        Layout::V2 => Some(reader.u8("bCSourceID")?),
    };
    let channel_count = reader.u8("bNrChannels")?;
    let channel_config = read_channel_config(reader, layout)?;
    let channel_names = string_index(reader, "iChannelNames")?;
    let controls = match layout {
        Layout::V1 => None,
        Layout::V2 => Some(reader.bitmap("bmControls", 2, &INPUT_TERMINAL_CONTROLS)? as u16),
    };
    let terminal_name = string_index(reader, "iTerminal")?;
    Ok(InputTerminal {
        terminal_id,
        terminal_type,
        assoc_terminal,
        clock_source_id,
        channel_count,
        channel_config,
        channel_names,
        controls,
        terminal_name,
    })
}

pub fn parse_output_terminal(
    reader: &mut DescriptorReader<'_>,
    layout: Layout,
) -> Result<OutputTerminal, DescriptorError> {
    let terminal_id = reader.u8("bTerminalID")?;
    let terminal_type = reader.u16_le("wTerminalType")?;
    let assoc_terminal = reader.u8("bAssocTerminal")?;
    let source_id = reader.u8("bSourceID")?;
    let (clock_source_id, controls) = match layout {
        Layout::V1 => (None, None),
        Layout::V2 => {
            let clock = reader.u8("bCSourceID")?;
            let controls = reader.bitmap("bmControls", 2, &OUTPUT_TERMINAL_CONTROLS)? as u16;
            (Some(clock), Some(controls))
        }
    };
    let terminal_name = string_index(reader, "iTerminal")?;
    Ok(OutputTerminal {
        terminal_id,
        terminal_type,
        assoc_terminal,
        source_id,
        clock_source_id,
        controls,
        terminal_name,
    })
}

/// Mixer unit. The mixer controls bitmap has no size field; its length is
/// whatever the declared length leaves before the fixed trailer.
pub fn parse_mixer_unit(
    reader: &mut DescriptorReader<'_>,
    layout: Layout,
) -> Result<MixerUnit, DescriptorError> {
    let unit_id = reader.u8("bUnitID")?;
    let pins = reader.u8("bNrInPins")?;
    let mut source_ids = Vec::with_capacity(usize::from(pins));
    for _ in 0..pins {
        source_ids.push(reader.u8("baSourceID")?);
    }
    let channel_count = reader.u8("bNrChannels")?;
    let channel_config = read_channel_config(reader, layout)?;
    let channel_names = string_index(reader, "iChannelNames")?;

    let trailer = match layout {
        Layout::V1 => 1,
        Layout::V2 => 2,
    };
    let bitmap_len = reader.remaining_declared().saturating_sub(trailer);
    let mixer_controls = if bitmap_len > 0 {
        let name = match layout {
            Layout::V1 => "bmControls",
            Layout::V2 => "bmMixerControls",
        };
        reader.bytes(name, bitmap_len)?.to_vec()
    } else {
        Vec::new()
    };
    let controls = match layout {
        Layout::V1 => None,
        Layout::V2 => Some(reader.u8("bmControls")?),
    };
    let mixer_name = string_index(reader, "iMixer")?;
    Ok(MixerUnit {
        unit_id,
        source_ids,
        channel_count,
        channel_config,
        channel_names,
        mixer_controls,
        controls,
        mixer_name,
    })
}

/// Feature unit. `bControlSize` on the wire is one less than the control
/// block length, and `iFeature` is only read while bytes remain.
pub fn parse_feature_unit(reader: &mut DescriptorReader<'_>) -> Result<FeatureUnit, DescriptorError> {
    let unit_id = reader.u8("bUnitID")?;
    let source_id = reader.u8("bSourceID")?;
    let control_size = reader.u8("bControlSize")?;
    let control_len = usize::from(control_size) + layout::FEATURE_CONTROL_SIZE_BIAS;
    let controls = reader
        .bytes_with_bits("bmaControls", control_len, &FEATURE_UNIT_CONTROLS)?
        .to_vec();
    let feature_name = if reader.offset() < reader.declared_len() {
        Some(reader.u8("iFeature")?)
    } else {
        None
    };
    Ok(FeatureUnit {
        unit_id,
        source_id,
        control_size,
        controls,
        feature_name,
    })
}

pub fn parse_clock_source(reader: &mut DescriptorReader<'_>) -> Result<ClockSource, DescriptorError> {
    let clock_id = reader.u8("bClockID")?;
    let attributes = reader.bitmap("bmAttributes", 1, &CLOCK_SOURCE_ATTRIBUTES)? as u8;
    let controls = reader.bitmap("bmControls", 1, &CLOCK_SOURCE_CONTROLS)? as u8;
    let assoc_terminal = reader.u8("bAssocTerminal")?;
    let clock_name = string_index(reader, "iClockSource")?;
    Ok(ClockSource {
        clock_id,
        attributes,
        controls,
        assoc_terminal,
        clock_name,
    })
}

pub fn parse_clock_selector(
    reader: &mut DescriptorReader<'_>,
) -> Result<ClockSelector, DescriptorError> {
    let clock_id = reader.u8("bClockID")?;
    let pins = reader.u8("bNrInPins")?;
    let mut source_ids = Vec::with_capacity(usize::from(pins));
    for _ in 0..pins {
        source_ids.push(reader.u8("baCSourceID")?);
    }
    let controls = reader.bitmap("bmControls", 1, &CLOCK_SELECTOR_CONTROLS)? as u8;
    let selector_name = string_index(reader, "iClockSelector")?;
    Ok(ClockSelector {
        clock_id,
        source_ids,
        controls,
        selector_name,
    })
}

pub fn parse_streaming_general(
    reader: &mut DescriptorReader<'_>,
    layout: Layout,
) -> Result<StreamingGeneral, DescriptorError> {
    let terminal_link = reader.u8("bTerminalLink")?;
    match layout {
        Layout::V1 => {
            let delay = reader.u8("bDelay")?;
            let format_tag = reader.u16_le("wFormatTag")?;
            Ok(StreamingGeneral::V1 {
                terminal_link,
                delay,
                format_tag,
            })
        }
        Layout::V2 => {
            let controls = reader.bitmap("bmControls", 1, &STREAMING_V2_CONTROLS)? as u8;
            let format_type = reader.u8("bFormatType")?;
            let formats = reader.u32_le("bmFormats")?;
            let channel_count = reader.u8("bNrChannels")?;
            let channel_config = reader.bitmap("bmChannelConfig", 4, &CHANNEL_CONFIG_V2)?;
            let channel_names = string_index(reader, "iChannelNames")?;
            Ok(StreamingGeneral::V2 {
                terminal_link,
                controls,
                format_type,
                formats,
                channel_count,
                channel_config,
                channel_names,
            })
        }
    }
}

/// Format type descriptor. Types I and II share the sample-rate table rule.
pub fn parse_format_type(
    reader: &mut DescriptorReader<'_>,
) -> Result<FormatTypeDescriptor, DescriptorError> {
    let format_type = reader.u8("bFormatType")?;
    match format_type {
        layout::FORMAT_TYPE_I => {
            let channel_count = reader.u8("bNrChannels")?;
            let subframe_size = reader.u8("bSubframeSize")?;
            let bit_resolution = reader.u8("bBitResolution")?;
            let sample_rates = parse_sample_rates(reader)?;
            Ok(FormatTypeDescriptor::TypeI {
                channel_count,
                subframe_size,
                bit_resolution,
                sample_rates,
            })
        }
        layout::FORMAT_TYPE_II => {
            let max_bit_rate = reader.u16_le("wMaxBitRate")?;
            let samples_per_frame = reader.u16_le("wSamplesPerFrame")?;
            let sample_rates = parse_sample_rates(reader)?;
            Ok(FormatTypeDescriptor::TypeII {
                max_bit_rate,
                samples_per_frame,
                sample_rates,
            })
        }
        other => {
            debug!("format type {other} body not decoded");
            Ok(FormatTypeDescriptor::Other { format_type: other })
        }
    }
}

fn parse_sample_rates(reader: &mut DescriptorReader<'_>) -> Result<SampleRates, DescriptorError> {
    let count = reader.u8("bSamFreqType")?;
    if count == layout::SAM_FREQ_CONTINUOUS {
        let lower = reader.u24_le("tLowerSamFreq")?;
        let upper = reader.u24_le("tUpperSamFreq")?;
        return Ok(SampleRates::Continuous { lower, upper });
    }
    let mut rates = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        rates.push(reader.u24_le("tSamFreq")?);
    }
    Ok(SampleRates::Discrete(rates))
}

pub fn parse_streaming_endpoint(
    reader: &mut DescriptorReader<'_>,
    layout: Layout,
) -> Result<StreamingEndpoint, DescriptorError> {
    match layout {
        Layout::V1 => {
            let attributes = reader.bitmap("bmAttributes", 1, &ENDPOINT_V1_ATTRIBUTES)? as u8;
            let lock_delay_units = reader.u8("bLockDelayUnits")?;
            let lock_delay = reader.u16_le("wLockDelay")?;
            Ok(StreamingEndpoint::V1 {
                attributes,
                lock_delay_units,
                lock_delay,
            })
        }
        Layout::V2 => {
            let attributes = reader.bitmap("bmAttributes", 1, &ENDPOINT_V2_ATTRIBUTES)? as u8;
            let controls = reader.bitmap("bmControls", 1, &ENDPOINT_V2_CONTROLS)? as u8;
            let lock_delay_units = reader.u8("bLockDelayUnits")?;
            let lock_delay = reader.u16_le("wLockDelay")?;
            Ok(StreamingEndpoint::V2 {
                attributes,
                controls,
                lock_delay_units,
                lock_delay,
            })
        }
    }
}
