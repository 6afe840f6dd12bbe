use std::fmt;
use std::ops::Range;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::error::DescriptorError;
use super::layout;
use super::model::DescriptorBody;
use super::parser;
use super::reader::{DescriptorReader, Field};
use super::version::Layout;
use crate::protocols::common::{Diagnostic, DiagnosticKind};
use crate::session::Session;

/// Interface subclass supplied by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSubclass {
    Undefined,
    AudioControl,
    AudioStreaming,
    MidiStreaming,
    Other(u8),
}

impl From<u8> for AudioSubclass {
    fn from(value: u8) -> Self {
        match value {
            layout::SUBCLASS_UNDEFINED => AudioSubclass::Undefined,
            layout::SUBCLASS_AUDIO_CONTROL => AudioSubclass::AudioControl,
            layout::SUBCLASS_AUDIO_STREAMING => AudioSubclass::AudioStreaming,
            layout::SUBCLASS_MIDI_STREAMING => AudioSubclass::MidiStreaming,
            other => AudioSubclass::Other(other),
        }
    }
}

/// Interface classification metadata handed in with every descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub interface_class: u8,
    pub subclass: AudioSubclass,
}

impl InterfaceInfo {
    pub fn audio(subclass: AudioSubclass) -> Self {
        Self {
            interface_class: layout::IF_CLASS_AUDIO,
            subclass,
        }
    }

    pub fn is_audio(&self) -> bool {
        self.interface_class == layout::IF_CLASS_AUDIO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorClass {
    Interface,
    Endpoint,
}

/// Descriptor role selected from `(subclass, type, subtype, layout)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    AcHeader,
    AcInputTerminal,
    AcOutputTerminal,
    AcMixerUnit,
    AcSelectorUnit,
    AcFeatureUnit,
    AcEffectUnit,
    AcProcessingUnit,
    AcExtensionUnit,
    AcClockSource,
    AcClockSelector,
    AcClockMultiplier,
    AcSampleRateConverter,
    AsGeneral,
    AsFormatType,
    AsFormatSpecific,
    AsEndpointGeneral,
    Unknown,
}

impl DescriptorKind {
    /// Audio control subtypes 0x07 and up are numbered differently per
    /// revision. Without a known layout the v2 numbering is assumed; those
    /// parsers refuse anyway until a header is seen.
    pub fn classify(
        subclass: AudioSubclass,
        class: DescriptorClass,
        subtype: u8,
        layout: Option<Layout>,
    ) -> Self {
        match (subclass, class) {
            (AudioSubclass::AudioControl, DescriptorClass::Interface) => {
                classify_control(subtype, layout.unwrap_or(Layout::V2))
            }
            (AudioSubclass::AudioStreaming, DescriptorClass::Interface) => match subtype {
                layout::AS_GENERAL => DescriptorKind::AsGeneral,
                layout::AS_FORMAT_TYPE => DescriptorKind::AsFormatType,
                layout::AS_FORMAT_SPECIFIC => DescriptorKind::AsFormatSpecific,
                _ => DescriptorKind::Unknown,
            },
            (AudioSubclass::AudioStreaming, DescriptorClass::Endpoint) => match subtype {
                layout::EP_GENERAL => DescriptorKind::AsEndpointGeneral,
                _ => DescriptorKind::Unknown,
            },
            _ => DescriptorKind::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DescriptorKind::AcHeader => "Header",
            DescriptorKind::AcInputTerminal => "Input Terminal",
            DescriptorKind::AcOutputTerminal => "Output Terminal",
            DescriptorKind::AcMixerUnit => "Mixer Unit",
            DescriptorKind::AcSelectorUnit => "Selector Unit",
            DescriptorKind::AcFeatureUnit => "Feature Unit",
            DescriptorKind::AcEffectUnit => "Effect Unit",
            DescriptorKind::AcProcessingUnit => "Processing Unit",
            DescriptorKind::AcExtensionUnit => "Extension Unit",
            DescriptorKind::AcClockSource => "Clock Source",
            DescriptorKind::AcClockSelector => "Clock Selector",
            DescriptorKind::AcClockMultiplier => "Clock Multiplier",
            DescriptorKind::AcSampleRateConverter => "Sample Rate Converter",
            DescriptorKind::AsGeneral => "AS General",
            DescriptorKind::AsFormatType => "Format Type",
            DescriptorKind::AsFormatSpecific => "Format Specific",
            DescriptorKind::AsEndpointGeneral => "AS Isochronous Endpoint",
            DescriptorKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn classify_control(subtype: u8, layout: Layout) -> DescriptorKind {
    match (subtype, layout) {
        (layout::AC_HEADER, _) => DescriptorKind::AcHeader,
        (layout::AC_INPUT_TERMINAL, _) => DescriptorKind::AcInputTerminal,
        (layout::AC_OUTPUT_TERMINAL, _) => DescriptorKind::AcOutputTerminal,
        (layout::AC_MIXER_UNIT, _) => DescriptorKind::AcMixerUnit,
        (layout::AC_SELECTOR_UNIT, _) => DescriptorKind::AcSelectorUnit,
        (layout::AC_FEATURE_UNIT, _) => DescriptorKind::AcFeatureUnit,
        (layout::AC_V1_PROCESSING_UNIT, Layout::V1) => DescriptorKind::AcProcessingUnit,
        (layout::AC_V1_EXTENSION_UNIT, Layout::V1) => DescriptorKind::AcExtensionUnit,
        (layout::AC_V2_EFFECT_UNIT, Layout::V2) => DescriptorKind::AcEffectUnit,
        (layout::AC_V2_PROCESSING_UNIT, Layout::V2) => DescriptorKind::AcProcessingUnit,
        (layout::AC_V2_EXTENSION_UNIT, Layout::V2) => DescriptorKind::AcExtensionUnit,
        (layout::AC_V2_CLOCK_SOURCE, Layout::V2) => DescriptorKind::AcClockSource,
        (layout::AC_V2_CLOCK_SELECTOR, Layout::V2) => DescriptorKind::AcClockSelector,
        (layout::AC_V2_CLOCK_MULTIPLIER, Layout::V2) => DescriptorKind::AcClockMultiplier,
        (layout::AC_V2_SAMPLE_RATE_CONVERTER, Layout::V2) => {
            DescriptorKind::AcSampleRateConverter
        }
        _ => DescriptorKind::Unknown,
    }
}

/// Result of decoding one class-specific descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedDescriptor {
    /// Declared `bLength`; callers advance by this amount.
    pub total_length: u8,
    pub class: DescriptorClass,
    pub subtype: u8,
    pub kind: DescriptorKind,
    /// Typed body, only when every field of the layout was read.
    pub body: Option<DescriptorBody>,
    pub fields: Vec<Field>,
    /// Bytes understood, common prefix included.
    pub consumed: usize,
    pub undecoded: Option<Range<usize>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DecodedDescriptor {
    pub fn length(&self) -> usize {
        usize::from(self.total_length)
    }
}

/// Decode one class-specific audio descriptor starting at `data[0]`.
///
/// Returns `Ok(None)` when the interface is not audio or the descriptor type
/// does not belong to its subclass. Returns `Err` only when the common
/// three-byte prefix is unusable. Everything else is reported through the
/// diagnostics of the returned descriptor.
///
/// # Examples
/// ```
/// use uacshark_core::{AudioSubclass, InterfaceInfo, Session, decode_descriptor};
///
/// let mut session = Session::new();
/// let iface = InterfaceInfo::audio(AudioSubclass::AudioControl);
/// let header = [0x09, 0x24, 0x01, 0x00, 0x01, 0x09, 0x00, 0x01, 0x01];
/// let decoded = decode_descriptor(&header, &iface, &mut session)?.unwrap();
/// assert_eq!(decoded.length(), 9);
/// assert_eq!(session.version_context().unwrap().major(), 1);
/// # Ok::<(), uacshark_core::DescriptorError>(())
/// ```
pub fn decode_descriptor(
    data: &[u8],
    iface: &InterfaceInfo,
    session: &mut Session,
) -> Result<Option<DecodedDescriptor>, DescriptorError> {
    if !iface.is_audio() {
        return Ok(None);
    }
    let descriptor_type = match data.get(layout::TYPE_OFFSET) {
        Some(value) => *value,
        None => {
            return Err(DescriptorError::TooShort {
                field: "bDescriptorType",
                needed: layout::TYPE_OFFSET + 1,
                actual: data.len(),
            });
        }
    };
    let class = match (descriptor_type, iface.subclass) {
        (
            layout::CS_INTERFACE,
            AudioSubclass::AudioControl | AudioSubclass::AudioStreaming,
        ) => DescriptorClass::Interface,
        (layout::CS_ENDPOINT, AudioSubclass::AudioStreaming) => DescriptorClass::Endpoint,
        _ => return Ok(None),
    };

    let total_length = data[layout::LENGTH_OFFSET];
    let declared = usize::from(total_length);
    if declared < layout::COMMON_PREFIX_LEN {
        return Err(DescriptorError::InvalidLength {
            length: total_length,
        });
    }

    let mut reader = DescriptorReader::new(data, declared);
    reader.u8("bLength")?;
    reader.u8("bDescriptorType")?;
    let subtype = reader.u8("bDescriptorSubtype")?;

    let mut diagnostics = Vec::new();
    if data.len() < declared {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::LengthOverrun,
            data.len()..declared,
            format!(
                "bLength {declared} exceeds the {} bytes supplied",
                data.len()
            ),
        ));
    }

    let kind = DescriptorKind::classify(iface.subclass, class, subtype, session.layout());
    debug!("descriptor subtype {subtype:#04x} dispatched as {kind}");

    let body_start = reader.mark();
    let body = match parse_body(kind, &mut reader, session, &mut diagnostics) {
        Ok(body) => body,
        Err(err) => {
            if err.is_refusal() {
                reader.rewind(body_start);
            }
            let at = reader.offset();
            if let DescriptorError::SessionConflict { bound } = &err {
                warn!("descriptor refused: session bound to {bound}");
            }
            diagnostics.push(Diagnostic::new(
                err.diagnostic_kind(),
                at..declared,
                err.to_string(),
            ));
            None
        }
    };

    let consumed = reader.offset();
    let undecoded = if consumed < declared {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::UndecodedTail,
            consumed..declared,
            format!("{} trailing bytes not decoded", declared - consumed),
        ));
        Some(consumed..declared)
    } else {
        None
    };
    trace!("descriptor {kind}: consumed {consumed} of {declared}");

    Ok(Some(DecodedDescriptor {
        total_length,
        class,
        subtype,
        kind,
        body,
        fields: reader.into_fields(),
        consumed,
        undecoded,
        diagnostics,
    }))
}

fn parse_body(
    kind: DescriptorKind,
    reader: &mut DescriptorReader<'_>,
    session: &mut Session,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<DescriptorBody>, DescriptorError> {
    let body = match kind {
        DescriptorKind::AcHeader => {
            DescriptorBody::Header(parser::parse_ac_header(reader, session, diagnostics)?)
        }
        DescriptorKind::AcInputTerminal => {
            let layout = session.audio_layout()?;
            DescriptorBody::InputTerminal(parser::parse_input_terminal(reader, layout)?)
        }
        DescriptorKind::AcOutputTerminal => {
            let layout = session.audio_layout()?;
            DescriptorBody::OutputTerminal(parser::parse_output_terminal(reader, layout)?)
        }
        DescriptorKind::AcMixerUnit => {
            let layout = session.audio_layout()?;
            DescriptorBody::MixerUnit(parser::parse_mixer_unit(reader, layout)?)
        }
        DescriptorKind::AcFeatureUnit => {
            session.audio_layout()?;
            DescriptorBody::FeatureUnit(parser::parse_feature_unit(reader)?)
        }
        DescriptorKind::AcClockSource => {
            session.audio_layout()?;
            DescriptorBody::ClockSource(parser::parse_clock_source(reader)?)
        }
        DescriptorKind::AcClockSelector => {
            session.audio_layout()?;
            DescriptorBody::ClockSelector(parser::parse_clock_selector(reader)?)
        }
        DescriptorKind::AsGeneral => {
            let layout = session.audio_layout()?;
            DescriptorBody::StreamingGeneral(parser::parse_streaming_general(reader, layout)?)
        }
        DescriptorKind::AsFormatType => {
            session.audio_layout()?;
            DescriptorBody::FormatType(parser::parse_format_type(reader)?)
        }
        DescriptorKind::AsEndpointGeneral => {
            let layout = session.audio_layout()?;
            DescriptorBody::StreamingEndpoint(parser::parse_streaming_endpoint(reader, layout)?)
        }
        DescriptorKind::Unknown => {
            session.ensure_audio()?;
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnrecognizedSubtype,
                reader.offset()..reader.declared_len(),
                "subtype not recognized for this interface",
            ));
            return Ok(None);
        }
        _ => {
            session.ensure_audio()?;
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnrecognizedSubtype,
                reader.offset()..reader.declared_len(),
                format!("{kind} body is not decoded"),
            ));
            return Ok(None);
        }
    };
    Ok(Some(body))
}

/// One descriptor found by [`decode_descriptors`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkedDescriptor {
    /// Offset of the descriptor in the walked buffer.
    pub offset: usize,
    pub descriptor: DecodedDescriptor,
}

/// Outcome of walking a run of consecutive descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescriptorWalk {
    pub descriptors: Vec<WalkedDescriptor>,
    /// Descriptors that were not ours (standard or foreign class types).
    pub skipped: usize,
    /// Walk-level diagnostics, offsets relative to the walked buffer.
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode consecutive descriptors, advancing by each declared `bLength`.
///
/// Stops on a length byte below 2 or on a descriptor that overruns the
/// buffer, after decoding what the overrunning descriptor supplied.
pub fn decode_descriptors(data: &[u8], iface: &InterfaceInfo, session: &mut Session) -> DescriptorWalk {
    let mut walk = DescriptorWalk::default();
    let mut offset = 0;
    while offset < data.len() {
        let rest = &data[offset..];
        let length = usize::from(rest[layout::LENGTH_OFFSET]);
        if length < layout::MIN_WALK_LEN {
            walk.diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidLength,
                offset..data.len(),
                format!("descriptor length {length} stops the walk"),
            ));
            break;
        }
        match decode_descriptor(rest, iface, session) {
            Ok(Some(descriptor)) => walk.descriptors.push(WalkedDescriptor { offset, descriptor }),
            Ok(None) => walk.skipped += 1,
            Err(err) => {
                let end = (offset + length).min(data.len());
                walk.diagnostics.push(Diagnostic::new(
                    err.diagnostic_kind(),
                    offset..end,
                    err.to_string(),
                ));
            }
        }
        if offset + length > data.len() {
            break;
        }
        offset += length;
    }
    walk
}
