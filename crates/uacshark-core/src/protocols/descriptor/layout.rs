pub const IF_CLASS_AUDIO: u8 = 0x01;

pub const SUBCLASS_UNDEFINED: u8 = 0x00;
pub const SUBCLASS_AUDIO_CONTROL: u8 = 0x01;
pub const SUBCLASS_AUDIO_STREAMING: u8 = 0x02;
pub const SUBCLASS_MIDI_STREAMING: u8 = 0x03;

pub const CS_INTERFACE: u8 = 0x24;
pub const CS_ENDPOINT: u8 = 0x25;

pub const LENGTH_OFFSET: usize = 0;
pub const TYPE_OFFSET: usize = 1;
pub const SUBTYPE_OFFSET: usize = 2;
pub const COMMON_PREFIX_LEN: usize = SUBTYPE_OFFSET + 1;
/// Smallest length that still advances an outer walk.
pub const MIN_WALK_LEN: usize = 2;

// Audio control subtypes shared by both revisions.
pub const AC_HEADER: u8 = 0x01;
pub const AC_INPUT_TERMINAL: u8 = 0x02;
pub const AC_OUTPUT_TERMINAL: u8 = 0x03;
pub const AC_MIXER_UNIT: u8 = 0x04;
pub const AC_SELECTOR_UNIT: u8 = 0x05;
pub const AC_FEATURE_UNIT: u8 = 0x06;

// Audio control subtypes, v1 numbering.
pub const AC_V1_PROCESSING_UNIT: u8 = 0x07;
pub const AC_V1_EXTENSION_UNIT: u8 = 0x08;

// Audio control subtypes, v2 numbering.
pub const AC_V2_EFFECT_UNIT: u8 = 0x07;
pub const AC_V2_PROCESSING_UNIT: u8 = 0x08;
pub const AC_V2_EXTENSION_UNIT: u8 = 0x09;
pub const AC_V2_CLOCK_SOURCE: u8 = 0x0a;
pub const AC_V2_CLOCK_SELECTOR: u8 = 0x0b;
pub const AC_V2_CLOCK_MULTIPLIER: u8 = 0x0c;
pub const AC_V2_SAMPLE_RATE_CONVERTER: u8 = 0x0d;

pub const AS_GENERAL: u8 = 0x01;
pub const AS_FORMAT_TYPE: u8 = 0x02;
/// `FORMAT_SPECIFIC` in v1, `ENCODER` in v2.
pub const AS_FORMAT_SPECIFIC: u8 = 0x03;

pub const EP_GENERAL: u8 = 0x01;

pub const FORMAT_TYPE_I: u8 = 0x01;
pub const FORMAT_TYPE_II: u8 = 0x02;

pub const SAMPLE_FREQ_LEN: usize = 3;
pub const SAM_FREQ_CONTINUOUS: u8 = 0;

/// Wire value of `bControlSize` is one less than the bytes per control entry.
pub const FEATURE_CONTROL_SIZE_BIAS: usize = 1;

pub const ADC_MAJOR_V1: u8 = 1;
pub const ADC_MAJOR_V2: u8 = 2;
