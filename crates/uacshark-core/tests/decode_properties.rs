use uacshark_core::protocols::descriptor::model::{
    DescriptorBody, FormatTypeDescriptor, HeaderDescriptor, SampleRates,
};
use uacshark_core::protocols::midi::GateNote;
use uacshark_core::{
    AudioSubclass, DecodedDescriptor, DescriptorError, InterfaceInfo, Session, SysExReassembler,
    bcd44_to_dec, decode_descriptor, split_events,
};

const V2_HEADER: [u8; 9] = [0x09, 0x24, 0x01, 0x00, 0x02, 0x08, 0x40, 0x00, 0x00];

fn control() -> InterfaceInfo {
    InterfaceInfo::audio(AudioSubclass::AudioControl)
}

fn streaming() -> InterfaceInfo {
    InterfaceInfo::audio(AudioSubclass::AudioStreaming)
}

fn decode(bytes: &[u8], iface: &InterfaceInfo, session: &mut Session) -> DecodedDescriptor {
    decode_descriptor(bytes, iface, session)
        .expect("usable prefix")
        .expect("audio descriptor")
}

fn v2_session() -> Session {
    let mut session = Session::new();
    decode(&V2_HEADER, &control(), &mut session);
    session
}

#[test]
fn v1_header_lists_declared_interfaces() {
    for count in 0u8..=6 {
        let mut bytes = vec![8 + count, 0x24, 0x01, 0x10, 0x01, 0x40, 0x00, count];
        bytes.extend((0..count).map(|n| n + 1));
        let mut session = Session::new();
        let decoded = decode(&bytes, &control(), &mut session);
        match decoded.body {
            Some(DescriptorBody::Header(HeaderDescriptor::V1 {
                version,
                interfaces,
                ..
            })) => {
                assert_eq!(version.major, 1);
                assert_eq!(version.minor, 10);
                assert_eq!(interfaces.len(), usize::from(count));
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(decoded.consumed, bytes.len());
    }
}

#[test]
fn v2_header_has_category_and_controls() {
    let mut session = Session::new();
    let header = [0x09, 0x24, 0x01, 0x00, 0x02, 0x0a, 0x40, 0x00, 0x02];
    let decoded = decode(&header, &control(), &mut session);
    match decoded.body {
        Some(DescriptorBody::Header(HeaderDescriptor::V2 {
            version,
            category,
            controls,
            ..
        })) => {
            assert_eq!(version.major, 2);
            assert_eq!(category, 0x0a);
            assert_eq!(controls, 0x02);
        }
        other => panic!("unexpected body {other:?}"),
    }
    assert!(decoded.fields.iter().any(|field| field.name == "bCategory"));
    assert!(decoded.fields.iter().any(|field| field.name == "bmControls"));
}

#[test]
fn bcd44_sweep_rejects_hex_nibbles() {
    for value in 0u8..=255 {
        let tens = value >> 4;
        let units = value & 0x0f;
        let result = bcd44_to_dec(value);
        if tens <= 9 && units <= 9 {
            assert_eq!(result.unwrap(), tens * 10 + units, "{value:#04x}");
        } else {
            assert_eq!(result.unwrap_err(), DescriptorError::BcdOutOfRange { value });
        }
    }
    assert_eq!(bcd44_to_dec(0x23).unwrap(), 23);
    assert_eq!(bcd44_to_dec(0x99).unwrap(), 99);
}

#[test]
fn feature_unit_reads_control_size_plus_one() {
    let mut session = v2_session();
    let with_name = [0x09, 0x24, 0x06, 0x02, 0x01, 0x01, 0x03, 0x00, 0x07];
    let decoded = decode(&with_name, &control(), &mut session);
    let controls = decoded
        .fields
        .iter()
        .find(|field| field.name == "bmaControls")
        .expect("controls field");
    assert_eq!((controls.offset, controls.length), (6, 2));
    assert_eq!(decoded.fields.last().map(|f| f.name.as_str()), Some("iFeature"));
    assert_eq!(decoded.consumed, 9);

    let without_name = [0x08, 0x24, 0x06, 0x02, 0x01, 0x01, 0x03, 0x00];
    let decoded = decode(&without_name, &control(), &mut session);
    assert_eq!(decoded.fields.last().map(|f| f.name.as_str()), Some("bmaControls"));
    assert_eq!(decoded.consumed, 8);
    assert!(decoded.diagnostics.is_empty());
}

#[test]
fn format_type_sample_rate_tables() {
    let mut session = v2_session();
    // 44100 = 0x00ac44, 48000 = 0x00bb80
    let continuous = [
        0x0e, 0x24, 0x02, 0x01, 0x02, 0x02, 0x10, 0x00, 0x44, 0xac, 0x00, 0x80, 0xbb, 0x00,
    ];
    let decoded = decode(&continuous, &streaming(), &mut session);
    match decoded.body {
        Some(DescriptorBody::FormatType(format)) => assert_eq!(
            format.sample_rates(),
            Some(&SampleRates::Continuous {
                lower: 44_100,
                upper: 48_000,
            })
        ),
        other => panic!("unexpected body {other:?}"),
    }

    let mut discrete = continuous;
    discrete[7] = 0x02;
    let decoded = decode(&discrete, &streaming(), &mut session);
    match decoded.body {
        Some(DescriptorBody::FormatType(FormatTypeDescriptor::TypeI { sample_rates, .. })) => {
            assert_eq!(sample_rates, SampleRates::Discrete(vec![44_100, 48_000]))
        }
        other => panic!("unexpected body {other:?}"),
    }
}

#[test]
fn ten_byte_buffer_splits_into_two_events() {
    let data = [0x09, 0x90, 0x3c, 0x7f, 0x08, 0x80, 0x3c, 0x00, 0x01, 0x02];
    let splitter = split_events(&data);
    assert_eq!(splitter.undecoded_tail(), Some(8..10));
    let offsets: Vec<_> = splitter.map(|event| event.offset).collect();
    assert_eq!(offsets, vec![0, 4]);
}

#[test]
fn sysex_three_events_on_cable_two() {
    let data = [
        0x24, 0xf0, 0x43, 0x12, 0x24, 0x00, 0x01, 0x02, 0x26, 0x03, 0xf7, 0x00,
    ];
    let mut reassembler = SysExReassembler::new();
    let outcome = reassembler.process_buffer(0, &data);
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].cable, 2);
    assert_eq!(
        outcome.messages[0].bytes,
        vec![0xf0, 0x43, 0x12, 0x00, 0x01, 0x02, 0x03, 0xf7]
    );
    let gate = outcome.gate.expect("gate");
    assert_eq!((gate.event_index, gate.note), (2, GateNote::Reassembled));
}

#[test]
fn sysex_completes_in_a_later_buffer() {
    let mut reassembler = SysExReassembler::new();
    let first = reassembler.process_buffer(0, &[0x04, 0xf0, 0x7d, 0x01]);
    assert!(first.messages.is_empty());
    assert_eq!(first.gate.map(|gate| gate.note), Some(GateNote::Fragment));

    let second = reassembler.process_buffer(1, &[0x05, 0xf7, 0x00, 0x00, 0x09, 0x90, 0x3c, 0x7f]);
    assert_eq!(second.messages.len(), 1);
    assert_eq!(second.messages[0].bytes, vec![0xf0, 0x7d, 0x01, 0xf7]);
    assert_eq!(second.messages[0].origin.first_buffer, 0);
    assert_eq!(second.messages[0].origin.completed_buffer, 1);
    assert!(reassembler.is_idle());
}

#[test]
fn sysex_complete_message_then_new_start_in_one_buffer() {
    let data = [
        0x14, 0xf0, 0x01, 0x02, //
        0x16, 0x03, 0xf7, 0x00, //
        0x14, 0xf0, 0x0a, 0x0b,
    ];
    let mut reassembler = SysExReassembler::new();
    let outcome = reassembler.process_buffer(0, &data);
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].bytes, vec![0xf0, 0x01, 0x02, 0x03, 0xf7]);
    assert_eq!(outcome.gate.map(|gate| gate.note), Some(GateNote::Fragment));

    let pending = reassembler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].bytes, vec![0xf0, 0x0a, 0x0b]);
}

#[test]
fn redecoding_against_fresh_sessions_is_identical() {
    let samples: [(&[u8], InterfaceInfo); 5] = [
        (&[0x08, 0x24, 0x0a, 0x10, 0x01, 0x07, 0x00, 0x00], control()),
        (&[0x09, 0x24, 0x06, 0x02, 0x01, 0x01, 0x03, 0x00, 0x07], control()),
        (&[0x0c, 0x24, 0x03, 0x03, 0x01, 0x03, 0x00, 0x02, 0x10, 0x00, 0x00, 0x00], control()),
        (&[0x08, 0x25, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00], streaming()),
        (&[0x07, 0x24, 0x05, 0x04, 0x01, 0x02, 0x00], control()),
    ];
    for (bytes, iface) in samples {
        let first = decode(bytes, &iface, &mut v2_session());
        let second = decode(bytes, &iface, &mut v2_session());
        assert_eq!(first, second);
        assert_eq!(first.length(), usize::from(bytes[0]));

        let cold_first = decode(bytes, &iface, &mut Session::new());
        let cold_second = decode(bytes, &iface, &mut Session::new());
        assert_eq!(cold_first, cold_second);
    }
}
