//! Black-box tests for the MIDI wire codec's testable properties.

use virtual_midi::midi::event::{
    MidiEvent, MIDI_CTL_CHANGE, MIDI_NOTEON, MIDI_PITCH_BEND, MIDI_SYNC, MIDI_SYSEX,
    SYSEX_MAX_MSG_SIZE,
};
use virtual_midi::midi::{serialize, ParserState};

fn roundtrip(evt: &MidiEvent) -> Vec<u8> {
    let mut buf = [0u8; 16];
    let (n, _) = serialize(evt, &mut buf).unwrap();
    buf[..n].to_vec()
}

#[test]
fn serialize_then_parse_recovers_channel_message() {
    let evt = MidiEvent::channel_message(MIDI_CTL_CHANGE, 5, 7, 42);
    let bytes = roundtrip(&evt);
    let mut parser = ParserState::new();
    let mut found = None;
    for b in bytes {
        if let Some(e) = parser.parse(b) {
            found = Some((e.kind, e.channel, e.p1, e.p2));
        }
    }
    assert_eq!(found, Some((MIDI_CTL_CHANGE, 5, 7, 42)));
}

#[test]
fn pitch_bend_survives_14_bit_roundtrip() {
    let evt = MidiEvent::channel_message(MIDI_PITCH_BEND, 0, 0x1FFF, 0);
    let bytes = roundtrip(&evt);
    let mut parser = ParserState::new();
    let mut found = None;
    for b in bytes {
        if let Some(e) = parser.parse(b) {
            found = Some(e.p1);
        }
    }
    assert_eq!(found, Some(0x1FFF));
}

#[test]
fn sysex_boundary_accepts_exactly_1024_and_drops_1025() {
    let mut parser = ParserState::new();
    let mut stream = vec![0xF0u8];
    stream.extend(std::iter::repeat(0x10).take(SYSEX_MAX_MSG_SIZE));
    let mut events = 0;
    for b in &stream {
        if parser.parse(*b).is_some() {
            events += 1;
        }
    }
    assert_eq!(events, 1);

    let mut parser = ParserState::new();
    let mut stream = vec![0xF0u8];
    stream.extend(std::iter::repeat(0x10).take(SYSEX_MAX_MSG_SIZE + 1));
    let mut events = 0;
    for b in &stream {
        if parser.parse(*b).is_some() {
            events += 1;
        }
    }
    assert_eq!(events, 0);
}

#[test]
fn any_status_byte_terminates_an_open_sysex() {
    let mut parser = ParserState::new();
    let mut sysex_seen = false;
    for b in [0xF0, 0x01, 0x02, 0x90] {
        if let Some(e) = parser.parse(b) {
            if e.kind == MIDI_SYSEX {
                sysex_seen = true;
                assert_eq!(e.ex_data, Some(&[0x01, 0x02][..]));
            }
        }
    }
    assert!(sysex_seen);
}

#[test]
fn real_time_bytes_interleave_without_breaking_the_pending_message() {
    let mut parser = ParserState::new();
    let mut completed = Vec::new();
    for b in [0x90u8, 0xF8, 0xF8, 60, 64] {
        if let Some(e) = parser.parse(b) {
            completed.push((e.kind, e.p1, e.p2));
        }
    }
    assert_eq!(
        completed,
        vec![(MIDI_SYNC, 0, 0), (MIDI_SYNC, 0, 0), (MIDI_NOTEON, 60, 64)]
    );
}

#[test]
fn serializer_reports_required_size_on_overflow() {
    let mut buf = [0u8; 2];
    let err = serialize(&MidiEvent::channel_message(MIDI_NOTEON, 0, 60, 100), &mut buf)
        .unwrap_err();
    assert_eq!(err, virtual_midi::Error::BufferTooSmall(3));
}
