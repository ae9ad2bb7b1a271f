//! MIDI event serialization, grounded on `midi_event.c`'s `vm_event_serialize`.

use super::event::{
    channel_type_len, MidiEvent, MIDI_NOTEOFF, MIDI_PITCH_BEND, MIDI_SONG_POSITION, MIDI_SYSEX,
    MIDI_SYSEX_EOX,
};
use crate::error::Error;

/// Serializes `evt` into `buf`, returning the number of bytes written and
/// whether a status byte was written (false only for bare data-continuation
/// writes, which this codec never produces — kept for symmetry with callers
/// tracking running status across consecutive serialize calls).
///
/// On `Error::BufferTooSmall(needed)`, `needed` is the number of bytes that
/// would have been required, matching the reference's `buf_size_req` output
/// parameter.
pub fn serialize(evt: &MidiEvent, buf: &mut [u8]) -> Result<(usize, bool), Error> {
    if evt.kind == 0 || evt.kind == MIDI_SYSEX_EOX {
        return Err(Error::InvalidArgument);
    }

    if evt.kind == MIDI_SYSEX {
        let data = evt.ex_data.ok_or(Error::InvalidArgument)?;
        super::event::validate_sysex(data)?;
        let needed = data.len() + 2;
        if buf.len() < needed {
            return Err(Error::BufferTooSmall(needed));
        }
        buf[0] = MIDI_SYSEX;
        buf[1..1 + data.len()].copy_from_slice(data);
        buf[1 + data.len()] = MIDI_SYSEX_EOX;
        return Ok((needed, true));
    }

    if evt.kind >= MIDI_NOTEOFF && evt.kind < MIDI_SYSEX {
        // Channel message.
        if evt.channel > 0x0F {
            return Err(Error::Domain);
        }
        let len = channel_type_len(evt.kind);
        let needed = 1 + len;
        if buf.len() < needed {
            return Err(Error::BufferTooSmall(needed));
        }
        buf[0] = evt.kind | evt.channel;
        match evt.kind {
            MIDI_PITCH_BEND => {
                buf[1] = (evt.p1 & 0x7F) as u8;
                buf[2] = ((evt.p1 >> 7) & 0x7F) as u8;
            }
            _ if len == 2 => {
                buf[1] = (evt.p1 & 0x7F) as u8;
                buf[2] = (evt.p2 & 0x7F) as u8;
            }
            _ if len == 1 => {
                buf[1] = (evt.p1 & 0x7F) as u8;
            }
            _ => {}
        }
        return Ok((needed, true));
    }

    // System common / real-time.
    let needed = match evt.kind {
        MIDI_SONG_POSITION => 3,
        k if super::event::system_type_len(k) == 1 => 2,
        _ => 1,
    };
    if buf.len() < needed {
        return Err(Error::BufferTooSmall(needed));
    }
    buf[0] = evt.kind;
    if needed == 3 {
        buf[1] = (evt.p1 & 0x7F) as u8;
        buf[2] = ((evt.p1 >> 7) & 0x7F) as u8;
    } else if needed == 2 {
        buf[1] = (evt.p1 & 0x7F) as u8;
    }
    Ok((needed, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::event::{MIDI_CTL_CHANGE, MIDI_NOTEON, MIDI_SYNC};

    #[test]
    fn note_on_serializes_three_bytes() {
        let mut buf = [0u8; 8];
        let (n, _) = serialize(
            &MidiEvent::channel_message(MIDI_NOTEON, 3, 60, 100),
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..n], &[0x93, 60, 100]);
    }

    #[test]
    fn buffer_too_small_reports_needed_size() {
        let mut buf = [0u8; 1];
        let err = serialize(
            &MidiEvent::channel_message(MIDI_CTL_CHANGE, 0, 7, 127),
            &mut buf,
        )
        .unwrap_err();
        assert_eq!(err, Error::BufferTooSmall(3));
    }

    #[test]
    fn real_time_serializes_single_byte() {
        let mut buf = [0u8; 4];
        let (n, _) = serialize(&MidiEvent::real_time(MIDI_SYNC), &mut buf).unwrap();
        assert_eq!(&buf[..n], &[MIDI_SYNC]);
    }

    #[test]
    fn bare_eox_is_rejected() {
        let mut buf = [0u8; 4];
        let err = serialize(&MidiEvent::system(MIDI_SYSEX_EOX, 0), &mut buf).unwrap_err();
        assert_eq!(err, Error::InvalidArgument);
    }

    #[test]
    fn sysex_missing_payload_is_rejected() {
        let mut buf = [0u8; 4];
        let err = serialize(
            &MidiEvent {
                kind: MIDI_SYSEX,
                channel: 0,
                p1: 0,
                p2: 0,
                ex_data: None,
            },
            &mut buf,
        )
        .unwrap_err();
        assert_eq!(err, Error::InvalidArgument);
    }

    #[test]
    fn sysex_rejects_high_bit_payload() {
        let mut buf = [0u8; 8];
        let err = serialize(&MidiEvent::sysex(&[0x01, 0x80]), &mut buf).unwrap_err();
        assert_eq!(err, Error::Domain);
    }

    #[test]
    fn sysex_frames_with_f0_and_f7() {
        let mut buf = [0u8; 8];
        let (n, _) = serialize(&MidiEvent::sysex(&[0x01, 0x02]), &mut buf).unwrap();
        assert_eq!(&buf[..n], &[0xF0, 0x01, 0x02, 0xF7]);
    }

    #[test]
    fn out_of_range_data_byte_is_masked_not_rejected() {
        let mut buf = [0u8; 4];
        let (n, _) = serialize(
            &MidiEvent::channel_message(MIDI_NOTEON, 0, 200, 0),
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..n], &[0x90, 200 & 0x7F, 0]);
    }
}
