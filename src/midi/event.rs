//! Wire-level MIDI event types shared by the codec, the synth adapter and
//! the sequencer engine.

/// Note off (0x80..0x8F).
pub const MIDI_NOTEOFF: u8 = 0x80;
/// Note on (0x90..0x9F).
pub const MIDI_NOTEON: u8 = 0x90;
/// Polyphonic key pressure / after-touch (0xA0..0xAF).
pub const MIDI_KEY_PRESSURE: u8 = 0xA0;
/// Control change (0xB0..0xBF).
pub const MIDI_CTL_CHANGE: u8 = 0xB0;
/// Program change (0xC0..0xCF).
pub const MIDI_PGM_CHANGE: u8 = 0xC0;
/// Channel pressure / after-touch (0xD0..0xDF).
pub const MIDI_CHN_PRESSURE: u8 = 0xD0;
/// Pitch wheel change (0xE0..0xEF).
pub const MIDI_PITCH_BEND: u8 = 0xE0;
/// System exclusive start.
pub const MIDI_SYSEX: u8 = 0xF0;
/// MIDI time code quarter frame.
pub const MIDI_TIME_CODE: u8 = 0xF1;
/// Song position pointer.
pub const MIDI_SONG_POSITION: u8 = 0xF2;
/// Song select.
pub const MIDI_SONG_SELECT: u8 = 0xF3;
/// Tune request.
pub const MIDI_TUNE_REQUEST: u8 = 0xF6;
/// System exclusive end marker; never surfaces as its own event.
pub const MIDI_SYSEX_EOX: u8 = 0xF7;
/// Timing clock (real-time).
pub const MIDI_SYNC: u8 = 0xF8;
/// Start (real-time).
pub const MIDI_START: u8 = 0xFA;
/// Continue (real-time).
pub const MIDI_CONTINUE: u8 = 0xFB;
/// Stop (real-time).
pub const MIDI_STOP: u8 = 0xFC;
/// Active sensing (real-time).
pub const MIDI_ACTIVE_SENSING: u8 = 0xFE;
/// System reset (real-time).
pub const MIDI_SYSTEM_RESET: u8 = 0xFF;

/// Maximum number of bytes a SysEx accumulator can hold.
pub const SYSEX_MAX_MSG_SIZE: usize = 1024;

/// Does `c` look like a status byte (top bit set)?
pub fn is_status_byte(c: u8) -> bool {
    0x80 & c != 0
}

/// Is `c` a real-time message (always processed immediately, never
/// disturbing running status)?
pub fn is_real_time(c: u8) -> bool {
    c >= MIDI_SYNC
}

/// Number of data bytes that follow a channel-message status byte.
/// `status` must already be masked to its high nibble (e.g. `0xB0`).
pub fn channel_type_len(status: u8) -> usize {
    match status {
        MIDI_NOTEOFF | MIDI_NOTEON | MIDI_KEY_PRESSURE | MIDI_CTL_CHANGE | MIDI_PITCH_BEND => 2,
        MIDI_PGM_CHANGE | MIDI_CHN_PRESSURE => 1,
        _ => 0,
    }
}

/// Number of data bytes that follow a system-common status byte (0xF1..0xF6).
pub fn system_type_len(status: u8) -> usize {
    match status {
        MIDI_TIME_CODE | MIDI_SONG_SELECT => 1,
        MIDI_SONG_POSITION => 2,
        _ => 0,
    }
}

/// A parsed (or about-to-be-serialized) MIDI event.
///
/// `ex_data` borrows SysEx payload bytes from whatever produced the event —
/// a parser's internal accumulator, or a caller-supplied buffer. It must not
/// outlive that buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent<'a> {
    pub kind: u8,
    pub channel: u8,
    pub p1: u32,
    pub p2: u32,
    pub ex_data: Option<&'a [u8]>,
}

impl<'a> MidiEvent<'a> {
    pub fn channel_message(kind: u8, channel: u8, p1: u32, p2: u32) -> Self {
        Self {
            kind,
            channel,
            p1,
            p2,
            ex_data: None,
        }
    }

    pub fn system(kind: u8, p1: u32) -> Self {
        Self {
            kind,
            channel: 0,
            p1,
            p2: 0,
            ex_data: None,
        }
    }

    pub fn real_time(kind: u8) -> Self {
        Self {
            kind,
            channel: 0,
            p1: 0,
            p2: 0,
            ex_data: None,
        }
    }

    pub fn sysex(data: &'a [u8]) -> Self {
        Self {
            kind: MIDI_SYSEX,
            channel: 0,
            p1: data.len() as u32,
            p2: 0,
            ex_data: Some(data),
        }
    }

    pub fn is_real_time(&self) -> bool {
        is_real_time(self.kind)
    }

    pub fn is_channel_message(&self) -> bool {
        self.kind >= MIDI_NOTEOFF && self.kind < MIDI_SYSEX
    }
}

/// Validates that every byte of a SysEx payload has its top bit clear.
pub fn validate_sysex(buf: &[u8]) -> Result<(), crate::error::Error> {
    for &b in buf {
        if b > 0x7F {
            return Err(crate::error::Error::Domain);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_high_bit_sysex_data() {
        let err = validate_sysex(&[0x7F, 0x80]).unwrap_err();
        assert!(matches!(err, crate::error::Error::Domain));
    }

    #[test]
    fn accepts_clean_sysex_data() {
        assert!(validate_sysex(&[0x00, 0x7F, 0x10]).is_ok());
    }
}
