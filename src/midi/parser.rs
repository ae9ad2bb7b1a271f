//! Streaming MIDI byte parser with running-status support.
//!
//! Grounded on `midi_event.c`'s `vm_event_parse`, with one deliberate
//! behavior change: real-time bytes (0xF8..0xFF) no longer reset the
//! in-progress message. See SPEC_FULL.md §4.1 rule 1 and §9 Open Question 1.

use super::event::{
    channel_type_len, is_real_time, is_status_byte, system_type_len, MidiEvent, MIDI_PITCH_BEND,
    MIDI_SONG_POSITION, MIDI_SYSEX, MIDI_SYSEX_EOX, SYSEX_MAX_MSG_SIZE,
};

/// Coarse phase derived from the raw parser fields, useful for assertions
/// and tests without re-deriving the reference implementation's sentinel
/// encoding (`type == 0` for idle, `data_required == SYSEX_MAX` for SysEx).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserPhase {
    Idle,
    AwaitingData { kind: u8, need: usize, got: usize },
    AwaitingSysEx { got: usize },
}

/// Per-stream parser state: running status, channel, and a reusable
/// accumulator for both channel-message data bytes and SysEx payloads.
pub struct ParserState {
    kind: u8,
    channel: u8,
    data_used: usize,
    data_required: usize,
    data: [u8; SYSEX_MAX_MSG_SIZE],
}

impl Default for ParserState {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserState {
    pub fn new() -> Self {
        Self {
            kind: 0,
            channel: 0,
            data_used: 0,
            data_required: 0,
            data: [0u8; SYSEX_MAX_MSG_SIZE],
        }
    }

    pub fn phase(&self) -> ParserPhase {
        if self.kind == 0 {
            ParserPhase::Idle
        } else if self.kind == MIDI_SYSEX {
            ParserPhase::AwaitingSysEx {
                got: self.data_used,
            }
        } else {
            ParserPhase::AwaitingData {
                kind: self.kind,
                need: self.data_required,
                got: self.data_used,
            }
        }
    }

    fn reset_accumulator(&mut self) {
        self.data_used = 0;
    }

    /// Feed one byte into the parser. Returns a completed event, if this
    /// byte completed one. The returned event borrows `self`'s accumulator
    /// and must not outlive the next call to `parse`.
    pub fn parse(&mut self, c: u8) -> Option<MidiEvent<'_>> {
        if is_status_byte(c) {
            return self.parse_status(c);
        }
        self.parse_data(c)
    }

    fn parse_status(&mut self, c: u8) -> Option<MidiEvent<'_>> {
        if is_real_time(c) {
            // Real-time bytes may be interleaved with any message and must
            // not disturb running status or the in-progress accumulator.
            return Some(MidiEvent::real_time(c));
        }

        // Any other status byte terminates an in-progress SysEx message,
        // including (but not limited to) the explicit 0xF7 terminator.
        let staged_sysex_len = if self.kind == MIDI_SYSEX && self.data_used > 0 {
            Some(self.data_used)
        } else {
            None
        };

        self.reset_accumulator();

        if c < MIDI_SYSEX {
            // 0x80..0xEF: channel message.
            self.kind = c & 0xF0;
            self.channel = c & 0x0F;
            self.data_required = channel_type_len(self.kind);
        } else {
            self.channel = 0;
            match c {
                MIDI_SYSEX => {
                    self.kind = MIDI_SYSEX;
                    self.data_required = SYSEX_MAX_MSG_SIZE;
                }
                MIDI_SYSEX_EOX => {
                    self.kind = 0;
                }
                _ => {
                    self.data_required = system_type_len(c);
                    if self.data_required == 0 {
                        if let Some(len) = staged_sysex_len {
                            // A SysEx was pending and must be surfaced first;
                            // the zero-length system message that triggered
                            // it is dropped, matching the reference's
                            // one-event-per-call contract.
                            self.kind = 0;
                            return Some(MidiEvent::sysex(&self.data[..len]));
                        }
                        self.kind = 0;
                        return Some(MidiEvent::system(c, 0));
                    }
                    self.kind = c;
                }
            }
        }

        staged_sysex_len.map(|len| MidiEvent::sysex(&self.data[..len]))
    }

    fn parse_data(&mut self, c: u8) -> Option<MidiEvent<'_>> {
        if self.kind == 0 {
            return None;
        }

        if self.data_used >= SYSEX_MAX_MSG_SIZE {
            // Accumulator full: drop the whole in-progress message.
            self.kind = 0;
            return None;
        }
        self.data[self.data_used] = c;
        self.data_used += 1;

        if self.kind == MIDI_SYSEX || self.data_used < self.data_required {
            return None;
        }

        // Event complete. Reset data_used now so further data bytes (running
        // status) start accumulating the next instance of the same message.
        self.data_used = 0;
        let kind = self.kind;
        let channel = self.channel;
        let (p1, p2) = match kind {
            MIDI_PITCH_BEND | MIDI_SONG_POSITION => {
                (self.data[0] as u32 | ((self.data[1] as u32) << 7), 0)
            }
            _ if channel_type_len(kind) == 2 => (self.data[0] as u32, self.data[1] as u32),
            _ => (self.data[0] as u32, 0),
        };
        Some(MidiEvent::channel_message(kind, channel, p1, p2))
    }
}
